//! Backend capability probe.
//!
//! Both checks are pure functions of the surface handle: they read what
//! the host provided and never touch global state, so a second engine on a
//! different capture window is probed from scratch.

use crate::surface::SurfaceHandle;

/// Whether the accelerated backend can run on `surface`.
///
/// Requires the `render` feature and a GL context capable of GLSL ES 3.0:
/// OpenGL ES 3.0+ (WebGL2) or desktop OpenGL 4.3+.
pub fn supports_accelerated(surface: &SurfaceHandle) -> bool {
    #[cfg(feature = "render")]
    {
        has_area(surface)
            && surface
                .gl
                .as_deref()
                .is_some_and(|gl| crate::render::GlVersion::of(gl).supports_es3_shaders())
    }
    #[cfg(not(feature = "render"))]
    {
        let _ = surface;
        false
    }
}

/// Whether the software backend can allocate a buffer for `surface`.
pub fn supports_software(surface: &SurfaceHandle) -> bool {
    if !has_area(surface) {
        return false;
    }
    let ratio = if surface.pixel_ratio.is_finite() && surface.pixel_ratio > 0.0 {
        surface.pixel_ratio
    } else {
        1.0
    };
    let w = (surface.width as f64 * ratio).round();
    let h = (surface.height as f64 * ratio).round();
    // 4 bytes per pixel, front and back buffer.
    w * h * 8.0 < usize::MAX as f64 && w < u32::MAX as f64 && h < u32::MAX as f64
}

fn has_area(surface: &SurfaceHandle) -> bool {
    surface.width > 0 && surface.height > 0
}

/// Injectable probe used by the engine at `initialize`.
pub trait CapabilityProbe {
    fn supports_accelerated(&self, surface: &SurfaceHandle) -> bool;
    fn supports_software(&self, surface: &SurfaceHandle) -> bool;
}

/// Probes the real surface handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbe;

impl CapabilityProbe for HostProbe {
    fn supports_accelerated(&self, surface: &SurfaceHandle) -> bool {
        supports_accelerated(surface)
    }

    fn supports_software(&self, surface: &SurfaceHandle) -> bool {
        supports_software(surface)
    }
}

/// A probe with fixed answers, for tests and forced configurations.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe {
    pub accelerated: bool,
    pub software: bool,
}

impl CapabilityProbe for FixedProbe {
    fn supports_accelerated(&self, _surface: &SurfaceHandle) -> bool {
        self.accelerated
    }

    fn supports_software(&self, _surface: &SurfaceHandle) -> bool {
        self.software
    }
}
