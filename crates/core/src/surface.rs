//! Host surface description and device-pixel scaling.

#[cfg(feature = "render")]
use std::rc::Rc;

/// What the host hands the engine at `initialize`: a logical size, the
/// device pixel ratio, and (with the `render` feature) an optional GL
/// context for the accelerated backend.
#[derive(Clone)]
pub struct SurfaceHandle {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
    #[cfg(feature = "render")]
    pub gl: Option<Rc<glow::Context>>,
}

impl SurfaceHandle {
    /// A handle without any GPU context (software rendering only).
    pub fn offscreen(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
            #[cfg(feature = "render")]
            gl: None,
        }
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    #[cfg(feature = "render")]
    pub fn with_gl(mut self, gl: Rc<glow::Context>) -> Self {
        self.gl = Some(gl);
        self
    }
}

impl std::fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("SurfaceHandle");
        s.field("width", &self.width)
            .field("height", &self.height)
            .field("pixel_ratio", &self.pixel_ratio);
        #[cfg(feature = "render")]
        s.field("gl", &self.gl.is_some());
        s.finish()
    }
}

/// A backend's drawing surface: logical size plus the backing size after
/// device pixel scaling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixel_ratio: f64,
}

impl Surface {
    /// Non-finite or non-positive ratios are treated as 1.0.
    pub fn new(width: u32, height: u32, pixel_ratio: f64) -> Self {
        let pixel_ratio = if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            pixel_ratio
        } else {
            1.0
        };
        Self {
            width,
            height,
            pixel_ratio,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Backing-store width in device pixels, at least 1.
    pub fn backing_width(&self) -> u32 {
        scale(self.width, self.pixel_ratio)
    }

    /// Backing-store height in device pixels, at least 1.
    pub fn backing_height(&self) -> u32 {
        scale(self.height, self.pixel_ratio)
    }

    /// Logical width over logical height; 1.0 for a degenerate surface.
    pub fn aspect(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

fn scale(logical: u32, ratio: f64) -> u32 {
    let scaled = (logical as f64 * ratio).round();
    if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        (scaled as u32).max(1)
    }
}
