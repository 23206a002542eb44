//! Orthographic 2-D framing shared by both backends.
//!
//! The view spans `y` in [-1, 1]; `x` spans [-aspect, aspect] so world units
//! stay square whatever the surface shape.

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrthoCamera {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl OrthoCamera {
    pub fn new(aspect: f32) -> Self {
        let mut camera = Self {
            left: -1.0,
            right: 1.0,
            top: 1.0,
            bottom: -1.0,
        };
        camera.set_aspect(aspect);
        camera
    }

    /// Recomputes left/right from the aspect ratio; top/bottom stay at +-1.
    pub fn set_aspect(&mut self, aspect: f32) {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        self.left = -aspect;
        self.right = aspect;
    }

    pub fn aspect(&self) -> f32 {
        self.right
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.top - self.bottom
    }

    /// World position to normalized device coordinates ([-1, 1] on both axes).
    pub fn world_to_ndc(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            2.0 * (p.x - self.left) / self.width() - 1.0,
            2.0 * (p.y - self.bottom) / self.height() - 1.0,
        )
    }

    /// World position to pixel coordinates (origin top-left) on a
    /// `width x height` buffer.
    pub fn world_to_pixel(&self, p: Vec2, width: u32, height: u32) -> Vec2 {
        let ndc = self.world_to_ndc(p);
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * width as f32,
            (1.0 - ndc.y) * 0.5 * height as f32,
        )
    }

    /// Pixels per world unit along y on a buffer of `height` pixels.
    pub fn pixels_per_unit(&self, height: u32) -> f32 {
        height as f32 / self.height()
    }

    /// Scale vector for the GL vertex shader (`ndc = world * scale`).
    pub fn ndc_scale(&self) -> Vec2 {
        Vec2::new(2.0 / self.width(), 2.0 / self.height())
    }
}

impl Default for OrthoCamera {
    fn default() -> Self {
        Self::new(1.0)
    }
}
