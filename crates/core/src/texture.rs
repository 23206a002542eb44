//! CPU-side RGBA8 image data shared by both backends.

use crate::color::Rgba;
use crate::error::RenderError;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded image pixels, row-major RGBA8, top row first.
///
/// Each texture gets a process-unique id so the accelerated backend can
/// cache one GPU upload per texture.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    id: u64,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Texture {
    /// Returns `InvalidDimensions` for a zero-sized image or a pixel buffer
    /// whose length is not `width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions);
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or(RenderError::InvalidDimensions)?;
        if pixels.len() != expected {
            return Err(RenderError::InvalidDimensions);
        }
        Ok(Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            width,
            height,
            pixels,
        })
    }

    /// A single-color texture, mostly useful in tests.
    pub fn solid(width: u32, height: u32, color: Rgba) -> Result<Self, RenderError> {
        let px = color.to_rgba8();
        let count = (width as usize).saturating_mul(height as usize);
        Self::from_rgba8(width, height, px.repeat(count))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn texel(&self, x: u32, y: u32) -> Rgba {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[i..i + 4];
        Rgba::new(
            p[0] as f32 / 255.0,
            p[1] as f32 / 255.0,
            p[2] as f32 / 255.0,
            p[3] as f32 / 255.0,
        )
    }

    /// Bilinear sample with clamp-to-edge; `v = 0` is the bottom row, as in GL.
    pub fn sample(&self, u: f32, v: f32) -> Rgba {
        let u = if u.is_nan() { 0.0 } else { u.clamp(0.0, 1.0) };
        let v = if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) };
        let fx = (u * self.width as f32 - 0.5).max(0.0);
        let fy = ((1.0 - v) * self.height as f32 - 0.5).max(0.0);
        let x0 = (fx as u32).min(self.width - 1);
        let y0 = (fy as u32).min(self.height - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;
        let top = self.texel(x0, y0).lerp(self.texel(x1, y0), tx);
        let bottom = self.texel(x0, y1).lerp(self.texel(x1, y1), tx);
        top.lerp(bottom, ty)
    }
}
