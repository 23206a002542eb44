//! RGBA8 pixel buffer and the software drawing helpers.
//!
//! All drawing is straight-alpha source-over. Rectangles are given in pixel
//! coordinates with the origin at the top-left corner.

use crate::color::{sample_stops, Rgba};
use crate::material::WavesMaterial;
use glam::Vec2;

/// A pixel rectangle `[x0, x1) x [y0, y1)` in floating point, so quads can
/// be placed with sub-pixel precision before clipping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PixelRect {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// `uv` of pixel center `(px, py)`, `v = 1` at the top edge.
    pub fn uv(&self, px: u32, py: u32) -> Vec2 {
        Vec2::new(
            (px as f32 + 0.5 - self.x0) / self.width(),
            1.0 - (py as f32 + 0.5 - self.y0) / self.height(),
        )
    }
}

/// Row-major RGBA8 pixels, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 4;
        Self {
            width,
            height,
            data: vec![0; len],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// Reallocates only when the size actually changes.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height {
            return;
        }
        *self = Self::new(width, height);
    }

    /// Releases the pixel storage.
    pub fn release(&mut self) {
        *self = Self::new(0, 0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Overwrites the contents with top-row-first RGBA8 `data` of the same size.
    pub fn copy_from_rgba8(&mut self, data: &[u8]) {
        if data.len() == self.data.len() {
            self.data.copy_from_slice(data);
        }
    }

    /// Copies `other` into `self` (the front-buffer blit).
    pub fn blit_from(&mut self, other: &PixelBuffer) {
        if self.width != other.width || self.height != other.height {
            *self = other.clone();
        } else {
            self.data.copy_from_slice(&other.data);
        }
    }

    pub fn clear(&mut self, color: Rgba) {
        let px = color.to_rgba8();
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    /// Source-over blend of `color` into pixel `(x, y)`. Out of range is ignored.
    pub fn blend(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height || color.a <= 0.0 {
            return;
        }
        let i = self.index(x, y);
        let a = color.a.clamp(0.0, 1.0);
        let dst = &mut self.data[i..i + 4];
        let src = [color.r, color.g, color.b];
        for c in 0..3 {
            let d = dst[c] as f32 / 255.0;
            dst[c] = ((src[c].clamp(0.0, 1.0) * a + d * (1.0 - a)) * 255.0).round() as u8;
        }
        let da = dst[3] as f32 / 255.0;
        dst[3] = ((a + da * (1.0 - a)) * 255.0).round() as u8;
    }

    /// Integer pixel bounds covered by `rect`, clipped to the buffer.
    fn clip(&self, rect: &PixelRect) -> Option<(u32, u32, u32, u32)> {
        let x0 = rect.x0.max(0.0).floor() as u32;
        let y0 = rect.y0.max(0.0).floor() as u32;
        let x1 = (rect.x1.min(self.width as f32).ceil().max(0.0) as u32).min(self.width);
        let y1 = (rect.y1.min(self.height as f32).ceil().max(0.0) as u32).min(self.height);
        if x0 >= x1 || y0 >= y1 || rect.width() <= 0.0 || rect.height() <= 0.0 {
            None
        } else {
            Some((x0, y0, x1, y1))
        }
    }

    pub fn fill_rect(&mut self, rect: &PixelRect, color: Rgba) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }

    /// Fills `rect` with a linear gradient along `angle_deg` (0 = up, 90 =
    /// right) over evenly spaced `stops`, measured in the rect's own uv space.
    ///
    /// Matches `GradientMaterial::coordinate` for linear gradients; the
    /// coordinate is affine in x and y so it is stepped, not recomputed.
    pub fn fill_linear_gradient(&mut self, rect: &PixelRect, angle_deg: f32, stops: &[Rgba], alpha: f32) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let theta = angle_deg.to_radians();
        let dir = Vec2::new(theta.sin(), theta.cos());
        let half = 0.5 * (dir.x.abs() + dir.y.abs());
        let norm = if half <= f32::EPSILON { 0.0 } else { 1.0 / (2.0 * half) };
        let du = 1.0 / rect.width();
        for y in y0..y1 {
            let uv0 = rect.uv(x0, y);
            let mut t = (uv0 - Vec2::splat(0.5)).dot(dir) * norm + 0.5;
            for x in x0..x1 {
                let c = sample_stops(stops, t).with_alpha_scaled(alpha);
                self.blend(x, y, c);
                t += dir.x * du * norm;
            }
        }
    }

    /// Fills `rect` pixel by pixel with `shade(uv)`.
    pub fn fill_shaded(&mut self, rect: &PixelRect, alpha: f32, shade: impl Fn(Vec2) -> Rgba) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let c = shade(rect.uv(x, y)).with_alpha_scaled(alpha);
                self.blend(x, y, c);
            }
        }
    }

    /// Draws the wave bands of `material` into `rect`.
    ///
    /// The interference value only depends on `u`, so it is evaluated once
    /// per column, and rows between the two bands are skipped.
    pub fn fill_waves(&mut self, rect: &PixelRect, material: &WavesMaterial, alpha: f32) {
        let Some((x0, y0, x1, y1)) = self.clip(rect) else {
            return;
        };
        let columns: Vec<(f32, f32)> = (x0..x1)
            .map(|x| {
                let u = rect.uv(x, y0).x;
                (material.wave_value(u), material.wave_value(1.0 - u))
            })
            .collect();
        for y in y0..y1 {
            let v = rect.uv(x0, y).y;
            if v < 1.0 - material.top_coverage && v > material.bottom_coverage {
                continue;
            }
            for (x, &(w_top, w_bottom)) in (x0..x1).zip(&columns) {
                let c = material.shade_with(w_top, w_bottom, v).with_alpha_scaled(alpha);
                self.blend(x, y, c);
            }
        }
    }

    /// Anti-aliased filled circle (one pixel of soft edge).
    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        if radius <= 0.0 || color.a <= 0.0 {
            return;
        }
        let rect = PixelRect::new(
            center.x - radius - 1.0,
            center.y - radius - 1.0,
            center.x + radius + 1.0,
            center.y + radius + 1.0,
        );
        let Some((x0, y0, x1, y1)) = self.clip(&rect) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let coverage = (radius + 0.5 - p.distance(center)).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, color.with_alpha_scaled(coverage));
                }
            }
        }
    }

    /// Anti-aliased line segment of `width` pixels, colors interpolated
    /// from `ca` at `a` to `cb` at `b`.
    pub fn stroke_line(&mut self, a: Vec2, b: Vec2, width: f32, ca: Rgba, cb: Rgba) {
        let half = (width * 0.5).max(0.5);
        let rect = PixelRect::new(
            a.x.min(b.x) - half - 1.0,
            a.y.min(b.y) - half - 1.0,
            a.x.max(b.x) + half + 1.0,
            a.y.max(b.y) + half + 1.0,
        );
        let Some((x0, y0, x1, y1)) = self.clip(&rect) else {
            return;
        };
        let ab = b - a;
        let len_sq = ab.length_squared();
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                let t = if len_sq <= f32::EPSILON {
                    0.0
                } else {
                    ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
                };
                let d = p.distance(a + ab * t);
                let coverage = (half + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, ca.lerp(cb, t).with_alpha_scaled(coverage));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_WAVES;

    fn full(buf: &PixelBuffer) -> PixelRect {
        PixelRect::new(0.0, 0.0, buf.width() as f32, buf.height() as f32)
    }

    #[test]
    fn clear_sets_every_pixel() {
        let mut b = PixelBuffer::new(3, 2);
        b.clear(Rgba::from_rgb8(10, 20, 30));
        assert_eq!(b.pixel(2, 1), Some([10, 20, 30, 255]));
        assert_eq!(b.pixel(3, 0), None);
    }

    #[test]
    fn blend_half_alpha_mixes() {
        let mut b = PixelBuffer::new(1, 1);
        b.clear(Rgba::BLACK);
        b.blend(0, 0, Rgba::WHITE.with_alpha_scaled(0.5));
        let [r, _, _, a] = b.pixel(0, 0).unwrap();
        assert!((127..=128).contains(&r));
        assert_eq!(a, 255);
    }

    #[test]
    fn resize_same_size_keeps_contents() {
        let mut b = PixelBuffer::new(2, 2);
        b.clear(Rgba::WHITE);
        b.resize(2, 2);
        assert_eq!(b.pixel(0, 0), Some([255, 255, 255, 255]));
        b.resize(4, 1);
        assert_eq!(b.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn blit_copies_pixels() {
        let mut back = PixelBuffer::new(2, 2);
        back.clear(Rgba::WHITE);
        let mut front = PixelBuffer::new(2, 2);
        front.blit_from(&back);
        assert_eq!(front, back);
    }

    #[test]
    fn fill_rect_clips_to_bounds() {
        let mut b = PixelBuffer::new(4, 4);
        b.fill_rect(&PixelRect::new(-10.0, -10.0, 2.0, 2.0), Rgba::WHITE);
        assert_eq!(b.pixel(1, 1), Some([255, 255, 255, 255]));
        assert_eq!(b.pixel(2, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn linear_gradient_90_runs_left_to_right() {
        let mut b = PixelBuffer::new(64, 8);
        b.fill_linear_gradient(&full(&b), 90.0, &[Rgba::BLACK, Rgba::WHITE], 1.0);
        let left = b.pixel(0, 4).unwrap()[0];
        let right = b.pixel(63, 4).unwrap()[0];
        assert!(left < 10, "left {left}");
        assert!(right > 245, "right {right}");
    }

    #[test]
    fn linear_gradient_matches_material_coordinate() {
        use crate::config::GradientKind;
        use crate::material::GradientMaterial;
        let stops = vec![Rgba::BLACK, Rgba::WHITE];
        let m = GradientMaterial {
            stops: stops.clone(),
            angle_deg: 135.0,
            kind: GradientKind::Linear,
            phase: 0.0,
        };
        let mut fast = PixelBuffer::new(32, 18);
        let rect = full(&fast);
        fast.fill_linear_gradient(&rect, 135.0, &stops, 1.0);
        let mut slow = PixelBuffer::new(32, 18);
        slow.fill_shaded(&rect, 1.0, |uv| m.shade(uv));
        for (a, b) in fast.data().iter().zip(slow.data()) {
            assert!((*a as i32 - *b as i32).abs() <= 1);
        }
    }

    #[test]
    fn waves_fast_path_matches_per_pixel_shading() {
        let m = WavesMaterial {
            wave_count: 2,
            frequencies: [1.0, 2.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            amplitudes: [0.6, 0.4, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            phase: 1.0,
            colors: [Rgba::from_rgb8(255, 0, 0), Rgba::from_rgb8(0, 0, 255), Rgba::WHITE],
            top_coverage: 0.3,
            bottom_coverage: 0.2,
        };
        assert_eq!(m.frequencies.len(), MAX_WAVES);
        let mut fast = PixelBuffer::new(40, 30);
        let rect = full(&fast);
        fast.fill_waves(&rect, &m, 1.0);
        let mut slow = PixelBuffer::new(40, 30);
        slow.fill_shaded(&rect, 1.0, |uv| m.shade(uv));
        assert_eq!(fast, slow);
    }

    #[test]
    fn circle_covers_center_not_corner() {
        let mut b = PixelBuffer::new(20, 20);
        b.fill_circle(Vec2::new(10.0, 10.0), 4.0, Rgba::WHITE);
        assert_eq!(b.pixel(10, 10).unwrap()[3], 255);
        assert_eq!(b.pixel(0, 0).unwrap()[3], 0);
    }

    #[test]
    fn line_touches_endpoints_only_along_path() {
        let mut b = PixelBuffer::new(20, 20);
        b.stroke_line(
            Vec2::new(2.0, 10.0),
            Vec2::new(18.0, 10.0),
            2.0,
            Rgba::WHITE,
            Rgba::WHITE,
        );
        assert!(b.pixel(10, 9).unwrap()[3] > 200);
        assert_eq!(b.pixel(10, 2).unwrap()[3], 0);
    }

    #[test]
    fn release_frees_storage() {
        let mut b = PixelBuffer::new(8, 8);
        b.release();
        assert_eq!(b.byte_len(), 0);
    }
}
