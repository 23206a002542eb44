//! Quad materials and their CPU shading.
//!
//! Each `shade` function here has a line-for-line twin in the quad fragment
//! shader (`render::programs::QUAD_FRAGMENT_SHADER`). The software backend
//! calls these directly, the accelerated backend uploads the same fields as
//! uniforms, and the two paths therefore agree on band placement, stop
//! positions and fit.
//!
//! Coordinates: `uv` in [0, 1], `v = 1` at the top edge.

use crate::color::{sample_stops, Rgba};
use crate::config::{GradientKind, MAX_STOPS, MAX_WAVES};
use crate::texture::Texture;
use glam::Vec2;
use std::f32::consts::{FRAC_1_SQRT_2, TAU};
use std::rc::Rc;

/// Per-wave phase offset, radians. Wave `i` runs at `phase + i * WAVE_PHASE_STEP`.
pub const WAVE_PHASE_STEP: f32 = 1.7;
/// Soft edge width of the band mask, as a fraction of the band depth.
pub const BAND_FEATHER: f32 = 0.15;
/// How far the wave pushes the band boundary around its rest depth.
pub const BAND_SWING: f32 = 0.3;
const BAND_REST: f32 = 0.7;
/// Radial gradients breathe by this fraction of their radius.
pub const RADIAL_BREATH: f32 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct GradientMaterial {
    pub stops: Vec<Rgba>,
    pub angle_deg: f32,
    pub kind: GradientKind,
    /// Accumulated animation phase, radians.
    pub phase: f32,
}

impl GradientMaterial {
    /// Gradient coordinate in [0, 1] at `uv`.
    pub fn coordinate(&self, uv: Vec2) -> f32 {
        let p = uv - Vec2::splat(0.5);
        let t = match self.kind {
            GradientKind::Linear => {
                let theta = self.angle_deg.to_radians() + self.phase;
                let dir = Vec2::new(theta.sin(), theta.cos());
                let half = 0.5 * (dir.x.abs() + dir.y.abs());
                if half <= f32::EPSILON {
                    0.5
                } else {
                    p.dot(dir) / (2.0 * half) + 0.5
                }
            }
            GradientKind::Radial => {
                let r = p.length() / FRAC_1_SQRT_2;
                r * (1.0 + RADIAL_BREATH * self.phase.sin())
            }
            GradientKind::Conic => {
                let theta = self.angle_deg.to_radians() + self.phase;
                ((p.x.atan2(p.y) - theta) / TAU).rem_euclid(1.0)
            }
        };
        t.clamp(0.0, 1.0)
    }

    pub fn shade(&self, uv: Vec2) -> Rgba {
        sample_stops(&self.stops, self.coordinate(uv))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WavesMaterial {
    pub wave_count: usize,
    pub frequencies: [f32; MAX_WAVES],
    pub amplitudes: [f32; MAX_WAVES],
    /// `elapsed_seconds * speed`, radians.
    pub phase: f32,
    /// Primary, secondary, highlight.
    pub colors: [Rgba; 3],
    pub top_coverage: f32,
    pub bottom_coverage: f32,
}

impl WavesMaterial {
    /// Normalized interference value in [-1, 1] at horizontal position `u`.
    pub fn wave_value(&self, u: f32) -> f32 {
        let n = self.wave_count.min(MAX_WAVES);
        let mut sum = 0.0;
        let mut weight = 0.0;
        for i in 0..n {
            let a = self.amplitudes[i];
            let phase = self.phase + i as f32 * WAVE_PHASE_STEP;
            sum += a * (TAU * self.frequencies[i] * u + phase).sin();
            weight += a;
        }
        if weight <= f32::EPSILON {
            0.0
        } else {
            (sum / weight).clamp(-1.0, 1.0)
        }
    }

    /// Band opacity for a point `depth` into a band of size `coverage`
    /// (depth 0 at the surface edge). `w` displaces the inner boundary.
    pub fn band_mask(depth: f32, coverage: f32, w: f32) -> f32 {
        if coverage <= f32::EPSILON {
            return 0.0;
        }
        let d = depth / coverage;
        let boundary = BAND_REST + BAND_SWING * w;
        1.0 - smoothstep(boundary - BAND_FEATHER, boundary, d)
    }

    /// Shades a pixel given precomputed column values.
    ///
    /// `w_top` is `wave_value(u)` and `w_bottom` is `wave_value(1 - u)`; the
    /// software path evaluates them once per column.
    pub fn shade_with(&self, w_top: f32, w_bottom: f32, v: f32) -> Rgba {
        let top = Self::band_mask(1.0 - v, self.top_coverage, w_top);
        let bottom = Self::band_mask(v, self.bottom_coverage, w_bottom);
        let (mask, w) = if top >= bottom { (top, w_top) } else { (bottom, w_bottom) };
        if mask <= 0.0 {
            return Rgba::TRANSPARENT;
        }
        let intensity = 0.5 + 0.5 * w;
        let base = self.colors[0].lerp(self.colors[1], intensity);
        let color = base.lerp(self.colors[2], smoothstep(0.6, 1.0, w));
        color.with_alpha_scaled(mask)
    }

    pub fn shade(&self, uv: Vec2) -> Rgba {
        self.shade_with(self.wave_value(uv.x), self.wave_value(1.0 - uv.x), uv.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureMaterial {
    pub texture: Option<Rc<Texture>>,
    pub uv_scale: Vec2,
    pub uv_offset: Vec2,
    /// Drawn when no texture is attached.
    pub base: Rgba,
}

impl Default for TextureMaterial {
    fn default() -> Self {
        Self {
            texture: None,
            uv_scale: Vec2::ONE,
            uv_offset: Vec2::ZERO,
            base: Rgba::TRANSPARENT,
        }
    }
}

impl TextureMaterial {
    pub fn shade(&self, uv: Vec2) -> Rgba {
        match &self.texture {
            Some(tex) => {
                let st = uv * self.uv_scale + self.uv_offset;
                tex.sample(st.x, st.y)
            }
            None => self.base,
        }
    }
}

/// What a quad draws.
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Solid(Rgba),
    Gradient(GradientMaterial),
    Waves(WavesMaterial),
    Texture(TextureMaterial),
}

impl Material {
    pub fn shade(&self, uv: Vec2) -> Rgba {
        match self {
            Material::Solid(c) => *c,
            Material::Gradient(g) => g.shade(uv),
            Material::Waves(w) => w.shade(uv),
            Material::Texture(t) => t.shade(uv),
        }
    }

    /// Shader mode index; keep in sync with `u_mode` in the quad shader.
    pub fn mode(&self) -> i32 {
        match self {
            Material::Solid(_) => 0,
            Material::Gradient(_) => 1,
            Material::Waves(_) => 2,
            Material::Texture(_) => 3,
        }
    }
}

/// Hermite smoothstep, identical to GLSL `smoothstep`.
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge1 == edge0 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Pads `stops` to the shader's fixed array size by repeating the last stop.
pub fn padded_stops(stops: &[Rgba]) -> [Rgba; MAX_STOPS] {
    let last = stops.last().copied().unwrap_or(Rgba::TRANSPARENT);
    let mut out = [last; MAX_STOPS];
    for (slot, c) in out.iter_mut().zip(stops) {
        *slot = *c;
    }
    out
}
