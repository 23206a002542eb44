//! Color type used by every material and geometry buffer.
//!
//! Colors are straight (non-premultiplied) sRGB with alpha, components in
//! [0, 1], stored as `f32` so they can be copied into GPU buffers as-is.
//! Interpolation is a plain component-wise mix in sRGB space, which is what
//! the GLSL side does too; both backends therefore agree on every gradient.

use crate::error::RenderError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Straight-alpha sRGB color with components in [0, 1].
///
/// Serializes as `"#rrggbb"` when opaque and `"#rrggbbaa"` otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Rgba = Rgba::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color from 8-bit components.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Parses `"#rrggbb"`, `"rrggbb"`, `"#rrggbbaa"` or `"rrggbbaa"` (case insensitive).
    pub fn from_hex(hex: &str) -> Result<Rgba, RenderError> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 && hex.len() != 8 {
            return Err(RenderError::InvalidColor(format!(
                "expected 6 or 8 hex digits, got {}",
                hex.len()
            )));
        }
        if !hex.is_ascii() {
            return Err(RenderError::InvalidColor(format!("non-ascii color '{hex}'")));
        }
        let channel = |range: std::ops::Range<usize>, name: &str| {
            u8::from_str_radix(&hex[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|e| RenderError::InvalidColor(format!("invalid {name} component: {e}")))
        };
        let r = channel(0..2, "red")?;
        let g = channel(2..4, "green")?;
        let b = channel(4..6, "blue")?;
        let a = if hex.len() == 8 {
            channel(6..8, "alpha")?
        } else {
            1.0
        };
        Ok(Rgba { r, g, b, a })
    }

    /// Converts to `"#rrggbb"` (or `"#rrggbbaa"` when not fully opaque).
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }

    /// Quantizes to 8-bit RGBA with rounding and clamping.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Returns the same color with alpha multiplied by `factor`.
    pub fn with_alpha_scaled(self, factor: f32) -> Self {
        Self {
            a: (self.a * factor).clamp(0.0, 1.0),
            ..self
        }
    }

    /// Component-wise linear interpolation, `t` clamped to [0, 1].
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        Rgba {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Rgba::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Samples evenly spaced color stops at `t` in [0, 1].
///
/// `sample_stops(&[a], t)` is `a` for any `t`; an empty slice yields
/// transparent. Mirrors `sample_stops` in the quad fragment shader.
pub fn sample_stops(stops: &[Rgba], t: f32) -> Rgba {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    match stops.len() {
        0 => Rgba::TRANSPARENT,
        1 => stops[0],
        n => {
            let scaled = t * (n - 1) as f32;
            let idx = (scaled as usize).min(n - 2);
            let frac = scaled - idx as f32;
            stops[idx].lerp(stops[idx + 1], frac)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn close(a: Rgba, b: Rgba) -> bool {
        (a.r - b.r).abs() < EPS
            && (a.g - b.g).abs() < EPS
            && (a.b - b.b).abs() < EPS
            && (a.a - b.a).abs() < EPS
    }

    #[test]
    fn from_hex_parses_with_and_without_hash() {
        let a = Rgba::from_hex("#ff8000").unwrap();
        let b = Rgba::from_hex("FF8000").unwrap();
        assert!(close(a, b));
        assert!((a.r - 1.0).abs() < EPS);
        assert!((a.g - 128.0 / 255.0).abs() < EPS);
        assert_eq!(a.a, 1.0);
    }

    #[test]
    fn from_hex_parses_alpha_channel() {
        let c = Rgba::from_hex("#00000080").unwrap();
        assert!((c.a - 128.0 / 255.0).abs() < EPS);
    }

    #[test]
    fn from_hex_rejects_bad_length_and_digits() {
        assert!(Rgba::from_hex("#fff").is_err());
        assert!(Rgba::from_hex("#gg0000").is_err());
        assert!(Rgba::from_hex("").is_err());
    }

    #[test]
    fn from_hex_rejects_multibyte_input_without_panicking() {
        assert!(Rgba::from_hex("ééé").is_err());
    }

    #[test]
    fn to_hex_round_trips_opaque_and_translucent() {
        assert_eq!(Rgba::from_hex("#1a2b3c").unwrap().to_hex(), "#1a2b3c");
        assert_eq!(Rgba::from_hex("#1a2b3c40").unwrap().to_hex(), "#1a2b3c40");
    }

    #[test]
    fn serde_uses_hex_strings() {
        let c = Rgba::from_hex("#667eea").unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"#667eea\"");
        let back: Rgba = serde_json::from_str(&json).unwrap();
        assert!(close(c, back));
        assert!(serde_json::from_str::<Rgba>("\"nope\"").is_err());
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        assert!(close(Rgba::BLACK.lerp(Rgba::WHITE, 0.0), Rgba::BLACK));
        assert!(close(Rgba::BLACK.lerp(Rgba::WHITE, 1.0), Rgba::WHITE));
        let mid = Rgba::BLACK.lerp(Rgba::WHITE, 0.5);
        assert!((mid.g - 0.5).abs() < EPS);
    }

    #[test]
    fn lerp_clamps_and_handles_nan() {
        assert!(close(Rgba::BLACK.lerp(Rgba::WHITE, 7.0), Rgba::WHITE));
        assert!(close(Rgba::BLACK.lerp(Rgba::WHITE, f32::NAN), Rgba::BLACK));
    }

    #[test]
    fn sample_stops_hits_each_stop_exactly() {
        let stops = [
            Rgba::from_rgb8(255, 0, 0),
            Rgba::from_rgb8(0, 255, 0),
            Rgba::from_rgb8(0, 0, 255),
        ];
        assert!(close(sample_stops(&stops, 0.0), stops[0]));
        assert!(close(sample_stops(&stops, 0.5), stops[1]));
        assert!(close(sample_stops(&stops, 1.0), stops[2]));
    }

    #[test]
    fn sample_stops_degenerate_inputs() {
        assert!(close(sample_stops(&[], 0.3), Rgba::TRANSPARENT));
        assert!(close(sample_stops(&[Rgba::WHITE], 0.9), Rgba::WHITE));
    }

    #[test]
    fn with_alpha_scaled_clamps() {
        let c = Rgba::WHITE.with_alpha_scaled(0.25);
        assert!((c.a - 0.25).abs() < EPS);
        assert_eq!(Rgba::WHITE.with_alpha_scaled(4.0).a, 1.0);
    }
}
