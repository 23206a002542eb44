//! Engine and generator configuration types, plus the default table.
//!
//! Every generator config serializes with camelCase keys, matching the JSON
//! objects the configuration store produces. Structural ranges (counts,
//! densities, coverage fractions) are enforced by each config's `validate`,
//! which generators call before any rebuild.

use crate::color::Rgba;
use crate::error::RenderError;
use crate::params::check_range;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Upper bound on gradient stops and waves; matches the shader uniform arrays.
pub const MAX_STOPS: usize = 8;
pub const MAX_WAVES: usize = 8;

/// Which drawing backend renders the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// GPU rendering through a GL context (`render` feature).
    Accelerated,
    /// CPU rasterization into an off-screen pixel buffer.
    Software2d,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Accelerated => "accelerated",
            BackendKind::Software2d => "software-2d",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "accelerated" | "gpu" => Some(BackendKind::Accelerated),
            "software-2d" | "software" | "2d" => Some(BackendKind::Software2d),
            _ => None,
        }
    }
}

/// Per-engine settings. Only `target_fps` may change after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub preferred_backend: Option<BackendKind>,
    pub target_fps: f64,
    pub auto_start: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            preferred_backend: None,
            target_fps: 60.0,
            auto_start: true,
        }
    }
}

impl RenderConfig {
    /// Milliseconds per frame at the target rate.
    pub fn target_frame_time(&self) -> f64 {
        1000.0 / self.target_fps
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.target_fps.is_finite() && self.target_fps > 0.0 && self.target_fps <= 1000.0 {
            Ok(())
        } else {
            Err(RenderError::invalid_config(
                "targetFps",
                format!("{} is outside (0, 1000]", self.target_fps),
            ))
        }
    }
}

/// The background types the core knows how to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Gradient,
    Solid,
    Waves,
    Neural,
    Image,
}

const BACKGROUND_KINDS: &[BackgroundKind] = &[
    BackgroundKind::Gradient,
    BackgroundKind::Solid,
    BackgroundKind::Waves,
    BackgroundKind::Neural,
    BackgroundKind::Image,
];

impl BackgroundKind {
    pub fn all() -> &'static [BackgroundKind] {
        BACKGROUND_KINDS
    }

    pub fn name(self) -> &'static str {
        match self {
            BackgroundKind::Gradient => "gradient",
            BackgroundKind::Solid => "solid",
            BackgroundKind::Waves => "waves",
            BackgroundKind::Neural => "neural",
            BackgroundKind::Image => "image",
        }
    }

    /// Returns `UnknownBackground` for unrecognized names.
    pub fn from_name(name: &str) -> Result<Self, RenderError> {
        BACKGROUND_KINDS
            .iter()
            .copied()
            .find(|k| k.name() == name)
            .ok_or_else(|| RenderError::UnknownBackground(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
    Conic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientConfig {
    pub colors: Vec<Rgba>,
    /// Degrees; 0 points up, 90 points right.
    pub angle: f32,
    #[serde(rename = "type")]
    pub kind: GradientKind,
    pub animated: bool,
    pub animation_speed: f32,
}

impl GradientConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        check_range("colors", self.colors.len(), 2, MAX_STOPS)?;
        check_finite("angle", self.angle)?;
        check_finite("animationSpeed", self.animation_speed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolidConfig {
    pub color: Rgba,
}

impl SolidConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WavesConfig {
    pub wave_count: usize,
    pub frequencies: Vec<f32>,
    pub amplitudes: Vec<f32>,
    pub speed: f32,
    /// Primary, secondary, highlight.
    pub colors: [Rgba; 3],
    pub top_coverage: f32,
    pub bottom_coverage: f32,
}

impl WavesConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        check_range("waveCount", self.wave_count, 2, MAX_WAVES)?;
        check_range("frequencies", self.frequencies.len(), 0, MAX_WAVES)?;
        check_range("amplitudes", self.amplitudes.len(), 0, MAX_WAVES)?;
        check_finite("speed", self.speed)?;
        check_range("topCoverage", self.top_coverage, 0.0, 0.5)?;
        check_range("bottomCoverage", self.bottom_coverage, 0.0, 0.5)?;
        for (i, f) in self.frequencies.iter().chain(&self.amplitudes).enumerate() {
            if !f.is_finite() || *f < 0.0 {
                return Err(RenderError::invalid_config(
                    "frequencies/amplitudes",
                    format!("entry {i} must be finite and non-negative"),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeuralConfig {
    pub node_count: usize,
    pub node_size: f32,
    pub connection_density: f32,
    pub data_flow_speed: f32,
    pub packet_count: usize,
    /// Node, connection, packet, glow, background.
    pub colors: [Rgba; 5],
}

impl NeuralConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        check_range("nodeCount", self.node_count, 15, 45)?;
        check_range("connectionDensity", self.connection_density, 0.2, 0.8)?;
        check_range("packetCount", self.packet_count, 10, 50)?;
        check_range("nodeSize", self.node_size, 0.1, 10.0)?;
        check_finite("dataFlowSpeed", self.data_flow_speed)?;
        if self.data_flow_speed < 0.0 {
            return Err(RenderError::invalid_config(
                "dataFlowSpeed",
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

/// Anchor of the image inside the target, in percent (0 = left/top).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImagePosition {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub source: String,
    pub fit: ImageFit,
    pub position: ImagePosition,
}

impl ImageConfig {
    pub fn validate(&self) -> Result<(), RenderError> {
        check_range("position.x", self.position.x, 0.0, 100.0)?;
        check_range("position.y", self.position.y, 0.0, 100.0)
    }
}

fn check_finite(field: &str, value: f32) -> Result<(), RenderError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RenderError::invalid_config(field, "must be finite"))
    }
}

/// The immutable default configuration for each background type.
pub mod defaults {
    use super::*;

    fn hex(s: &str) -> Rgba {
        // Literals below are known-good; fall back to black rather than panic.
        Rgba::from_hex(s).unwrap_or(Rgba::BLACK)
    }

    pub fn gradient() -> GradientConfig {
        GradientConfig {
            colors: vec![hex("#667eea"), hex("#764ba2")],
            angle: 135.0,
            kind: GradientKind::Linear,
            animated: false,
            animation_speed: 1.0,
        }
    }

    pub fn solid() -> SolidConfig {
        SolidConfig {
            color: hex("#1a1a2e"),
        }
    }

    pub fn waves() -> WavesConfig {
        WavesConfig {
            wave_count: 4,
            frequencies: vec![1.0, 1.6, 2.3, 3.1],
            amplitudes: vec![0.5, 0.35, 0.25, 0.15],
            speed: 1.0,
            colors: [hex("#667eea"), hex("#764ba2"), hex("#f093fb")],
            top_coverage: 0.25,
            bottom_coverage: 0.25,
        }
    }

    pub fn neural() -> NeuralConfig {
        NeuralConfig {
            node_count: 25,
            node_size: 1.0,
            connection_density: 0.5,
            data_flow_speed: 1.0,
            packet_count: 20,
            colors: [
                hex("#00d4ff"),
                hex("#0066ff"),
                hex("#00ffaa"),
                hex("#ffffff"),
                hex("#0a0a1a"),
            ],
        }
    }

    pub fn image() -> ImageConfig {
        ImageConfig {
            source: String::new(),
            fit: ImageFit::Cover,
            position: ImagePosition { x: 50.0, y: 50.0 },
        }
    }

    /// Default config for `kind` as a JSON object.
    pub fn for_kind(kind: BackgroundKind) -> Value {
        let value = match kind {
            BackgroundKind::Gradient => serde_json::to_value(gradient()),
            BackgroundKind::Solid => serde_json::to_value(solid()),
            BackgroundKind::Waves => serde_json::to_value(waves()),
            BackgroundKind::Neural => serde_json::to_value(neural()),
            BackgroundKind::Image => serde_json::to_value(image()),
        };
        value.unwrap_or(Value::Null)
    }
}
