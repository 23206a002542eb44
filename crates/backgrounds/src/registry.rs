//! Maps background kinds to generator implementations.

use backdrop_core::{
    BackgroundKind, ConfigChange, Generator, PrimitiveRef, RenderError, SceneEvent,
};
use backdrop_gradient::{GradientGenerator, SolidGenerator};
use backdrop_image::ImageGenerator;
use backdrop_neural::NeuralGenerator;
use backdrop_waves::WavesGenerator;
use serde_json::Value;

/// Enumeration of every background generator.
///
/// Wraps each implementation and delegates `Generator` methods. Use
/// [`BackgroundGenerator::from_kind`] or [`BackgroundGenerator::from_name`]
/// to construct one from a (possibly partial) JSON config.
pub enum BackgroundGenerator {
    Gradient(GradientGenerator),
    Solid(SolidGenerator),
    Waves(WavesGenerator),
    Neural(NeuralGenerator),
    Image(ImageGenerator),
}

macro_rules! dispatch {
    ($self:expr, $g:ident => $body:expr) => {
        match $self {
            BackgroundGenerator::Gradient($g) => $body,
            BackgroundGenerator::Solid($g) => $body,
            BackgroundGenerator::Waves($g) => $body,
            BackgroundGenerator::Neural($g) => $body,
            BackgroundGenerator::Image($g) => $body,
        }
    };
}

impl BackgroundGenerator {
    /// Builds the generator for `kind`, merging `config` over its defaults.
    ///
    /// Returns `InvalidConfig` if the merged config does not validate.
    pub fn from_kind(kind: BackgroundKind, config: &Value) -> Result<Self, RenderError> {
        let empty = Value::Object(serde_json::Map::new());
        let config = if config.is_null() { &empty } else { config };
        Ok(match kind {
            BackgroundKind::Gradient => Self::Gradient(GradientGenerator::from_json(config)?),
            BackgroundKind::Solid => Self::Solid(SolidGenerator::from_json(config)?),
            BackgroundKind::Waves => Self::Waves(WavesGenerator::from_json(config)?),
            BackgroundKind::Neural => Self::Neural(NeuralGenerator::from_json(config)?),
            BackgroundKind::Image => Self::Image(ImageGenerator::from_json(config)?),
        })
    }

    /// Returns `UnknownBackground` if the name is not recognized.
    pub fn from_name(name: &str, config: &Value) -> Result<Self, RenderError> {
        Self::from_kind(BackgroundKind::from_name(name)?, config)
    }

    /// Every recognized background name.
    pub fn list_backgrounds() -> Vec<&'static str> {
        BackgroundKind::all().iter().map(|k| k.name()).collect()
    }
}

impl Generator for BackgroundGenerator {
    fn kind(&self) -> BackgroundKind {
        dispatch!(self, g => g.kind())
    }

    fn create(&mut self) -> PrimitiveRef {
        dispatch!(self, g => g.create())
    }

    fn update(&mut self, delta_ms: f64) {
        dispatch!(self, g => g.update(delta_ms))
    }

    fn update_config(&mut self, patch: &Value) -> Result<ConfigChange, RenderError> {
        dispatch!(self, g => g.update_config(patch))
    }

    fn config(&self) -> Value {
        dispatch!(self, g => g.config())
    }

    fn set_visible(&mut self, visible: bool) {
        dispatch!(self, g => g.set_visible(visible))
    }

    fn resize(&mut self, width: u32, height: u32) {
        dispatch!(self, g => g.resize(width, height))
    }

    fn dispose(&mut self) {
        dispatch!(self, g => g.dispose())
    }

    fn primitive(&self) -> Option<PrimitiveRef> {
        dispatch!(self, g => g.primitive())
    }

    fn drain_scene_events(&mut self) -> Vec<SceneEvent> {
        dispatch!(self, g => g.drain_scene_events())
    }
}
