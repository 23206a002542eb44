//! Linear, radial and conic gradients over 2..=8 evenly spaced stops.

use backdrop_core::config::{defaults, GradientConfig};
use backdrop_core::material::{GradientMaterial, Material};
use backdrop_core::params::apply_patch;
use backdrop_core::{
    BackgroundKind, ConfigChange, Generator, Part, Primitive, PrimitiveRef, RenderError,
    BACKGROUND_SLOT,
};
use serde_json::Value;
use std::f32::consts::TAU;

/// Animated gradient background.
///
/// When `animated` is set the phase advances by `animationSpeed` radians per
/// second: linear and conic gradients rotate, radial gradients breathe.
pub struct GradientGenerator {
    config: GradientConfig,
    phase: f32,
    visible: bool,
    primitive: Option<PrimitiveRef>,
}

impl GradientGenerator {
    pub fn new(config: GradientConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            config,
            phase: 0.0,
            visible: true,
            primitive: None,
        })
    }

    /// Defaults overlaid with `patch`.
    pub fn from_json(patch: &Value) -> Result<Self, RenderError> {
        Self::new(apply_patch(&defaults::gradient(), patch)?)
    }

    pub fn gradient_config(&self) -> &GradientConfig {
        &self.config
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    fn material(&self) -> GradientMaterial {
        GradientMaterial {
            stops: self.config.colors.clone(),
            angle_deg: self.config.angle,
            kind: self.config.kind,
            phase: self.phase,
        }
    }

    fn write_material(&self) {
        if let Some(primitive) = &self.primitive {
            let mut p = primitive.borrow_mut();
            if let Some(m) = p.quad_material_mut() {
                *m = Material::Gradient(self.material());
            }
        }
    }
}

impl Generator for GradientGenerator {
    fn kind(&self) -> BackgroundKind {
        BackgroundKind::Gradient
    }

    fn create(&mut self) -> PrimitiveRef {
        if let Some(p) = &self.primitive {
            return p.clone();
        }
        let mut primitive = Primitive::new(
            BACKGROUND_SLOT,
            vec![Part::Quad(Material::Gradient(self.material()))],
        );
        primitive.visible = self.visible;
        let handle = PrimitiveRef::new(primitive);
        self.primitive = Some(handle.clone());
        handle
    }

    fn update(&mut self, delta_ms: f64) {
        if !self.config.animated || self.primitive.is_none() {
            return;
        }
        let dt = (delta_ms / 1000.0) as f32;
        self.phase = (self.phase + self.config.animation_speed * dt).rem_euclid(TAU);
        if let Some(primitive) = &self.primitive {
            if let Some(Material::Gradient(g)) = primitive.borrow_mut().quad_material_mut() {
                g.phase = self.phase;
            }
        }
    }

    fn update_config(&mut self, patch: &Value) -> Result<ConfigChange, RenderError> {
        let next = apply_patch(&self.config, patch)?;
        next.validate()?;
        if next == self.config {
            return Ok(ConfigChange::Unchanged);
        }
        self.config = next;
        self.write_material();
        tracing::debug!(stops = self.config.colors.len(), "gradient updated in place");
        Ok(ConfigChange::InPlace)
    }

    fn config(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or(Value::Null)
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if let Some(p) = &self.primitive {
            p.borrow_mut().visible = visible;
        }
    }

    fn dispose(&mut self) {
        if let Some(p) = self.primitive.take() {
            p.borrow_mut().dispose();
        }
    }

    fn primitive(&self) -> Option<PrimitiveRef> {
        self.primitive.clone()
    }
}
