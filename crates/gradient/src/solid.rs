//! Single-color background.

use backdrop_core::config::{defaults, SolidConfig};
use backdrop_core::params::apply_patch;
use backdrop_core::{
    BackgroundKind, ConfigChange, Generator, Material, Part, Primitive, PrimitiveRef,
    RenderError, BACKGROUND_SLOT,
};
use serde_json::Value;

pub struct SolidGenerator {
    config: SolidConfig,
    visible: bool,
    primitive: Option<PrimitiveRef>,
}

impl SolidGenerator {
    pub fn new(config: SolidConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            config,
            visible: true,
            primitive: None,
        })
    }

    pub fn from_json(patch: &Value) -> Result<Self, RenderError> {
        Self::new(apply_patch(&defaults::solid(), patch)?)
    }
}

impl Generator for SolidGenerator {
    fn kind(&self) -> BackgroundKind {
        BackgroundKind::Solid
    }

    fn create(&mut self) -> PrimitiveRef {
        if let Some(p) = &self.primitive {
            return p.clone();
        }
        let mut primitive = Primitive::new(
            BACKGROUND_SLOT,
            vec![Part::Quad(Material::Solid(self.config.color))],
        );
        primitive.visible = self.visible;
        let handle = PrimitiveRef::new(primitive);
        self.primitive = Some(handle.clone());
        handle
    }

    fn update(&mut self, _delta_ms: f64) {}

    fn update_config(&mut self, patch: &Value) -> Result<ConfigChange, RenderError> {
        let next = apply_patch(&self.config, patch)?;
        next.validate()?;
        if next == self.config {
            return Ok(ConfigChange::Unchanged);
        }
        self.config = next;
        if let Some(p) = &self.primitive {
            if let Some(m) = p.borrow_mut().quad_material_mut() {
                *m = Material::Solid(self.config.color);
            }
        }
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
