#![deny(unsafe_code)]
//! Sine-wave band background.
//!
//! A single full-view quad shaded by [`WavesMaterial`]: up to eight sine
//! waves interfere along the horizontal axis and push the inner edge of a
//! band at the top and bottom of the frame. Both backends evaluate the same
//! shading, so band placement agrees between them.
//!
//! Changing `waveCount` is structural: a new primitive is built and the old
//! one is swapped out through scene events.

use backdrop_core::config::{defaults, WavesConfig, MAX_WAVES};
use backdrop_core::material::{Material, WavesMaterial};
use backdrop_core::params::apply_patch;
use backdrop_core::{
    BackgroundKind, ConfigChange, Generator, Part, Primitive, PrimitiveRef, RenderError,
    SceneEvent, BACKGROUND_SLOT,
};
use serde_json::Value;
use std::f32::consts::TAU;

/// Per-wave frequency used when the config lists fewer than `waveCount`.
pub const FALLBACK_FREQUENCIES: [f32; MAX_WAVES] = [1.0, 1.6, 2.3, 3.1, 3.8, 4.7, 5.5, 6.4];
/// Per-wave amplitude used when the config lists fewer than `waveCount`.
pub const FALLBACK_AMPLITUDES: [f32; MAX_WAVES] = [0.5, 0.35, 0.25, 0.15, 0.12, 0.1, 0.08, 0.06];

/// Builds the material for `config` at `phase`.
pub fn material_for(config: &WavesConfig, phase: f32) -> WavesMaterial {
    let mut frequencies = FALLBACK_FREQUENCIES;
    let mut amplitudes = FALLBACK_AMPLITUDES;
    for (slot, f) in frequencies.iter_mut().zip(&config.frequencies) {
        *slot = *f;
    }
    for (slot, a) in amplitudes.iter_mut().zip(&config.amplitudes) {
        *slot = *a;
    }
    WavesMaterial {
        wave_count: config.wave_count.min(MAX_WAVES),
        frequencies,
        amplitudes,
        phase,
        colors: config.colors,
        top_coverage: config.top_coverage,
        bottom_coverage: config.bottom_coverage,
    }
}

pub struct WavesGenerator {
    config: WavesConfig,
    /// Accumulated `elapsed * speed`, kept in `[0, TAU)`.
    phase: f32,
    visible: bool,
    primitive: Option<PrimitiveRef>,
    /// Replaced primitives, disposed once the owner has detached them.
    retired: Vec<PrimitiveRef>,
    events: Vec<SceneEvent>,
}

impl WavesGenerator {
    pub fn new(config: WavesConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            config,
            phase: 0.0,
            visible: true,
            primitive: None,
            retired: Vec::new(),
            events: Vec::new(),
        })
    }

    pub fn from_json(patch: &Value) -> Result<Self, RenderError> {
        Self::new(apply_patch(&defaults::waves(), patch)?)
    }

    pub fn waves_config(&self) -> &WavesConfig {
        &self.config
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    fn build(&self) -> PrimitiveRef {
        let mut primitive = Primitive::new(
            BACKGROUND_SLOT,
            vec![Part::Quad(Material::Waves(material_for(&self.config, self.phase)))],
        );
        primitive.visible = self.visible;
        PrimitiveRef::new(primitive)
    }

    fn release_retired(&mut self) {
        for p in self.retired.drain(..) {
            p.borrow_mut().dispose();
        }
    }
}

impl Generator for WavesGenerator {
    fn kind(&self) -> BackgroundKind {
        BackgroundKind::Waves
    }

    fn create(&mut self) -> PrimitiveRef {
        if let Some(p) = &self.primitive {
            return p.clone();
        }
        let handle = self.build();
        self.primitive = Some(handle.clone());
        handle
    }

    fn update(&mut self, delta_ms: f64) {
        self.release_retired();
        let Some(primitive) = &self.primitive else {
            return;
        };
        let dt = (delta_ms / 1000.0) as f32;
        self.phase = (self.phase + dt * self.config.speed).rem_euclid(TAU);
        if let Some(Material::Waves(m)) = primitive.borrow_mut().quad_material_mut() {
            m.phase = self.phase;
        }
    }

    fn update_config(&mut self, patch: &Value) -> Result<ConfigChange, RenderError> {
        let next = apply_patch(&self.config, patch)?;
        next.validate()?;
        if next == self.config {
            return Ok(ConfigChange::Unchanged);
        }
        let structural = next.wave_count != self.config.wave_count;
        self.config = next;
        if structural {
            if let Some(old) = self.primitive.take() {
                let replacement = self.build();
                self.events.push(SceneEvent::Detach(old.id()));
                self.events.push(SceneEvent::Attach(replacement.clone()));
                self.retired.push(old);
                self.primitive = Some(replacement);
            }
            tracing::debug!(waves = self.config.wave_count, "waves rebuilt");
            return Ok(ConfigChange::Structural);
        }
        if let Some(p) = &self.primitive {
            if let Some(m) = p.borrow_mut().quad_material_mut() {
                *m = Material::Waves(material_for(&self.config, self.phase));
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
        self.events.clear();
        self.release_retired();
        if let Some(p) = self.primitive.take() {
            p.borrow_mut().dispose();
        }
    }

    fn primitive(&self) -> Option<PrimitiveRef> {
        self.primitive.clone()
    }

    fn drain_scene_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }
}
