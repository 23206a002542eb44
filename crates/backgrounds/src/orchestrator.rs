//! Owns the one live background generator and swaps it on request.
//!
//! The configuration store hands over `(kind, config, visible)` tuples.
//! [`Orchestrator::apply_background_state`] turns each one into the minimal
//! change: a config patch for the live generator, or a full swap when the
//! kind changes. A swap always detaches the old primitive from the scene
//! before the old generator frees it.

use crate::registry::BackgroundGenerator;
use backdrop_core::{BackgroundKind, ConfigChange, Generator, PrimitiveRef, RenderError, SceneHost};
use serde_json::Value;

/// What `apply_background_state` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// No generator was live; one of `kind` was created.
    Created,
    /// The live generator of this kind was replaced.
    Swapped { from: BackgroundKind },
    /// The live generator was reconfigured.
    Reconfigured(ConfigChange),
}

pub struct Orchestrator {
    active: Option<BackgroundGenerator>,
    visible: bool,
    viewport: Option<(u32, u32)>,
}

fn apply_events(generator: &mut BackgroundGenerator, scene: &mut dyn SceneHost) {
    for event in generator.drain_scene_events() {
        if let Err(e) = scene.apply(event) {
            tracing::warn!(error = %e, "scene event rejected");
        }
    }
}

fn detach_and_dispose(mut generator: BackgroundGenerator, scene: &mut dyn SceneHost) {
    apply_events(&mut generator, scene);
    if let Some(p) = generator.primitive() {
        scene.detach(p.id());
    }
    generator.dispose();
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            active: None,
            visible: true,
            viewport: None,
        }
    }

    /// Brings the scene in line with `(kind, config, visible)`.
    ///
    /// The new generator is built from `config` before anything is torn
    /// down, so an invalid config returns `InvalidConfig` and leaves the live
    /// background in place. When the kind matches, `config` is forwarded as
    /// a patch.
    pub fn apply_background_state(
        &mut self,
        scene: &mut dyn SceneHost,
        kind: BackgroundKind,
        config: &Value,
        visible: bool,
    ) -> Result<Applied, RenderError> {
        let applied = match self.active.as_mut().filter(|a| a.kind() == kind) {
            Some(active) => {
                let change = if config.is_null() {
                    ConfigChange::Unchanged
                } else {
                    active.update_config(config)?
                };
                apply_events(active, scene);
                Applied::Reconfigured(change)
            }
            None => {
                let mut next = BackgroundGenerator::from_kind(kind, config)?;
                let from = self.active.take().map(|old| {
                    let from = old.kind();
                    detach_and_dispose(old, scene);
                    from
                });
                next.set_visible(visible);
                if let Some((w, h)) = self.viewport {
                    next.resize(w, h);
                }
                let primitive = next.create();
                scene.attach(primitive)?;
                apply_events(&mut next, scene);
                self.active = Some(next);
                self.visible = visible;
                match from {
                    Some(from) => {
                        tracing::info!(from = from.name(), to = kind.name(), "background swapped");
                        Applied::Swapped { from }
                    }
                    None => {
                        tracing::info!(background = kind.name(), "background created");
                        Applied::Created
                    }
                }
            }
        };
        if visible != self.visible {
            self.visible = visible;
            if let Some(active) = self.active.as_mut() {
                active.set_visible(visible);
            }
        }
        Ok(applied)
    }

    /// Advances the live generator and applies the scene events it raised.
    ///
    /// Without a scene, events stay queued on the generator.
    pub fn update(&mut self, delta_ms: f64, scene: Option<&mut dyn SceneHost>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.update(delta_ms);
        if let Some(scene) = scene {
            apply_events(active, scene);
        }
    }

    /// Forwards a viewport change. Remembered for generators created later.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
        if let Some(active) = self.active.as_mut() {
            active.resize(width, height);
        }
    }

    /// Detaches the live primitive, then disposes the generator. Repeatable.
    pub fn dispose(&mut self, scene: Option<&mut dyn SceneHost>) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        match scene {
            Some(scene) => detach_and_dispose(active, scene),
            None => active.dispose(),
        }
    }

    pub fn active_kind(&self) -> Option<BackgroundKind> {
        self.active.as_ref().map(|g| g.kind())
    }

    pub fn active(&self) -> Option<&BackgroundGenerator> {
        self.active.as_ref()
    }

    pub fn primitive(&self) -> Option<PrimitiveRef> {
        self.active.as_ref()?.primitive()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backdrop_core::Scene;
    use serde_json::json;

    #[test]
    fn first_apply_creates_and_attaches() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        let applied = o
            .apply_background_state(&mut scene, BackgroundKind::Gradient, &json!({}), true)
            .unwrap();
        assert_eq!(applied, Applied::Created);
        assert_eq!(scene.primitive_count(), 1);
        assert!(scene.primitives()[0].ptr_eq(&o.primitive().unwrap()));
    }

    #[test]
    fn kind_change_detaches_then_disposes_old() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        o.apply_background_state(&mut scene, BackgroundKind::Gradient, &json!({}), true)
            .unwrap();
        let old = o.primitive().unwrap();
        let applied = o
            .apply_background_state(&mut scene, BackgroundKind::Waves, &json!({}), true)
            .unwrap();
        assert_eq!(applied, Applied::Swapped { from: BackgroundKind::Gradient });
        assert!(old.borrow().is_disposed());
        assert!(!scene.contains(old.id()));
        assert_eq!(scene.primitive_count(), 1);
        assert_eq!(o.active_kind(), Some(BackgroundKind::Waves));
    }

    #[test]
    fn same_kind_forwards_patch() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        o.apply_background_state(&mut scene, BackgroundKind::Solid, &json!({}), true)
            .unwrap();
        let p = o.primitive().unwrap();
        let applied = o
            .apply_background_state(&mut scene, BackgroundKind::Solid, &json!({"color": "#ff0000"}), true)
            .unwrap();
        assert_eq!(applied, Applied::Reconfigured(ConfigChange::InPlace));
        assert!(o.primitive().unwrap().ptr_eq(&p));
    }

    #[test]
    fn invalid_config_keeps_live_background() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        o.apply_background_state(&mut scene, BackgroundKind::Solid, &json!({}), true)
            .unwrap();
        let p = o.primitive().unwrap();
        let err = o
            .apply_background_state(&mut scene, BackgroundKind::Neural, &json!({"nodeCount": 2}), true)
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidConfig { .. }));
        assert_eq!(o.active_kind(), Some(BackgroundKind::Solid));
        assert!(scene.contains(p.id()));
        assert!(!p.borrow().is_disposed());
    }

    #[test]
    fn visibility_is_forwarded_on_change() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        o.apply_background_state(&mut scene, BackgroundKind::Solid, &json!({}), false)
            .unwrap();
        let p = o.primitive().unwrap();
        assert!(!p.borrow().visible);
        o.apply_background_state(&mut scene, BackgroundKind::Solid, &Value::Null, true)
            .unwrap();
        assert!(p.borrow().visible);
        assert!(o.is_visible());
    }

    #[test]
    fn structural_events_reach_the_scene() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        o.apply_background_state(&mut scene, BackgroundKind::Waves, &json!({"waveCount": 3}), true)
            .unwrap();
        let old = o.primitive().unwrap();
        let applied = o
            .apply_background_state(&mut scene, BackgroundKind::Waves, &json!({"waveCount": 5}), true)
            .unwrap();
        assert_eq!(applied, Applied::Reconfigured(ConfigChange::Structural));
        let new = o.primitive().unwrap();
        assert!(!new.ptr_eq(&old));
        assert!(scene.contains(new.id()));
        assert!(!scene.contains(old.id()));
        o.update(16.0, Some(&mut scene));
        assert!(old.borrow().is_disposed());
    }

    #[test]
    fn viewport_change_keeps_one_attached_primitive() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        o.resize(1920, 1080);
        o.apply_background_state(&mut scene, BackgroundKind::Neural, &json!({"nodeCount": 45}), true)
            .unwrap();
        let wide = o.primitive().unwrap();
        o.resize(1080, 1080);
        o.update(16.0, Some(&mut scene));
        let live = o.primitive().unwrap();
        assert_eq!(scene.primitive_count(), 1);
        assert!(scene.contains(live.id()));
        if !live.ptr_eq(&wide) {
            assert!(!scene.contains(wide.id()));
            o.update(16.0, Some(&mut scene));
            assert!(wide.borrow().is_disposed());
        }
    }

    #[test]
    fn dispose_with_pending_events_leaves_scene_empty() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        o.resize(1920, 1080);
        o.apply_background_state(&mut scene, BackgroundKind::Neural, &json!({"nodeCount": 45}), true)
            .unwrap();
        let wide = o.primitive().unwrap();
        o.resize(1000, 1000);
        o.dispose(Some(&mut scene));
        assert!(scene.is_empty());
        assert!(wide.borrow().is_disposed());
    }

    #[test]
    fn dispose_is_repeatable() {
        let mut scene = Scene::new();
        let mut o = Orchestrator::new();
        o.apply_background_state(&mut scene, BackgroundKind::Neural, &json!({}), true)
            .unwrap();
        let p = o.primitive().unwrap();
        o.dispose(Some(&mut scene));
        o.dispose(Some(&mut scene));
        o.update(16.0, Some(&mut scene));
        assert!(scene.is_empty());
        assert!(p.borrow().is_disposed());
        assert_eq!(o.active_kind(), None);
    }

    proptest::proptest! {
        #[test]
        fn any_apply_sequence_leaves_one_live_primitive(
            kinds in proptest::collection::vec(0usize..5, 1..12),
        ) {
            let mut scene = Scene::new();
            let mut o = Orchestrator::new();
            let mut retired = Vec::new();
            for k in kinds {
                let kind = BackgroundKind::all()[k];
                if let Some(p) = o.primitive() {
                    retired.push(p);
                }
                o.apply_background_state(&mut scene, kind, &json!({}), true).unwrap();
                o.update(16.0, Some(&mut scene));
            }
            proptest::prop_assert_eq!(scene.primitive_count(), 1);
            let live = o.primitive().unwrap();
            proptest::prop_assert!(scene.primitives()[0].ptr_eq(&live));
            for p in retired.iter().filter(|p| !p.ptr_eq(&live)) {
                proptest::prop_assert!(p.borrow().is_disposed());
            }
        }
    }
}
