//! The contract every background generator implements.

use crate::config::BackgroundKind;
use crate::error::RenderError;
use crate::primitive::PrimitiveRef;
use crate::scene::SceneEvent;
use serde_json::Value;

/// Scene slot every background generator draws into.
pub const BACKGROUND_SLOT: &str = "background";

/// How `update_config` handled a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    /// The merged config equals the current one.
    Unchanged,
    /// Existing buffers were rewritten; the primitive stayed attached.
    InPlace,
    /// The data set changes cardinality. The generator has queued (or will
    /// queue, after a transition) a detach of the old primitive and an attach
    /// of its replacement; collect them with `drain_scene_events`.
    Structural,
}

/// A procedural background.
///
/// Object-safe, so the registry can hold `Box<dyn Generator>` when it needs
/// to. All methods run on the frame thread.
pub trait Generator {
    fn kind(&self) -> BackgroundKind;

    /// Builds the primitive. Calling again returns the same handle until a
    /// structural rebuild replaces it.
    fn create(&mut self) -> PrimitiveRef;

    /// Advances animation by `delta_ms`.
    fn update(&mut self, delta_ms: f64);

    /// Merges `patch` (a JSON object) onto the current config.
    ///
    /// Invalid patches return [`RenderError::InvalidConfig`] and leave the
    /// generator untouched.
    fn update_config(&mut self, patch: &Value) -> Result<ConfigChange, RenderError>;

    /// The current config as JSON.
    fn config(&self) -> Value;

    fn set_visible(&mut self, visible: bool);

    /// Viewport size in logical pixels. Only generators whose geometry
    /// depends on aspect ratio care.
    fn resize(&mut self, _width: u32, _height: u32) {}

    /// Frees buffers. The primitive must already be detached from any scene.
    fn dispose(&mut self);

    /// The current primitive, if `create` has run and `dispose` has not.
    fn primitive(&self) -> Option<PrimitiveRef>;

    /// Scene mutations requested since the last call.
    fn drain_scene_events(&mut self) -> Vec<SceneEvent> {
        Vec::new()
    }
}
