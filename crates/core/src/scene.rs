//! Ordered primitive list owned by a backend.
//!
//! The scene enforces one primitive per slot. Replacing a generator's
//! primitive is always detach-then-attach; attaching into an occupied slot
//! is an error rather than a silent overwrite.

use crate::error::RenderError;
use crate::primitive::{PrimitiveId, PrimitiveRef};

/// Scene mutations a generator asks its owner to perform on the frame thread.
#[derive(Debug, Clone)]
pub enum SceneEvent {
    Detach(PrimitiveId),
    Attach(PrimitiveRef),
}

/// Capability exposed by backends that keep a scene graph.
///
/// Obtained through [`Backend::as_scene_host`](crate::backend::Backend::as_scene_host)
/// instead of downcasting to a concrete backend.
pub trait SceneHost {
    fn attach(&mut self, primitive: PrimitiveRef) -> Result<(), RenderError>;

    /// Removes the primitive and returns the scene's handle to it.
    fn detach(&mut self, id: PrimitiveId) -> Option<PrimitiveRef>;

    fn contains(&self, id: PrimitiveId) -> bool;

    fn primitive_count(&self) -> usize;

    /// Applies one generator-issued event. Attach failures are returned.
    fn apply(&mut self, event: SceneEvent) -> Result<(), RenderError> {
        match event {
            SceneEvent::Detach(id) => {
                self.detach(id);
                Ok(())
            }
            SceneEvent::Attach(primitive) => self.attach(primitive),
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    primitives: Vec<PrimitiveRef>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Primitives in draw order (first attached draws first).
    pub fn primitives(&self) -> &[PrimitiveRef] {
        &self.primitives
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Detaches everything.
    pub fn clear(&mut self) {
        self.primitives.clear();
    }

    /// Primitive currently occupying `slot`.
    pub fn in_slot(&self, slot: &str) -> Option<&PrimitiveRef> {
        self.primitives.iter().find(|p| p.borrow().slot() == slot)
    }
}

impl SceneHost for Scene {
    fn attach(&mut self, primitive: PrimitiveRef) -> Result<(), RenderError> {
        let slot = primitive.borrow().slot().to_string();
        if let Some(existing) = self.in_slot(&slot) {
            if existing.ptr_eq(&primitive) {
                return Ok(());
            }
            return Err(RenderError::SlotOccupied(slot));
        }
        tracing::debug!(slot = %slot, id = %primitive.id(), "attach primitive");
        self.primitives.push(primitive);
        Ok(())
    }

    fn detach(&mut self, id: PrimitiveId) -> Option<PrimitiveRef> {
        let idx = self.primitives.iter().position(|p| p.id() == id)?;
        tracing::debug!(id = %id, "detach primitive");
        Some(self.primitives.remove(idx))
    }

    fn contains(&self, id: PrimitiveId) -> bool {
        self.primitives.iter().any(|p| p.id() == id)
    }

    fn primitive_count(&self) -> usize {
        self.primitives.len()
    }
}
