//! Drawable primitives and the shared handle generators give to the scene.
//!
//! A generator owns its primitive outright; the scene only holds a
//! [`PrimitiveRef`] clone while it is attached. Everything runs on the
//! frame thread, so the handle is an `Rc<RefCell<_>>`.

use crate::color::Rgba;
use crate::material::Material;
use glam::Vec2;
use std::cell::{BorrowError, Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PRIMITIVE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveId(u64);

impl PrimitiveId {
    fn next() -> Self {
        Self(NEXT_PRIMITIVE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Point sprites in world space: one position, color and size per point.
///
/// Sizes are world-space diameters. Colors carry per-point opacity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointBuffer {
    pub positions: Vec<Vec2>,
    pub colors: Vec<Rgba>,
    pub sizes: Vec<f32>,
}

impl PointBuffer {
    pub fn with_len(len: usize) -> Self {
        Self {
            positions: vec![Vec2::ZERO; len],
            colors: vec![Rgba::TRANSPARENT; len],
            sizes: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Independent line segments: vertices `2k` and `2k + 1` form segment `k`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineBuffer {
    pub positions: Vec<Vec2>,
    pub colors: Vec<Rgba>,
}

impl LineBuffer {
    pub fn with_len(vertices: usize) -> Self {
        Self {
            positions: vec![Vec2::ZERO; vertices],
            colors: vec![Rgba::TRANSPARENT; vertices],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.positions.len() / 2
    }
}

/// One drawable part of a primitive. Parts draw in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    /// Covers the camera view, transformed by the primitive's scale/offset.
    Quad(Material),
    Lines(LineBuffer),
    Points(PointBuffer),
}

impl Part {
    /// Vertex count this part uploads.
    pub fn vertex_count(&self) -> usize {
        match self {
            Part::Quad(_) => 4,
            Part::Lines(l) => l.len(),
            Part::Points(p) => p.len(),
        }
    }
}

/// A drawable unit attached to a scene slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    id: PrimitiveId,
    slot: String,
    pub visible: bool,
    /// Multiplies every part's alpha.
    pub opacity: f32,
    /// Quad half-extents relative to the camera view (1 = full view).
    pub scale: Vec2,
    /// Quad center offset in view-relative units (-1..1 spans the view).
    pub offset: Vec2,
    pub parts: Vec<Part>,
    /// Bumped whenever buffer contents change so the GPU side can re-upload.
    revision: u64,
    disposed: bool,
}

impl Primitive {
    pub fn new(slot: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            id: PrimitiveId::next(),
            slot: slot.into(),
            visible: true,
            opacity: 1.0,
            scale: Vec2::ONE,
            offset: Vec2::ZERO,
            parts,
            revision: 0,
            disposed: false,
        }
    }

    pub fn id(&self) -> PrimitiveId {
        self.id
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Marks buffer contents as changed.
    pub fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Frees the part buffers. The primitive must already be detached.
    pub fn dispose(&mut self) {
        self.parts.clear();
        self.parts.shrink_to_fit();
        self.visible = false;
        self.disposed = true;
        self.touch();
    }

    /// Total vertices across all parts.
    pub fn buffer_len(&self) -> usize {
        self.parts.iter().map(Part::vertex_count).sum()
    }

    /// Approximate CPU-side buffer footprint in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p {
                Part::Quad(Material::Texture(t)) => t
                    .texture
                    .as_ref()
                    .map(|tex| tex.pixels().len())
                    .unwrap_or(0),
                Part::Quad(_) => 0,
                Part::Lines(l) => l.len() * (8 + 16),
                Part::Points(p) => p.len() * (8 + 16 + 4),
            })
            .sum()
    }

    /// First quad material, if any.
    pub fn quad_material(&self) -> Option<&Material> {
        self.parts.iter().find_map(|p| match p {
            Part::Quad(m) => Some(m),
            _ => None,
        })
    }

    pub fn quad_material_mut(&mut self) -> Option<&mut Material> {
        self.parts.iter_mut().find_map(|p| match p {
            Part::Quad(m) => Some(m),
            _ => None,
        })
    }
}

/// Shared handle to a primitive.
#[derive(Debug, Clone)]
pub struct PrimitiveRef(Rc<RefCell<Primitive>>);

impl PrimitiveRef {
    pub fn new(primitive: Primitive) -> Self {
        Self(Rc::new(RefCell::new(primitive)))
    }

    pub fn id(&self) -> PrimitiveId {
        self.0.borrow().id
    }

    pub fn borrow(&self) -> Ref<'_, Primitive> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Primitive> {
        self.0.borrow_mut()
    }

    /// Non-panicking borrow for the draw loop.
    pub fn try_borrow(&self) -> Result<Ref<'_, Primitive>, BorrowError> {
        self.0.try_borrow()
    }

    /// True when both handles point at the same primitive.
    pub fn ptr_eq(&self, other: &PrimitiveRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let a = Primitive::new("a", vec![]);
        let b = Primitive::new("a", vec![]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn buffer_len_sums_parts() {
        let p = Primitive::new(
            "bg",
            vec![
                Part::Quad(Material::Solid(Rgba::BLACK)),
                Part::Lines(LineBuffer::with_len(6)),
                Part::Points(PointBuffer::with_len(5)),
            ],
        );
        assert_eq!(p.buffer_len(), 4 + 6 + 5);
    }

    #[test]
    fn dispose_clears_parts_and_hides() {
        let mut p = Primitive::new("bg", vec![Part::Points(PointBuffer::with_len(3))]);
        let rev = p.revision();
        p.dispose();
        assert!(p.is_disposed());
        assert!(!p.visible);
        assert_eq!(p.buffer_len(), 0);
        assert_ne!(p.revision(), rev);
    }

    #[test]
    fn handles_share_state() {
        let a = PrimitiveRef::new(Primitive::new("bg", vec![]));
        let b = a.clone();
        b.borrow_mut().opacity = 0.25;
        assert_eq!(a.borrow().opacity, 0.25);
        assert!(a.ptr_eq(&b));
        let c = PrimitiveRef::new(Primitive::new("bg", vec![]));
        assert!(!a.ptr_eq(&c));
    }

    #[test]
    fn quad_material_finds_first_quad() {
        let mut p = Primitive::new(
            "bg",
            vec![
                Part::Points(PointBuffer::default()),
                Part::Quad(Material::Solid(Rgba::WHITE)),
            ],
        );
        assert_eq!(p.quad_material(), Some(&Material::Solid(Rgba::WHITE)));
        if let Some(Material::Solid(c)) = p.quad_material_mut() {
            *c = Rgba::BLACK;
        }
        assert_eq!(p.quad_material(), Some(&Material::Solid(Rgba::BLACK)));
    }
}
