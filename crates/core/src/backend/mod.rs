//! Rendering backends.
//!
//! - [`software`] -- CPU rasterizer with an off-screen back buffer.
//! - [`pixels`] -- RGBA8 pixel buffer and drawing helpers.
//! - `accelerated` -- glow renderer (`render` feature).
//!
//! The engine only ever talks to `dyn Backend`. Scene access goes through
//! [`Backend::as_scene_host`] so nothing needs to know which backend is live.

pub mod pixels;
pub mod software;

#[cfg(feature = "render")]
pub mod accelerated;

pub use pixels::{PixelBuffer, PixelRect};
pub use software::Software2dBackend;

#[cfg(feature = "render")]
pub use accelerated::AcceleratedBackend;

use crate::camera::OrthoCamera;
use crate::config::BackendKind;
use crate::error::RenderError;
use crate::scene::SceneHost;
use crate::stats::RenderStats;
use crate::surface::{Surface, SurfaceHandle};

/// One interchangeable drawing implementation.
///
/// Every method is safe to call after [`dispose`](Backend::dispose); those
/// calls are no-ops (`render` returns `Ok(())`).
pub trait Backend {
    fn kind(&self) -> BackendKind;

    /// Takes ownership of the surface: sizes buffers by the pixel ratio and
    /// sets up the camera.
    fn initialize(&mut self, surface: &SurfaceHandle) -> Result<(), RenderError>;

    /// Draws the scene once. `delta_ms` is the time since the last frame.
    fn render(&mut self, delta_ms: f64) -> Result<(), RenderError>;

    /// New logical size; backing size and camera are recomputed.
    fn resize(&mut self, width: u32, height: u32);

    /// Releases buffers and detaches everything from the scene.
    fn dispose(&mut self);

    fn stats(&self) -> RenderStats;

    fn surface(&self) -> Option<Surface>;

    fn camera(&self) -> Option<OrthoCamera>;

    /// The scene, for backends that keep one.
    fn as_scene_host(&mut self) -> Option<&mut dyn SceneHost>;

    /// The last presented frame as RGBA8, top row first.
    fn read_pixels(&self) -> Option<PixelBuffer>;
}

/// Constructs the backend for `kind`.
///
/// Asking for `Accelerated` without the `render` feature is reported as
/// `NoBackendAvailable`.
pub fn create_backend(kind: BackendKind) -> Result<Box<dyn Backend>, RenderError> {
    match kind {
        BackendKind::Software2d => Ok(Box::new(Software2dBackend::new())),
        #[cfg(feature = "render")]
        BackendKind::Accelerated => Ok(Box::new(AcceleratedBackend::new())),
        #[cfg(not(feature = "render"))]
        BackendKind::Accelerated => Err(RenderError::NoBackendAvailable),
    }
}
