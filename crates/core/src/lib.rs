#![deny(unsafe_code)]
//! Core of the backdrop background renderer.
//!
//! Provides the [`RenderEngine`] and its frame loop, the [`Backend`] trait
//! with Software-2D and (behind the `render` feature) accelerated
//! implementations, the scene/primitive model generators draw through, the
//! shared material shading, config types with their default table, and the
//! [`Generator`] contract.

pub mod backend;
pub mod camera;
pub mod capability;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod material;
pub mod params;
pub mod primitive;
pub mod scene;
pub mod scheduler;
pub mod stats;
pub mod surface;
pub mod texture;

#[cfg(feature = "render")]
pub mod render;

pub use backend::{create_backend, Backend, PixelBuffer, Software2dBackend};
pub use camera::OrthoCamera;
pub use capability::{supports_accelerated, supports_software, CapabilityProbe, FixedProbe, HostProbe};
pub use color::Rgba;
pub use config::{BackendKind, BackgroundKind, RenderConfig};
pub use engine::{FrameContext, RenderEngine};
pub use error::RenderError;
pub use generator::{ConfigChange, Generator, BACKGROUND_SLOT};
pub use material::Material;
pub use primitive::{Part, Primitive, PrimitiveId, PrimitiveRef};
pub use scene::{Scene, SceneEvent, SceneHost};
pub use scheduler::{FrameRequest, FrameScheduler, ManualScheduler};
pub use stats::RenderStats;
pub use surface::{Surface, SurfaceHandle};
pub use texture::Texture;

#[cfg(feature = "render")]
pub use backend::AcceleratedBackend;
