#![deny(unsafe_code)]
//! Static image background.
//!
//! One quad with a [`TextureMaterial`](backdrop_core::material::TextureMaterial).
//! Images decode off the frame thread through a [`TextureLoader`]; the
//! generator polls for results in `update` and refits whenever the texture,
//! the fit settings or the viewport change.

pub mod fit;
mod generator;
pub mod loader;

pub use fit::{compute_fit, FitTransform};
pub use generator::ImageGenerator;
pub use loader::{FileLoader, LoadedTexture, ManualLoader, TextureLoader};
