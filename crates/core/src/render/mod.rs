//! OpenGL / WebGL2 plumbing for the accelerated backend.
//!
//! Only available with the `render` feature.
//!
//! - [`shader`] -- compilation, linking, and error formatting.
//! - [`programs`] -- the quad, line and point programs.
//! - [`texture`] -- RGBA8 uploads and the per-backend texture cache.
//! - [`context`] -- GL version requirements.

pub mod context;
pub mod programs;
pub mod shader;
pub mod texture;

pub use context::GlVersion;
pub use programs::Programs;
pub use shader::{compile_program, compile_shader, format_shader_error, ShaderError};
pub use texture::{create_texture, TextureCache, TextureConfig};
