//! Error types for the backdrop core.

use thiserror::Error;

/// Errors produced by engine, backend and generator operations.
///
/// Construction-time failures (`NoBackendAvailable`, `InvalidDimensions`)
/// are returned to the caller. Steady-state failures (`PerFrameRenderError`,
/// `TextureLoadFailed`) are logged and recovered where they occur.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Neither the accelerated nor the software backend is usable on the surface.
    #[error("no rendering backend available for this surface")]
    NoBackendAvailable,

    /// An image source could not be loaded or decoded.
    #[error("failed to load texture '{source_name}': {reason}")]
    TextureLoadFailed { source_name: String, reason: String },

    /// A single frame failed to render. The frame is skipped.
    #[error("frame render failed: {0}")]
    PerFrameRenderError(String),

    /// A configuration patch was rejected before being applied.
    #[error("invalid config for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    /// A primitive was attached to a scene slot that already holds one.
    #[error("scene slot '{0}' is already occupied")]
    SlotOccupied(String),

    /// Width or height was zero, or the pixel buffer size overflowed.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// A color string could not be parsed.
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A background type name was not recognized.
    #[error("unknown background type: {0}")]
    UnknownBackground(String),

    /// A GPU shader failed to compile or link.
    #[error("shader error: {0}")]
    Shader(String),

    /// File or stream I/O failed.
    #[error("I/O error: {0}")]
    Io(String),
}

impl RenderError {
    /// Shorthand for an [`RenderError::InvalidConfig`].
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
