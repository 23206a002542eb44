//! PNG snapshots of rendered frames.
//!
//! Feature-gated behind `png` (default on) so hosts that never write files
//! can depend on this crate without pulling in the `image` encoder.

use backdrop_core::{PixelBuffer, RenderError};
use std::path::Path;

/// Writes an RGBA8 frame as a PNG image.
///
/// Returns `RenderError::Io` on a size mismatch or write failure.
pub fn write_png(frame: &PixelBuffer, path: &Path) -> Result<(), RenderError> {
    let img = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| RenderError::Io("RGBA buffer size mismatch".into()))?;
    img.save(path).map_err(|e| RenderError::Io(e.to_string()))
}
