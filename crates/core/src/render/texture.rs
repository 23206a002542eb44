//! RGBA8 texture uploads for image backgrounds.
//!
//! GPU textures are cached by [`Texture::id`]; a texture that has not been
//! drawn for a frame is evicted at the end of that frame.

use crate::texture::Texture;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureConfig {
    pub width: u32,
    pub height: u32,
    pub internal_format: u32,
    pub filter: u32,
}

impl TextureConfig {
    /// 8-bit RGBA with linear filtering, the format decoded images use.
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            internal_format: glow::RGBA8,
            filter: glow::LINEAR,
        }
    }
}

/// Creates a clamp-to-edge texture and uploads `pixels` (top row first).
#[allow(unsafe_code)]
pub fn create_texture(
    gl: &glow::Context,
    config: &TextureConfig,
    pixels: Option<&[u8]>,
) -> Result<glow::Texture, String> {
    use glow::HasContext;

    // SAFETY: the texture is bound only for the duration of this call and
    // `pixels`, when present, holds `width * height * 4` bytes.
    unsafe {
        let texture = gl.create_texture()?;
        gl.bind_texture(glow::TEXTURE_2D, Some(texture));
        for (param, value) in [
            (glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE),
            (glow::TEXTURE_MIN_FILTER, config.filter),
            (glow::TEXTURE_MAG_FILTER, config.filter),
        ] {
            gl.tex_parameter_i32(glow::TEXTURE_2D, param, value as i32);
        }
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            config.internal_format as i32,
            config.width as i32,
            config.height as i32,
            0,
            glow::RGBA,
            glow::UNSIGNED_BYTE,
            glow::PixelUnpackData::Slice(pixels),
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
        Ok(texture)
    }
}

struct CachedTexture {
    handle: glow::Texture,
    used: bool,
}

#[derive(Default)]
pub struct TextureCache {
    entries: HashMap<u64, CachedTexture>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// GPU handle for `texture`, uploading it on first use.
    pub fn get_or_upload(
        &mut self,
        gl: &glow::Context,
        texture: &Texture,
    ) -> Result<glow::Texture, String> {
        if let Some(entry) = self.entries.get_mut(&texture.id()) {
            entry.used = true;
            return Ok(entry.handle);
        }
        let config = TextureConfig::rgba8(texture.width(), texture.height());
        let handle = create_texture(gl, &config, Some(texture.pixels()))?;
        tracing::debug!(
            id = texture.id(),
            width = texture.width(),
            height = texture.height(),
            "uploaded texture"
        );
        self.entries
            .insert(texture.id(), CachedTexture { handle, used: true });
        Ok(handle)
    }

    /// Deletes textures not requested since the previous call.
    #[allow(unsafe_code)]
    pub fn evict_unused(&mut self, gl: &glow::Context) {
        use glow::HasContext;
        self.entries.retain(|_, entry| {
            if entry.used {
                entry.used = false;
                true
            } else {
                // SAFETY: the handle was created by this cache and is no
                // longer referenced by any draw.
                unsafe { gl.delete_texture(entry.handle) };
                false
            }
        });
    }

    #[allow(unsafe_code)]
    pub fn clear(&mut self, gl: &glow::Context) {
        use glow::HasContext;
        for (_, entry) in self.entries.drain() {
            // SAFETY: see `evict_unused`.
            unsafe { gl.delete_texture(entry.handle) };
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba8_config() {
        let c = TextureConfig::rgba8(640, 480);
        assert_eq!((c.width, c.height), (640, 480));
        assert_eq!(c.internal_format, glow::RGBA8);
        assert_eq!(c.filter, glow::LINEAR);
    }

    #[test]
    fn new_cache_is_empty() {
        assert!(TextureCache::new().is_empty());
    }

    #[test]
    #[ignore = "requires GL context"]
    fn upload_is_cached_by_texture_id() {
        // Would test: get_or_upload twice with the same Texture leaves len() == 1,
        // and a second evict_unused without a request in between drops it.
    }
}
