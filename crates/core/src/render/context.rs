//! GL version requirements.

/// GL versions the quad shaders can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
    /// OpenGL ES / WebGL rather than desktop GL.
    pub embedded: bool,
}

impl GlVersion {
    pub fn of(gl: &glow::Context) -> Self {
        use glow::HasContext;
        let v = gl.version();
        Self {
            major: v.major,
            minor: v.minor,
            embedded: v.is_embedded,
        }
    }

    /// GLSL ES 3.00 is available: ES 3.0+ (WebGL2), or desktop 4.3+ via
    /// `ARB_ES3_compatibility` in core.
    pub fn supports_es3_shaders(self) -> bool {
        if self.embedded {
            self.major >= 3
        } else {
            (self.major, self.minor) >= (4, 3)
        }
    }
}
