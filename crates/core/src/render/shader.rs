//! Shader compilation and linking for the accelerated backend.
//!
//! The compile/link functions need a live `glow::Context`; the error
//! formatting is plain string processing and is tested on its own.

use crate::error::RenderError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ShaderError {
    /// A stage failed to compile. `log` is the numbered source plus the driver log.
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: &'static str, log: String },
    #[error("program failed to link:\n{0}")]
    Link(String),
    /// `glGetUniformLocation` / `glGetAttribLocation` found nothing.
    #[error("missing shader input '{0}'")]
    MissingInput(String),
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::Shader(err.to_string())
    }
}

/// Prefixes each line of `source` with its right-aligned line number and
/// appends the driver's `log`, so log line references can be read in place.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let width = lines.len().max(1).to_string().len();
    let numbered = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");
    match (numbered.is_empty(), log.is_empty()) {
        (true, _) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

fn stage_name(shader_type: u32) -> &'static str {
    match shader_type {
        glow::VERTEX_SHADER => "vertex",
        glow::FRAGMENT_SHADER => "fragment",
        _ => "unknown",
    }
}

#[allow(unsafe_code)]
pub fn compile_shader(
    gl: &glow::Context,
    shader_type: u32,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    use glow::HasContext;

    let stage = stage_name(shader_type);
    // SAFETY: `shader_type` is a GL shader enum and the handle is deleted on
    // the failure path before returning.
    unsafe {
        let shader = gl
            .create_shader(shader_type)
            .map_err(|log| ShaderError::Compile { stage, log })?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if gl.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = format_shader_error(source, &gl.get_shader_info_log(shader));
            gl.delete_shader(shader);
            Err(ShaderError::Compile { stage, log })
        }
    }
}

/// Compiles both stages and links them. Stage objects are always deleted.
#[allow(unsafe_code)]
pub fn compile_program(
    gl: &glow::Context,
    vertex_src: &str,
    fragment_src: &str,
) -> Result<glow::Program, ShaderError> {
    use glow::HasContext;

    let vert = compile_shader(gl, glow::VERTEX_SHADER, vertex_src)?;
    let frag = match compile_shader(gl, glow::FRAGMENT_SHADER, fragment_src) {
        Ok(frag) => frag,
        Err(e) => {
            // SAFETY: `vert` came from a successful compile above.
            unsafe { gl.delete_shader(vert) };
            return Err(e);
        }
    };

    // SAFETY: both stage handles are valid; the program keeps its own copy
    // once linked, so the stages are detached and deleted either way.
    unsafe {
        let program = match gl.create_program() {
            Ok(p) => p,
            Err(log) => {
                gl.delete_shader(vert);
                gl.delete_shader(frag);
                return Err(ShaderError::Link(log));
            }
        };
        gl.attach_shader(program, vert);
        gl.attach_shader(program, frag);
        gl.link_program(program);
        gl.detach_shader(program, vert);
        gl.detach_shader(program, frag);
        gl.delete_shader(vert);
        gl.delete_shader(frag);
        if gl.get_program_link_status(program) {
            Ok(program)
        } else {
            let log = gl.get_program_info_log(program);
            gl.delete_program(program);
            Err(ShaderError::Link(log))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_every_source_line() {
        let out = format_shader_error("#version 300 es\nvoid main() {\n}", "ERROR: 0:2");
        assert!(out.contains("1: #version 300 es"), "{out}");
        assert!(out.contains("3: }"), "{out}");
        assert!(out.ends_with("ERROR: 0:2"), "{out}");
    }

    #[test]
    fn right_aligns_short_numbers() {
        let src = (1..=12).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let out = format_shader_error(&src, "");
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], " 1: l1");
        assert_eq!(lines[11], "12: l12");
    }

    #[test]
    fn empty_inputs() {
        assert_eq!(format_shader_error("", "log only"), "log only");
        assert!(format_shader_error("", "").is_empty());
    }

    #[test]
    fn converts_into_render_error() {
        let err: RenderError = ShaderError::Compile {
            stage: "fragment",
            log: "undeclared identifier".into(),
        }
        .into();
        assert!(matches!(&err, RenderError::Shader(m) if m.contains("fragment")));
    }

    #[test]
    #[ignore = "requires GL context"]
    fn quad_program_links_on_es3() {
        // Would test: compile_program(gl, vs, fs) returns Ok, and a broken
        // fragment source returns ShaderError carrying the numbered source and log.
    }
}
