//! GLSL ES 3.00 programs for the accelerated backend.
//!
//! The quad fragment shader mirrors `crate::material` function for function;
//! changing one side means changing the other.

use super::shader::{compile_program, ShaderError};
use crate::config::{MAX_STOPS, MAX_WAVES};

/// Unit quad in [-1, 1], placed by `u_scale` / `u_offset` in NDC.
pub const QUAD_VERTEX_SHADER: &str = r#"#version 300 es
precision highp float;
in vec2 a_pos;
uniform vec2 u_scale;
uniform vec2 u_offset;
out vec2 v_uv;
void main() {
    v_uv = a_pos * 0.5 + 0.5;
    gl_Position = vec4(a_pos * u_scale + u_offset, 0.0, 1.0);
}
"#;

pub const QUAD_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
#define MAX_STOPS 8
#define MAX_WAVES 8
#define TAU 6.28318530718
#define FRAC_1_SQRT_2 0.70710678118

in vec2 v_uv;
out vec4 frag_color;

uniform int u_mode;
uniform float u_opacity;
uniform vec4 u_color;

uniform vec4 u_stops[MAX_STOPS];
uniform int u_stop_count;
uniform int u_kind;
uniform float u_angle;
uniform float u_phase;

uniform int u_wave_count;
uniform float u_freq[MAX_WAVES];
uniform float u_amp[MAX_WAVES];
uniform vec4 u_wave_colors[3];
uniform float u_top;
uniform float u_bottom;

uniform sampler2D u_tex;
uniform int u_has_tex;
uniform vec2 u_uv_scale;
uniform vec2 u_uv_offset;

vec4 sample_stops(float t) {
    t = clamp(t, 0.0, 1.0);
    if (u_stop_count <= 0) return vec4(0.0);
    if (u_stop_count == 1) return u_stops[0];
    float scaled = t * float(u_stop_count - 1);
    int idx = min(int(scaled), u_stop_count - 2);
    float frac = scaled - float(idx);
    return mix(u_stops[idx], u_stops[idx + 1], frac);
}

float gradient_coordinate(vec2 uv) {
    vec2 p = uv - 0.5;
    float t;
    if (u_kind == 0) {
        float theta = radians(u_angle) + u_phase;
        vec2 dir = vec2(sin(theta), cos(theta));
        float half_extent = 0.5 * (abs(dir.x) + abs(dir.y));
        t = dot(p, dir) / (2.0 * half_extent) + 0.5;
    } else if (u_kind == 1) {
        t = length(p) / FRAC_1_SQRT_2 * (1.0 + 0.15 * sin(u_phase));
    } else {
        float theta = radians(u_angle) + u_phase;
        t = fract((atan(p.x, p.y) - theta) / TAU);
    }
    return clamp(t, 0.0, 1.0);
}

float wave_value(float u) {
    float sum = 0.0;
    float weight = 0.0;
    for (int i = 0; i < MAX_WAVES; i++) {
        if (i >= u_wave_count) break;
        float phase = u_phase + float(i) * 1.7;
        sum += u_amp[i] * sin(TAU * u_freq[i] * u + phase);
        weight += u_amp[i];
    }
    return weight <= 1e-6 ? 0.0 : clamp(sum / weight, -1.0, 1.0);
}

float band_mask(float depth, float coverage, float w) {
    if (coverage <= 1e-6) return 0.0;
    float boundary = 0.7 + 0.3 * w;
    return 1.0 - smoothstep(boundary - 0.15, boundary, depth / coverage);
}

vec4 shade_waves(vec2 uv) {
    float w_top = wave_value(uv.x);
    float w_bottom = wave_value(1.0 - uv.x);
    float top = band_mask(1.0 - uv.y, u_top, w_top);
    float bottom = band_mask(uv.y, u_bottom, w_bottom);
    float mask = top >= bottom ? top : bottom;
    float w = top >= bottom ? w_top : w_bottom;
    if (mask <= 0.0) return vec4(0.0);
    vec4 base = mix(u_wave_colors[0], u_wave_colors[1], 0.5 + 0.5 * w);
    vec4 color = mix(base, u_wave_colors[2], smoothstep(0.6, 1.0, w));
    return vec4(color.rgb, color.a * mask);
}

vec4 shade_texture(vec2 uv) {
    if (u_has_tex == 0) return u_color;
    vec2 st = clamp(uv * u_uv_scale + u_uv_offset, 0.0, 1.0);
    return texture(u_tex, vec2(st.x, 1.0 - st.y));
}

void main() {
    vec4 c;
    if (u_mode == 0) c = u_color;
    else if (u_mode == 1) c = sample_stops(gradient_coordinate(v_uv));
    else if (u_mode == 2) c = shade_waves(v_uv);
    else c = shade_texture(v_uv);
    frag_color = vec4(c.rgb, c.a * u_opacity);
}
"#;

/// World-space vertices with per-vertex color, for lines and points.
pub const VERTEX_COLOR_SHADER: &str = r#"#version 300 es
precision highp float;
in vec2 a_pos;
in vec4 a_color;
in float a_size;
uniform vec2 u_ndc_scale;
uniform float u_pixels_per_unit;
out vec4 v_color;
void main() {
    v_color = a_color;
    gl_PointSize = max(a_size * u_pixels_per_unit, 1.0);
    gl_Position = vec4(a_pos * u_ndc_scale, 0.0, 1.0);
}
"#;

pub const LINE_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
in vec4 v_color;
uniform float u_opacity;
out vec4 frag_color;
void main() {
    frag_color = vec4(v_color.rgb, v_color.a * u_opacity);
}
"#;

/// Round, anti-aliased point sprites.
pub const POINT_FRAGMENT_SHADER: &str = r#"#version 300 es
precision highp float;
in vec4 v_color;
uniform float u_opacity;
out vec4 frag_color;
void main() {
    vec2 d = gl_PointCoord * 2.0 - 1.0;
    float r = length(d);
    float edge = fwidth(r);
    float coverage = 1.0 - smoothstep(1.0 - edge, 1.0, r);
    if (coverage <= 0.0) discard;
    frag_color = vec4(v_color.rgb, v_color.a * u_opacity * coverage);
}
"#;

/// Floats per line/point vertex: position (2), color (4), size (1).
pub const VERTEX_FLOATS: usize = 7;

#[allow(unsafe_code)]
fn uniform(
    gl: &glow::Context,
    program: glow::Program,
    name: &str,
) -> Option<glow::UniformLocation> {
    use glow::HasContext;
    // SAFETY: `program` is a linked program owned by the caller.
    unsafe { gl.get_uniform_location(program, name) }
}

#[allow(unsafe_code)]
fn attrib(gl: &glow::Context, program: glow::Program, name: &str) -> Result<u32, ShaderError> {
    use glow::HasContext;
    // SAFETY: `program` is a linked program owned by the caller.
    unsafe { gl.get_attrib_location(program, name) }
        .ok_or_else(|| ShaderError::MissingInput(name.to_string()))
}

/// Uniform locations of the quad program. Locations the driver optimized
/// away are `None`; glow ignores uniform writes to `None`.
pub struct QuadUniforms {
    pub mode: Option<glow::UniformLocation>,
    pub opacity: Option<glow::UniformLocation>,
    pub color: Option<glow::UniformLocation>,
    pub scale: Option<glow::UniformLocation>,
    pub offset: Option<glow::UniformLocation>,
    pub stops: Option<glow::UniformLocation>,
    pub stop_count: Option<glow::UniformLocation>,
    pub kind: Option<glow::UniformLocation>,
    pub angle: Option<glow::UniformLocation>,
    pub phase: Option<glow::UniformLocation>,
    pub wave_count: Option<glow::UniformLocation>,
    pub freq: Option<glow::UniformLocation>,
    pub amp: Option<glow::UniformLocation>,
    pub wave_colors: Option<glow::UniformLocation>,
    pub top: Option<glow::UniformLocation>,
    pub bottom: Option<glow::UniformLocation>,
    pub tex: Option<glow::UniformLocation>,
    pub has_tex: Option<glow::UniformLocation>,
    pub uv_scale: Option<glow::UniformLocation>,
    pub uv_offset: Option<glow::UniformLocation>,
}

pub struct VertexColorUniforms {
    pub ndc_scale: Option<glow::UniformLocation>,
    pub pixels_per_unit: Option<glow::UniformLocation>,
    pub opacity: Option<glow::UniformLocation>,
}

pub struct Programs {
    pub quad: glow::Program,
    pub quad_pos: u32,
    pub quad_uniforms: QuadUniforms,
    pub lines: glow::Program,
    pub lines_attribs: [Option<u32>; 3],
    pub lines_uniforms: VertexColorUniforms,
    pub points: glow::Program,
    pub points_attribs: [Option<u32>; 3],
    pub points_uniforms: VertexColorUniforms,
}

fn vertex_color_uniforms(gl: &glow::Context, program: glow::Program) -> VertexColorUniforms {
    VertexColorUniforms {
        ndc_scale: uniform(gl, program, "u_ndc_scale"),
        pixels_per_unit: uniform(gl, program, "u_pixels_per_unit"),
        opacity: uniform(gl, program, "u_opacity"),
    }
}

/// `a_size` is unused by the line program and may be optimized out.
fn vertex_color_attribs(gl: &glow::Context, program: glow::Program) -> [Option<u32>; 3] {
    ["a_pos", "a_color", "a_size"].map(|name| attrib(gl, program, name).ok())
}

impl Programs {
    pub fn compile(gl: &glow::Context) -> Result<Self, ShaderError> {
        debug_assert_eq!(MAX_STOPS, 8);
        debug_assert_eq!(MAX_WAVES, 8);

        let quad = compile_program(gl, QUAD_VERTEX_SHADER, QUAD_FRAGMENT_SHADER)?;
        let lines = compile_program(gl, VERTEX_COLOR_SHADER, LINE_FRAGMENT_SHADER)?;
        let points = compile_program(gl, VERTEX_COLOR_SHADER, POINT_FRAGMENT_SHADER)?;
        let u = |name: &str| uniform(gl, quad, name);
        let quad_uniforms = QuadUniforms {
            mode: u("u_mode"),
            opacity: u("u_opacity"),
            color: u("u_color"),
            scale: u("u_scale"),
            offset: u("u_offset"),
            stops: u("u_stops"),
            stop_count: u("u_stop_count"),
            kind: u("u_kind"),
            angle: u("u_angle"),
            phase: u("u_phase"),
            wave_count: u("u_wave_count"),
            freq: u("u_freq"),
            amp: u("u_amp"),
            wave_colors: u("u_wave_colors"),
            top: u("u_top"),
            bottom: u("u_bottom"),
            tex: u("u_tex"),
            has_tex: u("u_has_tex"),
            uv_scale: u("u_uv_scale"),
            uv_offset: u("u_uv_offset"),
        };
        Ok(Self {
            quad,
            quad_pos: attrib(gl, quad, "a_pos")?,
            quad_uniforms,
            lines,
            lines_attribs: vertex_color_attribs(gl, lines),
            lines_uniforms: vertex_color_uniforms(gl, lines),
            points,
            points_attribs: vertex_color_attribs(gl, points),
            points_uniforms: vertex_color_uniforms(gl, points),
        })
    }

    #[allow(unsafe_code)]
    pub fn delete(&self, gl: &glow::Context) {
        use glow::HasContext;
        // SAFETY: the programs were created by `compile` on this context.
        unsafe {
            gl.delete_program(self.quad);
            gl.delete_program(self.lines);
            gl.delete_program(self.points);
        }
    }
}
