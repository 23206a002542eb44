//! GPU backend on top of `glow`.
//!
//! Draws into the host's default framebuffer. Quads are a shared unit quad
//! positioned by uniforms; line and point parts get one vertex buffer each,
//! re-uploaded only when the primitive's revision changes.

use super::pixels::PixelBuffer;
use super::Backend;
use crate::camera::OrthoCamera;
use crate::color::Rgba;
use crate::config::{BackendKind, GradientKind, MAX_WAVES};
use crate::error::RenderError;
use crate::material::{padded_stops, Material};
use crate::primitive::{Part, Primitive, PrimitiveId};
use crate::render::programs::{Programs, VERTEX_FLOATS};
use crate::render::{GlVersion, TextureCache};
use crate::scene::{Scene, SceneHost};
use crate::stats::{FrameStats, RenderStats};
use crate::surface::{Surface, SurfaceHandle};
use glow::HasContext;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Logical line width, scaled by the pixel ratio. Drivers may clamp it.
const LINE_WIDTH: f32 = 1.5;

struct PartBuffer {
    buffer: glow::Buffer,
    vertices: i32,
    bytes: usize,
}

struct PrimitiveBuffers {
    revision: u64,
    /// Indexed like `Primitive::parts`; `None` for quads.
    parts: Vec<Option<PartBuffer>>,
}

struct GlState {
    gl: Rc<glow::Context>,
    programs: Programs,
    vao: glow::VertexArray,
    quad: glow::Buffer,
    textures: TextureCache,
    buffers: HashMap<PrimitiveId, PrimitiveBuffers>,
}

pub struct AcceleratedBackend {
    state: Option<GlState>,
    surface: Option<Surface>,
    scene: Scene,
    camera: OrthoCamera,
    stats: FrameStats,
    clear_color: Rgba,
}

impl AcceleratedBackend {
    pub fn new() -> Self {
        Self {
            state: None,
            surface: None,
            scene: Scene::new(),
            camera: OrthoCamera::default(),
            stats: FrameStats::new(),
            clear_color: Rgba::BLACK,
        }
    }

    pub fn with_clear_color(mut self, color: Rgba) -> Self {
        self.clear_color = color;
        self
    }
}

impl Default for AcceleratedBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn f32_bytes(data: &[f32]) -> Vec<u8> {
    data.iter().flat_map(|f| f.to_ne_bytes()).collect()
}

/// Interleaves a part's vertices as position, color, size.
fn vertex_data(part: &Part) -> Option<Vec<f32>> {
    let mut out = Vec::new();
    match part {
        Part::Quad(_) => return None,
        Part::Lines(lines) => {
            out.reserve(lines.len() * VERTEX_FLOATS);
            for (p, c) in lines.positions.iter().zip(&lines.colors) {
                out.extend_from_slice(&[p.x, p.y, c.r, c.g, c.b, c.a, 0.0]);
            }
        }
        Part::Points(points) => {
            out.reserve(points.len() * VERTEX_FLOATS);
            let iter = points.positions.iter().zip(&points.colors).zip(&points.sizes);
            for ((p, c), s) in iter {
                out.extend_from_slice(&[p.x, p.y, c.r, c.g, c.b, c.a, *s]);
            }
        }
    }
    Some(out)
}

impl GlState {
    #[allow(unsafe_code)]
    fn new(gl: Rc<glow::Context>) -> Result<Self, RenderError> {
        let programs = Programs::compile(&gl)?;
        // SAFETY: plain object creation on a current context.
        let (vao, quad) = unsafe {
            let vao = gl.create_vertex_array().map_err(RenderError::Shader)?;
            let quad = gl.create_buffer().map_err(RenderError::Shader)?;
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(quad));
            let corners: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &f32_bytes(&corners), glow::STATIC_DRAW);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            if !GlVersion::of(&gl).embedded {
                gl.enable(glow::PROGRAM_POINT_SIZE);
            }
            (vao, quad)
        };
        Ok(Self {
            gl,
            programs,
            vao,
            quad,
            textures: TextureCache::new(),
            buffers: HashMap::new(),
        })
    }

    /// Uploads changed vertex data for `primitive`.
    #[allow(unsafe_code)]
    fn sync_buffers(&mut self, primitive: &Primitive) -> Result<(), RenderError> {
        let gl = &self.gl;
        let entry = self
            .buffers
            .entry(primitive.id())
            .or_insert_with(|| PrimitiveBuffers {
                revision: u64::MAX,
                parts: Vec::new(),
            });
        if entry.revision == primitive.revision() && entry.parts.len() == primitive.parts.len() {
            return Ok(());
        }
        entry.parts.resize_with(primitive.parts.len(), || None);
        for (part, slot) in primitive.parts.iter().zip(entry.parts.iter_mut()) {
            let Some(data) = vertex_data(part) else {
                if let Some(old) = slot.take() {
                    // SAFETY: buffer created below on this context.
                    unsafe { gl.delete_buffer(old.buffer) };
                }
                continue;
            };
            let buffer = match slot {
                Some(existing) => existing.buffer,
                // SAFETY: plain object creation on a current context.
                None => unsafe { gl.create_buffer().map_err(RenderError::PerFrameRenderError)? },
            };
            let bytes = f32_bytes(&data);
            // SAFETY: `buffer` is a live buffer object on this context.
            unsafe {
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, &bytes, glow::DYNAMIC_DRAW);
            }
            *slot = Some(PartBuffer {
                buffer,
                vertices: (data.len() / VERTEX_FLOATS) as i32,
                bytes: bytes.len(),
            });
        }
        entry.revision = primitive.revision();
        Ok(())
    }

    #[allow(unsafe_code)]
    fn release_buffers(&self, buffers: PrimitiveBuffers) {
        for part in buffers.parts.into_iter().flatten() {
            // SAFETY: created by `sync_buffers` on this context.
            unsafe { self.gl.delete_buffer(part.buffer) };
        }
    }

    fn gpu_bytes(&self) -> u64 {
        let vertices: usize = self
            .buffers
            .values()
            .flat_map(|b| b.parts.iter().flatten())
            .map(|p| p.bytes)
            .sum();
        vertices as u64
    }

    #[allow(unsafe_code)]
    fn draw_quad(
        &mut self,
        primitive: &Primitive,
        material: &Material,
        alpha: f32,
    ) -> Result<(), RenderError> {
        let texture = match material {
            Material::Texture(t) => match &t.texture {
                Some(tex) => Some(
                    self.textures
                        .get_or_upload(&self.gl, tex)
                        .map_err(RenderError::PerFrameRenderError)?,
                ),
                None => None,
            },
            _ => None,
        };
        let gl = &self.gl;
        let u = &self.programs.quad_uniforms;
        // SAFETY: all handles belong to this context; uniform arrays are
        // sized to the shader's MAX_STOPS / MAX_WAVES.
        unsafe {
            gl.use_program(Some(self.programs.quad));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.quad));
            gl.enable_vertex_attrib_array(self.programs.quad_pos);
            gl.vertex_attrib_pointer_f32(self.programs.quad_pos, 2, glow::FLOAT, false, 8, 0);
            gl.uniform_1_i32(u.mode.as_ref(), material.mode());
            gl.uniform_1_f32(u.opacity.as_ref(), alpha);
            gl.uniform_2_f32(u.scale.as_ref(), primitive.scale.x, primitive.scale.y);
            gl.uniform_2_f32(u.offset.as_ref(), primitive.offset.x, primitive.offset.y);
            match material {
                Material::Solid(c) => {
                    gl.uniform_4_f32_slice(u.color.as_ref(), &c.to_array());
                }
                Material::Gradient(g) => {
                    let stops: Vec<f32> = padded_stops(&g.stops)
                        .iter()
                        .flat_map(|c| c.to_array())
                        .collect();
                    gl.uniform_4_f32_slice(u.stops.as_ref(), &stops);
                    gl.uniform_1_i32(u.stop_count.as_ref(), g.stops.len() as i32);
                    let kind = match g.kind {
                        GradientKind::Linear => 0,
                        GradientKind::Radial => 1,
                        GradientKind::Conic => 2,
                    };
                    gl.uniform_1_i32(u.kind.as_ref(), kind);
                    gl.uniform_1_f32(u.angle.as_ref(), g.angle_deg);
                    gl.uniform_1_f32(u.phase.as_ref(), g.phase);
                }
                Material::Waves(w) => {
                    gl.uniform_1_i32(u.wave_count.as_ref(), w.wave_count.min(MAX_WAVES) as i32);
                    gl.uniform_1_f32_slice(u.freq.as_ref(), &w.frequencies);
                    gl.uniform_1_f32_slice(u.amp.as_ref(), &w.amplitudes);
                    let colors: Vec<f32> = w.colors.iter().flat_map(|c| c.to_array()).collect();
                    gl.uniform_4_f32_slice(u.wave_colors.as_ref(), &colors);
                    gl.uniform_1_f32(u.top.as_ref(), w.top_coverage);
                    gl.uniform_1_f32(u.bottom.as_ref(), w.bottom_coverage);
                    gl.uniform_1_f32(u.phase.as_ref(), w.phase);
                }
                Material::Texture(t) => {
                    gl.uniform_4_f32_slice(u.color.as_ref(), &t.base.to_array());
                    gl.uniform_1_i32(u.has_tex.as_ref(), i32::from(texture.is_some()));
                    gl.uniform_2_f32(u.uv_scale.as_ref(), t.uv_scale.x, t.uv_scale.y);
                    gl.uniform_2_f32(u.uv_offset.as_ref(), t.uv_offset.x, t.uv_offset.y);
                    gl.active_texture(glow::TEXTURE0);
                    gl.bind_texture(glow::TEXTURE_2D, texture);
                    gl.uniform_1_i32(u.tex.as_ref(), 0);
                }
            }
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
            gl.disable_vertex_attrib_array(self.programs.quad_pos);
        }
        Ok(())
    }

    /// Draws a line or point part from its uploaded buffer.
    #[allow(unsafe_code)]
    fn draw_vertices(
        &self,
        buffer: &PartBuffer,
        points: bool,
        camera: &OrthoCamera,
        backing_height: u32,
        alpha: f32,
        line_width: f32,
    ) {
        let p = &self.programs;
        let (program, attribs, u, mode) = if points {
            (p.points, &p.points_attribs, &p.points_uniforms, glow::POINTS)
        } else {
            (p.lines, &p.lines_attribs, &p.lines_uniforms, glow::LINES)
        };
        let stride = (VERTEX_FLOATS * 4) as i32;
        let gl = &self.gl;
        let scale = camera.ndc_scale();
        // SAFETY: `buffer` holds `vertices * VERTEX_FLOATS` floats laid out
        // as the attribute pointers below describe.
        unsafe {
            gl.use_program(Some(program));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer.buffer));
            for (attr, (size, offset)) in attribs.iter().zip([(2, 0), (4, 8), (1, 24)]) {
                if let Some(index) = *attr {
                    gl.enable_vertex_attrib_array(index);
                    gl.vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset);
                }
            }
            gl.uniform_2_f32(u.ndc_scale.as_ref(), scale.x, scale.y);
            gl.uniform_1_f32(
                u.pixels_per_unit.as_ref(),
                camera.pixels_per_unit(backing_height),
            );
            gl.uniform_1_f32(u.opacity.as_ref(), alpha);
            if !points {
                gl.line_width(line_width);
            }
            gl.draw_arrays(mode, 0, buffer.vertices);
            for index in attribs.iter().flatten() {
                gl.disable_vertex_attrib_array(*index);
            }
        }
    }

    #[allow(unsafe_code)]
    fn delete(mut self) {
        for (_, buffers) in std::mem::take(&mut self.buffers) {
            self.release_buffers(buffers);
        }
        self.textures.clear(&self.gl);
        self.programs.delete(&self.gl);
        // SAFETY: created in `GlState::new` on this context.
        unsafe {
            self.gl.delete_buffer(self.quad);
            self.gl.delete_vertex_array(self.vao);
        }
    }
}

impl Backend for AcceleratedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Accelerated
    }

    fn initialize(&mut self, surface: &SurfaceHandle) -> Result<(), RenderError> {
        if surface.width == 0 || surface.height == 0 {
            return Err(RenderError::InvalidDimensions);
        }
        let gl = surface.gl.clone().ok_or(RenderError::NoBackendAvailable)?;
        if !GlVersion::of(&gl).supports_es3_shaders() {
            return Err(RenderError::NoBackendAvailable);
        }
        if let Some(old) = self.state.take() {
            old.delete();
        }
        let state = GlState::new(gl)?;
        let logical = Surface::new(surface.width, surface.height, surface.pixel_ratio);
        self.camera.set_aspect(logical.aspect());
        self.surface = Some(logical);
        self.state = Some(state);
        self.stats.reset();
        tracing::debug!(
            width = logical.backing_width(),
            height = logical.backing_height(),
            "accelerated backend initialized"
        );
        Ok(())
    }

    #[allow(unsafe_code)]
    fn render(&mut self, delta_ms: f64) -> Result<(), RenderError> {
        let (Some(state), Some(surface)) = (self.state.as_mut(), self.surface) else {
            return Ok(());
        };
        let (bw, bh) = (surface.backing_width(), surface.backing_height());
        let c = self.clear_color;
        // SAFETY: default framebuffer of the context we were given.
        unsafe {
            let gl = &state.gl;
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(0, 0, bw as i32, bh as i32);
            gl.clear_color(c.r, c.g, c.b, c.a);
            gl.clear(glow::COLOR_BUFFER_BIT);
            gl.enable(glow::BLEND);
            gl.blend_func_separate(
                glow::SRC_ALPHA,
                glow::ONE_MINUS_SRC_ALPHA,
                glow::ONE,
                glow::ONE_MINUS_SRC_ALPHA,
            );
            gl.bind_vertex_array(Some(state.vao));
        }

        let line_width = LINE_WIDTH * surface.pixel_ratio() as f32;
        let mut draws = 0;
        let mut failures = Vec::new();
        let mut live = HashSet::new();
        for handle in self.scene.primitives() {
            let Ok(primitive) = handle.try_borrow() else {
                failures.push("primitive busy".to_string());
                continue;
            };
            live.insert(primitive.id());
            if !primitive.visible || primitive.is_disposed() || primitive.opacity <= 0.0 {
                continue;
            }
            if let Err(e) = state.sync_buffers(&primitive) {
                failures.push(e.to_string());
                continue;
            }
            let alpha = primitive.opacity.clamp(0.0, 1.0);
            for (index, part) in primitive.parts.iter().enumerate() {
                let drawn = match part {
                    Part::Quad(material) => state.draw_quad(&primitive, material, alpha),
                    Part::Lines(_) | Part::Points(_) => {
                        let buffer = state
                            .buffers
                            .get(&primitive.id())
                            .and_then(|b| b.parts.get(index))
                            .and_then(Option::as_ref);
                        if let Some(buffer) = buffer {
                            let points = matches!(part, Part::Points(_));
                            state.draw_vertices(buffer, points, &self.camera, bh, alpha, line_width);
                        }
                        Ok(())
                    }
                };
                match drawn {
                    Ok(()) => draws += 1,
                    Err(e) => failures.push(e.to_string()),
                }
            }
        }

        let stale: Vec<PrimitiveId> = state
            .buffers
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(buffers) = state.buffers.remove(&id) {
                state.release_buffers(buffers);
            }
        }
        state.textures.evict_unused(&state.gl);
        // SAFETY: unbinding on the same context.
        unsafe { state.gl.bind_vertex_array(None) };

        self.stats.record(delta_ms, draws, Some(state.gpu_bytes()));
        if failures.is_empty() {
            Ok(())
        } else {
            Err(RenderError::PerFrameRenderError(failures.join("; ")))
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        surface.set_size(width.max(1), height.max(1));
        self.camera.set_aspect(surface.aspect());
    }

    fn dispose(&mut self) {
        self.surface = None;
        self.scene.clear();
        if let Some(state) = self.state.take() {
            state.delete();
            tracing::debug!("accelerated backend disposed");
        }
    }

    fn stats(&self) -> RenderStats {
        self.stats.snapshot()
    }

    fn surface(&self) -> Option<Surface> {
        self.surface
    }

    fn camera(&self) -> Option<OrthoCamera> {
        self.surface.map(|_| self.camera)
    }

    fn as_scene_host(&mut self) -> Option<&mut dyn SceneHost> {
        if self.state.is_some() {
            Some(&mut self.scene)
        } else {
            None
        }
    }

    #[allow(unsafe_code)]
    fn read_pixels(&self) -> Option<PixelBuffer> {
        let (state, surface) = (self.state.as_ref()?, self.surface?);
        let (w, h) = (surface.backing_width(), surface.backing_height());
        let row = w as usize * 4;
        let mut raw = vec![0u8; row * h as usize];
        // SAFETY: `raw` holds exactly `w * h` RGBA8 pixels.
        unsafe {
            state.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            state.gl.pixel_store_i32(glow::PACK_ALIGNMENT, 1);
            state.gl.read_pixels(
                0,
                0,
                w as i32,
                h as i32,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelPackData::Slice(Some(&mut raw)),
            );
        }
        // GL rows start at the bottom.
        let mut out = PixelBuffer::new(w, h);
        let mut flipped = Vec::with_capacity(raw.len());
        for line in raw.chunks_exact(row).rev() {
            flipped.extend_from_slice(line);
        }
        out.copy_from_rgba8(&flipped);
        Some(out)
    }
}
