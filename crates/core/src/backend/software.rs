//! Software-2D backend.
//!
//! Each frame is drawn into an off-screen back buffer and then blitted to
//! the visible front buffer, so a reader of the front buffer never sees a
//! half-drawn frame. Quads are shaded with the same functions the GPU
//! shader mirrors (see [`crate::material`]).

use super::pixels::{PixelBuffer, PixelRect};
use super::Backend;
use crate::camera::OrthoCamera;
use crate::color::Rgba;
use crate::config::{BackendKind, GradientKind};
use crate::error::RenderError;
use crate::material::Material;
use crate::primitive::{Part, Primitive};
use crate::scene::{Scene, SceneHost};
use crate::stats::{FrameStats, RenderStats};
use crate::surface::{Surface, SurfaceHandle};
use glam::Vec2;

/// Logical line width for `Part::Lines`, scaled by the pixel ratio.
pub const LINE_WIDTH: f32 = 1.5;

pub struct Software2dBackend {
    surface: Option<Surface>,
    back: PixelBuffer,
    front: PixelBuffer,
    scene: Scene,
    camera: OrthoCamera,
    stats: FrameStats,
    clear_color: Rgba,
}

impl Software2dBackend {
    pub fn new() -> Self {
        Self {
            surface: None,
            back: PixelBuffer::new(0, 0),
            front: PixelBuffer::new(0, 0),
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

    /// The visible buffer (last completed frame).
    pub fn frame(&self) -> &PixelBuffer {
        &self.front
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    fn apply_size(&mut self, surface: Surface) {
        self.back.resize(surface.backing_width(), surface.backing_height());
        self.front.resize(surface.backing_width(), surface.backing_height());
        self.camera.set_aspect(surface.aspect());
        self.surface = Some(surface);
    }

    fn memory_bytes(&self) -> u64 {
        let prims: usize = self
            .scene
            .primitives()
            .iter()
            .filter_map(|p| p.try_borrow().ok().map(|p| p.memory_bytes()))
            .sum();
        (self.back.byte_len() + self.front.byte_len() + prims) as u64
    }
}

impl Default for Software2dBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel rectangle a quad covers given the primitive's view-relative transform.
fn quad_rect(primitive: &Primitive, width: u32, height: u32) -> PixelRect {
    let w = width as f32;
    let h = height as f32;
    let cx = (0.5 + 0.5 * primitive.offset.x) * w;
    let cy = (0.5 - 0.5 * primitive.offset.y) * h;
    let hw = 0.5 * primitive.scale.x * w;
    let hh = 0.5 * primitive.scale.y * h;
    PixelRect::new(cx - hw, cy - hh, cx + hw, cy + hh)
}

/// Draws one primitive into `buf`. Returns the number of parts drawn.
fn draw_primitive(
    buf: &mut PixelBuffer,
    camera: &OrthoCamera,
    pixel_ratio: f32,
    primitive: &Primitive,
) -> u32 {
    if !primitive.visible || primitive.is_disposed() || primitive.opacity <= 0.0 {
        return 0;
    }
    let (w, h) = (buf.width(), buf.height());
    let alpha = primitive.opacity.clamp(0.0, 1.0);
    let ppu = camera.pixels_per_unit(h);
    let mut draws = 0;
    for part in &primitive.parts {
        match part {
            Part::Quad(material) => {
                let rect = quad_rect(primitive, w, h);
                match material {
                    Material::Solid(c) => buf.fill_rect(&rect, c.with_alpha_scaled(alpha)),
                    Material::Gradient(g) if g.kind == GradientKind::Linear => {
                        let angle = g.angle_deg + g.phase.to_degrees();
                        buf.fill_linear_gradient(&rect, angle, &g.stops, alpha);
                    }
                    Material::Waves(m) => buf.fill_waves(&rect, m, alpha),
                    other => buf.fill_shaded(&rect, alpha, |uv| other.shade(uv)),
                }
            }
            Part::Lines(lines) => {
                let width = LINE_WIDTH * pixel_ratio;
                for (p, c) in lines.positions.chunks_exact(2).zip(lines.colors.chunks_exact(2)) {
                    let a = camera.world_to_pixel(p[0], w, h);
                    let b = camera.world_to_pixel(p[1], w, h);
                    buf.stroke_line(
                        a,
                        b,
                        width,
                        c[0].with_alpha_scaled(alpha),
                        c[1].with_alpha_scaled(alpha),
                    );
                }
            }
            Part::Points(points) => {
                let iter = points
                    .positions
                    .iter()
                    .zip(&points.colors)
                    .zip(&points.sizes);
                for ((pos, color), size) in iter {
                    let center: Vec2 = camera.world_to_pixel(*pos, w, h);
                    buf.fill_circle(center, size * 0.5 * ppu, color.with_alpha_scaled(alpha));
                }
            }
        }
        draws += 1;
    }
    draws
}

impl Backend for Software2dBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Software2d
    }

    fn initialize(&mut self, surface: &SurfaceHandle) -> Result<(), RenderError> {
        if surface.width == 0 || surface.height == 0 {
            return Err(RenderError::InvalidDimensions);
        }
        self.apply_size(Surface::new(surface.width, surface.height, surface.pixel_ratio));
        self.stats.reset();
        tracing::debug!(
            width = self.back.width(),
            height = self.back.height(),
            "software backend initialized"
        );
        Ok(())
    }

    fn render(&mut self, delta_ms: f64) -> Result<(), RenderError> {
        let Some(surface) = self.surface else {
            return Ok(());
        };
        self.back.clear(self.clear_color);
        let pixel_ratio = surface.pixel_ratio() as f32;
        let mut draws = 0;
        let mut failed = 0;
        for handle in self.scene.primitives() {
            match handle.try_borrow() {
                Ok(p) => draws += draw_primitive(&mut self.back, &self.camera, pixel_ratio, &p),
                Err(_) => failed += 1,
            }
        }
        self.front.blit_from(&self.back);
        let memory = self.memory_bytes();
        self.stats.record(delta_ms, draws, Some(memory));
        if failed > 0 {
            return Err(RenderError::PerFrameRenderError(format!(
                "{failed} primitive(s) were busy and skipped"
            )));
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        let Some(mut surface) = self.surface else {
            return;
        };
        surface.set_size(width.max(1), height.max(1));
        self.apply_size(surface);
    }

    fn dispose(&mut self) {
        if self.surface.take().is_none() {
            return;
        }
        self.scene.clear();
        self.back.release();
        self.front.release();
        tracing::debug!("software backend disposed");
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
        if self.surface.is_some() {
            Some(&mut self.scene)
        } else {
            None
        }
    }

    fn read_pixels(&self) -> Option<PixelBuffer> {
        self.surface.map(|_| self.front.clone())
    }
}
