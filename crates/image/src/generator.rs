use crate::fit::{compute_fit, FitTransform};
use crate::loader::{FileLoader, LoadedTexture, TextureLoader};
use backdrop_core::config::{defaults, ImageConfig};
use backdrop_core::material::{Material, TextureMaterial};
use backdrop_core::params::apply_patch;
use backdrop_core::{
    BackgroundKind, ConfigChange, Generator, Part, Primitive, PrimitiveRef, RenderError, Texture,
    BACKGROUND_SLOT,
};
use serde_json::Value;
use std::rc::Rc;

const DEFAULT_ASPECT: f32 = 16.0 / 9.0;

pub struct ImageGenerator {
    config: ImageConfig,
    loader: Box<dyn TextureLoader>,
    /// Bumped on every source change and on dispose. Completions tagged
    /// with any other value are stale.
    generation: u64,
    texture: Option<Rc<Texture>>,
    target_aspect: f32,
    visible: bool,
    primitive: Option<PrimitiveRef>,
    disposed: bool,
}

impl ImageGenerator {
    pub fn new(config: ImageConfig) -> Result<Self, RenderError> {
        config.validate()?;
        Self::with_loader(config, Box::new(FileLoader::new()))
    }

    pub fn from_json(patch: &Value) -> Result<Self, RenderError> {
        Self::new(apply_patch(&defaults::image(), patch)?)
    }

    pub fn with_loader(
        config: ImageConfig,
        loader: Box<dyn TextureLoader>,
    ) -> Result<Self, RenderError> {
        config.validate()?;
        let mut generator = Self {
            config,
            loader,
            generation: 0,
            texture: None,
            target_aspect: DEFAULT_ASPECT,
            visible: true,
            primitive: None,
            disposed: false,
        };
        generator.start_load();
        Ok(generator)
    }

    pub fn image_config(&self) -> &ImageConfig {
        &self.config
    }

    pub fn texture(&self) -> Option<&Rc<Texture>> {
        self.texture.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn start_load(&mut self) {
        self.generation += 1;
        if self.config.source.is_empty() {
            self.texture = None;
            return;
        }
        tracing::debug!(source = %self.config.source, generation = self.generation, "loading image");
        self.loader.request(self.generation, &self.config.source);
    }

    fn accept(&mut self, loaded: LoadedTexture) {
        if self.disposed || loaded.generation != self.generation {
            tracing::debug!(source = %loaded.source, "ignoring stale image load");
            return;
        }
        match loaded.result {
            Ok(texture) => {
                tracing::debug!(
                    source = %loaded.source,
                    width = texture.width(),
                    height = texture.height(),
                    "image loaded"
                );
                self.texture = Some(Rc::new(texture));
            }
            Err(e) => {
                tracing::warn!(error = %e, "image load failed");
                self.texture = None;
            }
        }
        self.apply_fit();
    }

    /// Writes texture, UV window and quad transform into the primitive.
    fn apply_fit(&self) {
        let Some(p) = &self.primitive else {
            return;
        };
        let fit = match &self.texture {
            Some(t) => compute_fit(self.config.fit, self.config.position, t.aspect(), self.target_aspect),
            None => FitTransform::IDENTITY,
        };
        let mut primitive = p.borrow_mut();
        primitive.scale = fit.quad_scale;
        primitive.offset = fit.quad_offset;
        if let Some(Material::Texture(m)) = primitive.quad_material_mut() {
            m.texture = self.texture.clone();
            m.uv_scale = fit.uv_scale;
            m.uv_offset = fit.uv_offset;
        }
        primitive.touch();
    }
}

impl Generator for ImageGenerator {
    fn kind(&self) -> BackgroundKind {
        BackgroundKind::Image
    }

    fn create(&mut self) -> PrimitiveRef {
        if let Some(p) = &self.primitive {
            return p.clone();
        }
        let mut primitive = Primitive::new(
            BACKGROUND_SLOT,
            vec![Part::Quad(Material::Texture(TextureMaterial::default()))],
        );
        primitive.visible = self.visible;
        let handle = PrimitiveRef::new(primitive);
        self.primitive = Some(handle.clone());
        self.apply_fit();
        handle
    }

    fn update(&mut self, _delta_ms: f64) {
        if self.disposed {
            return;
        }
        for loaded in self.loader.poll() {
            self.accept(loaded);
        }
    }

    fn update_config(&mut self, patch: &Value) -> Result<ConfigChange, RenderError> {
        let next = apply_patch(&self.config, patch)?;
        next.validate()?;
        if next == self.config {
            return Ok(ConfigChange::Unchanged);
        }
        let source_changed = next.source != self.config.source;
        self.config = next;
        if source_changed {
            self.start_load();
        }
        self.apply_fit();
        Ok(ConfigChange::InPlace)
    }

    fn config(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or(Value::Null)
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if let Some(p) = &self.primitive {
            p.borrow_mut().visible = visible;
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let aspect = width as f32 / height as f32;
        if aspect != self.target_aspect {
            self.target_aspect = aspect;
            self.apply_fit();
        }
    }

    fn dispose(&mut self) {
        self.disposed = true;
        self.generation += 1;
        self.texture = None;
        if let Some(p) = self.primitive.take() {
            p.borrow_mut().dispose();
        }
    }

    fn primitive(&self) -> Option<PrimitiveRef> {
        self.primitive.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ManualLoader;
    use backdrop_core::Rgba;
    use glam::Vec2;
    use serde_json::json;

    fn generator(source: &str) -> (ImageGenerator, ManualLoader) {
        let loader = ManualLoader::new();
        let config = apply_patch(&defaults::image(), &json!({ "source": source })).unwrap();
        let g = ImageGenerator::with_loader(config, Box::new(loader.clone())).unwrap();
        (g, loader)
    }

    fn material(p: &PrimitiveRef) -> TextureMaterial {
        match p.borrow().quad_material() {
            Some(Material::Texture(m)) => m.clone(),
            other => panic!("unexpected material {other:?}"),
        }
    }

    fn wide() -> Texture {
        Texture::solid(4, 1, Rgba::WHITE).unwrap()
    }

    #[test]
    fn empty_source_requests_nothing() {
        let (mut g, loader) = generator("");
        let p = g.create();
        assert!(loader.requests().is_empty());
        assert!(material(&p).texture.is_none());
        assert!(p.borrow().visible);
    }

    #[test]
    fn loaded_texture_is_fitted() {
        let (mut g, loader) = generator("wide.png");
        let p = g.create();
        let (generation, _) = loader.requests()[0].clone();
        loader.complete(generation, "wide.png", Ok(wide()));
        g.update(16.0);
        let m = material(&p);
        assert!(m.texture.is_some());
        // 4:1 image covering a 16:9 view is cropped horizontally.
        assert!((m.uv_scale.x - DEFAULT_ASPECT / 4.0).abs() < 1e-5);
        assert_eq!(m.uv_scale.y, 1.0);
    }

    #[test]
    fn stale_completion_is_ignored() {
        let (mut g, loader) = generator("first.png");
        let p = g.create();
        g.update_config(&json!({"source": "second.png"})).unwrap();
        let requests = loader.requests();
        assert_eq!(requests.len(), 2);
        loader.complete(requests[0].0, "first.png", Ok(wide()));
        g.update(16.0);
        assert!(material(&p).texture.is_none());
        loader.complete(requests[1].0, "second.png", Ok(wide()));
        g.update(16.0);
        assert!(material(&p).texture.is_some());
    }

    #[test]
    fn completion_after_dispose_is_ignored() {
        let (mut g, loader) = generator("late.png");
        let p = g.create();
        let generation = loader.requests()[0].0;
        g.dispose();
        loader.complete(generation, "late.png", Ok(wide()));
        g.update(16.0);
        assert!(g.texture().is_none());
        assert!(p.borrow().is_disposed());
        g.dispose();
    }

    #[test]
    fn load_failure_keeps_primitive_visible() {
        let (mut g, loader) = generator("broken.png");
        let p = g.create();
        let generation = loader.requests()[0].0;
        loader.complete(
            generation,
            "broken.png",
            Err(RenderError::TextureLoadFailed {
                source_name: "broken.png".into(),
                reason: "bad header".into(),
            }),
        );
        g.update(16.0);
        assert!(p.borrow().visible);
        assert!(material(&p).texture.is_none());
    }

    #[test]
    fn fit_change_and_resize_refit_in_place() {
        let (mut g, loader) = generator("wide.png");
        let p = g.create();
        loader.complete(loader.requests()[0].0, "wide.png", Ok(wide()));
        g.update(16.0);

        assert_eq!(g.update_config(&json!({"fit": "contain"})).unwrap(), ConfigChange::InPlace);
        assert!(g.primitive().is_some_and(|q| q.ptr_eq(&p)));
        assert_eq!(material(&p).uv_scale, Vec2::ONE);
        let contained = p.borrow().scale;
        assert!((contained.y - DEFAULT_ASPECT / 4.0).abs() < 1e-5);

        g.resize(400, 100);
        let after = p.borrow().scale;
        assert!((after.y - 1.0).abs() < 1e-5);
        g.resize(400, 100);
        assert_eq!(p.borrow().scale, after);
        assert_eq!(loader.requests().len(), 1);
    }

    #[test]
    fn fill_stretches() {
        let (mut g, loader) = generator("wide.png");
        let p = g.create();
        loader.complete(loader.requests()[0].0, "wide.png", Ok(wide()));
        g.update(16.0);
        g.update_config(&json!({"fit": "fill"})).unwrap();
        let m = material(&p);
        assert_eq!((m.uv_scale, m.uv_offset), (Vec2::ONE, Vec2::ZERO));
        assert_eq!(p.borrow().scale, Vec2::ONE);
    }

    #[test]
    fn file_source_loads_through_default_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blue.png");
        image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 255, 255]))
            .save(&path)
            .unwrap();
        let mut g = ImageGenerator::from_json(&json!({"source": path.to_str().unwrap()})).unwrap();
        g.create();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while g.texture().is_none() && std::time::Instant::now() < deadline {
            g.update(16.0);
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert_eq!(g.texture().map(|t| t.width()), Some(2));
    }

    #[test]
    fn out_of_range_position_is_rejected() {
        let (mut g, _) = generator("");
        assert!(g.update_config(&json!({"position": {"x": 120.0}})).is_err());
        assert_eq!(g.image_config().position.x, 50.0);
    }
}
