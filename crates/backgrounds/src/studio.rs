//! A render engine, an orchestrator and a manual clock wired together.
//!
//! The CLI and the integration tests drive backgrounds through [`Studio`]:
//! it owns the engine, routes each frame's delta into the orchestrator and
//! lets the caller step simulated time explicitly.

use crate::orchestrator::{Applied, Orchestrator};
use backdrop_core::{
    BackendKind, BackgroundKind, CapabilityProbe, HostProbe, ManualScheduler, PixelBuffer,
    RenderConfig, RenderEngine, RenderError, RenderStats, SurfaceHandle,
};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

pub struct Studio {
    engine: RenderEngine,
    orchestrator: Rc<RefCell<Orchestrator>>,
    clock: ManualScheduler,
}

impl Studio {
    pub fn new(config: RenderConfig, surface: SurfaceHandle) -> Result<Self, RenderError> {
        Self::with_probe(config, surface, HostProbe)
    }

    /// Builds the engine, selects a backend for `surface` and hooks the
    /// orchestrator into the frame callback.
    pub fn with_probe(
        config: RenderConfig,
        surface: SurfaceHandle,
        probe: impl CapabilityProbe + 'static,
    ) -> Result<Self, RenderError> {
        let clock = ManualScheduler::new();
        let mut engine = RenderEngine::with_probe(config, clock.clone(), probe)?;
        let (width, height) = (surface.width, surface.height);
        engine.initialize(surface)?;

        let orchestrator = Rc::new(RefCell::new(Orchestrator::new()));
        orchestrator.borrow_mut().resize(width, height);
        let frame_orchestrator = Rc::clone(&orchestrator);
        engine.on_render(move |ctx| match frame_orchestrator.try_borrow_mut() {
            Ok(mut o) => o.update(ctx.delta_ms, ctx.scene),
            Err(_) => tracing::warn!("orchestrator busy, frame update skipped"),
        });
        Ok(Self {
            engine,
            orchestrator,
            clock,
        })
    }

    /// Applies a `(kind, config, visible)` state from the configuration store.
    pub fn apply(
        &mut self,
        kind: BackgroundKind,
        config: &Value,
        visible: bool,
    ) -> Result<Applied, RenderError> {
        let scene = self
            .engine
            .scene_host()
            .ok_or(RenderError::NoBackendAvailable)?;
        self.orchestrator
            .borrow_mut()
            .apply_background_state(scene, kind, config, visible)
    }

    pub fn start(&mut self) {
        self.engine.start();
    }

    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Moves the clock forward by `ms` and fires the pending frame, if any.
    pub fn advance(&mut self, ms: f64) {
        self.clock.advance(ms);
        if let Some(now) = self.clock.take_due() {
            self.engine.tick(now);
        }
    }

    /// Advances `duration_ms` of simulated time in host ticks of `step_ms`.
    pub fn run_for(&mut self, duration_ms: f64, step_ms: f64) -> RenderStats {
        if step_ms > 0.0 && duration_ms.is_finite() {
            let mut elapsed = 0.0;
            while elapsed < duration_ms {
                let step = step_ms.min(duration_ms - elapsed);
                self.advance(step);
                elapsed += step;
            }
        }
        self.stats()
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.engine.resize(width, height);
        self.orchestrator.borrow_mut().resize(width, height);
    }

    pub fn stats(&self) -> RenderStats {
        self.engine.stats()
    }

    pub fn mode(&self) -> Option<BackendKind> {
        self.engine.mode()
    }

    pub fn active_kind(&self) -> Option<BackgroundKind> {
        self.orchestrator.borrow().active_kind()
    }

    pub fn engine(&self) -> &RenderEngine {
        &self.engine
    }

    /// The last presented frame.
    pub fn snapshot(&self) -> Option<PixelBuffer> {
        self.engine.backend()?.read_pixels()
    }

    /// Detaches and disposes the background, then the engine. Repeatable.
    pub fn dispose(&mut self) {
        self.orchestrator
            .borrow_mut()
            .dispose(self.engine.scene_host());
        self.engine.dispose();
    }
}

impl Drop for Studio {
    fn drop(&mut self) {
        self.dispose();
    }
}
