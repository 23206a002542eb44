//! The render engine: backend selection and the frame loop.
//!
//! # Frame pacing
//!
//! On every host tick the engine computes `delta = now - last`. When `delta`
//! reaches the target frame time it runs the render callback, renders the
//! backend, and sets `last = now - delta % target`. Carrying the remainder
//! keeps the long-run frame count at `elapsed / target` regardless of how
//! the host's ticks line up with it.

use crate::backend::{create_backend, Backend};
use crate::capability::{CapabilityProbe, HostProbe};
use crate::config::{BackendKind, RenderConfig};
use crate::error::RenderError;
use crate::scene::SceneHost;
use crate::scheduler::{FrameRequest, FrameScheduler};
use crate::stats::RenderStats;
use crate::surface::SurfaceHandle;

/// What the per-frame callback gets to work with.
pub struct FrameContext<'a> {
    /// Time since the previous rendered frame.
    pub delta_ms: f64,
    /// The live backend's scene, for applying generator scene events.
    pub scene: Option<&'a mut dyn SceneHost>,
}

pub type RenderCallback = Box<dyn FnMut(FrameContext<'_>)>;

pub struct RenderEngine {
    config: RenderConfig,
    probe: Box<dyn CapabilityProbe>,
    scheduler: Box<dyn FrameScheduler>,
    backend: Option<Box<dyn Backend>>,
    surface: Option<SurfaceHandle>,
    callback: Option<RenderCallback>,
    pending: Option<FrameRequest>,
    running: bool,
    last_time: f64,
}

impl RenderEngine {
    pub fn new(
        config: RenderConfig,
        scheduler: impl FrameScheduler + 'static,
    ) -> Result<Self, RenderError> {
        Self::with_probe(config, scheduler, HostProbe)
    }

    pub fn with_probe(
        config: RenderConfig,
        scheduler: impl FrameScheduler + 'static,
        probe: impl CapabilityProbe + 'static,
    ) -> Result<Self, RenderError> {
        config.validate()?;
        Ok(Self {
            config,
            probe: Box::new(probe),
            scheduler: Box::new(scheduler),
            backend: None,
            surface: None,
            callback: None,
            pending: None,
            running: false,
            last_time: 0.0,
        })
    }

    /// Order in which backends are tried on `surface`.
    fn candidates(&self, surface: &SurfaceHandle) -> Vec<BackendKind> {
        let supported = |kind: BackendKind| match kind {
            BackendKind::Accelerated => self.probe.supports_accelerated(surface),
            BackendKind::Software2d => self.probe.supports_software(surface),
        };
        let mut order = Vec::with_capacity(2);
        let preferred = self.config.preferred_backend;
        for kind in preferred.into_iter().chain([BackendKind::Accelerated, BackendKind::Software2d]) {
            if !order.contains(&kind) && supported(kind) {
                order.push(kind);
            }
        }
        order
    }

    /// Selects and initializes a backend for `surface`.
    ///
    /// A backend that the probe accepts but that fails to initialize is
    /// logged and skipped in favour of the next candidate.
    pub fn initialize(&mut self, surface: SurfaceHandle) -> Result<(), RenderError> {
        if surface.width == 0 || surface.height == 0 {
            return Err(RenderError::InvalidDimensions);
        }
        if let Some(mut old) = self.backend.take() {
            self.stop();
            old.dispose();
        }
        let mut selected = None;
        for kind in self.candidates(&surface) {
            let mut backend = match create_backend(kind) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(backend = kind.name(), error = %e, "backend unavailable");
                    continue;
                }
            };
            match backend.initialize(&surface) {
                Ok(()) => {
                    selected = Some(backend);
                    break;
                }
                Err(e) => {
                    tracing::warn!(backend = kind.name(), error = %e, "backend failed to initialize");
                    backend.dispose();
                }
            }
        }
        let backend = selected.ok_or(RenderError::NoBackendAvailable)?;
        tracing::info!(
            backend = backend.kind().name(),
            width = surface.width,
            height = surface.height,
            pixel_ratio = surface.pixel_ratio,
            "render backend selected"
        );
        self.backend = Some(backend);
        self.surface = Some(surface);
        if self.config.auto_start {
            self.start();
        }
        Ok(())
    }

    /// Starts the loop. No-op when already running or not initialized.
    pub fn start(&mut self) {
        if self.running || self.backend.is_none() {
            return;
        }
        self.running = true;
        self.last_time = self.scheduler.now();
        self.pending = Some(self.scheduler.request_frame());
    }

    /// Stops the loop and cancels the outstanding frame request.
    pub fn stop(&mut self) {
        self.running = false;
        if let Some(request) = self.pending.take() {
            self.scheduler.cancel_frame(request);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Host callback for a fired frame request.
    pub fn tick(&mut self, now_ms: f64) {
        self.pending = None;
        if !self.running {
            return;
        }
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let target = self.config.target_frame_time();
        let delta = now_ms - self.last_time;
        if delta >= target {
            if let Some(callback) = self.callback.as_mut() {
                callback(FrameContext {
                    delta_ms: delta,
                    scene: backend.as_scene_host(),
                });
            }
            if let Err(e) = backend.render(delta) {
                tracing::warn!(error = %e, "frame render failed");
            }
            self.last_time = now_ms - delta % target;
        } else if delta < 0.0 {
            self.last_time = now_ms;
        }
        self.pending = Some(self.scheduler.request_frame());
    }

    /// Forwards a logical size change. Safe before the first frame and after dispose.
    pub fn resize(&mut self, width: u32, height: u32) {
        if let Some(backend) = self.backend.as_mut() {
            backend.resize(width, height);
        }
        if let Some(surface) = self.surface.as_mut() {
            surface.width = width.max(1);
            surface.height = height.max(1);
        }
    }

    /// Registers the per-frame callback, replacing any previous one.
    pub fn on_render(&mut self, callback: impl FnMut(FrameContext<'_>) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Stops the loop and tears everything down. Repeatable.
    pub fn dispose(&mut self) {
        self.stop();
        if let Some(mut backend) = self.backend.take() {
            backend.dispose();
            tracing::debug!(backend = backend.kind().name(), "render backend disposed");
        }
        self.callback = None;
        self.surface = None;
    }

    pub fn mode(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|b| b.kind())
    }

    pub fn stats(&self) -> RenderStats {
        self.backend
            .as_ref()
            .map(|b| b.stats())
            .unwrap_or_default()
    }

    pub fn scene_host(&mut self) -> Option<&mut dyn SceneHost> {
        self.backend.as_mut()?.as_scene_host()
    }

    pub fn backend(&self) -> Option<&dyn Backend> {
        self.backend.as_deref()
    }

    pub fn surface(&self) -> Option<&SurfaceHandle> {
        self.surface.as_ref()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn set_target_fps(&mut self, fps: f64) -> Result<(), RenderError> {
        let next = RenderConfig {
            target_fps: fps,
            ..self.config.clone()
        };
        next.validate()?;
        self.config = next;
        Ok(())
    }
}

impl Drop for RenderEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::FixedProbe;
    use crate::scheduler::ManualScheduler;
    use std::cell::Cell;
    use std::rc::Rc;

    fn software_engine(config: RenderConfig) -> (RenderEngine, ManualScheduler) {
        let clock = ManualScheduler::new();
        let probe = FixedProbe {
            accelerated: false,
            software: true,
        };
        let engine = RenderEngine::with_probe(config, clock.clone(), probe).unwrap();
        (engine, clock)
    }

    /// Advances the clock in `step` increments, firing each due frame.
    fn drive(engine: &mut RenderEngine, clock: &ManualScheduler, step: f64, ticks: usize) {
        for _ in 0..ticks {
            clock.advance(step);
            if let Some(now) = clock.take_due() {
                engine.tick(now);
            }
        }
    }

    #[test]
    fn falls_back_to_software_without_accelerated_support() {
        let (mut engine, _) = software_engine(RenderConfig::default());
        engine.initialize(SurfaceHandle::offscreen(320, 180)).unwrap();
        assert_eq!(engine.mode(), Some(BackendKind::Software2d));
    }

    #[test]
    fn preferred_backend_skipped_when_unsupported() {
        let config = RenderConfig {
            preferred_backend: Some(BackendKind::Accelerated),
            ..RenderConfig::default()
        };
        let (mut engine, _) = software_engine(config);
        engine.initialize(SurfaceHandle::offscreen(64, 64)).unwrap();
        assert_eq!(engine.mode(), Some(BackendKind::Software2d));
    }

    #[test]
    fn no_backend_available_is_an_error() {
        let probe = FixedProbe {
            accelerated: false,
            software: false,
        };
        let mut engine =
            RenderEngine::with_probe(RenderConfig::default(), ManualScheduler::new(), probe)
                .unwrap();
        assert!(matches!(
            engine.initialize(SurfaceHandle::offscreen(64, 64)),
            Err(RenderError::NoBackendAvailable)
        ));
        assert_eq!(engine.mode(), None);
    }

    #[test]
    fn accelerated_probe_without_context_falls_through() {
        let probe = FixedProbe {
            accelerated: true,
            software: true,
        };
        let mut engine =
            RenderEngine::with_probe(RenderConfig::default(), ManualScheduler::new(), probe)
                .unwrap();
        engine.initialize(SurfaceHandle::offscreen(64, 64)).unwrap();
        assert_eq!(engine.mode(), Some(BackendKind::Software2d));
    }

    #[test]
    fn auto_start_requests_a_frame() {
        let (mut engine, clock) = software_engine(RenderConfig::default());
        engine.initialize(SurfaceHandle::offscreen(8, 8)).unwrap();
        assert!(engine.is_running());
        assert!(clock.has_pending());
    }

    #[test]
    fn auto_start_disabled_waits_for_start() {
        let config = RenderConfig {
            auto_start: false,
            ..RenderConfig::default()
        };
        let (mut engine, clock) = software_engine(config);
        engine.initialize(SurfaceHandle::offscreen(8, 8)).unwrap();
        assert!(!engine.is_running());
        assert!(!clock.has_pending());
        engine.start();
        engine.start();
        assert!(engine.is_running());
    }

    #[test]
    fn stop_cancels_pending_frame_and_is_idempotent() {
        let (mut engine, clock) = software_engine(RenderConfig::default());
        engine.initialize(SurfaceHandle::offscreen(8, 8)).unwrap();
        engine.stop();
        engine.stop();
        assert!(!clock.has_pending());
        let frames = Rc::new(Cell::new(0));
        let seen = frames.clone();
        engine.on_render(move |_| seen.set(seen.get() + 1));
        drive(&mut engine, &clock, 20.0, 10);
        assert_eq!(frames.get(), 0);
    }

    #[test]
    fn short_ticks_are_skipped_but_rescheduled() {
        let (mut engine, clock) = software_engine(RenderConfig::default());
        engine.initialize(SurfaceHandle::offscreen(8, 8)).unwrap();
        drive(&mut engine, &clock, 5.0, 1);
        assert_eq!(engine.stats().frame_count, 0);
        assert!(clock.has_pending());
        drive(&mut engine, &clock, 12.0, 1);
        assert_eq!(engine.stats().frame_count, 1);
    }

    #[test]
    fn remainder_carry_prevents_drift() {
        let config = RenderConfig {
            target_fps: 50.0,
            ..RenderConfig::default()
        };
        let (mut engine, clock) = software_engine(config);
        engine.initialize(SurfaceHandle::offscreen(4, 4)).unwrap();
        // 16 ms host ticks against a 20 ms target over 10 s.
        drive(&mut engine, &clock, 16.0, 625);
        let frames = engine.stats().frame_count;
        assert!((498..=501).contains(&frames), "rendered {frames} frames");
    }

    #[test]
    fn callback_runs_once_per_rendered_frame_with_scene() {
        let (mut engine, clock) = software_engine(RenderConfig::default());
        engine.initialize(SurfaceHandle::offscreen(8, 8)).unwrap();
        let calls = Rc::new(Cell::new(0));
        let with_scene = Rc::new(Cell::new(true));
        let (c, s) = (calls.clone(), with_scene.clone());
        engine.on_render(move |ctx| {
            c.set(c.get() + 1);
            s.set(s.get() && ctx.scene.is_some() && ctx.delta_ms > 0.0);
        });
        drive(&mut engine, &clock, 17.0, 30);
        assert_eq!(calls.get() as u64, engine.stats().frame_count);
        assert!(with_scene.get());
    }

    #[test]
    fn on_render_replaces_previous_callback() {
        let (mut engine, clock) = software_engine(RenderConfig::default());
        engine.initialize(SurfaceHandle::offscreen(8, 8)).unwrap();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let f = first.clone();
        engine.on_render(move |_| f.set(f.get() + 1));
        let s = second.clone();
        engine.on_render(move |_| s.set(s.get() + 1));
        drive(&mut engine, &clock, 20.0, 3);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 3);
    }

    #[test]
    fn resize_before_first_frame_and_after_dispose() {
        let (mut engine, _) = software_engine(RenderConfig::default());
        engine.resize(100, 100);
        engine.initialize(SurfaceHandle::offscreen(8, 8)).unwrap();
        engine.resize(16, 9);
        assert_eq!(engine.backend().unwrap().surface().unwrap().width(), 16);
        engine.dispose();
        engine.resize(32, 32);
        assert!(engine.backend().is_none());
    }

    #[test]
    fn dispose_is_repeatable_and_stops_callbacks() {
        let (mut engine, clock) = software_engine(RenderConfig::default());
        engine.initialize(SurfaceHandle::offscreen(8, 8)).unwrap();
        engine.on_render(|_| panic!("callback after dispose"));
        engine.dispose();
        engine.dispose();
        assert!(!clock.has_pending());
        engine.tick(1_000.0);
        assert_eq!(engine.mode(), None);
        assert_eq!(engine.stats(), RenderStats::default());
    }

    #[test]
    fn set_target_fps_validates() {
        let (mut engine, _) = software_engine(RenderConfig::default());
        engine.set_target_fps(30.0).unwrap();
        assert!((engine.config().target_frame_time() - 1000.0 / 30.0).abs() < 1e-9);
        assert!(engine.set_target_fps(0.0).is_err());
        assert!(engine.set_target_fps(f64::NAN).is_err());
        assert_eq!(engine.config().target_fps, 30.0);
    }

    #[test]
    fn invalid_fps_rejected_at_construction() {
        let config = RenderConfig {
            target_fps: -1.0,
            ..RenderConfig::default()
        };
        assert!(RenderEngine::new(config, ManualScheduler::new()).is_err());
    }
}
