//! Host frame scheduling.
//!
//! The engine never sleeps or reads a clock on its own. It asks a
//! [`FrameScheduler`] for the time and for "call me on the next frame", and
//! the host answers by calling [`RenderEngine::tick`](crate::engine::RenderEngine::tick).

use std::cell::RefCell;
use std::rc::Rc;

/// Handle for one outstanding frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

pub trait FrameScheduler {
    /// Monotonic host time in milliseconds.
    fn now(&self) -> f64;

    /// Asks the host for a `tick` on its next animation frame.
    fn request_frame(&mut self) -> FrameRequest;

    /// Withdraws a request. Unknown or already-fired requests are ignored.
    fn cancel_frame(&mut self, request: FrameRequest);
}

#[derive(Debug, Default)]
struct ManualState {
    now: f64,
    next_id: u64,
    pending: Option<FrameRequest>,
}

/// Deterministic scheduler with a shared clock.
///
/// Clones share state, so the host keeps one clone to drive time while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward. Negative or non-finite steps are ignored.
    pub fn advance(&self, ms: f64) {
        if ms.is_finite() && ms > 0.0 {
            self.state.borrow_mut().now += ms;
        }
    }

    /// Sets the clock, as long as that does not move it backwards.
    pub fn set_now(&self, now: f64) {
        let mut state = self.state.borrow_mut();
        if now.is_finite() && now > state.now {
            state.now = now;
        }
    }

    /// Fires the pending request, if any, returning the time to pass to `tick`.
    pub fn take_due(&self) -> Option<f64> {
        let mut state = self.state.borrow_mut();
        state.pending.take().map(|_| state.now)
    }

    pub fn has_pending(&self) -> bool {
        self.state.borrow().pending.is_some()
    }
}

impl FrameScheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.state.borrow().now
    }

    fn request_frame(&mut self) -> FrameRequest {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let request = FrameRequest(state.next_id);
        state.pending = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let mut state = self.state.borrow_mut();
        if state.pending == Some(request) {
            state.pending = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_clock() {
        let host = ManualScheduler::new();
        let engine_side = host.clone();
        host.advance(16.5);
        assert_eq!(engine_side.now(), 16.5);
    }

    #[test]
    fn clock_never_runs_backwards() {
        let s = ManualScheduler::new();
        s.advance(10.0);
        s.advance(-5.0);
        s.set_now(3.0);
        assert_eq!(s.now(), 10.0);
    }

    #[test]
    fn take_due_fires_once() {
        let host = ManualScheduler::new();
        let mut engine_side = host.clone();
        engine_side.request_frame();
        host.advance(20.0);
        assert_eq!(host.take_due(), Some(20.0));
        assert_eq!(host.take_due(), None);
    }

    #[test]
    fn cancel_only_matches_current_request() {
        let mut s = ManualScheduler::new();
        let first = s.request_frame();
        let second = s.request_frame();
        s.cancel_frame(first);
        assert!(s.has_pending());
        s.cancel_frame(second);
        assert!(!s.has_pending());
    }
}
