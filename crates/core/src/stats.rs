//! Rolling frame statistics.

use serde::Serialize;

/// How often [`FrameStats`] republishes its numbers, in milliseconds.
pub const STATS_WINDOW_MS: f64 = 1000.0;

/// Snapshot of recent rendering performance. Read-only to callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub fps: f64,
    pub frame_time_ms: f64,
    pub draw_calls: u32,
    pub memory_bytes: Option<u64>,
    pub frame_count: u64,
}

/// Accumulates per-frame samples and recomputes [`RenderStats`] about once
/// per [`STATS_WINDOW_MS`] of rendered time.
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    published: RenderStats,
    window_frames: u32,
    window_ms: f64,
    frame_count: u64,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one rendered frame of length `delta_ms` that issued
    /// `draw_calls` draws.
    pub fn record(&mut self, delta_ms: f64, draw_calls: u32, memory_bytes: Option<u64>) {
        self.frame_count += 1;
        self.window_frames += 1;
        if delta_ms.is_finite() && delta_ms > 0.0 {
            self.window_ms += delta_ms;
        }
        self.published.frame_time_ms = delta_ms;
        self.published.draw_calls = draw_calls;
        self.published.memory_bytes = memory_bytes;
        self.published.frame_count = self.frame_count;
        if self.window_ms >= STATS_WINDOW_MS {
            self.published.fps = self.window_frames as f64 * 1000.0 / self.window_ms;
            self.window_frames = 0;
            self.window_ms = 0.0;
        }
    }

    pub fn snapshot(&self) -> RenderStats {
        self.published
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_is_zero_until_first_window() {
        let mut s = FrameStats::new();
        for _ in 0..10 {
            s.record(16.0, 1, None);
        }
        assert_eq!(s.snapshot().fps, 0.0);
        assert_eq!(s.snapshot().frame_count, 10);
    }

    #[test]
    fn fps_computed_after_one_second() {
        let mut s = FrameStats::new();
        // 61 frames: the window closes on the 60th or 61st depending on rounding.
        for _ in 0..61 {
            s.record(1000.0 / 60.0, 2, Some(64));
        }
        let snap = s.snapshot();
        assert!((snap.fps - 60.0).abs() < 0.5, "fps {}", snap.fps);
        assert_eq!(snap.draw_calls, 2);
        assert_eq!(snap.memory_bytes, Some(64));
    }

    #[test]
    fn last_frame_time_tracks_latest_sample() {
        let mut s = FrameStats::new();
        s.record(10.0, 0, None);
        s.record(33.0, 0, None);
        assert_eq!(s.snapshot().frame_time_ms, 33.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut s = FrameStats::new();
        s.record(2000.0, 3, None);
        s.reset();
        assert_eq!(s.snapshot(), RenderStats::default());
    }
}
