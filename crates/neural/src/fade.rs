//! Constant-rate opacity fades.

/// Opacity units per second. A full 0 -> 1 fade takes `1 / FADE_RATE` s.
pub const FADE_RATE: f32 = 1000.0 / TRANSITION_WINDOW_MS as f32;

/// Upper bound on one fade leg. A leg still short of its target when the
/// window closes is snapped to it.
pub const TRANSITION_WINDOW_MS: f64 = 600.0;

/// Distance at which an opacity counts as having reached its target.
pub const FADE_EPSILON: f32 = 1e-3;

/// Moves `current` toward `target` by at most `FADE_RATE * dt_s`, clamped to
/// `[0, 1]`. Snaps once within [`FADE_EPSILON`].
pub fn step_opacity(current: f32, target: f32, dt_s: f32) -> f32 {
    let target = target.clamp(0.0, 1.0);
    let current = current.clamp(0.0, 1.0);
    let step = (FADE_RATE * dt_s.max(0.0)).max(0.0);
    let next = if current < target {
        (current + step).min(target)
    } else {
        (current - step).max(target)
    };
    if (next - target).abs() <= FADE_EPSILON {
        target
    } else {
        next
    }
}
