//! Index-driven deterministic jitter.

/// Deterministic value in `[-1, 1]` for `(index, salt)`.
///
/// The fractional part of a large-amplitude sine: cheap, stateless, and
/// reproducible across runs and platforms that agree on `f64::sin`. Used
/// wherever the layout needs variation that looks random but must not be.
pub fn pseudo_noise(index: usize, salt: f64) -> f32 {
    let x = (index as f64 * 12.9898 + salt * 78.233).sin() * 43_758.545_3;
    (x.fract().abs() * 2.0 - 1.0) as f32
}
