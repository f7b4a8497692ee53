//! Scalar ramps
//!
//! Time-bounded linear transitions and rate-limited approaches.

/// Linear interpolation between `from` and `to`
pub fn lerp(from: f64, to: f64, fraction: f64) -> f64 {
    from + fraction * (to - from)
}

/// Value of a linear ramp at `elapsed` seconds into a ramp of `duration`
///
/// Before the start the ramp holds `from`; after the end it holds `to`.
/// A zero-length ramp is already complete.
pub fn linear_ramp(from: f64, to: f64, elapsed: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return to;
    }
    lerp(from, to, (elapsed / duration).clamp(0.0, 1.0))
}

/// Move `current` toward `target` by at most `max_rate * dt`
///
/// current ← current + clamp(target - current, ±max_rate·dt)
pub fn rate_limit(current: f64, target: f64, max_rate: f64, dt: f64) -> f64 {
    let max_step = (max_rate * dt).abs();
    current + (target - current).clamp(-max_step, max_step)
}
