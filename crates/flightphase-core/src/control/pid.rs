//! Feed-forward PID loop
//!
//! u = u_ff + kp·e + clamp(∫ki·e dt) + kd·ė,  e = target - actual
//!
//! The integral accumulates the ki-scaled error so its clamp bounds read
//! directly in output units.

use serde::{Deserialize, Serialize};

/// Gains and integrator bounds for one loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidSettings {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Upper bound of the integral contribution (output units)
    pub accumulator_max: f64,
    /// Lower bound of the integral contribution (output units)
    pub accumulator_min: f64,
}

impl PidSettings {
    pub fn new(kp: f64, ki: f64, kd: f64, accumulator_max: f64, accumulator_min: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            accumulator_max,
            accumulator_min,
        }
    }

    /// Pure proportional loop
    pub fn proportional(kp: f64) -> Self {
        Self::new(kp, 0.0, 0.0, 0.0, 0.0)
    }
}

impl Default for PidSettings {
    fn default() -> Self {
        Self::proportional(0.0)
    }
}

/// PID loop with a constant feed-forward term
#[derive(Debug, Clone)]
pub struct FeedForwardPid {
    /// Loop gains
    pub settings: PidSettings,
    /// Baseline output added to every correction
    pub feed_forward: f64,
    /// Integral accumulator (output units)
    accumulator: f64,
    /// Error at the previous step
    last_error: Option<f64>,
}

impl FeedForwardPid {
    pub fn new(settings: PidSettings) -> Self {
        Self::with_feed_forward(settings, 0.0)
    }

    pub fn with_feed_forward(settings: PidSettings, feed_forward: f64) -> Self {
        Self {
            settings,
            feed_forward,
            accumulator: 0.0,
            last_error: None,
        }
    }

    /// Advance the loop by `dt` seconds and return the output
    ///
    /// A non-positive `dt` returns the proportional output without touching
    /// integrator or derivative memory.
    pub fn step(&mut self, target: f64, actual: f64, dt: f64) -> f64 {
        let error = target - actual;
        let p_term = self.settings.kp * error;

        if dt <= 0.0 || !dt.is_finite() {
            return self.feed_forward + p_term + self.accumulator;
        }

        // Integrate with anti-windup clamp
        self.accumulator = (self.accumulator + self.settings.ki * error * dt)
            .clamp(self.settings.accumulator_min, self.settings.accumulator_max);

        // No derivative kick on the first step after a reset
        let d_term = match self.last_error {
            Some(last) => self.settings.kd * (error - last) / dt,
            None => 0.0,
        };
        self.last_error = Some(error);

        self.feed_forward + p_term + self.accumulator + d_term
    }

    /// Clear integrator and derivative memory
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.last_error = None;
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }
}
