//! Horizontal position hold
//!
//! Turns the offset d from a held x/y position into a level-frame velocity
//! target. The speed target is trapezoidal:
//!
//! v* = min(k·d, v_max, √(2·a·d))
//!
//! so the vehicle can still stop within d at acceleration a, and the
//! commanded velocity moves toward it by at most a·dt per update. Inside the
//! tolerance the target is zero.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};

use flightphase_core::math::world_to_level;

/// Position hold tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionHoldConfig {
    /// Velocity per metre of offset [1/s]
    pub gain: f64,
    /// Largest horizontal speed commanded [m/s]
    pub max_speed: f64,
    /// Largest change of the commanded velocity [m/s²]
    pub max_acceleration: f64,
    /// Offset below which no correction is commanded [m]
    pub tolerance: f64,
}

impl Default for PositionHoldConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            max_speed: 0.5,
            max_acceleration: 0.5,
            tolerance: 0.05,
        }
    }
}

/// Holds an x/y position
#[derive(Debug, Clone)]
pub struct PositionHolder {
    pub config: PositionHoldConfig,
    hold: Option<Vector2<f64>>,
    /// Last commanded velocity, world frame [m/s]
    velocity: Vector2<f64>,
}

impl PositionHolder {
    pub fn new(config: PositionHoldConfig) -> Self {
        Self {
            config,
            hold: None,
            velocity: Vector2::zeros(),
        }
    }

    /// Hold (x, y), starting from rest
    pub fn hold_at(&mut self, x: f64, y: f64) {
        self.hold = Some(Vector2::new(x, y));
        self.velocity = Vector2::zeros();
    }

    pub fn release(&mut self) {
        self.hold = None;
        self.velocity = Vector2::zeros();
    }

    pub fn hold_position(&self) -> Option<Vector2<f64>> {
        self.hold
    }

    /// Level-frame velocity steering `position` back to the held point
    ///
    /// `dt` is the time since the previous call; a non-positive `dt`
    /// repeats the previous velocity. Zero when nothing is held.
    pub fn velocity_toward(&mut self, position: &Vector3<f64>, yaw: f64, dt: f64) -> Vector2<f64> {
        let Some(hold) = self.hold else {
            return Vector2::zeros();
        };

        if dt > 0.0 {
            let target = self.target_velocity(hold - position.xy());
            let max_step = self.config.max_acceleration * dt;
            let mut step = target - self.velocity;
            let change = step.norm();
            if change > max_step {
                step *= max_step / change;
            }
            self.velocity += step;
        }

        world_to_level(&Vector3::new(self.velocity.x, self.velocity.y, 0.0), yaw).xy()
    }

    fn target_velocity(&self, offset: Vector2<f64>) -> Vector2<f64> {
        let distance = offset.norm();
        if distance <= self.config.tolerance {
            return Vector2::zeros();
        }

        let stopping_speed = (2.0 * self.config.max_acceleration * distance).sqrt();
        let speed = (self.config.gain * distance)
            .min(self.config.max_speed)
            .min(stopping_speed);
        offset * (speed / distance)
    }
}

impl Default for PositionHolder {
    fn default() -> Self {
        Self::new(PositionHoldConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Holder whose acceleration never binds over a 1 s step
    fn responsive() -> PositionHolder {
        PositionHolder::new(PositionHoldConfig {
            max_acceleration: 100.0,
            ..Default::default()
        })
    }

    #[test]
    fn test_nothing_held_is_zero() {
        let mut holder = PositionHolder::default();
        let v = holder.velocity_toward(&Vector3::new(1.0, 1.0, 1.0), 0.0, 0.1);
        assert_eq!(v, Vector2::zeros());
    }

    #[test]
    fn test_within_tolerance_is_zero() {
        let mut holder = PositionHolder::default();
        holder.hold_at(1.0, 2.0);
        let v = holder.velocity_toward(&Vector3::new(1.01, 2.02, 0.5), 0.0, 0.1);
        assert_eq!(v, Vector2::zeros());
    }

    #[test]
    fn test_proportional_toward_hold() {
        let mut holder = responsive();
        holder.hold_at(0.0, 0.0);
        let v = holder.velocity_toward(&Vector3::new(0.2, 0.0, 1.0), 0.0, 1.0);
        assert_relative_eq!(v, Vector2::new(-0.2, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_speed_capped() {
        let mut holder = responsive();
        holder.hold_at(0.0, 0.0);
        let v = holder.velocity_toward(&Vector3::new(3.0, 4.0, 1.0), 0.0, 1.0);
        assert_relative_eq!(v.norm(), 0.5, epsilon = 1e-12);
        assert!(v.x < 0.0 && v.y < 0.0);
    }

    #[test]
    fn test_rotated_into_heading_frame() {
        let mut holder = responsive();
        holder.hold_at(0.0, 0.3);
        // Facing +y, the hold point is straight ahead
        let v = holder.velocity_toward(&Vector3::new(0.0, 0.0, 1.0), PI / 2.0, 1.0);
        assert_relative_eq!(v, Vector2::new(0.3, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_large_offset_ramps_up() {
        let mut holder = PositionHolder::default();
        holder.hold_at(0.0, 0.0);
        let position = Vector3::new(3.0, 0.0, 1.0);

        // 0.5 m/s² over 0.1 s steps
        let first = holder.velocity_toward(&position, 0.0, 0.1);
        assert_relative_eq!(first, Vector2::new(-0.05, 0.0), epsilon = 1e-12);
        let second = holder.velocity_toward(&position, 0.0, 0.1);
        assert_relative_eq!(second, Vector2::new(-0.1, 0.0), epsilon = 1e-12);

        for _ in 0..20 {
            holder.velocity_toward(&position, 0.0, 0.1);
        }
        let cruise = holder.velocity_toward(&position, 0.0, 0.1);
        assert_relative_eq!(cruise.norm(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_slows_to_stop_within_offset() {
        let mut holder = PositionHolder::new(PositionHoldConfig {
            gain: 10.0,
            ..Default::default()
        });
        holder.hold_at(0.0, 0.0);

        // 0.1 m away: √(2 · 0.5 · 0.1) m/s still stops in time
        let position = Vector3::new(0.0, 0.1, 1.0);
        let mut v = Vector2::zeros();
        for _ in 0..50 {
            v = holder.velocity_toward(&position, 0.0, 0.1);
        }
        assert_relative_eq!(v, Vector2::new(0.0, -0.1_f64.sqrt()), epsilon = 1e-12);
    }

    #[test]
    fn test_reaching_tolerance_brakes_gradually() {
        let mut holder = PositionHolder::default();
        holder.hold_at(0.0, 0.0);
        for _ in 0..30 {
            holder.velocity_toward(&Vector3::new(2.0, 0.0, 1.0), 0.0, 0.1);
        }

        let v = holder.velocity_toward(&Vector3::new(0.01, 0.0, 1.0), 0.0, 0.1);
        assert_relative_eq!(v, Vector2::new(-0.45, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_dt_repeats_velocity() {
        let mut holder = PositionHolder::default();
        holder.hold_at(0.0, 0.0);
        let position = Vector3::new(1.0, 0.0, 1.0);
        let v = holder.velocity_toward(&position, 0.0, 0.1);
        assert_eq!(holder.velocity_toward(&position, 0.0, 0.0), v);
    }

    #[test]
    fn test_new_hold_starts_from_rest() {
        let mut holder = PositionHolder::default();
        holder.hold_at(0.0, 0.0);
        for _ in 0..10 {
            holder.velocity_toward(&Vector3::new(1.0, 0.0, 1.0), 0.0, 0.1);
        }

        holder.hold_at(1.0, 0.0);
        let v = holder.velocity_toward(&Vector3::new(1.0, 0.0, 1.0), 0.0, 0.0);
        assert_eq!(v, Vector2::zeros());
    }
}
