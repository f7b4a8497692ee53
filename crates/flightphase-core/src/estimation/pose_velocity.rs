//! Pose velocity estimator
//!
//! Differentiates consecutive pose samples:
//!
//! v = (p₂ - p₁) / (t₂ - t₁)
//! ψ̇ = wrap(ψ₂ - ψ₁) / (t₂ - t₁)
//!
//! Two samples further apart than the configured gap do not form a velocity.

use crate::error::{FlightError, NotReadyReason};
use crate::math::angle_difference;
use crate::types::{PoseSample, VelocitySample};

/// Default maximum spacing of two samples that form a velocity [s]
pub const DEFAULT_MAX_SAMPLE_GAP: f64 = 0.3;

/// Velocity between two pose samples
///
/// Fails without dividing when the second sample is not strictly newer.
pub fn estimate_velocity(first: &PoseSample, second: &PoseSample) -> Result<VelocitySample, FlightError> {
    let dt = second.time - first.time;
    if dt == 0.0 {
        return Err(FlightError::DegenerateInterval { time: second.time });
    }
    if dt < 0.0 {
        return Err(FlightError::NonMonotonicTime {
            last: first.time,
            now: second.time,
        });
    }

    let yaw = second.yaw();
    Ok(VelocitySample {
        time: second.time,
        linear: (second.position - first.position) / dt,
        yaw_rate: angle_difference(first.yaw(), yaw) / dt,
        yaw,
    })
}

/// Keeps the last pose sample and turns each new one into a velocity
#[derive(Debug, Clone)]
pub struct PoseVelocityEstimator {
    max_sample_gap: f64,
    last_pose: Option<PoseSample>,
    last_velocity: Option<VelocitySample>,
    /// Why `last_pose` has no velocity yet
    warm_up: Option<NotReadyReason>,
}

impl PoseVelocityEstimator {
    pub fn new(max_sample_gap: f64) -> Self {
        Self {
            max_sample_gap,
            last_pose: None,
            last_velocity: None,
            warm_up: None,
        }
    }

    /// Feed the next pose sample
    ///
    /// The first sample, and the first after a gap, only prime the
    /// estimator and report [`FlightError::NotReady`]. A repeated sample
    /// yields the same result as the first time it was fed.
    pub fn update(&mut self, pose: PoseSample) -> Result<VelocitySample, FlightError> {
        let Some(previous) = self.last_pose.as_ref() else {
            return Err(self.prime(pose, NotReadyReason::FirstSample));
        };

        if pose.time == previous.time {
            if let Some(velocity) = self.last_velocity.filter(|velocity| velocity.time == pose.time) {
                return Ok(velocity);
            }
            return Err(match self.warm_up {
                Some(reason) => FlightError::NotReady(reason),
                None => FlightError::DegenerateInterval { time: pose.time },
            });
        }

        if pose.time < previous.time {
            return Err(FlightError::NonMonotonicTime {
                last: previous.time,
                now: pose.time,
            });
        }

        let gap = pose.time - previous.time;
        if gap > self.max_sample_gap {
            let max_gap = self.max_sample_gap;
            return Err(self.prime(pose, NotReadyReason::SampleGap { gap, max_gap }));
        }

        let velocity = estimate_velocity(previous, &pose)?;
        self.last_pose = Some(pose);
        self.last_velocity = Some(velocity);
        self.warm_up = None;
        Ok(velocity)
    }

    /// Forget all samples; the next update only primes the estimator
    pub fn reset(&mut self) {
        self.last_pose = None;
        self.last_velocity = None;
        self.warm_up = None;
    }

    fn prime(&mut self, pose: PoseSample, reason: NotReadyReason) -> FlightError {
        self.last_pose = Some(pose);
        self.last_velocity = None;
        self.warm_up = Some(reason);
        FlightError::NotReady(reason)
    }

    pub fn last_pose(&self) -> Option<&PoseSample> {
        self.last_pose.as_ref()
    }

    pub fn last_velocity(&self) -> Option<&VelocitySample> {
        self.last_velocity.as_ref()
    }

    pub fn max_sample_gap(&self) -> f64 {
        self.max_sample_gap
    }
}

impl Default for PoseVelocityEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLE_GAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    fn pose(time: f64, position: Vector3<f64>, yaw: f64) -> PoseSample {
        PoseSample::level(time, position, yaw)
    }

    #[test]
    fn test_equal_timestamps_fail() {
        let a = pose(1.0, Vector3::zeros(), 0.0);
        let b = pose(1.0, Vector3::new(1.0, 0.0, 0.0), 0.0);
        assert_eq!(
            estimate_velocity(&a, &b),
            Err(FlightError::DegenerateInterval { time: 1.0 })
        );
    }

    #[test]
    fn test_linear_velocity_is_finite_difference() {
        let a = pose(2.0, Vector3::new(1.0, 2.0, 3.0), 0.0);
        let b = pose(2.25, Vector3::new(1.5, 1.0, 3.25), 0.0);
        let v = estimate_velocity(&a, &b).unwrap();

        assert_relative_eq!(v.linear, Vector3::new(2.0, -4.0, 1.0), epsilon = 1e-12);
        assert_eq!(v.time, 2.25);
    }

    #[test]
    fn test_yaw_rate_wraps_across_pi() {
        let dt = 0.1;
        let a = pose(0.0, Vector3::zeros(), PI - 0.05);
        let b = pose(dt, Vector3::zeros(), -PI + 0.05);
        let v = estimate_velocity(&a, &b).unwrap();

        assert_relative_eq!(v.yaw_rate, 0.1 / dt, epsilon = 1e-9);
        assert!(v.yaw_rate > -PI / dt && v.yaw_rate <= PI / dt);
    }

    #[test]
    fn test_yaw_rate_bounded_for_any_pair() {
        let dt = 0.05;
        for i in 0..64 {
            let yaw1 = -PI + i as f64 * 0.1;
            for j in 0..64 {
                let yaw2 = -PI + j as f64 * 0.1;
                let v = estimate_velocity(
                    &pose(0.0, Vector3::zeros(), yaw1),
                    &pose(dt, Vector3::zeros(), yaw2),
                )
                .unwrap();
                assert!(v.yaw_rate > -PI / dt - 1e-9 && v.yaw_rate <= PI / dt + 1e-9);
            }
        }
    }

    #[test]
    fn test_first_sample_is_not_ready() {
        let mut estimator = PoseVelocityEstimator::default();
        let result = estimator.update(pose(0.0, Vector3::zeros(), 0.0));
        assert_eq!(result, Err(FlightError::NotReady(NotReadyReason::FirstSample)));

        let v = estimator.update(pose(0.1, Vector3::new(0.05, 0.0, 0.0), 0.0)).unwrap();
        assert_relative_eq!(v.linear.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_gap_restarts_estimate() {
        let mut estimator = PoseVelocityEstimator::new(0.3);
        let _ = estimator.update(pose(0.0, Vector3::zeros(), 0.0));
        let result = estimator.update(pose(0.5, Vector3::zeros(), 0.0));
        assert!(matches!(
            result,
            Err(FlightError::NotReady(NotReadyReason::SampleGap { .. }))
        ));

        // The late sample primed the estimator
        assert!(estimator.update(pose(0.6, Vector3::zeros(), 0.0)).is_ok());
    }

    #[test]
    fn test_repeated_sample_returns_same_velocity() {
        let mut estimator = PoseVelocityEstimator::default();
        let _ = estimator.update(pose(0.0, Vector3::zeros(), 0.0));
        let first = estimator.update(pose(0.1, Vector3::new(0.1, 0.0, 0.0), 0.0)).unwrap();
        let again = estimator.update(pose(0.1, Vector3::new(0.1, 0.0, 0.0), 0.0)).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_repeated_first_sample_stays_not_ready() {
        let mut estimator = PoseVelocityEstimator::default();
        let _ = estimator.update(pose(0.0, Vector3::zeros(), 0.0));
        let result = estimator.update(pose(0.0, Vector3::zeros(), 0.0));
        assert_eq!(result, Err(FlightError::NotReady(NotReadyReason::FirstSample)));
        assert!(result.unwrap_err().is_warming_up());
    }

    #[test]
    fn test_repeated_sample_after_gap_reports_gap() {
        let mut estimator = PoseVelocityEstimator::new(0.3);
        let _ = estimator.update(pose(0.0, Vector3::zeros(), 0.0));
        let first = estimator.update(pose(0.5, Vector3::zeros(), 0.0));
        let again = estimator.update(pose(0.5, Vector3::zeros(), 0.0));
        assert!(matches!(
            again,
            Err(FlightError::NotReady(NotReadyReason::SampleGap { .. }))
        ));
        assert_eq!(first, again);

        // A fresh velocity clears the warm-up reason
        assert!(estimator.update(pose(0.6, Vector3::zeros(), 0.0)).is_ok());
        assert!(estimator.update(pose(0.6, Vector3::zeros(), 0.0)).is_ok());
    }
}
