//! Timestamped samples and commands
//!
//! All timestamps are seconds on the caller's clock.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::math::{lerp, yaw_from_quaternion};

/// Pose of the vehicle at an instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    /// Sample time [s]
    pub time: f64,
    /// Position [m] (world frame)
    pub position: Vector3<f64>,
    /// Orientation (body to world)
    pub orientation: UnitQuaternion<f64>,
}

impl PoseSample {
    pub fn new(time: f64, position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self { time, position, orientation }
    }

    /// Level pose at `position` with heading `yaw`
    pub fn level(time: f64, position: Vector3<f64>, yaw: f64) -> Self {
        Self::new(time, position, UnitQuaternion::from_euler_angles(0.0, 0.0, yaw))
    }

    /// Heading [rad]
    pub fn yaw(&self) -> f64 {
        yaw_from_quaternion(&self.orientation)
    }
}

/// Commanded velocity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    /// Linear velocity [m/s] (level frame: x forward, z up)
    pub linear: Vector3<f64>,
    /// Yaw rate [rad/s]
    pub yaw_rate: f64,
}

impl Twist {
    pub fn new(linear: Vector3<f64>, yaw_rate: f64) -> Self {
        Self { linear, yaw_rate }
    }

    pub fn linear(x: f64, y: f64, z: f64) -> Self {
        Self::new(Vector3::new(x, y, z), 0.0)
    }
}

/// Velocity derived from two pose samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocitySample {
    /// Time of the newer pose sample [s]
    pub time: f64,
    /// Linear velocity [m/s] (world frame)
    pub linear: Vector3<f64>,
    /// Yaw rate [rad/s]
    pub yaw_rate: f64,
    /// Heading at `time` [rad]
    pub yaw: f64,
}

/// Attitude and throttle command for the flight controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlCommand {
    /// Time the command was produced for [s]
    pub time: f64,
    /// Roll target [rad], positive accelerates toward level -y
    pub roll: f64,
    /// Pitch target [rad], positive accelerates toward level +x
    pub pitch: f64,
    /// Yaw rate target [rad/s]
    pub yaw_rate: f64,
    /// Throttle [%]
    pub throttle: f64,
}

impl ControlCommand {
    /// Level attitude at the given throttle
    pub fn level(time: f64, throttle: f64) -> Self {
        Self {
            time,
            roll: 0.0,
            pitch: 0.0,
            yaw_rate: 0.0,
            throttle,
        }
    }

    /// Same command restamped
    pub fn at(self, time: f64) -> Self {
        Self { time, ..self }
    }
}

/// Position/velocity/acceleration target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionPoint {
    /// Target time [s]
    pub time: f64,
    /// Position [m] (world frame)
    pub position: Vector3<f64>,
    /// Velocity [m/s] (level frame)
    pub velocity: Vector3<f64>,
    /// Acceleration [m/s²] (level frame)
    pub acceleration: Vector3<f64>,
}

impl MotionPoint {
    /// Velocity part as a velocity-controller target
    pub fn twist(&self) -> Twist {
        Twist::new(self.velocity, 0.0)
    }
}

/// Odometry feed value
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Odometry {
    /// Position [m] (world frame)
    pub position: Vector3<f64>,
    /// Velocity [m/s] (world frame)
    pub velocity: Vector3<f64>,
}

/// Sample carried through a feed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stamped<V> {
    pub time: f64,
    pub value: V,
}

impl<V> Stamped<V> {
    pub fn new(time: f64, value: V) -> Self {
        Self { time, value }
    }
}

/// Values that can be linearly interpolated between two samples
pub trait Lerp: Clone {
    fn lerp(&self, other: &Self, fraction: f64) -> Self;
}

impl Lerp for f64 {
    fn lerp(&self, other: &Self, fraction: f64) -> Self {
        lerp(*self, *other, fraction)
    }
}

impl Lerp for Vector3<f64> {
    fn lerp(&self, other: &Self, fraction: f64) -> Self {
        self + (other - self) * fraction
    }
}

impl Lerp for Odometry {
    fn lerp(&self, other: &Self, fraction: f64) -> Self {
        Self {
            position: self.position.lerp(&other.position, fraction),
            velocity: self.velocity.lerp(&other.velocity, fraction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_level_pose_yaw() {
        let pose = PoseSample::level(0.0, Vector3::zeros(), -0.7);
        assert_relative_eq!(pose.yaw(), -0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_odometry_lerp() {
        let a = Odometry {
            position: Vector3::new(0.0, 0.0, 1.0),
            velocity: Vector3::zeros(),
        };
        let b = Odometry {
            position: Vector3::new(2.0, 0.0, 3.0),
            velocity: Vector3::new(1.0, 0.0, 0.0),
        };
        let mid = a.lerp(&b, 0.5);
        assert_relative_eq!(mid.position, Vector3::new(1.0, 0.0, 2.0), epsilon = 1e-12);
        assert_relative_eq!(mid.velocity.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_command_restamp_keeps_values() {
        let cmd = ControlCommand::level(1.0, 42.0).at(2.0);
        assert_eq!(cmd.time, 2.0);
        assert_eq!(cmd.throttle, 42.0);
    }
}
