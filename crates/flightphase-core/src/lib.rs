//! # Flightphase Core
//!
//! Flight-phase control core for an autonomous multirotor.
//!
//! Converts a commanded velocity into per-axis attitude targets and throttle
//! at a fixed control rate, using pose feedback with strict staleness
//! enforcement.
//!
//! ## Modules
//!
//! - [`math`]: Angle wrapping, interpolation and rate limiting
//! - [`types`]: Pose, velocity, odometry and command samples
//! - [`error`]: Per-tick failure taxonomy
//! - [`interfaces`]: Collaborator contracts (pose stream, interpolators,
//!   arm/disarm channel, thrust model) and in-process implementations
//! - [`estimation`]: Velocity estimation from pose pairs
//! - [`control`]: Feed-forward PID loops and the velocity controller
//! - [`simulation`]: Point-mass vehicle used for closed-loop testing

pub mod math;
pub mod types;
pub mod error;
pub mod interfaces;
pub mod estimation;
pub mod control;
pub mod simulation;

pub use error::{Axis, Feed, FlightError, NotReadyReason};
pub use types::*;

// Common type aliases
use nalgebra::{UnitQuaternion, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// Unit quaternion type for rotations
pub type Quat = UnitQuaternion<f64>;

/// Gravity constant [m/s²]
pub const GRAVITY: f64 = 9.81;

/// Converts a non-negative duration in seconds to a wall-clock wait.
///
/// Negative or non-finite values collapse to zero.
pub fn wait_duration(seconds: f64) -> std::time::Duration {
    std::time::Duration::try_from_secs_f64(seconds).unwrap_or(std::time::Duration::ZERO)
}
