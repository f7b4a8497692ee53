//! Collaborator contracts
//!
//! The control core pulls every external input through these traits with an
//! explicit timeout, so each tick is a deterministic function of the
//! caller-supplied time and the buffered samples.
//!
//! - [`PoseSource`]: pose at or after a time, waiting up to a bound
//! - [`Interpolator`]: linearly interpolated battery/odometry values
//! - [`ArmService`]: arm/disarm request channel
//! - [`ThrustModel`]: throttle needed for a thrust at a battery voltage

pub mod pose_stream;
pub mod interpolator;
pub mod thrust;

pub use pose_stream::{PosePublisher, PoseStream};
pub use interpolator::LinearInterpolator;
pub use thrust::QuadraticThrustModel;

use std::time::Duration;

use crate::error::FlightError;
use crate::types::PoseSample;

/// Source of vehicle poses
pub trait PoseSource {
    /// Earliest buffered pose with `time >= time`, waiting up to `max_wait`
    /// for one to arrive
    ///
    /// Never returns a sample older than `time`.
    fn pose_at_or_after(&mut self, time: f64, max_wait: Duration) -> Result<PoseSample, FlightError>;
}

/// Buffered, linearly interpolated feed
pub trait Interpolator<V> {
    /// Value at `time`, failing when the bracketing samples are more than
    /// `timeout` apart or the newest sample is more than `timeout` old
    fn value_at(&mut self, time: f64, timeout: f64) -> Result<V, FlightError>;

    /// Block until at least one sample is buffered or `timeout` elapses
    fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), FlightError>;
}

/// Reply from the arm/disarm channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmOutcome {
    Accepted,
    Rejected,
    TimedOut,
}

/// Synchronous arm/disarm request channel
pub trait ArmService {
    fn set_armed(&mut self, armed: bool) -> ArmOutcome;
}

/// Maps desired thrust to throttle for the current battery state
pub trait ThrustModel {
    /// Throttle [%] producing `thrust` [N] at battery `voltage` [V]
    fn throttle_for(&self, voltage: f64, thrust: f64) -> f64;

    /// Vehicle mass the model was fitted for [kg]
    fn mass(&self) -> f64;
}

impl<T: PoseSource + ?Sized> PoseSource for Box<T> {
    fn pose_at_or_after(&mut self, time: f64, max_wait: Duration) -> Result<PoseSample, FlightError> {
        (**self).pose_at_or_after(time, max_wait)
    }
}

impl<T: ArmService + ?Sized> ArmService for Box<T> {
    fn set_armed(&mut self, armed: bool) -> ArmOutcome {
        (**self).set_armed(armed)
    }
}
