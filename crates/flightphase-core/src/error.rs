//! Tick failure taxonomy
//!
//! Every public operation reports failures synchronously through
//! [`FlightError`]. None of them decide a fail-safe; that is the caller's job.

use std::fmt;

use thiserror::Error;

/// Input channel a failure refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Pose,
    Battery,
    Odometry,
    ArmService,
    /// Cadence of the caller's own update calls
    Update,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Feed::Pose => "pose",
            Feed::Battery => "battery",
            Feed::Odometry => "odometry",
            Feed::ArmService => "arm service",
            Feed::Update => "update",
        };
        f.write_str(name)
    }
}

/// Command output axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Throttle,
    Pitch,
    Roll,
    Yaw,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Throttle => "throttle",
            Axis::Pitch => "pitch",
            Axis::Roll => "roll",
            Axis::Yaw => "yaw",
        };
        f.write_str(name)
    }
}

/// Why a velocity estimate is not available yet
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NotReadyReason {
    /// No earlier pose sample to differentiate against
    FirstSample,
    /// The previous pose sample was too far in the past
    SampleGap { gap: f64, max_gap: f64 },
}

impl fmt::Display for NotReadyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotReadyReason::FirstSample => f.write_str("waiting for a second pose sample"),
            NotReadyReason::SampleGap { gap, max_gap } => {
                write!(f, "pose samples {gap:.3}s apart, more than {max_gap:.3}s")
            }
        }
    }
}

/// Failure of a single tick or handoff call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightError {
    #[error("{feed} input is stale: {age:.3}s old, timeout {timeout:.3}s")]
    StaleInput { feed: Feed, age: f64, timeout: f64 },
    #[error("{feed} input unavailable")]
    Unavailable { feed: Feed },
    #[error("velocity estimate not ready: {0}")]
    NotReady(NotReadyReason),
    #[error("pose samples share timestamp {time}")]
    DegenerateInterval { time: f64 },
    #[error("time went backwards: last {last}, now {now}")]
    NonMonotonicTime { last: f64, now: f64 },
    #[error("{axis} output {value:.3} beyond recoverable limit {limit:.3}")]
    Saturated { axis: Axis, value: f64, limit: f64 },
    #[error("{phase}: {operation} not allowed in state {state}")]
    InvalidTransition {
        phase: &'static str,
        state: &'static str,
        operation: &'static str,
    },
    #[error("{command} request rejected")]
    CommandRejected { command: &'static str },
}

impl FlightError {
    /// Failures expected while feeds warm up; the next tick may succeed
    pub fn is_warming_up(&self) -> bool {
        matches!(self, FlightError::NotReady(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_feed() {
        let err = FlightError::StaleInput {
            feed: Feed::Battery,
            age: 0.5,
            timeout: 0.25,
        };
        assert_eq!(err.to_string(), "battery input is stale: 0.500s old, timeout 0.250s");
    }

    #[test]
    fn test_warming_up_classification() {
        assert!(FlightError::NotReady(NotReadyReason::FirstSample).is_warming_up());
        assert!(!FlightError::Unavailable { feed: Feed::Pose }.is_warming_up());
    }
}
