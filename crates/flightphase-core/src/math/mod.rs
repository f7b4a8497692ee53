//! Mathematical utilities
//!
//! Angle wrapping and yaw extraction, plus the scalar ramp and rate
//! limiting helpers shared by the sequencers.

pub mod angle;
pub mod ramp;

pub use angle::*;
pub use ramp::*;
