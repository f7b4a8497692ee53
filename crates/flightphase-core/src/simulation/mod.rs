//! Simulation framework
//!
//! Point-mass multirotor that responds to [`crate::ControlCommand`]s, for
//! exercising the control core in closed loop.

pub mod vehicle;

pub use vehicle::*;
