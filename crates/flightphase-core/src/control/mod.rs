//! Control algorithms
//!
//! - Feed-forward PID loop
//! - Velocity controller (thrust, pitch, roll and yaw loops)

pub mod pid;
pub mod velocity;

pub use pid::*;
pub use velocity::*;
