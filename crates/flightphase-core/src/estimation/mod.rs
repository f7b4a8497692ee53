//! State estimation
//!
//! - Velocity estimation by differentiating consecutive pose samples

pub mod pose_velocity;

pub use pose_velocity::*;
