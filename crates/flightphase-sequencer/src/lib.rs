//! Flightphase Sequencer
//!
//! Terminal flight phases of an autonomous multirotor, built on
//! `flightphase-core`.
//!
//! # Phases
//!
//! ```text
//! takeoff:   ARM ──arm accepted──▶ RAMP ──ramp elapsed──▶ PAUSE ──settled──▶ DONE
//! landing:   DESCEND ──height ≤ landing_detected_height, disarmed──▶ DONE
//! ```
//!
//! An external supervisor picks the active phase each tick and switches to
//! the velocity controller once takeoff is done. Every phase reports
//! failures per tick; none of them decide a fail-safe.
//!
//! # Components
//!
//! - [`config`]: Tunables and JSON loading
//! - [`phase`]: The [`FlightPhase`] handoff interface
//! - [`takeoff`]: Arm and throttle ramp sequencer
//! - [`landing`]: Profiled descent and touchdown detection
//! - [`hold`]: Horizontal position hold

pub mod config;
pub mod phase;
pub mod takeoff;
pub mod landing;
pub mod hold;

// Re-exports
pub use config::{ConfigError, FlightConfig, LandingConfig, TakeoffConfig};
pub use hold::{PositionHoldConfig, PositionHolder};
pub use landing::{LandState, LandingSequencer};
pub use phase::FlightPhase;
pub use takeoff::{TakeoffSequencer, TakeoffState};
