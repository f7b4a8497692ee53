//! Phase handoff interface
//!
//! The supervisor drives whichever phase is active through the same three
//! calls: wait for feeds at startup, prepare at the handoff instant, then
//! update once per tick until the phase reports done.

use flightphase_core::control::VelocityController;
use flightphase_core::interfaces::PoseSource;
use flightphase_core::types::ControlCommand;
use flightphase_core::FlightError;

/// A controller or sequencer that can take over the vehicle
pub trait FlightPhase {
    /// Per-tick output
    type Output;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Block until every feed the phase reads has produced data
    fn wait_until_ready(&mut self) -> Result<(), FlightError>;

    /// Take over from the previous phase at `time`
    fn prepare_for_takeover(&mut self, time: f64) -> Result<(), FlightError>;

    /// Output for `time`
    fn update(&mut self, time: f64) -> Result<Self::Output, FlightError>;

    /// Whether the phase has finished and should hand over
    fn is_done(&self) -> bool;
}

impl<P: PoseSource> FlightPhase for VelocityController<P> {
    type Output = ControlCommand;

    fn name(&self) -> &'static str {
        "velocity"
    }

    fn wait_until_ready(&mut self) -> Result<(), FlightError> {
        VelocityController::wait_until_ready(self)
    }

    fn prepare_for_takeover(&mut self, time: f64) -> Result<(), FlightError> {
        VelocityController::prepare_for_takeover(self, time)
    }

    fn update(&mut self, time: f64) -> Result<ControlCommand, FlightError> {
        self.get_target_motion_point(time)
    }

    /// Runs until the supervisor switches away
    fn is_done(&self) -> bool {
        false
    }
}
