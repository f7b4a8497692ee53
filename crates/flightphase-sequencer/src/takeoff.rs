//! Takeoff sequencer
//!
//! Arms the vehicle, then ramps throttle between two thrust levels expressed
//! as fractions of hover thrust, then holds the final throttle briefly:
//!
//! ```text
//! ARM ──arm accepted──▶ RAMP ──t - t_ramp ≥ ramp_duration──▶ PAUSE ──t - t_pause ≥ pause_duration──▶ DONE
//! ```
//!
//! Ramp throttle at time t (after the post-arm delay):
//!
//! u(t) = u₀ + (u₁ - u₀)·clamp((t - t_ramp)/T, 0, 1)
//! u₀ = throttle_for(V, r₀·m·g),  u₁ = throttle_for(V, r₁·m·g)
//!
//! where V is the interpolated battery voltage at t. At most one transition
//! happens per update.

use log::{info, warn};

use flightphase_core::interfaces::{ArmOutcome, ArmService, Interpolator, ThrustModel};
use flightphase_core::math::linear_ramp;
use flightphase_core::types::{ControlCommand, Odometry};
use flightphase_core::{wait_duration, Feed, FlightError, GRAVITY};

use crate::config::TakeoffConfig;
use crate::phase::FlightPhase;

const PHASE: &str = "takeoff";

/// Takeoff state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeoffState {
    Arm,
    Ramp,
    Pause,
    Done,
}

impl TakeoffState {
    pub fn name(&self) -> &'static str {
        match self {
            TakeoffState::Arm => "ARM",
            TakeoffState::Ramp => "RAMP",
            TakeoffState::Pause => "PAUSE",
            TakeoffState::Done => "DONE",
        }
    }
}

/// Arm and throttle ramp sequencer
///
/// `M` is copied in at construction so the velocity controller that takes
/// over can be tuned from the same model via [`Self::thrust_model`].
pub struct TakeoffSequencer<M, A, B, O> {
    config: TakeoffConfig,
    thrust_model: M,
    arm: A,
    battery: B,
    odometry: O,
    state: TakeoffState,
    throttle: f64,
    arm_time: Option<f64>,
    ramp_start_time: f64,
    pause_start_time: f64,
    last_update_time: Option<f64>,
    last_odometry: Option<Odometry>,
}

impl<M, A, B, O> TakeoffSequencer<M, A, B, O>
where
    M: ThrustModel,
    A: ArmService,
    B: Interpolator<f64>,
    O: Interpolator<Odometry>,
{
    pub fn new(config: TakeoffConfig, thrust_model: M, arm: A, battery: B, odometry: O) -> Self {
        Self {
            config,
            thrust_model,
            arm,
            battery,
            odometry,
            state: TakeoffState::Arm,
            throttle: 0.0,
            arm_time: None,
            ramp_start_time: 0.0,
            pause_start_time: 0.0,
            last_update_time: None,
            last_odometry: None,
        }
    }

    pub fn config(&self) -> &TakeoffConfig {
        &self.config
    }

    pub fn state(&self) -> TakeoffState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == TakeoffState::Done
    }

    /// Thrust model the sequencer was built with
    pub fn thrust_model(&self) -> &M {
        &self.thrust_model
    }

    /// Time the arm request was accepted
    pub fn arm_time(&self) -> Option<f64> {
        self.arm_time
    }

    /// Most recently emitted throttle [%]
    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    /// Odometry read on the last successful update
    pub fn last_odometry(&self) -> Option<Odometry> {
        self.last_odometry
    }

    /// Block until the battery and odometry feeds have data
    pub fn wait_until_ready(&mut self) -> Result<(), FlightError> {
        let timeout = wait_duration(self.config.startup_timeout);
        self.battery.wait_until_ready(timeout)?;
        self.odometry.wait_until_ready(timeout)
    }

    /// Start (or restart) the sequence at `time`
    ///
    /// Not allowed while ramping or pausing. Fails without a state change
    /// when battery or odometry is unavailable at `time`.
    pub fn prepare_for_takeover(&mut self, time: f64) -> Result<(), FlightError> {
        if matches!(self.state, TakeoffState::Ramp | TakeoffState::Pause) {
            return Err(self.invalid("prepare_for_takeover"));
        }

        self.battery.value_at(time, self.config.battery_timeout)?;
        let odometry = self.odometry.value_at(time, self.config.update_timeout)?;

        self.state = TakeoffState::Arm;
        self.throttle = 0.0;
        self.arm_time = None;
        self.ramp_start_time = time;
        self.pause_start_time = time;
        self.last_update_time = Some(time);
        self.last_odometry = Some(odometry);
        info!("takeoff: prepared at t={time:.3}");
        Ok(())
    }

    /// Advance the sequence to `time` and return the throttle command
    pub fn update(&mut self, time: f64) -> Result<ControlCommand, FlightError> {
        if self.state == TakeoffState::Done {
            return Err(self.invalid("update"));
        }

        if let Some(last) = self.last_update_time {
            if time < last {
                return Err(FlightError::NonMonotonicTime { last, now: time });
            }
            let elapsed = time - last;
            if elapsed > self.config.update_timeout {
                // Resume where the ramp left off instead of jumping ahead
                self.ramp_start_time += elapsed;
                self.pause_start_time += elapsed;
                self.last_update_time = Some(time);
                warn!(
                    "takeoff: {elapsed:.3}s since last update in {}, holding progress",
                    self.state.name()
                );
                return Err(FlightError::StaleInput {
                    feed: Feed::Update,
                    age: elapsed,
                    timeout: self.config.update_timeout,
                });
            }
        }

        let voltage = self.battery.value_at(time, self.config.battery_timeout)?;
        let odometry = self.odometry.value_at(time, self.config.update_timeout)?;

        let throttle = match self.state {
            TakeoffState::Arm => {
                match self.arm.set_armed(true) {
                    ArmOutcome::Accepted => {}
                    ArmOutcome::Rejected => {
                        warn!("takeoff: arm request rejected at t={time:.3}");
                        return Err(FlightError::CommandRejected { command: "arm" });
                    }
                    ArmOutcome::TimedOut => {
                        warn!("takeoff: arm request timed out at t={time:.3}");
                        return Err(FlightError::Unavailable { feed: Feed::ArmService });
                    }
                }
                self.arm_time = Some(time);
                self.ramp_start_time = time + self.config.post_arm_delay;
                self.transition(TakeoffState::Ramp, time);
                self.ramp_throttle(voltage, time)
            }
            TakeoffState::Ramp => {
                if time - self.ramp_start_time >= self.config.ramp_duration {
                    self.pause_start_time = time;
                    self.transition(TakeoffState::Pause, time);
                    self.end_throttle(voltage)
                } else {
                    self.ramp_throttle(voltage, time)
                }
            }
            TakeoffState::Pause => {
                if time - self.pause_start_time >= self.config.pause_duration {
                    self.transition(TakeoffState::Done, time);
                }
                self.end_throttle(voltage)
            }
            TakeoffState::Done => return Err(self.invalid("update")),
        };

        self.throttle = throttle;
        self.last_update_time = Some(time);
        self.last_odometry = Some(odometry);
        Ok(ControlCommand::level(time, throttle))
    }

    fn hover_thrust(&self) -> f64 {
        self.thrust_model.mass() * GRAVITY
    }

    fn end_throttle(&self, voltage: f64) -> f64 {
        self.thrust_model
            .throttle_for(voltage, self.config.ramp_end_thrust_ratio * self.hover_thrust())
    }

    fn ramp_throttle(&self, voltage: f64, time: f64) -> f64 {
        if time < self.ramp_start_time {
            // Armed and idling through the post-arm delay
            return 0.0;
        }
        let start = self
            .thrust_model
            .throttle_for(voltage, self.config.ramp_start_thrust_ratio * self.hover_thrust());
        let end = self.end_throttle(voltage);
        linear_ramp(start, end, time - self.ramp_start_time, self.config.ramp_duration)
    }

    fn transition(&mut self, next: TakeoffState, time: f64) {
        info!("takeoff: {} -> {} at t={time:.3}", self.state.name(), next.name());
        self.state = next;
    }

    fn invalid(&self, operation: &'static str) -> FlightError {
        FlightError::InvalidTransition {
            phase: PHASE,
            state: self.state.name(),
            operation,
        }
    }
}

impl<M, A, B, O> FlightPhase for TakeoffSequencer<M, A, B, O>
where
    M: ThrustModel,
    A: ArmService,
    B: Interpolator<f64>,
    O: Interpolator<Odometry>,
{
    type Output = ControlCommand;

    fn name(&self) -> &'static str {
        PHASE
    }

    fn wait_until_ready(&mut self) -> Result<(), FlightError> {
        TakeoffSequencer::wait_until_ready(self)
    }

    fn prepare_for_takeover(&mut self, time: f64) -> Result<(), FlightError> {
        TakeoffSequencer::prepare_for_takeover(self, time)
    }

    fn update(&mut self, time: f64) -> Result<ControlCommand, FlightError> {
        TakeoffSequencer::update(self, time)
    }

    fn is_done(&self) -> bool {
        TakeoffSequencer::is_done(self)
    }
}
