//! Landing sequencer
//!
//! Descends at a profiled rate while holding the horizontal position
//! captured at handoff, then disarms once the vehicle is down:
//!
//! ```text
//! DESCEND ──z ≤ landing_detected_height, disarm accepted──▶ DONE
//! ```
//!
//! The descent rate r approaches the profile target with bounded change:
//!
//! r ← r + clamp(r* - r, ±a·dt)
//! (r*, a) = (descend_rate, descend_acceleration)   z > cushion_height
//!           (cushion_rate, cushion_acceleration)   otherwise

use log::{debug, info, warn};
use nalgebra::Vector3;

use flightphase_core::interfaces::{ArmOutcome, ArmService, PoseSource};
use flightphase_core::math::rate_limit;
use flightphase_core::types::MotionPoint;
use flightphase_core::{wait_duration, Feed, FlightError};

use crate::config::LandingConfig;
use crate::hold::PositionHolder;
use crate::phase::FlightPhase;

const PHASE: &str = "landing";

/// Landing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandState {
    Descend,
    Done,
}

impl LandState {
    pub fn name(&self) -> &'static str {
        match self {
            LandState::Descend => "DESCEND",
            LandState::Done => "DONE",
        }
    }
}

/// Profiled descent with touchdown detection
pub struct LandingSequencer<P, A> {
    config: LandingConfig,
    poses: P,
    arm: A,
    holder: PositionHolder,
    state: LandState,
    /// Current descent rate [m/s], positive down
    rate: f64,
    last_update_time: Option<f64>,
    /// Set once the first update after handoff has produced a target
    engaged: bool,
}

impl<P: PoseSource, A: ArmService> LandingSequencer<P, A> {
    pub fn new(config: LandingConfig, poses: P, arm: A) -> Self {
        let holder = PositionHolder::new(config.hold.clone());
        Self {
            config,
            poses,
            arm,
            holder,
            state: LandState::Descend,
            rate: 0.0,
            last_update_time: None,
            engaged: false,
        }
    }

    pub fn config(&self) -> &LandingConfig {
        &self.config
    }

    pub fn state(&self) -> LandState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == LandState::Done
    }

    /// Current descent rate [m/s], positive down
    pub fn descent_rate(&self) -> f64 {
        self.rate
    }

    pub fn holder(&self) -> &PositionHolder {
        &self.holder
    }

    /// Block until the pose stream has produced a first sample
    pub fn wait_until_ready(&mut self) -> Result<(), FlightError> {
        let wait = wait_duration(self.config.startup_timeout);
        self.poses.pose_at_or_after(f64::NEG_INFINITY, wait).map(|_| ())
    }

    /// Capture the hold position at `time` and start descending from rest
    ///
    /// Not allowed once a descent is under way.
    pub fn prepare_for_takeover(&mut self, time: f64) -> Result<(), FlightError> {
        if self.state == LandState::Descend && self.engaged {
            return Err(self.invalid("prepare_for_takeover"));
        }

        let pose = self
            .poses
            .pose_at_or_after(time, wait_duration(self.config.update_timeout))?;

        self.holder.hold_at(pose.position.x, pose.position.y);
        self.state = LandState::Descend;
        self.rate = 0.0;
        self.last_update_time = Some(time);
        self.engaged = false;
        info!(
            "landing: holding ({:.2}, {:.2}) from height {:.2} at t={time:.3}",
            pose.position.x, pose.position.y, pose.position.z
        );
        Ok(())
    }

    /// Descent target for `time`, or the touchdown point once landed
    pub fn update(&mut self, time: f64) -> Result<MotionPoint, FlightError> {
        if self.state == LandState::Done {
            return Err(self.invalid("update"));
        }
        let Some(last) = self.last_update_time else {
            return Err(self.invalid("update"));
        };

        if time < last {
            return Err(FlightError::NonMonotonicTime { last, now: time });
        }
        let dt = time - last;
        if dt > self.config.update_timeout {
            self.last_update_time = Some(time);
            warn!("landing: {dt:.3}s since last update, skipping tick");
            return Err(FlightError::StaleInput {
                feed: Feed::Update,
                age: dt,
                timeout: self.config.update_timeout,
            });
        }

        let pose = self
            .poses
            .pose_at_or_after(time, wait_duration(self.config.update_timeout))?;
        self.last_update_time = Some(time);
        let height = pose.position.z;

        if height <= self.config.landing_detected_height {
            match self.arm.set_armed(false) {
                ArmOutcome::Accepted => {}
                ArmOutcome::Rejected => {
                    warn!("landing: disarm rejected at height {height:.3}");
                    return Err(FlightError::CommandRejected { command: "disarm" });
                }
                ArmOutcome::TimedOut => {
                    warn!("landing: disarm timed out at height {height:.3}");
                    return Err(FlightError::Unavailable { feed: Feed::ArmService });
                }
            }
            info!("landing: DESCEND -> DONE at t={time:.3}, height {height:.3}");
            self.state = LandState::Done;
            self.rate = 0.0;
            return Ok(MotionPoint {
                time,
                position: pose.position,
                velocity: Vector3::zeros(),
                acceleration: Vector3::zeros(),
            });
        }

        let (target_rate, acceleration) = if height > self.config.cushion_height {
            (self.config.descend_rate, self.config.descend_acceleration)
        } else {
            (self.config.cushion_rate, self.config.cushion_acceleration)
        };
        let rate = rate_limit(self.rate, target_rate, acceleration, dt);
        let vertical_acceleration = if dt > 0.0 { -(rate - self.rate) / dt } else { 0.0 };
        self.rate = rate;
        self.engaged = true;

        let horizontal = self.holder.velocity_toward(&pose.position, pose.yaw(), dt);
        let hold = self.holder.hold_position().unwrap_or_else(|| pose.position.xy());

        debug!("landing: t={time:.3} height={height:.3} rate={rate:.3}");

        Ok(MotionPoint {
            time,
            position: Vector3::new(hold.x, hold.y, height),
            velocity: Vector3::new(horizontal.x, horizontal.y, -rate),
            acceleration: Vector3::new(0.0, 0.0, vertical_acceleration),
        })
    }

    fn invalid(&self, operation: &'static str) -> FlightError {
        FlightError::InvalidTransition {
            phase: PHASE,
            state: self.state.name(),
            operation,
        }
    }
}

impl<P: PoseSource, A: ArmService> FlightPhase for LandingSequencer<P, A> {
    type Output = MotionPoint;

    fn name(&self) -> &'static str {
        PHASE
    }

    fn wait_until_ready(&mut self) -> Result<(), FlightError> {
        LandingSequencer::wait_until_ready(self)
    }

    fn prepare_for_takeover(&mut self, time: f64) -> Result<(), FlightError> {
        LandingSequencer::prepare_for_takeover(self, time)
    }

    fn update(&mut self, time: f64) -> Result<MotionPoint, FlightError> {
        LandingSequencer::update(self, time)
    }

    fn is_done(&self) -> bool {
        LandingSequencer::is_done(self)
    }
}
