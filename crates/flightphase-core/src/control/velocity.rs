//! Quad velocity controller
//!
//! Accepts a target velocity and drives four feed-forward PID loops
//! (thrust, pitch, roll, yaw) toward it, using velocities estimated from
//! the pose stream.
//!
//! Sign conventions in the level (heading) frame:
//! - positive pitch accelerates toward +x
//! - positive roll accelerates toward -y
//! - throttle accelerates toward +z

use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::pid::{FeedForwardPid, PidSettings};
use crate::error::{Axis, FlightError};
use crate::estimation::{PoseVelocityEstimator, DEFAULT_MAX_SAMPLE_GAP};
use crate::interfaces::PoseSource;
use crate::math::world_to_level;
use crate::types::{ControlCommand, Twist};
use crate::wait_duration;

/// Output bounds enforced before a command is emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandLimits {
    /// Minimum throttle [%]
    pub throttle_min: f64,
    /// Maximum throttle [%]
    pub throttle_max: f64,
    /// Maximum roll/pitch magnitude [rad]
    pub max_tilt: f64,
    /// Maximum yaw rate magnitude [rad/s]
    pub max_yaw_rate: f64,
    /// How far past a bound a raw output may go before the tick fails
    /// instead of clamping. `None` always clamps.
    pub saturation_margin: Option<f64>,
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self {
            throttle_min: 0.0,
            throttle_max: 100.0,
            max_tilt: 0.35,
            max_yaw_rate: 1.5,
            saturation_margin: None,
        }
    }
}

impl CommandLimits {
    fn apply(&self, axis: Axis, value: f64, min: f64, max: f64) -> Result<f64, FlightError> {
        if !value.is_finite() {
            return Err(FlightError::Saturated { axis, value, limit: max });
        }
        if let Some(margin) = self.saturation_margin {
            if value > max + margin {
                return Err(FlightError::Saturated { axis, value, limit: max });
            }
            if value < min - margin {
                return Err(FlightError::Saturated { axis, value, limit: min });
            }
        }
        Ok(value.clamp(min, max))
    }
}

/// Velocity controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityControllerConfig {
    /// Vertical velocity → throttle [%]
    pub thrust_pid: PidSettings,
    /// Forward velocity → pitch [rad]
    pub pitch_pid: PidSettings,
    /// Lateral velocity → roll [rad]
    pub roll_pid: PidSettings,
    /// Yaw rate → yaw rate correction [rad/s]
    pub yaw_pid: PidSettings,
    /// Throttle expected to hold level hover [%]
    pub hover_throttle: f64,
    /// Longest wait for a pose at or after the tick time [s]
    pub max_transform_wait: f64,
    /// Longest spacing of two poses that form a velocity [s]
    pub max_sample_gap: f64,
    /// Longest wait for the first pose in `wait_until_ready` [s]
    pub startup_timeout: f64,
    /// Output bounds
    pub limits: CommandLimits,
}

impl Default for VelocityControllerConfig {
    fn default() -> Self {
        Self {
            thrust_pid: PidSettings::new(10.0, 2.0, 0.0, 15.0, -15.0),
            pitch_pid: PidSettings::new(0.1, 0.02, 0.0, 0.1, -0.1),
            roll_pid: PidSettings::new(0.1, 0.02, 0.0, 0.1, -0.1),
            yaw_pid: PidSettings::proportional(0.5),
            hover_throttle: 58.0,
            max_transform_wait: 1.0,
            max_sample_gap: DEFAULT_MAX_SAMPLE_GAP,
            startup_timeout: 10.0,
            limits: CommandLimits::default(),
        }
    }
}

/// Shared handle to the commanded velocity
///
/// Writers on any thread replace the whole twist; the controller reads one
/// consistent snapshot at the start of each tick.
#[derive(Debug, Clone, Default)]
pub struct VelocityTarget {
    twist: Arc<Mutex<Twist>>,
}

impl VelocityTarget {
    pub fn new(twist: Twist) -> Self {
        Self {
            twist: Arc::new(Mutex::new(twist)),
        }
    }

    pub fn set(&self, twist: Twist) {
        *self.twist.lock().unwrap_or_else(PoisonError::into_inner) = twist;
    }

    pub fn snapshot(&self) -> Twist {
        *self.twist.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The four control loops
#[derive(Debug, Clone)]
struct AxisLoops {
    thrust: FeedForwardPid,
    pitch: FeedForwardPid,
    roll: FeedForwardPid,
    yaw: FeedForwardPid,
}

impl AxisLoops {
    fn new(config: &VelocityControllerConfig) -> Self {
        Self {
            thrust: FeedForwardPid::with_feed_forward(config.thrust_pid.clone(), config.hover_throttle),
            pitch: FeedForwardPid::new(config.pitch_pid.clone()),
            roll: FeedForwardPid::new(config.roll_pid.clone()),
            yaw: FeedForwardPid::new(config.yaw_pid.clone()),
        }
    }

    fn reset(&mut self) {
        self.thrust.reset();
        self.pitch.reset();
        self.roll.reset();
        self.yaw.reset();
    }
}

/// Last successful loop step
#[derive(Debug, Clone, Copy)]
struct LastStep {
    velocity_time: f64,
    command: ControlCommand,
}

/// Velocity controller driving attitude and throttle from pose feedback
#[derive(Debug)]
pub struct VelocityController<P> {
    config: VelocityControllerConfig,
    poses: P,
    target: VelocityTarget,
    estimator: PoseVelocityEstimator,
    loops: AxisLoops,
    last_step: Option<LastStep>,
}

impl<P: PoseSource> VelocityController<P> {
    pub fn new(config: VelocityControllerConfig, poses: P) -> Self {
        let estimator = PoseVelocityEstimator::new(config.max_sample_gap);
        let loops = AxisLoops::new(&config);
        Self {
            config,
            poses,
            target: VelocityTarget::default(),
            estimator,
            loops,
            last_step: None,
        }
    }

    pub fn config(&self) -> &VelocityControllerConfig {
        &self.config
    }

    /// Replace the commanded velocity; applied on the next tick
    pub fn set_target_velocity(&self, twist: Twist) {
        self.target.set(twist);
    }

    /// Handle for setting the target from another thread
    pub fn target_handle(&self) -> VelocityTarget {
        self.target.clone()
    }

    /// Block until the pose stream has produced a first sample
    pub fn wait_until_ready(&mut self) -> Result<(), FlightError> {
        let wait = wait_duration(self.config.startup_timeout);
        self.poses.pose_at_or_after(f64::NEG_INFINITY, wait).map(|_| ())
    }

    /// Reset loop memory and prime the estimator with the pose at `time`
    pub fn prepare_for_takeover(&mut self, time: f64) -> Result<(), FlightError> {
        self.reset();
        let wait = wait_duration(self.config.max_transform_wait);
        let pose = self.poses.pose_at_or_after(time, wait)?;
        match self.estimator.update(pose) {
            Ok(_) => Ok(()),
            Err(err) if err.is_warming_up() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Clear integrators, derivative memory and the velocity estimate
    pub fn reset(&mut self) {
        self.loops.reset();
        self.estimator.reset();
        self.last_step = None;
    }

    /// Command for the flight controller at `time`
    ///
    /// A tick that finds no pose newer than the previous one repeats the
    /// previous command.
    pub fn get_target_motion_point(&mut self, time: f64) -> Result<ControlCommand, FlightError> {
        let target = self.target.snapshot();

        let wait = wait_duration(self.config.max_transform_wait);
        let pose = match self.poses.pose_at_or_after(time, wait) {
            Ok(pose) => pose,
            Err(err) => {
                // A stale hold must not wind up the integrators
                warn!("velocity controller: no pose for t={time:.3}: {err}; resetting loops");
                self.reset();
                return Err(err);
            }
        };

        let velocity = self.estimator.update(pose)?;

        let dt = match self.last_step {
            Some(last) if last.velocity_time == velocity.time => {
                return Ok(last.command.at(time));
            }
            Some(last) if velocity.time - last.velocity_time <= self.config.max_transform_wait => {
                velocity.time - last.velocity_time
            }
            Some(last) => {
                info!(
                    "velocity controller: {:.3}s since last step, resetting loops",
                    velocity.time - last.velocity_time
                );
                self.loops.reset();
                0.0
            }
            None => 0.0,
        };

        let saved = self.loops.clone();
        let level = world_to_level(&velocity.linear, velocity.yaw);

        let throttle = self.loops.thrust.step(target.linear.z, level.z, dt);
        let pitch = self.loops.pitch.step(target.linear.x, level.x, dt);
        let roll = -self.loops.roll.step(target.linear.y, level.y, dt);
        let yaw_rate = target.yaw_rate + self.loops.yaw.step(target.yaw_rate, velocity.yaw_rate, dt);

        let command = match self.limit(time, throttle, pitch, roll, yaw_rate) {
            Ok(command) => command,
            Err(err) => {
                warn!("velocity controller: {err}");
                self.loops = saved;
                return Err(err);
            }
        };

        debug!(
            "velocity controller: t={time:.3} v=({:.3}, {:.3}, {:.3}) -> roll={:.3} pitch={:.3} yaw_rate={:.3} throttle={:.2}",
            level.x, level.y, level.z, command.roll, command.pitch, command.yaw_rate, command.throttle
        );

        self.last_step = Some(LastStep {
            velocity_time: velocity.time,
            command,
        });
        Ok(command)
    }

    /// Most recent emitted command
    pub fn last_command(&self) -> Option<ControlCommand> {
        self.last_step.map(|step| step.command)
    }

    fn limit(
        &self,
        time: f64,
        throttle: f64,
        pitch: f64,
        roll: f64,
        yaw_rate: f64,
    ) -> Result<ControlCommand, FlightError> {
        let limits = &self.config.limits;
        Ok(ControlCommand {
            time,
            throttle: limits.apply(Axis::Throttle, throttle, limits.throttle_min, limits.throttle_max)?,
            pitch: limits.apply(Axis::Pitch, pitch, -limits.max_tilt, limits.max_tilt)?,
            roll: limits.apply(Axis::Roll, roll, -limits.max_tilt, limits.max_tilt)?,
            yaw_rate: limits.apply(Axis::Yaw, yaw_rate, -limits.max_yaw_rate, limits.max_yaw_rate)?,
        })
    }
}
