//! Flight phase configuration
//!
//! Tunables for the velocity controller and both sequencers, loadable from
//! JSON. Every section and field falls back to its default when omitted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use flightphase_core::control::VelocityControllerConfig;

use crate::hold::PositionHoldConfig;

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete flight phase configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Velocity controller gains and limits
    pub velocity: VelocityControllerConfig,
    /// Takeoff sequencer
    pub takeoff: TakeoffConfig,
    /// Landing sequencer
    pub landing: LandingConfig,
}

/// Takeoff sequencer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TakeoffConfig {
    /// Idle time between arming and the start of the ramp [s]
    pub post_arm_delay: f64,
    /// Duration of the throttle ramp [s]
    pub ramp_duration: f64,
    /// Time holding the final ramp throttle before DONE [s]
    pub pause_duration: f64,
    /// Ramp start thrust as a fraction of hover thrust
    pub ramp_start_thrust_ratio: f64,
    /// Ramp end thrust as a fraction of hover thrust
    pub ramp_end_thrust_ratio: f64,
    /// Largest bracketing gap / age for the battery feed [s]
    pub battery_timeout: f64,
    /// Largest gap between updates, and odometry bracketing gap [s]
    pub update_timeout: f64,
    /// Longest wait for feeds in `wait_until_ready` [s]
    pub startup_timeout: f64,
}

impl Default for TakeoffConfig {
    fn default() -> Self {
        Self {
            post_arm_delay: 0.0,
            ramp_duration: 2.0,
            pause_duration: 0.5,
            ramp_start_thrust_ratio: 0.5,
            ramp_end_thrust_ratio: 1.1,
            battery_timeout: 0.5,
            update_timeout: 0.5,
            startup_timeout: 10.0,
        }
    }
}

/// Landing sequencer configuration
///
/// Rates are descent speeds (positive down).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandingConfig {
    /// Descent rate above the cushion height [m/s]
    pub descend_rate: f64,
    /// Largest change of descent rate above the cushion height [m/s²]
    pub descend_acceleration: f64,
    /// Height below which the cushion profile applies [m]
    pub cushion_height: f64,
    /// Descent rate inside the cushion [m/s]
    pub cushion_rate: f64,
    /// Largest change of descent rate inside the cushion [m/s²]
    pub cushion_acceleration: f64,
    /// Height at or below which the vehicle counts as landed [m]
    pub landing_detected_height: f64,
    /// Largest gap between updates, also the pose wait [s]
    pub update_timeout: f64,
    /// Longest wait for a pose in `wait_until_ready` [s]
    pub startup_timeout: f64,
    /// Horizontal hold while descending
    pub hold: PositionHoldConfig,
}

impl Default for LandingConfig {
    fn default() -> Self {
        Self {
            descend_rate: 0.5,
            descend_acceleration: 0.5,
            cushion_height: 0.5,
            cushion_rate: 0.15,
            cushion_acceleration: 0.3,
            landing_detected_height: 0.05,
            update_timeout: 0.5,
            startup_timeout: 10.0,
            hold: PositionHoldConfig::default(),
        }
    }
}

impl FlightConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check values that would make a phase misbehave rather than fail
    pub fn validate(&self) -> Result<(), ConfigError> {
        let v = &self.velocity;
        positive("velocity.max_transform_wait", v.max_transform_wait)?;
        positive("velocity.max_sample_gap", v.max_sample_gap)?;
        non_negative("velocity.startup_timeout", v.startup_timeout)?;
        positive("velocity.limits.max_tilt", v.limits.max_tilt)?;
        positive("velocity.limits.max_yaw_rate", v.limits.max_yaw_rate)?;
        if v.limits.throttle_min >= v.limits.throttle_max {
            return Err(invalid(format!(
                "velocity.limits: throttle_min {} must be below throttle_max {}",
                v.limits.throttle_min, v.limits.throttle_max
            )));
        }

        let t = &self.takeoff;
        non_negative("takeoff.post_arm_delay", t.post_arm_delay)?;
        non_negative("takeoff.ramp_duration", t.ramp_duration)?;
        non_negative("takeoff.pause_duration", t.pause_duration)?;
        non_negative("takeoff.ramp_start_thrust_ratio", t.ramp_start_thrust_ratio)?;
        positive("takeoff.ramp_end_thrust_ratio", t.ramp_end_thrust_ratio)?;
        positive("takeoff.battery_timeout", t.battery_timeout)?;
        positive("takeoff.update_timeout", t.update_timeout)?;
        non_negative("takeoff.startup_timeout", t.startup_timeout)?;

        let l = &self.landing;
        positive("landing.descend_rate", l.descend_rate)?;
        positive("landing.descend_acceleration", l.descend_acceleration)?;
        positive("landing.cushion_rate", l.cushion_rate)?;
        positive("landing.cushion_acceleration", l.cushion_acceleration)?;
        non_negative("landing.landing_detected_height", l.landing_detected_height)?;
        positive("landing.update_timeout", l.update_timeout)?;
        non_negative("landing.startup_timeout", l.startup_timeout)?;
        non_negative("landing.hold.max_speed", l.hold.max_speed)?;
        positive("landing.hold.max_acceleration", l.hold.max_acceleration)?;
        if l.cushion_height < l.landing_detected_height {
            return Err(invalid(format!(
                "landing: cushion_height {} below landing_detected_height {}",
                l.cushion_height, l.landing_detected_height
            )));
        }

        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{name} must be non-negative, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FlightConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "velocity": { "hover_throttle": 52.5 },
            "landing": { "descend_rate": 0.8, "hold": { "max_speed": 0.2 } }
        }"#;
        let config = FlightConfig::from_json_str(json).unwrap();

        assert_relative_eq!(config.velocity.hover_throttle, 52.5);
        assert_relative_eq!(config.velocity.max_transform_wait, 1.0);
        assert_relative_eq!(config.landing.descend_rate, 0.8);
        assert_relative_eq!(config.landing.hold.max_speed, 0.2);
        assert_relative_eq!(config.landing.hold.gain, 1.0);
        assert_relative_eq!(config.landing.hold.max_acceleration, 0.5);
        assert_eq!(config.takeoff, TakeoffConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = FlightConfig::default();
        config.takeoff.ramp_duration = 3.0;
        let json = config.to_json_string().unwrap();
        assert_eq!(FlightConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_non_positive_rate() {
        let err = FlightConfig::from_json_str(r#"{ "landing": { "cushion_rate": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("landing.cushion_rate")));
    }

    #[test]
    fn test_rejects_zero_hold_acceleration() {
        let json = r#"{ "landing": { "hold": { "max_acceleration": 0.0 } } }"#;
        let err = FlightConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("landing.hold.max_acceleration")));
    }

    #[test]
    fn test_takeoff_ramp_starts_at_arm_by_default() {
        assert_relative_eq!(TakeoffConfig::default().post_arm_delay, 0.0);
    }

    #[test]
    fn test_rejects_inverted_throttle_limits() {
        let mut config = FlightConfig::default();
        config.velocity.limits.throttle_min = 80.0;
        config.velocity.limits.throttle_max = 20.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_cushion_below_touchdown() {
        let mut config = FlightConfig::default();
        config.landing.cushion_height = 0.01;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            FlightConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            FlightConfig::load("/nonexistent/flight.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
