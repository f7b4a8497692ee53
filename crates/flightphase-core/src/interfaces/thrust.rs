//! Battery-compensated thrust model
//!
//! Static thrust of the whole vehicle as a quadratic in throttle, scaled
//! linearly with battery voltage:
//!
//! T(t, V) = (a·t² + b·t + c) · V / V_nom

use serde::{Deserialize, Serialize};

use super::ThrustModel;
use crate::GRAVITY;

/// Quadratic throttle-to-thrust fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadraticThrustModel {
    /// Vehicle mass [kg]
    pub mass: f64,
    /// Quadratic coefficient [N/%²]
    pub a: f64,
    /// Linear coefficient [N/%]
    pub b: f64,
    /// Constant term [N]
    pub c: f64,
    /// Voltage the coefficients were measured at [V]
    pub nominal_voltage: f64,
    /// Lowest throttle the model will return [%]
    pub min_throttle: f64,
    /// Highest throttle the model will return [%]
    pub max_throttle: f64,
}

impl Default for QuadraticThrustModel {
    fn default() -> Self {
        Self {
            mass: 1.0,
            a: 0.0,
            b: 0.25,
            c: 0.0,
            nominal_voltage: 12.0,
            min_throttle: 0.0,
            max_throttle: 100.0,
        }
    }
}

impl QuadraticThrustModel {
    /// Thrust [N] produced at `throttle` [%] and `voltage` [V]
    pub fn thrust_for(&self, voltage: f64, throttle: f64) -> f64 {
        let t = throttle.clamp(self.min_throttle, self.max_throttle);
        ((self.a * t + self.b) * t + self.c) * voltage / self.nominal_voltage
    }

    /// Throttle [%] that holds the vehicle weight at `voltage`
    pub fn hover_throttle(&self, voltage: f64) -> f64 {
        self.throttle_for(voltage, self.mass * GRAVITY)
    }
}

impl ThrustModel for QuadraticThrustModel {
    fn throttle_for(&self, voltage: f64, thrust: f64) -> f64 {
        if voltage <= 0.0 {
            return self.max_throttle;
        }

        // Thrust required at the nominal voltage
        let nominal = thrust * self.nominal_voltage / voltage;

        let throttle = if self.a.abs() < 1e-12 {
            if self.b.abs() < 1e-12 {
                return self.max_throttle;
            }
            (nominal - self.c) / self.b
        } else {
            let discriminant = self.b * self.b - 4.0 * self.a * (self.c - nominal);
            if discriminant < 0.0 {
                return self.max_throttle;
            }
            (-self.b + discriminant.sqrt()) / (2.0 * self.a)
        };

        throttle.clamp(self.min_throttle, self.max_throttle)
    }

    fn mass(&self) -> f64 {
        self.mass
    }
}
