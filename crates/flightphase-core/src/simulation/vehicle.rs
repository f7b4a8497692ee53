//! Simulated vehicle
//!
//! Attitude is assumed to track the command instantly:
//!
//! ṗ = v
//! v̇ = T(throttle, V)/m · R(roll, pitch, ψ)e₃ - g·e₃ - k_d·v
//! ψ̇ = yaw_rate
//!
//! with a flat ground at z = 0.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::interfaces::{ArmOutcome, ArmService, QuadraticThrustModel};
use crate::types::{ControlCommand, Odometry, PoseSample};
use crate::GRAVITY;

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Integration time step [s]
    pub dt: f64,
    /// Thrust characteristic of the simulated vehicle
    pub thrust_model: QuadraticThrustModel,
    /// Battery voltage at start [V]
    pub battery_voltage: f64,
    /// Voltage drop while armed [V/s]
    pub battery_sag: f64,
    /// Linear drag coefficient [1/s]
    pub drag: f64,
    /// Starting position [m]
    pub initial_position: Vector3<f64>,
    /// Starting heading [rad]
    pub initial_yaw: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.02, // 50 Hz control rate
            thrust_model: QuadraticThrustModel::default(),
            battery_voltage: 12.0,
            battery_sag: 0.0,
            drag: 0.1,
            initial_position: Vector3::zeros(),
            initial_yaw: 0.0,
        }
    }
}

/// Kinematic state of the simulated vehicle
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    /// Position [m] (world frame, z up)
    pub position: Vector3<f64>,
    /// Velocity [m/s] (world frame)
    pub velocity: Vector3<f64>,
    /// Heading [rad]
    pub yaw: f64,
}

/// Simulated multirotor
#[derive(Debug)]
pub struct SimVehicle {
    pub config: SimConfig,
    state: VehicleState,
    time: f64,
    voltage: f64,
    armed: Arc<AtomicBool>,
}

impl SimVehicle {
    pub fn new(config: SimConfig) -> Self {
        let state = VehicleState {
            position: config.initial_position,
            velocity: Vector3::zeros(),
            yaw: config.initial_yaw,
        };
        let voltage = config.battery_voltage;
        Self {
            config,
            state,
            time: 0.0,
            voltage,
            armed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Arm/disarm channel wired to this vehicle
    pub fn arm_switch(&self) -> SimArmSwitch {
        SimArmSwitch {
            armed: Arc::clone(&self.armed),
            accept: true,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Relaxed)
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    pub fn on_ground(&self) -> bool {
        self.state.position.z <= 0.0
    }

    pub fn battery_voltage(&self) -> f64 {
        self.voltage
    }

    /// Apply `command` for one time step
    pub fn step(&mut self, command: &ControlCommand) {
        let dt = self.config.dt;
        let mass = self.config.thrust_model.mass;

        let thrust = if self.is_armed() {
            self.config.thrust_model.thrust_for(self.voltage, command.throttle)
        } else {
            0.0
        };

        let attitude = UnitQuaternion::from_euler_angles(command.roll, command.pitch, self.state.yaw);
        let thrust_dir = attitude * Vector3::z();

        let acceleration = thrust / mass * thrust_dir
            - Vector3::new(0.0, 0.0, GRAVITY)
            - self.config.drag * self.state.velocity;

        self.state.velocity += acceleration * dt;
        self.state.position += self.state.velocity * dt;

        // Ground contact: no sinking, no sliding
        if self.state.position.z <= 0.0 {
            self.state.position.z = 0.0;
            if self.state.velocity.z <= 0.0 {
                self.state.velocity = Vector3::zeros();
            }
        } else {
            self.state.yaw += command.yaw_rate * dt;
        }

        if self.is_armed() {
            self.voltage -= self.config.battery_sag * dt;
        }
        self.time += dt;
    }

    pub fn pose(&self) -> PoseSample {
        PoseSample::level(self.time, self.state.position, self.state.yaw)
    }

    pub fn odometry(&self) -> Odometry {
        Odometry {
            position: self.state.position,
            velocity: self.state.velocity,
        }
    }
}

/// Arm switch of a [`SimVehicle`]
#[derive(Debug, Clone)]
pub struct SimArmSwitch {
    armed: Arc<AtomicBool>,
    /// Whether requests are honoured
    pub accept: bool,
}

impl ArmService for SimArmSwitch {
    fn set_armed(&mut self, armed: bool) -> ArmOutcome {
        if !self.accept {
            return ArmOutcome::Rejected;
        }
        self.armed.store(armed, Ordering::Relaxed);
        ArmOutcome::Accepted
    }
}
