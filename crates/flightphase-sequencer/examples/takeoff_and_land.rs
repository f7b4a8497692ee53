//! Takeoff and Landing Demonstration
//!
//! Flies the simulated vehicle through a complete sortie:
//! - Arm and throttle ramp
//! - Climb and hover under the velocity controller
//! - Profiled descent, touchdown and disarm
//!
//! Pass a JSON config path as the first argument to override the defaults.

use flightphase_core::control::VelocityController;
use flightphase_core::interfaces::{LinearInterpolator, PosePublisher};
use flightphase_core::simulation::{SimConfig, SimVehicle};
use flightphase_core::types::{Stamped, Twist};
use flightphase_core::Feed;
use flightphase_sequencer::{FlightConfig, FlightPhase, LandingSequencer, TakeoffSequencer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Takeoff and Landing Demonstration ===\n");

    let mut config = match std::env::args().nth(1) {
        Some(path) => FlightConfig::load(path)?,
        None => FlightConfig::default(),
    };

    // === Vehicle ===
    let sim = SimConfig {
        battery_sag: 0.02, // slow drain so the ramp sees a falling voltage
        ..Default::default()
    };
    let model = sim.thrust_model.clone();
    let mut vehicle = SimVehicle::new(sim);
    config.velocity.hover_throttle = model.hover_throttle(vehicle.battery_voltage());
    config.validate()?;

    println!("Mass: {} kg", model.mass);
    println!("Hover throttle at {:.1} V: {:.2}%", vehicle.battery_voltage(), config.velocity.hover_throttle);

    // === Feeds ===
    let poses = PosePublisher::new();
    let (battery, battery_tx) = LinearInterpolator::new(Feed::Battery, 100);
    let (odometry, odometry_tx) = LinearInterpolator::new(Feed::Odometry, 100);
    let publish = |vehicle: &SimVehicle| -> Result<(), Box<dyn std::error::Error>> {
        poses.publish(vehicle.pose());
        battery_tx.send(Stamped::new(vehicle.time(), vehicle.battery_voltage()))?;
        odometry_tx.send(Stamped::new(vehicle.time(), vehicle.odometry()))?;
        Ok(())
    };

    // === Phases ===
    let mut takeoff = TakeoffSequencer::new(
        config.takeoff.clone(),
        model.clone(),
        vehicle.arm_switch(),
        battery,
        odometry,
    );
    let mut velocity = VelocityController::new(config.velocity.clone(), poses.subscribe());
    let mut landing = LandingSequencer::new(config.landing.clone(), poses.subscribe(), vehicle.arm_switch());
    publish(&vehicle)?;

    // === Takeoff ===
    println!("\n--- Takeoff ---");
    takeoff.wait_until_ready()?;
    takeoff.prepare_for_takeover(vehicle.time())?;
    let mut state = takeoff.state();
    let mut handoff = vehicle.time();
    while !takeoff.is_done() {
        let command = takeoff.update(vehicle.time())?;
        if takeoff.state() != state {
            state = takeoff.state();
            println!(
                "t={:6.2}s  {:5}  throttle={:6.2}%  z={:.3} m",
                vehicle.time(),
                state.name(),
                command.throttle,
                vehicle.state().position.z
            );
        }
        handoff = vehicle.time();
        vehicle.step(&command);
        publish(&vehicle)?;
    }

    // === Climb and hover ===
    println!("\n--- Velocity control ---");
    velocity.wait_until_ready()?;
    velocity.prepare_for_takeover(handoff)?;
    for (label, target, ticks) in [
        ("climb", Twist::linear(0.0, 0.0, 0.5), 150),
        ("hover", Twist::default(), 100),
    ] {
        velocity.set_target_velocity(target);
        for _ in 0..ticks {
            let command = velocity.update(vehicle.time())?;
            vehicle.step(&command);
            publish(&vehicle)?;
        }
        println!(
            "t={:6.2}s  {:5}  z={:.3} m  vz={:+.3} m/s",
            vehicle.time(),
            label,
            vehicle.state().position.z,
            vehicle.state().velocity.z
        );
    }

    // === Landing ===
    println!("\n--- Landing ---");
    landing.wait_until_ready()?;
    landing.prepare_for_takeover(vehicle.time())?;
    let mut tick = 0;
    while !landing.is_done() {
        let target = landing.update(vehicle.time())?;
        velocity.set_target_velocity(target.twist());
        let command = velocity.update(vehicle.time())?;
        if tick % 25 == 0 {
            println!(
                "t={:6.2}s  z={:.3} m  descent={:.3} m/s",
                vehicle.time(),
                target.position.z,
                landing.descent_rate()
            );
        }
        tick += 1;
        vehicle.step(&command);
        publish(&vehicle)?;
    }

    println!(
        "\nLanded at t={:.2}s, position {:?}, armed: {}",
        vehicle.time(),
        vehicle.state().position,
        vehicle.is_armed()
    );
    println!("Battery: {:.2} V", vehicle.battery_voltage());

    Ok(())
}
