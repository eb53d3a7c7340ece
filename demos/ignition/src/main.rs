//! Interactive launcher for the simulated vehicle network
//!
//! Spawns every controller on one bus with identifier masking enabled and
//! maps console input to control commands:
//!
//! ```text
//! 1 - toggle headlamps      l - toggle left indicator
//! 2 - trigger crash         r - toggle right indicator
//! 3 - start engine sequence h - toggle hazards
//! q - quit
//! ```

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use mirage_bus::CanBus;
use mirage_core::{CanId, ControlCommand, SystemClock};
use mirage_ecu::airbag::spawn_airbag;
use mirage_ecu::crash_detector::spawn_crash_detector;
use mirage_ecu::force_sensor::spawn_force_sensor;
use mirage_ecu::headlamp::{spawn_headlamp, spawn_headlamp_switch};
use mirage_ecu::indicator::{spawn_indicator, spawn_indicator_switch, Side};
use mirage_ecu::payload;
use mirage_ecu::starter::spawn_starter;
use mirage_ecu::subsystem::{spawn_battery, spawn_engine, spawn_fuel};
use mirage_mtd::{IdObfuscator, MtdConfig};
use mirage_node::ActorBuilder;
use mirage_wire::Frame;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bus = CanBus::default();
    // Every controller shares the fleet passphrase and its own system
    // clock; masks line up as long as the clocks agree on the second.
    let mtd = Arc::new(IdObfuscator::new(
        MtdConfig::from_passphrase("mirage-fleet-shared-key", true),
        Arc::new(SystemClock),
    ));

    // The vehicle.
    let headlamp = spawn_headlamp(bus.clone(), Arc::clone(&mtd));
    let headlamp_switch = spawn_headlamp_switch(bus.clone(), Arc::clone(&mtd));
    let force_sensor = spawn_force_sensor(bus.clone(), Arc::clone(&mtd));
    let crash_detector = spawn_crash_detector(bus.clone(), Arc::clone(&mtd));
    let airbag = spawn_airbag(bus.clone(), Arc::clone(&mtd));
    let indicator_switch = spawn_indicator_switch(bus.clone(), Arc::clone(&mtd));
    let left = spawn_indicator(bus.clone(), Arc::clone(&mtd), Side::Left);
    let right = spawn_indicator(bus.clone(), Arc::clone(&mtd), Side::Right);
    let battery = spawn_battery(bus.clone(), Arc::clone(&mtd));
    let fuel = spawn_fuel(bus.clone(), Arc::clone(&mtd));
    let engine = spawn_engine(bus.clone(), Arc::clone(&mtd));
    let starter = spawn_starter(bus.clone(), Arc::clone(&mtd));

    // Console-side monitor: reports starter verdicts.
    let monitor = ActorBuilder::new("monitor", bus.clone(), Arc::clone(&mtd), ())
        .on_frame(|_cx, received| {
            if received.id == CanId::STARTER {
                if payload::STARTUP_VERDICT == received.payload() {
                    tracing::info!("startup sequence accepted");
                } else {
                    tracing::info!("startup sequence rejected");
                }
            }
            Ok(())
        })
        .spawn();

    println!(
        "Enter input - [1] Toggle Headlights, [2] Trigger Crash, [3] Start Engine, \
         [l] Left Indicator, [r] Right Indicator, [h] Hazards, [q] Quit:"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let command = match line.trim() {
            "1" => ControlCommand::ToggleHeadlamps,
            "2" => ControlCommand::TriggerCrash,
            "3" => ControlCommand::StartSequence,
            "l" => ControlCommand::ToggleLeft,
            "r" => ControlCommand::ToggleRight,
            "h" => ControlCommand::ToggleHazards,
            "q" => break,
            "" => continue,
            other => {
                println!("unknown input: {other}");
                continue;
            }
        };

        match Frame::new(CanId::CONTROL, &[command.to_byte()]) {
            Ok(frame) => bus.publish(&frame),
            Err(e) => tracing::warn!(error = %e, "could not build control frame"),
        }
    }

    tracing::info!("shutting down");
    monitor.stop().await;
    starter.stop().await;
    battery.stop().await;
    fuel.stop().await;
    engine.stop().await;
    indicator_switch.stop().await;
    left.stop().await;
    right.stop().await;
    airbag.stop().await;
    crash_detector.stop().await;
    force_sensor.stop().await;
    headlamp_switch.stop().await;
    headlamp.stop().await;
}
