//! Readiness subsystems: battery, fuel system, engine control
//!
//! Each subsystem answers the start-sequence command after its own response
//! delay: it toggles between started and stopped and broadcasts the matching
//! readiness acknowledgement. The staggered delays (1.0 / 2.0 / 3.0 s) are
//! what the starter motor's tolerance windows are built around.
//!
//! Battery and fuel also broadcast a telemetry sample every second while
//! started; the engine has no periodic telemetry.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use mirage_bus::CanBus;
use mirage_core::{CanId, ControlCommand};
use mirage_mtd::IdObfuscator;
use mirage_node::{Actor, ActorBuilder};

use crate::payload::{self, readiness};

/// Telemetry sample generator, run once per broadcast tick.
pub type TelemetryFn = Box<dyn Fn() -> Vec<u8> + Send + Sync>;

/// Static description of one readiness subsystem.
pub struct SubsystemSpec {
    pub name: &'static str,
    /// Identifier for both readiness and telemetry broadcasts.
    pub id: CanId,
    /// Device tag in the readiness payload.
    pub tag: u8,
    /// Wait between the start command and the readiness answer.
    pub response_delay: Duration,
    /// Periodic sample while started, if the subsystem has one.
    pub telemetry: Option<TelemetryFn>,
}

/// Mutable subsystem state.
#[derive(Clone, Copy, Debug, Default)]
pub struct SubsystemState {
    pub started: bool,
}

/// Spawn a readiness subsystem actor from its spec.
pub fn spawn_subsystem(
    bus: CanBus,
    mtd: Arc<IdObfuscator>,
    spec: SubsystemSpec,
) -> Actor<SubsystemState> {
    let SubsystemSpec {
        name,
        id,
        tag,
        response_delay,
        telemetry,
    } = spec;

    let mut builder = ActorBuilder::new(name, bus, mtd, SubsystemState::default())
        .on_frame(move |cx, received| {
            if ControlCommand::from_frame(received.id, received.payload())
                == Some(ControlCommand::StartSequence)
            {
                cx.schedule(response_delay, move |cx| {
                    let started = {
                        let mut state = cx.state();
                        state.started = !state.started;
                        state.started
                    };
                    tracing::info!(subsystem = cx.name(), started, "state toggled");
                    cx.publish(id, &readiness(tag, started))
                });
            }
            Ok(())
        });

    if let Some(sample) = telemetry {
        builder = builder.every(Duration::from_secs(1), move |cx| {
            if !cx.state().started {
                return Ok(());
            }
            cx.publish(id, &sample())
        });
    }

    builder.spawn()
}

/// Battery: answers after 1.0 s, broadcasts voltage while started.
pub fn spawn_battery(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<SubsystemState> {
    spawn_subsystem(
        bus,
        mtd,
        SubsystemSpec {
            name: "battery",
            id: CanId::BATTERY,
            tag: payload::BATTERY_TAG,
            response_delay: Duration::from_secs(1),
            telemetry: Some(Box::new(|| {
                let voltage = rand::thread_rng().gen_range(115..=125);
                vec![0, 0, 0, voltage]
            })),
        },
    )
}

/// Fuel system: answers after 2.0 s, broadcasts fuel level while started.
pub fn spawn_fuel(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<SubsystemState> {
    spawn_subsystem(
        bus,
        mtd,
        SubsystemSpec {
            name: "fuel-system",
            id: CanId::FUEL,
            tag: payload::FUEL_TAG,
            response_delay: Duration::from_secs(2),
            telemetry: Some(Box::new(|| {
                let level = rand::thread_rng().gen_range(30..=100);
                vec![0x0F, 0x0F, level]
            })),
        },
    )
}

/// Engine control: answers after 3.0 s, no periodic telemetry.
pub fn spawn_engine(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<SubsystemState> {
    spawn_subsystem(
        bus,
        mtd,
        SubsystemSpec {
            name: "engine-control",
            id: CanId::ENGINE,
            tag: payload::ENGINE_TAG,
            response_delay: Duration::from_secs(3),
            telemetry: None,
        },
    )
}
