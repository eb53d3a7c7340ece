//! Crash detector: watches g-force readings, fires the airbag deploy signal

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use mirage_bus::CanBus;
use mirage_core::CanId;
use mirage_mtd::IdObfuscator;
use mirage_node::{Actor, ActorBuilder};

use crate::payload;

/// Readings above this are treated as a crash.
pub const DEFAULT_THRESHOLD: u8 = 50;
/// How often the latest reading is checked.
const MONITOR_PERIOD: Duration = Duration::from_millis(100);
/// Minimum gap between deploy signals.
const REDEPLOY_COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, Default)]
pub struct CrashDetectorState {
    pub latest_force: u8,
    last_deploy: Option<Instant>,
}

/// Spawn the crash detector with the default threshold.
pub fn spawn_crash_detector(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<CrashDetectorState> {
    spawn_crash_detector_with_threshold(bus, mtd, DEFAULT_THRESHOLD)
}

/// Spawn the crash detector with a custom threshold.
pub fn spawn_crash_detector_with_threshold(
    bus: CanBus,
    mtd: Arc<IdObfuscator>,
    threshold: u8,
) -> Actor<CrashDetectorState> {
    ActorBuilder::new("crash-detector", bus, mtd, CrashDetectorState::default())
        .on_frame(|cx, received| {
            if received.id == CanId::GFORCE {
                cx.state().latest_force = received.payload()[0];
            }
            Ok(())
        })
        .every(MONITOR_PERIOD, move |cx| {
            let now = Instant::now();
            let deploy = {
                let mut state = cx.state();
                let cooled_down = state
                    .last_deploy
                    .map_or(true, |at| now.duration_since(at) >= REDEPLOY_COOLDOWN);
                if state.latest_force > threshold && cooled_down {
                    state.last_deploy = Some(now);
                    true
                } else {
                    false
                }
            };

            if deploy {
                tracing::info!("crash threshold exceeded, deploying airbag");
                cx.publish(CanId::CRASH_DEPLOY, &payload::DEPLOY)?;
            }
            Ok(())
        })
        .spawn()
}
