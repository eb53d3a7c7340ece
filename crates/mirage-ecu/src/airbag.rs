//! Airbag: deploys on the crash signal, auto-resets after a cooldown
//!
//! The status listener also accepts status frames from the bus, mirroring
//! the original system's demonstration surface for status spoofing; with
//! identifier masking enabled an attacker without the key cannot hit the
//! status identifier reliably.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use mirage_bus::CanBus;
use mirage_core::CanId;
use mirage_mtd::IdObfuscator;
use mirage_node::{Actor, ActorBuilder};

use crate::payload;

/// Deployed status auto-resets after this long.
pub const DEPLOY_COOLDOWN: Duration = Duration::from_secs(5);

const STATUS_READY: u8 = 0x00;
const STATUS_DEPLOYED: u8 = 0x01;

#[derive(Clone, Copy, Debug, Default)]
pub struct AirbagState {
    pub deployed: bool,
    deployed_at: Option<Instant>,
}

/// Spawn the airbag actor.
pub fn spawn_airbag(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<AirbagState> {
    ActorBuilder::new("airbag", bus, mtd, AirbagState::default())
        .on_frame(|cx, received| {
            if received.id == CanId::CRASH_DEPLOY && payload::DEPLOY == received.payload() {
                let mut state = cx.state();
                if state.deployed {
                    tracing::info!("airbag already deployed");
                    return Ok(());
                }
                state.deployed = true;
                state.deployed_at = Some(received.arrived_at);
                tracing::info!("airbag deployed");
                return Ok(());
            }

            // Status frames from the bus overwrite local status.
            if received.id == CanId::AIRBAG_STATUS {
                cx.state().deployed = received.payload()[0] == STATUS_DEPLOYED;
            }
            Ok(())
        })
        .every(Duration::from_secs(1), |cx| {
            let status = {
                let mut state = cx.state();
                // No deploy instant means the status came off the bus;
                // treat it as long expired so it resets on the next tick.
                let expired = state
                    .deployed_at
                    .map_or(true, |at| Instant::now().duration_since(at) > DEPLOY_COOLDOWN);
                if state.deployed && expired {
                    state.deployed = false;
                    state.deployed_at = None;
                }
                if state.deployed {
                    STATUS_DEPLOYED
                } else {
                    STATUS_READY
                }
            };
            cx.publish(CanId::AIRBAG_STATUS, &[status, payload::AIRBAG_MARKER])
        })
        .spawn()
}
