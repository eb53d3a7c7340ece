//! Force sensor: continuous g-force readings with on-demand crash injection

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use mirage_bus::CanBus;
use mirage_core::{CanId, ControlCommand};
use mirage_mtd::IdObfuscator;
use mirage_node::{Actor, ActorBuilder};

use crate::payload;

/// Safe readings, broadcast every second.
const SAFE_FORCE: std::ops::RangeInclusive<u8> = 5..=40;
/// Injected crash readings.
const CRASH_FORCE: std::ops::RangeInclusive<u8> = 70..=100;

/// Spawn the force sensor actor.
pub fn spawn_force_sensor(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<()> {
    ActorBuilder::new("force-sensor", bus, mtd, ())
        .on_frame(|cx, received| {
            if ControlCommand::from_frame(received.id, received.payload())
                == Some(ControlCommand::TriggerCrash)
            {
                let force = rand::thread_rng().gen_range(CRASH_FORCE);
                tracing::info!(force, "crash force injected");
                cx.publish(CanId::GFORCE, &[force, payload::GFORCE_MARKER])?;
            }
            Ok(())
        })
        .every(Duration::from_secs(1), |cx| {
            let force = rand::thread_rng().gen_range(SAFE_FORCE);
            cx.publish(CanId::GFORCE, &[force, payload::GFORCE_MARKER])
        })
        .spawn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::FixedClock;
    use mirage_mtd::MtdConfig;
    use mirage_wire::Frame;

    fn plain_mtd() -> Arc<IdObfuscator> {
        Arc::new(IdObfuscator::new(
            MtdConfig::disabled(),
            Arc::new(FixedClock::new(0)),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_safe_broadcast_and_crash_injection() {
        let bus = CanBus::new(64);
        let mut rx = bus.subscribe();
        let sensor = spawn_force_sensor(bus.clone(), plain_mtd());

        let msg = rx
            .recv(Duration::from_secs(2))
            .await
            .unwrap()
            .expect("safe reading expected");
        assert_eq!(msg.frame.id(), CanId::GFORCE);
        let reading = msg.frame.payload();
        assert!(SAFE_FORCE.contains(&reading[0]));
        assert_eq!(reading[1], payload::GFORCE_MARKER);

        bus.publish(&Frame::new(CanId::CONTROL, &[ControlCommand::TriggerCrash.to_byte()]).unwrap());

        // Scan past periodic safe readings for the injected spike.
        let mut crash_seen = false;
        for _ in 0..6 {
            let msg = rx.recv(Duration::from_secs(2)).await.unwrap().unwrap();
            if msg.frame.id() == CanId::GFORCE && CRASH_FORCE.contains(&msg.frame.payload()[0]) {
                crash_seen = true;
                break;
            }
        }
        assert!(crash_seen, "injected crash force not observed");

        sensor.stop().await;
    }
}
