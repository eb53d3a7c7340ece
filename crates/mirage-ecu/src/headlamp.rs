//! Headlamp pair: switch and lamp
//!
//! The switch owns no lamp state of its own; it tracks the lamp's status
//! broadcasts and issues the opposite toggle when the console command
//! arrives. The lamp applies toggles and broadcasts its status every
//! second.

use std::sync::Arc;
use std::time::Duration;

use mirage_bus::CanBus;
use mirage_core::{CanId, ControlCommand};
use mirage_mtd::IdObfuscator;
use mirage_node::{Actor, ActorBuilder};

use crate::payload;

/// Lamp state.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlampState {
    pub on: bool,
}

/// Spawn the headlamp actor: applies toggle commands, broadcasts status.
pub fn spawn_headlamp(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<HeadlampState> {
    ActorBuilder::new("headlamp", bus, mtd, HeadlampState::default())
        .on_frame(|cx, received| {
            if received.id != CanId::HEADLAMP_TOGGLE {
                return Ok(());
            }
            let mut state = cx.state();
            if payload::HEADLAMP_TOGGLE_ON == received.payload() && !state.on {
                state.on = true;
                tracing::info!("headlights turned on");
            } else if payload::HEADLAMP_TOGGLE_OFF == received.payload() && state.on {
                state.on = false;
                tracing::info!("headlights turned off");
            }
            Ok(())
        })
        .every(Duration::from_secs(1), |cx| {
            let status = if cx.state().on {
                payload::HEADLAMP_STATUS_ON
            } else {
                payload::HEADLAMP_STATUS_OFF
            };
            cx.publish(CanId::HEADLAMP_STATUS, &status)
        })
        .spawn()
}

/// Switch state: the lamp status as last broadcast.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlampSwitchState {
    pub lamp_on: bool,
}

/// Spawn the headlamp switch actor: tracks lamp status, turns the console
/// command into the opposite toggle.
pub fn spawn_headlamp_switch(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<HeadlampSwitchState> {
    ActorBuilder::new("headlamp-switch", bus, mtd, HeadlampSwitchState::default())
        .on_frame(|cx, received| {
            if received.id == CanId::HEADLAMP_STATUS {
                cx.state().lamp_on = payload::HEADLAMP_STATUS_ON == received.payload();
                return Ok(());
            }

            if ControlCommand::from_frame(received.id, received.payload())
                == Some(ControlCommand::ToggleHeadlamps)
            {
                let toggle = if cx.state().lamp_on {
                    payload::HEADLAMP_TOGGLE_OFF
                } else {
                    payload::HEADLAMP_TOGGLE_ON
                };
                cx.publish(CanId::HEADLAMP_TOGGLE, &toggle)?;
            }
            Ok(())
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
    async fn test_switch_and_lamp_toggle_cycle() {
        let bus = CanBus::new(64);
        let lamp = spawn_headlamp(bus.clone(), plain_mtd());
        let switch = spawn_headlamp_switch(bus.clone(), plain_mtd());

        let command =
            Frame::new(CanId::CONTROL, &[ControlCommand::ToggleHeadlamps.to_byte()]).unwrap();

        bus.publish(&command);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(lamp.context().state().on);

        // Wait for a status broadcast so the switch learns the lamp is on.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(switch.context().state().lamp_on);

        bus.publish(&command);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!lamp.context().state().on);

        lamp.stop().await;
        switch.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_lamp_ignores_redundant_toggle() {
        let bus = CanBus::new(64);
        let lamp = spawn_headlamp(bus.clone(), plain_mtd());

        bus.publish(&Frame::new(CanId::HEADLAMP_TOGGLE, &payload::HEADLAMP_TOGGLE_OFF).unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!lamp.context().state().on);

        lamp.stop().await;
    }
}
