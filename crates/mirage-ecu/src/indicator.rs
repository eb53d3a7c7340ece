//! Indicator cluster: switch and left/right lamps
//!
//! The switch turns console commands into indicator instructions with
//! left/right mutual exclusion; hazards override both and must be toggled
//! off before a single side can be selected again. Each lamp interprets
//! the instructions for its own side (hazard instructions drive both) and
//! broadcasts its status every second.

use std::sync::Arc;
use std::time::Duration;

use mirage_bus::CanBus;
use mirage_core::{CanId, ControlCommand};
use mirage_mtd::IdObfuscator;
use mirage_node::{Actor, ActorBuilder, ActorContext};

use crate::payload;

/// Which lamp an indicator actor drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    fn status_id(self) -> CanId {
        match self {
            Side::Left => CanId::LEFT_INDICATOR_STATUS,
            Side::Right => CanId::RIGHT_INDICATOR_STATUS,
        }
    }

    fn on_instruction(self) -> [u8; 3] {
        match self {
            Side::Left => payload::LEFT_ON,
            Side::Right => payload::RIGHT_ON,
        }
    }

    fn off_instruction(self) -> [u8; 3] {
        match self {
            Side::Left => payload::LEFT_OFF,
            Side::Right => payload::RIGHT_OFF,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Side::Left => "left-indicator",
            Side::Right => "right-indicator",
        }
    }
}

/// Lamp state.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndicatorState {
    pub active: bool,
    pub hazard_mode: bool,
}

/// Spawn one indicator lamp.
pub fn spawn_indicator(bus: CanBus, mtd: Arc<IdObfuscator>, side: Side) -> Actor<IndicatorState> {
    ActorBuilder::new(side.name(), bus, mtd, IndicatorState::default())
        .on_frame(move |cx, received| {
            if received.id != CanId::INDICATOR_CMD {
                return Ok(());
            }
            let mut state = cx.state();
            if side.on_instruction() == received.payload() {
                state.active = true;
                state.hazard_mode = false;
            } else if side.off_instruction() == received.payload() {
                state.active = false;
                state.hazard_mode = false;
            } else if payload::HAZARD_ON == received.payload() {
                state.active = true;
                state.hazard_mode = true;
            } else if payload::HAZARD_OFF == received.payload() {
                state.active = false;
                state.hazard_mode = false;
            }
            Ok(())
        })
        .every(Duration::from_secs(1), move |cx| {
            let status = if cx.state().active {
                payload::INDICATOR_STATUS_ON
            } else {
                payload::INDICATOR_STATUS_OFF
            };
            // Status pair padded to a 4-byte payload.
            let mut frame_payload = [0u8; 4];
            frame_payload[..2].copy_from_slice(&status);
            cx.publish(side.status_id(), &frame_payload)
        })
        .spawn()
}

/// Switch state.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndicatorSwitchState {
    pub left_on: bool,
    pub right_on: bool,
    pub hazards_on: bool,
}

/// Spawn the indicator switch.
pub fn spawn_indicator_switch(
    bus: CanBus,
    mtd: Arc<IdObfuscator>,
) -> Actor<IndicatorSwitchState> {
    ActorBuilder::new("indicator-switch", bus, mtd, IndicatorSwitchState::default())
        .on_frame(|cx, received| {
            match ControlCommand::from_frame(received.id, received.payload()) {
                Some(ControlCommand::ToggleLeft) => toggle_side(cx, Side::Left),
                Some(ControlCommand::ToggleRight) => toggle_side(cx, Side::Right),
                Some(ControlCommand::ToggleHazards) => toggle_hazards(cx),
                _ => Ok(()),
            }
        })
        .spawn()
}

fn toggle_side(
    cx: &Arc<ActorContext<IndicatorSwitchState>>,
    side: Side,
) -> mirage_core::MirageResult<()> {
    // Hazards take priority: the first side toggle only clears them.
    if cx.state().hazards_on {
        return toggle_hazards(cx);
    }

    let instruction = {
        let mut state = cx.state();
        match side {
            Side::Left => {
                state.left_on = !state.left_on;
                state.right_on = false;
                if state.left_on {
                    payload::LEFT_ON
                } else {
                    payload::LEFT_OFF
                }
            }
            Side::Right => {
                state.right_on = !state.right_on;
                state.left_on = false;
                if state.right_on {
                    payload::RIGHT_ON
                } else {
                    payload::RIGHT_OFF
                }
            }
        }
    };
    cx.publish(CanId::INDICATOR_CMD, &instruction)
}

fn toggle_hazards(
    cx: &Arc<ActorContext<IndicatorSwitchState>>,
) -> mirage_core::MirageResult<()> {
    let instruction = {
        let mut state = cx.state();
        state.hazards_on = !state.hazards_on;
        if state.hazards_on {
            payload::HAZARD_ON
        } else {
            payload::HAZARD_OFF
        }
    };
    cx.publish(CanId::INDICATOR_CMD, &instruction)
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

    fn command(cmd: ControlCommand) -> Frame {
        Frame::new(CanId::CONTROL, &[cmd.to_byte()]).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sides_are_mutually_exclusive() {
        let bus = CanBus::new(64);
        let switch = spawn_indicator_switch(bus.clone(), plain_mtd());
        let left = spawn_indicator(bus.clone(), plain_mtd(), Side::Left);
        let right = spawn_indicator(bus.clone(), plain_mtd(), Side::Right);

        bus.publish(&command(ControlCommand::ToggleLeft));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(left.context().state().active);
        assert!(!right.context().state().active);

        bus.publish(&command(ControlCommand::ToggleRight));
        tokio::time::sleep(Duration::from_millis(100)).await;
        {
            let state = switch.context().state();
            assert!(state.right_on && !state.left_on);
        }
        assert!(right.context().state().active);

        switch.stop().await;
        left.stop().await;
        right.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hazards_drive_both_lamps_and_override() {
        let bus = CanBus::new(64);
        let switch = spawn_indicator_switch(bus.clone(), plain_mtd());
        let left = spawn_indicator(bus.clone(), plain_mtd(), Side::Left);
        let right = spawn_indicator(bus.clone(), plain_mtd(), Side::Right);

        bus.publish(&command(ControlCommand::ToggleHazards));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(left.context().state().hazard_mode);
        assert!(right.context().state().hazard_mode);

        // With hazards on, a left toggle only clears them.
        bus.publish(&command(ControlCommand::ToggleLeft));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!switch.context().state().hazards_on);
        assert!(!left.context().state().active);
        assert!(!right.context().state().active);

        switch.stop().await;
        left.stop().await;
        right.stop().await;
    }
}
