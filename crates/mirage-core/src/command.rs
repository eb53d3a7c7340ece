//! Control channel commands
//!
//! Commands are single-byte payloads on [`CanId::CONTROL`], issued by the
//! launcher console. The control channel is exempt from identifier masking.

use crate::CanId;

/// A coordination command carried on the control channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ControlCommand {
    /// Toggle the headlamps.
    ToggleHeadlamps = 0x02,
    /// Inject a crash-level g-force reading.
    TriggerCrash = 0x03,
    /// Toggle the left indicator.
    ToggleLeft = 0x04,
    /// Toggle the right indicator.
    ToggleRight = 0x05,
    /// Toggle the hazard lights.
    ToggleHazards = 0x06,
    /// Begin the timed startup handshake.
    StartSequence = 0x07,
}

impl ControlCommand {
    /// Parse from the first payload byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x02 => Some(ControlCommand::ToggleHeadlamps),
            0x03 => Some(ControlCommand::TriggerCrash),
            0x04 => Some(ControlCommand::ToggleLeft),
            0x05 => Some(ControlCommand::ToggleRight),
            0x06 => Some(ControlCommand::ToggleHazards),
            0x07 => Some(ControlCommand::StartSequence),
            _ => None,
        }
    }

    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Parse a command out of a control-channel frame, if it is one.
    pub fn from_frame(id: CanId, payload: &[u8]) -> Option<Self> {
        if id != CanId::CONTROL {
            return None;
        }
        payload.first().and_then(|b| Self::from_byte(*b))
    }
}
