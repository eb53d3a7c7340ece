//! Starter motor: the timing-gated startup handshake arbiter
//!
//! On the start-sequence command the starter resets its record and waits
//! for readiness reports from battery, fuel, and engine. A report is
//! accepted into its slot at most once per attempt. Once all three slots
//! are filled the sequence is judged:
//! - every payload must match its expected readiness acknowledgement
//! - every elapsed time must fall within ±0.5 s of its nominal value
//!   (battery 1.0 s, fuel 2.0 s, engine 3.0 s)
//! - the three elapsed times must be strictly increasing in the order
//!   battery < fuel < engine; timing alone does not suffice
//!
//! The verdict is broadcast after a fixed settle delay, whatever the
//! outcome. A participant that never reports leaves the starter parked in
//! its awaiting state until the next start command: there is deliberately
//! no timeout on an incomplete handshake, and external monitors can only
//! observe the stuck attempt as an absent verdict.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use mirage_bus::CanBus;
use mirage_core::{CanId, ControlCommand};
use mirage_mtd::IdObfuscator;
use mirage_node::{Actor, ActorBuilder, Received};

use crate::payload::{self, readiness};

/// Expected battery response time after the start command.
pub const BATTERY_NOMINAL: Duration = Duration::from_secs(1);
/// Expected fuel system response time.
pub const FUEL_NOMINAL: Duration = Duration::from_secs(2);
/// Expected engine control response time.
pub const ENGINE_NOMINAL: Duration = Duration::from_secs(3);
/// Acceptance window around each nominal time.
pub const TOLERANCE: Duration = Duration::from_millis(500);
/// Wait between judging a sequence and broadcasting the verdict.
pub const SETTLE_DELAY: Duration = Duration::from_secs(1);

/// One participant's report within a sequence attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    /// Time from the start command to this report's arrival.
    pub elapsed: Duration,
    /// Payload snapshot taken at arrival.
    pub payload: Vec<u8>,
}

/// Sequence state owned by the starter actor between resets.
#[derive(Clone, Debug, Default)]
pub struct SequenceRecord {
    reset_at: Option<Instant>,
    battery: Option<Report>,
    fuel: Option<Report>,
    engine: Option<Report>,
}

impl SequenceRecord {
    /// Begin a fresh attempt: clear all slots and stamp the reset instant.
    pub fn reset(&mut self, at: Instant) {
        *self = SequenceRecord {
            reset_at: Some(at),
            ..SequenceRecord::default()
        };
    }

    /// Whether an attempt is in progress.
    pub fn is_awaiting(&self) -> bool {
        self.reset_at.is_some()
    }

    /// Record a monitored report. Ignored outside an attempt, for
    /// unmonitored identifiers, and for slots already filled this attempt.
    pub fn observe(&mut self, received: &Received) {
        let Some(reset_at) = self.reset_at else {
            return;
        };

        let slot = match received.id {
            CanId::BATTERY => &mut self.battery,
            CanId::FUEL => &mut self.fuel,
            CanId::ENGINE => &mut self.engine,
            _ => return,
        };

        if slot.is_none() {
            *slot = Some(Report {
                elapsed: received.arrived_at.duration_since(reset_at),
                payload: received.payload().to_vec(),
            });
        }
    }

    /// If every slot is filled, consume the record and return the completed
    /// sequence; the starter goes back to idle either way.
    pub fn take_complete(&mut self) -> Option<CompletedSequence> {
        if self.battery.is_none() || self.fuel.is_none() || self.engine.is_none() {
            return None;
        }

        let complete = CompletedSequence {
            battery: self.battery.take()?,
            fuel: self.fuel.take()?,
            engine: self.engine.take()?,
        };
        self.reset_at = None;
        Some(complete)
    }

    #[cfg(test)]
    pub(crate) fn slot(&self, id: CanId) -> Option<&Report> {
        match id {
            CanId::BATTERY => self.battery.as_ref(),
            CanId::FUEL => self.fuel.as_ref(),
            CanId::ENGINE => self.engine.as_ref(),
            _ => None,
        }
    }
}

/// All three reports of one sequence attempt, ready for judgement.
#[derive(Clone, Debug)]
pub struct CompletedSequence {
    pub battery: Report,
    pub fuel: Report,
    pub engine: Report,
}

impl CompletedSequence {
    /// Judge payloads, tolerance windows, and strict ordering.
    pub fn is_valid(&self) -> bool {
        self.battery.payload == readiness(payload::BATTERY_TAG, true)
            && within_tolerance(self.battery.elapsed, BATTERY_NOMINAL)
            && self.fuel.payload == readiness(payload::FUEL_TAG, true)
            && within_tolerance(self.fuel.elapsed, FUEL_NOMINAL)
            && self.engine.payload == readiness(payload::ENGINE_TAG, true)
            && within_tolerance(self.engine.elapsed, ENGINE_NOMINAL)
            && self.battery.elapsed < self.fuel.elapsed
            && self.fuel.elapsed < self.engine.elapsed
    }
}

fn within_tolerance(elapsed: Duration, nominal: Duration) -> bool {
    let deviation = if elapsed > nominal {
        elapsed - nominal
    } else {
        nominal - elapsed
    };
    deviation <= TOLERANCE
}

/// Spawn the starter motor actor.
pub fn spawn_starter(bus: CanBus, mtd: Arc<IdObfuscator>) -> Actor<SequenceRecord> {
    ActorBuilder::new("starter-motor", bus, mtd, SequenceRecord::default())
        .on_frame(|cx, received| {
            if ControlCommand::from_frame(received.id, received.payload())
                == Some(ControlCommand::StartSequence)
            {
                cx.state().reset(received.arrived_at);
                tracing::debug!("sequence attempt started");
                return Ok(());
            }

            let complete = {
                let mut record = cx.state();
                record.observe(received);
                record.take_complete()
            };

            if let Some(complete) = complete {
                let verdict = if complete.is_valid() {
                    tracing::info!("valid startup sequence, engine starting");
                    payload::STARTUP_VERDICT
                } else {
                    tracing::info!("invalid startup sequence");
                    payload::FAILURE_VERDICT
                };
                cx.schedule(SETTLE_DELAY, move |cx| {
                    cx.publish(CanId::STARTER, &verdict)
                });
            }
            Ok(())
        })
        .spawn()
}
