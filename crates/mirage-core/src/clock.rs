//! Clock source for mask derivation
//!
//! The obfuscation layer derives its mask from the wall clock truncated to
//! whole seconds. Every participant computes the value independently; there
//! is no message exchange to agree on it, so two participants stay in sync
//! only as long as their clocks agree to within the same whole second.

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds in one wall-clock hour; the mask seed has this period.
pub const SECONDS_PER_HOUR: u16 = 3600;

/// Supplies the wall-clock second used to seed the identifier mask.
pub trait WallClock: Send + Sync {
    /// Current second within the hour, `0..3600`.
    fn second_of_hour(&self) -> u16;
}

/// System wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn second_of_hour(&self) -> u16 {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        (since_epoch.as_secs() % u64::from(SECONDS_PER_HOUR)) as u16
    }
}

/// Deterministic clock pinned to a fixed second, for tests and simulations.
#[derive(Debug)]
pub struct FixedClock {
    second: std::sync::atomic::AtomicU16,
}

impl FixedClock {
    pub fn new(second: u16) -> Self {
        FixedClock {
            second: std::sync::atomic::AtomicU16::new(second % SECONDS_PER_HOUR),
        }
    }

    /// Move the pinned second, simulating wall-clock progress.
    pub fn set(&self, second: u16) {
        self.second.store(
            second % SECONDS_PER_HOUR,
            std::sync::atomic::Ordering::Relaxed,
        );
    }
}

impl WallClock for FixedClock {
    fn second_of_hour(&self) -> u16 {
        self.second.load(std::sync::atomic::Ordering::Relaxed)
    }
}
