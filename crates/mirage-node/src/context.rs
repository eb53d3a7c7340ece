//! Shared actor context
//!
//! The context is the only surface an actor's tasks see: they publish
//! through it, read and mutate state through it, and schedule delayed work
//! through it. State access is serialized by a mutex because the receive
//! loop and periodic tasks run concurrently.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use mirage_bus::CanBus;
use mirage_core::{CanId, MirageResult};
use mirage_mtd::IdObfuscator;
use mirage_wire::Frame;

/// A frame as seen by an actor's handler.
#[derive(Clone, Debug)]
pub struct Received {
    /// Deobfuscated logical identifier.
    pub id: CanId,
    /// The frame as it crossed the bus, wire identifier intact.
    pub frame: Frame,
    /// Delivery instant, stamped by the bus fabric.
    pub arrived_at: Instant,
}

impl Received {
    #[inline]
    pub fn payload(&self) -> &[u8] {
        self.frame.payload()
    }
}

/// Shared context for one actor's receive loop and tasks.
pub struct ActorContext<S> {
    name: String,
    bus: CanBus,
    mtd: Arc<IdObfuscator>,
    state: Mutex<S>,
    token: CancellationToken,
}

impl<S: Send + 'static> ActorContext<S> {
    pub(crate) fn new(
        name: String,
        bus: CanBus,
        mtd: Arc<IdObfuscator>,
        state: S,
        token: CancellationToken,
    ) -> Self {
        ActorContext {
            name,
            bus,
            mtd,
            state: Mutex::new(state),
            token,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Obfuscate a logical identifier and publish the frame.
    pub fn publish(&self, id: CanId, payload: &[u8]) -> MirageResult<()> {
        let wire_id = self.mtd.obfuscate(id);
        let frame = Frame::new(wire_id, payload)?;
        self.bus.publish(&frame);
        Ok(())
    }

    /// Lock and access the actor's state.
    pub fn state(&self) -> MutexGuard<'_, S> {
        self.state.lock()
    }

    /// Obfuscation layer shared by all of this actor's tasks.
    pub fn mtd(&self) -> &IdObfuscator {
        &self.mtd
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Arm a one-shot delayed task tied to this actor's lifetime.
    ///
    /// The task is cancelled if the actor stops during the delay; once it
    /// has started running it completes.
    pub fn schedule<F>(self: &Arc<Self>, delay: Duration, f: F)
    where
        F: FnOnce(&Arc<ActorContext<S>>) -> MirageResult<()> + Send + 'static,
    {
        let cx = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                _ = cx.token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = f(&cx) {
                        tracing::warn!(actor = %cx.name, error = %e, "delayed task failed");
                    }
                }
            }
        });
    }
}
