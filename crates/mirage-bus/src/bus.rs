//! Broadcast bus fabric
//!
//! [`CanBus`] is a thin wrapper around [`tokio::sync::broadcast`]. Frames
//! travel wire-encoded ([`Bytes`]), one message per frame, so delivery is
//! atomic per message and concurrent publishers cannot interleave payloads.
//!
//! - [`CanBus::endpoint`] attaches a new participant to the fabric.
//! - [`CanBus::publish`] fans a frame out to all subscribers (non-blocking).
//! - [`BusReceiver::recv`] blocks up to a timeout; `None` on timeout.
//!
//! A participant never receives its own frames: every handle carries an
//! origin tag and a subscriber skips envelopes matching its own origin.
//!
//! A subscriber that falls behind the channel capacity loses the oldest
//! frames and keeps reading; delivery is best-effort by contract. A closed
//! channel is the transport failure: fatal to the receiving loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::broadcast;
use tokio::time::Instant;

use mirage_core::{MirageError, MirageResult};
use mirage_wire::Frame;

/// Default channel capacity per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// A received frame plus its arrival instant, stamped at delivery.
#[derive(Clone, Debug)]
pub struct Message {
    pub frame: Frame,
    pub arrived_at: Instant,
}

#[derive(Clone, Debug)]
struct Envelope {
    origin: usize,
    bytes: Bytes,
}

/// Handle to the shared bus fabric, bound to one participant origin.
///
/// Cloning keeps the origin (one participant, many tasks); [`endpoint`]
/// allocates a new origin (a new participant attachment).
///
/// [`endpoint`]: CanBus::endpoint
#[derive(Clone)]
pub struct CanBus {
    tx: broadcast::Sender<Envelope>,
    next_origin: Arc<AtomicUsize>,
    origin: usize,
}

impl CanBus {
    /// Create a new bus with the given per-subscriber capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        CanBus {
            tx,
            next_origin: Arc::new(AtomicUsize::new(1)),
            origin: 0,
        }
    }

    /// Attach a new participant to the fabric.
    pub fn endpoint(&self) -> CanBus {
        CanBus {
            tx: self.tx.clone(),
            next_origin: Arc::clone(&self.next_origin),
            origin: self.next_origin.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Publish a frame to every other participant.
    ///
    /// Fire-and-forget: having no subscribers is not an error, and no
    /// delivery confirmation exists.
    pub fn publish(&self, frame: &Frame) {
        let _ = self.tx.send(Envelope {
            origin: self.origin,
            bytes: frame.encode(),
        });
    }

    /// Subscribe to the bus. The receiver sees every frame published after
    /// this call, except frames published through this same origin.
    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver {
            rx: self.tx.subscribe(),
            origin: self.origin,
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CanBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiving end of a bus subscription.
pub struct BusReceiver {
    rx: broadcast::Receiver<Envelope>,
    origin: usize,
}

impl BusReceiver {
    /// Wait up to `timeout` for the next frame.
    ///
    /// Returns `Ok(None)` on timeout and `Err(BusClosed)` once every
    /// publisher handle is gone. Own-origin, lagged, and malformed frames
    /// are skipped; the wait keeps its original deadline.
    pub async fn recv(&mut self, timeout: Duration) -> MirageResult<Option<Message>> {
        let deadline = Instant::now() + timeout;

        loop {
            let envelope = match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Err(_) => return Ok(None),
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(MirageError::BusClosed)
                }
                Ok(Err(broadcast::error::RecvError::Lagged(missed))) => {
                    tracing::warn!(missed, "subscriber lagged, frames lost");
                    continue;
                }
                Ok(Ok(envelope)) => envelope,
            };

            if envelope.origin == self.origin {
                continue;
            }

            match Frame::decode(&envelope.bytes) {
                Ok(frame) => {
                    return Ok(Some(Message {
                        frame,
                        arrived_at: Instant::now(),
                    }))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "dropping malformed frame");
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirage_core::CanId;

    fn frame(id: u16, payload: &[u8]) -> Frame {
        Frame::new(CanId::new(id), payload).unwrap()
    }

    #[tokio::test]
    async fn test_fanout_in_publish_order() {
        let bus = CanBus::new(16);
        let mut receivers: Vec<BusReceiver> =
            (0..3).map(|_| bus.endpoint().subscribe()).collect();

        for i in 0..5u8 {
            bus.publish(&frame(0x100 + u16::from(i), &[i]));
        }

        for rx in &mut receivers {
            for i in 0..5u8 {
                let msg = rx
                    .recv(Duration::from_millis(100))
                    .await
                    .unwrap()
                    .expect("frame expected");
                assert_eq!(msg.frame.id(), CanId::new(0x100 + u16::from(i)));
                assert_eq!(msg.frame.payload(), &[i]);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_none() {
        let bus = CanBus::new(4);
        let mut rx = bus.endpoint().subscribe();

        let got = rx.recv(Duration::from_secs(1)).await.unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_own_frames_are_not_echoed() {
        let bus = CanBus::new(16);
        let participant = bus.endpoint();
        let mut own_rx = participant.subscribe();
        let mut peer_rx = bus.endpoint().subscribe();

        participant.publish(&frame(0x001, &[0x07]));

        let peer_msg = peer_rx.recv(Duration::from_millis(100)).await.unwrap();
        assert!(peer_msg.is_some());

        let own_msg = own_rx.recv(Duration::from_millis(100)).await.unwrap();
        assert!(own_msg.is_none());
    }

    #[tokio::test]
    async fn test_closed_bus_is_fatal() {
        let bus = CanBus::new(4);
        let mut rx = bus.endpoint().subscribe();
        drop(bus);

        let err = rx.recv(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, MirageError::BusClosed));
    }

    #[tokio::test]
    async fn test_concurrent_publishers_deliver_whole_frames() {
        let bus = CanBus::new(256);
        let mut rx = bus.subscribe();

        let mut handles = Vec::new();
        for tag in 0..4u8 {
            let publisher = bus.endpoint();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    publisher.publish(&frame(0x300, &[tag; 4]));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every delivered payload is one publisher's intact 4-byte pattern.
        for _ in 0..100 {
            let msg = rx
                .recv(Duration::from_millis(100))
                .await
                .unwrap()
                .expect("frame expected");
            let payload = msg.frame.payload();
            assert_eq!(payload.len(), 4);
            assert!(payload.iter().all(|b| *b == payload[0]));
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = CanBus::new(4);
        bus.publish(&frame(0x001, &[0x07]));
        assert_eq!(bus.subscriber_count(), 0);
    }
}
