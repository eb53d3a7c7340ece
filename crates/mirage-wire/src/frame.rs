//! Frame structure for the MIRAGE wire protocol
//!
//! Frame = wire ID + short payload. No extended identifiers, no payload
//! encryption: the moving-target layer rewrites identifiers only.

use bytes::{BufMut, Bytes, BytesMut};

use mirage_core::{CanId, MirageError, MirageResult};

/// Maximum payload size in bytes.
pub const MAX_PAYLOAD_LEN: usize = 8;

/// Encoded size of the frame header (ID + length byte).
pub const HEADER_LEN: usize = 3;

/// A single bus frame. Immutable once published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    id: CanId,
    payload: Bytes,
}

impl Frame {
    /// Create a frame, validating the payload length.
    pub fn new(id: CanId, payload: &[u8]) -> MirageResult<Self> {
        if payload.is_empty() {
            return Err(MirageError::EmptyPayload);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(MirageError::PayloadTooLong { len: payload.len() });
        }
        Ok(Frame {
            id,
            payload: Bytes::copy_from_slice(payload),
        })
    }

    /// Identifier as carried on the wire.
    #[inline]
    pub fn id(&self) -> CanId {
        self.id
    }

    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serialize to the binary wire format.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.payload.len());
        buf.put_slice(&self.id.to_bytes());
        buf.put_u8(self.payload.len() as u8);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Parse a frame from the binary wire format.
    pub fn decode(buf: &[u8]) -> MirageResult<Self> {
        if buf.len() < HEADER_LEN + 1 {
            return Err(MirageError::BufferTooShort {
                expected: HEADER_LEN + 1,
                actual: buf.len(),
            });
        }

        let raw_id = u16::from_be_bytes([buf[0], buf[1]]);
        if raw_id > CanId::MAX.raw() {
            return Err(MirageError::InvalidWireFormat(format!(
                "identifier 0x{raw_id:X} exceeds 11 bits"
            )));
        }

        let len = buf[2] as usize;
        if len == 0 || len > MAX_PAYLOAD_LEN {
            return Err(MirageError::InvalidWireFormat(format!(
                "payload length {len} out of range"
            )));
        }
        if buf.len() < HEADER_LEN + len {
            return Err(MirageError::BufferTooShort {
                expected: HEADER_LEN + len,
                actual: buf.len(),
            });
        }
        if buf.len() > HEADER_LEN + len {
            return Err(MirageError::InvalidWireFormat(format!(
                "{} trailing bytes after payload",
                buf.len() - HEADER_LEN - len
            )));
        }

        Ok(Frame {
            id: CanId::new(raw_id),
            payload: Bytes::copy_from_slice(&buf[HEADER_LEN..]),
        })
    }
}
