//! Error types for the MIRAGE bus

use thiserror::Error;

/// Core MIRAGE errors
#[derive(Error, Debug)]
pub enum MirageError {
    // Wire errors
    #[error("Invalid wire format: {0}")]
    InvalidWireFormat(String),

    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Payload too long: {len} bytes, limit is 8")]
    PayloadTooLong { len: usize },

    #[error("Empty payload")]
    EmptyPayload,

    // Bus errors
    #[error("Bus closed")]
    BusClosed,
}

/// Result type for MIRAGE operations
pub type MirageResult<T> = Result<T, MirageError>;
