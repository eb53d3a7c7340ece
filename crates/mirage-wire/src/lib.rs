//! MIRAGE Wire Protocol - Binary frame format
//!
//! This crate implements the wire format for MIRAGE frames:
//! - 2 bytes: wire identifier (big-endian, 11 bits used)
//! - 1 byte: payload length (1..=8)
//! - payload bytes

pub mod frame;

pub use frame::*;
