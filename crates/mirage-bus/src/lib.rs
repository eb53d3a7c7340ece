//! MIRAGE Bus Fabric - in-process broadcast medium
//!
//! Any participant may publish a frame; every subscriber receives a copy,
//! in publish order. Delivery is fire-and-forget: no acknowledgment, no
//! retry, no persistence.

pub mod bus;

pub use bus::*;
