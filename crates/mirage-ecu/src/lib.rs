//! MIRAGE ECU - Startup sequencer and domain controllers
//!
//! The controllers are thin reactive actors on the bus fabric:
//! - [`starter`]: the timing-gated three-party startup handshake arbiter
//! - [`subsystem`]: battery / fuel / engine readiness responders
//! - [`headlamp`], [`indicator`]: lighting switches and lamps
//! - [`force_sensor`], [`crash_detector`], [`airbag`]: the crash chain
//!
//! Each module exposes a `spawn_*` constructor taking the shared bus handle
//! and obfuscation layer; controllers know nothing about each other beyond
//! the identifiers and payload literals in [`payload`].

pub mod airbag;
pub mod crash_detector;
pub mod force_sensor;
pub mod headlamp;
pub mod indicator;
pub mod payload;
pub mod starter;
pub mod subsystem;
