//! MIRAGE Node - Actor runtime
//!
//! Every bus participant runs inside an actor:
//! - one receive loop dispatching deobfuscated frames to a handler
//! - zero or more periodic tasks, evaluated against live actor state
//! - zero or more one-shot delayed tasks
//!
//! All of an actor's tasks share its [`ActorContext`]: state behind a
//! mutex, the bus handle, the obfuscation layer, and a cancellation token
//! tying task lifetimes to the actor's.

pub mod actor;
pub mod context;

pub use actor::*;
pub use context::*;
