//! MIRAGE MTD - Moving-target identifier defense
//!
//! Rewrites bus identifiers with a clock-synchronized pseudo-random mask
//! instead of a static mapping:
//! - [`MaskGenerator`] derives an 11-bit mask from the wall-clock second
//! - [`IdObfuscator`] applies and removes the mask, exempting the control ID
//! - [`MtdConfig`] carries the pre-shared key and deployment mode
//!
//! Every participant derives the mask independently from its own clock; no
//! key or mask material ever crosses the bus.

pub mod mask;
pub mod obfuscator;

pub use mask::*;
pub use obfuscator::*;
