//! Identifier obfuscation
//!
//! XOR-masks logical identifiers into wire identifiers and back. XOR is
//! self-inverse, so decode recovers the original only when both sides
//! compute the same mask, which requires their clocks to agree to within
//! the same whole second at encode and decode time. A frame encoded in
//! second N and decoded in second N+1 decodes to a different (generally
//! unused) identifier with no error signaled; the frame is effectively
//! dropped. Inherent to the scheme, not a defect.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use mirage_core::{CanId, WallClock};

use crate::{MaskGenerator, KEY_SIZE};

/// Obfuscation layer configuration, injected at construction.
#[derive(Clone)]
pub struct MtdConfig {
    /// Pre-shared mask key. Every participant on the bus must hold the same
    /// key or masked traffic is mutually unintelligible.
    pub key: [u8; KEY_SIZE],
    /// When false the layer is a no-op, reproducing the static deployment
    /// variant with plain identifiers.
    pub dynamic: bool,
}

impl MtdConfig {
    /// Derive the key from a shared passphrase (SHA-256, truncated).
    pub fn from_passphrase(passphrase: &str, dynamic: bool) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest[..KEY_SIZE]);
        MtdConfig { key, dynamic }
    }

    /// Static deployment: identifiers pass through unmasked.
    pub fn disabled() -> Self {
        MtdConfig {
            key: [0u8; KEY_SIZE],
            dynamic: false,
        }
    }
}

impl Default for MtdConfig {
    fn default() -> Self {
        MtdConfig {
            key: *b"moving-target-16",
            dynamic: true,
        }
    }
}

/// Applies and removes the time-derived identifier mask.
///
/// Stateless apart from configuration: every call derives the mask fresh
/// from the clock, so no locking is needed and instances can be shared
/// freely across an actor's tasks.
pub struct IdObfuscator {
    generator: MaskGenerator,
    clock: Arc<dyn WallClock>,
    dynamic: bool,
}

impl IdObfuscator {
    pub fn new(config: MtdConfig, clock: Arc<dyn WallClock>) -> Self {
        IdObfuscator {
            generator: MaskGenerator::new(&config.key),
            clock,
            dynamic: config.dynamic,
        }
    }

    /// Current mask value.
    pub fn mask(&self) -> u16 {
        self.generator.mask_for_second(self.clock.second_of_hour())
    }

    /// Logical identifier to wire identifier. The control ID is exempt so
    /// the coordination channel stays addressable regardless of clock skew.
    pub fn obfuscate(&self, id: CanId) -> CanId {
        if !self.dynamic || id == CanId::CONTROL {
            return id;
        }
        id.xor(self.mask())
    }

    /// Wire identifier to logical identifier, evaluated at the receiver's
    /// own clock. Symmetric with [`obfuscate`](Self::obfuscate).
    pub fn deobfuscate(&self, id: CanId) -> CanId {
        if !self.dynamic || id == CanId::CONTROL {
            return id;
        }
        id.xor(self.mask())
    }
}
