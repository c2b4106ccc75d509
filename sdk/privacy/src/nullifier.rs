//! Nullifiers
//!
//! A claim is identified by a 32-byte tag that may be used once:
//!
//! ```text
//! zk claim:    NullifierHash = Poseidon("NULL", nullifier_secret)
//! ring claim:  KeyImage      = x · Hp(P)
//! ```
//!
//! Both kinds live in the same registry. Once a tag is recorded the
//! corresponding deposit cannot be claimed again.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::field::{Word, fr_reduce, fr_to_word};
use crate::poseidon::{hash_fields, poseidon_config};

/// A single-use claim identifier (nullifier hash or key image)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(pub Word);

impl Nullifier {
    /// Create from field element
    pub fn from_field(f: Fr) -> Self {
        Self(fr_to_word(&f))
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &Word {
        &self.0
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: Word) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier(0x{})", hex::encode(self.0))
    }
}

/// Depositor-held nullifier secret.
#[derive(Clone)]
pub struct NullifierKey {
    key: [u8; 32],
    config: PoseidonConfig<Fr>,
}

impl NullifierKey {
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self {
            key,
            config: poseidon_config(),
        }
    }

    /// Public nullifier hash revealed when the deposit is claimed.
    pub fn nullifier_hash(&self) -> Nullifier {
        let domain = Fr::from(0x4e554c4c_u64); // "NULL"
        let key_f = fr_reduce(&self.key);
        Nullifier::from_field(hash_fields(&self.config, &[domain, key_f]))
    }

    pub fn secret(&self) -> &[u8; 32] {
        &self.key
    }
}
