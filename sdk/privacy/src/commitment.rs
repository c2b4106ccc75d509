//! Deposit Commitments
//!
//! A deposit is represented on-pool only by its commitment:
//!
//! ```text
//! Commitment = Poseidon(nullifier_secret, spending_secret, amount)
//! ```
//!
//! The pool never sees the preimage. It only checks that the word is a
//! non-zero canonical BN254 element before inserting it as a leaf.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_std::rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PrivacyError;
use crate::field::{Word, fr_from_word, fr_reduce, fr_to_word};
use crate::poseidon::{hash_fields, poseidon_config};

/// A deposit commitment (32-byte big-endian field element)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub Word);

impl Commitment {
    /// Create commitment from field element
    pub fn from_field(f: Fr) -> Self {
        Self(fr_to_word(&f))
    }

    /// Check the leaf rules and return the field element.
    pub fn validate(&self) -> Result<Fr, PrivacyError> {
        if self.0 == [0u8; 32] {
            return Err(PrivacyError::InvalidCommitment);
        }
        fr_from_word(&self.0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &Word {
        &self.0
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment(0x{})", hex::encode(self.0))
    }
}

/// Client-side commitment derivation.
pub struct CommitmentScheme {
    config: PoseidonConfig<Fr>,
}

impl CommitmentScheme {
    pub fn new() -> Self {
        Self {
            config: poseidon_config(),
        }
    }

    /// C = Poseidon(nullifier_secret, spending_secret, amount)
    pub fn commit(
        &self,
        nullifier_secret: &[u8; 32],
        spending_secret: &[u8; 32],
        amount: u128,
    ) -> Commitment {
        let inputs = [
            fr_reduce(nullifier_secret),
            fr_reduce(spending_secret),
            Fr::from(amount),
        ];
        Commitment::from_field(hash_fields(&self.config, &inputs))
    }

    /// Generate a random secret
    pub fn random_secret<R: Rng>(rng: &mut R) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        bytes
    }
}

impl Default for CommitmentScheme {
    fn default() -> Self {
        Self::new()
    }
}
