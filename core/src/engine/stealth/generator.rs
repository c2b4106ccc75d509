//! One-time address derivation over secp256k1 (scheme id 1).
//!
//! ```text
//! sender:    r random, R = r·G
//!            shared = r·V,  h = keccak256(shared)
//!            P = S + h·G,   address = keccak256(P)[12..]
//! recipient: shared = v·R,  check h[0] == view_tag, p = s + h
//! ```

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use secp256k1::{PublicKey, SECP256K1, Scalar, SecretKey};
use sha3::{Digest, Keccak256};

use veilswap_account::Address;

use super::{StealthMetaAddress, StealthOutput};
use crate::engine::events::Announcement;
use crate::error::GateError;

/// Opaque derivation capability used by the gate.
pub trait StealthAddressGenerator: Send {
    fn generate(&mut self, meta: &StealthMetaAddress) -> Result<StealthOutput, GateError>;
}

pub struct Secp256k1StealthGenerator {
    rng: StdRng,
}

impl Secp256k1StealthGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic ephemeral keys, for tests and replays.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for Secp256k1StealthGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl StealthAddressGenerator for Secp256k1StealthGenerator {
    fn generate(&mut self, meta: &StealthMetaAddress) -> Result<StealthOutput, GateError> {
        let ephemeral = random_secret(&mut self.rng);
        let ephemeral_pub = PublicKey::from_secret_key(SECP256K1, &ephemeral);

        let shared = meta
            .viewing
            .mul_tweak(SECP256K1, &Scalar::from(ephemeral))
            .map_err(|e| GateError::InvalidStealthMetaAddress(e.to_string()))?;
        let h = keccak(&shared.serialize());
        let stealth_pub = stealth_public_key(&meta.spending, &h)?;

        Ok(StealthOutput {
            address: address_of(&stealth_pub),
            ephemeral_pubkey: ephemeral_pub.serialize(),
            view_tag: h[0],
        })
    }
}

/// Recipient key pair: spending key `s` and viewing key `v`
pub struct StealthKeys {
    spending: SecretKey,
    viewing: SecretKey,
}

impl StealthKeys {
    pub fn generate<R: RngCore>(rng: &mut R) -> Self {
        Self {
            spending: random_secret(rng),
            viewing: random_secret(rng),
        }
    }

    pub fn meta_address(&self) -> StealthMetaAddress {
        StealthMetaAddress::new(
            PublicKey::from_secret_key(SECP256K1, &self.spending),
            PublicKey::from_secret_key(SECP256K1, &self.viewing),
        )
    }

    /// Recognise an announcement addressed to these keys and return the
    /// one-time spending key.
    pub fn scan(&self, announcement: &Announcement) -> Option<SecretKey> {
        let view_tag = *announcement.metadata.first()?;
        let ephemeral = PublicKey::from_slice(&announcement.ephemeral_pub_key).ok()?;

        let shared = ephemeral
            .mul_tweak(SECP256K1, &Scalar::from(self.viewing))
            .ok()?;
        let h = keccak(&shared.serialize());
        if h[0] != view_tag {
            return None;
        }

        let stealth_pub = stealth_public_key(&self.meta_address().spending, &h).ok()?;
        if address_of(&stealth_pub) != announcement.stealth_address {
            return None;
        }
        let tweak = Scalar::from_be_bytes(h).ok()?;
        self.spending.add_tweak(&tweak).ok()
    }
}

/// Ethereum-style address of a public key
pub fn address_of(key: &PublicKey) -> Address {
    let uncompressed = key.serialize_uncompressed();
    let digest = keccak(&uncompressed[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[12..]);
    Address(out)
}

fn stealth_public_key(spending: &PublicKey, h: &[u8; 32]) -> Result<PublicKey, GateError> {
    let tweak = Scalar::from_be_bytes(*h)
        .map_err(|e| GateError::InvalidStealthMetaAddress(e.to_string()))?;
    spending
        .add_exp_tweak(SECP256K1, &tweak)
        .map_err(|e| GateError::InvalidStealthMetaAddress(e.to_string()))
}

fn keccak(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

fn random_secret<R: RngCore + ?Sized>(rng: &mut R) -> SecretKey {
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        if let Ok(key) = SecretKey::from_slice(&bytes) {
            return key;
        }
    }
}
