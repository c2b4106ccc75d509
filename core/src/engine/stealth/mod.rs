//! Stealth Routing
//!
//! Claim output is delivered to a one-time address derived from the
//! recipient's meta-address. The derivation publishes an ephemeral key and
//! a one-byte view tag so the recipient can find the payment by scanning
//! announcements.
//!
//! ```text
//! meta-address = spending_pub (33) || viewing_pub (33)
//! metadata     = view_tag (1) || token (20) || amount (32, big-endian)
//! ```

pub mod generator;
pub mod registry;

pub use generator::{Secp256k1StealthGenerator, StealthAddressGenerator, StealthKeys};
pub use registry::StealthRegistry;

use secp256k1::PublicKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use veilswap_account::Address;
use veilswap_privacy::field::u128_to_word;

use crate::error::GateError;

pub const META_ADDRESS_LEN: usize = 66;
pub const METADATA_LEN: usize = 53;

/// Published pair of recipient keys
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StealthMetaAddress {
    pub spending: PublicKey,
    pub viewing: PublicKey,
}

impl StealthMetaAddress {
    pub fn new(spending: PublicKey, viewing: PublicKey) -> Self {
        Self { spending, viewing }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GateError> {
        if bytes.len() != META_ADDRESS_LEN {
            return Err(GateError::InvalidStealthMetaAddress(format!(
                "expected {META_ADDRESS_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let spending = PublicKey::from_slice(&bytes[..33])
            .map_err(|e| GateError::InvalidStealthMetaAddress(format!("spending key: {e}")))?;
        let viewing = PublicKey::from_slice(&bytes[33..])
            .map_err(|e| GateError::InvalidStealthMetaAddress(format!("viewing key: {e}")))?;
        Ok(Self { spending, viewing })
    }

    pub fn to_bytes(&self) -> [u8; META_ADDRESS_LEN] {
        let mut out = [0u8; META_ADDRESS_LEN];
        out[..33].copy_from_slice(&self.spending.serialize());
        out[33..].copy_from_slice(&self.viewing.serialize());
        out
    }
}

impl fmt::Debug for StealthMetaAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StealthMetaAddress(0x{})", hex::encode(self.to_bytes()))
    }
}

impl Serialize for StealthMetaAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.to_bytes()))
    }
}

impl<'de> Deserialize<'de> for StealthMetaAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let bytes = hex::decode(&raw).map_err(serde::de::Error::custom)?;
        Self::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Result of deriving a one-time address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthOutput {
    pub address: Address,
    pub ephemeral_pubkey: [u8; 33],
    pub view_tag: u8,
}

/// view_tag || token || amount
pub fn pack_metadata(view_tag: u8, token: &Address, amount: u128) -> Vec<u8> {
    let mut out = Vec::with_capacity(METADATA_LEN);
    out.push(view_tag);
    out.extend_from_slice(token.as_bytes());
    out.extend_from_slice(&u128_to_word(amount));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_layout() {
        let token = Address([0x11; 20]);
        let meta = pack_metadata(0xab, &token, 1_000_000);
        assert_eq!(meta.len(), METADATA_LEN);
        assert_eq!(meta[0], 0xab);
        assert_eq!(&meta[1..21], token.as_bytes());
        assert_eq!(&meta[49..53], &1_000_000u32.to_be_bytes());
    }

    #[test]
    fn test_meta_address_length_checked() {
        assert!(matches!(
            StealthMetaAddress::from_bytes(&[2u8; 65]),
            Err(GateError::InvalidStealthMetaAddress(_))
        ));
        assert!(matches!(
            StealthMetaAddress::from_bytes(&[0u8; 66]),
            Err(GateError::InvalidStealthMetaAddress(_))
        ));
    }
}
