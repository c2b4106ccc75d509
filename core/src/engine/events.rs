//! Pool events.
//!
//! Events are buffered per session and only become visible once the
//! session commits. A rolled back session emits nothing.

use serde::{Deserialize, Serialize};

use veilswap_account::{Address, Currency};
use veilswap_privacy::{Commitment, Nullifier};

/// Log entry recipients scan to find stealth payments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub scheme_id: u64,
    pub stealth_address: Address,
    pub caller: Address,
    #[serde(with = "hex::serde")]
    pub ephemeral_pub_key: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub metadata: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    Deposit {
        commitment: Commitment,
        leaf_index: u64,
        currency: Currency,
        amount: u128,
        timestamp: i64,
    },
    PrivateSwapExecuted {
        nullifier_hash: Nullifier,
        recipient: Address,
        relayer: Address,
        amount: u128,
        fee: u128,
        timestamp: i64,
    },
    StealthPayment {
        stealth_address: Address,
        token: Address,
        amount: u128,
        fee: u128,
        relayer: Address,
    },
    Announcement(Announcement),
    RelayerUpdated {
        relayer: Address,
        allowed: bool,
    },
    RouterUpdated {
        router: Address,
        authorized: bool,
    },
    MetaAddressRegistered {
        identity: Address,
    },
}

impl PoolEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PoolEvent::Deposit { .. } => "Deposit",
            PoolEvent::PrivateSwapExecuted { .. } => "PrivateSwapExecuted",
            PoolEvent::StealthPayment { .. } => "StealthPayment",
            PoolEvent::Announcement(_) => "Announcement",
            PoolEvent::RelayerUpdated { .. } => "RelayerUpdated",
            PoolEvent::RouterUpdated { .. } => "RouterUpdated",
            PoolEvent::MetaAddressRegistered { .. } => "MetaAddressRegistered",
        }
    }
}

pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
