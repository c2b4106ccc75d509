//! Pending claims and fee arithmetic.

use serde::{Deserialize, Serialize};

use veilswap_account::Address;
use veilswap_privacy::Nullifier;

use crate::engine::stealth::StealthMetaAddress;

pub const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Zk,
    Ring,
}

/// Where settlement sends the recipient share
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRecipient {
    Direct(Address),
    Stealth(StealthMetaAddress),
}

/// State carried from phase 1 to phase 2 for one initiator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingClaim {
    pub initiator: Address,
    pub recipient: ClaimRecipient,
    /// Zero when no relayer is involved
    pub relayer: Address,
    pub fee_bps: u16,
    /// Nullifier hash or ring key image
    pub nullifier: Nullifier,
    /// Lowest realized output the claimant accepts
    pub claimed_output: u128,
    pub kind: ClaimKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    pub recipient_amount: u128,
    pub fee_amount: u128,
}

/// `fee = floor(output * bps / 10000)`, computed without overflowing for
/// any u128 output.
pub fn split_fee(output: u128, fee_bps: u16) -> FeeSplit {
    let bps = u128::from(fee_bps).min(BPS_DENOMINATOR);
    let (q, r) = (output / BPS_DENOMINATOR, output % BPS_DENOMINATOR);
    let fee_amount = q * bps + (r * bps) / BPS_DENOMINATOR;
    FeeSplit {
        recipient_amount: output - fee_amount,
        fee_amount,
    }
}

/// Aggregate counters exposed by `get_stats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub total_claims: u64,
    pub total_volume: u128,
}
