//! Phase 1 claim verification.
//!
//! ```text
//!             ┌──────────────────────┐
//!   payload ─►│ ClaimPayload::decode │
//!             └──────────┬───────────┘
//!           ┌────────────┴────────────┐
//!           ▼                         ▼
//!  ZkMembershipVerifier      RingSignatureVerifier
//!  root, nullifier,          shape, key image, meta-address,
//!  recipient, fee, pairing   fee, members deposited, ring closure
//!           └────────────┬────────────┘
//!                        ▼
//!                  PendingClaim
//! ```
//!
//! Verifiers only read pool state. Burning the identifier and storing the
//! pending claim is left to the gate.

use log::debug;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

use veilswap_account::Address;
use veilswap_privacy::field::u128_to_word;
use veilswap_privacy::{PrivacyError, SnarkVerifier, ring};

use super::claim::{ClaimKind, ClaimRecipient, PendingClaim};
use super::payload::{RingClaim, ZkClaim};
use crate::engine::PoolState;
use crate::engine::stealth::StealthMetaAddress;
use crate::error::{GateError, GateResult};

const RING_MESSAGE_DOMAIN: &[u8] = b"veilswap.ring.v1";

/// Read-only view a verifier checks a claim against
pub struct ClaimContext<'a> {
    pub initiator: Address,
    pub state: &'a PoolState,
    pub max_fee_bps: u16,
}

pub trait ClaimVerifier {
    type Claim;

    fn verify_claim(&self, ctx: &ClaimContext<'_>, claim: &Self::Claim) -> GateResult<PendingClaim>;
}

// ============================================================================
// Variant A
// ============================================================================

pub struct ZkMembershipVerifier<'a> {
    snark: &'a dyn SnarkVerifier,
}

impl<'a> ZkMembershipVerifier<'a> {
    pub fn new(snark: &'a dyn SnarkVerifier) -> Self {
        Self { snark }
    }
}

impl ClaimVerifier for ZkMembershipVerifier<'_> {
    type Claim = ZkClaim;

    fn verify_claim(&self, ctx: &ClaimContext<'_>, claim: &ZkClaim) -> GateResult<PendingClaim> {
        // cheap checks before the pairing
        if !ctx.state.accumulator.is_known_root(&claim.merkle_root()) {
            return Err(GateError::InvalidMerkleRoot);
        }
        let nullifier = claim.nullifier_hash();
        if ctx.state.nullifiers.is_spent(&nullifier) {
            return Err(GateError::NullifierAlreadyUsed);
        }
        let recipient = claim.recipient()?;
        if recipient.is_zero() {
            return Err(GateError::InvalidRecipient);
        }
        let relayer = claim.relayer()?;
        let fee_bps = check_relayer(ctx, &relayer, claim.fee_bps())?;

        match self.snark.verify(&claim.proof, &claim.signals) {
            Ok(true) => {}
            Ok(false) | Err(PrivacyError::InvalidProof) => return Err(GateError::InvalidProof),
            Err(e) => return Err(e.into()),
        }

        // registered identities are paid through a fresh stealth address
        let recipient = match ctx.state.stealth.meta_address_of(&recipient) {
            Some(meta) => ClaimRecipient::Stealth(*meta),
            None => ClaimRecipient::Direct(recipient),
        };

        debug!("zk claim verified for initiator {}", ctx.initiator);
        Ok(PendingClaim {
            initiator: ctx.initiator,
            recipient,
            relayer,
            fee_bps,
            nullifier,
            claimed_output: claim.claimed_output(),
            kind: ClaimKind::Zk,
        })
    }
}

// ============================================================================
// Variant B
// ============================================================================

#[derive(Debug, Default)]
pub struct RingSignatureVerifier;

impl ClaimVerifier for RingSignatureVerifier {
    type Claim = RingClaim;

    fn verify_claim(&self, ctx: &ClaimContext<'_>, claim: &RingClaim) -> GateResult<PendingClaim> {
        ring::check_shape(claim.ring_members.len(), claim.signature.len())?;

        let key_image = claim.key_image_id();
        if ctx.state.nullifiers.is_spent(&key_image) {
            return Err(GateError::NullifierAlreadyUsed);
        }
        let meta = StealthMetaAddress::from_bytes(&claim.stealth_meta_address)?;
        let fee_bps = check_relayer(ctx, &claim.relayer, claim.relayer_fee_bps)?;

        let mut seen = HashSet::with_capacity(claim.ring_members.len());
        if !claim.ring_members.iter().all(|m| seen.insert(*m)) {
            return Err(GateError::InvalidRingSignature);
        }
        for member in &claim.ring_members {
            if !ctx.state.accumulator.contains(&ring::member_commitment(member)) {
                return Err(GateError::RingMemberNotDeposited(hex::encode(member)));
            }
        }

        let message = ring_message(&meta, &claim.relayer, fee_bps, &ctx.initiator);
        match ring::verify(&message, &claim.signature, &claim.key_image, &claim.ring_members) {
            Ok(true) => {}
            Ok(false)
            | Err(PrivacyError::InvalidPoint)
            | Err(PrivacyError::InvalidRingSignature) => {
                return Err(GateError::InvalidRingSignature);
            }
            Err(e) => return Err(e.into()),
        }

        debug!(
            "ring claim verified for initiator {} (ring size {})",
            ctx.initiator,
            claim.ring_members.len()
        );
        Ok(PendingClaim {
            initiator: ctx.initiator,
            recipient: ClaimRecipient::Stealth(meta),
            relayer: claim.relayer,
            fee_bps,
            nullifier: key_image,
            claimed_output: 0,
            kind: ClaimKind::Ring,
        })
    }
}

/// Message a ring signature must cover.
///
/// `SHA-256(domain || meta || relayer || feeBps (32-byte BE) || initiator)`
pub fn ring_message(
    meta: &StealthMetaAddress,
    relayer: &Address,
    fee_bps: u16,
    initiator: &Address,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(RING_MESSAGE_DOMAIN);
    hasher.update(meta.to_bytes());
    hasher.update(relayer.as_bytes());
    hasher.update(u128_to_word(u128::from(fee_bps)));
    hasher.update(initiator.as_bytes());
    hasher.finalize().into()
}

/// Fee cap, fee-needs-relayer and relayer allowlist checks.
fn check_relayer(ctx: &ClaimContext<'_>, relayer: &Address, fee_bps: u128) -> GateResult<u16> {
    let invalid_fee = GateError::InvalidRelayerFee {
        fee_bps,
        max_bps: ctx.max_fee_bps,
    };
    if fee_bps > u128::from(ctx.max_fee_bps) {
        return Err(invalid_fee);
    }
    if relayer.is_zero() {
        if fee_bps > 0 {
            return Err(invalid_fee);
        }
    } else if !ctx.state.access.is_relayer(relayer) {
        return Err(GateError::UnauthorizedRelayer(*relayer));
    }
    u16::try_from(fee_bps).map_err(|_| invalid_fee)
}
