//! Privacy Gate
//!
//! Two-phase claim around an external exchange call:
//!
//! ```text
//!   Idle ──before_swap──► Pending ──after_swap──► Idle
//!          verify claim             split fee
//!          burn nullifier           route output (direct | stealth)
//!          stage claim              announce, update stats
//! ```
//!
//! Both phases run inside one atomic session; an error in either unwinds
//! both.

use log::{debug, info};

use veilswap_account::{Address, Currency};
use veilswap_privacy::{Nullifier, PrivacyError};

use super::claim::{ClaimRecipient, split_fee};
use super::journal::UndoOp;
use super::payload::ClaimPayload;
use super::verifier::{ClaimContext, ClaimVerifier, RingSignatureVerifier, ZkMembershipVerifier};
use crate::engine::events::{self, Announcement, PoolEvent};
use crate::engine::session::Session;
use crate::engine::stealth::{StealthOutput, pack_metadata};
use crate::error::{GateError, GateResult};

/// Signed output leg reported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapDelta {
    pub currency: Currency,
    pub amount: i128,
}

/// Outcome of phase 2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub nullifier: Nullifier,
    pub recipient: Address,
    pub recipient_amount: u128,
    pub relayer: Address,
    pub fee_amount: u128,
    pub currency: Currency,
    pub stealth: Option<StealthOutput>,
}

impl Session<'_> {
    /// Phase 1. Returns the burned identifier, or `None` for a
    /// pass-through payload.
    pub fn before_swap(
        &mut self,
        initiator: Address,
        payload: &[u8],
    ) -> GateResult<Option<Nullifier>> {
        let payload = ClaimPayload::decode(payload)?;
        if payload.is_pass_through() {
            debug!("phase 1: pass-through for {initiator}");
            return Ok(None);
        }
        if self.state.pending.contains_key(&initiator) {
            return Err(GateError::ClaimAlreadyPending(initiator));
        }

        let claim = {
            let ctx = ClaimContext {
                initiator,
                state: &*self.state,
                max_fee_bps: self.config.max_relayer_fee_bps,
            };
            match &payload {
                ClaimPayload::Zk(zk) => {
                    ZkMembershipVerifier::new(self.snark).verify_claim(&ctx, zk)?
                }
                ClaimPayload::Ring(ring) => RingSignatureVerifier.verify_claim(&ctx, ring)?,
                ClaimPayload::PassThrough => return Ok(None),
            }
        };

        let nullifier = claim.nullifier;
        self.state
            .nullifiers
            .mark_spent(&self.capability, nullifier)
            .map_err(|e| match e {
                PrivacyError::AlreadyUsed => GateError::NullifierAlreadyUsed,
                other => other.into(),
            })?;
        self.journal.record(UndoOp::NullifierSpent(nullifier));
        self.journal.spent_nullifier(nullifier);

        info!(
            "phase 1: {:?} claim staged for {initiator}, nullifier {}",
            claim.kind,
            hex::encode(nullifier.as_bytes())
        );
        self.state.pending.insert(initiator, claim);
        self.journal.record(UndoOp::PendingInserted(initiator));
        Ok(Some(nullifier))
    }

    /// Phase 2. Consumes the initiator's pending claim and routes the
    /// realized output held by the gate account. An empty payload is a
    /// no-op.
    pub fn after_swap(
        &mut self,
        initiator: Address,
        payload: &[u8],
        delta: &SwapDelta,
    ) -> GateResult<Option<Settlement>> {
        if payload.is_empty() {
            return Ok(None);
        }
        let claim = self
            .state
            .pending
            .remove(&initiator)
            .ok_or(GateError::ClaimNotInitialized(initiator))?;
        self.journal.record(UndoOp::PendingRemoved(claim.clone()));

        let output =
            u128::try_from(delta.amount).map_err(|_| GateError::InvalidSwapDelta(delta.amount))?;
        if output < claim.claimed_output {
            return Err(GateError::OutputBelowClaim {
                output,
                claimed: claim.claimed_output,
            });
        }
        let split = split_fee(output, claim.fee_bps);

        let (recipient, stealth) = match &claim.recipient {
            ClaimRecipient::Direct(address) => (*address, None),
            ClaimRecipient::Stealth(meta) => {
                let out = self.stealth.generate(meta)?;
                (out.address, Some(out))
            }
        };

        let gate = self.config.gate;
        self.ledger_debit(gate, delta.currency, output)?;
        self.ledger_credit(recipient, delta.currency, split.recipient_amount)?;
        if split.fee_amount > 0 {
            self.ledger_credit(claim.relayer, delta.currency, split.fee_amount)?;
        }

        let previous = self.state.stats;
        self.journal.record(UndoOp::Stats(previous));
        self.state.stats.total_claims = previous.total_claims.saturating_add(1);
        self.state.stats.total_volume = previous.total_volume.saturating_add(output);

        self.journal.emit(PoolEvent::PrivateSwapExecuted {
            nullifier_hash: claim.nullifier,
            recipient,
            relayer: claim.relayer,
            amount: split.recipient_amount,
            fee: split.fee_amount,
            timestamp: events::now(),
        });
        if let Some(out) = &stealth {
            let token = delta.currency.token_address();
            self.journal.emit(PoolEvent::StealthPayment {
                stealth_address: out.address,
                token,
                amount: split.recipient_amount,
                fee: split.fee_amount,
                relayer: claim.relayer,
            });
            self.journal.emit(PoolEvent::Announcement(Announcement {
                scheme_id: self.config.scheme_id,
                stealth_address: out.address,
                caller: gate,
                ephemeral_pub_key: out.ephemeral_pubkey.to_vec(),
                metadata: pack_metadata(out.view_tag, &token, split.recipient_amount),
            }));
        }

        info!(
            "phase 2: settled {output} {} for {initiator} ({} to recipient, {} fee)",
            delta.currency, split.recipient_amount, split.fee_amount
        );
        Ok(Some(Settlement {
            nullifier: claim.nullifier,
            recipient,
            recipient_amount: split.recipient_amount,
            relayer: claim.relayer,
            fee_amount: split.fee_amount,
            currency: delta.currency,
            stealth,
        }))
    }
}
