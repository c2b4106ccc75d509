//! Undo journal for atomic sessions.
//!
//! Every mutation a session performs records how to reverse it. Rolling
//! back replays the records newest first; committing hands the buffered
//! events and the persistence diff to the engine.

use veilswap_account::{Address, Currency};
use veilswap_privacy::{Commitment, Nullifier};

use super::claim::{PendingClaim, PoolStats};
use crate::engine::PoolState;
use crate::engine::events::PoolEvent;
use crate::engine::stealth::StealthMetaAddress;
use crate::engine::storage::AccumulatorCheckpoint;

pub(crate) enum UndoOp {
    Accumulator(AccumulatorCheckpoint),
    NullifierSpent(Nullifier),
    PendingInserted(Address),
    PendingRemoved(PendingClaim),
    Vault {
        currency: Currency,
        previous: u128,
    },
    Ledger {
        holder: Address,
        currency: Currency,
        previous: u128,
    },
    Stats(PoolStats),
    Relayer {
        relayer: Address,
        was_allowed: bool,
    },
    Router {
        router: Address,
        was_authorized: bool,
    },
    MetaAddress {
        identity: Address,
        previous: Option<StealthMetaAddress>,
    },
}

#[derive(Default)]
pub struct Journal {
    ops: Vec<UndoOp>,
    accumulator_saved: bool,
    events: Vec<PoolEvent>,
    commitments: Vec<(u64, Commitment)>,
    nullifiers: Vec<Nullifier>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, op: UndoOp) {
        self.ops.push(op);
    }

    /// Only the first checkpoint of a session is kept; later inserts are
    /// covered by it.
    pub(crate) fn record_accumulator(&mut self, state: &PoolState) {
        if !self.accumulator_saved {
            self.ops
                .push(UndoOp::Accumulator(state.accumulator.checkpoint()));
            self.accumulator_saved = true;
        }
    }

    pub(crate) fn emit(&mut self, event: PoolEvent) {
        self.events.push(event);
    }

    pub(crate) fn added_commitment(&mut self, leaf_index: u64, commitment: Commitment) {
        self.commitments.push((leaf_index, commitment));
    }

    pub(crate) fn spent_nullifier(&mut self, nullifier: Nullifier) {
        self.nullifiers.push(nullifier);
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub(crate) fn commitments(&self) -> &[(u64, Commitment)] {
        &self.commitments
    }

    pub(crate) fn nullifiers(&self) -> &[Nullifier] {
        &self.nullifiers
    }

    pub(crate) fn into_events(self) -> Vec<PoolEvent> {
        self.events
    }

    /// Reverse every recorded mutation, newest first. Buffered events are
    /// dropped.
    pub(crate) fn rollback(self, state: &mut PoolState) {
        for op in self.ops.into_iter().rev() {
            match op {
                UndoOp::Accumulator(checkpoint) => state.accumulator.rollback_to(checkpoint),
                UndoOp::NullifierSpent(id) => state.nullifiers.unmark(&id),
                UndoOp::PendingInserted(initiator) => {
                    state.pending.remove(&initiator);
                }
                UndoOp::PendingRemoved(claim) => {
                    state.pending.insert(claim.initiator, claim);
                }
                UndoOp::Vault { currency, previous } => state.vault.restore(currency, previous),
                UndoOp::Ledger {
                    holder,
                    currency,
                    previous,
                } => state.ledger.restore(holder, currency, previous),
                UndoOp::Stats(previous) => state.stats = previous,
                UndoOp::Relayer {
                    relayer,
                    was_allowed,
                } => {
                    state.access.set_relayer(relayer, was_allowed);
                }
                UndoOp::Router {
                    router,
                    was_authorized,
                } => {
                    state.access.set_router(router, was_authorized);
                }
                UndoOp::MetaAddress { identity, previous } => {
                    state.stealth.restore(identity, previous)
                }
            }
        }
    }
}
