//! Atomic session over the pool state.
//!
//! A `Session` is the only handle through which pool state changes. It is
//! created by [`PrivacyEngine::atomic`](super::PrivacyEngine::atomic) and
//! records an undo entry for every mutation, so the engine can discard the
//! whole session when any step fails.

use log::debug;

use veilswap_account::{Address, Currency};
use veilswap_privacy::{Commitment, SnarkVerifier, Word};

use super::events::{self, PoolEvent};
use super::execution::claim::PendingClaim;
use super::execution::journal::{Journal, UndoOp};
use super::stealth::{StealthAddressGenerator, StealthMetaAddress};
use super::storage::GateCapability;
use super::{EngineConfig, PoolState};
use crate::error::{GateError, GateResult};

pub struct Session<'a> {
    pub(crate) config: &'a EngineConfig,
    pub(crate) state: &'a mut PoolState,
    pub(crate) snark: &'a dyn SnarkVerifier,
    pub(crate) stealth: &'a mut dyn StealthAddressGenerator,
    pub(crate) journal: Journal,
    pub(crate) capability: GateCapability,
}

impl<'a> Session<'a> {
    pub(crate) fn new(
        config: &'a EngineConfig,
        state: &'a mut PoolState,
        snark: &'a dyn SnarkVerifier,
        stealth: &'a mut dyn StealthAddressGenerator,
    ) -> Self {
        Self {
            config,
            state,
            snark,
            stealth,
            journal: Journal::new(),
            capability: GateCapability::new(),
        }
    }

    pub(crate) fn finish(self) -> Journal {
        self.journal
    }

    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    pub fn state(&self) -> &PoolState {
        &*self.state
    }

    pub fn pending_claim(&self, initiator: &Address) -> Option<&PendingClaim> {
        self.state.pending.get(initiator)
    }

    // ========================================================================
    // Deposits
    // ========================================================================

    /// Insert a commitment and move `amount` from the depositor into the
    /// pool. Returns the leaf index and the new root.
    pub fn deposit(
        &mut self,
        depositor: Address,
        commitment: Commitment,
        currency: Currency,
        amount: u128,
    ) -> GateResult<(u64, Word)> {
        self.journal.record_accumulator(&*self.state);
        let (leaf_index, root) = self.state.accumulator.insert(commitment)?;
        self.journal.added_commitment(leaf_index, commitment);

        self.ledger_debit(depositor, currency, amount)?;
        self.vault_credit(currency, amount)?;

        self.journal.emit(PoolEvent::Deposit {
            commitment,
            leaf_index,
            currency,
            amount,
            timestamp: events::now(),
        });
        Ok((leaf_index, root))
    }

    // ========================================================================
    // Release gateway
    // ========================================================================

    pub fn release_for_swap(&mut self, caller: Address, amount: u128) -> GateResult<()> {
        self.release(caller, Currency::Native, amount)
    }

    pub fn release_token_for_swap(
        &mut self,
        caller: Address,
        token: Address,
        amount: u128,
    ) -> GateResult<()> {
        self.release(caller, Currency::Token(token), amount)
    }

    /// Move pool value to an authorized router. The router then owns it
    /// for the rest of the session.
    pub fn release(&mut self, caller: Address, currency: Currency, amount: u128) -> GateResult<()> {
        if !self.state.access.is_router(&caller) {
            return Err(GateError::Unauthorized(caller));
        }
        self.vault_debit(currency, amount)?;
        self.ledger_credit(caller, currency, amount)?;
        debug!("released {amount} {currency} to router {caller}");
        Ok(())
    }

    // ========================================================================
    // Ledger
    // ========================================================================

    /// Value entering from outside the pool, e.g. exchange liquidity.
    pub fn mint(
        &mut self,
        caller: Address,
        holder: Address,
        currency: Currency,
        amount: u128,
    ) -> GateResult<()> {
        self.require_admin(caller)?;
        self.ledger_credit(holder, currency, amount)
    }

    /// Test ledger funding, bypassing the admin check.
    #[cfg(test)]
    pub(crate) fn credit(
        &mut self,
        holder: Address,
        currency: Currency,
        amount: u128,
    ) -> GateResult<()> {
        self.ledger_credit(holder, currency, amount)
    }

    /// Exchange-side value movement. One side must be an authorized router
    /// or the gate account.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        currency: Currency,
        amount: u128,
    ) -> GateResult<()> {
        if !self.is_swap_party(&from) && !self.is_swap_party(&to) {
            return Err(GateError::Unauthorized(from));
        }
        self.ledger_debit(from, currency, amount)?;
        self.ledger_credit(to, currency, amount)
    }

    fn is_swap_party(&self, holder: &Address) -> bool {
        *holder == self.config.gate || self.state.access.is_router(holder)
    }

    // ========================================================================
    // Admin
    // ========================================================================

    pub fn set_relayer(
        &mut self,
        caller: Address,
        relayer: Address,
        allowed: bool,
    ) -> GateResult<()> {
        self.require_admin(caller)?;
        let was_allowed = self.state.access.set_relayer(relayer, allowed);
        self.journal.record(UndoOp::Relayer {
            relayer,
            was_allowed,
        });
        self.journal
            .emit(PoolEvent::RelayerUpdated { relayer, allowed });
        Ok(())
    }

    pub fn set_router(
        &mut self,
        caller: Address,
        router: Address,
        authorized: bool,
    ) -> GateResult<()> {
        self.require_admin(caller)?;
        let was_authorized = self.state.access.set_router(router, authorized);
        self.journal.record(UndoOp::Router {
            router,
            was_authorized,
        });
        self.journal
            .emit(PoolEvent::RouterUpdated { router, authorized });
        Ok(())
    }

    /// Publish the meta-address claims to `identity` are routed through.
    pub fn register_meta_address(&mut self, identity: Address, meta: &[u8]) -> GateResult<()> {
        let meta = StealthMetaAddress::from_bytes(meta)?;
        let previous = self.state.stealth.register(identity, meta);
        self.journal
            .record(UndoOp::MetaAddress { identity, previous });
        self.journal
            .emit(PoolEvent::MetaAddressRegistered { identity });
        Ok(())
    }

    /// Fails if any claim staged in this session was never settled.
    pub fn ensure_settled(&self) -> GateResult<()> {
        match self.state.pending.keys().next() {
            Some(initiator) => Err(GateError::ClaimNotSettled(*initiator)),
            None => Ok(()),
        }
    }

    fn require_admin(&self, caller: Address) -> GateResult<()> {
        if caller != self.config.admin {
            return Err(GateError::Unauthorized(caller));
        }
        Ok(())
    }

    // ========================================================================
    // Journaled balance changes
    // ========================================================================

    pub(crate) fn vault_credit(&mut self, currency: Currency, amount: u128) -> GateResult<()> {
        let previous = self.state.vault.balance(&currency);
        self.journal.record(UndoOp::Vault { currency, previous });
        self.state.vault.credit(currency, amount)
    }

    pub(crate) fn vault_debit(&mut self, currency: Currency, amount: u128) -> GateResult<()> {
        let previous = self.state.vault.balance(&currency);
        self.journal.record(UndoOp::Vault { currency, previous });
        self.state.vault.debit(currency, amount)
    }

    pub(crate) fn ledger_credit(
        &mut self,
        holder: Address,
        currency: Currency,
        amount: u128,
    ) -> GateResult<()> {
        let previous = self.state.ledger.balance_of(&holder, &currency);
        self.journal.record(UndoOp::Ledger {
            holder,
            currency,
            previous,
        });
        self.state.ledger.credit(holder, currency, amount)
    }

    pub(crate) fn ledger_debit(
        &mut self,
        holder: Address,
        currency: Currency,
        amount: u128,
    ) -> GateResult<()> {
        let previous = self.state.ledger.balance_of(&holder, &currency);
        self.journal.record(UndoOp::Ledger {
            holder,
            currency,
            previous,
        });
        self.state.ledger.debit(holder, currency, amount)
    }
}
