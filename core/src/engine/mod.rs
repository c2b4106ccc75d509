//! Privacy Engine
//!
//! Owns all pool state and runs every mutation inside an atomic session.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        PrivacyEngine::atomic                     │
//! │                                                                  │
//! │  deposit ──► Accumulator ──► RootHistory                         │
//! │                                                                  │
//! │  private_swap:                                                   │
//! │    before_swap ──► verify claim ──► burn nullifier ──► pending   │
//! │    release     ──► Vault ──► router                              │
//! │    exchange    ──► output credited to the gate account           │
//! │    after_swap  ──► fee split ──► stealth / direct payout         │
//! │                                                                  │
//! │  Ok  ─► flush events, write RocksDB batch                        │
//! │  Err ─► unwind journal, drop events                              │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod events;
pub mod execution;
pub mod session;
pub mod stealth;
pub mod storage;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::Path;

use veilswap_account::{Address, Currency};
use veilswap_config::{DEFAULT_MAX_RELAYER_FEE_BPS, DEFAULT_SCHEME_ID};
use veilswap_privacy::{
    Commitment, MerkleHasher, Nullifier, ROOT_HISTORY_SIZE, SnarkVerifier, Word,
};

use crate::error::{GateError, GateResult};
use events::PoolEvent;
use execution::claim::{PendingClaim, PoolStats};
use execution::gate::{Settlement, SwapDelta};
use session::Session;
use stealth::{StealthAddressGenerator, StealthRegistry};
use storage::{
    Allowlists, CommitmentAccumulator, DbBatch, Ledger, NullifierRegistry, PoolSnapshot,
    PoolStore, Vault,
};

// ============================================================================
// Configuration
// ============================================================================

/// Fixed at construction. The gate account and admin never change.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub admin: Address,
    /// Account the exchange pays output into for settlement
    pub gate: Address,
    pub root_history_size: usize,
    pub max_relayer_fee_bps: u16,
    pub scheme_id: u64,
    pub relayers: Vec<Address>,
    pub routers: Vec<Address>,
}

impl EngineConfig {
    pub fn new(admin: Address, gate: Address) -> Self {
        Self {
            admin,
            gate,
            root_history_size: ROOT_HISTORY_SIZE,
            max_relayer_fee_bps: DEFAULT_MAX_RELAYER_FEE_BPS,
            scheme_id: DEFAULT_SCHEME_ID,
            relayers: Vec::new(),
            routers: Vec::new(),
        }
    }
}

// ============================================================================
// Pool State
// ============================================================================

pub struct PoolState {
    pub(crate) accumulator: CommitmentAccumulator,
    pub(crate) nullifiers: NullifierRegistry,
    pub(crate) vault: Vault,
    pub(crate) ledger: Ledger,
    pub(crate) access: Allowlists,
    pub(crate) stealth: StealthRegistry,
    pub(crate) pending: HashMap<Address, PendingClaim>,
    pub(crate) stats: PoolStats,
}

impl PoolState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            accumulator: CommitmentAccumulator::new(config.root_history_size),
            nullifiers: NullifierRegistry::new(),
            vault: Vault::default(),
            ledger: Ledger::default(),
            access: Allowlists::new(
                config.relayers.iter().copied(),
                config.routers.iter().copied(),
            ),
            stealth: StealthRegistry::default(),
            pending: HashMap::new(),
            stats: PoolStats::default(),
        }
    }

    /// Rebuild from disk. The tree and root window are replayed from the
    /// stored commitments; allowlists come from the snapshot once one exists.
    pub fn load(config: &EngineConfig, store: &PoolStore) -> Result<Self> {
        let commitments = store.get_all_commitments()?;
        let accumulator = CommitmentAccumulator::replay(
            MerkleHasher::new(),
            config.root_history_size,
            commitments,
        )
        .context("replaying stored commitments")?;
        let nullifiers = NullifierRegistry::from_spent(store.get_all_nullifiers()?);

        let mut state = Self {
            accumulator,
            nullifiers,
            ..Self::new(config)
        };
        if let Some(snapshot) = store.load_snapshot()? {
            state.stats = snapshot.stats;
            state.vault = Vault::from_entries(snapshot.vault);
            state.ledger = Ledger::from_entries(snapshot.ledger);
            state.access = snapshot.access;
            state.stealth = snapshot.meta_addresses.into_iter().collect();
        }
        Ok(state)
    }

    pub fn accumulator(&self) -> &CommitmentAccumulator {
        &self.accumulator
    }

    pub fn nullifiers(&self) -> &NullifierRegistry {
        &self.nullifiers
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn access(&self) -> &Allowlists {
        &self.access
    }

    pub fn stealth_registry(&self) -> &StealthRegistry {
        &self.stealth
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

// ============================================================================
// Exchange collaborator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapOrder {
    pub input: Currency,
    pub output: Currency,
    pub amount_in: u128,
}

/// External swap engine. Runs inside the caller's session: it receives the
/// released input at `router` and must credit the output to the gate
/// account before reporting it.
pub trait Exchange {
    fn execute(
        &mut self,
        session: &mut Session<'_>,
        router: Address,
        order: &SwapOrder,
    ) -> GateResult<SwapDelta>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReceipt {
    pub nullifier: Option<Nullifier>,
    pub delta: SwapDelta,
    pub settlement: Option<Settlement>,
}

// ============================================================================
// Engine
// ============================================================================

pub struct PrivacyEngine {
    config: EngineConfig,
    state: PoolState,
    snark: Box<dyn SnarkVerifier>,
    stealth: Box<dyn StealthAddressGenerator>,
    store: Option<PoolStore>,
    events: Vec<PoolEvent>,
}

impl PrivacyEngine {
    /// In-memory engine.
    pub fn new(
        config: EngineConfig,
        snark: Box<dyn SnarkVerifier>,
        stealth: Box<dyn StealthAddressGenerator>,
    ) -> Self {
        let state = PoolState::new(&config);
        Self {
            config,
            state,
            snark,
            stealth,
            store: None,
            events: Vec::new(),
        }
    }

    /// Engine persisted in RocksDB at `path`, restored from it if present.
    pub fn open<P: AsRef<Path>>(
        config: EngineConfig,
        path: P,
        snark: Box<dyn SnarkVerifier>,
        stealth: Box<dyn StealthAddressGenerator>,
    ) -> Result<Self> {
        let store = PoolStore::open(path)?;
        let state = PoolState::load(&config, &store)?;
        info!(
            "pool opened: {} deposits, {} spent identifiers",
            state.accumulator.deposit_count(),
            state.nullifiers.len()
        );
        Ok(Self {
            config,
            state,
            snark,
            stealth,
            store: Some(store),
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    /// Run `f` as one all-or-nothing operation.
    ///
    /// On error every mutation made through the session is reversed and its
    /// events are dropped. A session that leaves a claim pending, or whose
    /// batch cannot be written, is rolled back as well.
    pub fn atomic<T, F>(&mut self, f: F) -> GateResult<T>
    where
        F: FnOnce(&mut Session<'_>) -> GateResult<T>,
    {
        let (result, journal) = {
            let mut session = Session::new(
                &self.config,
                &mut self.state,
                self.snark.as_ref(),
                self.stealth.as_mut(),
            );
            let result = f(&mut session).and_then(|value| session.ensure_settled().map(|()| value));
            (result, session.finish())
        };

        let value = match result {
            Ok(value) => value,
            Err(e) => {
                warn!("session rolled back ({} undo records): {e}", journal.len());
                journal.rollback(&mut self.state);
                return Err(e);
            }
        };

        if let Some(store) = &self.store {
            if !journal.is_empty() {
                let batch = DbBatch {
                    commitments: journal.commitments().to_vec(),
                    nullifiers: journal.nullifiers().to_vec(),
                    snapshot: Some(PoolSnapshot::capture(&self.state)),
                };
                if let Err(e) = store.apply_batch(batch) {
                    warn!("session rolled back, write failed: {e:#}");
                    journal.rollback(&mut self.state);
                    return Err(GateError::Storage(format!("{e:#}")));
                }
            }
        }

        let events = journal.into_events();
        for event in &events {
            match serde_json::to_string(event) {
                Ok(json) => debug!("event {}: {json}", event.name()),
                Err(e) => warn!("event {} not serialisable: {e}", event.name()),
            }
        }
        info!("session committed ({} events)", events.len());
        self.events.extend(events);
        Ok(value)
    }

    /// Phase 1, release, exchange and phase 2 as a single atomic operation.
    ///
    /// Pass-through swaps (empty payload) pay the output to the initiator.
    pub fn private_swap(
        &mut self,
        router: Address,
        initiator: Address,
        payload: &[u8],
        order: &SwapOrder,
        exchange: &mut dyn Exchange,
    ) -> GateResult<SwapReceipt> {
        self.atomic(|session| {
            let nullifier = session.before_swap(initiator, payload)?;
            session.release(router, order.input, order.amount_in)?;
            let delta = exchange.execute(session, router, order)?;
            let settlement = session.after_swap(initiator, payload, &delta)?;

            if settlement.is_none() && delta.amount > 0 {
                let gate = session.config().gate;
                session.transfer(gate, initiator, delta.currency, delta.amount as u128)?;
            }
            Ok(SwapReceipt {
                nullifier,
                delta,
                settlement,
            })
        })
    }

    // ========================================================================
    // Single-step operations
    // ========================================================================

    pub fn deposit(
        &mut self,
        depositor: Address,
        commitment: Commitment,
        currency: Currency,
        amount: u128,
    ) -> GateResult<(u64, Word)> {
        self.atomic(|s| s.deposit(depositor, commitment, currency, amount))
    }

    pub fn mint(
        &mut self,
        caller: Address,
        holder: Address,
        currency: Currency,
        amount: u128,
    ) -> GateResult<()> {
        self.atomic(|s| s.mint(caller, holder, currency, amount))
    }

    #[cfg(test)]
    pub(crate) fn credit(
        &mut self,
        holder: Address,
        currency: Currency,
        amount: u128,
    ) -> GateResult<()> {
        self.atomic(|s| s.credit(holder, currency, amount))
    }

    pub fn set_relayer(
        &mut self,
        caller: Address,
        relayer: Address,
        allowed: bool,
    ) -> GateResult<()> {
        self.atomic(|s| s.set_relayer(caller, relayer, allowed))
    }

    pub fn set_router(
        &mut self,
        caller: Address,
        router: Address,
        authorized: bool,
    ) -> GateResult<()> {
        self.atomic(|s| s.set_router(caller, router, authorized))
    }

    pub fn register_meta_address(&mut self, identity: Address, meta: &[u8]) -> GateResult<()> {
        self.atomic(|s| s.register_meta_address(identity, meta))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_known_root(&self, root: &Word) -> bool {
        self.state.accumulator.is_known_root(root)
    }

    pub fn is_spent(&self, id: &Nullifier) -> bool {
        self.state.nullifiers.is_spent(id)
    }

    pub fn is_commitment_exists(&self, commitment: &Commitment) -> bool {
        self.state.accumulator.contains(commitment)
    }

    pub fn deposit_count(&self) -> u64 {
        self.state.accumulator.deposit_count()
    }

    pub fn stats(&self) -> PoolStats {
        self.state.stats
    }

    pub fn current_root(&self) -> Word {
        self.state.accumulator.root()
    }

    pub fn pool_balance(&self, currency: &Currency) -> u128 {
        self.state.vault.balance(currency)
    }

    pub fn balance_of(&self, holder: &Address, currency: &Currency) -> u128 {
        self.state.ledger.balance_of(holder, currency)
    }

    pub fn pending_claim(&self, initiator: &Address) -> Option<&PendingClaim> {
        self.state.pending.get(initiator)
    }

    pub fn is_relayer(&self, relayer: &Address) -> bool {
        self.state.access.is_relayer(relayer)
    }

    pub fn is_router(&self, router: &Address) -> bool {
        self.state.access.is_router(router)
    }

    pub fn verification_key_hash(&self) -> [u8; 32] {
        self.snark.verification_key_hash()
    }

    /// Drain the events of committed sessions.
    pub fn take_events(&mut self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.events)
    }
}
