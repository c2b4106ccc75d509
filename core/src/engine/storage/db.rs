use anyhow::{Context, Result, bail};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use veilswap_account::{Address, Currency};
use veilswap_privacy::{Commitment, Nullifier};

use super::access::Allowlists;
use super::vault::LedgerEntry;
use crate::engine::PoolState;
use crate::engine::execution::claim::PoolStats;
use crate::engine::stealth::StealthMetaAddress;

const CF_COMMITMENTS: &str = "commitments";
const CF_NULLIFIERS: &str = "nullifiers";
const CF_POOL_META: &str = "pool_meta";

const SNAPSHOT_KEY: &[u8] = b"snapshot";

/// Everything besides the tree and the nullifier set, stored as one JSON
/// document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub stats: PoolStats,
    pub vault: Vec<(Currency, u128)>,
    pub ledger: Vec<LedgerEntry>,
    pub access: Allowlists,
    pub meta_addresses: Vec<(Address, StealthMetaAddress)>,
}

impl PoolSnapshot {
    pub fn capture(state: &PoolState) -> Self {
        Self {
            stats: state.stats,
            vault: state.vault.entries(),
            ledger: state.ledger.entries(),
            access: state.access.clone(),
            meta_addresses: state.stealth.iter().map(|(a, m)| (*a, *m)).collect(),
        }
    }
}

/// Batch of database operations for atomic commit
#[derive(Debug, Default)]
pub struct DbBatch {
    pub commitments: Vec<(u64, Commitment)>,
    pub nullifiers: Vec<Nullifier>,
    pub snapshot: Option<PoolSnapshot>,
}

/// RocksDB-backed pool storage.
#[derive(Clone)]
pub struct PoolStore {
    db: Arc<DB>,
}

impl PoolStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_COMMITMENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_NULLIFIERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_POOL_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn nullifier_exists(&self, nullifier: &Nullifier) -> Result<bool> {
        let cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;
        Ok(self.db.get_cf(cf, nullifier.as_bytes())?.is_some())
    }

    /// All commitments in leaf order. Keys are big-endian leaf indices, so
    /// iteration order is insertion order; gaps are rejected.
    pub fn get_all_commitments(&self) -> Result<Vec<Commitment>> {
        let cf = self
            .db
            .cf_handle(CF_COMMITMENTS)
            .context("commitments CF missing")?;

        let mut commitments = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let position = u64::from_be_bytes(
                key.as_ref()
                    .try_into()
                    .context("invalid position key length")?,
            );
            if position != commitments.len() as u64 {
                bail!(
                    "commitment store has a gap: expected leaf {}, found {}",
                    commitments.len(),
                    position
                );
            }
            let commitment: [u8; 32] = value
                .as_ref()
                .try_into()
                .context("invalid commitment length")?;
            commitments.push(Commitment(commitment));
        }

        Ok(commitments)
    }

    pub fn get_all_nullifiers(&self) -> Result<Vec<Nullifier>> {
        let cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;

        let mut nullifiers = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            let nullifier: [u8; 32] = key
                .as_ref()
                .try_into()
                .context("invalid nullifier length")?;
            nullifiers.push(Nullifier(nullifier));
        }

        Ok(nullifiers)
    }

    pub fn load_snapshot(&self) -> Result<Option<PoolSnapshot>> {
        let cf = self
            .db
            .cf_handle(CF_POOL_META)
            .context("pool_meta CF missing")?;

        match self.db.get_cf(cf, SNAPSHOT_KEY)? {
            Some(bytes) => {
                let snapshot =
                    serde_json::from_slice(&bytes).context("corrupt pool snapshot")?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Atomically apply a batch of operations
    pub fn apply_batch(&self, operations: DbBatch) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_commitments = self
            .db
            .cf_handle(CF_COMMITMENTS)
            .context("commitments CF missing")?;
        let cf_nullifiers = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;
        let cf_meta = self
            .db
            .cf_handle(CF_POOL_META)
            .context("pool_meta CF missing")?;

        for (position, commitment) in &operations.commitments {
            batch.put_cf(cf_commitments, position.to_be_bytes(), commitment.as_bytes());
        }

        for nullifier in &operations.nullifiers {
            batch.put_cf(cf_nullifiers, nullifier.as_bytes(), b"");
        }

        if let Some(snapshot) = &operations.snapshot {
            let bytes = serde_json::to_vec(snapshot)?;
            batch.put_cf(cf_meta, SNAPSHOT_KEY, bytes);
        }

        self.db.write(batch)?;
        Ok(())
    }
}
