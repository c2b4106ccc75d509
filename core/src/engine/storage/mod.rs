pub mod access;
pub mod accumulator;
pub mod db;
pub mod nullifiers;
pub mod vault;

pub use access::Allowlists;
pub use accumulator::{AccumulatorCheckpoint, CommitmentAccumulator};
pub use db::{DbBatch, PoolSnapshot, PoolStore};
pub use nullifiers::{GateCapability, NullifierRegistry};
pub use vault::{Ledger, LedgerEntry, Vault};
