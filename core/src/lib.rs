//! Veilswap core: the privacy gate engine.
//!
//! Deposits land in a commitment accumulator. A claimant later proves
//! ownership of an unspent deposit (Groth16 membership proof or LSAG ring
//! signature), the engine burns the claim identifier, lets an external
//! exchange swap released pool value, and routes the output to the
//! recipient (optionally through a one-time stealth address) minus the
//! relayer fee. Both phases run in one atomic session.

pub mod config;
pub mod engine;
pub mod error;

pub use engine::events::{Announcement, PoolEvent};
pub use engine::execution::{
    ClaimPayload, PendingClaim, PoolStats, RingClaim, Settlement, SwapDelta, ZkClaim,
};
pub use engine::session::Session;
pub use engine::stealth::{
    Secp256k1StealthGenerator, StealthAddressGenerator, StealthKeys, StealthMetaAddress,
};
pub use engine::{EngineConfig, Exchange, PoolState, PrivacyEngine, SwapOrder, SwapReceipt};
pub use error::{GateError, GateResult};
