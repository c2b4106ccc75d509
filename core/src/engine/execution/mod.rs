//! Claim execution: payload codec, verifiers, the two gate phases and the
//! undo journal.

pub mod claim;
pub mod gate;
pub mod journal;
pub mod payload;
pub mod verifier;

pub use claim::{ClaimKind, ClaimRecipient, FeeSplit, PendingClaim, PoolStats, split_fee};
pub use gate::{Settlement, SwapDelta};
pub use journal::Journal;
pub use payload::{ClaimPayload, RingClaim, ZkClaim};
pub use verifier::{
    ClaimContext, ClaimVerifier, RingSignatureVerifier, ZkMembershipVerifier, ring_message,
};
