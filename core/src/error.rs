use thiserror::Error;
use veilswap_account::Address;
use veilswap_privacy::PrivacyError;

/// Rejection reasons for pool operations. Any error aborts the whole
/// atomic session it was raised in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error(transparent)]
    Privacy(#[from] PrivacyError),

    // --- authorization ---
    #[error("caller {0} is not authorized")]
    Unauthorized(Address),

    #[error("relayer {0} is not allowlisted")]
    UnauthorizedRelayer(Address),

    // --- replay / consistency ---
    #[error("merkle root is not in the recent history")]
    InvalidMerkleRoot,

    #[error("nullifier already used")]
    NullifierAlreadyUsed,

    #[error("claim already pending for {0}")]
    ClaimAlreadyPending(Address),

    #[error("no pending claim for {0}")]
    ClaimNotInitialized(Address),

    #[error("claim for {0} was not settled before commit")]
    ClaimNotSettled(Address),

    // --- cryptographic ---
    #[error("zk proof rejected")]
    InvalidProof,

    #[error("ring signature rejected")]
    InvalidRingSignature,

    #[error("ring member {0} has no deposit")]
    RingMemberNotDeposited(String),

    // --- policy / input ---
    #[error("relayer fee {fee_bps} bps exceeds maximum {max_bps} bps")]
    InvalidRelayerFee { fee_bps: u128, max_bps: u16 },

    #[error("recipient must be non-zero")]
    InvalidRecipient,

    #[error("invalid stealth meta-address: {0}")]
    InvalidStealthMetaAddress(String),

    #[error("malformed claim payload: {0}")]
    MalformedPayload(String),

    // --- value movement ---
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("balance overflow")]
    BalanceOverflow,

    #[error("exchange reported negative output {0}")]
    InvalidSwapDelta(i128),

    #[error("output {output} below claimed minimum {claimed}")]
    OutputBelowClaim { output: u128, claimed: u128 },

    #[error("exchange failed: {0}")]
    Exchange(String),

    #[error("storage: {0}")]
    Storage(String),
}

pub type GateResult<T> = Result<T, GateError>;
