use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrivacyError {
    #[error("commitment must be non-zero")]
    InvalidCommitment,

    #[error("value is not a canonical field element")]
    OutOfFieldRange,

    #[error("commitment already inserted")]
    DuplicateCommitment,

    #[error("merkle tree is full ({capacity} leaves)")]
    CapacityExceeded { capacity: u64 },

    #[error("identifier already used")]
    AlreadyUsed,

    #[error("ring size {0} outside [2, 10]")]
    InvalidRingSize(usize),

    #[error("signature length {got} does not match ring (expected {expected})")]
    InvalidSignatureLength { expected: usize, got: usize },

    #[error("ring signature does not close")]
    InvalidRingSignature,

    #[error("invalid curve point encoding")]
    InvalidPoint,

    #[error("groth16 proof rejected")]
    InvalidProof,

    #[error("invalid verifying key: {0}")]
    InvalidVerifyingKey(String),
}
