//! Veilswap Privacy SDK
//!
//! Primitives behind the privacy gate: deposit commitments, the
//! commitment accumulator, claim nullifiers, and the two claim proofs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Private Claim                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifier   │  │  Merkle root │  │   Claim proof         │ │
//! │  │  (single use)│  │  (recent)    │  │   Groth16 | LSAG ring │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │  Accumulator: depth-20 Poseidon tree, 30 recent roots   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod error;
pub mod field;
pub mod groth16;
pub mod merkle;
pub mod nullifier;
pub mod poseidon;
pub mod ring;

pub use commitment::{Commitment, CommitmentScheme};
pub use error::PrivacyError;
pub use field::Word;
pub use groth16::{
    Groth16Proof, Groth16Verifier, MockVerifier, PUBLIC_SIGNAL_COUNT, PublicSignals, SnarkVerifier,
};
pub use merkle::{
    IncrementalMerkleTree, MerkleHasher, MerklePath, ROOT_HISTORY_SIZE, RootHistory, TREE_DEPTH,
    TreeFrontier,
};
pub use nullifier::{Nullifier, NullifierKey};
pub use ring::{KeyImage, RingKeypair, RingPublicKey, RingSignature, RingSigner};
