//! Groth16 Membership Proofs (BN254)
//!
//! Proofs arrive in the EVM precompile layout: every coordinate is a 32-byte
//! big-endian word and G2 coordinates are ordered `[imaginary, real]`.
//!
//! ```text
//! a = [x, y]                      (G1)
//! b = [[x.im, x.re], [y.im, y.re]] (G2)
//! c = [x, y]                      (G1)
//! ```
//!
//! Public signals, in circuit order:
//!
//! ```text
//! [0] commitment     [4] recipient
//! [1] nullifier      [5] relayer
//! [2] merkle root    [6] relayer fee (bps)
//! [3] nullifier hash [7] claimed output amount
//! ```

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::Zero;
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use std::path::Path;

use crate::error::PrivacyError;
use crate::field::{Word, fr_from_word, prime_from_word, prime_to_word};

pub const PUBLIC_SIGNAL_COUNT: usize = 8;

pub type PublicSignals = [Word; PUBLIC_SIGNAL_COUNT];

/// Proof in EVM word layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Groth16Proof {
    pub a: [Word; 2],
    pub b: [[Word; 2]; 2],
    pub c: [Word; 2],
}

impl Groth16Proof {
    /// Encode from an arkworks proof
    pub fn from_ark(proof: &Proof<Bn254>) -> Self {
        let (ax, ay) = g1_words(&proof.a);
        let (cx, cy) = g1_words(&proof.c);
        let b = if proof.b.infinity {
            [[[0u8; 32]; 2]; 2]
        } else {
            [
                [prime_to_word(&proof.b.x.c1), prime_to_word(&proof.b.x.c0)],
                [prime_to_word(&proof.b.y.c1), prime_to_word(&proof.b.y.c0)],
            ]
        };
        Self {
            a: [ax, ay],
            b,
            c: [cx, cy],
        }
    }

    /// Decode into an arkworks proof, checking every point.
    pub fn to_ark(&self) -> Result<Proof<Bn254>, PrivacyError> {
        Ok(Proof {
            a: g1_from_words(&self.a)?,
            b: g2_from_words(&self.b)?,
            c: g1_from_words(&self.c)?,
        })
    }

    /// a.x, a.y, b[0][0], b[0][1], b[1][0], b[1][1], c.x, c.y
    pub fn to_words(&self) -> [Word; 8] {
        [
            self.a[0], self.a[1], self.b[0][0], self.b[0][1], self.b[1][0], self.b[1][1],
            self.c[0], self.c[1],
        ]
    }

    pub fn from_words(words: &[Word; 8]) -> Self {
        Self {
            a: [words[0], words[1]],
            b: [[words[2], words[3]], [words[4], words[5]]],
            c: [words[6], words[7]],
        }
    }
}

/// Pairing check over a proof and its public signals
pub trait SnarkVerifier: Send + Sync {
    /// `Ok(false)` when the pairing equation fails. Errors for malformed
    /// points or out-of-range signals.
    fn verify(&self, proof: &Groth16Proof, signals: &PublicSignals) -> Result<bool, PrivacyError>;

    /// Hash of the verifying key, used to pin deployments
    fn verification_key_hash(&self) -> [u8; 32];
}

// ============================================================================
// Mock Verifier (Development)
// ============================================================================

/// Verifier with a fixed verdict, for development and tests
pub struct MockVerifier {
    accept: bool,
    vk_hash: [u8; 32],
}

impl MockVerifier {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            vk_hash: *blake3::hash(b"veilswap-mock-vk-v1").as_bytes(),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            ..Self::accepting()
        }
    }
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self::accepting()
    }
}

impl SnarkVerifier for MockVerifier {
    fn verify(
        &self,
        _proof: &Groth16Proof,
        _signals: &PublicSignals,
    ) -> Result<bool, PrivacyError> {
        Ok(self.accept)
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        self.vk_hash
    }
}

// ============================================================================
// Groth16 Verifier (arkworks)
// ============================================================================

/// Groth16 verifier over BN254 with a prepared verifying key
pub struct Groth16Verifier {
    verifying_key: VerifyingKey<Bn254>,
    prepared: PreparedVerifyingKey<Bn254>,
    vk_hash: [u8; 32],
}

impl Groth16Verifier {
    pub fn new(verifying_key: VerifyingKey<Bn254>) -> Result<Self, PrivacyError> {
        let ic_points = verifying_key.gamma_abc_g1.len();
        if ic_points != PUBLIC_SIGNAL_COUNT + 1 {
            return Err(PrivacyError::InvalidVerifyingKey(format!(
                "expected {} IC points, got {}",
                PUBLIC_SIGNAL_COUNT + 1,
                ic_points
            )));
        }

        let prepared = <Groth16<Bn254> as SNARK<Fr>>::process_vk(&verifying_key)
            .map_err(|e| PrivacyError::InvalidVerifyingKey(e.to_string()))?;
        let vk_hash = Self::compute_vk_hash(&verifying_key)?;

        Ok(Self {
            verifying_key,
            prepared,
            vk_hash,
        })
    }

    /// Load from compressed arkworks bytes
    pub fn from_bytes(vk_bytes: &[u8]) -> Result<Self, PrivacyError> {
        let verifying_key = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes)
            .map_err(|e| PrivacyError::InvalidVerifyingKey(e.to_string()))?;
        Self::new(verifying_key)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PrivacyError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            PrivacyError::InvalidVerifyingKey(format!("{}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }

    fn compute_vk_hash(vk: &VerifyingKey<Bn254>) -> Result<[u8; 32], PrivacyError> {
        let mut vk_bytes = Vec::new();
        vk.serialize_compressed(&mut vk_bytes)
            .map_err(|e| PrivacyError::InvalidVerifyingKey(e.to_string()))?;
        Ok(*blake3::hash(&vk_bytes).as_bytes())
    }
}

impl SnarkVerifier for Groth16Verifier {
    fn verify(&self, proof: &Groth16Proof, signals: &PublicSignals) -> Result<bool, PrivacyError> {
        let inputs = signals
            .iter()
            .map(fr_from_word)
            .collect::<Result<Vec<_>, _>>()?;
        let proof = proof.to_ark()?;

        <Groth16<Bn254> as SNARK<Fr>>::verify_with_processed_vk(&self.prepared, &inputs, &proof)
            .map_err(|_| PrivacyError::InvalidProof)
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        self.vk_hash
    }
}

// ============================================================================
// Point encoding
// ============================================================================

fn fq_from_word(word: &Word) -> Result<Fq, PrivacyError> {
    prime_from_word(word).ok_or(PrivacyError::InvalidProof)
}

fn g1_words(p: &G1Affine) -> (Word, Word) {
    if p.infinity {
        ([0u8; 32], [0u8; 32])
    } else {
        (prime_to_word(&p.x), prime_to_word(&p.y))
    }
}

fn g1_from_words(words: &[Word; 2]) -> Result<G1Affine, PrivacyError> {
    let x = fq_from_word(&words[0])?;
    let y = fq_from_word(&words[1])?;
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    let p = G1Affine::new_unchecked(x, y);
    if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrivacyError::InvalidProof);
    }
    Ok(p)
}

fn g2_from_words(words: &[[Word; 2]; 2]) -> Result<G2Affine, PrivacyError> {
    let x = Fq2::new(fq_from_word(&words[0][1])?, fq_from_word(&words[0][0])?);
    let y = Fq2::new(fq_from_word(&words[1][1])?, fq_from_word(&words[1][0])?);
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }
    let p = G2Affine::new_unchecked(x, y);
    if !p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve() {
        return Err(PrivacyError::InvalidProof);
    }
    Ok(p)
}
