//! Linkable Ring Signatures (LSAG)
//!
//! A ring claim proves that the signer controls one of `n` public keys
//! without revealing which. The key image `I = x · Hp(P)` is deterministic
//! per key, so the same deposit cannot be claimed twice.
//!
//! ```text
//! signature = c0 (32) || r_0 (32) || ... || r_{n-1} (32)
//!
//! for i in 0..n:
//!     L_i     = r_i · G     + c_i · P_i
//!     R_i     = r_i · Hp(P_i) + c_i · I
//!     c_{i+1} = H(domain || m || L_i || R_i)
//! valid  <=>  c_n == c0
//! ```
//!
//! Points are Jubjub (ed-on-bls12-381) in 32-byte compressed form, scalars
//! are 32-byte little-endian canonical encodings.

use ark_bn254::Fr as PoolField;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bls12_381::{EdwardsAffine, EdwardsProjective, Fr as RingScalar};
use ark_ff::{PrimeField, UniformRand};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::Zero;
use ark_std::rand::Rng;
use sha2::{Digest, Sha256, Sha512};

use crate::commitment::Commitment;
use crate::error::PrivacyError;

pub const MIN_RING_SIZE: usize = 2;
pub const MAX_RING_SIZE: usize = 10;

const CHALLENGE_DOMAIN: &[u8] = b"veilswap.lsag.challenge";
const HASH_TO_POINT_DOMAIN: &[u8] = b"veilswap.lsag.hp";
const MEMBER_DOMAIN: &[u8] = b"veilswap.ring.member";

/// Compressed public key
pub type RingPublicKey = [u8; 32];
/// Compressed key image
pub type KeyImage = [u8; 32];

/// Expected signature length for a ring of `n` members
pub fn signature_len(ring_size: usize) -> usize {
    32 + 32 * ring_size
}

/// Reject rings outside the supported size and signatures of the wrong length.
pub fn check_shape(ring_size: usize, signature_len_got: usize) -> Result<(), PrivacyError> {
    if !(MIN_RING_SIZE..=MAX_RING_SIZE).contains(&ring_size) {
        return Err(PrivacyError::InvalidRingSize(ring_size));
    }
    let expected = signature_len(ring_size);
    if signature_len_got != expected {
        return Err(PrivacyError::InvalidSignatureLength {
            expected,
            got: signature_len_got,
        });
    }
    Ok(())
}

/// Deposit commitment a ring key is registered under.
///
/// `SHA-256(domain || pubkey)` reduced into the BN254 field.
pub fn member_commitment(public_key: &RingPublicKey) -> Commitment {
    let mut hasher = Sha256::new();
    hasher.update(MEMBER_DOMAIN);
    hasher.update(public_key);
    let digest = hasher.finalize();
    Commitment::from_field(PoolField::from_be_bytes_mod_order(&digest))
}

/// Verify an LSAG signature over `message`.
///
/// Shape problems and undecodable points are errors; a well-formed signature
/// that does not close returns `Ok(false)`.
pub fn verify(
    message: &[u8],
    signature: &[u8],
    key_image: &KeyImage,
    ring: &[RingPublicKey],
) -> Result<bool, PrivacyError> {
    check_shape(ring.len(), signature.len())?;

    let c0 = decode_scalar(&signature[..32])?;
    let responses = signature[32..]
        .chunks(32)
        .map(decode_scalar)
        .collect::<Result<Vec<_>, _>>()?;

    let image = decode_point(key_image)?;
    if image.is_zero() {
        return Err(PrivacyError::InvalidPoint);
    }
    let members = ring
        .iter()
        .map(decode_point)
        .collect::<Result<Vec<_>, _>>()?;

    let g = EdwardsAffine::generator().into_group();
    let mut c = c0;
    for ((key, member), r) in ring.iter().zip(members.iter()).zip(responses.iter()) {
        let hp = hash_to_point(key)?;
        let l = g * r + *member * c;
        let rr = hp * r + image * c;
        c = challenge(message, &l, &rr)?;
    }

    Ok(c == c0)
}

/// Ring key pair
#[derive(Clone)]
pub struct RingKeypair {
    secret: RingScalar,
    public: RingPublicKey,
}

impl RingKeypair {
    pub fn generate<R: Rng>(rng: &mut R) -> Result<Self, PrivacyError> {
        let secret = RingScalar::rand(rng);
        Self::from_secret(secret)
    }

    fn from_secret(secret: RingScalar) -> Result<Self, PrivacyError> {
        let point = EdwardsAffine::generator().into_group() * secret;
        Ok(Self {
            secret,
            public: encode_point(&point)?,
        })
    }

    pub fn public_key(&self) -> RingPublicKey {
        self.public
    }

    /// I = x · Hp(P)
    pub fn key_image(&self) -> Result<KeyImage, PrivacyError> {
        let hp = hash_to_point(&self.public)?;
        encode_point(&(hp * self.secret))
    }
}

/// Output of [`RingSigner::sign`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingSignature {
    pub signature: Vec<u8>,
    pub key_image: KeyImage,
}

/// Client-side LSAG signer.
pub struct RingSigner;

impl RingSigner {
    /// Sign `message` as member `index` of `ring`.
    pub fn sign<R: Rng>(
        keypair: &RingKeypair,
        ring: &[RingPublicKey],
        index: usize,
        message: &[u8],
        rng: &mut R,
    ) -> Result<RingSignature, PrivacyError> {
        let n = ring.len();
        check_shape(n, signature_len(n))?;
        if index >= n || ring[index] != keypair.public {
            return Err(PrivacyError::InvalidRingSignature);
        }

        let members = ring
            .iter()
            .map(decode_point)
            .collect::<Result<Vec<_>, _>>()?;
        let hps = ring
            .iter()
            .map(hash_to_point)
            .collect::<Result<Vec<_>, _>>()?;

        let g = EdwardsAffine::generator().into_group();
        let image = hps[index] * keypair.secret;

        let mut challenges = vec![RingScalar::zero(); n];
        let mut responses = vec![RingScalar::zero(); n];

        let alpha = RingScalar::rand(rng);
        let mut c = challenge(message, &(g * alpha), &(hps[index] * alpha))?;

        let mut i = (index + 1) % n;
        while i != index {
            challenges[i] = c;
            responses[i] = RingScalar::rand(rng);
            let l = g * responses[i] + members[i] * c;
            let r = hps[i] * responses[i] + image * c;
            c = challenge(message, &l, &r)?;
            i = (i + 1) % n;
        }
        challenges[index] = c;
        responses[index] = alpha - c * keypair.secret;

        let mut signature = Vec::with_capacity(signature_len(n));
        signature.extend_from_slice(&encode_scalar(&challenges[0])?);
        for r in &responses {
            signature.extend_from_slice(&encode_scalar(r)?);
        }

        Ok(RingSignature {
            signature,
            key_image: encode_point(&image)?,
        })
    }
}

// ============================================================================
// Encoding helpers
// ============================================================================

fn decode_point(bytes: &[u8; 32]) -> Result<EdwardsProjective, PrivacyError> {
    EdwardsAffine::deserialize_compressed(&bytes[..])
        .map(|p| p.into_group())
        .map_err(|_| PrivacyError::InvalidPoint)
}

fn encode_point(point: &EdwardsProjective) -> Result<[u8; 32], PrivacyError> {
    let mut out = [0u8; 32];
    point
        .into_affine()
        .serialize_compressed(&mut out[..])
        .map_err(|_| PrivacyError::InvalidPoint)?;
    Ok(out)
}

fn decode_scalar(bytes: &[u8]) -> Result<RingScalar, PrivacyError> {
    RingScalar::deserialize_compressed(bytes).map_err(|_| PrivacyError::InvalidRingSignature)
}

fn encode_scalar(scalar: &RingScalar) -> Result<[u8; 32], PrivacyError> {
    let mut out = [0u8; 32];
    scalar
        .serialize_compressed(&mut out[..])
        .map_err(|_| PrivacyError::InvalidRingSignature)?;
    Ok(out)
}

/// Try-and-increment hash onto the prime-order subgroup.
fn hash_to_point(public_key: &RingPublicKey) -> Result<EdwardsProjective, PrivacyError> {
    for counter in 0u8..=255 {
        let mut hasher = Sha256::new();
        hasher.update(HASH_TO_POINT_DOMAIN);
        hasher.update(public_key);
        hasher.update([counter]);
        let digest = hasher.finalize();

        if let Some(candidate) = EdwardsAffine::from_random_bytes(&digest) {
            let point = candidate.clear_cofactor().into_group();
            if !point.is_zero() {
                return Ok(point);
            }
        }
    }
    Err(PrivacyError::InvalidPoint)
}

fn challenge(
    message: &[u8],
    l: &EdwardsProjective,
    r: &EdwardsProjective,
) -> Result<RingScalar, PrivacyError> {
    let mut hasher = Sha512::new();
    hasher.update(CHALLENGE_DOMAIN);
    hasher.update(message);
    hasher.update(encode_point(l)?);
    hasher.update(encode_point(r)?);
    Ok(RingScalar::from_le_bytes_mod_order(&hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{SeedableRng, rngs::StdRng};

    fn ring_of(n: usize, rng: &mut StdRng) -> Vec<RingKeypair> {
        (0..n).map(|_| RingKeypair::generate(rng).unwrap()).collect()
    }

    #[test]
    fn test_sign_and_verify_all_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        for n in MIN_RING_SIZE..=MAX_RING_SIZE {
            let keys = ring_of(n, &mut rng);
            let ring: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
            let signer = n / 2;
            let sig = RingSigner::sign(&keys[signer], &ring, signer, b"msg", &mut rng).unwrap();

            assert_eq!(sig.signature.len(), signature_len(n));
            assert_eq!(sig.key_image, keys[signer].key_image().unwrap());
            assert!(verify(b"msg", &sig.signature, &sig.key_image, &ring).unwrap());
        }
    }

    #[test]
    fn test_wrong_message_fails() {
        let mut rng = StdRng::seed_from_u64(8);
        let keys = ring_of(3, &mut rng);
        let ring: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let sig = RingSigner::sign(&keys[0], &ring, 0, b"msg", &mut rng).unwrap();

        assert!(!verify(b"other", &sig.signature, &sig.key_image, &ring).unwrap());
    }

    #[test]
    fn test_key_image_is_linkable() {
        let mut rng = StdRng::seed_from_u64(9);
        let keys = ring_of(4, &mut rng);
        let ring: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let a = RingSigner::sign(&keys[2], &ring, 2, b"one", &mut rng).unwrap();
        let b = RingSigner::sign(&keys[2], &ring[..3], 2, b"two", &mut rng).unwrap();
        assert_eq!(a.key_image, b.key_image);
    }

    #[test]
    fn test_tampered_response_fails() {
        let mut rng = StdRng::seed_from_u64(14);
        let keys = ring_of(3, &mut rng);
        let ring: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let mut sig = RingSigner::sign(&keys[0], &ring, 0, b"msg", &mut rng).unwrap();

        // low byte of r_1
        sig.signature[64] ^= 1;
        assert_eq!(verify(b"msg", &sig.signature, &sig.key_image, &ring), Ok(false));
    }

    #[test]
    fn test_swapped_key_image_fails() {
        let mut rng = StdRng::seed_from_u64(10);
        let keys = ring_of(2, &mut rng);
        let ring: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let sig = RingSigner::sign(&keys[0], &ring, 0, b"msg", &mut rng).unwrap();
        let other_image = keys[1].key_image().unwrap();

        assert!(!verify(b"msg", &sig.signature, &other_image, &ring).unwrap());
    }

    #[test]
    fn test_ring_size_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let keys = ring_of(11, &mut rng);
        let ring: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let image = keys[0].key_image().unwrap();

        for n in [0usize, 1, 11] {
            let sig = vec![0u8; signature_len(n)];
            assert_eq!(
                verify(b"msg", &sig, &image, &ring[..n]),
                Err(PrivacyError::InvalidRingSize(n))
            );
        }
    }

    #[test]
    fn test_signature_length_mismatch() {
        let mut rng = StdRng::seed_from_u64(12);
        let keys = ring_of(3, &mut rng);
        let ring: Vec<_> = keys.iter().map(|k| k.public_key()).collect();
        let sig = RingSigner::sign(&keys[1], &ring, 1, b"msg", &mut rng).unwrap();

        assert_eq!(
            verify(b"msg", &sig.signature[..96], &sig.key_image, &ring),
            Err(PrivacyError::InvalidSignatureLength {
                expected: 128,
                got: 96
            })
        );
    }

    #[test]
    fn test_member_commitment_is_canonical() {
        let mut rng = StdRng::seed_from_u64(13);
        let key = RingKeypair::generate(&mut rng).unwrap();
        let c = member_commitment(&key.public_key());
        assert!(c.validate().is_ok());
        assert_eq!(c, member_commitment(&key.public_key()));
    }
}
