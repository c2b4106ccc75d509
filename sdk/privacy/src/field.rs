//! BN254 scalar field words.
//!
//! Every value that crosses the pool boundary (commitments, roots, nullifier
//! hashes, public signals) is a 32-byte big-endian word. A word is only
//! accepted when it is strictly below the field modulus.

use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, PrimeField};

use crate::error::PrivacyError;

/// 32-byte big-endian word.
pub type Word = [u8; 32];

/// Parse a canonical field element. Words `>= r` are rejected.
pub fn fr_from_word(word: &Word) -> Result<Fr, PrivacyError> {
    prime_from_word(word).ok_or(PrivacyError::OutOfFieldRange)
}

/// Canonical big-endian parse for any 4-limb prime field.
pub fn prime_from_word<F: PrimeField<BigInt = BigInt<4>>>(word: &Word) -> Option<F> {
    let mut limbs = [0u64; 4];
    for (i, chunk) in word.rchunks(8).enumerate() {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(chunk);
        limbs[i] = u64::from_be_bytes(buf);
    }
    F::from_bigint(BigInt::new(limbs))
}

pub fn prime_to_word<F: PrimeField>(f: &F) -> Word {
    let bytes = f.into_bigint().to_bytes_be();
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    word
}

/// Reduce arbitrary bytes into the field (big-endian, mod r).
pub fn fr_reduce(bytes: &[u8]) -> Fr {
    Fr::from_be_bytes_mod_order(bytes)
}

pub fn fr_to_word(f: &Fr) -> Word {
    prime_to_word(f)
}

/// Big-endian encoding of the modulus `r`.
pub fn modulus_word() -> Word {
    let bytes = Fr::MODULUS.to_bytes_be();
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    word
}

pub fn u128_to_word(value: u128) -> Word {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Low 128 bits of a word, or `None` when the upper half is set.
pub fn word_to_u128(word: &Word) -> Option<u128> {
    if word[..16].iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 16];
    buf.copy_from_slice(&word[16..]);
    Some(u128::from_be_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_values() {
        let f = fr_from_word(&u128_to_word(42)).unwrap();
        assert_eq!(f, Fr::from(42u64));
        assert_eq!(fr_to_word(&f), u128_to_word(42));
    }

    #[test]
    fn test_modulus_rejected() {
        let r = modulus_word();
        assert_eq!(fr_from_word(&r), Err(PrivacyError::OutOfFieldRange));
        assert_eq!(fr_from_word(&[0xff; 32]), Err(PrivacyError::OutOfFieldRange));
    }

    #[test]
    fn test_modulus_minus_one_accepted() {
        let mut r = modulus_word();
        r[31] -= 1;
        let f = fr_from_word(&r).unwrap();
        assert_eq!(f, -Fr::from(1u64));
    }

    #[test]
    fn test_word_to_u128() {
        assert_eq!(word_to_u128(&u128_to_word(u128::MAX)), Some(u128::MAX));
        let mut w = [0u8; 32];
        w[15] = 1;
        assert_eq!(word_to_u128(&w), None);
    }
}
