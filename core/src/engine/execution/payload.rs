//! Claim payload codec (Solidity ABI layout).
//!
//! ```text
//! empty                        -> pass-through, no privacy requested
//! 512 bytes (16 static words)  -> zk claim
//!   pA[2] | pB[2][2] | pC[2] | publicSignals[8]
//! anything else                -> ring claim
//!   (bytes sig, bytes32 keyImage, bytes32[] members,
//!    bytes stealthMetaAddress, address relayer, uint256 feeBps)
//! ```

use veilswap_account::Address;
use veilswap_privacy::field::{u128_to_word, word_to_u128};
use veilswap_privacy::{Groth16Proof, Nullifier, PUBLIC_SIGNAL_COUNT, PublicSignals, Word};

use crate::error::GateError;

pub const ZK_PAYLOAD_LEN: usize = 16 * 32;
const RING_HEAD_WORDS: usize = 6;

/// Upper bound on dynamic lengths accepted from a payload
const MAX_DYNAMIC_LEN: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimPayload {
    PassThrough,
    Zk(ZkClaim),
    Ring(RingClaim),
}

impl ClaimPayload {
    pub fn decode(bytes: &[u8]) -> Result<Self, GateError> {
        match bytes.len() {
            0 => Ok(ClaimPayload::PassThrough),
            ZK_PAYLOAD_LEN => ZkClaim::decode(bytes).map(ClaimPayload::Zk),
            _ => RingClaim::decode(bytes).map(ClaimPayload::Ring),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            ClaimPayload::PassThrough => Vec::new(),
            ClaimPayload::Zk(claim) => claim.encode(),
            ClaimPayload::Ring(claim) => claim.encode(),
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, ClaimPayload::PassThrough)
    }
}

// ============================================================================
// Variant A: Groth16 membership claim
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZkClaim {
    pub proof: Groth16Proof,
    pub signals: PublicSignals,
}

impl ZkClaim {
    fn decode(bytes: &[u8]) -> Result<Self, GateError> {
        let reader = AbiReader::new(bytes);
        let mut proof_words = [[0u8; 32]; 8];
        for (i, word) in proof_words.iter_mut().enumerate() {
            *word = reader.word(i)?;
        }
        let mut signals = [[0u8; 32]; PUBLIC_SIGNAL_COUNT];
        for (i, word) in signals.iter_mut().enumerate() {
            *word = reader.word(8 + i)?;
        }
        Ok(Self {
            proof: Groth16Proof::from_words(&proof_words),
            signals,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ZK_PAYLOAD_LEN);
        for word in self.proof.to_words().iter().chain(self.signals.iter()) {
            out.extend_from_slice(word);
        }
        out
    }

    pub fn merkle_root(&self) -> Word {
        self.signals[2]
    }

    pub fn nullifier_hash(&self) -> Nullifier {
        Nullifier(self.signals[3])
    }

    pub fn recipient(&self) -> Result<Address, GateError> {
        address_signal(&self.signals[4], "recipient")
    }

    pub fn relayer(&self) -> Result<Address, GateError> {
        address_signal(&self.signals[5], "relayer")
    }

    /// Saturates for values beyond 128 bits, which the fee cap then rejects.
    pub fn fee_bps(&self) -> u128 {
        word_to_u128(&self.signals[6]).unwrap_or(u128::MAX)
    }

    /// Minimum output the claimant accepts.
    pub fn claimed_output(&self) -> u128 {
        word_to_u128(&self.signals[7]).unwrap_or(u128::MAX)
    }
}

fn address_signal(word: &Word, name: &str) -> Result<Address, GateError> {
    Address::from_word(word)
        .ok_or_else(|| GateError::MalformedPayload(format!("{name} signal is not an address")))
}

// ============================================================================
// Variant B: LSAG ring claim
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingClaim {
    pub signature: Vec<u8>,
    pub key_image: Word,
    pub ring_members: Vec<Word>,
    pub stealth_meta_address: Vec<u8>,
    pub relayer: Address,
    pub relayer_fee_bps: u128,
}

impl RingClaim {
    fn decode(bytes: &[u8]) -> Result<Self, GateError> {
        if bytes.len() % 32 != 0 || bytes.len() < RING_HEAD_WORDS * 32 {
            return Err(GateError::MalformedPayload(format!(
                "ring payload length {} is not a valid ABI tuple",
                bytes.len()
            )));
        }
        let reader = AbiReader::new(bytes);

        let signature = reader.bytes_at(reader.offset(0)?)?;
        let key_image = reader.word(1)?;
        let ring_members = reader.words_at(reader.offset(2)?)?;
        let stealth_meta_address = reader.bytes_at(reader.offset(3)?)?;
        let relayer = address_signal(&reader.word(4)?, "relayer")?;
        let relayer_fee_bps = word_to_u128(&reader.word(5)?).unwrap_or(u128::MAX);

        Ok(Self {
            signature,
            key_image,
            ring_members,
            stealth_meta_address,
            relayer,
            relayer_fee_bps,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut writer = AbiWriter::new(RING_HEAD_WORDS);
        writer.push_bytes(&self.signature);
        writer.push_word(self.key_image);
        writer.push_words(&self.ring_members);
        writer.push_bytes(&self.stealth_meta_address);
        writer.push_word(self.relayer.to_word());
        writer.push_word(u128_to_word(self.relayer_fee_bps));
        writer.finish()
    }

    pub fn key_image_id(&self) -> Nullifier {
        Nullifier(self.key_image)
    }
}

// ============================================================================
// ABI helpers
// ============================================================================

struct AbiReader<'a> {
    data: &'a [u8],
}

impl<'a> AbiReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Head word `i`
    fn word(&self, i: usize) -> Result<Word, GateError> {
        self.word_at(i * 32)
    }

    fn word_at(&self, pos: usize) -> Result<Word, GateError> {
        let end = pos
            .checked_add(32)
            .ok_or_else(|| malformed("offset overflow"))?;
        let slice = self
            .data
            .get(pos..end)
            .ok_or_else(|| malformed("word out of bounds"))?;
        let mut word = [0u8; 32];
        word.copy_from_slice(slice);
        Ok(word)
    }

    fn usize_at(&self, pos: usize) -> Result<usize, GateError> {
        let word = self.word_at(pos)?;
        word_to_u128(&word)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| malformed("length or offset too large"))
    }

    /// Offset stored in head word `i`
    fn offset(&self, i: usize) -> Result<usize, GateError> {
        let offset = self.usize_at(i * 32)?;
        if offset % 32 != 0 {
            return Err(malformed("unaligned offset"));
        }
        Ok(offset)
    }

    fn bytes_at(&self, offset: usize) -> Result<Vec<u8>, GateError> {
        let len = self.usize_at(offset)?;
        if len > MAX_DYNAMIC_LEN {
            return Err(malformed("dynamic bytes too long"));
        }
        let start = offset + 32;
        self.data
            .get(start..start + len)
            .map(|s| s.to_vec())
            .ok_or_else(|| malformed("bytes out of bounds"))
    }

    fn words_at(&self, offset: usize) -> Result<Vec<Word>, GateError> {
        let len = self.usize_at(offset)?;
        if len > MAX_DYNAMIC_LEN / 32 {
            return Err(malformed("array too long"));
        }
        (0..len)
            .map(|i| self.word_at(offset + 32 + i * 32))
            .collect()
    }
}

fn malformed(reason: &str) -> GateError {
    GateError::MalformedPayload(reason.to_string())
}

/// Head/tail encoder for a tuple of `head_words` members.
struct AbiWriter {
    head: Vec<u8>,
    tail: Vec<u8>,
    head_words: usize,
}

impl AbiWriter {
    fn new(head_words: usize) -> Self {
        Self {
            head: Vec::with_capacity(head_words * 32),
            tail: Vec::new(),
            head_words,
        }
    }

    fn push_word(&mut self, word: Word) {
        self.head.extend_from_slice(&word);
    }

    fn push_offset(&mut self) {
        let offset = (self.head_words * 32 + self.tail.len()) as u128;
        self.push_word(u128_to_word(offset));
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.push_offset();
        self.tail.extend_from_slice(&u128_to_word(bytes.len() as u128));
        self.tail.extend_from_slice(bytes);
        let pad = (32 - bytes.len() % 32) % 32;
        self.tail.extend(std::iter::repeat_n(0u8, pad));
    }

    fn push_words(&mut self, words: &[Word]) {
        self.push_offset();
        self.tail.extend_from_slice(&u128_to_word(words.len() as u128));
        for word in words {
            self.tail.extend_from_slice(word);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.head.extend_from_slice(&self.tail);
        self.head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_claim(members: usize) -> RingClaim {
        RingClaim {
            signature: vec![7u8; 32 + 32 * members],
            key_image: [9u8; 32],
            ring_members: (0..members).map(|i| [i as u8; 32]).collect(),
            stealth_meta_address: vec![2u8; 66],
            relayer: Address([4; 20]),
            relayer_fee_bps: 25,
        }
    }

    #[test]
    fn test_empty_is_pass_through() {
        assert_eq!(ClaimPayload::decode(&[]).unwrap(), ClaimPayload::PassThrough);
        assert!(ClaimPayload::PassThrough.encode().is_empty());
    }

    #[test]
    fn test_zk_layout() {
        let mut bytes = vec![0u8; ZK_PAYLOAD_LEN];
        // signal[2] = merkle root, signal[4] = recipient
        bytes[(8 + 2) * 32 + 31] = 0x55;
        bytes[(8 + 4) * 32 + 31] = 0x01;
        bytes[(8 + 7) * 32 + 30] = 0x01;

        let ClaimPayload::Zk(claim) = ClaimPayload::decode(&bytes).unwrap() else {
            panic!("expected zk claim");
        };
        assert_eq!(claim.merkle_root()[31], 0x55);
        assert_eq!(claim.recipient().unwrap().0[19], 1);
        assert_eq!(claim.relayer().unwrap(), Address::ZERO);
        assert_eq!(claim.claimed_output(), 256);
        assert_eq!(claim.encode(), bytes);
    }

    #[test]
    fn test_zk_recipient_with_high_bits_is_malformed() {
        let mut bytes = vec![0u8; ZK_PAYLOAD_LEN];
        bytes[(8 + 4) * 32] = 0x01;
        let ClaimPayload::Zk(claim) = ClaimPayload::decode(&bytes).unwrap() else {
            panic!("expected zk claim");
        };
        assert!(matches!(claim.recipient(), Err(GateError::MalformedPayload(_))));
    }

    #[test]
    fn test_ring_layout_is_abi_compatible() {
        let claim = ring_claim(2);
        let bytes = claim.encode();

        // head: offsets for sig (0xc0), members and meta
        assert_eq!(bytes[31], 0xc0);
        assert_eq!(&bytes[32..64], &[9u8; 32]);
        // sig tail: len 96 at 0xc0, data fills 3 words, members at 0xc0 + 4 words
        assert_eq!(bytes[0xc0 + 31], 96);
        assert_eq!(bytes[2 * 32 + 31] as usize, 0xc0 + 4 * 32);
        assert_eq!(bytes.len() % 32, 0);

        let decoded = ClaimPayload::decode(&bytes).unwrap();
        assert_eq!(decoded, ClaimPayload::Ring(claim));
    }

    #[test]
    fn test_ring_payload_never_512_bytes() {
        // smallest ring tuple: 6 head + 4 sig + 3 members + 4 meta words
        assert_eq!(ring_claim(2).encode().len(), 17 * 32);
    }

    #[test]
    fn test_truncated_ring_payload_rejected() {
        let bytes = ring_claim(3).encode();
        let cut = &bytes[..bytes.len() - 64];
        assert!(matches!(
            ClaimPayload::decode(cut),
            Err(GateError::MalformedPayload(_))
        ));
        assert!(matches!(
            ClaimPayload::decode(&[1u8; 33]),
            Err(GateError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_huge_member_count_rejected() {
        let mut bytes = ring_claim(2).encode();
        let members_at = bytes[2 * 32 + 31] as usize;
        bytes[members_at..members_at + 32].copy_from_slice(&u128_to_word(u64::MAX as u128));
        assert_eq!(
            ClaimPayload::decode(&bytes),
            Err(GateError::MalformedPayload("array too long".into()))
        );
    }

    #[test]
    fn test_offset_out_of_range_rejected() {
        let mut bytes = ring_claim(2).encode();
        bytes[..32].copy_from_slice(&u128_to_word(1 << 20));
        assert!(matches!(
            ClaimPayload::decode(&bytes),
            Err(GateError::MalformedPayload(_))
        ));
    }
}
