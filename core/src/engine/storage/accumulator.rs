//! Commitment Accumulator
//!
//! Owns the deposit tree, its recent-root window and the commitment index:
//! - Incremental Merkle tree (filled subtrees only)
//! - Circular root history for claim roots
//! - Leaf list for path generation and persistence replay
//!
//! Rollback restores a checkpoint of the frontier and root window and
//! truncates the leaf list, so an aborted session leaves no trace.

use log::debug;
use std::collections::HashMap;

use veilswap_privacy::{
    Commitment, IncrementalMerkleTree, MerkleHasher, MerklePath, PrivacyError, RootHistory,
    TreeFrontier, Word,
};

/// Snapshot taken before the first insert of a session
#[derive(Debug, Clone)]
pub struct AccumulatorCheckpoint {
    frontier: TreeFrontier,
    history: RootHistory,
    leaf_count: usize,
}

pub struct CommitmentAccumulator {
    tree: IncrementalMerkleTree,
    history: RootHistory,
    leaves: Vec<Commitment>,
    index: HashMap<Commitment, u64>,
}

impl CommitmentAccumulator {
    pub fn new(root_history_size: usize) -> Self {
        Self::with_hasher(MerkleHasher::new(), root_history_size)
    }

    pub fn with_hasher(hasher: MerkleHasher, root_history_size: usize) -> Self {
        Self {
            tree: IncrementalMerkleTree::with_hasher(hasher),
            history: RootHistory::new(root_history_size),
            leaves: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Rebuild from persisted leaves, in leaf order.
    pub fn replay(
        hasher: MerkleHasher,
        root_history_size: usize,
        commitments: impl IntoIterator<Item = Commitment>,
    ) -> Result<Self, PrivacyError> {
        let mut acc = Self::with_hasher(hasher, root_history_size);
        for commitment in commitments {
            acc.insert(commitment)?;
        }
        Ok(acc)
    }

    /// Append a commitment, returning its leaf index and the new root.
    pub fn insert(&mut self, commitment: Commitment) -> Result<(u64, Word), PrivacyError> {
        if self.index.contains_key(&commitment) {
            return Err(PrivacyError::DuplicateCommitment);
        }
        commitment.validate()?;

        let (leaf_index, root) = self.tree.insert(commitment.0)?;
        self.history.push(root);
        self.leaves.push(commitment);
        self.index.insert(commitment, leaf_index);

        debug!(
            "accumulator: leaf {} -> root {}",
            leaf_index,
            hex::encode(root)
        );
        Ok((leaf_index, root))
    }

    pub fn is_known_root(&self, root: &Word) -> bool {
        self.history.is_known(root)
    }

    pub fn contains(&self, commitment: &Commitment) -> bool {
        self.index.contains_key(commitment)
    }

    pub fn leaf_index_of(&self, commitment: &Commitment) -> Option<u64> {
        self.index.get(commitment).copied()
    }

    pub fn commitment_at(&self, leaf_index: u64) -> Option<Commitment> {
        self.leaves.get(leaf_index as usize).copied()
    }

    pub fn deposit_count(&self) -> u64 {
        self.tree.next_index()
    }

    pub fn root(&self) -> Word {
        self.tree.root()
    }

    pub fn zero_hash(&self, level: usize) -> Word {
        *self.tree.hasher().zero_hash(level)
    }

    pub fn filled_subtree(&self, level: usize) -> Option<Word> {
        self.tree.filled_subtree(level).copied()
    }

    pub fn hasher(&self) -> &MerkleHasher {
        self.tree.hasher()
    }

    pub fn leaves(&self) -> &[Commitment] {
        &self.leaves
    }

    /// Authentication path for a leaf.
    pub fn path(&self, leaf_index: u64) -> Option<MerklePath> {
        let words: Vec<Word> = self.leaves.iter().map(|c| c.0).collect();
        MerklePath::build(self.tree.hasher(), &words, leaf_index)
    }

    pub fn checkpoint(&self) -> AccumulatorCheckpoint {
        AccumulatorCheckpoint {
            frontier: self.tree.checkpoint(),
            history: self.history.clone(),
            leaf_count: self.leaves.len(),
        }
    }

    pub fn rollback_to(&mut self, checkpoint: AccumulatorCheckpoint) {
        for removed in self.leaves.drain(checkpoint.leaf_count..) {
            self.index.remove(&removed);
        }
        self.tree.restore(checkpoint.frontier);
        self.history = checkpoint.history;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilswap_privacy::field::{modulus_word, u128_to_word};

    fn small() -> CommitmentAccumulator {
        CommitmentAccumulator::with_hasher(MerkleHasher::with_depth(3), 30)
    }

    fn c(n: u128) -> Commitment {
        Commitment(u128_to_word(n))
    }

    #[test]
    fn test_insert_rules() {
        let mut acc = small();
        assert_eq!(acc.insert(c(0)), Err(PrivacyError::InvalidCommitment));
        assert_eq!(
            acc.insert(Commitment(modulus_word())),
            Err(PrivacyError::OutOfFieldRange)
        );

        acc.insert(c(1)).unwrap();
        assert_eq!(acc.insert(c(1)), Err(PrivacyError::DuplicateCommitment));
        assert_eq!(acc.deposit_count(), 1);
    }

    #[test]
    fn test_capacity() {
        let mut acc = small();
        for n in 1..=8 {
            acc.insert(c(n)).unwrap();
        }
        assert_eq!(
            acc.insert(c(9)),
            Err(PrivacyError::CapacityExceeded { capacity: 8 })
        );
        assert!(!acc.contains(&c(9)));
    }

    #[test]
    fn test_rollback_restores_everything() {
        let mut acc = small();
        let (_, root1) = acc.insert(c(1)).unwrap();
        let cp = acc.checkpoint();

        let (_, root2) = acc.insert(c(2)).unwrap();
        acc.insert(c(3)).unwrap();
        acc.rollback_to(cp);

        assert_eq!(acc.root(), root1);
        assert_eq!(acc.deposit_count(), 1);
        assert!(!acc.contains(&c(2)));
        assert!(!acc.is_known_root(&root2));
        assert!(acc.is_known_root(&root1));

        // same leaf lands on the same index and root again
        let (index, again) = acc.insert(c(2)).unwrap();
        assert_eq!(index, 1);
        assert_eq!(again, root2);
    }

    #[test]
    fn test_paths_verify_against_root() {
        let mut acc = small();
        for n in 1..=5 {
            acc.insert(c(n)).unwrap();
        }
        let root = acc.root();
        for i in 0..5 {
            let path = acc.path(i).unwrap();
            let leaf = acc.commitment_at(i).unwrap();
            assert!(path.verify(acc.hasher(), &leaf.0, &root));
        }
        assert!(acc.path(5).is_none());
    }

    #[test]
    fn test_replay_matches_live_tree() {
        let mut live = small();
        for n in 1..=6 {
            live.insert(c(n)).unwrap();
        }
        let replayed =
            CommitmentAccumulator::replay(MerkleHasher::with_depth(3), 30, live.leaves().to_vec())
                .unwrap();
        assert_eq!(replayed.root(), live.root());
        assert_eq!(replayed.deposit_count(), 6);
        assert_eq!(replayed.leaf_index_of(&c(4)), Some(3));
    }
}
