//! Merkle Tree for Deposit Commitments
//!
//! Append-only incremental tree of fixed depth. Only the frontier
//! (`filled_subtrees`) is kept, so an insert costs `depth` hashes.
//!
//! ```text
//!                    Root
//!                   /    \
//!                 H01    Z1        Z_i = zero hash at level i
//!                /  \
//!               H0  H1              Z_0 = Poseidon(0)
//!               |   |
//!              C0  C1  (Commitments)
//! ```
//!
//! Recently produced roots are kept in a circular [`RootHistory`] so a claim
//! may reference a root that was current a few deposits ago.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use serde::{Deserialize, Serialize};

use crate::error::PrivacyError;
use crate::field::{Word, fr_reduce, fr_to_word};
use crate::poseidon::{hash_fields, poseidon_config};

/// Tree depth (supports 2^20 deposits)
pub const TREE_DEPTH: usize = 20;

/// Number of recent roots accepted by claims
pub const ROOT_HISTORY_SIZE: usize = 30;

/// A Merkle path proving inclusion of a leaf
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    /// Sibling hashes from leaf to root
    pub siblings: Vec<Word>,
    /// Position bits (0 = left, 1 = right)
    pub path_bits: Vec<bool>,
    /// The leaf position
    pub position: u64,
}

impl MerklePath {
    /// Verify that this path proves inclusion of `leaf` in `root`
    pub fn verify(&self, hasher: &MerkleHasher, leaf: &Word, root: &Word) -> bool {
        let computed = hasher.compute_root_from_path(leaf, &self.siblings, &self.path_bits);
        &computed == root
    }

    /// Build the path for `position` from the full leaf list.
    pub fn build(hasher: &MerkleHasher, leaves: &[Word], position: u64) -> Option<Self> {
        let depth = hasher.depth();
        if position as usize >= leaves.len() {
            return None;
        }

        let mut level: Vec<Word> = leaves.to_vec();
        let mut siblings = Vec::with_capacity(depth);
        let mut path_bits = Vec::with_capacity(depth);
        let mut index = position as usize;

        for height in 0..depth {
            let is_right = index & 1 == 1;
            let sibling_index = index ^ 1;
            let sibling = level
                .get(sibling_index)
                .copied()
                .unwrap_or(*hasher.zero_hash(height));
            siblings.push(sibling);
            path_bits.push(is_right);

            level = level
                .chunks(2)
                .map(|pair| {
                    let right = pair.get(1).copied().unwrap_or(*hasher.zero_hash(height));
                    hasher.hash_pair(&pair[0], &right)
                })
                .collect();
            index /= 2;
        }

        Some(Self {
            siblings,
            path_bits,
            position,
        })
    }
}

/// Poseidon-based Merkle hash function
#[derive(Clone)]
pub struct MerkleHasher {
    config: PoseidonConfig<Fr>,
    /// zero_hashes[i] = root of an empty subtree of height i
    zero_hashes: Vec<Word>,
}

impl MerkleHasher {
    pub fn new() -> Self {
        Self::with_depth(TREE_DEPTH)
    }

    pub fn with_depth(depth: usize) -> Self {
        let config = poseidon_config();
        let empty_leaf = fr_to_word(&hash_fields(&config, &[Fr::from(0u64)]));

        let mut zero_hashes = Vec::with_capacity(depth + 1);
        zero_hashes.push(empty_leaf);
        let mut hasher = Self {
            config,
            zero_hashes,
        };
        for level in 0..depth {
            let prev = hasher.zero_hashes[level];
            let next = hasher.hash_pair(&prev, &prev);
            hasher.zero_hashes.push(next);
        }
        hasher
    }

    pub fn depth(&self) -> usize {
        self.zero_hashes.len() - 1
    }

    /// Hash two children to get parent
    pub fn hash_pair(&self, left: &Word, right: &Word) -> Word {
        let inputs = [fr_reduce(left), fr_reduce(right)];
        fr_to_word(&hash_fields(&self.config, &inputs))
    }

    /// Root of an empty subtree of the given height
    pub fn zero_hash(&self, height: usize) -> &Word {
        &self.zero_hashes[height]
    }

    /// Root of the empty tree
    pub fn empty_root(&self) -> &Word {
        &self.zero_hashes[self.depth()]
    }

    /// Compute root from leaf and authentication path
    pub fn compute_root_from_path(
        &self,
        leaf: &Word,
        siblings: &[Word],
        path_bits: &[bool],
    ) -> Word {
        let mut current = *leaf;

        for (sibling, is_right) in siblings.iter().zip(path_bits.iter()) {
            if *is_right {
                current = self.hash_pair(sibling, &current);
            } else {
                current = self.hash_pair(&current, sibling);
            }
        }

        current
    }
}

impl Default for MerkleHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// Incremental tree state, cheap to clone for checkpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeFrontier {
    /// Latest left-side node seen at each level
    pub filled_subtrees: Vec<Word>,
    /// Next leaf index
    pub next_index: u64,
    /// Current root
    pub root: Word,
}

/// Append-only incremental Merkle tree
#[derive(Clone)]
pub struct IncrementalMerkleTree {
    hasher: MerkleHasher,
    frontier: TreeFrontier,
}

impl IncrementalMerkleTree {
    /// Create a new empty tree of depth [`TREE_DEPTH`]
    pub fn new() -> Self {
        Self::with_hasher(MerkleHasher::new())
    }

    pub fn with_hasher(hasher: MerkleHasher) -> Self {
        let depth = hasher.depth();
        let filled_subtrees = (0..depth).map(|i| *hasher.zero_hash(i)).collect();
        let root = *hasher.empty_root();
        Self {
            hasher,
            frontier: TreeFrontier {
                filled_subtrees,
                next_index: 0,
                root,
            },
        }
    }

    pub fn root(&self) -> Word {
        self.frontier.root
    }

    pub fn next_index(&self) -> u64 {
        self.frontier.next_index
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.hasher.depth()
    }

    pub fn hasher(&self) -> &MerkleHasher {
        &self.hasher
    }

    pub fn filled_subtree(&self, level: usize) -> Option<&Word> {
        self.frontier.filled_subtrees.get(level)
    }

    /// Append a leaf, returning its index and the new root.
    pub fn insert(&mut self, leaf: Word) -> Result<(u64, Word), PrivacyError> {
        let capacity = self.capacity();
        let index = self.frontier.next_index;
        if index >= capacity {
            return Err(PrivacyError::CapacityExceeded { capacity });
        }

        let mut current_index = index;
        let mut current = leaf;
        for level in 0..self.hasher.depth() {
            let (left, right) = if current_index & 1 == 0 {
                self.frontier.filled_subtrees[level] = current;
                (current, *self.hasher.zero_hash(level))
            } else {
                (self.frontier.filled_subtrees[level], current)
            };
            current = self.hasher.hash_pair(&left, &right);
            current_index /= 2;
        }

        self.frontier.root = current;
        self.frontier.next_index = index + 1;
        Ok((index, current))
    }

    pub fn checkpoint(&self) -> TreeFrontier {
        self.frontier.clone()
    }

    pub fn restore(&mut self, frontier: TreeFrontier) {
        self.frontier = frontier;
    }
}

impl Default for IncrementalMerkleTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Circular buffer of the most recent roots
///
/// Empty slots hold the zero word, which is never reported as known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootHistory {
    roots: Vec<Word>,
    /// Slot of the next write
    cursor: usize,
    filled: usize,
}

impl RootHistory {
    pub fn new(size: usize) -> Self {
        Self {
            roots: vec![[0u8; 32]; size.max(1)],
            cursor: 0,
            filled: 0,
        }
    }

    /// Record a new root, overwriting the oldest once full
    pub fn push(&mut self, root: Word) {
        let size = self.roots.len();
        self.roots[self.cursor] = root;
        self.cursor = (self.cursor + 1) % size;
        self.filled = (self.filled + 1).min(size);
    }

    /// Check if a root is one of the retained roots
    pub fn is_known(&self, root: &Word) -> bool {
        if *root == [0u8; 32] {
            return false;
        }
        self.roots.contains(root)
    }

    /// Get the most recent root
    pub fn current(&self) -> Option<&Word> {
        if self.filled == 0 {
            return None;
        }
        let size = self.roots.len();
        Some(&self.roots[(self.cursor + size - 1) % size])
    }

    pub fn capacity(&self) -> usize {
        self.roots.len()
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }
}

impl Default for RootHistory {
    fn default() -> Self {
        Self::new(ROOT_HISTORY_SIZE)
    }
}
