//!
//! Fixed-height Merkle allocation tree.
//!
//! An open minter commits to every identity it may ever hand out through the root of this
//! tree. Each leaf records whether its identity was minted already, so a mint proves the leaf
//! unminted against the current root and flips it in the same walk.
//!
//! The off-chain side ([`MerkleTree`]) holds all levels and produces proofs; the verifying side
//! ([`update_leaf_root`], [`verify_leaf`]) only ever sees a leaf pair, a sibling path and the
//! root being spent.
//!

use tessera_hashes::{Hash, Hasher, HasherBase, MerkleBranchHash, MerkleLeafFieldHash, MerkleLeafHash, ZERO_HASH};
use thiserror::Error;

/// Number of levels, leaves and root included.
pub const MERKLE_TREE_HEIGHT: usize = 15;

/// Number of sibling hashes on a leaf-to-root path.
pub const MERKLE_PROOF_DEPTH: usize = MERKLE_TREE_HEIGHT - 1;

pub const MERKLE_TREE_MAX_LEAVES: usize = 1 << MERKLE_PROOF_DEPTH;

/// Sibling hashes from the leaf level upwards.
pub type MerkleProof = [Hash; MERKLE_PROOF_DEPTH];

/// Per level, `true` when the node on the path is the right child (its sibling is on the left).
pub type MerkleSides = [bool; MERKLE_PROOF_DEPTH];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("tree holds at most {1} leaves but {0} were given")]
    TooManyLeaves(usize, usize),

    #[error("leaf index {0} is out of range for a tree with {1} leaves")]
    IndexOutOfRange(usize, usize),

    #[error("merkle root mismatch: claimed {claimed} but the proof yields {computed}")]
    RootMismatch { claimed: Hash, computed: Hash },
}

pub type MerkleResult<T> = std::result::Result<T, MerkleError>;

/// An allocation record. Every sub-field is hashed on its own before the leaf hash is taken,
/// so no field encoding can bleed into its neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleLeaf {
    pub commitment: Hash,
    pub local_id: i64,
    pub minted: bool,
}

impl MerkleLeaf {
    pub fn new(commitment: Hash, local_id: i64, minted: bool) -> Self {
        Self { commitment, local_id, minted }
    }

    pub fn unminted(commitment: Hash, local_id: i64) -> Self {
        Self::new(commitment, local_id, false)
    }

    pub fn into_minted(self) -> Self {
        Self { minted: true, ..self }
    }

    pub fn hash(&self) -> Hash {
        let mut hasher = MerkleLeafHash::new();
        hasher
            .update(MerkleLeafFieldHash::hash(self.commitment))
            .update(MerkleLeafFieldHash::hash(self.local_id.to_le_bytes()))
            .update(MerkleLeafFieldHash::hash([self.minted as u8]));
        hasher.finalize()
    }
}

pub fn merkle_hash(left: Hash, right: Hash) -> Hash {
    let mut hasher = MerkleBranchHash::new();
    hasher.update(left).update(right);
    hasher.finalize()
}

/// Roots of all-empty subtrees, indexed by level. An absent leaf hashes to [`ZERO_HASH`].
pub fn empty_subtree_hashes() -> [Hash; MERKLE_TREE_HEIGHT] {
    let mut empty = [ZERO_HASH; MERKLE_TREE_HEIGHT];
    for level in 1..MERKLE_TREE_HEIGHT {
        empty[level] = merkle_hash(empty[level - 1], empty[level - 1]);
    }
    empty
}

/// Walks `leaf_hash` up the path described by `proof` and `sides`.
pub fn compute_root(leaf_hash: Hash, proof: &MerkleProof, sides: &MerkleSides) -> Hash {
    proof.iter().zip(sides.iter()).fold(leaf_hash, |node, (&sibling, &is_right)| {
        if is_right { merkle_hash(sibling, node) } else { merkle_hash(node, sibling) }
    })
}

pub fn verify_leaf(leaf_hash: Hash, proof: &MerkleProof, sides: &MerkleSides, root: Hash) -> bool {
    compute_root(leaf_hash, proof, sides) == root
}

/// Replays `old_leaf_hash` and `new_leaf_hash` over the same path in lock-step. The old leaf must
/// reproduce `claimed_old_root`; the root reached by the new leaf is returned.
pub fn update_leaf_root(
    old_leaf_hash: Hash,
    new_leaf_hash: Hash,
    proof: &MerkleProof,
    sides: &MerkleSides,
    claimed_old_root: Hash,
) -> MerkleResult<Hash> {
    let mut old_node = old_leaf_hash;
    let mut new_node = new_leaf_hash;
    for (&sibling, &is_right) in proof.iter().zip(sides.iter()) {
        if is_right {
            old_node = merkle_hash(sibling, old_node);
            new_node = merkle_hash(sibling, new_node);
        } else {
            old_node = merkle_hash(old_node, sibling);
            new_node = merkle_hash(new_node, sibling);
        }
    }
    if old_node != claimed_old_root {
        return Err(MerkleError::RootMismatch { claimed: claimed_old_root, computed: old_node });
    }
    Ok(new_node)
}

/// Result of [`MerkleTree::update_leaf`]. The path is valid against both roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleUpdate {
    pub old_root: Hash,
    pub new_root: Hash,
    pub proof: MerkleProof,
    pub sides: MerkleSides,
}

/// Off-chain tree holding every level, bottom-up. Levels shorter than their capacity are
/// implicitly padded with the empty-subtree hash of that level.
#[derive(Debug, Clone)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
    empty: [Hash; MERKLE_TREE_HEIGHT],
}

impl MerkleTree {
    pub fn new(leaf_hashes: impl IntoIterator<Item = Hash>) -> MerkleResult<Self> {
        let leaves: Vec<Hash> = leaf_hashes.into_iter().collect();
        if leaves.len() > MERKLE_TREE_MAX_LEAVES {
            return Err(MerkleError::TooManyLeaves(leaves.len(), MERKLE_TREE_MAX_LEAVES));
        }
        let empty = empty_subtree_hashes();
        let mut levels = Vec::with_capacity(MERKLE_TREE_HEIGHT);
        levels.push(leaves);
        for level in 0..MERKLE_PROOF_DEPTH {
            let mut next: Vec<Hash> =
                levels[level].chunks(2).map(|pair| merkle_hash(pair[0], pair.get(1).copied().unwrap_or(empty[level]))).collect();
            if next.is_empty() {
                next.push(empty[level + 1]);
            }
            levels.push(next);
        }
        Ok(Self { levels, empty })
    }

    pub fn from_leaves(leaves: &[MerkleLeaf]) -> MerkleResult<Self> {
        Self::new(leaves.iter().map(MerkleLeaf::hash))
    }

    pub fn root(&self) -> Hash {
        self.levels[MERKLE_PROOF_DEPTH][0]
    }

    pub fn leaf_count(&self) -> usize {
        self.levels[0].len()
    }

    pub fn leaf_hash(&self, index: usize) -> MerkleResult<Hash> {
        self.levels[0].get(index).copied().ok_or(MerkleError::IndexOutOfRange(index, self.leaf_count()))
    }

    fn node(&self, level: usize, index: usize) -> Hash {
        self.levels[level].get(index).copied().unwrap_or(self.empty[level])
    }

    pub fn get_merkle_path(&self, index: usize) -> MerkleResult<(MerkleProof, MerkleSides)> {
        if index >= self.leaf_count() {
            return Err(MerkleError::IndexOutOfRange(index, self.leaf_count()));
        }
        let mut proof = [ZERO_HASH; MERKLE_PROOF_DEPTH];
        let mut sides = [false; MERKLE_PROOF_DEPTH];
        let mut position = index;
        for level in 0..MERKLE_PROOF_DEPTH {
            proof[level] = self.node(level, position ^ 1);
            sides[level] = position & 1 == 1;
            position >>= 1;
        }
        Ok((proof, sides))
    }

    /// Replaces leaf `index` and recomputes its path up to the root.
    pub fn update_leaf(&mut self, new_leaf_hash: Hash, index: usize) -> MerkleResult<MerkleUpdate> {
        let (proof, sides) = self.get_merkle_path(index)?;
        let old_root = self.root();
        self.levels[0][index] = new_leaf_hash;
        let mut position = index;
        for level in 0..MERKLE_PROOF_DEPTH {
            let parent = position >> 1;
            let hash = merkle_hash(self.node(level, parent << 1), self.node(level, (parent << 1) | 1));
            self.levels[level + 1][parent] = hash;
            position = parent;
        }
        Ok(MerkleUpdate { old_root, new_root: self.root(), proof, sides })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn leaves(count: usize) -> Vec<MerkleLeaf> {
        (0..count).map(|i| MerkleLeaf::unminted(Hash::from_u64_word(1000 + i as u64), i as i64)).collect()
    }

    #[test]
    fn test_empty_and_single_trees() {
        let empty = empty_subtree_hashes();
        assert_eq!(MerkleTree::new([]).unwrap().root(), empty[MERKLE_PROOF_DEPTH]);

        let leaf = MerkleLeaf::unminted(1.into(), 0).hash();
        let tree = MerkleTree::new([leaf]).unwrap();
        let expected = (0..MERKLE_PROOF_DEPTH).fold(leaf, |node, level| merkle_hash(node, empty[level]));
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_small_tree_layout() {
        let hashes: Vec<Hash> = leaves(3).iter().map(MerkleLeaf::hash).collect();
        let tree = MerkleTree::new(hashes.clone()).unwrap();
        let empty = empty_subtree_hashes();
        let level1 = merkle_hash(merkle_hash(hashes[0], hashes[1]), merkle_hash(hashes[2], empty[0]));
        let expected = (2..MERKLE_PROOF_DEPTH).fold(level1, |node, level| merkle_hash(node, empty[level]));
        assert_eq!(tree.root(), expected);

        let (proof, sides) = tree.get_merkle_path(2).unwrap();
        assert_eq!(proof[0], empty[0]);
        assert_eq!(proof[1], merkle_hash(hashes[0], hashes[1]));
        assert!(!sides[0]);
        assert!(sides[1]);
        assert!(verify_leaf(hashes[2], &proof, &sides, tree.root()));
        assert!(!verify_leaf(hashes[1], &proof, &sides, tree.root()));
    }

    #[test]
    fn test_leaf_fields_are_bound() {
        let leaf = MerkleLeaf::unminted(7.into(), 3);
        assert_ne!(leaf.hash(), leaf.into_minted().hash());
        assert_ne!(leaf.hash(), MerkleLeaf::unminted(7.into(), 4).hash());
        assert_ne!(leaf.hash(), MerkleLeaf::unminted(8.into(), 3).hash());
    }

    #[test]
    fn test_capacity_and_index_checks() {
        assert_eq!(
            MerkleTree::new(vec![ZERO_HASH; MERKLE_TREE_MAX_LEAVES + 1]).err(),
            Some(MerkleError::TooManyLeaves(MERKLE_TREE_MAX_LEAVES + 1, MERKLE_TREE_MAX_LEAVES))
        );
        let mut tree = MerkleTree::from_leaves(&leaves(4)).unwrap();
        assert_eq!(tree.get_merkle_path(4).err(), Some(MerkleError::IndexOutOfRange(4, 4)));
        assert_eq!(tree.update_leaf(ZERO_HASH, 9).err(), Some(MerkleError::IndexOutOfRange(9, 4)));
    }

    #[test]
    fn test_full_tree_last_leaf() {
        let mut tree = MerkleTree::new((0..MERKLE_TREE_MAX_LEAVES as u64).map(Hash::from_u64_word)).unwrap();
        let index = MERKLE_TREE_MAX_LEAVES - 1;
        let old = tree.leaf_hash(index).unwrap();
        let update = tree.update_leaf(ZERO_HASH, index).unwrap();
        assert!(update.sides.iter().all(|&side| side));
        assert_eq!(update_leaf_root(old, ZERO_HASH, &update.proof, &update.sides, update.old_root), Ok(update.new_root));
    }

    #[test]
    fn test_random_update_sequences() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            let count = rng.gen_range(1..200);
            let mut leaves = leaves(count);
            let mut tree = MerkleTree::from_leaves(&leaves).unwrap();
            for _ in 0..50 {
                let index = rng.gen_range(0..count);
                let old_leaf = leaves[index];
                let new_leaf = MerkleLeaf::new(Hash::from_u64_word(rng.gen_range(0..u64::MAX)), old_leaf.local_id, rng.gen_bool(0.5));
                let update = tree.update_leaf(new_leaf.hash(), index).unwrap();
                leaves[index] = new_leaf;

                assert!(verify_leaf(old_leaf.hash(), &update.proof, &update.sides, update.old_root));
                assert!(verify_leaf(new_leaf.hash(), &update.proof, &update.sides, update.new_root));
                assert_eq!(
                    update_leaf_root(old_leaf.hash(), new_leaf.hash(), &update.proof, &update.sides, update.old_root),
                    Ok(update.new_root)
                );
                // The incrementally maintained root must agree with a full rebuild
                assert_eq!(MerkleTree::from_leaves(&leaves).unwrap().root(), update.new_root);
            }
        }
    }

    #[test]
    fn test_update_against_stale_root_fails() {
        let mut tree = MerkleTree::from_leaves(&leaves(8)).unwrap();
        let first = tree.update_leaf(MerkleLeaf::unminted(1.into(), 0).into_minted().hash(), 0).unwrap();
        let old = tree.leaf_hash(5).unwrap();
        let second = tree.update_leaf(ZERO_HASH, 5).unwrap();
        assert_eq!(second.old_root, first.new_root);
        let result = update_leaf_root(old, ZERO_HASH, &second.proof, &second.sides, first.old_root);
        assert_eq!(result, Err(MerkleError::RootMismatch { claimed: first.old_root, computed: first.new_root }));
    }
}
