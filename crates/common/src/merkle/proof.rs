use serde::{Deserialize, Serialize};

use crate::crypto::Bytes32;

use super::tree::hash_node;

/// Sibling hashes from a leaf up to (not including) the root
///
/// The direction at each level comes from the bits of `index`: bit `i` set
/// means the running node is the right child at level `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerklePath {
    index: u64,
    siblings: Vec<Bytes32>,
}

impl MerklePath {
    pub fn new(index: u64, siblings: Vec<Bytes32>) -> Self {
        Self { index, siblings }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn siblings(&self) -> &[Bytes32] {
        &self.siblings
    }

    /// Left/right flags per level, `true` when the running node is the right child
    pub fn directions(&self) -> Vec<bool> {
        (0..self.siblings.len())
            .map(|level| (self.index >> level) & 1 == 1)
            .collect()
    }

    /// Fold `leaf` up through the siblings
    pub fn compute_root(&self, leaf: &Bytes32) -> Bytes32 {
        self.siblings
            .iter()
            .zip(self.directions())
            .fold(*leaf, |node, (sibling, is_right)| {
                if is_right {
                    hash_node(sibling, &node)
                } else {
                    hash_node(&node, sibling)
                }
            })
    }
}

/// Recompute the root from `leaf` and `path` and compare it against `root`.
///
/// An index that addresses a position outside the tree the path describes is
/// rejected, so one path can't be replayed under a second index.
pub fn verify_inclusion(leaf: &Bytes32, path: &MerklePath, root: &Bytes32) -> bool {
    let depth = path.siblings.len();
    if depth < 64 && path.index >> depth != 0 {
        return false;
    }
    path.compute_root(leaf) == *root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::MerkleTree;

    #[test]
    fn test_wrong_leaf_fails() {
        let leaves: Vec<Bytes32> = (1..=4u8).map(|i| Bytes32::new([i; 32])).collect();
        let tree = MerkleTree::build(&leaves).unwrap();
        let path = tree.prove(1).unwrap();
        assert!(!verify_inclusion(&leaves[2], &path, &tree.root()));
    }

    #[test]
    fn test_wrong_root_fails() {
        let leaves: Vec<Bytes32> = (1..=4u8).map(|i| Bytes32::new([i; 32])).collect();
        let tree = MerkleTree::build(&leaves).unwrap();
        let path = tree.prove(3).unwrap();
        assert!(!verify_inclusion(&leaves[3], &path, &Bytes32::new([9; 32])));
    }

    #[test]
    fn test_index_beyond_depth_fails() {
        let leaves: Vec<Bytes32> = (1..=2u8).map(|i| Bytes32::new([i; 32])).collect();
        let tree = MerkleTree::build(&leaves).unwrap();
        let path = tree.prove(1).unwrap();
        // same siblings, index 3 has the same low bit but does not exist
        let forged = MerklePath::new(3, path.siblings().to_vec());
        assert!(!verify_inclusion(&leaves[1], &forged, &tree.root()));
    }

    #[test]
    fn test_directions_follow_index_bits() {
        let path = MerklePath::new(0b101, vec![Bytes32::ZERO; 3]);
        assert_eq!(path.directions(), vec![true, false, true]);
    }
}
