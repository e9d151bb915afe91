use crate::crypto::commitment::domain;
use crate::crypto::{Bytes32, DomainHasher};

use super::proof::MerklePath;
use super::MerkleError;

/// Hash two children into their parent node
pub fn hash_node(left: &Bytes32, right: &Bytes32) -> Bytes32 {
    DomainHasher::new(domain::MERKLE_NODE)
        .field(left)
        .field(right)
        .finish()
}

/// Compute the layer above `layer`. An odd tail is paired with
///  [`Bytes32::ZERO`], never with a copy of itself.
fn next_layer(layer: &[Bytes32]) -> Vec<Bytes32> {
    layer
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_node(left, right),
            [left] => hash_node(left, &Bytes32::ZERO),
            _ => unreachable!("chunks(2) yields one or two items"),
        })
        .collect()
}

/// A binary Merkle tree kept as its full list of layers
///
/// `layers[0]` holds the leaves in index order and the last layer holds the
/// single root. Keeping every layer is what lets a manifest ship inclusion
/// paths for any entry without the reader rebuilding anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    layers: Vec<Vec<Bytes32>>,
}

impl MerkleTree {
    /// Build a tree bottom-up over `leaves`.
    ///
    /// # Errors
    ///
    /// [`MerkleError::Empty`] when there are no leaves; vaults never publish
    ///  an empty manifest.
    pub fn build(leaves: &[Bytes32]) -> Result<Self, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::Empty);
        }

        let mut layers = vec![leaves.to_vec()];
        let mut current = leaves.to_vec();
        while current.len() > 1 {
            current = next_layer(&current);
            layers.push(current.clone());
        }
        Ok(Self { layers })
    }

    /// Adopt layers read from an untrusted source.
    ///
    /// Every layer above the leaves is recomputed; the first divergence is
    ///  reported rather than trusted.
    pub fn from_layers(layers: Vec<Vec<Bytes32>>) -> Result<Self, MerkleError> {
        let leaves = layers.first().ok_or(MerkleError::Empty)?;
        let rebuilt = Self::build(leaves)?;

        if rebuilt.layers.len() != layers.len() {
            return Err(MerkleError::LayerCount {
                expected: rebuilt.layers.len(),
                got: layers.len(),
            });
        }
        if let Some(layer) = rebuilt
            .layers
            .iter()
            .zip(layers.iter())
            .position(|(expected, got)| expected != got)
        {
            return Err(MerkleError::LayerMismatch(layer));
        }
        Ok(rebuilt)
    }

    pub fn root(&self) -> Bytes32 {
        self.layers
            .last()
            .and_then(|top| top.first())
            .copied()
            .unwrap_or(Bytes32::ZERO)
    }

    pub fn layers(&self) -> &[Vec<Bytes32>] {
        &self.layers
    }

    pub fn leaves(&self) -> &[Bytes32] {
        &self.layers[0]
    }

    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// Number of hashing levels between a leaf and the root
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn prove(&self, index: usize) -> Result<MerklePath, MerkleError> {
        prove_inclusion(&self.layers, index)
    }
}

/// Build a tree over `leaves`, see [`MerkleTree::build`]
pub fn build_tree(leaves: &[Bytes32]) -> Result<MerkleTree, MerkleError> {
    MerkleTree::build(leaves)
}

/// Collect the sibling of the node on the leaf-to-root path at every layer.
pub fn prove_inclusion(layers: &[Vec<Bytes32>], index: usize) -> Result<MerklePath, MerkleError> {
    let leaf_count = layers.first().map(Vec::len).unwrap_or(0);
    if index >= leaf_count {
        return Err(MerkleError::IndexOutOfRange {
            index,
            len: leaf_count,
        });
    }

    let mut siblings = Vec::with_capacity(layers.len().saturating_sub(1));
    let mut position = index;
    // the top layer is the root and has no sibling
    for layer in &layers[..layers.len() - 1] {
        let sibling = position ^ 1;
        siblings.push(layer.get(sibling).copied().unwrap_or(Bytes32::ZERO));
        position /= 2;
    }

    Ok(MerklePath::new(index as u64, siblings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::verify_inclusion;

    fn leaves(n: u8) -> Vec<Bytes32> {
        (0..n).map(|i| Bytes32::new([i + 1; 32])).collect()
    }

    #[test]
    fn test_empty_tree_is_rejected() {
        assert!(matches!(MerkleTree::build(&[]), Err(MerkleError::Empty)));
    }

    #[test]
    fn test_single_leaf_root_is_the_leaf() {
        let l = leaves(1);
        let tree = MerkleTree::build(&l).unwrap();
        assert_eq!(tree.root(), l[0]);
        assert_eq!(tree.depth(), 0);
        assert!(tree.prove(0).unwrap().siblings().is_empty());
    }

    #[test]
    fn test_layer_shapes() {
        let tree = MerkleTree::build(&leaves(5)).unwrap();
        let widths: Vec<usize> = tree.layers().iter().map(Vec::len).collect();
        assert_eq!(widths, vec![5, 3, 2, 1]);
    }

    #[test]
    fn test_odd_tail_uses_zero_pad() {
        let l = leaves(3);
        let tree = MerkleTree::build(&l).unwrap();
        assert_eq!(tree.layers()[1][1], hash_node(&l[2], &Bytes32::ZERO));
    }

    #[test]
    fn test_padding_does_not_collide_with_duplicate_leaf() {
        // With duplicate-last padding these two would share a root
        let three = leaves(3);
        let mut four = three.clone();
        four.push(three[2]);
        let a = MerkleTree::build(&three).unwrap();
        let b = MerkleTree::build(&four).unwrap();
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn test_inclusion_roundtrip_every_index() {
        for n in 1..=9u8 {
            let l = leaves(n);
            let tree = MerkleTree::build(&l).unwrap();
            for (i, leaf) in l.iter().enumerate() {
                let path = prove_inclusion(tree.layers(), i).unwrap();
                assert!(
                    verify_inclusion(leaf, &path, &tree.root()),
                    "n={} i={}",
                    n,
                    i
                );
            }
        }
    }

    #[test]
    fn test_prove_out_of_range() {
        let tree = MerkleTree::build(&leaves(2)).unwrap();
        assert!(matches!(
            tree.prove(2),
            Err(MerkleError::IndexOutOfRange { index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_from_layers_detects_tampering() {
        let tree = MerkleTree::build(&leaves(4)).unwrap();
        let mut layers = tree.layers().to_vec();
        layers[1][0] = Bytes32::new([0xee; 32]);
        assert!(matches!(
            MerkleTree::from_layers(layers),
            Err(MerkleError::LayerMismatch(1))
        ));
    }

    #[test]
    fn test_from_layers_detects_truncation() {
        let tree = MerkleTree::build(&leaves(4)).unwrap();
        let mut layers = tree.layers().to_vec();
        layers.pop();
        assert!(matches!(
            MerkleTree::from_layers(layers),
            Err(MerkleError::LayerCount { expected: 3, got: 2 })
        ));
    }
}
