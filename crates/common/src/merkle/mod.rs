//! Append-only binary Merkle tree over vault entry leaves
//!
//! - Layer 0 holds entry leaves in registry index order
//! - Parents are `H("merkle-node" | left | right)`
//! - An odd node at the end of a layer is paired with the all-zero node
//! - A tree over zero leaves is an error, not a sentinel root
//!
//! The whole tree is rebuilt on every entry addition. Vaults hold tens to low
//! thousands of entries, so the rebuild is cheap, and the layer layout
//! is the same as an incremental tree would produce.

mod proof;
mod tree;

pub use proof::{verify_inclusion, MerklePath};
pub use tree::{build_tree, hash_node, prove_inclusion, MerkleTree};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MerkleError {
    #[error("cannot build a merkle tree over zero leaves")]
    Empty,
    #[error("leaf index {index} out of range for {len} leaves")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("expected {expected} layers, got {got}")]
    LayerCount { expected: usize, got: usize },
    #[error("layer {0} does not match the layer recomputed from the leaves")]
    LayerMismatch(usize),
}
