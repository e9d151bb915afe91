//! # Vault manifest
//!
//! The manifest is the off-ledger document describing a vault's Merkle tree.
//! The registry only stores its root and a pointer to it. It contains:
//!
//! - **Version**: the document format, currently [`MANIFEST_VERSION`]
//! - **Root**: the declared Merkle root
//! - **Entries**: tag, cid, index, leaf, and commitment for every entry ever added
//! - **Tree**: every layer of the tree, leaves first
//!
//! ## Trust
//!
//! A manifest read from storage is untrusted. [`VaultManifest::verify`]
//! recomputes every layer from the leaves and checks them against the
//! declared root, and [`VaultManifest::verify_against`] additionally requires
//! that root to equal the one the registry holds.
//!
//! ## Removed entries
//!
//! Entries stay in the tree after removal. The tree position of an entry is
//! its registry index, and removal is enforced by the access gate against the
//! registry's `active` flag, not by the tree.

use serde::{Deserialize, Serialize};

use crate::crypto::{derive_tag_commitment, Bytes32, Commitment, Leaf, VaultId};
use crate::merkle::{MerkleError, MerkleTree};

use super::entry::Entry;

/// Current manifest document format
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ManifestError {
    #[error("unsupported manifest version {0}")]
    UnsupportedVersion(u32),
    #[error("merkle error: {0}")]
    Merkle(#[from] MerkleError),
    #[error("entry at position {position} has index {index}")]
    IndexGap { position: usize, index: u64 },
    #[error("leaf of entry {0} does not match the tree")]
    LeafMismatch(u64),
    #[error("declared root {declared} does not match computed root {computed}")]
    RootMismatch { declared: Bytes32, computed: Bytes32 },
    #[error("manifest root {manifest} does not match registry root {registry}")]
    RegistryRootMismatch { manifest: Bytes32, registry: Bytes32 },
    #[error("invalid manifest document: {0}")]
    Document(String),
}

/// One entry as listed in the manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub tag: String,
    pub cid: String,
    pub index: u64,
    pub commitment: Commitment,
    pub leaf: Leaf,
}

impl ManifestEntry {
    /// Derive the leaf and commitment for `tag` inside `vault_id`
    pub fn derive(vault_id: &VaultId, index: u64, tag: &str, cid: &str) -> Self {
        let (leaf, commitment) = derive_tag_commitment(vault_id, tag);
        Self {
            tag: tag.to_string(),
            cid: cid.to_string(),
            index,
            commitment,
            leaf,
        }
    }
}

impl From<&Entry> for ManifestEntry {
    fn from(entry: &Entry) -> Self {
        Self {
            tag: entry.tag.clone(),
            cid: entry.cid.clone(),
            index: entry.index,
            commitment: entry.commitment,
            leaf: entry.leaf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultManifest {
    version: u32,
    merkle_root: Bytes32,
    entries: Vec<ManifestEntry>,
    tree: Vec<Vec<Bytes32>>,
}

impl VaultManifest {
    /// Build a manifest over `entries`, which must be in index order
    ///  starting from zero.
    pub fn build(entries: Vec<ManifestEntry>) -> Result<Self, ManifestError> {
        check_indices(&entries)?;
        let leaves: Vec<Bytes32> = entries.iter().map(|e| e.leaf.into()).collect();
        let tree = MerkleTree::build(&leaves)?;
        Ok(Self {
            version: MANIFEST_VERSION,
            merkle_root: tree.root(),
            entries,
            tree: tree.layers().to_vec(),
        })
    }

    /// Build from registry entries plus any pending ones not yet recorded
    pub fn from_entries(
        recorded: &[Entry],
        pending: impl IntoIterator<Item = ManifestEntry>,
    ) -> Result<Self, ManifestError> {
        let mut entries: Vec<ManifestEntry> = recorded.iter().map(ManifestEntry::from).collect();
        entries.extend(pending);
        Self::build(entries)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn merkle_root(&self) -> Bytes32 {
        self.merkle_root
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn entry(&self, index: u64) -> Option<&ManifestEntry> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
            .filter(|e| e.index == index)
    }

    pub fn tree(&self) -> &[Vec<Bytes32>] {
        &self.tree
    }

    /// Recompute the tree from its leaves and check it against the
    ///  declared root and the entry list.
    pub fn verify(&self) -> Result<MerkleTree, ManifestError> {
        if self.version != MANIFEST_VERSION {
            return Err(ManifestError::UnsupportedVersion(self.version));
        }
        check_indices(&self.entries)?;

        let tree = MerkleTree::from_layers(self.tree.clone())?;
        if tree.len() != self.entries.len() {
            return Err(ManifestError::LeafMismatch(tree.len() as u64));
        }
        for (entry, leaf) in self.entries.iter().zip(tree.leaves()) {
            if Bytes32::from(entry.leaf) != *leaf {
                return Err(ManifestError::LeafMismatch(entry.index));
            }
        }

        let computed = tree.root();
        if computed != self.merkle_root {
            return Err(ManifestError::RootMismatch {
                declared: self.merkle_root,
                computed,
            });
        }
        Ok(tree)
    }

    /// [`VaultManifest::verify`], then require the root the registry holds
    pub fn verify_against(&self, registry_root: &Bytes32) -> Result<MerkleTree, ManifestError> {
        let tree = self.verify()?;
        if tree.root() != *registry_root {
            return Err(ManifestError::RegistryRootMismatch {
                manifest: tree.root(),
                registry: *registry_root,
            });
        }
        Ok(tree)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, ManifestError> {
        serde_json::to_vec_pretty(self).map_err(|e| ManifestError::Document(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        serde_json::from_slice(bytes).map_err(|e| ManifestError::Document(e.to_string()))
    }
}

fn check_indices(entries: &[ManifestEntry]) -> Result<(), ManifestError> {
    if entries.is_empty() {
        return Err(MerkleError::Empty.into());
    }
    for (position, entry) in entries.iter().enumerate() {
        if entry.index != position as u64 {
            return Err(ManifestError::IndexGap {
                position,
                index: entry.index,
            });
        }
    }
    Ok(())
}
