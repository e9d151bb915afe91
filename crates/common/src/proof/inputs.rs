use crate::crypto::{
    derive_nullifier, derive_password_hash, derive_tag_commitment, Address, Bytes32, Commitment,
    Nullifier, Password, VaultId,
};
use crate::vault::{Entry, ManifestError, VaultManifest};

use super::backend::{PrivateInputs, PublicInputs};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    /// A recorded value disagrees with the one recomputed from the tag
    #[error("entry {index}: {field} does not match the recomputed value")]
    EntryMismatch { index: u64, field: &'static str },
    #[error("entry index {index} out of range for a manifest of {len} entries")]
    IndexOutOfRange { index: u64, len: usize },
    #[error("manifest integrity: {0}")]
    Integrity(#[from] ManifestError),
}

/// Everything needed to prove and then submit one access request
#[derive(Debug, Clone)]
pub struct ProofInputs {
    pub private_inputs: PrivateInputs,
    pub public_inputs: PublicInputs,
    pub nullifier: Nullifier,
    pub commitment: Commitment,
}

/// Assembles the witness for the vault access circuit
///
/// Stateless. It never calls the prover, and the password only lives in the
/// returned [`PrivateInputs`], which wipes it on drop. The manifest must
/// reproduce `registry_root`, the root the registry currently holds for the
/// vault; a self-consistent manifest under any other root is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProofInputBuilder;

impl ProofInputBuilder {
    pub fn build(
        password: &Password,
        entry: &Entry,
        user: &Address,
        vault_id: &VaultId,
        manifest: &VaultManifest,
        registry_root: &Bytes32,
    ) -> Result<ProofInputs, InputError> {
        let index = entry.index;
        let listed = manifest
            .entry(index)
            .ok_or(InputError::IndexOutOfRange {
                index,
                len: manifest.entries().len(),
            })?;
        let mismatch = |field| InputError::EntryMismatch { index, field };

        // entry-level checks come first so a tampered leaf is reported as such
        //  rather than as a generic layer mismatch
        let (leaf, commitment) = derive_tag_commitment(vault_id, &entry.tag);
        if entry.leaf != leaf || listed.leaf != leaf {
            return Err(mismatch("leaf"));
        }
        if entry.commitment != commitment || listed.commitment != commitment {
            return Err(mismatch("commitment"));
        }
        if listed.tag != entry.tag {
            return Err(mismatch("tag"));
        }
        if listed.cid != entry.cid {
            return Err(mismatch("cid"));
        }
        let tree_leaf = manifest
            .tree()
            .first()
            .and_then(|leaves| usize::try_from(index).ok().and_then(|i| leaves.get(i)));
        if tree_leaf != Some(&Bytes32::from(leaf)) {
            return Err(mismatch("tree leaf"));
        }

        let tree = manifest.verify_against(registry_root)?;
        let path = tree.prove(index as usize).map_err(ManifestError::from)?;

        let password_hash = derive_password_hash(password);
        let nullifier = derive_nullifier(password, user, vault_id);
        let private_inputs = PrivateInputs {
            password: password.clone(),
            password_hash,
            user: *user,
            vault_id: *vault_id,
            nullifier,
            leaf,
            commitment,
            path,
            merkle_root: tree.root(),
        };
        let public_inputs = private_inputs.public_inputs();

        tracing::debug!(
            vault_id = %vault_id,
            index,
            nullifier = %nullifier,
            "built proof inputs"
        );
        Ok(ProofInputs {
            private_inputs,
            public_inputs,
            nullifier,
            commitment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{derive_vault_id, Leaf};
    use crate::merkle::verify_inclusion;
    use crate::vault::{ManifestEntry, StorageProvider};

    struct Fixture {
        password: Password,
        vault_id: VaultId,
        entries: Vec<Entry>,
    }

    fn fixture() -> Fixture {
        let password = Password::from("p1");
        let owner = Address::new([1; 20]);
        let vault_id = derive_vault_id(&derive_password_hash(&password), &owner);
        let entries = ["doc", "photo", "notes"]
            .iter()
            .enumerate()
            .map(|(i, tag)| {
                let (leaf, commitment) = derive_tag_commitment(&vault_id, tag);
                Entry {
                    index: i as u64,
                    tag: tag.to_string(),
                    cid: format!("Qm{}", i),
                    provider: StorageProvider::Ipfs,
                    created_at: 0,
                    leaf,
                    commitment,
                    active: true,
                }
            })
            .collect();
        Fixture {
            password,
            vault_id,
            entries,
        }
    }

    fn registry_root(f: &Fixture) -> Bytes32 {
        VaultManifest::from_entries(&f.entries, None)
            .unwrap()
            .merkle_root()
    }

    fn manifest_json(f: &Fixture) -> serde_json::Value {
        let manifest = VaultManifest::from_entries(&f.entries, None).unwrap();
        serde_json::from_slice(&manifest.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_build_produces_consistent_inputs() {
        let f = fixture();
        let manifest = VaultManifest::from_entries(&f.entries, None).unwrap();
        let user = Address::new([2; 20]);

        let inputs = ProofInputBuilder::build(
            &f.password,
            &f.entries[1],
            &user,
            &f.vault_id,
            &manifest,
            &manifest.merkle_root(),
        )
        .unwrap();

        assert_eq!(
            inputs.nullifier,
            derive_nullifier(&f.password, &user, &f.vault_id)
        );
        assert_eq!(inputs.commitment, f.entries[1].commitment);
        assert_eq!(inputs.public_inputs.merkle_root, manifest.merkle_root());
        assert_eq!(inputs.public_inputs.user, user);
        assert!(verify_inclusion(
            &f.entries[1].leaf.into(),
            &inputs.private_inputs.path,
            &manifest.merkle_root()
        ));
    }

    #[test]
    fn test_build_is_deterministic() {
        let f = fixture();
        let manifest = VaultManifest::from_entries(&f.entries, None).unwrap();
        let user = Address::new([2; 20]);
        let root = manifest.merkle_root();
        let a = ProofInputBuilder::build(&f.password, &f.entries[0], &user, &f.vault_id, &manifest, &root)
            .unwrap();
        let b = ProofInputBuilder::build(&f.password, &f.entries[0], &user, &f.vault_id, &manifest, &root)
            .unwrap();
        assert_eq!(a.public_inputs, b.public_inputs);
    }

    #[test]
    fn test_tampered_manifest_entry_leaf() {
        let f = fixture();
        let mut doc = manifest_json(&f);
        doc["entries"][0]["leaf"] = serde_json::json!(Leaf::new([0xaa; 32]).to_hex());
        let manifest: VaultManifest = serde_json::from_value(doc).unwrap();

        let err = ProofInputBuilder::build(
            &f.password,
            &f.entries[0],
            &Address::new([2; 20]),
            &f.vault_id,
            &manifest,
            &registry_root(&f),
        )
        .unwrap_err();
        assert_eq!(
            err,
            InputError::EntryMismatch {
                index: 0,
                field: "leaf"
            }
        );
    }

    #[test]
    fn test_tampered_tree_leaf() {
        let f = fixture();
        let mut doc = manifest_json(&f);
        doc["tree"][0][2] = serde_json::json!(Bytes32::new([0xbb; 32]).to_hex());
        let manifest: VaultManifest = serde_json::from_value(doc).unwrap();

        let err = ProofInputBuilder::build(
            &f.password,
            &f.entries[2],
            &Address::new([2; 20]),
            &f.vault_id,
            &manifest,
            &registry_root(&f),
        )
        .unwrap_err();
        assert!(matches!(err, InputError::EntryMismatch { index: 2, .. }));
    }

    #[test]
    fn test_tampered_sibling_is_an_integrity_error() {
        let f = fixture();
        let mut doc = manifest_json(&f);
        // entry 0 is untouched, its sibling at layer 0 is not
        doc["tree"][0][1] = serde_json::json!(Bytes32::new([0xcc; 32]).to_hex());
        let manifest: VaultManifest = serde_json::from_value(doc).unwrap();

        let err = ProofInputBuilder::build(
            &f.password,
            &f.entries[0],
            &Address::new([2; 20]),
            &f.vault_id,
            &manifest,
            &registry_root(&f),
        )
        .unwrap_err();
        assert!(matches!(err, InputError::Integrity(_)));
    }

    #[test]
    fn test_entry_beyond_manifest() {
        let f = fixture();
        let manifest =
            VaultManifest::build(vec![ManifestEntry::from(&f.entries[0])]).unwrap();
        let err = ProofInputBuilder::build(
            &f.password,
            &f.entries[2],
            &Address::new([2; 20]),
            &f.vault_id,
            &manifest,
            &registry_root(&f),
        )
        .unwrap_err();
        assert_eq!(err, InputError::IndexOutOfRange { index: 2, len: 1 });
    }

    #[test]
    fn test_substituted_manifest_is_bound_to_registry_root() {
        let f = fixture();
        let (leaf, commitment) = derive_tag_commitment(&f.vault_id, "forged");
        let forged = Entry {
            index: 1,
            tag: "forged".to_string(),
            cid: "QmForged".to_string(),
            leaf,
            commitment,
            ..f.entries[1].clone()
        };
        // consistent on its own, but not the tree the registry committed to
        let manifest = VaultManifest::build(vec![
            ManifestEntry::from(&f.entries[0]),
            ManifestEntry::from(&forged),
        ])
        .unwrap();
        assert!(manifest.verify().is_ok());

        let err = ProofInputBuilder::build(
            &f.password,
            &f.entries[0],
            &Address::new([2; 20]),
            &f.vault_id,
            &manifest,
            &registry_root(&f),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            InputError::Integrity(ManifestError::RegistryRootMismatch { .. })
        ));
    }
}
