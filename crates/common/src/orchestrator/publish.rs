use serde::{Deserialize, Serialize};

use crate::crypto::{
    derive_password_hash, derive_tag_commitment, derive_vault_id, Bytes32, Password, VaultId,
};
use crate::decryption::CiphertextEnvelope;
use crate::gate::Policy;
use crate::ledger::TxRequest;
use crate::vault::{ManifestEntry, RegistryEvent, StorageProvider, VaultManifest};

use super::retry::retry_transient;
use super::{VaultError, VaultOrchestrator, WriteOutcome};

/// Result of publishing one piece of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedEntry {
    pub vault_id: VaultId,
    pub index: u64,
    pub tag: String,
    /// Content id of the ciphertext envelope
    pub cid: String,
    pub manifest_id: String,
    pub merkle_root: Bytes32,
}

impl VaultOrchestrator {
    /// Register a new vault owned by this orchestrator's account.
    ///
    /// The id is derived locally and must match the one in the
    /// `VaultCreated` event.
    pub async fn create_vault(&self, password: &Password) -> Result<VaultId, VaultError> {
        if password.is_empty() {
            return Err(VaultError::Validation("password must not be empty".into()));
        }
        let owner = self.account();
        let password_hash = derive_password_hash(password);
        let vault_id = derive_vault_id(&password_hash, &owner);

        let exists = retry_transient(&self.config.retry, "check vault", || {
            self.ledger.vault_exists(&vault_id)
        })
        .await?;
        if exists {
            return Err(crate::vault::RegistryError::AlreadyExists(vault_id).into());
        }
        let fee = retry_transient(&self.config.retry, "read creation fee", || {
            self.ledger.vault_creation_fee()
        })
        .await?;

        let outcome = self
            .write(
                TxRequest::CreateVault {
                    password_hash,
                    value: fee,
                },
                &vault_id.to_hex(),
                || async {
                    Ok::<_, VaultError>(self.ledger.vault_exists(&vault_id).await?
                        && self.ledger.vault_owner(&vault_id).await? == owner)
                },
            )
            .await?;

        if let WriteOutcome::Confirmed(events) = outcome {
            let created = events.iter().find_map(|e| match e {
                RegistryEvent::VaultCreated { vault_id, .. } => Some(*vault_id),
                _ => None,
            });
            if created != Some(vault_id) {
                return Err(VaultError::Integrity(format!(
                    "derived vault id {} but the registry created {:?}",
                    vault_id, created
                )));
            }
        }

        tracing::info!(vault_id = %vault_id, owner = %owner, fee, "vault created");
        Ok(vault_id)
    }

    /// Encrypt `plaintext` and publish it into `vault_id` under `tag`.
    ///
    /// The new entry's index is predicted from the current entry count before
    /// anything is written. The manifest root is written first, then the
    /// entry. If a concurrent publish took the predicted slot, the entry lands
    /// at the next free index and the manifest is rebuilt from the registry's
    /// entries so the stored root covers it.
    pub async fn add_content(
        &self,
        vault_id: &VaultId,
        tag: &str,
        plaintext: &[u8],
        provider: StorageProvider,
    ) -> Result<PublishedEntry, VaultError> {
        if tag.trim().is_empty() {
            return Err(VaultError::Validation("tag must not be empty".into()));
        }

        let state = self.vault_state(vault_id).await?;
        if state.owner != self.account() {
            return Err(crate::vault::RegistryError::Unauthorized(self.account()).into());
        }

        let (_, commitment) = derive_tag_commitment(vault_id, tag);
        let policy = Policy::new(self.config.registry.clone(), *vault_id, commitment);

        let handle = retry_transient(&self.config.retry, "encrypt", || {
            self.network.encrypt_under_policy(plaintext, &policy)
        })
        .await?;
        let envelope = CiphertextEnvelope::new(handle, policy.clone()).to_json()?;
        let cid = retry_transient(&self.config.retry, "store ciphertext", || {
            self.storage.put(envelope.clone())
        })
        .await?;

        // fresh read: the prediction must not come from a stale state
        let recorded = retry_transient(&self.config.retry, "read entries", || {
            self.ledger.get_all_entries(vault_id)
        })
        .await?;
        let index = recorded.len() as u64;
        let manifest = VaultManifest::from_entries(
            &recorded,
            Some(ManifestEntry::derive(vault_id, index, tag, &cid)),
        )?;
        let (merkle_root, manifest_id) = self.publish_manifest(vault_id, &manifest).await?;

        let entry_key = format!("{}:{}", vault_id, index);
        let outcome = self
            .write(
                TxRequest::AddEntry {
                    vault_id: *vault_id,
                    cid: cid.clone(),
                    tag: tag.to_string(),
                    provider,
                },
                &entry_key,
                || async {
                    if self.ledger.get_entry_count(vault_id).await? <= index {
                        return Ok::<_, VaultError>(false);
                    }
                    let entry = self.ledger.get_entry(vault_id, index).await?;
                    if entry.cid == cid && entry.tag == tag {
                        Ok(true)
                    } else {
                        Err(VaultError::Integrity(format!(
                            "entry {} of vault {} was taken by another write",
                            index, vault_id
                        )))
                    }
                },
            )
            .await?;

        let (index, merkle_root, manifest_id) = match outcome {
            WriteOutcome::Confirmed(events) => {
                let assigned = events.iter().find_map(|e| match e {
                    RegistryEvent::EntryAdded { index, .. } => Some(*index),
                    _ => None,
                });
                match assigned {
                    Some(assigned) if assigned == index => (index, merkle_root, manifest_id),
                    // another write took the predicted slot; the root written
                    //  above does not cover this entry
                    Some(assigned) => {
                        tracing::warn!(
                            vault_id = %vault_id,
                            predicted = index,
                            assigned,
                            "entry landed at another index, republishing manifest"
                        );
                        let (root, id) = self.republish_manifest(vault_id).await?;
                        (assigned, root, id)
                    }
                    None => {
                        return Err(VaultError::Integrity(format!(
                            "entry write to vault {} confirmed without an EntryAdded event",
                            vault_id
                        )))
                    }
                }
            }
            WriteOutcome::Observed => (index, merkle_root, manifest_id),
        };

        tracing::info!(
            vault_id = %vault_id,
            index,
            tag,
            cid = %cid,
            manifest_id = %manifest_id,
            "content published"
        );
        Ok(PublishedEntry {
            vault_id: *vault_id,
            index,
            tag: tag.to_string(),
            cid,
            manifest_id,
            merkle_root,
        })
    }

    /// Store `manifest` and point the registry at it.
    async fn publish_manifest(
        &self,
        vault_id: &VaultId,
        manifest: &VaultManifest,
    ) -> Result<(Bytes32, String), VaultError> {
        let merkle_root = manifest.merkle_root();
        let manifest_bytes = manifest.to_json()?;
        let manifest_id = retry_transient(&self.config.retry, "store manifest", || {
            self.storage.put(manifest_bytes.clone())
        })
        .await?;

        let root_key = format!("{}:root:{}", vault_id, merkle_root);
        self.write(
            TxRequest::UpdateManifest {
                vault_id: *vault_id,
                root: merkle_root,
                manifest_id: manifest_id.clone(),
            },
            &root_key,
            || async {
                let state = self.ledger.vault_state(vault_id).await?;
                Ok::<_, VaultError>(state.merkle_root == merkle_root
                    && state.manifest_id.as_deref() == Some(manifest_id.as_str()))
            },
        )
        .await?;
        Ok((merkle_root, manifest_id))
    }

    /// Rebuild the manifest from every entry the registry lists and publish it
    async fn republish_manifest(&self, vault_id: &VaultId) -> Result<(Bytes32, String), VaultError> {
        let recorded = retry_transient(&self.config.retry, "read entries", || {
            self.ledger.get_all_entries(vault_id)
        })
        .await?;
        let manifest = VaultManifest::from_entries(&recorded, None)?;
        self.publish_manifest(vault_id, &manifest).await
    }

    /// Mark entry `index` inactive. Its slot and tree position stay.
    pub async fn remove_entry(&self, vault_id: &VaultId, index: u64) -> Result<(), VaultError> {
        let key = format!("{}:{}", vault_id, index);
        self.write(
            TxRequest::RemoveEntry {
                vault_id: *vault_id,
                index,
            },
            &key,
            || async {
                Ok::<_, VaultError>(!self.ledger.get_entry(vault_id, index).await?.active)
            },
        )
        .await?;
        tracing::info!(vault_id = %vault_id, index, "entry removed");
        Ok(())
    }
}
