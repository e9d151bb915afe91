use crate::crypto::{derive_nullifier, Password, VaultId};
use crate::decryption::{CiphertextEnvelope, DecryptRequest};
use crate::gate::{self, Decision, DenyReason, Policy};
use crate::ledger::TxRequest;
use crate::proof::{Proof, ProofInputBuilder, ProofInputs};
use crate::vault::Entry;

use super::retry::retry_transient;
use super::{VaultError, VaultOrchestrator};

impl VaultOrchestrator {
    /// Prove knowledge of `password` for `vault_id` and decrypt entry `index`.
    ///
    /// The nullifier for (password, account, vault) is spent at most once. If
    /// it was already spent by an earlier run that still holds access, the
    /// proof step is skipped; if it was spent and access is gone, the request
    /// is a replay.
    pub async fn decrypt(
        &self,
        password: &Password,
        vault_id: &VaultId,
        index: u64,
    ) -> Result<Vec<u8>, VaultError> {
        let user = self.account();
        let (state, manifest, _) = self.load_manifest(vault_id).await?;
        let entry = retry_transient(&self.config.retry, "read entry", || {
            self.ledger.get_entry(vault_id, index)
        })
        .await?;
        if !entry.active {
            return Err(VaultError::Denied(DenyReason::EntryRemoved));
        }

        let nullifier = derive_nullifier(password, &user, vault_id);
        let spent = retry_transient(&self.config.retry, "read nullifier", || {
            self.ledger.is_nullifier_spent(&nullifier)
        })
        .await?;

        if spent {
            let has_access = retry_transient(&self.config.retry, "read access", || {
                self.ledger.check_access(vault_id, &user)
            })
            .await?;
            if !has_access {
                return Err(VaultError::ReplayDetected(nullifier));
            }
            tracing::debug!(
                vault_id = %vault_id,
                nullifier = %nullifier,
                "nullifier already spent by this account, access held"
            );
        } else {
            let inputs = ProofInputBuilder::build(
                password,
                &entry,
                &user,
                vault_id,
                &manifest,
                &state.merkle_root,
            )?;
            let proof = self.prove(&inputs).await?;
            self.submit_proof(vault_id, &inputs, proof).await?;
        }

        self.release(vault_id, &entry).await
    }

    /// [`VaultOrchestrator::decrypt`] for the newest active entry tagged `tag`
    pub async fn decrypt_tag(
        &self,
        password: &Password,
        vault_id: &VaultId,
        tag: &str,
    ) -> Result<Vec<u8>, VaultError> {
        let entries = retry_transient(&self.config.retry, "read entries", || {
            self.ledger.get_all_entries(vault_id)
        })
        .await?;
        let index = entries
            .iter()
            .rev()
            .find(|e| e.active && e.tag == tag)
            .map(|e| e.index)
            .ok_or_else(|| {
                VaultError::Validation(format!("no active entry tagged {:?} in {}", tag, vault_id))
            })?;
        self.decrypt(password, vault_id, index).await
    }

    /// Drop this account's access to `vault_id`. The nullifier stays spent.
    pub async fn revoke_access(&self, vault_id: &VaultId) -> Result<(), VaultError> {
        let user = self.account();
        self.write(
            TxRequest::RevokeOwnAccess {
                vault_id: *vault_id,
            },
            &format!("{}:revoke:{}", vault_id, user),
            || async { Ok::<_, VaultError>(!self.ledger.check_access(vault_id, &user).await?) },
        )
        .await?;
        tracing::info!(vault_id = %vault_id, user = %user, "access revoked");
        Ok(())
    }

    /// Prove on a blocking worker, then check the proof locally before it
    ///  costs a transaction.
    async fn prove(&self, inputs: &ProofInputs) -> Result<Proof, VaultError> {
        let prover = self.prover.clone();
        let circuit = self.config.circuit_id.clone();
        let witness = inputs.private_inputs.clone();
        let proof = tokio::task::spawn_blocking(move || prover.prove(&circuit, &witness))
            .await
            .map_err(|e| VaultError::transient("prover", format!("prover task failed: {}", e)))??;

        if proof.public_inputs != inputs.public_inputs {
            return Err(VaultError::ProofInvalid(
                "prover returned different public inputs".to_string(),
            ));
        }
        let valid = self.prover.verify(
            &self.config.circuit_id,
            &proof.bytes,
            &proof.public_inputs,
        )?;
        if !valid {
            return Err(VaultError::ProofInvalid(
                "proof failed local verification".to_string(),
            ));
        }
        Ok(proof)
    }

    async fn submit_proof(
        &self,
        vault_id: &VaultId,
        inputs: &ProofInputs,
        proof: Proof,
    ) -> Result<(), VaultError> {
        let user = self.account();
        let nullifier = inputs.nullifier;
        self.write(
            TxRequest::SubmitProof {
                vault_id: *vault_id,
                nullifier,
                proof,
            },
            &format!("{}:{}", vault_id, nullifier),
            || async {
                Ok::<_, VaultError>(
                    self.ledger.is_nullifier_spent(&nullifier).await?
                        && self.ledger.check_access(vault_id, &user).await?,
                )
            },
        )
        .await?;
        tracing::info!(
            vault_id = %vault_id,
            user = %user,
            nullifier = %nullifier,
            "proof accepted, access granted"
        );
        Ok(())
    }

    /// Re-check the gate against fresh registry state, then ask the network
    ///  to decrypt with the policy the content was encrypted under.
    async fn release(&self, vault_id: &VaultId, entry: &Entry) -> Result<Vec<u8>, VaultError> {
        let user = self.account();
        let snapshot = retry_transient(&self.config.retry, "read gate snapshot", || {
            gate::read_snapshot(self.ledger.as_ref(), vault_id, &user)
        })
        .await?;
        if let Decision::Deny(reason) = gate::evaluate(vault_id, &entry.cid, &user, &snapshot) {
            return Err(VaultError::Denied(reason));
        }

        let bytes = retry_transient(&self.config.retry, "fetch ciphertext", || {
            self.storage.get(&entry.cid)
        })
        .await?;
        let envelope = CiphertextEnvelope::from_json(&bytes)?;
        let expected = Policy::new(self.config.registry.clone(), *vault_id, entry.commitment);
        if envelope.policy != expected {
            return Err(VaultError::Integrity(format!(
                "ciphertext {} is not bound to entry {} of vault {}",
                entry.cid, entry.index, vault_id
            )));
        }

        let plaintext = retry_transient(&self.config.retry, "decrypt", || {
            self.network.decrypt_under_policy(DecryptRequest {
                handle: envelope.handle(),
                policy: envelope.policy.clone(),
                caller: user,
                requested_cid: entry.cid.clone(),
            })
        })
        .await?;
        tracing::info!(
            vault_id = %vault_id,
            index = entry.index,
            bytes = plaintext.len(),
            "content decrypted"
        );
        Ok(plaintext)
    }
}
