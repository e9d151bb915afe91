//! # Vault orchestrator
//!
//! Sequences the two workflows across the ledger, storage, the proof backend,
//! and the decryption network:
//!
//! - **Publish**: derive commitments, encrypt under a policy, store the
//!   envelope, rebuild and store the manifest, write root then entry
//! - **Unlock**: verify the manifest against the registry, build inputs,
//!   prove, submit the nullifier, re-check the gate, request decryption
//!
//! ## Partial failure
//!
//! Every external system can fail independently. Reads and storage calls are
//! retried with backoff when the failure is transient. A ledger write whose
//! outcome is unknown (submission or receipt timed out) is never blindly
//! re-sent: the registry is re-read first, and the write is only submitted
//! again if it demonstrably did not land. Each write names the registry
//! state that proves it applied (its idempotence key).
//!
//! All collaborators are injected as `Arc<dyn ..>` handles. The orchestrator
//! holds no mutable state of its own.

mod error;
mod publish;
mod retry;
mod unlock;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::{derive_vault_id, Address, VaultId};
use crate::decryption::DecryptionNetwork;
use crate::ledger::{LedgerClient, TxRequest};
use crate::merkle::MerkleTree;
use crate::proof::{CircuitId, ProofBackend};
use crate::storage::ContentStore;
use crate::vault::{RegistryEvent, VaultManifest, VaultState};

pub use error::{ErrorCategory, VaultError};
pub use publish::PublishedEntry;
pub use retry::RetryPolicy;

use retry::retry_transient;

/// Default registry label bound into every policy
pub const DEFAULT_REGISTRY: &str = "fangorn-zkgate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub circuit_id: CircuitId,
    /// Identifies the registry deployment in encryption policies
    pub registry: String,
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            circuit_id: CircuitId::default(),
            registry: DEFAULT_REGISTRY.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// How a write with an unknown outcome ended
#[derive(Debug)]
pub(crate) enum WriteOutcome {
    /// A receipt confirmed it
    Confirmed(Vec<RegistryEvent>),
    /// No receipt, but re-reading the registry shows it applied
    Observed,
}

#[derive(Debug, Clone)]
pub struct VaultOrchestrator {
    ledger: Arc<dyn LedgerClient>,
    prover: Arc<dyn ProofBackend>,
    storage: Arc<dyn ContentStore>,
    network: Arc<dyn DecryptionNetwork>,
    config: OrchestratorConfig,
}

impl VaultOrchestrator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        prover: Arc<dyn ProofBackend>,
        storage: Arc<dyn ContentStore>,
        network: Arc<dyn DecryptionNetwork>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            ledger,
            prover,
            storage,
            network,
            config,
        }
    }

    /// The account this orchestrator signs as
    pub fn account(&self) -> Address {
        self.ledger.account()
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Read the vault, fetch its manifest, and check the manifest against
    ///  the root the registry holds.
    pub async fn load_manifest(
        &self,
        vault_id: &VaultId,
    ) -> Result<(VaultState, VaultManifest, MerkleTree), VaultError> {
        let state = self.vault_state(vault_id).await?;
        let manifest_id = state.manifest_id.clone().ok_or_else(|| {
            VaultError::Validation(format!("vault {} has no published manifest", vault_id))
        })?;

        let bytes = retry_transient(&self.config.retry, "fetch manifest", || {
            self.storage.get(&manifest_id)
        })
        .await?;
        let manifest = VaultManifest::from_json(&bytes)?;
        let tree = manifest.verify_against(&state.merkle_root)?;
        tracing::debug!(
            vault_id = %vault_id,
            manifest_id = %manifest_id,
            entries = manifest.entries().len(),
            "loaded manifest"
        );
        Ok((state, manifest, tree))
    }

    /// Read a vault and check that its owner and password hash still derive
    ///  the id it is keyed under.
    pub(crate) async fn vault_state(&self, vault_id: &VaultId) -> Result<VaultState, VaultError> {
        let state = retry_transient(&self.config.retry, "read vault", || {
            self.ledger.vault_state(vault_id)
        })
        .await?;

        let derived = derive_vault_id(&state.password_hash, &state.owner);
        if derived != *vault_id || state.vault_id != *vault_id {
            tracing::error!(
                vault_id = %vault_id,
                reported = %state.vault_id,
                derived = %derived,
                "vault state does not derive its id"
            );
            return Err(VaultError::Integrity(format!(
                "vault {} state derives id {}",
                vault_id, derived
            )));
        }
        Ok(state)
    }

    async fn submit_and_wait(&self, tx: &TxRequest) -> Result<Vec<RegistryEvent>, VaultError> {
        let tx_hash = self.ledger.submit(tx.clone()).await?;
        tracing::debug!(tx = tx.name(), %tx_hash, "submitted transaction");
        let receipt = self.ledger.wait_for_receipt(&tx_hash).await?;
        Ok(receipt.into_events()?)
    }

    /// Submit `tx` and see it through to a known outcome.
    ///
    /// `applied` re-reads the registry and reports whether `tx` (identified by
    /// `key`) has already taken effect. It is consulted after every
    /// transient failure, before anything is re-submitted.
    pub(crate) async fn write<A, Fut>(
        &self,
        tx: TxRequest,
        key: &str,
        applied: A,
    ) -> Result<WriteOutcome, VaultError>
    where
        A: Fn() -> Fut,
        Fut: Future<Output = Result<bool, VaultError>>,
    {
        let policy = &self.config.retry;
        let attempts = policy.attempts();
        let mut attempt = 0;
        let mut unknown = false;

        loop {
            attempt += 1;

            if unknown {
                match applied().await {
                    Ok(true) => {
                        tracing::info!(
                            tx = tx.name(),
                            key,
                            "write observed on the registry after an unknown outcome"
                        );
                        return Ok(WriteOutcome::Observed);
                    }
                    Ok(false) => unknown = false,
                    Err(e) if e.is_transient() => {
                        if attempt >= attempts {
                            return Err(VaultError::Transient {
                                operation: tx.name(),
                                attempts: attempt,
                                reason: e.to_string(),
                            });
                        }
                        tokio::time::sleep(policy.delay(attempt)).await;
                        continue;
                    }
                    Err(e) => return Err(e),
                }
            }

            match self.submit_and_wait(&tx).await {
                Ok(events) => {
                    tracing::info!(tx = tx.name(), key, "write confirmed");
                    return Ok(WriteOutcome::Confirmed(events));
                }
                Err(e) if e.is_transient() => {
                    unknown = true;
                    if attempt >= attempts {
                        // one last look before giving up
                        if let Ok(true) = applied().await {
                            return Ok(WriteOutcome::Observed);
                        }
                        return Err(VaultError::Transient {
                            operation: tx.name(),
                            attempts: attempt,
                            reason: e.to_string(),
                        });
                    }
                    let delay = policy.delay(attempt);
                    tracing::warn!(
                        tx = tx.name(),
                        key,
                        attempt,
                        "outcome unknown, re-reading registry in {:?}: {}",
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
