use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::crypto::Secret;
use crate::gate::{self, DenyReason, Policy};
use crate::ledger::{LedgerClient, LedgerError};

use super::{CiphertextHandle, DecryptRequest, DecryptionError, DecryptionNetwork};

/// A single-node stand-in for a threshold decryption network
///
/// Each ciphertext gets its own [`Secret`], held here together with the
/// policy it was encrypted under. Decryption re-reads the registry through
/// the network's own ledger handle and runs the access gate before the key
/// is touched. The caller identity on a request is taken at face value.
#[derive(Debug, Clone)]
pub struct MemoryDecryptionNetwork {
    ledger: Arc<dyn LedgerClient>,
    keys: Arc<RwLock<HashMap<[u8; 32], (Secret, Policy)>>>,
}

fn handle_id(handle: &CiphertextHandle) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&handle.data_hash);
    hasher.update(&handle.ciphertext);
    *hasher.finalize().as_bytes()
}

impl MemoryDecryptionNetwork {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self {
            ledger,
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl DecryptionNetwork for MemoryDecryptionNetwork {
    async fn encrypt_under_policy(
        &self,
        plaintext: &[u8],
        policy: &Policy,
    ) -> Result<CiphertextHandle, DecryptionError> {
        let secret = Secret::generate().map_err(|e| DecryptionError::Crypto(e.to_string()))?;
        let (ciphertext, data_hash) = secret
            .encrypt(plaintext)
            .map_err(|e| DecryptionError::Crypto(e.to_string()))?;
        let handle = CiphertextHandle {
            ciphertext,
            data_hash,
        };
        self.keys
            .write()
            .insert(handle_id(&handle), (secret, policy.clone()));
        Ok(handle)
    }

    async fn decrypt_under_policy(
        &self,
        request: DecryptRequest,
    ) -> Result<Vec<u8>, DecryptionError> {
        let (secret, bound) = self
            .keys
            .read()
            .get(&handle_id(&request.handle))
            .cloned()
            .ok_or_else(|| DecryptionError::Crypto("unknown ciphertext handle".to_string()))?;
        if bound != request.policy {
            return Err(DecryptionError::Denied(DenyReason::PolicyMismatch));
        }

        let snapshot = gate::read_snapshot(
            self.ledger.as_ref(),
            &request.policy.vault_id,
            &request.caller,
        )
        .await
        .map_err(|e| match e {
            LedgerError::Transient(msg) => DecryptionError::Transient(msg),
            _ => DecryptionError::Denied(DenyReason::UnknownContent),
        })?;

        match gate::evaluate_policy(
            &request.policy,
            &request.requested_cid,
            &request.caller,
            &snapshot,
        ) {
            gate::Decision::Grant => {}
            gate::Decision::Deny(reason) => {
                tracing::debug!(
                    vault_id = %request.policy.vault_id,
                    caller = %request.caller,
                    %reason,
                    "decryption denied"
                );
                return Err(DecryptionError::Denied(reason));
            }
        }

        secret
            .decrypt(&request.handle.ciphertext, &request.handle.data_hash)
            .map_err(|e| DecryptionError::Crypto(e.to_string()))
    }
}
