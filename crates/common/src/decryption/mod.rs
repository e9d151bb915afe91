//! Policy-gated decryption
//!
//! Content is encrypted under a [`Policy`] and can only be decrypted by a
//! network that evaluates the access gate first. Key material never reaches
//! the orchestrator.

mod envelope;
mod memory;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::crypto::{Address, BLAKE3_HASH_SIZE};
use crate::gate::{DenyReason, Policy};

pub use envelope::{CiphertextEnvelope, EnvelopeError, ENVELOPE_VERSION};
pub use memory::MemoryDecryptionNetwork;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecryptionError {
    #[error("decryption denied: {0}")]
    Denied(DenyReason),
    #[error("transient decryption network failure: {0}")]
    Transient(String),
    #[error("decryption failed: {0}")]
    Crypto(String),
}

impl DecryptionError {
    pub fn is_transient(&self) -> bool {
        matches!(self, DecryptionError::Transient(_))
    }
}

/// Ciphertext plus the hash of the plaintext it was produced from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiphertextHandle {
    pub ciphertext: Vec<u8>,
    pub data_hash: [u8; BLAKE3_HASH_SIZE],
}

#[derive(Debug, Clone)]
pub struct DecryptRequest {
    pub handle: CiphertextHandle,
    pub policy: Policy,
    pub caller: Address,
    pub requested_cid: String,
}

#[async_trait]
pub trait DecryptionNetwork: Send + Sync + Debug {
    async fn encrypt_under_policy(
        &self,
        plaintext: &[u8],
        policy: &Policy,
    ) -> Result<CiphertextHandle, DecryptionError>;

    /// Release the plaintext if the access gate grants `request`
    async fn decrypt_under_policy(&self, request: DecryptRequest)
        -> Result<Vec<u8>, DecryptionError>;
}
