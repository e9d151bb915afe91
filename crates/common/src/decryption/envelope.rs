use serde::{Deserialize, Serialize};

use crate::crypto::BLAKE3_HASH_SIZE;
use crate::gate::Policy;

use super::CiphertextHandle;

/// Current envelope format
pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid envelope document: {0}")]
    Document(#[from] serde_json::Error),
}

/// What gets stored for each entry: the ciphertext handle together with the
///  policy a reader must present to have it decrypted.
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CiphertextEnvelope {
    pub version: u32,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub ciphertext: Vec<u8>,
    #[serde_as(as = "serde_with::hex::Hex")]
    pub data_hash: [u8; BLAKE3_HASH_SIZE],
    pub policy: Policy,
}

impl CiphertextEnvelope {
    pub fn new(handle: CiphertextHandle, policy: Policy) -> Self {
        Self {
            version: ENVELOPE_VERSION,
            ciphertext: handle.ciphertext,
            data_hash: handle.data_hash,
            policy,
        }
    }

    pub fn handle(&self) -> CiphertextHandle {
        CiphertextHandle {
            ciphertext: self.ciphertext.clone(),
            data_hash: self.data_hash,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let envelope: Self = serde_json::from_slice(bytes)?;
        if envelope.version != ENVELOPE_VERSION {
            return Err(EnvelopeError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope)
    }
}
