use std::fmt;

use crate::crypto::Nullifier;
use crate::decryption::{DecryptionError, EnvelopeError};
use crate::gate::DenyReason;
use crate::ledger::LedgerError;
use crate::proof::{InputError, ProofError};
use crate::storage::StorageError;
use crate::vault::{ManifestError, RegistryError};

/// How a failure should be handled by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Bad input, caught before anything reached the ledger
    Validation,
    /// Not allowed; retrying won't help
    Authorization,
    /// A nullifier was already spent. Terminal.
    Replay,
    /// State read from somewhere does not check out; abort the operation
    Integrity,
    /// An external system did not answer; safe to retry after re-reading state
    TransientInfrastructure,
    /// The proof was rejected
    ProofInvalid,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Authorization => "authorization",
            ErrorCategory::Replay => "replay",
            ErrorCategory::Integrity => "integrity",
            ErrorCategory::TransientInfrastructure => "transient",
            ErrorCategory::ProofInvalid => "proof-invalid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("registry rejected the request: {0}")]
    Registry(RegistryError),
    #[error("access denied: {0}")]
    Denied(DenyReason),
    #[error("replay detected: nullifier {0} already spent")]
    ReplayDetected(Nullifier),
    #[error("integrity violation: {0}")]
    Integrity(String),
    #[error("manifest: {0}")]
    Manifest(#[from] ManifestError),
    #[error("proof inputs: {0}")]
    Inputs(#[from] InputError),
    #[error("envelope: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("proof invalid: {0}")]
    ProofInvalid(String),
    #[error("{operation} did not complete after {attempts} attempts: {reason}")]
    Transient {
        operation: &'static str,
        attempts: u32,
        reason: String,
    },
}

impl VaultError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            VaultError::Validation(_) => ErrorCategory::Validation,
            VaultError::Registry(e) => registry_category(e),
            VaultError::Denied(_) => ErrorCategory::Authorization,
            VaultError::ReplayDetected(_) => ErrorCategory::Replay,
            VaultError::Integrity(_)
            | VaultError::Manifest(_)
            | VaultError::Inputs(_)
            | VaultError::Envelope(_) => ErrorCategory::Integrity,
            VaultError::ProofInvalid(_) => ErrorCategory::ProofInvalid,
            VaultError::Transient { .. } => ErrorCategory::TransientInfrastructure,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.category() == ErrorCategory::TransientInfrastructure
    }

    pub(crate) fn transient(operation: &'static str, reason: impl fmt::Display) -> Self {
        VaultError::Transient {
            operation,
            attempts: 1,
            reason: reason.to_string(),
        }
    }
}

fn registry_category(e: &RegistryError) -> ErrorCategory {
    match e {
        RegistryError::InsufficientFee { .. }
        | RegistryError::AlreadyExists(_)
        | RegistryError::ZeroPasswordHash
        | RegistryError::VaultNotFound(_)
        | RegistryError::EntryNotFound(_)
        | RegistryError::EntryInactive(_) => ErrorCategory::Validation,
        RegistryError::Unauthorized(_) => ErrorCategory::Authorization,
        RegistryError::NullifierSpent(_) => ErrorCategory::Replay,
        RegistryError::InvalidProof => ErrorCategory::ProofInvalid,
    }
}

impl From<RegistryError> for VaultError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NullifierSpent(n) => VaultError::ReplayDetected(n),
            RegistryError::InvalidProof => {
                VaultError::ProofInvalid("rejected by the registry verifier".to_string())
            }
            other => VaultError::Registry(other),
        }
    }
}

impl From<LedgerError> for VaultError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Reverted(e) => e.into(),
            LedgerError::Transient(reason) => VaultError::transient("ledger", reason),
            LedgerError::UnknownTransaction(tx) => {
                VaultError::transient("ledger", format!("transaction {} not found", tx))
            }
        }
    }
}

impl From<StorageError> for VaultError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Transient(reason) => VaultError::transient("storage", reason),
            // the registry points at content the store does not have
            StorageError::NotFound(cid) => {
                VaultError::Integrity(format!("referenced content {} is missing", cid))
            }
        }
    }
}

impl From<DecryptionError> for VaultError {
    fn from(e: DecryptionError) -> Self {
        match e {
            DecryptionError::Denied(reason) => VaultError::Denied(reason),
            DecryptionError::Transient(reason) => VaultError::transient("decryption", reason),
            DecryptionError::Crypto(reason) => VaultError::Integrity(reason),
        }
    }
}

impl From<ProofError> for VaultError {
    fn from(e: ProofError) -> Self {
        match e {
            // the prover itself failed; says nothing about the witness
            ProofError::Backend(reason) => VaultError::transient("prover", reason),
            other => VaultError::ProofInvalid(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Address, VaultId};

    #[test]
    fn test_categories() {
        let nullifier = Nullifier::new([1; 32]);
        let cases: Vec<(VaultError, ErrorCategory)> = vec![
            (
                LedgerError::Reverted(RegistryError::NullifierSpent(nullifier)).into(),
                ErrorCategory::Replay,
            ),
            (
                LedgerError::Reverted(RegistryError::Unauthorized(Address::new([1; 20]))).into(),
                ErrorCategory::Authorization,
            ),
            (
                LedgerError::Reverted(RegistryError::VaultNotFound(VaultId::new([1; 32]))).into(),
                ErrorCategory::Validation,
            ),
            (
                LedgerError::Reverted(RegistryError::InvalidProof).into(),
                ErrorCategory::ProofInvalid,
            ),
            (
                LedgerError::Transient("timeout".into()).into(),
                ErrorCategory::TransientInfrastructure,
            ),
            (
                StorageError::NotFound("bafk".into()).into(),
                ErrorCategory::Integrity,
            ),
            (
                DecryptionError::Denied(DenyReason::NoAccess).into(),
                ErrorCategory::Authorization,
            ),
            (
                ManifestError::UnsupportedVersion(2).into(),
                ErrorCategory::Integrity,
            ),
            (
                ProofError::Backend("prover process exited".into()).into(),
                ErrorCategory::TransientInfrastructure,
            ),
            (
                ProofError::Unsatisfied("nullifier").into(),
                ErrorCategory::ProofInvalid,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.category(), expected, "{}", error);
        }
    }

    #[test]
    fn test_spent_nullifier_becomes_replay() {
        let nullifier = Nullifier::new([2; 32]);
        let error: VaultError = LedgerError::Reverted(RegistryError::NullifierSpent(nullifier)).into();
        assert!(matches!(error, VaultError::ReplayDetected(n) if n == nullifier));
    }
}
