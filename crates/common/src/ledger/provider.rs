use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::{Address, Bytes32, Nullifier, PasswordHash, TxHash, VaultId};
use crate::proof::Proof;
use crate::vault::{Entry, RegistryError, RegistryEvent, StorageProvider, VaultState};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The registry rejected the call or transaction
    #[error("reverted: {0}")]
    Reverted(#[from] RegistryError),
    /// The ledger could not be reached or did not answer in time. For a
    ///  write this says nothing about whether it was applied.
    #[error("transient ledger failure: {0}")]
    Transient(String),
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxHash),
}

impl LedgerError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Transient(_))
    }
}

/// A registry write, signed by the client's account when submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum TxRequest {
    CreateVault {
        password_hash: PasswordHash,
        /// Value sent along, must cover the creation fee
        value: u64,
    },
    AddEntry {
        vault_id: VaultId,
        cid: String,
        tag: String,
        provider: StorageProvider,
    },
    RemoveEntry {
        vault_id: VaultId,
        index: u64,
    },
    UpdateManifest {
        vault_id: VaultId,
        root: Bytes32,
        manifest_id: String,
    },
    SubmitProof {
        vault_id: VaultId,
        nullifier: Nullifier,
        proof: Proof,
    },
    RevokeOwnAccess {
        vault_id: VaultId,
    },
}

impl TxRequest {
    pub fn name(&self) -> &'static str {
        match self {
            TxRequest::CreateVault { .. } => "createVault",
            TxRequest::AddEntry { .. } => "addEntry",
            TxRequest::RemoveEntry { .. } => "removeEntry",
            TxRequest::UpdateManifest { .. } => "updateVault",
            TxRequest::SubmitProof { .. } => "submitProof",
            TxRequest::RevokeOwnAccess { .. } => "revokeOwnAccess",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted(RegistryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub status: TxStatus,
    pub events: Vec<RegistryEvent>,
    /// Block timestamp, unix seconds
    pub timestamp: i64,
}

impl Receipt {
    /// Events on success, the registry error on revert
    pub fn into_events(self) -> Result<Vec<RegistryEvent>, LedgerError> {
        match self.status {
            TxStatus::Success => Ok(self.events),
            TxStatus::Reverted(e) => Err(LedgerError::Reverted(e)),
        }
    }
}

/// A connection to the ledger hosting the vault registry, bound to one
///  signing account.
///
/// Views reflect the latest confirmed write. Writes are two-phase: `submit`
/// broadcasts and returns a hash, `wait_for_receipt` resolves it.
#[async_trait]
pub trait LedgerClient: Send + Sync + Debug {
    /// The account transactions are signed with
    fn account(&self) -> Address;

    /// Broadcast a registry write
    async fn submit(&self, tx: TxRequest) -> Result<TxHash, LedgerError>;

    /// Block until `tx_hash` is included
    ///
    /// # Errors
    ///
    /// * `LedgerError::Transient` - the receipt could not be obtained, the
    ///   transaction may or may not have been applied
    /// * `LedgerError::UnknownTransaction` - the ledger never saw `tx_hash`
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError>;

    async fn vault_creation_fee(&self) -> Result<u64, LedgerError>;

    async fn vault_exists(&self, vault_id: &VaultId) -> Result<bool, LedgerError>;

    async fn vault_state(&self, vault_id: &VaultId) -> Result<VaultState, LedgerError>;

    async fn vault_owner(&self, vault_id: &VaultId) -> Result<Address, LedgerError> {
        Ok(self.vault_state(vault_id).await?.owner)
    }

    async fn vault_password_hash(&self, vault_id: &VaultId) -> Result<PasswordHash, LedgerError> {
        Ok(self.vault_state(vault_id).await?.password_hash)
    }

    async fn check_access(&self, vault_id: &VaultId, user: &Address) -> Result<bool, LedgerError>;

    async fn has_access(&self, vault_id: &VaultId, user: &Address) -> Result<bool, LedgerError> {
        self.check_access(vault_id, user).await
    }

    async fn get_entry(&self, vault_id: &VaultId, index: u64) -> Result<Entry, LedgerError>;

    /// Every entry ever added, removed ones included
    async fn get_all_entries(&self, vault_id: &VaultId) -> Result<Vec<Entry>, LedgerError>;

    async fn get_entry_count(&self, vault_id: &VaultId) -> Result<u64, LedgerError> {
        Ok(self.vault_state(vault_id).await?.entry_count)
    }

    async fn is_nullifier_spent(&self, nullifier: &Nullifier) -> Result<bool, LedgerError>;
}
