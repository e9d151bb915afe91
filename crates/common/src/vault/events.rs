use serde::{Deserialize, Serialize};

use crate::crypto::{Address, Bytes32, VaultId};

use super::entry::StorageProvider;

/// Events emitted by registry transitions, carried on transaction receipts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "PascalCase")]
pub enum RegistryEvent {
    VaultCreated {
        vault_id: VaultId,
        owner: Address,
    },
    EntryAdded {
        vault_id: VaultId,
        index: u64,
        cid: String,
        tag: String,
        provider: StorageProvider,
    },
    EntryRemoved {
        vault_id: VaultId,
        index: u64,
    },
    ManifestUpdated {
        vault_id: VaultId,
        root: Bytes32,
        manifest_id: String,
    },
    AccessGranted {
        vault_id: VaultId,
        user: Address,
    },
    AccessRevoked {
        vault_id: VaultId,
        user: Address,
    },
}

impl RegistryEvent {
    pub fn vault_id(&self) -> &VaultId {
        match self {
            Self::VaultCreated { vault_id, .. }
            | Self::EntryAdded { vault_id, .. }
            | Self::EntryRemoved { vault_id, .. }
            | Self::ManifestUpdated { vault_id, .. }
            | Self::AccessGranted { vault_id, .. }
            | Self::AccessRevoked { vault_id, .. } => vault_id,
        }
    }
}
