//! Vault registry rules
//!
//! This is the state machine the ledger contract executes. Every transition
//! takes the authenticated caller explicitly and either applies completely
//! (returning its output and events) or not at all.
//!
//! ```text
//! NonExistent -> Created -> (EntriesUpdated)* -> (ProofSubmitted)*
//! ```
//!
//! `submit_proof` is the only transition that grants access, and a nullifier
//! it records is never removed.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::{
    derive_tag_commitment, derive_vault_id, Address, Bytes32, Nullifier, PasswordHash, VaultId,
};
use crate::proof::{CircuitId, Proof, ProofBackend, PublicInputs};

use super::entry::{Entry, StorageProvider};
use super::events::RegistryEvent;

/// Default fee for creating a vault, in the ledger's smallest unit
pub const DEFAULT_CREATION_FEE: u64 = 1_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("insufficient fee: required {required}, paid {paid}")]
    InsufficientFee { required: u64, paid: u64 },
    #[error("vault {0} already exists")]
    AlreadyExists(VaultId),
    #[error("password hash must be non-zero")]
    ZeroPasswordHash,
    #[error("vault {0} not found")]
    VaultNotFound(VaultId),
    #[error("caller {0} is not the vault owner")]
    Unauthorized(Address),
    #[error("entry {0} not found")]
    EntryNotFound(u64),
    #[error("entry {0} is already removed")]
    EntryInactive(u64),
    #[error("nullifier {0} already spent")]
    NullifierSpent(Nullifier),
    #[error("invalid proof")]
    InvalidProof,
}

/// Output of an applied transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition<T> {
    pub output: T,
    pub events: Vec<RegistryEvent>,
}

impl<T> Transition<T> {
    fn new(output: T, events: Vec<RegistryEvent>) -> Self {
        Self { output, events }
    }
}

/// Public per-vault state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultState {
    pub vault_id: VaultId,
    pub owner: Address,
    pub password_hash: PasswordHash,
    /// Zero until the first manifest is published
    pub merkle_root: Bytes32,
    pub manifest_id: Option<String>,
    pub entry_count: u64,
}

#[derive(Debug, Clone)]
struct VaultRecord {
    owner: Address,
    password_hash: PasswordHash,
    merkle_root: Bytes32,
    manifest_id: Option<String>,
    entries: Vec<Entry>,
    access: HashSet<Address>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub creation_fee: u64,
    pub circuit_id: CircuitId,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            creation_fee: DEFAULT_CREATION_FEE,
            circuit_id: CircuitId::default(),
        }
    }
}

pub struct Registry {
    config: RegistryConfig,
    verifier: Arc<dyn ProofBackend>,
    vaults: HashMap<VaultId, VaultRecord>,
    spent_nullifiers: HashSet<Nullifier>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("vaults", &self.vaults.len())
            .field("spent_nullifiers", &self.spent_nullifiers.len())
            .finish()
    }
}

impl Registry {
    pub fn new(config: RegistryConfig, verifier: Arc<dyn ProofBackend>) -> Self {
        Self {
            config,
            verifier,
            vaults: HashMap::new(),
            spent_nullifiers: HashSet::new(),
        }
    }

    fn vault(&self, vault_id: &VaultId) -> Result<&VaultRecord, RegistryError> {
        self.vaults
            .get(vault_id)
            .ok_or(RegistryError::VaultNotFound(*vault_id))
    }

    fn owned_vault_mut(
        &mut self,
        caller: &Address,
        vault_id: &VaultId,
    ) -> Result<&mut VaultRecord, RegistryError> {
        let vault = self
            .vaults
            .get_mut(vault_id)
            .ok_or(RegistryError::VaultNotFound(*vault_id))?;
        if vault.owner != *caller {
            return Err(RegistryError::Unauthorized(*caller));
        }
        Ok(vault)
    }

    /* Transitions */

    pub fn create_vault(
        &mut self,
        caller: &Address,
        password_hash: PasswordHash,
        paid: u64,
    ) -> Result<Transition<VaultId>, RegistryError> {
        if paid < self.config.creation_fee {
            return Err(RegistryError::InsufficientFee {
                required: self.config.creation_fee,
                paid,
            });
        }
        if password_hash.is_zero() {
            return Err(RegistryError::ZeroPasswordHash);
        }

        let vault_id = derive_vault_id(&password_hash, caller);
        if self.vaults.contains_key(&vault_id) {
            return Err(RegistryError::AlreadyExists(vault_id));
        }

        self.vaults.insert(
            vault_id,
            VaultRecord {
                owner: *caller,
                password_hash,
                merkle_root: Bytes32::ZERO,
                manifest_id: None,
                entries: Vec::new(),
                access: HashSet::new(),
            },
        );
        Ok(Transition::new(
            vault_id,
            vec![RegistryEvent::VaultCreated {
                vault_id,
                owner: *caller,
            }],
        ))
    }

    pub fn add_entry(
        &mut self,
        caller: &Address,
        vault_id: &VaultId,
        cid: &str,
        tag: &str,
        provider: StorageProvider,
        timestamp: i64,
    ) -> Result<Transition<u64>, RegistryError> {
        let vault = self.owned_vault_mut(caller, vault_id)?;
        let index = vault.entries.len() as u64;
        let (leaf, commitment) = derive_tag_commitment(vault_id, tag);
        vault.entries.push(Entry {
            index,
            tag: tag.to_string(),
            cid: cid.to_string(),
            provider,
            created_at: timestamp,
            leaf,
            commitment,
            active: true,
        });
        Ok(Transition::new(
            index,
            vec![RegistryEvent::EntryAdded {
                vault_id: *vault_id,
                index,
                cid: cid.to_string(),
                tag: tag.to_string(),
                provider,
            }],
        ))
    }

    pub fn remove_entry(
        &mut self,
        caller: &Address,
        vault_id: &VaultId,
        index: u64,
    ) -> Result<Transition<()>, RegistryError> {
        let vault = self.owned_vault_mut(caller, vault_id)?;
        let entry = usize::try_from(index)
            .ok()
            .and_then(|i| vault.entries.get_mut(i))
            .ok_or(RegistryError::EntryNotFound(index))?;
        if !entry.active {
            return Err(RegistryError::EntryInactive(index));
        }
        entry.active = false;
        Ok(Transition::new(
            (),
            vec![RegistryEvent::EntryRemoved {
                vault_id: *vault_id,
                index,
            }],
        ))
    }

    /// Overwrite root and manifest pointer. The tree is not re-derived here.
    pub fn update_manifest(
        &mut self,
        caller: &Address,
        vault_id: &VaultId,
        root: Bytes32,
        manifest_id: &str,
    ) -> Result<Transition<()>, RegistryError> {
        let vault = self.owned_vault_mut(caller, vault_id)?;
        vault.merkle_root = root;
        vault.manifest_id = Some(manifest_id.to_string());
        Ok(Transition::new(
            (),
            vec![RegistryEvent::ManifestUpdated {
                vault_id: *vault_id,
                root,
                manifest_id: manifest_id.to_string(),
            }],
        ))
    }

    /// Spend `nullifier` and grant `caller` access if `proof` verifies.
    ///
    /// The spent check runs before verification, so a replay fails the same
    /// way whether or not its proof is valid.
    pub fn submit_proof(
        &mut self,
        caller: &Address,
        vault_id: &VaultId,
        nullifier: Nullifier,
        proof: &Proof,
    ) -> Result<Transition<()>, RegistryError> {
        let vault = self.vault(vault_id)?;
        if self.spent_nullifiers.contains(&nullifier) {
            return Err(RegistryError::NullifierSpent(nullifier));
        }

        let expected = PublicInputs {
            vault_id: *vault_id,
            password_hash: vault.password_hash,
            merkle_root: vault.merkle_root,
            nullifier,
            user: *caller,
            commitment: proof.public_inputs.commitment,
        };
        if !expected.binds_same_request(&proof.public_inputs) {
            return Err(RegistryError::InvalidProof);
        }
        let valid = self
            .verifier
            .verify(&self.config.circuit_id, &proof.bytes, &expected)
            .unwrap_or(false);
        if !valid {
            return Err(RegistryError::InvalidProof);
        }

        self.spent_nullifiers.insert(nullifier);
        if let Some(vault) = self.vaults.get_mut(vault_id) {
            vault.access.insert(*caller);
        }
        Ok(Transition::new(
            (),
            vec![RegistryEvent::AccessGranted {
                vault_id: *vault_id,
                user: *caller,
            }],
        ))
    }

    /// Drop the caller's own access flag. Spent nullifiers stay spent.
    pub fn revoke_own_access(
        &mut self,
        caller: &Address,
        vault_id: &VaultId,
    ) -> Result<Transition<()>, RegistryError> {
        let vault = self
            .vaults
            .get_mut(vault_id)
            .ok_or(RegistryError::VaultNotFound(*vault_id))?;
        let events = if vault.access.remove(caller) {
            vec![RegistryEvent::AccessRevoked {
                vault_id: *vault_id,
                user: *caller,
            }]
        } else {
            Vec::new()
        };
        Ok(Transition::new((), events))
    }

    /* Views */

    pub fn vault_creation_fee(&self) -> u64 {
        self.config.creation_fee
    }

    pub fn circuit_id(&self) -> &CircuitId {
        &self.config.circuit_id
    }

    pub fn vault_exists(&self, vault_id: &VaultId) -> bool {
        self.vaults
            .get(vault_id)
            .map(|v| !v.password_hash.is_zero())
            .unwrap_or(false)
    }

    pub fn vault_state(&self, vault_id: &VaultId) -> Result<VaultState, RegistryError> {
        let vault = self.vault(vault_id)?;
        Ok(VaultState {
            vault_id: *vault_id,
            owner: vault.owner,
            password_hash: vault.password_hash,
            merkle_root: vault.merkle_root,
            manifest_id: vault.manifest_id.clone(),
            entry_count: vault.entries.len() as u64,
        })
    }

    pub fn vault_owner(&self, vault_id: &VaultId) -> Result<Address, RegistryError> {
        self.vault(vault_id).map(|v| v.owner)
    }

    pub fn vault_password_hash(&self, vault_id: &VaultId) -> Result<PasswordHash, RegistryError> {
        self.vault(vault_id).map(|v| v.password_hash)
    }

    /// Access flag only. Owning a vault does not imply access to it.
    pub fn check_access(&self, vault_id: &VaultId, user: &Address) -> bool {
        self.vaults
            .get(vault_id)
            .map(|v| v.access.contains(user))
            .unwrap_or(false)
    }

    pub fn get_entry(&self, vault_id: &VaultId, index: u64) -> Result<Entry, RegistryError> {
        let vault = self.vault(vault_id)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| vault.entries.get(i))
            .cloned()
            .ok_or(RegistryError::EntryNotFound(index))
    }

    /// Every entry ever added, removed ones included, in index order
    pub fn get_all_entries(&self, vault_id: &VaultId) -> Result<Vec<Entry>, RegistryError> {
        self.vault(vault_id).map(|v| v.entries.clone())
    }

    pub fn get_entry_count(&self, vault_id: &VaultId) -> Result<u64, RegistryError> {
        self.vault(vault_id).map(|v| v.entries.len() as u64)
    }

    pub fn is_nullifier_spent(&self, nullifier: &Nullifier) -> bool {
        self.spent_nullifiers.contains(nullifier)
    }
}
