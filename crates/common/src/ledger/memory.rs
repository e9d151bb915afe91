use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::crypto::{Address, Nullifier, TxHash, VaultId};
use crate::proof::ProofBackend;
use crate::vault::{Entry, Registry, RegistryConfig, RegistryError, Transition, VaultState};

use super::provider::{LedgerClient, LedgerError, Receipt, TxRequest, TxStatus};

/// In-memory ledger executing the registry rules directly
///
/// Transactions apply at submission and are "mined" with a monotonically
/// increasing timestamp. Faults can be injected to exercise the paths where
/// a write's outcome is unknown to the submitter.
#[derive(Debug, Clone)]
pub struct MemoryLedger {
    inner: Arc<RwLock<MemoryLedgerInner>>,
}

#[derive(Debug)]
struct MemoryLedgerInner {
    registry: Registry,
    receipts: HashMap<TxHash, Receipt>,
    /// Applied transactions whose receipts were lost
    dropped: HashSet<TxHash>,
    /// Last block timestamp handed out
    clock: i64,
    nonce: u64,
    fail_submits: u32,
    drop_receipts: u32,
    fail_views: u32,
}

impl MemoryLedger {
    pub fn new(config: RegistryConfig, verifier: Arc<dyn ProofBackend>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryLedgerInner {
                registry: Registry::new(config, verifier),
                receipts: HashMap::new(),
                dropped: HashSet::new(),
                clock: 0,
                nonce: 0,
                fail_submits: 0,
                drop_receipts: 0,
                fail_views: 0,
            })),
        }
    }

    /// A client signing as `account`
    pub fn connect(&self, account: Address) -> MemoryLedgerClient {
        MemoryLedgerClient {
            ledger: self.clone(),
            account,
        }
    }

    /// The next `n` submissions fail before they are applied
    pub fn fail_next_submits(&self, n: u32) {
        self.inner.write().fail_submits = n;
    }

    /// The next `n` submissions are applied but their receipts are lost
    pub fn drop_next_receipts(&self, n: u32) {
        self.inner.write().drop_receipts = n;
    }

    /// The next `n` view calls fail
    pub fn fail_next_views(&self, n: u32) {
        self.inner.write().fail_views = n;
    }

    /// Number of transactions applied so far, reverted ones included
    pub fn transaction_count(&self) -> u64 {
        self.inner.read().nonce
    }

    fn view<T>(&self, f: impl FnOnce(&Registry) -> Result<T, RegistryError>) -> Result<T, LedgerError> {
        {
            let mut inner = self.inner.write();
            if inner.fail_views > 0 {
                inner.fail_views -= 1;
                return Err(LedgerError::Transient("view call timed out".to_string()));
            }
        }
        let inner = self.inner.read();
        f(&inner.registry).map_err(LedgerError::from)
    }

    fn submit_as(&self, account: &Address, tx: TxRequest) -> Result<TxHash, LedgerError> {
        let mut inner = self.inner.write();
        if inner.fail_submits > 0 {
            inner.fail_submits -= 1;
            return Err(LedgerError::Transient(format!(
                "{} submission was not accepted",
                tx.name()
            )));
        }

        inner.nonce += 1;
        inner.clock = chrono::Utc::now().timestamp().max(inner.clock + 1);
        let timestamp = inner.clock;

        let mut hasher = blake3::Hasher::new();
        hasher.update(account.as_bytes());
        hasher.update(&inner.nonce.to_be_bytes());
        let tx_hash = TxHash::new(*hasher.finalize().as_bytes());

        let name = tx.name();
        let result = apply(&mut inner.registry, account, tx, timestamp);
        let (status, events) = match result {
            Ok(events) => (TxStatus::Success, events),
            Err(e) => (TxStatus::Reverted(e), Vec::new()),
        };
        tracing::debug!(tx = name, %tx_hash, ?status, "memory ledger applied transaction");

        inner.receipts.insert(
            tx_hash,
            Receipt {
                tx_hash,
                status,
                events,
                timestamp,
            },
        );
        if inner.drop_receipts > 0 {
            inner.drop_receipts -= 1;
            inner.dropped.insert(tx_hash);
        }
        Ok(tx_hash)
    }

    fn receipt(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError> {
        let inner = self.inner.read();
        if inner.dropped.contains(tx_hash) {
            return Err(LedgerError::Transient(format!(
                "timed out waiting for receipt of {}",
                tx_hash
            )));
        }
        inner
            .receipts
            .get(tx_hash)
            .cloned()
            .ok_or(LedgerError::UnknownTransaction(*tx_hash))
    }
}

fn apply(
    registry: &mut Registry,
    caller: &Address,
    tx: TxRequest,
    timestamp: i64,
) -> Result<Vec<crate::vault::RegistryEvent>, RegistryError> {
    fn events<T>(t: Transition<T>) -> Vec<crate::vault::RegistryEvent> {
        t.events
    }

    match tx {
        TxRequest::CreateVault {
            password_hash,
            value,
        } => registry.create_vault(caller, password_hash, value).map(events),
        TxRequest::AddEntry {
            vault_id,
            cid,
            tag,
            provider,
        } => registry
            .add_entry(caller, &vault_id, &cid, &tag, provider, timestamp)
            .map(events),
        TxRequest::RemoveEntry { vault_id, index } => {
            registry.remove_entry(caller, &vault_id, index).map(events)
        }
        TxRequest::UpdateManifest {
            vault_id,
            root,
            manifest_id,
        } => registry
            .update_manifest(caller, &vault_id, root, &manifest_id)
            .map(events),
        TxRequest::SubmitProof {
            vault_id,
            nullifier,
            proof,
        } => registry
            .submit_proof(caller, &vault_id, nullifier, &proof)
            .map(events),
        TxRequest::RevokeOwnAccess { vault_id } => {
            registry.revoke_own_access(caller, &vault_id).map(events)
        }
    }
}

/// A [`MemoryLedger`] handle bound to one account
#[derive(Debug, Clone)]
pub struct MemoryLedgerClient {
    ledger: MemoryLedger,
    account: Address,
}

impl MemoryLedgerClient {
    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }
}

#[async_trait]
impl LedgerClient for MemoryLedgerClient {
    fn account(&self) -> Address {
        self.account
    }

    async fn submit(&self, tx: TxRequest) -> Result<TxHash, LedgerError> {
        self.ledger.submit_as(&self.account, tx)
    }

    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt, LedgerError> {
        self.ledger.receipt(tx_hash)
    }

    async fn vault_creation_fee(&self) -> Result<u64, LedgerError> {
        self.ledger.view(|r| Ok(r.vault_creation_fee()))
    }

    async fn vault_exists(&self, vault_id: &VaultId) -> Result<bool, LedgerError> {
        self.ledger.view(|r| Ok(r.vault_exists(vault_id)))
    }

    async fn vault_state(&self, vault_id: &VaultId) -> Result<VaultState, LedgerError> {
        self.ledger.view(|r| r.vault_state(vault_id))
    }

    async fn check_access(&self, vault_id: &VaultId, user: &Address) -> Result<bool, LedgerError> {
        self.ledger.view(|r| Ok(r.check_access(vault_id, user)))
    }

    async fn get_entry(&self, vault_id: &VaultId, index: u64) -> Result<Entry, LedgerError> {
        self.ledger.view(|r| r.get_entry(vault_id, index))
    }

    async fn get_all_entries(&self, vault_id: &VaultId) -> Result<Vec<Entry>, LedgerError> {
        self.ledger.view(|r| r.get_all_entries(vault_id))
    }

    async fn get_entry_count(&self, vault_id: &VaultId) -> Result<u64, LedgerError> {
        self.ledger.view(|r| r.get_entry_count(vault_id))
    }

    async fn is_nullifier_spent(&self, nullifier: &Nullifier) -> Result<bool, LedgerError> {
        self.ledger.view(|r| Ok(r.is_nullifier_spent(nullifier)))
    }
}
