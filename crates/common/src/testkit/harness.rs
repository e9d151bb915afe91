use std::sync::Arc;

use crate::crypto::Address;
use crate::decryption::MemoryDecryptionNetwork;
use crate::ledger::{LedgerClient, MemoryLedger, MemoryLedgerClient};
use crate::orchestrator::{OrchestratorConfig, RetryPolicy, VaultOrchestrator};
use crate::proof::MockProofBackend;
use crate::storage::MemoryContentStore;
use crate::vault::RegistryConfig;

/// Creation fee charged by harness ledgers
pub const TEST_CREATION_FEE: u64 = 1_000;

/// One ledger, one store, one decryption network, any number of accounts
#[derive(Debug, Clone)]
pub struct TestHarness {
    ledger: MemoryLedger,
    storage: MemoryContentStore,
    prover: Arc<MockProofBackend>,
    network: MemoryDecryptionNetwork,
    config: OrchestratorConfig,
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

impl TestHarness {
    /// Harness with no retry delays
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig {
            retry: RetryPolicy::immediate(4),
            ..Default::default()
        })
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self::with_registry(
            config,
            RegistryConfig {
                creation_fee: TEST_CREATION_FEE,
                ..Default::default()
            },
        )
    }

    pub fn with_registry(config: OrchestratorConfig, mut registry: RegistryConfig) -> Self {
        registry.circuit_id = config.circuit_id.clone();
        let prover = Arc::new(MockProofBackend::for_circuit(config.circuit_id.clone()));
        let ledger = MemoryLedger::new(registry, prover.clone());
        // the network reads the registry but never signs anything
        let network = MemoryDecryptionNetwork::new(Arc::new(ledger.connect(Address::ZERO)));
        Self {
            ledger,
            storage: MemoryContentStore::new(),
            prover,
            network,
            config,
        }
    }

    /// Deterministic account address for a name
    pub fn account(name: &str) -> Address {
        let hash = blake3::hash(name.as_bytes());
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash.as_bytes()[..20]);
        Address::new(bytes)
    }

    /// An orchestrator signing as `name`
    pub fn orchestrator(&self, name: &str) -> VaultOrchestrator {
        self.orchestrator_for(Self::account(name))
    }

    pub fn orchestrator_for(&self, account: Address) -> VaultOrchestrator {
        self.orchestrator_with(Arc::new(self.client(account)))
    }

    /// An orchestrator that talks to the ledger through `ledger`, sharing
    ///  this harness's store, prover, and network
    pub fn orchestrator_with(&self, ledger: Arc<dyn LedgerClient>) -> VaultOrchestrator {
        VaultOrchestrator::new(
            ledger,
            self.prover.clone(),
            Arc::new(self.storage.clone()),
            Arc::new(self.network.clone()),
            self.config.clone(),
        )
    }

    /// A raw ledger client, for reading registry state or submitting
    ///  hand-built transactions
    pub fn client(&self, account: Address) -> MemoryLedgerClient {
        self.ledger.connect(account)
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn storage(&self) -> &MemoryContentStore {
        &self.storage
    }

    pub fn prover(&self) -> &Arc<MockProofBackend> {
        &self.prover
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }
}
