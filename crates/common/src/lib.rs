/**
 * Cryptographic types and operations.
 *  - Typed 32-byte digests and ledger addresses
 *  - The domain-separated commitment scheme
 *  - Passwords and per-content secrets
 */
pub mod crypto;
/**
 * Policy-gated decryption: the network interface,
 *  the stored ciphertext envelope, and an in-memory
 *  network that runs the access gate before release.
 */
pub mod decryption;
/**
 * The access gate. A pure decision over a registry
 *  snapshot, run by the decryption network.
 */
pub mod gate;
/**
 * Ledger client interface and an in-memory ledger
 *  executing the registry rules.
 */
pub mod ledger;
/**
 * Binary Merkle tree over vault entry leaves,
 *  with inclusion paths.
 */
pub mod merkle;
/**
 * Sequencing of the publish and unlock workflows
 *  across all external systems, with retries and
 *  unknown-outcome resolution.
 */
pub mod orchestrator;
/**
 * Proof backend interface, a mock backend, and
 *  the builder for circuit inputs.
 */
pub mod proof;
/**
 * Content-addressed storage for envelopes and manifests.
 */
pub mod storage;
/**
 * Wiring of all in-memory collaborators for tests
 *  and local runs.
 */
pub mod testkit;
/**
 * Vault data model: entries, manifests, registry
 *  rules and events.
 */
pub mod vault;

pub mod prelude {
    pub use crate::crypto::{Address, Commitment, Leaf, Nullifier, Password, PasswordHash, VaultId};
    pub use crate::gate::{Decision, DenyReason, Policy};
    pub use crate::ledger::{LedgerClient, LedgerError, MemoryLedger};
    pub use crate::merkle::{MerkleError, MerklePath, MerkleTree};
    pub use crate::orchestrator::{
        ErrorCategory, OrchestratorConfig, PublishedEntry, RetryPolicy, VaultError,
        VaultOrchestrator,
    };
    pub use crate::proof::{MockProofBackend, ProofBackend, ProofInputBuilder};
    pub use crate::storage::{ContentStore, MemoryContentStore};
    pub use crate::vault::{Entry, StorageProvider, VaultManifest};
}
