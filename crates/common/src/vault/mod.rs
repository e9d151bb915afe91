//! Vault data model and registry rules
//!
//! - [`Registry`]: the on-ledger state machine (vault lifecycle, entries,
//!   nullifiers, access flags)
//! - [`Entry`] / [`StorageProvider`]: what the registry records per content item
//! - [`VaultManifest`]: the off-ledger Merkle document bound to a vault's root
//! - [`RegistryEvent`]: what registry transitions emit on receipts

mod entry;
mod events;
mod manifest;
mod registry;

pub use entry::{Entry, StorageProvider, UnknownProvider};
pub use events::RegistryEvent;
pub use manifest::{ManifestEntry, ManifestError, VaultManifest, MANIFEST_VERSION};
pub use registry::{
    Registry, RegistryConfig, RegistryError, Transition, VaultState, DEFAULT_CREATION_FEE,
};
