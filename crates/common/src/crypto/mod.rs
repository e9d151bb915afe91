//! Cryptographic primitives for Fangorn vaults
//!
//! - **Values**: typed 32-byte digests ([`VaultId`], [`Leaf`], [`Commitment`],
//!   [`Nullifier`], ...) and 20-byte ledger [`Address`]es
//! - **Commitment scheme**: domain-separated SHA-256 derivations of every
//!   public protocol value (see [`commitment`])
//! - **Secrets**: the [`Password`] wrapper, wiped on drop, and the per-content
//!   [`Secret`] used by the in-memory decryption network
//!
//! # Security Model
//!
//! The password never leaves the process. The registry only ever sees
//! `password_hash`, `vault_id`, and nullifiers. A nullifier is derived from
//! the password itself, so knowing the registry contents is not enough to
//! compute or link nullifiers.

mod address;
mod bytes32;
pub mod commitment;
mod password;
mod secret;

pub use address::{Address, ADDRESS_SIZE};
pub use bytes32::{
    Bytes32, Commitment, HexError, Leaf, Nullifier, PasswordHash, TxHash, VaultId, BYTES32_SIZE,
};
pub use commitment::{
    derive_commitment, derive_leaf, derive_nullifier, derive_password_hash, derive_tag_commitment,
    derive_vault_id, DomainHasher,
};
pub use password::Password;
pub use secret::{data_hash, Secret, SecretError, BLAKE3_HASH_SIZE};
