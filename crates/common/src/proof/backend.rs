use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{
    Address, Bytes32, Commitment, Leaf, Nullifier, Password, PasswordHash, VaultId, ADDRESS_SIZE,
};
use crate::merkle::MerklePath;

/// Default circuit identifier for vault access proofs
pub const DEFAULT_CIRCUIT_ID: &str = "fangorn-vault-access-v1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("unknown circuit: {0}")]
    UnknownCircuit(String),
    #[error("witness does not satisfy the circuit: {0}")]
    Unsatisfied(&'static str),
    #[error("proof backend failure: {0}")]
    Backend(String),
}

/// Names the circuit a proof is generated and checked against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CircuitId(String);

impl CircuitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CircuitId {
    fn default() -> Self {
        Self(DEFAULT_CIRCUIT_ID.to_string())
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Values the verifier sees
///
/// The registry rebuilds everything except `commitment` from its own state
/// and the submitting caller. `commitment` is only constrained by the circuit,
/// which proves it sits under `merkle_root`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInputs {
    pub vault_id: VaultId,
    pub password_hash: PasswordHash,
    pub merkle_root: Bytes32,
    pub nullifier: Nullifier,
    pub user: Address,
    pub commitment: Commitment,
}

impl PublicInputs {
    /// Field vector in circuit order. The address is left-padded to 32 bytes.
    pub fn to_fields(&self) -> Vec<Bytes32> {
        let mut user = [0u8; 32];
        user[32 - ADDRESS_SIZE..].copy_from_slice(self.user.as_bytes());
        vec![
            self.vault_id.into(),
            self.password_hash.into(),
            self.merkle_root,
            self.nullifier.into(),
            Bytes32::new(user),
            self.commitment.into(),
        ]
    }

    /// Everything but the commitment matches. This is what the registry can
    ///  check from its own state before it hands the proof to the verifier.
    pub fn binds_same_request(&self, other: &PublicInputs) -> bool {
        self.vault_id == other.vault_id
            && self.password_hash == other.password_hash
            && self.merkle_root == other.merkle_root
            && self.nullifier == other.nullifier
            && self.user == other.user
    }
}

/// The prover witness
#[derive(Clone)]
pub struct PrivateInputs {
    pub password: Password,
    pub password_hash: PasswordHash,
    pub user: Address,
    pub vault_id: VaultId,
    pub nullifier: Nullifier,
    pub leaf: Leaf,
    pub commitment: Commitment,
    pub path: MerklePath,
    pub merkle_root: Bytes32,
}

impl PrivateInputs {
    /// The public half of this witness
    pub fn public_inputs(&self) -> PublicInputs {
        PublicInputs {
            vault_id: self.vault_id,
            password_hash: self.password_hash,
            merkle_root: self.merkle_root,
            nullifier: self.nullifier,
            user: self.user,
            commitment: self.commitment,
        }
    }
}

impl fmt::Debug for PrivateInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateInputs")
            .field("password", &"<redacted>")
            .field("user", &self.user)
            .field("vault_id", &self.vault_id)
            .field("nullifier", &self.nullifier)
            .field("commitment", &self.commitment)
            .field("path_len", &self.path.siblings().len())
            .finish()
    }
}

/// An opaque proof and the public inputs it was generated for
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde_as(as = "serde_with::hex::Hex")]
    pub bytes: Vec<u8>,
    pub public_inputs: PublicInputs,
}

/// A zero-knowledge proof system for the vault access circuit
///
/// Proving is CPU bound and synchronous; async callers run it on a blocking
/// worker.
pub trait ProofBackend: Send + Sync + fmt::Debug {
    fn prove(&self, circuit: &CircuitId, inputs: &PrivateInputs) -> Result<Proof, ProofError>;

    fn verify(
        &self,
        circuit: &CircuitId,
        proof: &[u8],
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProofError>;
}
