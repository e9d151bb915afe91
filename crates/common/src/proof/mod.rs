//! Knowledge proofs for vault access
//!
//! The statement: "I know a password whose hash is the vault's registered
//! password hash, the nullifier is derived from that password for me and this
//! vault, and a leaf committing to one of the vault's tags sits under the
//! registered Merkle root." The circuit itself lives outside this crate; here
//! we assemble its inputs ([`ProofInputBuilder`]) and consume it through
//! [`ProofBackend`].

mod backend;
mod inputs;
mod mock;

pub use backend::{
    CircuitId, PrivateInputs, Proof, ProofBackend, ProofError, PublicInputs, DEFAULT_CIRCUIT_ID,
};
pub use inputs::{InputError, ProofInputBuilder, ProofInputs};
pub use mock::MockProofBackend;
