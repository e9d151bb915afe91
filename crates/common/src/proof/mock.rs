//! Deterministic stand-in for a real proving system
//!
//! `prove` evaluates every constraint of the vault access circuit directly
//! against the witness and refuses to emit a proof for a witness that does not
//! satisfy them. The proof itself is a domain-separated hash over the circuit
//! id and the public inputs, so `verify` only needs the public half.
//!
//! There is no zero knowledge here: anyone can mint a "proof" for arbitrary
//! public inputs by hashing them. That is fine for tests and the local demo
//! and nowhere else.

use crate::crypto::commitment::domain;
use crate::crypto::{derive_commitment, derive_nullifier, derive_password_hash, DomainHasher};

use super::backend::{CircuitId, PrivateInputs, Proof, ProofBackend, ProofError, PublicInputs};

#[derive(Debug, Clone, Default)]
pub struct MockProofBackend {
    /// When set, only this circuit is accepted
    circuit: Option<CircuitId>,
}

impl MockProofBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_circuit(circuit: CircuitId) -> Self {
        Self {
            circuit: Some(circuit),
        }
    }

    fn check_circuit(&self, circuit: &CircuitId) -> Result<(), ProofError> {
        match &self.circuit {
            Some(expected) if expected != circuit => {
                Err(ProofError::UnknownCircuit(circuit.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn proof_bytes(circuit: &CircuitId, public_inputs: &PublicInputs) -> Vec<u8> {
        public_inputs
            .to_fields()
            .iter()
            .fold(
                DomainHasher::new(domain::MOCK_PROOF).field(circuit.as_str()),
                |hasher, field| hasher.field(field),
            )
            .finish()
            .to_vec()
    }
}

impl ProofBackend for MockProofBackend {
    fn prove(&self, circuit: &CircuitId, inputs: &PrivateInputs) -> Result<Proof, ProofError> {
        self.check_circuit(circuit)?;

        if derive_password_hash(&inputs.password) != inputs.password_hash {
            return Err(ProofError::Unsatisfied("password hash"));
        }
        if derive_nullifier(&inputs.password, &inputs.user, &inputs.vault_id) != inputs.nullifier {
            return Err(ProofError::Unsatisfied("nullifier"));
        }
        if derive_commitment(&inputs.leaf) != inputs.commitment {
            return Err(ProofError::Unsatisfied("commitment"));
        }
        if !crate::merkle::verify_inclusion(&inputs.leaf.into(), &inputs.path, &inputs.merkle_root)
        {
            return Err(ProofError::Unsatisfied("merkle membership"));
        }

        let public_inputs = inputs.public_inputs();
        Ok(Proof {
            bytes: Self::proof_bytes(circuit, &public_inputs),
            public_inputs,
        })
    }

    fn verify(
        &self,
        circuit: &CircuitId,
        proof: &[u8],
        public_inputs: &PublicInputs,
    ) -> Result<bool, ProofError> {
        self.check_circuit(circuit)?;
        Ok(proof == Self::proof_bytes(circuit, public_inputs).as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{derive_tag_commitment, derive_vault_id, Address, Password};
    use crate::merkle::MerkleTree;

    fn witness(password: &str) -> PrivateInputs {
        let password = Password::from(password);
        let owner = Address::new([1; 20]);
        let user = Address::new([2; 20]);
        let password_hash = derive_password_hash(&password);
        let vault_id = derive_vault_id(&password_hash, &owner);
        let (leaf, commitment) = derive_tag_commitment(&vault_id, "doc");
        let tree = MerkleTree::build(&[leaf.into()]).unwrap();
        PrivateInputs {
            nullifier: derive_nullifier(&password, &user, &vault_id),
            password,
            password_hash,
            user,
            vault_id,
            leaf,
            commitment,
            path: tree.prove(0).unwrap(),
            merkle_root: tree.root(),
        }
    }

    #[test]
    fn test_prove_then_verify() {
        let backend = MockProofBackend::new();
        let circuit = CircuitId::default();
        let proof = backend.prove(&circuit, &witness("p1")).unwrap();
        assert!(backend
            .verify(&circuit, &proof.bytes, &proof.public_inputs)
            .unwrap());
    }

    #[test]
    fn test_wrong_password_is_unsatisfied() {
        let mut inputs = witness("p1");
        inputs.password = Password::from("p2");
        let err = MockProofBackend::new()
            .prove(&CircuitId::default(), &inputs)
            .unwrap_err();
        assert_eq!(err, ProofError::Unsatisfied("password hash"));
    }

    #[test]
    fn test_proof_is_bound_to_public_inputs() {
        let backend = MockProofBackend::new();
        let circuit = CircuitId::default();
        let proof = backend.prove(&circuit, &witness("p1")).unwrap();

        let mut other = proof.public_inputs.clone();
        other.user = Address::new([3; 20]);
        assert!(!backend.verify(&circuit, &proof.bytes, &other).unwrap());
    }

    #[test]
    fn test_circuit_pinning() {
        let backend = MockProofBackend::for_circuit(CircuitId::new("a"));
        assert!(matches!(
            backend.prove(&CircuitId::new("b"), &witness("p1")),
            Err(ProofError::UnknownCircuit(_))
        ));
    }
}
