//! Commitment scheme
//!
//! Pure derivations of every public value in the protocol from secrets and
//! public context. All of them use SHA-256 through [`DomainHasher`], which
//! starts each hash with a distinct domain tag and length-prefixes every
//! field. Two derivations can therefore never produce the same preimage,
//! even though they share the same hash function.
//!
//! ```text
//! password_hash = H("password"   | password)
//! vault_id      = H("vault-id"   | password_hash | owner)
//! leaf          = H("leaf"       | vault_id | tag)
//! commitment    = H("commitment" | leaf)
//! nullifier     = H("nullifier"  | password | user | vault_id)
//! ```

use sha2::{Digest, Sha256};

use super::address::Address;
use super::bytes32::{Bytes32, Commitment, Leaf, Nullifier, PasswordHash, VaultId};
use super::password::Password;

/// Domain tags, one per derivation
pub mod domain {
    pub const PASSWORD_HASH: &[u8] = b"fangorn/v1/password-hash";
    pub const VAULT_ID: &[u8] = b"fangorn/v1/vault-id";
    pub const LEAF: &[u8] = b"fangorn/v1/leaf";
    pub const COMMITMENT: &[u8] = b"fangorn/v1/commitment";
    pub const NULLIFIER: &[u8] = b"fangorn/v1/nullifier";
    pub const MERKLE_NODE: &[u8] = b"fangorn/v1/merkle-node";
    pub const POLICY: &[u8] = b"fangorn/v1/policy";
    pub const MOCK_PROOF: &[u8] = b"fangorn/v1/mock-proof";

    pub const ALL: &[&[u8]] = &[
        PASSWORD_HASH,
        VAULT_ID,
        LEAF,
        COMMITMENT,
        NULLIFIER,
        MERKLE_NODE,
        POLICY,
        MOCK_PROOF,
    ];
}

/// SHA-256 with a domain tag and length-prefixed fields
#[derive(Clone)]
pub struct DomainHasher(Sha256);

impl DomainHasher {
    pub fn new(domain: &[u8]) -> Self {
        let mut inner = Sha256::new();
        inner.update((domain.len() as u32).to_be_bytes());
        inner.update(domain);
        Self(inner)
    }

    /// Absorb one field as `len (u32 BE) || bytes`
    pub fn field(mut self, bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        self.0.update((bytes.len() as u32).to_be_bytes());
        self.0.update(bytes);
        self
    }

    pub fn finish(self) -> Bytes32 {
        let out: [u8; 32] = self.0.finalize().into();
        Bytes32::from(out)
    }
}

/// One-way hash of a password.
///
/// Unsalted: the same password always hashes the same, for every vault.
pub fn derive_password_hash(password: &Password) -> PasswordHash {
    DomainHasher::new(domain::PASSWORD_HASH)
        .field(password.expose())
        .finish()
        .into()
}

/// Bind a vault to exactly one (password, owner) pair
pub fn derive_vault_id(password_hash: &PasswordHash, owner: &Address) -> VaultId {
    DomainHasher::new(domain::VAULT_ID)
        .field(password_hash)
        .field(owner)
        .finish()
        .into()
}

/// Bind a content tag to a specific vault
pub fn derive_leaf(vault_id: &VaultId, tag: &str) -> Leaf {
    DomainHasher::new(domain::LEAF)
        .field(vault_id)
        .field(tag.as_bytes())
        .finish()
        .into()
}

pub fn derive_commitment(leaf: &Leaf) -> Commitment {
    DomainHasher::new(domain::COMMITMENT)
        .field(leaf)
        .finish()
        .into()
}

/// Leaf and commitment for a tag in one call
pub fn derive_tag_commitment(vault_id: &VaultId, tag: &str) -> (Leaf, Commitment) {
    let leaf = derive_leaf(vault_id, tag);
    let commitment = derive_commitment(&leaf);
    (leaf, commitment)
}

/// Per-request nullifier.
///
/// Takes the password itself rather than its hash, so nobody who only sees
/// the registry can compute it or link a user's nullifiers across vaults.
pub fn derive_nullifier(password: &Password, user: &Address, vault_id: &VaultId) -> Nullifier {
    DomainHasher::new(domain::NULLIFIER)
        .field(password.expose())
        .field(user)
        .field(vault_id)
        .finish()
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_domains_are_distinct() {
        let unique: HashSet<_> = domain::ALL.iter().collect();
        assert_eq!(unique.len(), domain::ALL.len());
    }

    #[test]
    fn test_distinct_passwords_distinct_vault_ids() {
        let owner = Address::new([1; 20]);
        let passwords = ["p1", "p2", "p1 ", "", "correct horse battery staple"];
        let ids: HashSet<_> = passwords
            .iter()
            .map(|p| derive_vault_id(&derive_password_hash(&Password::from(*p)), &owner))
            .collect();
        assert_eq!(ids.len(), passwords.len());
    }

    #[test]
    fn test_same_password_distinct_owners() {
        let hash = derive_password_hash(&Password::from("shared"));
        let a = derive_vault_id(&hash, &Address::new([1; 20]));
        let b = derive_vault_id(&hash, &Address::new([2; 20]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_nullifier_is_deterministic() {
        let password = Password::from("p1");
        let user = Address::new([9; 20]);
        let vault = VaultId::new([3; 32]);
        assert_eq!(
            derive_nullifier(&password, &user, &vault),
            derive_nullifier(&password, &user, &vault)
        );
    }

    #[test]
    fn test_nullifier_depends_on_every_input() {
        let password = Password::from("p1");
        let user = Address::new([9; 20]);
        let vault = VaultId::new([3; 32]);
        let base = derive_nullifier(&password, &user, &vault);

        assert_ne!(base, derive_nullifier(&Password::from("p2"), &user, &vault));
        assert_ne!(
            base,
            derive_nullifier(&password, &Address::new([8; 20]), &vault)
        );
        assert_ne!(
            base,
            derive_nullifier(&password, &user, &VaultId::new([4; 32]))
        );
    }

    #[test]
    fn test_same_tag_different_vaults() {
        let a = derive_leaf(&VaultId::new([1; 32]), "doc");
        let b = derive_leaf(&VaultId::new([2; 32]), "doc");
        assert_ne!(a, b);
        assert_ne!(derive_commitment(&a), derive_commitment(&b));
    }

    #[test]
    fn test_commitment_is_not_the_leaf() {
        let leaf = derive_leaf(&VaultId::new([1; 32]), "doc");
        let commitment = derive_commitment(&leaf);
        assert_ne!(Bytes32::from(leaf), Bytes32::from(commitment));
    }

    #[test]
    fn test_length_prefix_prevents_field_shifting() {
        // "ab" + "c" must not collide with "a" + "bc"
        let x = DomainHasher::new(domain::LEAF).field("ab").field("c").finish();
        let y = DomainHasher::new(domain::LEAF).field("a").field("bc").finish();
        assert_ne!(x, y);
    }
}
