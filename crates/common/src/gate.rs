//! Access gate
//!
//! The decision function the decryption network runs before it releases a
//! key. It is pure over an explicit [`GateSnapshot`], so the same code runs
//! inside the network's sandbox and in tests. [`read_snapshot`] gathers a
//! snapshot through read-only ledger views.
//!
//! A request is granted iff the caller holds the access flag on the vault
//! and the requested content id belongs to one of the vault's active
//! entries. Both are read fresh for every request.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::commitment::domain;
use crate::crypto::{Address, Bytes32, Commitment, DomainHasher, VaultId};
use crate::ledger::{LedgerClient, LedgerError};
use crate::vault::Entry;

/// The access condition a ciphertext is encrypted under
///
/// Binds the ciphertext to one registry deployment, one vault, and one tag
/// commitment. The same policy must be presented to decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub registry: String,
    pub vault_id: VaultId,
    pub commitment: Commitment,
}

impl Policy {
    pub fn new(registry: impl Into<String>, vault_id: VaultId, commitment: Commitment) -> Self {
        Self {
            registry: registry.into(),
            vault_id,
            commitment,
        }
    }

    /// Stable identifier of the policy
    pub fn id(&self) -> Bytes32 {
        DomainHasher::new(domain::POLICY)
            .field(self.registry.as_bytes())
            .field(self.vault_id)
            .field(self.commitment)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The snapshot was taken for another vault or caller
    SnapshotMismatch,
    NoAccess,
    /// No entry in the vault carries the requested content id
    UnknownContent,
    /// The only entries carrying the content id have been removed
    EntryRemoved,
    /// The content exists but under a different tag commitment than the policy
    PolicyMismatch,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            DenyReason::SnapshotMismatch => "snapshot does not match the request",
            DenyReason::NoAccess => "caller has no access to the vault",
            DenyReason::UnknownContent => "content is not in the vault",
            DenyReason::EntryRemoved => "content was removed from the vault",
            DenyReason::PolicyMismatch => "content is not bound to this policy",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Grant,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_grant(&self) -> bool {
        matches!(self, Decision::Grant)
    }
}

/// Registry state the gate decides over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub vault_id: VaultId,
    pub caller: Address,
    /// `checkAccess(vault_id, caller)`
    pub has_access: bool,
    /// `getAllEntries(vault_id)`
    pub entries: Vec<Entry>,
}

/// Read a fresh snapshot for `caller` on `vault_id`
pub async fn read_snapshot(
    ledger: &dyn LedgerClient,
    vault_id: &VaultId,
    caller: &Address,
) -> Result<GateSnapshot, LedgerError> {
    let has_access = ledger.check_access(vault_id, caller).await?;
    let entries = ledger.get_all_entries(vault_id).await?;
    Ok(GateSnapshot {
        vault_id: *vault_id,
        caller: *caller,
        has_access,
        entries,
    })
}

/// Decide whether `caller` may decrypt `requested_cid` in `vault_id`
pub fn evaluate(
    vault_id: &VaultId,
    requested_cid: &str,
    caller: &Address,
    snapshot: &GateSnapshot,
) -> Decision {
    if snapshot.vault_id != *vault_id || snapshot.caller != *caller {
        return Decision::Deny(DenyReason::SnapshotMismatch);
    }
    if !snapshot.has_access {
        return Decision::Deny(DenyReason::NoAccess);
    }

    let mut removed = false;
    for entry in snapshot.entries.iter().filter(|e| e.cid == requested_cid) {
        if entry.is_active() {
            return Decision::Grant;
        }
        removed = true;
    }
    if removed {
        Decision::Deny(DenyReason::EntryRemoved)
    } else {
        Decision::Deny(DenyReason::UnknownContent)
    }
}

/// [`evaluate`], and additionally require an active entry for the content to
///  carry the commitment `policy` was bound to.
pub fn evaluate_policy(
    policy: &Policy,
    requested_cid: &str,
    caller: &Address,
    snapshot: &GateSnapshot,
) -> Decision {
    let decision = evaluate(&policy.vault_id, requested_cid, caller, snapshot);
    if !decision.is_grant() {
        return decision;
    }
    let bound = snapshot
        .entries
        .iter()
        .any(|e| e.active && e.cid == requested_cid && e.commitment == policy.commitment);
    if bound {
        Decision::Grant
    } else {
        Decision::Deny(DenyReason::PolicyMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_tag_commitment;
    use crate::vault::StorageProvider;

    fn entry(vault_id: &VaultId, index: u64, tag: &str, cid: &str, active: bool) -> Entry {
        let (leaf, commitment) = derive_tag_commitment(vault_id, tag);
        Entry {
            index,
            tag: tag.to_string(),
            cid: cid.to_string(),
            provider: StorageProvider::Ipfs,
            created_at: 0,
            leaf,
            commitment,
            active,
        }
    }

    fn snapshot(has_access: bool, entries: Vec<Entry>) -> GateSnapshot {
        GateSnapshot {
            vault_id: VaultId::new([1; 32]),
            caller: Address::new([2; 20]),
            has_access,
            entries,
        }
    }

    #[test]
    fn test_grant_requires_access_and_active_entry() {
        let vault = VaultId::new([1; 32]);
        let caller = Address::new([2; 20]);
        let snap = snapshot(true, vec![entry(&vault, 0, "doc", "Qm123", true)]);
        assert_eq!(evaluate(&vault, "Qm123", &caller, &snap), Decision::Grant);

        let snap = snapshot(false, vec![entry(&vault, 0, "doc", "Qm123", true)]);
        assert_eq!(
            evaluate(&vault, "Qm123", &caller, &snap),
            Decision::Deny(DenyReason::NoAccess)
        );
    }

    #[test]
    fn test_removed_entry_is_denied_even_with_access() {
        let vault = VaultId::new([1; 32]);
        let caller = Address::new([2; 20]);
        let snap = snapshot(true, vec![entry(&vault, 0, "doc", "Qm123", false)]);
        assert_eq!(
            evaluate(&vault, "Qm123", &caller, &snap),
            Decision::Deny(DenyReason::EntryRemoved)
        );
    }

    #[test]
    fn test_readded_content_is_granted() {
        let vault = VaultId::new([1; 32]);
        let caller = Address::new([2; 20]);
        let snap = snapshot(
            true,
            vec![
                entry(&vault, 0, "doc", "Qm123", false),
                entry(&vault, 1, "doc", "Qm123", true),
            ],
        );
        assert_eq!(evaluate(&vault, "Qm123", &caller, &snap), Decision::Grant);
    }

    #[test]
    fn test_unknown_content_and_snapshot_mismatch() {
        let vault = VaultId::new([1; 32]);
        let caller = Address::new([2; 20]);
        let snap = snapshot(true, vec![entry(&vault, 0, "doc", "Qm123", true)]);
        assert_eq!(
            evaluate(&vault, "QmOther", &caller, &snap),
            Decision::Deny(DenyReason::UnknownContent)
        );
        assert_eq!(
            evaluate(&VaultId::new([9; 32]), "Qm123", &caller, &snap),
            Decision::Deny(DenyReason::SnapshotMismatch)
        );
        assert_eq!(
            evaluate(&vault, "Qm123", &Address::new([3; 20]), &snap),
            Decision::Deny(DenyReason::SnapshotMismatch)
        );
    }

    #[test]
    fn test_policy_must_match_entry_commitment() {
        let vault = VaultId::new([1; 32]);
        let caller = Address::new([2; 20]);
        let doc = entry(&vault, 0, "doc", "Qm123", true);
        let snap = snapshot(true, vec![doc.clone()]);

        let policy = Policy::new("registry", vault, doc.commitment);
        assert_eq!(
            evaluate_policy(&policy, "Qm123", &caller, &snap),
            Decision::Grant
        );

        let (_, other) = derive_tag_commitment(&vault, "photo");
        let policy = Policy::new("registry", vault, other);
        assert_eq!(
            evaluate_policy(&policy, "Qm123", &caller, &snap),
            Decision::Deny(DenyReason::PolicyMismatch)
        );
    }

    #[test]
    fn test_policy_id_binds_every_field() {
        let vault = VaultId::new([1; 32]);
        let commitment = Commitment::new([4; 32]);
        let base = Policy::new("a", vault, commitment).id();
        assert_ne!(base, Policy::new("b", vault, commitment).id());
        assert_ne!(base, Policy::new("a", VaultId::new([2; 32]), commitment).id());
        assert_ne!(base, Policy::new("a", vault, Commitment::new([5; 32])).id());
    }
}
