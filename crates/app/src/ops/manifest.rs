use std::path::PathBuf;

use clap::Args;

use common::crypto::{Bytes32, HexError};
use common::vault::{ManifestError, VaultManifest};

/// Check a manifest document: every tree layer, the declared root, and
///  optionally the root a registry holds
#[derive(Args, Debug, Clone)]
pub struct Manifest {
    /// Path to the manifest JSON document
    pub path: PathBuf,

    /// Require this Merkle root (hex), as read from the registry
    #[arg(long)]
    pub root: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestOpError {
    #[error("failed to read {0:?}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("invalid root: {0}")]
    InvalidRoot(#[from] HexError),
    #[error("manifest rejected: {0}")]
    Rejected(#[from] ManifestError),
}

#[async_trait::async_trait]
impl crate::op::Op for Manifest {
    type Error = ManifestOpError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| ManifestOpError::Io(self.path.clone(), e))?;
        let manifest = VaultManifest::from_json(&bytes)?;

        let tree = match &self.root {
            Some(root) => manifest.verify_against(&Bytes32::from_hex(root)?)?,
            None => manifest.verify()?,
        };
        tracing::debug!(path = ?self.path, root = %tree.root(), "manifest verified");

        let mut lines = vec![format!(
            "manifest ok: {} entries, depth {}, root {}",
            manifest.entries().len(),
            tree.depth(),
            tree.root()
        )];
        for entry in manifest.entries() {
            lines.push(format!(
                "  [{}] {} -> {} (commitment {})",
                entry.index, entry.tag, entry.cid, entry.commitment
            ));
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};
    use common::crypto::{derive_password_hash, derive_vault_id, Address, Password};
    use common::vault::ManifestEntry;
    use tempfile::TempDir;

    fn write_manifest(temp: &TempDir) -> (PathBuf, VaultManifest) {
        let vault_id = derive_vault_id(
            &derive_password_hash(&Password::from("p1")),
            &Address::new([1; 20]),
        );
        let manifest = VaultManifest::build(vec![
            ManifestEntry::derive(&vault_id, 0, "doc", "Qm0"),
            ManifestEntry::derive(&vault_id, 1, "photo", "Qm1"),
            ManifestEntry::derive(&vault_id, 2, "notes", "Qm2"),
        ])
        .unwrap();
        let path = temp.path().join("manifest.json");
        std::fs::write(&path, manifest.to_json().unwrap()).unwrap();
        (path, manifest)
    }

    #[tokio::test]
    async fn test_verify_manifest() {
        let temp = TempDir::new().unwrap();
        let (path, manifest) = write_manifest(&temp);

        let op = Manifest {
            path,
            root: Some(manifest.merkle_root().to_hex()),
        };
        let output = op.execute(&OpContext::new(None)).await.unwrap();
        assert!(output.starts_with("manifest ok: 3 entries"));
        assert!(output.contains("photo -> Qm1"));
    }

    #[tokio::test]
    async fn test_verify_manifest_wrong_root() {
        let temp = TempDir::new().unwrap();
        let (path, _) = write_manifest(&temp);

        let op = Manifest {
            path,
            root: Some(Bytes32::new([9; 32]).to_hex()),
        };
        assert!(matches!(
            op.execute(&OpContext::new(None)).await,
            Err(ManifestOpError::Rejected(
                ManifestError::RegistryRootMismatch { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_verify_tampered_manifest() {
        let temp = TempDir::new().unwrap();
        let (path, _) = write_manifest(&temp);

        let mut doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        doc["merkleRoot"] = serde_json::json!(Bytes32::new([7; 32]).to_hex());
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let op = Manifest { path, root: None };
        assert!(matches!(
            op.execute(&OpContext::new(None)).await,
            Err(ManifestOpError::Rejected(ManifestError::RootMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let op = Manifest {
            path: temp.path().join("nope.json"),
            root: None,
        };
        assert!(matches!(
            op.execute(&OpContext::new(None)).await,
            Err(ManifestOpError::Io(..))
        ));
    }
}
