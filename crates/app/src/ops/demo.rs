use clap::Args;

use common::crypto::Password;
use common::orchestrator::{ErrorCategory, VaultError};
use common::testkit::TestHarness;
use common::vault::{RegistryConfig, StorageProvider};

const DEFAULT_ITEMS: [(&str, &str); 2] = [
    ("doc", "the quarterly numbers"),
    ("photo", "a picture of a tree"),
];

/// Run the full publish and unlock flow against an in-process ledger,
///  content store, prover, and decryption network
#[derive(Args, Debug, Clone)]
pub struct Demo {
    /// Vault password
    #[arg(long, default_value = "correct horse battery staple")]
    pub password: String,

    /// Content to publish as tag=text, may be repeated
    #[arg(long = "item", value_parser = parse_item)]
    pub items: Vec<(String, String)>,

    /// Storage provider recorded on each entry
    #[arg(long, default_value = "ipfs")]
    pub provider: StorageProvider,
}

fn parse_item(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((tag, text)) if !tag.trim().is_empty() => Ok((tag.to_string(), text.to_string())),
        _ => Err(format!("expected tag=text, got {:?}", s)),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("config: {0}")]
    State(#[from] crate::state::StateError),
    #[error("{category} failure: {source}")]
    Vault {
        category: ErrorCategory,
        #[source]
        source: VaultError,
    },
    #[error("unexpected outcome: {0}")]
    Unexpected(String),
}

impl From<VaultError> for DemoError {
    fn from(source: VaultError) -> Self {
        DemoError::Vault {
            category: source.category(),
            source,
        }
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Demo {
    type Error = DemoError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ctx.config()?;
        let harness = TestHarness::with_registry(
            config.orchestrator.clone(),
            RegistryConfig {
                creation_fee: config.creation_fee,
                ..Default::default()
            },
        );
        let owner = harness.orchestrator("owner");
        let reader = harness.orchestrator("reader");
        let password = Password::from(self.password.as_str());

        let items: Vec<(String, String)> = if self.items.is_empty() {
            DEFAULT_ITEMS
                .iter()
                .map(|(tag, text)| (tag.to_string(), text.to_string()))
                .collect()
        } else {
            self.items.clone()
        };

        let mut report = Vec::new();
        let vault_id = owner.create_vault(&password).await?;
        report.push(format!("owner {} created vault {}", owner.account(), vault_id));

        let mut published = Vec::new();
        for (tag, text) in &items {
            let entry = owner
                .add_content(&vault_id, tag, text.as_bytes(), self.provider)
                .await?;
            report.push(format!(
                "published [{}] {} as {} (root {})",
                entry.index, entry.tag, entry.cid, entry.merkle_root
            ));
            published.push(entry);
        }

        for (entry, (_, text)) in published.iter().zip(&items) {
            let plaintext = reader.decrypt(&password, &vault_id, entry.index).await?;
            if plaintext != text.as_bytes() {
                return Err(DemoError::Unexpected(format!(
                    "entry {} decrypted to different content",
                    entry.index
                )));
            }
            report.push(format!(
                "reader {} decrypted [{}] {}: {:?}",
                reader.account(),
                entry.index,
                entry.tag,
                String::from_utf8_lossy(&plaintext)
            ));
        }

        reader.revoke_access(&vault_id).await?;
        report.push("reader revoked its own access".to_string());
        if let Some(last) = published.last() {
            match reader.decrypt(&password, &vault_id, last.index).await {
                Err(e @ VaultError::ReplayDetected(_)) => {
                    report.push(format!("reader retried [{}]: {}", last.index, e));
                }
                other => {
                    return Err(DemoError::Unexpected(format!(
                        "spent nullifier was accepted again: {:?}",
                        other.map(|p| p.len())
                    )))
                }
            }
        }

        if let Some(first) = published.first() {
            owner.remove_entry(&vault_id, first.index).await?;
            report.push(format!("owner removed [{}] {}", first.index, first.tag));
            match reader.decrypt(&password, &vault_id, first.index).await {
                Err(VaultError::Denied(reason)) => {
                    report.push(format!("reader denied [{}]: {}", first.index, reason));
                }
                other => {
                    return Err(DemoError::Unexpected(format!(
                        "removed entry was not denied: {:?}",
                        other.map(|p| p.len())
                    )))
                }
            }
        }

        report.push(format!(
            "{} ledger transactions, {} stored objects",
            harness.ledger().transaction_count(),
            harness.storage().len()
        ));
        Ok(report.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};
    use tempfile::TempDir;

    #[test]
    fn test_parse_item() {
        assert_eq!(
            parse_item("doc=a=b").unwrap(),
            ("doc".to_string(), "a=b".to_string())
        );
        assert!(parse_item("no separator").is_err());
        assert!(parse_item("=text").is_err());
    }

    #[tokio::test]
    async fn test_demo_runs() {
        let temp = TempDir::new().unwrap();
        let ctx = OpContext::new(Some(temp.path().join("uninitialized")));
        let demo = Demo {
            password: "p1".to_string(),
            items: vec![
                ("a".to_string(), "first".to_string()),
                ("b".to_string(), "second".to_string()),
            ],
            provider: StorageProvider::Storacha,
        };

        let report = demo.execute(&ctx).await.unwrap();
        assert!(report.contains("decrypted [1] b: \"second\""));
        assert!(report.contains("reader denied [0]"));
        assert!(report.contains("replay detected"));
    }

    #[tokio::test]
    async fn test_demo_empty_password() {
        let temp = TempDir::new().unwrap();
        let ctx = OpContext::new(Some(temp.path().join("uninitialized")));
        let demo = Demo {
            password: String::new(),
            items: Vec::new(),
            provider: StorageProvider::Ipfs,
        };
        assert!(matches!(
            demo.execute(&ctx).await,
            Err(DemoError::Vault {
                category: ErrorCategory::Validation,
                ..
            })
        ));
    }
}
