/// In-process test harness for vault workflows
///
/// Wires an in-memory ledger, content store, mock prover, and decryption
/// network together so full publish and unlock runs need no external
/// infrastructure. Faults can be injected through the ledger and store
/// handles.
///
/// # Example
///
/// ```rust,ignore
/// use common::testkit::TestHarness;
/// use common::crypto::Password;
/// use common::vault::StorageProvider;
///
/// #[tokio::test]
/// async fn test_unlock() -> anyhow::Result<()> {
///     let harness = TestHarness::new();
///     let alice = harness.orchestrator("alice");
///     let bob = harness.orchestrator("bob");
///
///     let password = Password::from("p1");
///     let vault_id = alice.create_vault(&password).await?;
///     alice
///         .add_content(&vault_id, "doc", b"secret", StorageProvider::Ipfs)
///         .await?;
///
///     let plaintext = bob.decrypt_tag(&password, &vault_id, "doc").await?;
///     assert_eq!(plaintext, b"secret");
///     Ok(())
/// }
/// ```
mod harness;

pub use harness::{TestHarness, TEST_CREATION_FEE};
