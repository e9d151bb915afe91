//! Full publish and unlock runs across several accounts and vaults

use common::crypto::Password;
use common::orchestrator::{ErrorCategory, OrchestratorConfig, RetryPolicy};
use common::proof::CircuitId;
use common::testkit::TestHarness;
use common::vault::StorageProvider;

#[tokio::test]
async fn test_many_readers() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let alice = harness.orchestrator("alice");
    let password = Password::from("shared secret");
    let vault_id = alice.create_vault(&password).await?;

    for i in 0..5u8 {
        alice
            .add_content(
                &vault_id,
                &format!("item-{}", i),
                &[i; 16],
                StorageProvider::Ipfs,
            )
            .await?;
    }

    for name in ["bob", "carol", "dave"] {
        let reader = harness.orchestrator(name);
        for i in 0..5u8 {
            let plaintext = reader
                .decrypt_tag(&password, &vault_id, &format!("item-{}", i))
                .await?;
            assert_eq!(plaintext, vec![i; 16]);
        }
    }

    // one vault, five entries, three proofs
    assert_eq!(harness.ledger().transaction_count(), 1 + 5 * 2 + 3);
    Ok(())
}

#[tokio::test]
async fn test_content_added_after_access() -> anyhow::Result<()> {
    let harness = TestHarness::new();
    let alice = harness.orchestrator("alice");
    let bob = harness.orchestrator("bob");
    let password = Password::from("p1");
    let vault_id = alice.create_vault(&password).await?;

    alice
        .add_content(&vault_id, "early", b"early", StorageProvider::Ipfs)
        .await?;
    assert_eq!(bob.decrypt(&password, &vault_id, 0).await?, b"early");

    // the root moves on, access held from the older root still counts
    alice
        .add_content(&vault_id, "late", b"late", StorageProvider::Pinata)
        .await?;
    assert_eq!(bob.decrypt(&password, &vault_id, 1).await?, b"late");
    Ok(())
}

#[tokio::test]
async fn test_prover_for_another_circuit() -> anyhow::Result<()> {
    // the registry and prover use the configured circuit, the orchestrator
    //  asks for a different one
    let harness = TestHarness::with_config(OrchestratorConfig {
        retry: RetryPolicy::immediate(2),
        ..Default::default()
    });
    let alice = harness.orchestrator("alice");
    let password = Password::from("p1");
    let vault_id = alice.create_vault(&password).await?;
    alice
        .add_content(&vault_id, "doc", b"x", StorageProvider::Ipfs)
        .await?;

    let mut config = harness.config().clone();
    config.circuit_id = CircuitId::new("some-other-circuit");
    let misconfigured = common::orchestrator::VaultOrchestrator::new(
        harness.orchestrator("bob").ledger().clone(),
        harness.prover().clone(),
        std::sync::Arc::new(harness.storage().clone()),
        std::sync::Arc::new(common::decryption::MemoryDecryptionNetwork::new(
            harness.orchestrator("bob").ledger().clone(),
        )),
        config,
    );

    let err = misconfigured
        .decrypt(&password, &vault_id, 0)
        .await
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::ProofInvalid);
    Ok(())
}
