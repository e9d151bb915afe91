//! Shared test utilities for vault workflow integration tests
#![allow(dead_code)]

use common::crypto::{Password, VaultId};
use common::orchestrator::{PublishedEntry, VaultOrchestrator};
use common::testkit::TestHarness;
use common::vault::StorageProvider;

pub const PASSWORD: &str = "correct horse battery staple";

pub struct TestEnv {
    pub harness: TestHarness,
    pub owner: VaultOrchestrator,
    pub user: VaultOrchestrator,
    pub password: Password,
    pub vault_id: VaultId,
}

/// A harness with an `alice`-owned vault and a second account `bob`
pub async fn setup_test_env() -> TestEnv {
    let harness = TestHarness::new();
    let owner = harness.orchestrator("alice");
    let user = harness.orchestrator("bob");
    let password = Password::from(PASSWORD);
    let vault_id = owner.create_vault(&password).await.unwrap();
    TestEnv {
        harness,
        owner,
        user,
        password,
        vault_id,
    }
}

/// [`setup_test_env`] with one published entry per `(tag, plaintext)`
pub async fn setup_with_content(items: &[(&str, &str)]) -> (TestEnv, Vec<PublishedEntry>) {
    let env = setup_test_env().await;
    let mut published = Vec::new();
    for (tag, plaintext) in items {
        let entry = env
            .owner
            .add_content(&env.vault_id, tag, plaintext.as_bytes(), StorageProvider::Ipfs)
            .await
            .unwrap();
        published.push(entry);
    }
    (env, published)
}
