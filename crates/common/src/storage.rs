//! Content-addressed storage for ciphertext envelopes and manifests

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

/// Prefix on ids minted by [`MemoryContentStore`]
pub const MEMORY_CID_PREFIX: &str = "bafk";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("transient storage failure: {0}")]
    Transient(String),
}

impl StorageError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Transient(_))
    }
}

#[async_trait]
pub trait ContentStore: Send + Sync + Debug {
    /// Store `data`, returning its content id. Storing the same bytes twice
    ///  returns the same id.
    async fn put(&self, data: Vec<u8>) -> Result<String, StorageError>;

    async fn get(&self, cid: &str) -> Result<Vec<u8>, StorageError>;
}

/// BLAKE3-addressed store held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    inner: Arc<RwLock<MemoryContentStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryContentStoreInner {
    blobs: HashMap<String, Vec<u8>>,
    fail_puts: u32,
    fail_gets: u32,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cid_for(data: &[u8]) -> String {
        format!("{}{}", MEMORY_CID_PREFIX, blake3::hash(data).to_hex())
    }

    /// The next `n` puts fail without storing anything
    pub fn fail_next_puts(&self, n: u32) {
        self.inner.write().fail_puts = n;
    }

    pub fn fail_next_gets(&self, n: u32) {
        self.inner.write().fail_gets = n;
    }

    /// Overwrite the bytes stored under `cid`, bypassing content addressing
    pub fn corrupt(&self, cid: &str, data: Vec<u8>) {
        self.inner.write().blobs.insert(cid.to_string(), data);
    }

    pub fn len(&self) -> usize {
        self.inner.read().blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: Vec<u8>) -> Result<String, StorageError> {
        let mut inner = self.inner.write();
        if inner.fail_puts > 0 {
            inner.fail_puts -= 1;
            return Err(StorageError::Transient("put timed out".to_string()));
        }
        let cid = Self::cid_for(&data);
        inner.blobs.insert(cid.clone(), data);
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> Result<Vec<u8>, StorageError> {
        let mut inner = self.inner.write();
        if inner.fail_gets > 0 {
            inner.fail_gets -= 1;
            return Err(StorageError::Transient("get timed out".to_string()));
        }
        inner
            .blobs
            .get(cid)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(cid.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryContentStore::new();
        let cid = store.put(b"hello".to_vec()).await.unwrap();
        assert!(cid.starts_with(MEMORY_CID_PREFIX));
        assert_eq!(store.get(&cid).await.unwrap(), b"hello");
        assert_eq!(store.put(b"hello".to_vec()).await.unwrap(), cid);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_and_faults() {
        let store = MemoryContentStore::new();
        assert_eq!(
            store.get("bafkmissing").await.unwrap_err(),
            StorageError::NotFound("bafkmissing".to_string())
        );

        store.fail_next_puts(1);
        assert!(store.put(b"x".to_vec()).await.unwrap_err().is_transient());
        assert!(store.is_empty());
        assert!(store.put(b"x".to_vec()).await.is_ok());
    }
}
