//! Content-addressable blob storage for ciphertexts.
//!
//! Ciphertexts are self-protecting, so the store needs no access control;
//! anyone may fetch any blob. Blob ids are content-derived: storing the
//! same bytes twice yields the same id.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use sealvault_core::BlobId;

/// Errors from blob storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No blob with this id exists (or its storage term lapsed).
    #[error("blob not found: {0}")]
    BlobNotFound(BlobId),

    /// Backend failure.
    #[error("storage error: {0}")]
    Backend(String),
}

/// A content-addressable blob store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes for at least `epochs` storage epochs, returning the
    /// content-derived blob id.
    async fn put(&self, bytes: Vec<u8>, epochs: u32) -> Result<BlobId, StoreError>;

    /// Fetch a blob by id.
    async fn get(&self, id: &BlobId) -> Result<Vec<u8>, StoreError>;
}

/// In-memory blob store. Ignores the storage term and retains forever.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<BlobId, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>, _epochs: u32) -> Result<BlobId, StoreError> {
        let id = BlobId::for_bytes(&bytes);
        self.blobs.write().await.insert(id, bytes);
        Ok(id)
    }

    async fn get(&self, id: &BlobId) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(StoreError::BlobNotFound(*id))
    }
}
