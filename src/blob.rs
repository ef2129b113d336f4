//! Content-Addressed Blob Store Interface
//!
//! Documents live outside the ledger; the core stores only the returned
//! content hash plus a category/version tuple. The in-memory implementation
//! exists for tests and local composition.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum BlobError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob store unavailable: {0}")]
    Unavailable(String),
}

/// Immutable, content-addressed document storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes, returning their SHA-256 content hash (64 hex chars)
    async fn put(&self, bytes: Vec<u8>) -> Result<String, BlobError>;

    async fn get(&self, content_hash: &str) -> Result<Vec<u8>, BlobError>;
}

#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self {
            blobs: DashMap::new(),
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, bytes: Vec<u8>) -> Result<String, BlobError> {
        let hash = sha256::digest(bytes.as_slice());
        self.blobs.insert(hash.clone(), bytes);
        Ok(hash)
    }

    async fn get(&self, content_hash: &str) -> Result<Vec<u8>, BlobError> {
        self.blobs
            .get(content_hash)
            .map(|b| b.clone())
            .ok_or_else(|| BlobError::NotFound(content_hash.to_string()))
    }
}
