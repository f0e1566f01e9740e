//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Upload cancelled: {0}")]
    Cancelled(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StorageError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// The upload transport writes through this trait, so the pipeline works with any backend
/// without coupling to its implementation details.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `storage_key` and return its public URL.
    ///
    /// `on_progress` is invoked after each written chunk with `(bytes_sent, total_bytes)`;
    /// byte counts never decrease. The callback may borrow from the caller.
    /// Backends check `cancel` before every chunk and once more before returning; a
    /// cancelled put returns [`StorageError::Cancelled`] and reports no further progress.
    /// Bytes already written by a cancelled put are left in place.
    async fn put(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        on_progress: &(dyn Fn(u64, u64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> StorageResult<String>;

    /// Delete a file by its storage key. Deleting a missing key succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
