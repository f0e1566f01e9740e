use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    chunk_size: usize,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/ingest/media")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:3000/media")
    /// * `chunk_size` - Bytes written between progress reports and cancellation checks
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        chunk_size: usize,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        if chunk_size == 0 {
            return Err(StorageError::ConfigError(
                "Chunk size must be greater than 0".to_string(),
            ));
        }

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            chunk_size,
        })
    }

    /// Convert storage key to filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    /// Generate public URL for file
    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
        on_progress: &(dyn Fn(u64, u64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        let total = data.len() as u64;

        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled(storage_key.to_string()));
        }

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let mut written = 0u64;
        for chunk in data.chunks(self.chunk_size) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::warn!(
                        key = %storage_key,
                        written_bytes = written,
                        size_bytes = total,
                        "Local storage upload cancelled, partial file left in place"
                    );
                    return Err(StorageError::Cancelled(storage_key.to_string()));
                }
                result = file.write_all(chunk) => {
                    result.map_err(|e| {
                        StorageError::UploadFailed(format!(
                            "Failed to write file {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                }
            }
            written += chunk.len() as u64;
            if cancel.is_cancelled() {
                return Err(StorageError::Cancelled(storage_key.to_string()));
            }
            on_progress(written, total);
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        if cancel.is_cancelled() {
            tracing::warn!(
                key = %storage_key,
                "Local storage upload cancelled after write, file left in place"
            );
            return Err(StorageError::Cancelled(storage_key.to_string()));
        }

        let url = self.generate_url(storage_key);

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = total,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(url)
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), key = %storage_key, "Local storage delete successful");

        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
