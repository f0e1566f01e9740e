use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// In-process storage backend.
///
/// Objects live in a shared map. An optional per-chunk delay simulates a slow link so
/// progress and cancellation behave as they would over the network.
#[derive(Clone)]
pub struct MemoryStorage {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    base_url: String,
    chunk_size: usize,
    chunk_delay: Option<Duration>,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            base_url: base_url.into(),
            chunk_size: chunk_size.max(1),
            chunk_delay: None,
        }
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    fn objects(&self) -> MutexGuard<'_, HashMap<String, Bytes>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Stored bytes for a key
    pub fn get(&self, storage_key: &str) -> Option<Bytes> {
        self.objects().get(storage_key).cloned()
    }

    /// All stored keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects().is_empty()
    }

    fn generate_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
        on_progress: &(dyn Fn(u64, u64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let total = data.len() as u64;
        let mut sent = 0u64;

        for chunk in data.chunks(self.chunk_size) {
            if let Some(delay) = self.chunk_delay {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                tracing::debug!(key = %storage_key, sent_bytes = sent, "Memory storage upload cancelled");
                return Err(StorageError::Cancelled(storage_key.to_string()));
            }
            sent += chunk.len() as u64;
            on_progress(sent, total);
        }

        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled(storage_key.to_string()));
        }

        self.objects().insert(storage_key.to_string(), data);

        tracing::debug!(key = %storage_key, size_bytes = total, "Memory storage upload successful");

        Ok(self.generate_url(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        self.objects().remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        validate_key(storage_key)?;
        Ok(self.objects().contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
