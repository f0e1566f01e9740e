#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-memory")]
use crate::MemoryStorage;
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use ingest_core::IngestConfig;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &IngestConfig) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::new(
                config.local_storage_path.clone(),
                config.local_storage_base_url.clone(),
                config.upload_chunk_size_bytes,
            )
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => {
            if config.upload_chunk_size_bytes == 0 {
                return Err(StorageError::ConfigError(
                    "Chunk size must be greater than 0".to_string(),
                ));
            }
            Ok(Arc::new(MemoryStorage::new(
                config.local_storage_base_url.clone(),
                config.upload_chunk_size_bytes,
            )))
        }

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)"
                .to_string(),
        )),
    }
}
