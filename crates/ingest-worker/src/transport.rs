//! Upload transport: one file to the storage backend with progress and cancellation.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use ingest_core::models::{MediaFile, TargetScope};
use ingest_core::{IngestError, IngestResult};
use ingest_storage::{generate_storage_key, Storage};

/// Scope segment used in keys for uploads shared by several targets.
const BULK_SCOPE_SEGMENT: &str = "bulk";

/// A stored object: the key it was written under and the URL it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

#[derive(Clone)]
pub struct Transport {
    storage: Arc<dyn Storage>,
    key_prefix: String,
}

impl Transport {
    pub fn new(storage: Arc<dyn Storage>, key_prefix: impl Into<String>) -> Self {
        Self {
            storage,
            key_prefix: key_prefix.into(),
        }
    }

    fn scope_segment(scope: &TargetScope) -> String {
        match scope {
            TargetScope::Single(id) => id.to_string(),
            TargetScope::Bulk(_) => BULK_SCOPE_SEGMENT.to_string(),
        }
    }

    /// Upload `file` and return where it landed.
    ///
    /// `on_progress` receives whole percentages that never decrease and stops being called
    /// once `cancel` fires. A put that finishes after cancellation was requested is reported
    /// as [`IngestError::Cancelled`]; the written object is left behind.
    pub async fn send(
        &self,
        file: &MediaFile,
        scope: &TargetScope,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> IngestResult<StoredObject> {
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled {
                file: file.name.clone(),
            });
        }

        let key = generate_storage_key(&self.key_prefix, &Self::scope_segment(scope), &file.name);
        let last_percent = AtomicU8::new(0);
        let report = |sent: u64, total: u64| {
            if cancel.is_cancelled() {
                return;
            }
            let percent = if total == 0 {
                100
            } else {
                (sent.min(total) * 100 / total) as u8
            };
            if percent > last_percent.fetch_max(percent, Ordering::Relaxed) {
                on_progress(percent);
            }
        };

        let start = Instant::now();
        let result = self
            .storage
            .put(&key, file.data.clone(), &file.content_type, &report, cancel)
            .await;

        match result {
            Ok(_) if cancel.is_cancelled() => {
                tracing::warn!(
                    file = %file.name,
                    key = %key,
                    "Upload finished after cancellation; stored object left unreferenced"
                );
                Err(IngestError::Cancelled {
                    file: file.name.clone(),
                })
            }
            Ok(url) => {
                tracing::info!(
                    file = %file.name,
                    key = %key,
                    size_bytes = file.size(),
                    backend = %self.storage.backend_type(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "File uploaded"
                );
                Ok(StoredObject { key, url })
            }
            Err(e) if e.is_cancelled() || cancel.is_cancelled() => {
                tracing::info!(file = %file.name, key = %key, "Upload cancelled");
                Err(IngestError::Cancelled {
                    file: file.name.clone(),
                })
            }
            Err(e) => {
                tracing::warn!(file = %file.name, key = %key, error = %e, "Upload failed");
                Err(IngestError::Transport {
                    file: file.name.clone(),
                    message: e.to_string(),
                })
            }
        }
    }
}
