//! Target (room) persistence.
//!
//! The pipeline only needs to list targets, look one up, and merge uploaded media into
//! it. [`MemoryTargetStore`] backs tests and embedded use; [`JsonFileTargetStore`] keeps
//! records in a single JSON document for the CLI.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use ingest_core::models::{MediaPatch, TargetId, TargetRecord};

#[async_trait]
pub trait TargetStore: Send + Sync {
    async fn list(&self) -> Result<Vec<TargetRecord>>;

    async fn get(&self, id: &TargetId) -> Result<Option<TargetRecord>>;

    /// Merge `patch` into one target. Returns the number of images appended.
    async fn apply_media(&self, id: &TargetId, patch: &MediaPatch) -> Result<usize>;

    /// Merge the same patch into several targets, one result per target in input order.
    ///
    /// The default issues the per-target writes concurrently; a failure for one target
    /// does not undo the writes that succeeded.
    async fn apply_media_batch(
        &self,
        ids: &[TargetId],
        patch: &MediaPatch,
    ) -> Vec<(TargetId, Result<usize>)> {
        let writes = ids.iter().map(|id| async move { (*id, self.apply_media(id, patch).await) });
        join_all(writes).await
    }
}

#[derive(Clone, Default)]
pub struct MemoryTargetStore {
    records: Arc<RwLock<Vec<TargetRecord>>>,
}

impl MemoryTargetStore {
    pub fn new(records: Vec<TargetRecord>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub async fn insert(&self, record: TargetRecord) {
        self.records.write().await.push(record);
    }
}

#[async_trait]
impl TargetStore for MemoryTargetStore {
    async fn list(&self) -> Result<Vec<TargetRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn get(&self, id: &TargetId) -> Result<Option<TargetRecord>> {
        Ok(self.records.read().await.iter().find(|r| &r.id == id).cloned())
    }

    async fn apply_media(&self, id: &TargetId, patch: &MediaPatch) -> Result<usize> {
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| anyhow!("Room not found: {}", id))?;
        Ok(record.apply(patch))
    }
}

/// Stores every record in one JSON array on disk.
///
/// Writes go to a sibling temporary file which is then renamed over the original.
/// A process-local lock serializes read-modify-write cycles.
pub struct JsonFileTargetStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileTargetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<TargetRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) if raw.is_empty() => Ok(Vec::new()),
            Ok(raw) => serde_json::from_slice(&raw)
                .with_context(|| format!("Failed to parse rooms file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read rooms file {}", self.path.display())),
        }
    }

    async fn save(&self, records: &[TargetRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let raw = serde_json::to_vec_pretty(records).context("Failed to serialize rooms")?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace rooms file {}", self.path.display()))?;
        Ok(())
    }

    /// Add a new record and persist it.
    pub async fn create(&self, record: TargetRecord) -> Result<TargetRecord> {
        let _guard = self.lock.lock().await;
        let mut records = self.load().await?;
        if records.iter().any(|r| r.id == record.id) {
            return Err(anyhow!("Room already exists: {}", record.id));
        }
        records.push(record.clone());
        self.save(&records).await?;
        tracing::info!(room_id = %record.id, name = %record.name, "Room created");
        Ok(record)
    }
}

#[async_trait]
impl TargetStore for JsonFileTargetStore {
    async fn list(&self) -> Result<Vec<TargetRecord>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    async fn get(&self, id: &TargetId) -> Result<Option<TargetRecord>> {
        Ok(self.list().await?.into_iter().find(|r| &r.id == id))
    }

    async fn apply_media(&self, id: &TargetId, patch: &MediaPatch) -> Result<usize> {
        let mut results = self.apply_media_batch(std::slice::from_ref(id), patch).await;
        match results.pop() {
            Some((_, result)) => result,
            None => Err(anyhow!("Room not found: {}", id)),
        }
    }

    /// One load and one write for the whole batch. Unknown ids fail individually; if the
    /// final write fails, every target is reported as failed.
    async fn apply_media_batch(
        &self,
        ids: &[TargetId],
        patch: &MediaPatch,
    ) -> Vec<(TargetId, Result<usize>)> {
        let _guard = self.lock.lock().await;
        let mut records = match self.load().await {
            Ok(records) => records,
            Err(e) => {
                let message = format!("{:#}", e);
                return ids.iter().map(|id| (*id, Err(anyhow!("{}", message)))).collect();
            }
        };

        let mut results: Vec<(TargetId, Result<usize>)> = ids
            .iter()
            .map(|id| {
                let result = records
                    .iter_mut()
                    .find(|r| &r.id == id)
                    .map(|record| record.apply(patch))
                    .ok_or_else(|| anyhow!("Room not found: {}", id));
                (*id, result)
            })
            .collect();

        if results.iter().any(|(_, r)| r.is_ok()) {
            if let Err(e) = self.save(&records).await {
                let message = format!("{:#}", e);
                tracing::error!(error = %message, path = %self.path.display(), "Failed to persist rooms");
                for (_, result) in results.iter_mut() {
                    if result.is_ok() {
                        *result = Err(anyhow!("{}", message));
                    }
                }
            }
        }
        results
    }
}
