//! Editor, trimmer and room-store stand-ins.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ingest_core::models::{MediaFile, MediaPatch, TargetId, TargetRecord, TrimRange};
use ingest_processing::{EditOutcome, ImageEditor, TrimOutcome, VideoTrimmer};
use ingest_worker::{MemoryTargetStore, TargetStore};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Edits every image by appending a marker, except names listed as failing.
#[derive(Clone, Default)]
pub struct RecordingEditor {
    seen: Arc<Mutex<Vec<String>>>,
    failing: Arc<HashSet<String>>,
}

impl RecordingEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(names: &[&str]) -> Self {
        Self {
            seen: Arc::default(),
            failing: Arc::new(names.iter().map(|n| n.to_string()).collect()),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEditor for RecordingEditor {
    async fn edit(&self, image: &MediaFile) -> Result<EditOutcome> {
        self.seen.lock().unwrap().push(image.name.clone());
        if self.failing.contains(&image.name) {
            return Err(anyhow!("editor crashed on {}", image.name));
        }
        let mut data = image.data.to_vec();
        data.extend_from_slice(b"-edited");
        Ok(EditOutcome::Edited(image.with_data(data)))
    }
}

/// Editor that blocks until released, as a user would while the editor is open.
#[derive(Clone)]
pub struct GatedEditor {
    pub opened: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedEditor {
    pub fn new() -> Self {
        Self {
            opened: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl ImageEditor for GatedEditor {
    async fn edit(&self, _image: &MediaFile) -> Result<EditOutcome> {
        self.opened.notify_one();
        self.release.notified().await;
        Ok(EditOutcome::Skipped)
    }
}

/// Trims to a fixed range of a clip assumed to last `duration` seconds, keeping the
/// matching share of bytes.
#[derive(Clone)]
pub struct RangeTrimmer {
    start: f64,
    end: f64,
    duration: f64,
    calls: Arc<Mutex<Vec<String>>>,
}

impl RangeTrimmer {
    pub fn new(start: f64, end: f64, duration: f64) -> Self {
        Self {
            start,
            end,
            duration,
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoTrimmer for RangeTrimmer {
    async fn trim(
        &self,
        video: &MediaFile,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<TrimOutcome> {
        self.calls.lock().unwrap().push(video.name.clone());
        let range = TrimRange::new(self.start, self.end, self.duration)?;
        let len = video.size() as f64;
        let from = (len * self.start / self.duration) as usize;
        let to = (len * self.end / self.duration) as usize;
        on_progress(50);
        let file = video.with_data(video.data.slice(from..to));
        on_progress(100);
        Ok(TrimOutcome::Trimmed { file, range })
    }
}

/// Room store whose writes fail for selected rooms.
pub struct FlakyTargetStore {
    inner: MemoryTargetStore,
    failing: HashSet<TargetId>,
}

impl FlakyTargetStore {
    pub fn new(records: Vec<TargetRecord>, failing: &[TargetId]) -> Self {
        Self {
            inner: MemoryTargetStore::new(records),
            failing: failing.iter().copied().collect(),
        }
    }
}

#[async_trait]
impl TargetStore for FlakyTargetStore {
    async fn list(&self) -> Result<Vec<TargetRecord>> {
        self.inner.list().await
    }

    async fn get(&self, id: &TargetId) -> Result<Option<TargetRecord>> {
        self.inner.get(id).await
    }

    async fn apply_media(&self, id: &TargetId, patch: &MediaPatch) -> Result<usize> {
        if self.failing.contains(id) {
            return Err(anyhow!("write rejected for room {}", id));
        }
        self.inner.apply_media(id, patch).await
    }
}
