//! Final step of a batch: attach uploaded URLs to the resolved rooms.

use serde::Serialize;
use std::sync::Arc;

use ingest_core::models::{MediaPatch, TargetId, TargetScope};
use ingest_core::{IngestError, IngestResult};

use crate::store::TargetStore;

/// URLs produced by a batch, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadedMedia {
    pub images: Vec<String>,
    pub video: Option<String>,
}

impl UploadedMedia {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.video.is_none()
    }

    pub fn to_patch(&self) -> MediaPatch {
        MediaPatch {
            append_images: self.images.clone(),
            set_video: self.video.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<TargetId>,
    /// Images newly appended across all rooms; re-applied URLs are not counted.
    pub images_appended: usize,
    pub video_set: bool,
}

#[derive(Clone)]
pub struct ApplyStage {
    store: Arc<dyn TargetStore>,
}

impl ApplyStage {
    pub fn new(store: Arc<dyn TargetStore>) -> Self {
        Self { store }
    }

    /// Merge `media` into every room in `scope`.
    ///
    /// Rooms are updated independently. When some fail, the returned
    /// [`IngestError::Apply`] names both the rooms that were updated and those that were not;
    /// successful updates are not rolled back.
    pub async fn apply(&self, scope: &TargetScope, media: &UploadedMedia) -> IngestResult<ApplyReport> {
        if media.is_empty() {
            tracing::debug!("No uploaded media to apply");
            return Ok(ApplyReport::default());
        }

        let patch = media.to_patch();
        let results = self
            .store
            .apply_media_batch(scope.target_ids(), &patch)
            .await;

        let mut report = ApplyReport {
            video_set: patch.set_video.is_some(),
            ..ApplyReport::default()
        };
        let mut failed = Vec::new();
        let mut first_error = None;
        for (id, result) in results {
            match result {
                Ok(appended) => {
                    report.applied.push(id);
                    report.images_appended += appended;
                }
                Err(e) => {
                    tracing::warn!(room_id = %id, error = %e, "Failed to apply media to room");
                    first_error.get_or_insert_with(|| format!("{:#}", e));
                    failed.push(id);
                }
            }
        }

        if !failed.is_empty() {
            return Err(IngestError::Apply {
                applied: report.applied,
                failed,
                message: first_error.unwrap_or_default(),
            });
        }

        tracing::info!(
            room_count = report.applied.len(),
            images_appended = report.images_appended,
            video_set = report.video_set,
            "Media applied to rooms"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTargetStore;
    use ingest_core::models::TargetRecord;

    fn media() -> UploadedMedia {
        UploadedMedia {
            images: vec!["https://cdn/1.jpg".to_string(), "https://cdn/2.jpg".to_string()],
            video: Some("https://cdn/tour.mp4".to_string()),
        }
    }

    #[tokio::test]
    async fn test_apply_to_every_room_in_scope() {
        let rooms = vec![TargetRecord::new("A", "bedroom"), TargetRecord::new("B", "bedroom")];
        let ids: Vec<TargetId> = rooms.iter().map(|r| r.id).collect();
        let store = Arc::new(MemoryTargetStore::new(rooms));
        let stage = ApplyStage::new(store.clone());

        let report = stage
            .apply(&TargetScope::Bulk(ids.clone()), &media())
            .await
            .unwrap();

        assert_eq!(report.applied, ids);
        assert_eq!(report.images_appended, 4);
        assert!(report.video_set);
        for id in &ids {
            let room = store.get(id).await.unwrap().unwrap();
            assert_eq!(room.images, media().images);
            assert_eq!(room.video, media().video);
        }
    }

    #[tokio::test]
    async fn test_reapply_does_not_duplicate() {
        let room = TargetRecord::new("A", "bedroom");
        let scope = TargetScope::Single(room.id);
        let store = Arc::new(MemoryTargetStore::new(vec![room.clone()]));
        let stage = ApplyStage::new(store.clone());

        stage.apply(&scope, &media()).await.unwrap();
        let report = stage.apply(&scope, &media()).await.unwrap();

        assert_eq!(report.images_appended, 0);
        assert_eq!(store.get(&room.id).await.unwrap().unwrap().images.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_failure_reports_both_sides() {
        let room = TargetRecord::new("A", "bedroom");
        let missing = TargetId::new();
        let store = Arc::new(MemoryTargetStore::new(vec![room.clone()]));
        let stage = ApplyStage::new(store.clone());

        let err = stage
            .apply(&TargetScope::Bulk(vec![room.id, missing]), &media())
            .await
            .unwrap_err();

        match err {
            IngestError::Apply { applied, failed, .. } => {
                assert_eq!(applied, vec![room.id]);
                assert_eq!(failed, vec![missing]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // no rollback
        assert_eq!(store.get(&room.id).await.unwrap().unwrap().images.len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_uploaded_touches_no_room() {
        let room = TargetRecord::new("A", "bedroom");
        let store = Arc::new(MemoryTargetStore::new(vec![room.clone()]));
        let stage = ApplyStage::new(store.clone());

        let report = stage
            .apply(&TargetScope::Single(room.id), &UploadedMedia::default())
            .await
            .unwrap();

        assert!(report.applied.is_empty());
        assert_eq!(store.get(&room.id).await.unwrap().unwrap(), room);
    }
}
