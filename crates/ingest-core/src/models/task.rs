use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::media::MediaKind;
use super::target::TargetId;
use crate::error::{IngestError, IngestResult};

/// Generated per-file identifier. Used as the cancellation key so that two files sharing
/// a name never share a cancellation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Identifies one submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStage {
    Queued,
    Editing,
    Trimming,
    Uploading,
    Complete,
    Error,
    Cancelled,
}

impl TaskStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStage::Complete | TaskStage::Error | TaskStage::Cancelled
        )
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: TaskStage) -> bool {
        use TaskStage::*;
        match (self, next) {
            (Queued, Editing | Trimming | Uploading) => true,
            (Editing | Trimming, Uploading) => true,
            (Uploading, Complete) => true,
            (Queued | Editing | Trimming | Uploading, Error | Cancelled) => true,
            _ => false,
        }
    }
}

impl Display for TaskStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskStage::Queued => write!(f, "queued"),
            TaskStage::Editing => write!(f, "editing"),
            TaskStage::Trimming => write!(f, "trimming"),
            TaskStage::Uploading => write!(f, "uploading"),
            TaskStage::Complete => write!(f, "complete"),
            TaskStage::Error => write!(f, "error"),
            TaskStage::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for TaskStage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStage::Queued),
            "editing" => Ok(TaskStage::Editing),
            "trimming" => Ok(TaskStage::Trimming),
            "uploading" => Ok(TaskStage::Uploading),
            "complete" => Ok(TaskStage::Complete),
            "error" => Ok(TaskStage::Error),
            "cancelled" => Ok(TaskStage::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid task stage: {}", s)),
        }
    }
}

/// Resolved set of records a batch applies to. `Bulk` is never empty once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "targets", rename_all = "snake_case")]
pub enum TargetScope {
    Single(TargetId),
    Bulk(Vec<TargetId>),
}

impl TargetScope {
    pub fn target_ids(&self) -> &[TargetId] {
        match self {
            TargetScope::Single(id) => std::slice::from_ref(id),
            TargetScope::Bulk(ids) => ids,
        }
    }

    pub fn is_bulk(&self) -> bool {
        matches!(self, TargetScope::Bulk(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub message: String,
    /// Whether resubmitting the file can succeed.
    pub recoverable: bool,
}

/// One file's unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadTask {
    pub id: TaskId,
    pub file_name: String,
    pub kind: MediaKind,
    pub scope: TargetScope,
    stage: TaskStage,
    progress: u8,
    url: Option<String>,
    failure: Option<TaskFailure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadTask {
    pub fn new(file_name: impl Into<String>, kind: MediaKind, scope: TargetScope) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            file_name: file_name.into(),
            kind,
            scope,
            stage: TaskStage::Queued,
            progress: 0,
            url: None,
            failure: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self) -> TaskStage {
        self.stage
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        self.failure.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Move to `next`, enforcing the lifecycle. Editing applies to images only and
    /// trimming to videos only.
    pub fn advance(&mut self, next: TaskStage) -> IngestResult<()> {
        let kind_allowed = match next {
            TaskStage::Editing => self.kind == MediaKind::Image,
            TaskStage::Trimming => self.kind == MediaKind::Video,
            _ => true,
        };
        if !kind_allowed || !self.stage.can_transition_to(next) {
            return Err(IngestError::Internal(format!(
                "Invalid stage transition for {} ({}): {} -> {}",
                self.file_name, self.kind, self.stage, next
            )));
        }
        self.stage = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Record an upload progress value. Values are clamped to 100 and never move
    /// backwards; updates outside the uploading stage are ignored.
    pub fn record_progress(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if self.stage != TaskStage::Uploading || percent <= self.progress {
            return false;
        }
        self.progress = percent;
        self.updated_at = Utc::now();
        true
    }

    pub fn complete(&mut self, url: String) -> IngestResult<()> {
        self.advance(TaskStage::Complete)?;
        self.progress = 100;
        self.url = Some(url);
        Ok(())
    }

    pub fn fail(&mut self, failure: TaskFailure) -> IngestResult<()> {
        self.advance(TaskStage::Error)?;
        self.failure = Some(failure);
        Ok(())
    }

    pub fn cancel(&mut self) -> IngestResult<()> {
        self.advance(TaskStage::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_task() -> UploadTask {
        UploadTask::new("a.jpg", MediaKind::Image, TargetScope::Single(TargetId::new()))
    }

    #[test]
    fn test_image_lifecycle() {
        let mut task = image_task();
        assert_eq!(task.stage(), TaskStage::Queued);
        task.advance(TaskStage::Editing).unwrap();
        task.advance(TaskStage::Uploading).unwrap();
        assert!(task.record_progress(40));
        task.complete("https://cdn/a.jpg".to_string()).unwrap();
        assert_eq!(task.stage(), TaskStage::Complete);
        assert_eq!(task.progress(), 100);
        assert_eq!(task.url(), Some("https://cdn/a.jpg"));
    }

    #[test]
    fn test_trimming_rejected_for_images() {
        let mut task = image_task();
        assert!(task.advance(TaskStage::Trimming).is_err());
        assert_eq!(task.stage(), TaskStage::Queued);
    }

    #[test]
    fn test_terminal_stages_are_final() {
        let mut task = image_task();
        task.cancel().unwrap();
        assert!(task.is_terminal());
        assert!(task.advance(TaskStage::Uploading).is_err());
        assert!(task.complete("x".to_string()).is_err());
        assert_eq!(task.url(), None);
    }

    #[test]
    fn test_progress_is_monotonic_and_only_while_uploading() {
        let mut task = image_task();
        assert!(!task.record_progress(10));
        assert_eq!(task.progress(), 0);

        task.advance(TaskStage::Uploading).unwrap();
        assert!(task.record_progress(30));
        assert!(!task.record_progress(20));
        assert_eq!(task.progress(), 30);
        assert!(task.record_progress(250));
        assert_eq!(task.progress(), 100);
    }

    #[test]
    fn test_failure_is_recorded() {
        let mut task = image_task();
        task.advance(TaskStage::Uploading).unwrap();
        task.fail(TaskFailure {
            message: "timeout".to_string(),
            recoverable: true,
        })
        .unwrap();
        assert_eq!(task.stage(), TaskStage::Error);
        assert!(task.failure().unwrap().recoverable);
    }

    #[test]
    fn test_scope_target_ids() {
        let id = TargetId::new();
        assert_eq!(TargetScope::Single(id).target_ids(), &[id]);
        let bulk = TargetScope::Bulk(vec![TargetId::new(), TargetId::new()]);
        assert_eq!(bulk.target_ids().len(), 2);
        assert!(bulk.is_bulk());
    }

    #[test]
    fn test_stage_round_trips_through_str() {
        for stage in [TaskStage::Queued, TaskStage::Trimming, TaskStage::Cancelled] {
            assert_eq!(stage.to_string().parse::<TaskStage>().unwrap(), stage);
        }
    }

    #[test]
    fn test_scope_serialized_shape() {
        let id = TargetId::new();
        let json = serde_json::to_value(TargetScope::Bulk(vec![id])).unwrap();
        assert_eq!(json, serde_json::json!({ "scope": "bulk", "targets": [id.to_string()] }));

        let task = image_task();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["stage"], "queued");
        assert_eq!(json["kind"], "image");
    }
}
