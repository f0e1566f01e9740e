//! Batch progress aggregation.
//!
//! The batch worker is the only writer. Observers hold a [`watch::Receiver`] and read
//! consistent snapshots; they can never mutate task state.

use serde::Serialize;
use tokio::sync::watch;

use ingest_core::models::{BatchId, TargetScope, TaskFailure, TaskStage, UploadTask};
use ingest_core::IngestResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Files are queued or being edited/trimmed; nothing is uploading.
    Preparing,
    Uploading,
    /// Every file reached a terminal stage.
    Complete,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSnapshot {
    pub batch_id: BatchId,
    pub scope: TargetScope,
    /// Tasks in processing order.
    pub tasks: Vec<UploadTask>,
    /// Mean of per-file progress, 0.0 to 100.0.
    pub progress: f64,
    pub status: BatchStatus,
    pub completed_count: usize,
    pub error_count: usize,
    pub cancelled_count: usize,
}

impl BatchSnapshot {
    pub fn new(batch_id: BatchId, scope: TargetScope, tasks: Vec<UploadTask>) -> Self {
        let mut snapshot = Self {
            batch_id,
            scope,
            tasks,
            progress: 0.0,
            status: BatchStatus::Preparing,
            completed_count: 0,
            error_count: 0,
            cancelled_count: 0,
        };
        snapshot.recompute();
        snapshot
    }

    fn recompute(&mut self) {
        let tasks = &self.tasks;
        let count_stage = |stage: TaskStage| tasks.iter().filter(|t| t.stage() == stage).count();
        let (completed, errored, cancelled) = (
            count_stage(TaskStage::Complete),
            count_stage(TaskStage::Error),
            count_stage(TaskStage::Cancelled),
        );
        self.completed_count = completed;
        self.error_count = errored;
        self.cancelled_count = cancelled;

        self.progress = if self.tasks.is_empty() {
            0.0
        } else {
            let total: u32 = self.tasks.iter().map(|t| u32::from(t.progress())).sum();
            f64::from(total) / self.tasks.len() as f64
        };

        self.status = if self.tasks.iter().any(|t| t.stage() == TaskStage::Uploading) {
            BatchStatus::Uploading
        } else if self.tasks.iter().all(UploadTask::is_terminal) {
            BatchStatus::Complete
        } else {
            BatchStatus::Preparing
        };
    }

    pub fn is_finished(&self) -> bool {
        self.status == BatchStatus::Complete
    }
}

/// Single-writer owner of a batch snapshot.
pub struct BatchTracker {
    tx: watch::Sender<BatchSnapshot>,
}

impl BatchTracker {
    pub fn new(snapshot: BatchSnapshot) -> Self {
        let (tx, _rx) = watch::channel(snapshot);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchSnapshot> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        self.tx.borrow().clone()
    }

    /// Apply `change` to the task at `index`. Observers are notified only when the change
    /// reports that it modified the task.
    fn update<F>(&self, index: usize, change: F) -> IngestResult<bool>
    where
        F: FnOnce(&mut UploadTask) -> IngestResult<bool>,
    {
        let mut outcome = Ok(false);
        self.tx.send_if_modified(|snapshot| {
            let Some(task) = snapshot.tasks.get_mut(index) else {
                return false;
            };
            outcome = change(task);
            let modified = matches!(outcome, Ok(true));
            if modified {
                snapshot.recompute();
            }
            modified
        });
        outcome
    }

    pub fn advance(&self, index: usize, stage: TaskStage) -> IngestResult<()> {
        self.update(index, |task| task.advance(stage).map(|_| true))
            .map(|_| ())
    }

    pub fn record_progress(&self, index: usize, percent: u8) {
        let _ = self.update(index, |task| Ok(task.record_progress(percent)));
    }

    pub fn complete(&self, index: usize, url: String) -> IngestResult<()> {
        self.update(index, |task| task.complete(url).map(|_| true))
            .map(|_| ())
    }

    pub fn fail(&self, index: usize, failure: TaskFailure) -> IngestResult<()> {
        self.update(index, |task| task.fail(failure).map(|_| true))
            .map(|_| ())
    }

    pub fn cancel(&self, index: usize) -> IngestResult<()> {
        self.update(index, |task| task.cancel().map(|_| true))
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_core::models::{MediaKind, TargetId};

    fn tracker(kinds: &[MediaKind]) -> BatchTracker {
        let scope = TargetScope::Single(TargetId::new());
        let tasks = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| UploadTask::new(format!("file-{}", i), *kind, scope.clone()))
            .collect();
        BatchTracker::new(BatchSnapshot::new(BatchId::new(), scope, tasks))
    }

    #[test]
    fn test_new_batch_is_preparing() {
        let tracker = tracker(&[MediaKind::Image, MediaKind::Image]);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, BatchStatus::Preparing);
        assert_eq!(snapshot.progress, 0.0);
    }

    #[test]
    fn test_progress_is_mean_of_files() {
        let tracker = tracker(&[MediaKind::Image, MediaKind::Image]);
        tracker.advance(0, TaskStage::Uploading).unwrap();
        tracker.record_progress(0, 50);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, BatchStatus::Uploading);
        assert_eq!(snapshot.progress, 25.0);

        tracker.complete(0, "https://cdn/0".to_string()).unwrap();
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.status, BatchStatus::Preparing);
        assert_eq!(snapshot.progress, 50.0);
        assert_eq!(snapshot.completed_count, 1);
    }

    #[test]
    fn test_complete_when_all_terminal_with_separate_counts() {
        let tracker = tracker(&[MediaKind::Video, MediaKind::Image, MediaKind::Image]);
        tracker.advance(0, TaskStage::Uploading).unwrap();
        tracker.complete(0, "https://cdn/v".to_string()).unwrap();
        tracker
            .fail(
                1,
                TaskFailure {
                    message: "boom".to_string(),
                    recoverable: true,
                },
            )
            .unwrap();
        tracker.cancel(2).unwrap();

        let snapshot = tracker.snapshot();
        assert!(snapshot.is_finished());
        assert_eq!(snapshot.completed_count, 1);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.cancelled_count, 1);
    }

    #[test]
    fn test_progress_ignored_unless_uploading() {
        let tracker = tracker(&[MediaKind::Image]);
        let mut rx = tracker.subscribe();
        rx.borrow_and_update();

        tracker.record_progress(0, 40);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(tracker.snapshot().progress, 0.0);
    }

    #[test]
    fn test_invalid_transition_is_rejected() {
        let tracker = tracker(&[MediaKind::Image]);
        assert!(tracker.advance(0, TaskStage::Trimming).is_err());
        assert!(tracker.complete(0, "https://cdn/x".to_string()).is_err());
        assert_eq!(tracker.snapshot().tasks[0].stage(), TaskStage::Queued);
    }

    #[test]
    fn test_subscribers_see_updates() {
        let tracker = tracker(&[MediaKind::Image]);
        let mut rx = tracker.subscribe();
        tracker.advance(0, TaskStage::Uploading).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().status, BatchStatus::Uploading);
    }
}
