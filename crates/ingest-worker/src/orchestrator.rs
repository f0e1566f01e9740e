//! Batch orchestration.
//!
//! [`Orchestrator::start`] validates the whole selection and resolves its rooms before any
//! byte is uploaded, then hands the batch to a spawned worker. The worker runs the video
//! through the trimmer first and each image through the editor in turn, uploads the
//! prepared files one at a time, and finally applies the produced URLs to the rooms.
//!
//! Every task gets a cancellation handle in the shared registry as soon as it is queued.
//! Cancelling one file or the whole batch goes through those handles, and a handle is
//! removed before its task is settled, so a cancel accepted by the registry always wins.

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use ingest_core::models::{
    BatchId, KindFilter, MediaFile, MediaKind, TargetScope, TaskFailure, TaskId, TaskStage,
    UploadTask,
};
use ingest_core::{ErrorMetadata, IngestConfig, IngestError, IngestResult, ValidationError};
use ingest_processing::{FileClassifier, Preprocessor, RejectedFile};
use ingest_storage::Storage;

use crate::apply::{ApplyReport, ApplyStage, UploadedMedia};
use crate::progress::{BatchSnapshot, BatchTracker};
use crate::registry::CancellationRegistry;
use crate::resolver::{TargetRequest, TargetResolver};
use crate::store::TargetStore;
use crate::transport::Transport;

/// A user's selection and where it should go.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub files: Vec<MediaFile>,
    pub filter: KindFilter,
    /// When false only the first image is kept.
    pub multiple: bool,
    pub target: TargetRequest,
}

impl UploadRequest {
    pub fn new(target: TargetRequest, files: Vec<MediaFile>) -> Self {
        Self {
            files,
            filter: KindFilter::default(),
            multiple: true,
            target,
        }
    }

    pub fn with_filter(mut self, filter: KindFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn single_file(mut self) -> Self {
        self.multiple = false;
        self
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    classifier: FileClassifier,
    preprocessor: Preprocessor,
    transport: Transport,
    resolver: TargetResolver,
    apply: ApplyStage,
    registry: CancellationRegistry,
}

impl Orchestrator {
    /// Build an orchestrator that skips editing and trimming. Interactive drivers plug in
    /// their collaborators with [`Orchestrator::with_preprocessor`].
    pub fn new(
        config: &IngestConfig,
        storage: Arc<dyn Storage>,
        store: Arc<dyn TargetStore>,
    ) -> Self {
        Self {
            classifier: FileClassifier::from_config(config),
            preprocessor: Preprocessor::skip_all(),
            transport: Transport::new(storage, config.storage_key_prefix.clone()),
            resolver: TargetResolver::new(store.clone()),
            apply: ApplyStage::new(store),
            registry: CancellationRegistry::new(),
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: Preprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    /// Registry shared by every batch this orchestrator starts.
    pub fn registry(&self) -> &CancellationRegistry {
        &self.registry
    }

    /// Validate, resolve and queue a batch.
    ///
    /// Returns without touching storage when classification or target resolution fails.
    /// On success the batch runs in the background; use the returned handle to observe,
    /// cancel or await it.
    #[tracing::instrument(skip(self, request), fields(file_count = request.files.len()))]
    pub async fn start(&self, request: UploadRequest) -> IngestResult<BatchHandle> {
        let UploadRequest {
            files,
            filter,
            multiple,
            target,
        } = request;

        let classified = self
            .classifier
            .classify(files, filter, multiple)
            .map_err(|e| {
                tracing::info!(error = %e, "Batch rejected during classification");
                IngestError::from(e)
            })?;
        if classified.is_empty() {
            tracing::info!(rejected = classified.rejected.len(), "Batch rejected: nothing to upload");
            return Err(ValidationError::NoFiles.into());
        }
        let scope = self.resolver.resolve(&target).await.map_err(|e| {
            tracing::info!(error = %e, "Batch rejected during target resolution");
            e
        })?;

        let batch_id = BatchId::new();
        let rejected = classified.rejected;
        let queued = classified
            .video
            .into_iter()
            .map(|file| (MediaKind::Video, file))
            .chain(classified.images.into_iter().map(|file| (MediaKind::Image, file)));

        let mut tasks = Vec::new();
        let mut items = Vec::new();
        for (index, (kind, file)) in queued.enumerate() {
            let task = UploadTask::new(file.name.clone(), kind, scope.clone());
            let token = CancellationToken::new();
            self.registry.register(task.id, token.clone());
            items.push(WorkItem {
                index,
                task_id: task.id,
                kind,
                file,
                token,
            });
            tasks.push(task);
        }

        let task_ids: Vec<(TaskId, String)> =
            tasks.iter().map(|t| (t.id, t.file_name.clone())).collect();
        let tracker = BatchTracker::new(BatchSnapshot::new(batch_id, scope.clone(), tasks));
        let receiver = tracker.subscribe();

        tracing::info!(
            batch_id = %batch_id,
            queued = task_ids.len(),
            rejected = rejected.len(),
            bulk = scope.is_bulk(),
            room_count = scope.target_ids().len(),
            "Batch queued"
        );

        let worker = BatchWorker {
            batch_id,
            scope,
            rejected: rejected.clone(),
            preprocessor: self.preprocessor.clone(),
            transport: self.transport.clone(),
            apply: self.apply.clone(),
            registry: self.registry.clone(),
            tracker,
        };
        let span = tracing::info_span!("batch", batch_id = %batch_id);
        let join = tokio::spawn(worker.run(items).instrument(span));

        Ok(BatchHandle {
            batch_id,
            tasks: task_ids,
            rejected,
            registry: self.registry.clone(),
            receiver,
            join,
        })
    }

    /// Start a batch and wait for it to finish.
    pub async fn run(&self, request: UploadRequest) -> IngestResult<BatchOutcome> {
        self.start(request).await?.wait().await
    }
}

/// Caller's view of a running batch.
///
/// Dropping the handle does not stop the batch.
pub struct BatchHandle {
    batch_id: BatchId,
    tasks: Vec<(TaskId, String)>,
    rejected: Vec<RejectedFile>,
    registry: CancellationRegistry,
    receiver: watch::Receiver<BatchSnapshot>,
    join: JoinHandle<BatchOutcome>,
}

impl BatchHandle {
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }

    /// Queued tasks in processing order with their file names.
    pub fn tasks(&self) -> &[(TaskId, String)] {
        &self.tasks
    }

    /// Files that were left out during classification.
    pub fn rejected(&self) -> &[RejectedFile] {
        &self.rejected
    }

    /// Cancel one task of this batch. Returns false if the task is not part of this batch
    /// or has already finished.
    pub fn cancel(&self, task_id: TaskId) -> bool {
        if !self.tasks.iter().any(|(id, _)| *id == task_id) {
            return false;
        }
        self.registry.cancel(&task_id)
    }

    /// Cancel the first unfinished task carrying `file_name`.
    pub fn cancel_file(&self, file_name: &str) -> bool {
        let task_id = self
            .receiver
            .borrow()
            .tasks
            .iter()
            .find(|t| t.file_name == file_name && !t.is_terminal())
            .map(|t| t.id);
        match task_id {
            Some(task_id) => self.registry.cancel(&task_id),
            None => false,
        }
    }

    /// Abandon every task that has not finished yet. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self
            .tasks
            .iter()
            .filter(|(task_id, _)| self.registry.cancel(task_id))
            .count();
        tracing::info!(batch_id = %self.batch_id, cancelled, "Cancelling batch");
        cancelled
    }

    pub fn subscribe(&self) -> watch::Receiver<BatchSnapshot> {
        self.receiver.clone()
    }

    pub fn snapshot(&self) -> BatchSnapshot {
        self.receiver.borrow().clone()
    }

    pub async fn wait(self) -> IngestResult<BatchOutcome> {
        self.join
            .await
            .map_err(|e| IngestError::Internal(format!("Batch worker failed: {}", e)))
    }
}

/// Final state of a batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub batch_id: BatchId,
    pub scope: TargetScope,
    pub snapshot: BatchSnapshot,
    pub media: UploadedMedia,
    pub rejected: Vec<RejectedFile>,
    /// Result of attaching `media` to the rooms in `scope`.
    pub apply: IngestResult<ApplyReport>,
}

impl BatchOutcome {
    pub fn tasks(&self) -> &[UploadTask] {
        &self.snapshot.tasks
    }

    /// Files whose failure was recoverable, so resubmitting them can succeed. Cancelled
    /// files and files rejected by a collaborator are not included.
    pub fn retryable_files(&self) -> Vec<&str> {
        self.tasks()
            .iter()
            .filter(|t| t.stage() == TaskStage::Error)
            .filter(|t| t.failure().is_some_and(|f| f.recoverable))
            .map(|t| t.file_name.as_str())
            .collect()
    }

    pub fn is_fully_applied(&self) -> bool {
        self.apply.is_ok()
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            batch_id: self.batch_id,
            completed: self.snapshot.completed_count,
            errors: self.snapshot.error_count,
            cancelled: self.snapshot.cancelled_count,
            rejected: self.rejected.len(),
            rooms_updated: self.apply.as_ref().map(|r| r.applied.len()).unwrap_or_else(|e| {
                match e {
                    IngestError::Apply { applied, .. } => applied.len(),
                    _ => 0,
                }
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub completed: usize,
    pub errors: usize,
    pub cancelled: usize,
    pub rejected: usize,
    pub rooms_updated: usize,
}

struct WorkItem {
    index: usize,
    task_id: TaskId,
    kind: MediaKind,
    file: MediaFile,
    token: CancellationToken,
}

struct BatchWorker {
    batch_id: BatchId,
    scope: TargetScope,
    rejected: Vec<RejectedFile>,
    preprocessor: Preprocessor,
    transport: Transport,
    apply: ApplyStage,
    registry: CancellationRegistry,
    tracker: BatchTracker,
}

impl BatchWorker {
    async fn run(self, items: Vec<WorkItem>) -> BatchOutcome {
        let ready = self.prepare(items).await;
        self.upload(ready).await;

        let snapshot = self.tracker.snapshot();
        let media = uploaded_media(&snapshot);
        let apply = self.apply.apply(&self.scope, &media).await;
        if let Err(e) = &apply {
            tracing::error!(error = %e, error_code = e.error_code(), "Batch uploaded but not fully applied");
        }

        tracing::info!(
            completed = snapshot.completed_count,
            errors = snapshot.error_count,
            cancelled = snapshot.cancelled_count,
            "Batch finished"
        );

        BatchOutcome {
            batch_id: self.batch_id,
            scope: self.scope,
            snapshot,
            media,
            rejected: self.rejected,
            apply,
        }
    }

    /// Present each file to its preprocessing stage in queue order. Files that come out
    /// ready are returned for upload.
    async fn prepare(&self, items: Vec<WorkItem>) -> VecDeque<WorkItem> {
        let mut ready = VecDeque::with_capacity(items.len());
        for mut item in items {
            if item.token.is_cancelled() {
                self.settle_cancelled(&item);
                continue;
            }
            let stage = match item.kind {
                MediaKind::Video => TaskStage::Trimming,
                MediaKind::Image => TaskStage::Editing,
            };
            if let Err(e) = self.tracker.advance(item.index, stage) {
                self.settle_failed(&item, e);
                continue;
            }

            let preprocessor = &self.preprocessor;
            let (kind, file) = (item.kind, item.file.clone());
            let preprocess = async move {
                match kind {
                    MediaKind::Video => preprocessor.trim_video(file).await,
                    MediaKind::Image => preprocessor.edit_image(file).await,
                }
            };
            let result = tokio::select! {
                biased;
                _ = item.token.cancelled() => None,
                result = preprocess => Some(result),
            };

            match result {
                None => self.settle_cancelled(&item),
                Some(Ok(prepared)) => {
                    item.file = prepared.file;
                    ready.push_back(item);
                }
                Some(Err(e)) => self.settle_failed(&item, e),
            }
        }
        ready
    }

    /// Upload prepared files strictly one at a time.
    async fn upload(&self, mut ready: VecDeque<WorkItem>) {
        while let Some(item) = ready.pop_front() {
            if item.token.is_cancelled() {
                self.settle_cancelled(&item);
                continue;
            }
            if let Err(e) = self.tracker.advance(item.index, TaskStage::Uploading) {
                self.settle_failed(&item, e);
                continue;
            }

            let tracker = &self.tracker;
            let index = item.index;
            let on_progress = move |percent: u8| tracker.record_progress(index, percent);
            let sent = self
                .transport
                .send(&item.file, &self.scope, &item.token, &on_progress)
                .await;

            match sent {
                Ok(stored) => {
                    // Once the handle is gone, cancel requests for this task are no-ops, so
                    // any request that was accepted is observed by the check below.
                    self.registry.remove(&item.task_id);
                    if item.token.is_cancelled() {
                        tracing::warn!(file = %item.file.name, key = %stored.key, "Cancelled after upload; URL discarded");
                        self.settle_cancelled(&item);
                        continue;
                    }
                    match self.tracker.complete(index, stored.url) {
                        Ok(()) => tracing::debug!(task_id = %item.task_id, file = %item.file.name, "Task complete"),
                        Err(e) => self.settle_failed(&item, e),
                    }
                }
                Err(e) if e.is_cancellation() => self.settle_cancelled(&item),
                Err(e) => self.settle_failed(&item, e),
            }
        }
    }

    fn settle_cancelled(&self, item: &WorkItem) {
        self.registry.remove(&item.task_id);
        if let Err(e) = self.tracker.cancel(item.index) {
            tracing::error!(task_id = %item.task_id, error = %e, "Failed to mark task cancelled");
            return;
        }
        tracing::info!(task_id = %item.task_id, file = %item.file.name, "Task cancelled");
    }

    fn settle_failed(&self, item: &WorkItem, error: IngestError) {
        self.registry.remove(&item.task_id);
        let failure = TaskFailure {
            message: error.to_string(),
            recoverable: error.is_recoverable(),
        };
        if let Err(e) = self.tracker.fail(item.index, failure) {
            tracing::error!(task_id = %item.task_id, error = %e, "Failed to mark task failed");
            return;
        }
        tracing::warn!(
            task_id = %item.task_id,
            file = %item.file.name,
            error = %error,
            error_code = error.error_code(),
            "Task failed"
        );
    }
}

/// URLs of completed tasks: the video, then images in submission order.
fn uploaded_media(snapshot: &BatchSnapshot) -> UploadedMedia {
    let mut media = UploadedMedia::default();
    for task in snapshot
        .tasks
        .iter()
        .filter(|t| t.stage() == TaskStage::Complete)
    {
        let Some(url) = task.url() else { continue };
        match task.kind {
            MediaKind::Video => media.video = Some(url.to_string()),
            MediaKind::Image => media.images.push(url.to_string()),
        }
    }
    media
}
