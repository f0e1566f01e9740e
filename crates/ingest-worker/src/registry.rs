//! Shared map of cancellation handles keyed by task.
//!
//! A handle is registered when the task is queued, so a cancel issued while the file is
//! still waiting on preprocessing or on an earlier upload is honored once its turn comes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use ingest_core::models::TaskId;

#[derive(Clone, Default)]
pub struct CancellationRegistry {
    handles: Arc<Mutex<HashMap<TaskId, CancellationToken>>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<TaskId, CancellationToken>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, task_id: TaskId, token: CancellationToken) {
        if self.handles().insert(task_id, token).is_some() {
            tracing::warn!(task_id = %task_id, "Replaced existing cancellation handle");
        }
    }

    /// Signal cancellation for `task_id`. Returns false when no handle is registered,
    /// e.g. because the task already finished.
    ///
    /// The token fires while the map is locked, so a cancel either precedes the owner's
    /// [`remove`](Self::remove) and is observed by it, or follows it and returns false.
    pub fn cancel(&self, task_id: &TaskId) -> bool {
        let handles = self.handles();
        let Some(token) = handles.get(task_id) else {
            return false;
        };
        token.cancel();
        drop(handles);
        tracing::debug!(task_id = %task_id, "Cancellation requested");
        true
    }

    pub fn remove(&self, task_id: &TaskId) -> bool {
        self.handles().remove(task_id).is_some()
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.handles().contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.handles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles().is_empty()
    }
}
