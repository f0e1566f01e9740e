//! Test helpers: build an orchestrator over scripted collaborators.
//!
//! Run from workspace root: `cargo test -p ingest-worker --test pipeline_test`.

#![allow(dead_code)]

pub mod collaborators;
pub mod fixtures;
pub mod storage;

use ingest_core::IngestConfig;
use ingest_processing::{ImageEditor, Preprocessor, SkipEditor, SkipTrimmer, VideoTrimmer};
use ingest_worker::{BatchSnapshot, Orchestrator, TargetStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use storage::ScriptedStorage;

pub struct TestPipeline {
    pub orchestrator: Orchestrator,
    pub storage: ScriptedStorage,
}

pub fn pipeline(store: Arc<dyn TargetStore>, storage: ScriptedStorage) -> TestPipeline {
    pipeline_with(store, storage, Arc::new(SkipEditor), Arc::new(SkipTrimmer))
}

pub fn pipeline_with(
    store: Arc<dyn TargetStore>,
    storage: ScriptedStorage,
    editor: Arc<dyn ImageEditor>,
    trimmer: Arc<dyn VideoTrimmer>,
) -> TestPipeline {
    let orchestrator = Orchestrator::new(&IngestConfig::default(), Arc::new(storage.clone()), store)
        .with_preprocessor(Preprocessor::new(editor, trimmer));
    TestPipeline {
        orchestrator,
        storage,
    }
}

/// Collect every batch progress value observed until the batch finishes.
pub fn record_progress(mut rx: watch::Receiver<BatchSnapshot>) -> tokio::task::JoinHandle<Vec<f64>> {
    tokio::spawn(async move {
        let mut seen = Vec::new();
        loop {
            let (progress, finished) = {
                let snapshot = rx.borrow_and_update();
                (snapshot.progress, snapshot.is_finished())
            };
            seen.push(progress);
            if finished || rx.changed().await.is_err() {
                break;
            }
        }
        seen
    })
}

/// Guard against hangs in tests that coordinate through notifications.
pub async fn within<F: std::future::Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("test step timed out")
}
