//! Scripted storage backend: injected failures and pause points by call order.

use async_trait::async_trait;
use bytes::Bytes;
use ingest_storage::{Storage, StorageBackend, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub const BASE_URL: &str = "https://cdn.test";

/// Pause point inside one put, after its first chunk has been reported.
#[derive(Clone)]
pub struct Pause {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct Script {
    fail_calls: HashSet<usize>,
    pauses: HashMap<usize, Pause>,
}

/// Uploads are numbered by call order starting at 0. Since the pipeline uploads
/// sequentially, call `n` is the `n`th queued file that reaches transport.
#[derive(Clone)]
pub struct ScriptedStorage {
    chunk_size: usize,
    honor_cancel: bool,
    calls: Arc<AtomicUsize>,
    script: Arc<Mutex<Script>>,
    objects: Arc<Mutex<Vec<(String, Bytes)>>>,
}

impl ScriptedStorage {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            honor_cancel: true,
            calls: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(Script::default())),
            objects: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A backend that never polls the cancellation token and always finishes its put.
    pub fn ignoring_cancel(chunk_size: usize) -> Self {
        Self {
            honor_cancel: false,
            ..Self::new(chunk_size)
        }
    }

    pub fn fail_call(&self, call: usize) {
        self.script.lock().unwrap().fail_calls.insert(call);
    }

    pub fn pause_call(&self, call: usize) -> Pause {
        let pause = Pause {
            reached: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        self.script.lock().unwrap().pauses.insert(call, pause.clone());
        pause
    }

    pub fn put_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// URLs of stored objects in the order they were written.
    pub fn stored_urls(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| url_for(key))
            .collect()
    }

    pub fn stored_bytes(&self, url: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(key, _)| url_for(key) == url)
            .map(|(_, data)| data.clone())
    }
}

fn url_for(key: &str) -> String {
    format!("{}/{}", BASE_URL, key)
}

#[async_trait]
impl Storage for ScriptedStorage {
    async fn put(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
        on_progress: &(dyn Fn(u64, u64) + Send + Sync),
        cancel: &CancellationToken,
    ) -> StorageResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let (fail, pause) = {
            let mut script = self.script.lock().unwrap();
            (script.fail_calls.contains(&call), script.pauses.remove(&call))
        };
        if fail {
            return Err(StorageError::UploadFailed(format!("injected failure on call {}", call)));
        }

        let total = data.len() as u64;
        let mut sent = 0u64;
        for (i, chunk) in data.chunks(self.chunk_size).enumerate() {
            tokio::task::yield_now().await;
            if self.honor_cancel && cancel.is_cancelled() {
                return Err(StorageError::Cancelled(storage_key.to_string()));
            }
            sent += chunk.len() as u64;
            on_progress(sent, total);

            if let (0, Some(pause)) = (i, &pause) {
                pause.reached.notify_one();
                if !self.honor_cancel {
                    pause.release.notified().await;
                    continue;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        return Err(StorageError::Cancelled(storage_key.to_string()));
                    }
                    _ = pause.release.notified() => {}
                }
            }
        }

        if self.honor_cancel && cancel.is_cancelled() {
            return Err(StorageError::Cancelled(storage_key.to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .push((storage_key.to_string(), data));
        Ok(url_for(storage_key))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().retain(|(key, _)| key != storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .any(|(key, _)| key == storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
