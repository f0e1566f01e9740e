//! Ingest Worker Library
//!
//! Runs submitted batches: classification, target resolution, preprocessing, sequential
//! transport with per-file cancellation, progress aggregation and the final apply step.

pub mod apply;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod transport;

pub use apply::{ApplyReport, ApplyStage, UploadedMedia};
pub use orchestrator::{BatchHandle, BatchOutcome, BatchSummary, Orchestrator, UploadRequest};
pub use progress::{BatchSnapshot, BatchStatus, BatchTracker};
pub use registry::CancellationRegistry;
pub use resolver::{TargetRequest, TargetResolver};
pub use store::{JsonFileTargetStore, MemoryTargetStore, TargetStore};
pub use transport::{StoredObject, Transport};
