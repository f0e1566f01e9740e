pub mod media;
pub mod target;
pub mod task;

pub use media::{content_type_for_extension, KindFilter, MediaFile, MediaKind, TrimRange};
pub use target::{MediaPatch, TargetId, TargetRecord};
pub use task::{BatchId, TargetScope, TaskFailure, TaskId, TaskStage, UploadTask};
