//! Error types module
//!
//! Every failure the pipeline can report is either a [`ValidationError`] raised before any
//! transport call, or one of the file- and batch-scoped variants of [`IngestError`]. None of
//! them is fatal to the driving application.

use crate::models::TargetId;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors such as rejected input or user cancellation
    Debug,
    /// Recoverable issues such as a single failed upload
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata describing how an error should be presented and whether a retry makes sense.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "TRANSPORT_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether resubmitting the same input can succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from the internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Input rejected before any bytes leave the process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {name} is {size} bytes (max: {max} bytes)")]
    FileTooLarge {
        name: String,
        size: usize,
        max: usize,
    },

    #[error("No supported files selected")]
    NoFiles,

    #[error("No rooms selected")]
    NoTargets,

    #[error("Unknown room: {0}")]
    UnknownTarget(TargetId),

    #[error("Invalid trim range: {start}s..{end}s (duration: {duration}s)")]
    InvalidTrimRange { start: f64, end: f64, duration: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Preprocessing failed for {file}: {message}")]
    Preprocess { file: String, message: String },

    #[error("Transport failed for {file}: {message}")]
    Transport { file: String, message: String },

    #[error("Upload cancelled: {file}")]
    Cancelled { file: String },

    #[error("Applying media failed for {} room(s): {message}", .failed.len())]
    Apply {
        applied: Vec<TargetId>,
        failed: Vec<TargetId>,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type IngestResult<T> = Result<T, IngestError>;

impl IngestError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, IngestError::Cancelled { .. })
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn ingest_error_static_metadata(
    err: &IngestError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        IngestError::Validation(_) => (
            "VALIDATION_ERROR",
            false,
            Some("Correct the selection and submit again"),
            LogLevel::Debug,
        ),
        IngestError::Preprocess { .. } => (
            "PREPROCESS_ERROR",
            false,
            Some("Skip editing for this file or choose a different file"),
            LogLevel::Warn,
        ),
        IngestError::Transport { .. } => (
            "TRANSPORT_ERROR",
            true,
            Some("Retry the upload after a short delay"),
            LogLevel::Warn,
        ),
        IngestError::Cancelled { .. } => ("CANCELLED", false, None, LogLevel::Debug),
        IngestError::Apply { .. } => (
            "APPLY_ERROR",
            true,
            Some("Reattach the uploaded media to the rooms that failed"),
            LogLevel::Error,
        ),
        IngestError::Internal(_) => (
            "INTERNAL_ERROR",
            false,
            Some("Contact support if this error persists"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for IngestError {
    fn error_code(&self) -> &'static str {
        ingest_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        ingest_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        ingest_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        ingest_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            IngestError::Validation(ref inner) => inner.to_string(),
            IngestError::Preprocess { file, .. } => format!("Could not prepare {}", file),
            IngestError::Transport { file, .. } => format!("Failed to upload {}", file),
            IngestError::Cancelled { file } => format!("Upload of {} was cancelled", file),
            IngestError::Apply { failed, .. } => {
                format!("Media could not be attached to {} room(s)", failed.len())
            }
            IngestError::Internal(_) => "Internal error".to_string(),
        }
    }
}
