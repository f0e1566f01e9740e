//! File classification and preprocessing stages for the ingestion pipeline.
//!
//! The classifier splits a raw selection into the image and video sets that will be
//! uploaded. The editor and trimmer are external collaborators consumed through the
//! [`ImageEditor`] and [`VideoTrimmer`] traits; [`Preprocessor`] runs one file through the
//! matching stage and enforces the `(file) -> edited file | skip` contract.

pub mod classifier;
pub mod preprocess;
pub mod traits;

pub use classifier::{ClassifiedBatch, FileClassifier, RejectReason, RejectedFile};
pub use preprocess::{PreparedFile, Preprocessor};
pub use traits::{
    EditOutcome, ImageEditor, SkipEditor, SkipTrimmer, TrimOutcome, VideoTrimmer,
};
