//! Runs a single file through its preprocessing stage.
//!
//! Stage ordering across a batch (video first, then images one at a time) is driven by
//! the orchestrator; this module owns the per-file contract with the collaborators.

use std::sync::Arc;

use ingest_core::models::{MediaFile, TrimRange};
use ingest_core::{IngestError, IngestResult};

use crate::traits::{EditOutcome, ImageEditor, SkipEditor, SkipTrimmer, TrimOutcome, VideoTrimmer};

/// A file ready for transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFile {
    pub file: MediaFile,
    /// Whether a stage replaced the original bytes
    pub modified: bool,
    /// Range the video was cut to, if it was trimmed
    pub trim: Option<TrimRange>,
}

impl PreparedFile {
    fn unchanged(file: MediaFile) -> Self {
        Self {
            file,
            modified: false,
            trim: None,
        }
    }
}

#[derive(Clone)]
pub struct Preprocessor {
    editor: Arc<dyn ImageEditor>,
    trimmer: Arc<dyn VideoTrimmer>,
}

impl Preprocessor {
    pub fn new(editor: Arc<dyn ImageEditor>, trimmer: Arc<dyn VideoTrimmer>) -> Self {
        Self { editor, trimmer }
    }

    /// A preprocessor that passes every file through untouched.
    pub fn skip_all() -> Self {
        Self::new(Arc::new(SkipEditor), Arc::new(SkipTrimmer))
    }

    /// Present an image to the editor. A skip keeps the original file.
    pub async fn edit_image(&self, image: MediaFile) -> IngestResult<PreparedFile> {
        let outcome = self.editor.edit(&image).await.map_err(|e| IngestError::Preprocess {
            file: image.name.clone(),
            message: format!("{:#}", e),
        })?;

        match outcome {
            EditOutcome::Skipped => {
                tracing::debug!(file = %image.name, "Image edit skipped");
                Ok(PreparedFile::unchanged(image))
            }
            EditOutcome::Edited(edited) => {
                let edited = Self::keep_identity(&image, edited)?;
                tracing::info!(
                    file = %image.name,
                    original_bytes = image.size(),
                    edited_bytes = edited.size(),
                    "Image edited"
                );
                Ok(PreparedFile {
                    file: edited,
                    modified: true,
                    trim: None,
                })
            }
        }
    }

    /// Present a video to the trimmer. A skip keeps the original bytes.
    pub async fn trim_video(&self, video: MediaFile) -> IngestResult<PreparedFile> {
        let name = video.name.clone();
        let on_progress = move |percent: u8| {
            tracing::debug!(file = %name, percent, "Trimming video");
        };

        let outcome = self
            .trimmer
            .trim(&video, &on_progress)
            .await
            .map_err(|e| IngestError::Preprocess {
                file: video.name.clone(),
                message: format!("{:#}", e),
            })?;

        match outcome {
            TrimOutcome::Skipped => {
                tracing::debug!(file = %video.name, "Video trim skipped");
                Ok(PreparedFile::unchanged(video))
            }
            TrimOutcome::Trimmed { file, range } => {
                let trimmed = Self::keep_identity(&video, file)?;
                tracing::info!(
                    file = %video.name,
                    start_secs = range.start(),
                    end_secs = range.end(),
                    kept_secs = range.length(),
                    trimmed_bytes = trimmed.size(),
                    "Video trimmed"
                );
                Ok(PreparedFile {
                    file: trimmed,
                    modified: true,
                    trim: Some(range),
                })
            }
        }
    }

    /// Stage output must be non-empty; an unnamed output inherits the original name.
    fn keep_identity(original: &MediaFile, mut output: MediaFile) -> IngestResult<MediaFile> {
        if output.data.is_empty() {
            return Err(IngestError::Preprocess {
                file: original.name.clone(),
                message: "stage produced an empty file".to_string(),
            });
        }
        if output.name.trim().is_empty() {
            output.name = original.name.clone();
        }
        if output.content_type.trim().is_empty() {
            output.content_type = original.content_type.clone();
        }
        Ok(output)
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::skip_all()
    }
}
