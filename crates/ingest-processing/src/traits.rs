//! Contracts for the human-gated preprocessing collaborators.

use async_trait::async_trait;
use ingest_core::models::{MediaFile, TrimRange};

/// Result of presenting one image to the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Edited(MediaFile),
    /// The user declined to edit; the original file proceeds unchanged.
    Skipped,
}

/// Result of presenting a video to the trimmer.
#[derive(Debug, Clone, PartialEq)]
pub enum TrimOutcome {
    Trimmed { file: MediaFile, range: TrimRange },
    /// The user kept the full clip; the original bytes proceed unchanged.
    Skipped,
}

/// Image crop/filter editor. Awaiting `edit` suspends the pipeline until the user decides.
#[async_trait]
pub trait ImageEditor: Send + Sync {
    async fn edit(&self, image: &MediaFile) -> anyhow::Result<EditOutcome>;
}

/// Video range trimmer. The range defaults to the full duration when untouched.
/// `on_progress` receives trim progress in percent.
#[async_trait]
pub trait VideoTrimmer: Send + Sync {
    async fn trim(
        &self,
        video: &MediaFile,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> anyhow::Result<TrimOutcome>;
}

/// Editor that skips every image. Used by non-interactive drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipEditor;

#[async_trait]
impl ImageEditor for SkipEditor {
    async fn edit(&self, _image: &MediaFile) -> anyhow::Result<EditOutcome> {
        Ok(EditOutcome::Skipped)
    }
}

/// Trimmer that keeps every clip whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipTrimmer;

#[async_trait]
impl VideoTrimmer for SkipTrimmer {
    async fn trim(
        &self,
        _video: &MediaFile,
        _on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> anyhow::Result<TrimOutcome> {
        Ok(TrimOutcome::Skipped)
    }
}
