use ingest_core::models::{content_type_for_extension, KindFilter, MediaFile, MediaKind};
use ingest_core::{IngestConfig, ValidationError};

/// Why a selected file was left out of the upload set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Neither an allowed image nor an allowed video type
    Unsupported,
    /// A supported kind the selection mode does not accept
    FilteredOut,
    /// Zero bytes
    Empty,
    /// Beyond what the selection keeps (single-file mode, or a second video)
    Surplus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFile {
    pub name: String,
    pub reason: RejectReason,
}

/// A selection split into the files that will be preprocessed and uploaded.
///
/// Every input file lands in exactly one of `images`, `video` or `rejected`.
#[derive(Debug, Clone, Default)]
pub struct ClassifiedBatch {
    pub images: Vec<MediaFile>,
    /// A room holds at most one video, so a batch carries at most one.
    pub video: Option<MediaFile>,
    pub rejected: Vec<RejectedFile>,
}

impl ClassifiedBatch {
    /// Number of files that will be uploaded
    pub fn len(&self) -> usize {
        self.images.len() + usize::from(self.video.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Splits raw selections into image and video sets.
///
/// All checks are synchronous and run for the whole batch before any upload starts.
#[derive(Debug, Clone)]
pub struct FileClassifier {
    max_video_size: usize,
    image_content_types: Vec<String>,
    video_content_types: Vec<String>,
}

impl FileClassifier {
    pub fn new(
        max_video_size: usize,
        image_content_types: Vec<String>,
        video_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_video_size,
            image_content_types,
            video_content_types,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.max_video_size_bytes,
            config.image_allowed_content_types.clone(),
            config.video_allowed_content_types.clone(),
        )
    }

    pub fn max_video_size(&self) -> usize {
        self.max_video_size
    }

    /// Kind of a file if its type is one this classifier accepts.
    ///
    /// Missing or generic content types fall back to the extension.
    pub fn kind_of(&self, file: &MediaFile) -> Option<MediaKind> {
        let essence = file
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        let content_type = if essence.is_empty() || essence == "application/octet-stream" {
            file.extension()
                .as_deref()
                .and_then(content_type_for_extension)?
                .to_string()
        } else {
            essence
        };

        if self.image_content_types.contains(&content_type) {
            Some(MediaKind::Image)
        } else if self.video_content_types.contains(&content_type) {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Classify a selection.
    ///
    /// Every input file ends up kept or in `rejected`. Only an accepted video above the
    /// size ceiling fails the whole batch. With `multiple == false` only the first file of
    /// each kind is kept. The result may hold nothing to upload.
    pub fn classify(
        &self,
        files: Vec<MediaFile>,
        filter: KindFilter,
        multiple: bool,
    ) -> Result<ClassifiedBatch, ValidationError> {
        let mut accepted = Vec::with_capacity(files.len());
        let mut batch = ClassifiedBatch::default();

        for file in files {
            match self.kind_of(&file) {
                None => batch.rejected.push(RejectedFile {
                    name: file.name,
                    reason: RejectReason::Unsupported,
                }),
                Some(kind) if !filter.accepts(kind) => batch.rejected.push(RejectedFile {
                    name: file.name,
                    reason: RejectReason::FilteredOut,
                }),
                Some(_) if file.size() == 0 => batch.rejected.push(RejectedFile {
                    name: file.name,
                    reason: RejectReason::Empty,
                }),
                Some(kind) => accepted.push((kind, file)),
            }
        }

        for (kind, file) in &accepted {
            if *kind == MediaKind::Video && file.size() > self.max_video_size {
                return Err(ValidationError::FileTooLarge {
                    name: file.name.clone(),
                    size: file.size(),
                    max: self.max_video_size,
                });
            }
        }

        for (kind, file) in accepted {
            let keep = match kind {
                MediaKind::Image => multiple || batch.images.is_empty(),
                MediaKind::Video => batch.video.is_none(),
            };
            if !keep {
                batch.rejected.push(RejectedFile {
                    name: file.name,
                    reason: RejectReason::Surplus,
                });
                continue;
            }
            match kind {
                MediaKind::Image => batch.images.push(file),
                MediaKind::Video => batch.video = Some(file),
            }
        }

        tracing::debug!(
            images = batch.images.len(),
            video = batch.video.is_some(),
            rejected = batch.rejected.len(),
            "Classified file selection"
        );

        Ok(batch)
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}
