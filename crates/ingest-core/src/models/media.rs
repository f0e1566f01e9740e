use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            _ => Err(anyhow::anyhow!("Invalid media kind: {}", s)),
        }
    }
}

/// Expected MIME type for a known media extension.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "heic" => Some("image/heic"),
        "mp4" => Some("video/mp4"),
        "mov" => Some("video/quicktime"),
        "webm" => Some("video/webm"),
        "m4v" => Some("video/x-m4v"),
        _ => None,
    }
}

/// Which kinds a selection accepts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFilter {
    ImagesOnly,
    VideosOnly,
    #[default]
    Both,
}

impl KindFilter {
    pub fn accepts(&self, kind: MediaKind) -> bool {
        match self {
            KindFilter::ImagesOnly => kind == MediaKind::Image,
            KindFilter::VideosOnly => kind == MediaKind::Video,
            KindFilter::Both => true,
        }
    }
}

/// A selected file. The name is the display key; content is reference-counted so stages
/// can hand it along without copying.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl MediaFile {
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Build a file whose content type is inferred from its extension.
    pub fn from_name(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let content_type = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(content_type_for_extension)
            .unwrap_or("application/octet-stream");
        Self::new(name, content_type, data)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Lowercase extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// Same file identity with replaced content, as produced by an editing stage.
    pub fn with_data(&self, data: impl Into<Bytes>) -> Self {
        Self {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            data: data.into(),
        }
    }
}

/// Trim window in seconds. Always satisfies `0 <= start < end <= duration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    start: f64,
    end: f64,
}

impl TrimRange {
    pub fn new(start: f64, end: f64, duration: f64) -> Result<Self, ValidationError> {
        let valid = start.is_finite()
            && end.is_finite()
            && start >= 0.0
            && start < end
            && end <= duration;
        if !valid {
            return Err(ValidationError::InvalidTrimRange {
                start,
                end,
                duration,
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_infers_content_type() {
        let file = MediaFile::from_name("kitchen.jpeg", vec![0u8; 4]);
        assert_eq!(file.content_type, "image/jpeg");
        assert_eq!(file.size(), 4);
        assert_eq!(file.extension().as_deref(), Some("jpeg"));
    }

    #[test]
    fn test_kind_filter() {
        assert!(KindFilter::Both.accepts(MediaKind::Video));
        assert!(KindFilter::ImagesOnly.accepts(MediaKind::Image));
        assert!(!KindFilter::ImagesOnly.accepts(MediaKind::Video));
        assert!(!KindFilter::VideosOnly.accepts(MediaKind::Image));
    }

    #[test]
    fn test_trim_range_bounds() {
        let range = TrimRange::new(2.0, 10.0, 30.0).unwrap();
        assert_eq!(range.length(), 8.0);

        assert!(TrimRange::new(10.0, 10.0, 30.0).is_err());
        assert!(TrimRange::new(-1.0, 5.0, 30.0).is_err());
        assert!(TrimRange::new(0.0, 31.0, 30.0).is_err());
        assert!(TrimRange::new(0.0, f64::NAN, 30.0).is_err());
    }
}
