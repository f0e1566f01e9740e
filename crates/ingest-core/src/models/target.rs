use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(Uuid);

impl TargetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TargetId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl Display for TargetId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TargetId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// A room-like record that ends up holding uploaded media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub id: TargetId,
    pub name: String,
    /// Room type used by category filters (e.g. "bedroom").
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub video: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TargetRecord {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: TargetId::new(),
            name: name.into(),
            category: category.into(),
            images: Vec::new(),
            video: None,
            updated_at: Utc::now(),
        }
    }

    pub fn matches_category(&self, category: &str) -> bool {
        self.category.eq_ignore_ascii_case(category.trim())
    }

    /// Merge a patch into this record and return the number of images appended.
    ///
    /// Images already present are not appended again; a new video replaces the old one.
    pub fn apply(&mut self, patch: &MediaPatch) -> usize {
        let mut appended = 0;
        for url in &patch.append_images {
            if !self.images.contains(url) {
                self.images.push(url.clone());
                appended += 1;
            }
        }
        if let Some(video) = &patch.set_video {
            self.video = Some(video.clone());
        }
        if appended > 0 || patch.set_video.is_some() {
            self.updated_at = Utc::now();
        }
        appended
    }
}

/// Media to merge into one target record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPatch {
    pub append_images: Vec<String>,
    pub set_video: Option<String>,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_appends_in_order_and_replaces_video() {
        let mut room = TargetRecord::new("Suite", "bedroom");
        room.images.push("a".to_string());
        room.video = Some("old.mp4".to_string());

        let patch = MediaPatch {
            append_images: vec!["b".to_string(), "c".to_string()],
            set_video: Some("new.mp4".to_string()),
        };
        assert_eq!(room.apply(&patch), 2);
        assert_eq!(room.images, vec!["a", "b", "c"]);
        assert_eq!(room.video.as_deref(), Some("new.mp4"));
    }

    #[test]
    fn test_apply_is_idempotent_for_images() {
        let mut room = TargetRecord::new("Suite", "bedroom");
        let patch = MediaPatch {
            append_images: vec!["x".to_string()],
            set_video: None,
        };
        assert_eq!(room.apply(&patch), 1);
        assert_eq!(room.apply(&patch), 0);
        assert_eq!(room.images.len(), 1);
    }

    #[test]
    fn test_apply_without_video_keeps_existing_video() {
        let mut room = TargetRecord::new("Suite", "bedroom");
        room.video = Some("keep.mp4".to_string());
        room.apply(&MediaPatch {
            append_images: vec!["x".to_string()],
            set_video: None,
        });
        assert_eq!(room.video.as_deref(), Some("keep.mp4"));
    }

    #[test]
    fn test_category_match_is_case_insensitive() {
        let room = TargetRecord::new("Suite", "Bedroom");
        assert!(room.matches_category(" bedroom"));
        assert!(!room.matches_category("kitchen"));
    }

    #[test]
    fn test_target_id_parse() {
        let id = TargetId::new();
        assert_eq!(id.to_string().parse::<TargetId>().unwrap(), id);
        assert!("not-a-uuid".parse::<TargetId>().is_err());
    }
}
