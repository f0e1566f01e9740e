//! Pipeline-wide limits and defaults.

/// Videos above this size are rejected before any network activity.
pub const MAX_VIDEO_SIZE_BYTES: usize = 50 * 1024 * 1024;

/// Bytes written per transport chunk. One progress tick is reported per chunk.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 256 * 1024;

/// First segment of every generated storage key.
pub const DEFAULT_STORAGE_KEY_PREFIX: &str = "rooms";

pub const DEFAULT_IMAGE_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/heic",
];

pub const DEFAULT_VIDEO_CONTENT_TYPES: &[&str] = &[
    "video/mp4",
    "video/quicktime",
    "video/webm",
    "video/x-m4v",
];
