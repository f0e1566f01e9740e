//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}/{scope}/{uuid}.{ext}`.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

const MAX_EXTENSION_LEN: usize = 8;

/// Generate a collision-free storage key that keeps the original file's extension.
pub fn generate_storage_key(prefix: &str, scope: &str, original_name: &str) -> String {
    let id = Uuid::new_v4();
    let prefix = prefix.trim_matches('/');
    let scope = scope.trim_matches('/');
    match sanitized_extension(original_name) {
        Some(ext) => format!("{}/{}/{}.{}", prefix, scope, id, ext),
        None => format!("{}/{}/{}", prefix, scope, id),
    }
}

/// Lowercase alphanumeric extension of `name`, if it has a usable one.
fn sanitized_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Reject keys that could escape the storage root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            storage_key
        )));
    }
    Ok(())
}
