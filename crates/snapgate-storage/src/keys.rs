//! Shared key handling for storage backends.

use crate::traits::{StorageError, StorageResult};
use uuid::Uuid;

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Temporary sibling of `key` that a writer streams into before promotion.
pub fn temp_key(key: &str) -> String {
    format!("{}.partial-{}", key, Uuid::new_v4().simple())
}

/// Parent collections of `key`, outermost first: `a/b/c.png` -> `["a", "a/b"]`.
pub fn parent_prefixes(key: &str) -> Vec<String> {
    let segments: Vec<&str> = key.split('/').collect();
    (1..segments.len())
        .map(|n| segments[..n].join("/"))
        .collect()
}

/// Join a base URL and a key with exactly one slash between them.
pub fn join_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
