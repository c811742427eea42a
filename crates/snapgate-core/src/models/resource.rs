use std::fmt;

use crate::constants::ARTIFACT_NAMESPACE;
use crate::error::AppError;
use crate::models::Encoding;
use crate::validation::{is_valid_dir, is_valid_id};

/// Identifies one logical artifact regardless of its encoding.
///
/// Only constructible through [`ResourceKey::new`], so a value of this type always
/// satisfies the `dir`/`id` patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    dir: String,
    id: String,
}

impl ResourceKey {
    pub fn new(dir: impl Into<String>, id: impl Into<String>) -> Result<Self, AppError> {
        let dir = dir.into();
        let id = id.into();

        if !is_valid_dir(&dir) {
            return Err(AppError::InvalidInput(format!(
                "Invalid dir '{}': expected 1-100 characters of [a-zA-Z0-9_]",
                dir
            )));
        }
        if !is_valid_id(&id) {
            return Err(AppError::InvalidInput(format!(
                "Invalid id '{}': expected 1-19 decimal digits",
                id
            )));
        }

        Ok(Self { dir, id })
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Storage key of this resource in the given encoding: `snap/{dir}/{id}.{ext}`.
    pub fn storage_key(&self, encoding: Encoding) -> String {
        format!(
            "{}/{}/{}.{}",
            ARTIFACT_NAMESPACE,
            self.dir,
            self.id,
            encoding.extension()
        )
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.dir, self.id)
    }
}
