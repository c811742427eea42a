//! Storage existence checks across every encoding of a resource.

use std::sync::Arc;

use futures::future::join_all;
use snapgate_core::{ArtifactLocation, Encoding, ResourceKey};
use snapgate_storage::{Storage, StorageError};

/// No encoding could be confirmed and at least one check failed.
#[derive(Debug, thiserror::Error)]
#[error("Storage probe failed for {resource}: {source}")]
pub struct ProbeError {
    pub resource: String,
    #[source]
    pub source: StorageError,
}

/// Looks up an already stored artifact for a [`ResourceKey`].
#[derive(Clone)]
pub struct CacheProbe {
    storage: Arc<dyn Storage>,
}

impl CacheProbe {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Where `key` lives, or would live, in `encoding`.
    pub fn location(&self, key: &ResourceKey, encoding: Encoding) -> ArtifactLocation {
        let storage_key = key.storage_key(encoding);
        ArtifactLocation {
            url: self.storage.public_url(&storage_key),
            key: storage_key,
            encoding,
        }
    }

    /// Check every encoding concurrently and resolve in [`Encoding::ALL`] order.
    ///
    /// A failed check leaves that encoding unconfirmed; a later confirmed one is
    /// still returned. `Ok(None)` is only reported when every check answered.
    pub async fn probe(&self, key: &ResourceKey) -> Result<Option<ArtifactLocation>, ProbeError> {
        let checks = Encoding::ALL.map(|encoding| {
            let storage_key = key.storage_key(encoding);
            async move { (encoding, self.storage.exists(&storage_key).await) }
        });

        let mut first_error = None;
        for (encoding, result) in join_all(checks).await {
            match result {
                Ok(true) => {
                    tracing::debug!(resource = %key, %encoding, "Cache hit");
                    return Ok(Some(self.location(key, encoding)));
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        resource = %key,
                        %encoding,
                        error = %e,
                        "Existence check failed, treating encoding as unconfirmed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(source) => Err(ProbeError {
                resource: key.to_string(),
                source,
            }),
            None => {
                tracing::debug!(resource = %key, "Cache miss");
                Ok(None)
            }
        }
    }
}
