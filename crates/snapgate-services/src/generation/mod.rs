//! Generation backend abstraction
//!
//! The gateway only needs one thing from a generator: a content type and a
//! single-use byte stream for a resource.

pub mod http;

pub use http::HttpSnapGenerator;

use std::fmt;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use snapgate_core::{AppError, Encoding, ResourceKey};

/// Single-use body of a generated artifact.
pub type SourceStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Generation request failed: {0}")]
    Request(String),

    #[error("Generation backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unsupported generation content type: {0}")]
    UnsupportedContentType(String),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation client configuration error: {0}")]
    Config(String),
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Timeout(after) => AppError::GenerationTimeout {
                seconds: after.as_secs(),
            },
            other => AppError::Generation(other.to_string()),
        }
    }
}

/// A started generation: headers are known, the body is still streaming.
pub struct GenerationResult {
    pub content_type: String,
    pub content_length: Option<u64>,
    pub stream: SourceStream,
}

impl GenerationResult {
    /// Encoding implied by the content type.
    pub fn encoding(&self) -> Result<Encoding, GenerationError> {
        Encoding::from_content_type(&self.content_type)
            .ok_or_else(|| GenerationError::UnsupportedContentType(self.content_type.clone()))
    }
}

impl fmt::Debug for GenerationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationResult")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Produces a fresh artifact for a resource.
#[async_trait]
pub trait SnapGenerator: Send + Sync {
    async fn generate(&self, key: &ResourceKey) -> Result<GenerationResult, GenerationError>;
}
