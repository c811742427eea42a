//! Request orchestration.
//!
//! Per request: probe storage, redirect on a hit; otherwise wait for the
//! generation lease, generate, and tee the stream to the caller and to storage.
//! Persistence and notification continue on a detached task after the response
//! has been handed back.

mod body;
mod persist;


pub use body::SnapBody;
pub use persist::{PersistHandle, PersistOutcome, StreamFault};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use snapgate_core::{AppError, ArtifactLocation, GatewayConfig, ResourceKey};
use snapgate_storage::Storage;

use crate::generation::{GenerationError, SnapGenerator};
use crate::notification::NotificationDispatcher;
use crate::probe::{CacheProbe, ProbeError};
use crate::serializer::{GenerationSerializer, SerializerClosed};
use crate::tee::tee;
use persist::PersistJob;

/// Pipeline stage, recorded in tracing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Probing,
    Redirecting,
    Leasing,
    Generating,
    Streaming,
    Persisting,
    Notifying,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Probing => "probing",
            Phase::Redirecting => "redirecting",
            Phase::Leasing => "leasing",
            Phase::Generating => "generating",
            Phase::Streaming => "streaming",
            Phase::Persisting => "persisting",
            Phase::Notifying => "notifying",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Failures that happen before a response is committed.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Serializer(#[from] SerializerClosed),
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Probe(e) => AppError::StorageUnavailable(e.to_string()),
            GatewayError::Generation(e) => e.into(),
            GatewayError::Serializer(e) => AppError::Internal(e.to_string()),
        }
    }
}

pub enum GatewayResponse {
    /// The artifact is already stored.
    Redirect { location: ArtifactLocation },
    /// Freshly generated. `location` is where it is being persisted.
    Generated {
        content_type: String,
        content_length: Option<u64>,
        location: ArtifactLocation,
        body: SnapBody,
        persist: PersistHandle,
    },
}

impl fmt::Debug for GatewayResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayResponse::Redirect { location } => {
                f.debug_struct("Redirect").field("location", location).finish()
            }
            GatewayResponse::Generated {
                content_type,
                content_length,
                location,
                ..
            } => f
                .debug_struct("Generated")
                .field("content_type", content_type)
                .field("content_length", content_length)
                .field("location", location)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GatewayOptions {
    pub generation_timeout: Duration,
    pub tee_buffer_chunks: usize,
}

impl From<&GatewayConfig> for GatewayOptions {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            generation_timeout: config.generation_timeout(),
            tee_buffer_chunks: config.tee_buffer_chunks,
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    probe: CacheProbe,
    storage: Arc<dyn Storage>,
    serializer: Arc<GenerationSerializer>,
    generator: Arc<dyn SnapGenerator>,
    dispatcher: NotificationDispatcher,
    options: GatewayOptions,
    abandoned_streams: Arc<AtomicU64>,
}

impl Gateway {
    pub fn new(
        storage: Arc<dyn Storage>,
        generator: Arc<dyn SnapGenerator>,
        dispatcher: NotificationDispatcher,
        options: GatewayOptions,
    ) -> Self {
        Self {
            probe: CacheProbe::new(storage.clone()),
            storage,
            serializer: Arc::new(GenerationSerializer::new()),
            generator,
            dispatcher,
            options,
            abandoned_streams: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Share a generation gate with other gateways in the process.
    pub fn with_serializer(mut self, serializer: Arc<GenerationSerializer>) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn serializer(&self) -> &Arc<GenerationSerializer> {
        &self.serializer
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Generated responses whose client went away before the last byte.
    pub fn abandoned_streams(&self) -> u64 {
        self.abandoned_streams.load(Ordering::Relaxed)
    }

    /// Resolve a resource to a redirect or a freshly generated stream.
    #[tracing::instrument(skip(self, key), fields(resource = %key))]
    pub async fn handle(&self, key: &ResourceKey) -> Result<GatewayResponse, GatewayError> {
        let result = self.run(key).await;
        if let Err(e) = &result {
            tracing::warn!(phase = %Phase::Failed, error = %e, "Request failed before response");
        }
        result
    }

    async fn run(&self, key: &ResourceKey) -> Result<GatewayResponse, GatewayError> {
        tracing::debug!(phase = %Phase::Probing, "Probing storage");
        if let Some(location) = self.probe.probe(key).await? {
            tracing::info!(phase = %Phase::Redirecting, url = %location.url, "Serving stored artifact");
            return Ok(GatewayResponse::Redirect { location });
        }

        tracing::debug!(phase = %Phase::Leasing, "Waiting for generation lease");
        let ticket = self.serializer.acquire().await?;

        // Another request may have persisted it while this one was queued.
        if let Some(location) = self.probe.probe(key).await? {
            tracing::info!(
                phase = %Phase::Redirecting,
                url = %location.url,
                "Artifact stored while queued, skipping generation"
            );
            return Ok(GatewayResponse::Redirect { location });
        }

        tracing::info!(phase = %Phase::Generating, "Generating artifact");
        let timeout = self.options.generation_timeout;
        let generated = match tokio::time::timeout(timeout, self.generator.generate(key)).await {
            Ok(result) => result?,
            Err(_) => return Err(GenerationError::Timeout(timeout).into()),
        };
        let encoding = generated.encoding()?;
        let location = self.probe.location(key, encoding);

        tracing::debug!(
            phase = %Phase::Streaming,
            key = %location.key,
            content_type = %generated.content_type,
            content_length = ?generated.content_length,
            "Streaming to client and storage"
        );
        let (response_branch, storage_branch, tee_handle) =
            tee(generated.stream, self.options.tee_buffer_chunks);

        let persist = PersistJob {
            storage: self.storage.clone(),
            dispatcher: self.dispatcher.clone(),
            location: location.clone(),
            content_type: generated.content_type.clone(),
            content_length: generated.content_length,
            branch: storage_branch,
            tee: tee_handle,
            ticket: ticket.clone(),
        }
        .spawn();

        Ok(GatewayResponse::Generated {
            content_type: generated.content_type,
            content_length: generated.content_length,
            location,
            body: SnapBody::new(
                response_branch,
                ticket,
                key.to_string(),
                generated.content_length,
                self.abandoned_streams.clone(),
            ),
            persist,
        })
    }
}
