//! Detached persistence of the storage branch, followed by notification.

use std::sync::Arc;
use std::time::Instant;

use snapgate_core::ArtifactLocation;
use snapgate_storage::{Storage, StorageError, WriteReceipt};
use tokio::task::JoinHandle;

use super::Phase;
use crate::notification::NotificationDispatcher;
use crate::serializer::GenerationTicket;
use crate::tee::{TeeBranch, TeeHandle};

/// A stream sink went away or failed after the response was committed.
#[derive(Debug, thiserror::Error)]
pub enum StreamFault {
    #[error("client disconnected after {bytes_sent} bytes")]
    Client { bytes_sent: u64 },

    #[error("storage write failed: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug)]
pub enum PersistOutcome {
    Persisted(WriteReceipt),
    Failed(StreamFault),
}

impl PersistOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, PersistOutcome::Persisted(_))
    }
}

/// Handle on a running persistence task. Dropping it detaches the task.
#[derive(Debug)]
pub struct PersistHandle {
    task: JoinHandle<PersistOutcome>,
}

impl PersistHandle {
    /// Wait for persistence (and the notification hand-off) to finish.
    /// `None` if the task was cancelled.
    pub async fn outcome(self) -> Option<PersistOutcome> {
        self.task.await.ok()
    }
}

pub(super) struct PersistJob {
    pub storage: Arc<dyn Storage>,
    pub dispatcher: NotificationDispatcher,
    pub location: ArtifactLocation,
    pub content_type: String,
    pub content_length: Option<u64>,
    pub branch: TeeBranch,
    pub tee: TeeHandle,
    pub ticket: GenerationTicket,
}

impl PersistJob {
    pub(super) fn spawn(self) -> PersistHandle {
        PersistHandle {
            task: tokio::spawn(self.run()),
        }
    }

    async fn run(self) -> PersistOutcome {
        let PersistJob {
            storage,
            dispatcher,
            location,
            content_type,
            content_length,
            branch,
            tee,
            ticket,
        } = self;
        // Held until the pump has stopped as well.
        let _ticket = ticket;
        let start = Instant::now();

        let outcome = match write(storage.as_ref(), &location, &content_type, content_length, branch)
            .await
        {
            Ok(receipt) => PersistOutcome::Persisted(receipt),
            Err(e) => PersistOutcome::Failed(StreamFault::Storage(e)),
        };

        if let Some(summary) = tee.summary().await {
            tracing::debug!(
                key = %location.key,
                bytes_read = summary.bytes_read,
                chunks = summary.chunks,
                source_error = ?summary.source_error,
                "Generation stream drained"
            );
        }

        match &outcome {
            PersistOutcome::Persisted(receipt) => {
                tracing::info!(
                    key = %receipt.key,
                    url = %receipt.url,
                    size_bytes = receipt.bytes_written,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    phase = %Phase::Notifying,
                    "Artifact persisted"
                );
                dispatcher.notify(NotificationDispatcher::snap_message(&receipt.url));
            }
            PersistOutcome::Failed(fault) => {
                tracing::error!(
                    key = %location.key,
                    error = %fault,
                    phase = %Phase::Persisting,
                    "Artifact not persisted, skipping notification"
                );
            }
        }

        tracing::debug!(key = %location.key, phase = %Phase::Done, "Pipeline finished");
        outcome
    }
}

async fn write(
    storage: &dyn Storage,
    location: &ArtifactLocation,
    content_type: &str,
    content_length: Option<u64>,
    branch: TeeBranch,
) -> Result<WriteReceipt, StorageError> {
    // On error the branch is dropped here and the pump keeps serving the client.
    let writer = storage
        .open_write(&location.key, content_type, content_length)
        .await?;
    writer.write_stream(Box::pin(branch)).await
}
