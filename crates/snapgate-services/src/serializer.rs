//! Single-flight gate for generation.
//!
//! At most one generation is in flight at any time. Waiters are admitted in
//! arrival order, and a lease is only released once every holder of its
//! [`GenerationTicket`] has let go.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// The gate was closed while waiting for it.
#[derive(Debug, thiserror::Error)]
#[error("Generation serializer is closed")]
pub struct SerializerClosed;

/// FIFO mutual exclusion around generation.
#[derive(Debug)]
pub struct GenerationSerializer {
    semaphore: Arc<Semaphore>,
}

impl GenerationSerializer {
    pub fn new() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// Wait for the lease. Suspends without bound while another request holds it.
    pub async fn acquire(&self) -> Result<GenerationTicket, SerializerClosed> {
        let queued_at = Instant::now();
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SerializerClosed)?;

        tracing::debug!(
            waited_ms = queued_at.elapsed().as_millis() as u64,
            "Generation lease acquired"
        );

        Ok(GenerationTicket {
            lease: Arc::new(Lease {
                _permit: permit,
                acquired_at: Instant::now(),
            }),
        })
    }

    /// Run `f` while holding the lease. Released when `f` settles, whether it
    /// succeeded or not.
    pub async fn with_lease<F, Fut, T>(&self, f: F) -> Result<T, SerializerClosed>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _ticket = self.acquire().await?;
        Ok(f().await)
    }

    /// Free slots: 1 when idle, 0 while a lease is held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// True when nobody holds the lease.
    pub fn is_idle(&self) -> bool {
        self.available() > 0
    }
}

impl Default for GenerationSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared proof of holding the generation lease.
///
/// Clones share one lease; it is released when the last clone is dropped. This
/// lets the response body and the persistence task each keep it alive.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    lease: Arc<Lease>,
}

impl GenerationTicket {
    /// Number of live clones of this ticket.
    pub fn holders(&self) -> usize {
        Arc::strong_count(&self.lease)
    }
}

#[derive(Debug)]
struct Lease {
    _permit: OwnedSemaphorePermit,
    acquired_at: Instant,
}

impl Drop for Lease {
    fn drop(&mut self) {
        tracing::debug!(
            held_ms = self.acquired_at.elapsed().as_millis() as u64,
            "Generation lease released"
        );
    }
}
