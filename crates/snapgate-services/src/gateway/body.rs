use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

use super::{Phase, StreamFault};
use crate::serializer::GenerationTicket;
use crate::tee::TeeBranch;

/// Response side of a generation. Keeps the generation lease alive until the
/// client has read everything or gone away.
#[derive(Debug)]
pub struct SnapBody {
    branch: TeeBranch,
    _ticket: GenerationTicket,
    resource: String,
    content_length: Option<u64>,
    bytes_sent: u64,
    abandoned: Arc<AtomicU64>,
}

impl SnapBody {
    pub(super) fn new(
        branch: TeeBranch,
        ticket: GenerationTicket,
        resource: String,
        content_length: Option<u64>,
        abandoned: Arc<AtomicU64>,
    ) -> Self {
        Self {
            branch,
            _ticket: ticket,
            resource,
            content_length,
            bytes_sent: 0,
            abandoned,
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// True once the client received end of stream or every announced byte.
    /// HTTP servers stop polling a body after `Content-Length` bytes.
    pub fn is_complete(&self) -> bool {
        self.branch.is_finished() || self.content_length == Some(self.bytes_sent)
    }
}

impl Stream for SnapBody {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.branch).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.bytes_sent += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            other => other,
        }
    }
}

impl Drop for SnapBody {
    fn drop(&mut self) {
        if self.is_complete() {
            return;
        }
        self.abandoned.fetch_add(1, Ordering::Relaxed);
        let fault = StreamFault::Client {
            bytes_sent: self.bytes_sent,
        };
        tracing::warn!(
            resource = %self.resource,
            phase = %Phase::Streaming,
            error = %fault,
            "Response stream abandoned, persistence continues"
        );
    }
}
