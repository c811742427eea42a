//! Duplicate one byte stream into two independently consumed branches.
//!
//! A pump task reads the source and pushes every chunk into two bounded
//! channels. The slower live branch throttles the source; a branch whose
//! consumer is dropped is detached and the other keeps receiving. A source
//! error is delivered to every live branch before both end.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

type Chunk = io::Result<Bytes>;

/// What the pump observed once it stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeeSummary {
    pub bytes_read: u64,
    pub chunks: u64,
    pub source_error: Option<String>,
    /// Both branches went away before the source was exhausted.
    pub closed_early: bool,
}

/// Handle on the pump task. Dropping it does not stop the pump.
#[derive(Debug)]
pub struct TeeHandle {
    task: JoinHandle<TeeSummary>,
}

impl TeeHandle {
    /// Wait for the pump to stop. `None` if the pump task was cancelled.
    pub async fn summary(self) -> Option<TeeSummary> {
        self.task.await.ok()
    }
}

/// One side of a tee.
#[derive(Debug)]
pub struct TeeBranch {
    rx: mpsc::Receiver<Chunk>,
    finished: bool,
}

impl TeeBranch {
    /// True once the branch has yielded its end of stream.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Stream for TeeBranch {
    type Item = Chunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(None) => {
                this.finished = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

/// Split `source` into two branches, each buffering at most `capacity` chunks.
///
/// Must be called inside a tokio runtime.
pub fn tee<S>(source: S, capacity: usize) -> (TeeBranch, TeeBranch, TeeHandle)
where
    S: Stream<Item = Chunk> + Send + 'static,
{
    let capacity = capacity.max(1);
    let (left_tx, left_rx) = mpsc::channel(capacity);
    let (right_tx, right_rx) = mpsc::channel(capacity);

    let task = tokio::spawn(pump(Box::pin(source), left_tx, right_tx));

    (
        TeeBranch {
            rx: left_rx,
            finished: false,
        },
        TeeBranch {
            rx: right_rx,
            finished: false,
        },
        TeeHandle { task },
    )
}

async fn pump<S>(
    mut source: Pin<Box<S>>,
    left: mpsc::Sender<Chunk>,
    right: mpsc::Sender<Chunk>,
) -> TeeSummary
where
    S: Stream<Item = Chunk> + Send,
{
    let mut left = Some(left);
    let mut right = Some(right);
    let mut summary = TeeSummary::default();
    let mut exhausted = false;

    while left.is_some() || right.is_some() {
        let Some(item) = source.next().await else {
            exhausted = true;
            break;
        };

        match item {
            Ok(chunk) => {
                summary.bytes_read += chunk.len() as u64;
                summary.chunks += 1;

                let (left_open, right_open) = futures::join!(
                    forward(left.as_ref(), Ok(chunk.clone())),
                    forward(right.as_ref(), Ok(chunk)),
                );
                if !left_open {
                    left = None;
                }
                if !right_open {
                    right = None;
                }
            }
            Err(e) => {
                tracing::warn!(
                    bytes_read = summary.bytes_read,
                    error = %e,
                    "Source stream failed"
                );
                summary.source_error = Some(e.to_string());
                let copy = io::Error::new(e.kind(), e.to_string());
                futures::join!(forward(left.as_ref(), Err(e)), forward(right.as_ref(), Err(copy)));
                exhausted = true;
                break;
            }
        }
    }

    summary.closed_early = !exhausted;
    tracing::debug!(
        bytes_read = summary.bytes_read,
        chunks = summary.chunks,
        closed_early = summary.closed_early,
        "Tee pump finished"
    );
    summary
}

/// Send to a branch. Returns false when the branch is, or just became, detached.
async fn forward(tx: Option<&mpsc::Sender<Chunk>>, item: Chunk) -> bool {
    match tx {
        Some(tx) => tx.send(item).await.is_ok(),
        None => false,
    }
}
