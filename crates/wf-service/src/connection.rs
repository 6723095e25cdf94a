//! Listener and per-connection handling.
//!
//! Every accepted connection runs on its own task and moves through
//!
//! ```text
//! Accepted -> Receiving -> Enqueued -> Closed
//!                      \-> Dropped  -> Closed
//! ```
//!
//! End of stream is the batch delimiter: all bytes are read until the peer
//! closes its write side, then the payload is pushed onto the [`JobQueue`]
//! as one [`Batch`]. Empty and unreadable payloads are dropped, as is a
//! payload still being received when the service shuts down.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, trace, warn};

use crate::batch::Batch;
use crate::error::ServiceError;
use crate::queue::JobQueue;
use crate::stats::ServiceStats;

/// Lifecycle of one inbound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// The socket has been accepted.
    Accepted,
    /// Bytes are being read until end of stream.
    Receiving,
    /// The payload was pushed onto the job queue.
    Enqueued,
    /// The payload was empty, unreadable, cut off by shutdown, or refused
    /// by the queue.
    Dropped,
    /// The socket has been released.
    Closed,
}

/// One inbound connection and its state.
#[derive(Debug)]
pub struct Connection<S> {
    id: u64,
    peer: SocketAddr,
    stream: S,
    state: ConnectionState,
}

impl<S: AsyncRead + Unpin> Connection<S> {
    /// Wraps an accepted stream.
    pub const fn new(id: u64, peer: SocketAddr, stream: S) -> Self {
        Self {
            id,
            peer,
            stream,
            state: ConnectionState::Accepted,
        }
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        trace!(conn = self.id, from = ?self.state, to = ?next, "Connection state");
        self.state = next;
    }

    /// Reads the whole payload, enqueues it, and closes the stream.
    ///
    /// A peer that has not closed its write side when `shutdown` is
    /// cancelled loses its partial payload.
    ///
    /// Returns [`ConnectionState::Enqueued`] or [`ConnectionState::Dropped`].
    pub async fn run(
        mut self,
        queue: &JobQueue,
        stats: &ServiceStats,
        shutdown: &CancellationToken,
    ) -> ConnectionState {
        self.transition(ConnectionState::Receiving);

        let mut payload = Vec::new();
        let read = tokio::select! {
            biased;
            res = self.stream.read_to_end(&mut payload) => Some(res),
            () = shutdown.cancelled() => None,
        };

        let outcome = match read {
            None => {
                warn!(
                    conn = self.id,
                    peer = %self.peer,
                    bytes = payload.len(),
                    "Shutting down, dropping unfinished batch"
                );
                ConnectionState::Dropped
            }
            Some(Err(source)) => {
                let err = ServiceError::ReadBatch {
                    peer: self.peer,
                    source,
                };
                warn!(conn = self.id, bytes = payload.len(), error = %err, "Dropping partial batch");
                ConnectionState::Dropped
            }
            Some(Ok(0)) => {
                warn!(conn = self.id, peer = %self.peer, "Dropping empty batch");
                ConnectionState::Dropped
            }
            Some(Ok(bytes)) => match queue.push(Batch::new(self.id, self.peer, payload)) {
                Ok(()) => {
                    debug!(conn = self.id, bytes, queued = queue.len(), "Batch enqueued");
                    ConnectionState::Enqueued
                }
                Err(_) => {
                    warn!(conn = self.id, bytes, "Job queue is shut down, dropping batch");
                    ConnectionState::Dropped
                }
            },
        };

        match outcome {
            ConnectionState::Enqueued => stats.record_batch_enqueued(),
            _ => stats.record_batch_dropped(),
        }
        self.transition(outcome);

        // The stream is released when `self` drops at the end of this call.
        self.transition(ConnectionState::Closed);
        outcome
    }
}

/// Accepts connections until `shutdown` is cancelled.
///
/// Each connection is handled on a task registered with `tracker`, so the
/// caller can wait for in-flight payloads after the loop returns. Those
/// tasks observe `shutdown` too, so a peer that never closes its stream
/// cannot hold the wait open.
pub async fn accept_loop(
    listener: TcpListener,
    queue: Arc<JobQueue>,
    stats: Arc<ServiceStats>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
) {
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("Listener shutting down");
                break;
            }
            res = listener.accept() => {
                match res {
                    Ok((stream, peer)) => {
                        let id = stats.record_connection();
                        info!(conn = id, peer = %peer, "Accepted connection");
                        let queue = Arc::clone(&queue);
                        let stats = Arc::clone(&stats);
                        let shutdown = shutdown.clone();
                        tracker.spawn(async move {
                            Connection::new(id, peer, stream)
                                .run(&queue, &stats, &shutdown)
                                .await;
                        });
                    }
                    Err(e) => {
                        let err = ServiceError::Accept(e);
                        error!(error = %err, "Failed to accept connection");
                    }
                }
            }
        }
    }
}
