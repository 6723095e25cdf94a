//! Error types for the wf-service crate.

use std::net::SocketAddr;

/// Errors that can occur while running the counting service.
///
/// # Error Recovery Strategy
///
/// - **Accept errors** ([`ServiceError::Accept`]): Log error, keep listening
/// - **Read errors** ([`ServiceError::ReadBatch`]): Log warning, drop the partial batch
/// - **Everything else**: Fatal - startup or shutdown cannot complete
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Invalid service configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The requested address.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The bound address of the listener could not be read.
    #[error("failed to read listener address: {0}")]
    LocalAddr(#[source] std::io::Error),

    /// An incoming connection could not be accepted.
    #[error("failed to accept connection: {0}")]
    Accept(#[source] std::io::Error),

    /// A batch payload could not be read to end of stream.
    #[error("failed to read batch from {peer}: {source}")]
    ReadBatch {
        /// The sending peer.
        peer: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A worker thread could not be spawned.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        /// Name of the thread that failed to start.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A worker thread panicked.
    #[error("{0} panicked")]
    WorkerPanicked(String),

    /// The inner counting pool could not be built.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The aggregator stopped before all batches were submitted.
    #[error("aggregator is no longer accepting results")]
    AggregatorClosed,

    /// A background task failed to complete.
    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl ServiceError {
    /// Creates a new [`ServiceError::Config`] error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a new [`ServiceError::Spawn`] error.
    #[inline]
    pub fn spawn(name: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            name: name.into(),
            source,
        }
    }

    /// Returns `true` if the service keeps running after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Accept(_) | Self::ReadBatch { .. })
    }

    /// Returns `true` if this error stops the service.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the network address associated with this error, if any.
    #[must_use]
    pub const fn addr(&self) -> Option<SocketAddr> {
        match self {
            Self::Bind { addr, .. } => Some(*addr),
            Self::ReadBatch { peer, .. } => Some(*peer),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_bind_is_fatal() {
        let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
        let err = ServiceError::Bind {
            addr,
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(err.is_fatal());
        assert_eq!(err.addr(), Some(addr));
        assert!(err.to_string().contains("0.0.0.0:8080"));
    }

    #[test]
    fn test_read_batch_is_recoverable() {
        let peer = SocketAddr::from(([127, 0, 0, 1], 50_000));
        let err = ServiceError::ReadBatch {
            peer,
            source: io::Error::new(io::ErrorKind::ConnectionReset, "reset"),
        };
        assert!(err.is_recoverable());
        assert_eq!(err.addr(), Some(peer));
    }

    #[test]
    fn test_worker_panicked_display() {
        let err = ServiceError::WorkerPanicked("mapper-3".to_owned());
        assert_eq!(err.to_string(), "mapper-3 panicked");
        assert!(err.addr().is_none());
    }
}
