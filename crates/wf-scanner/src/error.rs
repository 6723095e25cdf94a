//! Error types for the wf-scanner crate.
//!
//! This module provides the [`ScanError`] type for errors that can occur
//! during directory traversal, local counting, and dispatch.

use std::net::SocketAddr;

use camino::Utf8PathBuf;
use wf_core::CountError;

/// Errors that can occur during scanning operations.
///
/// # Error Recovery Strategy
///
/// - **Directory errors** ([`ScanError::ReadDir`]): Log warning, skip subtree, continue scan
/// - **Non-UTF-8 paths** ([`ScanError::NonUtf8Path`]): Log warning, skip entry, continue scan
/// - **Count errors** ([`ScanError::Count`]): Log warning, file contributes nothing
/// - **Everything else**: Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use wf_scanner::ScanError;
///
/// let err = ScanError::config("root path does not exist: /missing");
/// assert!(err.is_fatal());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// Invalid scanner configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A directory could not be opened or listed.
    ///
    /// Its subtree is skipped; the scan continues.
    #[error("failed to read directory {path}: {source}")]
    ReadDir {
        /// The directory that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path is not valid UTF-8.
    ///
    /// Paths travel over the wire as text, so such entries are skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A file could not be counted.
    #[error(transparent)]
    Count(#[from] CountError),

    /// A worker thread could not be spawned.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        /// Name of the thread that failed to start.
        name: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A scan worker panicked.
    #[error("scan worker {0} panicked")]
    WorkerPanicked(usize),

    /// The counting thread pool could not be built.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The counting service could not be reached.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        /// The service address.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The batch could not be written to the counting service.
    #[error("failed to send batch to {addr}: {source}")]
    Send {
        /// The service address.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Creates a new [`ScanError::Config`] error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a new [`ScanError::ReadDir`] error.
    #[inline]
    pub fn read_dir(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::ReadDir {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if this error is recoverable (scanning can continue).
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ReadDir { .. } | Self::NonUtf8Path(_) | Self::Count(_)
        )
    }

    /// Returns `true` if this error is fatal (the run should stop).
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the filesystem path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::ReadDir { path, .. } => Some(path),
            Self::Count(e) => Some(e.path()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_read_dir_is_recoverable() {
        let err = ScanError::read_dir(
            "data/locked",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert_eq!(err.path().map(|p| p.as_str()), Some("data/locked"));
        assert!(err.to_string().contains("data/locked"));
    }

    #[test]
    fn test_count_error_carries_path() {
        let err = ScanError::from(CountError::NotAFile(Utf8PathBuf::from("data/dir")));
        assert!(err.is_recoverable());
        assert_eq!(err.path().map(|p| p.as_str()), Some("data/dir"));
    }

    #[test]
    fn test_connect_is_fatal() {
        let err = ScanError::Connect {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(err.is_fatal());
        assert!(err.path().is_none());
        assert!(err.to_string().contains("127.0.0.1:8080"));
    }

    #[test]
    fn test_config_display() {
        let err = ScanError::config("test error");
        assert_eq!(err.to_string(), "invalid configuration: test error");
    }
}
