//! Sending scan results to the counting service.
//!
//! The wire format is plain text: one path per line, each terminated by
//! `\n`, with no header or length prefix. One TCP connection carries one
//! batch; closing the write side marks the end of the batch.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::error::ScanError;

/// A newline-framed batch ready to be written to the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedBatch {
    /// The framed payload.
    pub bytes: Vec<u8>,
    /// Number of paths in the payload.
    pub paths: usize,
    /// Paths left out because they contain a newline.
    pub skipped: usize,
}

/// Frames `paths` as newline-terminated lines.
///
/// A path containing `\n` cannot be framed and is skipped with a warning.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use wf_scanner::encode_batch;
///
/// let batch = encode_batch(&[Utf8PathBuf::from("a.txt"), Utf8PathBuf::from("d/b.txt")]);
/// assert_eq!(batch.bytes, b"a.txt\nd/b.txt\n");
/// assert_eq!(batch.paths, 2);
/// ```
#[must_use]
pub fn encode_batch(paths: &[Utf8PathBuf]) -> EncodedBatch {
    let capacity = paths.iter().map(|p| p.as_str().len() + 1).sum();
    let mut batch = EncodedBatch {
        bytes: Vec::with_capacity(capacity),
        ..EncodedBatch::default()
    };

    for path in paths {
        if path.as_str().contains('\n') {
            warn!(path = ?path.as_str(), "Skipping path containing a newline");
            batch.skipped += 1;
            continue;
        }
        batch.bytes.extend_from_slice(path.as_str().as_bytes());
        batch.bytes.push(b'\n');
        batch.paths += 1;
    }
    batch
}

/// Summary of a completed dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    /// Paths sent.
    pub paths: usize,
    /// Paths left out because they contain a newline.
    pub skipped: usize,
    /// Payload size in bytes.
    pub bytes: usize,
    /// Time spent connecting and writing.
    pub elapsed: Duration,
}

/// Sends batches of paths to a counting service.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    addr: SocketAddr,
}

impl Dispatcher {
    /// Creates a dispatcher targeting `addr`.
    #[inline]
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Returns the target address.
    #[inline]
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Opens one connection, writes every path, and closes the write side.
    ///
    /// An empty path list still connects and sends an empty batch, which the
    /// service drops.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Connect`] if the service cannot be reached and
    /// [`ScanError::Send`] if writing or closing the stream fails.
    pub async fn dispatch(&self, paths: &[Utf8PathBuf]) -> Result<DispatchReport, ScanError> {
        let start = Instant::now();
        let batch = encode_batch(paths);
        let addr = self.addr;

        let mut stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ScanError::Connect { addr, source })?;
        debug!(addr = %addr, "Connected to counting service");

        stream
            .write_all(&batch.bytes)
            .await
            .map_err(|source| ScanError::Send { addr, source })?;
        stream
            .shutdown()
            .await
            .map_err(|source| ScanError::Send { addr, source })?;

        let report = DispatchReport {
            paths: batch.paths,
            skipped: batch.skipped,
            bytes: batch.bytes.len(),
            elapsed: start.elapsed(),
        };
        info!(
            addr = %addr,
            paths = report.paths,
            skipped = report.skipped,
            bytes = report.bytes,
            elapsed_ms = report.elapsed.as_millis(),
            "Batch dispatched"
        );
        Ok(report)
    }
}
