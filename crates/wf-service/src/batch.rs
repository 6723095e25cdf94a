//! Batches received from scanning agents and their path lines.
//!
//! A batch is the full byte stream of one connection. It is split into
//! lines on `\n`; a trailing `\r` is stripped, empty lines are ignored, and
//! lines that are not valid UTF-8 are skipped and counted.

use std::net::SocketAddr;

use camino::Utf8PathBuf;

/// One connection's complete payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    id: u64,
    peer: SocketAddr,
    payload: Vec<u8>,
}

impl Batch {
    /// Creates a batch received on connection `id` from `peer`.
    #[must_use]
    pub const fn new(id: u64, peer: SocketAddr, payload: Vec<u8>) -> Self {
        Self { id, peer, payload }
    }

    /// Returns the id of the connection that delivered the batch.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Returns the sending peer.
    #[inline]
    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Returns the raw payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the payload size in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Parses the payload into file paths.
    #[must_use]
    pub fn paths(&self) -> ParsedPaths {
        parse_paths(&self.payload)
    }
}

/// File paths extracted from a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPaths {
    /// Paths in payload order, duplicates kept.
    pub paths: Vec<Utf8PathBuf>,
    /// Lines skipped because they were not valid UTF-8.
    pub invalid: usize,
}

/// Splits a newline-delimited payload into file paths.
///
/// # Examples
///
/// ```
/// use wf_service::parse_paths;
///
/// let parsed = parse_paths(b"a.txt\r\n\nb.txt");
/// assert_eq!(parsed.paths, ["a.txt", "b.txt"]);
/// assert_eq!(parsed.invalid, 0);
/// ```
#[must_use]
pub fn parse_paths(payload: &[u8]) -> ParsedPaths {
    let mut parsed = ParsedPaths::default();
    for line in payload.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        match std::str::from_utf8(line) {
            Ok(path) => parsed.paths.push(Utf8PathBuf::from(path)),
            Err(_) => parsed.invalid += 1,
        }
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40_000))
    }

    #[test]
    fn test_batch_accessors() {
        let batch = Batch::new(7, peer(), b"a\n".to_vec());
        assert_eq!(batch.id(), 7);
        assert_eq!(batch.peer(), peer());
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_trailing_newline_is_optional() {
        assert_eq!(parse_paths(b"a\nb\n"), parse_paths(b"a\nb"));
    }

    #[test]
    fn test_empty_lines_skipped() {
        let parsed = parse_paths(b"\n\na\n\n\nb\n\n");
        assert_eq!(parsed.paths, ["a", "b"]);
    }

    #[test]
    fn test_crlf_stripped() {
        let parsed = parse_paths(b"dir/a.txt\r\ndir/b.txt\r\n");
        assert_eq!(parsed.paths, ["dir/a.txt", "dir/b.txt"]);
    }

    #[test]
    fn test_duplicates_kept() {
        let parsed = parse_paths(b"same\nsame\n");
        assert_eq!(parsed.paths.len(), 2);
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let parsed = parse_paths(b"good\n\xff\xfe\nalso good\n");
        assert_eq!(parsed.paths, ["good", "also good"]);
        assert_eq!(parsed.invalid, 1);
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(parse_paths(b""), ParsedPaths::default());
        assert!(Batch::new(1, peer(), Vec::new()).paths().paths.is_empty());
    }
}
