//! Memory-mapped word tokenization.
//!
//! A word is a maximal run of ASCII alphanumeric bytes. Every other byte,
//! including punctuation, whitespace, and any byte of a multi-byte UTF-8
//! sequence, ends the current run. There is no case folding, so `Fox` and
//! `fox` are different words.
//!
//! [`count_file`] maps the file read-only and scans the mapping once. The map
//! and the descriptor are owned by locals of that call and released when it
//! returns, on the error paths as well.
//!
//! # Examples
//!
//! ```
//! use wf_core::tokenize;
//!
//! let counts = tokenize(b"ab,,cd ef");
//! assert_eq!(counts.len(), 3);
//! assert_eq!(counts.get("ab"), 1);
//! assert_eq!(counts.get("cd"), 1);
//! assert_eq!(counts.get("ef"), 1);
//! ```

use std::fs::File;
use std::io;

use camino::Utf8Path;
use memmap2::Mmap;
use tracing::trace;

use crate::count::WordCount;
use crate::error::CountError;

/// Iterates over the words of `bytes` in order of appearance.
pub fn words(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes
        .split(|b| !b.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
}

/// Counts the words of an in-memory buffer.
#[must_use]
pub fn tokenize(bytes: &[u8]) -> WordCount {
    let mut counts = WordCount::new();
    for word in words(bytes) {
        // Words are pure ASCII, so this never allocates a replacement.
        counts.increment(&String::from_utf8_lossy(word));
    }
    counts
}

/// Counts the words of the file at `path` through a read-only memory map.
///
/// A zero-length file yields an empty table without being mapped.
///
/// # Errors
///
/// Returns a [`CountError`] if the file cannot be opened, its metadata
/// cannot be read, it is not a regular file, or the mapping fails.
pub fn count_file(path: &Utf8Path) -> Result<WordCount, CountError> {
    let file = File::open(path.as_std_path()).map_err(|e| CountError::open(path, e))?;
    let metadata = file.metadata().map_err(|e| CountError::stat(path, e))?;

    if !metadata.is_file() {
        return Err(CountError::NotAFile(path.to_owned()));
    }

    if metadata.len() == 0 {
        trace!(path = %path, "Empty file");
        return Ok(WordCount::new());
    }

    let map = map_readonly(&file).map_err(|e| CountError::map(path, e))?;
    let counts = tokenize(&map);
    trace!(path = %path, bytes = map.len(), words = counts.total(), "Counted file");
    Ok(counts)
}

#[allow(unsafe_code)]
fn map_readonly(file: &File) -> io::Result<Mmap> {
    // SAFETY: the map is read-only and dropped before `count_file` returns.
    // A concurrent truncation by another process can still fault the read;
    // inputs are files the scanner found, not files this process writes.
    unsafe { Mmap::map(file) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> Utf8PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        Utf8PathBuf::try_from(path).unwrap()
    }

    #[test]
    fn test_punctuation_breaks_words() {
        let counts = tokenize(b"ab,,cd ef");
        assert_eq!(counts.len(), 3);
        assert_eq!(counts.get("ab"), 1);
        assert_eq!(counts.get("cd"), 1);
        assert_eq!(counts.get("ef"), 1);
    }

    #[test]
    fn test_case_sensitive_and_repeated() {
        let counts = tokenize(b"The the THE the\n");
        assert_eq!(counts.get("the"), 2);
        assert_eq!(counts.get("The"), 1);
        assert_eq!(counts.get("THE"), 1);
    }

    #[test]
    fn test_digits_are_word_bytes() {
        let counts = tokenize(b"file_42.txt 42");
        assert_eq!(counts.get("file"), 1);
        assert_eq!(counts.get("42"), 2);
        assert_eq!(counts.get("txt"), 1);
    }

    #[test]
    fn test_non_ascii_bytes_are_delimiters() {
        // "who’s" with a curly apostrophe (three UTF-8 bytes).
        let counts = tokenize("who\u{2019}s caf\u{e9}".as_bytes());
        assert_eq!(counts.get("who"), 1);
        assert_eq!(counts.get("s"), 1);
        assert_eq!(counts.get("caf"), 1);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_empty_and_delimiter_only_input() {
        assert!(tokenize(b"").is_empty());
        assert!(tokenize(b" ,.;\n\t").is_empty());
    }

    #[test]
    fn test_word_at_end_of_data_is_counted() {
        let counts = tokenize(b"end");
        assert_eq!(counts.get("end"), 1);
    }

    #[test]
    fn test_count_file_matches_in_memory() {
        let dir = TempDir::new().unwrap();
        let text = b"The quick brown fox, the lazy dog.\nThe end";
        let path = write_file(&dir, "a.txt", text);
        assert_eq!(count_file(&path).unwrap(), tokenize(text));
    }

    #[test]
    fn test_count_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "empty.txt", b"");
        assert!(count_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_count_missing_file() {
        let err = count_file(Utf8Path::new("/nonexistent/wordfleet/file.txt")).unwrap_err();
        assert!(matches!(err, CountError::Open { .. }));
    }

    #[test]
    fn test_count_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let err = count_file(&path).unwrap_err();
        assert!(matches!(err, CountError::NotAFile(_)));
    }
}
