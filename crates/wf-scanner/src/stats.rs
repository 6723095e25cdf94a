//! Scan statistics with atomic counters.
//!
//! [`ScanStats`] is shared by all scan workers; [`ScanSnapshot`] is the
//! point-in-time copy reported once the scan finishes.
//!
//! All counters use [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering. They are informational and never used for coordination.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters updated by scan workers.
///
/// # Examples
///
/// ```
/// use wf_scanner::ScanStats;
///
/// let stats = ScanStats::new();
/// stats.record_dir_expanded();
/// stats.record_files_matched(3);
///
/// let snap = stats.snapshot();
/// assert_eq!(snap.dirs_expanded, 1);
/// assert_eq!(snap.files_matched, 3);
/// ```
#[derive(Debug, Default)]
pub struct ScanStats {
    /// Directories successfully listed.
    dirs_expanded: AtomicU64,
    /// Subdirectories not descended into because they are too old.
    dirs_pruned: AtomicU64,
    /// Directories that could not be opened or listed.
    dir_errors: AtomicU64,
    /// Regular files newer than the cutoff.
    files_matched: AtomicU64,
    /// Regular files at or before the cutoff.
    files_skipped: AtomicU64,
    /// Entries that could not be inspected (stat failure, non-UTF-8 name).
    entries_unreadable: AtomicU64,
}

impl ScanStats {
    /// Creates a new [`ScanStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a directory that was listed.
    #[inline]
    pub fn record_dir_expanded(&self) {
        self.dirs_expanded.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a subdirectory pruned by the cutoff.
    #[inline]
    pub fn record_dir_pruned(&self) {
        self.dirs_pruned.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a directory that could not be read.
    #[inline]
    pub fn record_dir_error(&self) {
        self.dir_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` matching files.
    #[inline]
    pub fn record_files_matched(&self, count: u64) {
        self.files_matched.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a file excluded by the cutoff.
    #[inline]
    pub fn record_file_skipped(&self) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an entry that could not be inspected.
    #[inline]
    pub fn record_entry_unreadable(&self) {
        self.entries_unreadable.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            dirs_expanded: self.dirs_expanded.load(Ordering::Relaxed),
            dirs_pruned: self.dirs_pruned.load(Ordering::Relaxed),
            dir_errors: self.dir_errors.load(Ordering::Relaxed),
            files_matched: self.files_matched.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            entries_unreadable: self.entries_unreadable.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of [`ScanStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanSnapshot {
    /// Directories successfully listed.
    pub dirs_expanded: u64,
    /// Subdirectories pruned by the cutoff.
    pub dirs_pruned: u64,
    /// Directories that could not be read.
    pub dir_errors: u64,
    /// Regular files newer than the cutoff.
    pub files_matched: u64,
    /// Regular files at or before the cutoff.
    pub files_skipped: u64,
    /// Entries that could not be inspected.
    pub entries_unreadable: u64,
}
