//! Service statistics with atomic counters.
//!
//! All counters use [`Relaxed`](std::sync::atomic::Ordering::Relaxed)
//! ordering; they are for reporting only.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Atomic counters shared by the listener, mappers, and aggregator.
///
/// # Examples
///
/// ```
/// use wf_service::ServiceStats;
///
/// let stats = ServiceStats::new();
/// assert_eq!(stats.record_connection(), 1);
/// stats.record_batch_enqueued();
///
/// let snap = stats.snapshot();
/// assert_eq!(snap.connections, 1);
/// assert_eq!(snap.batches_enqueued, 1);
/// ```
#[derive(Debug, Default)]
pub struct ServiceStats {
    connections: AtomicU64,
    batches_enqueued: AtomicU64,
    batches_dropped: AtomicU64,
    batches_processed: AtomicU64,
    batches_merged: AtomicU64,
    files_counted: AtomicU64,
    files_failed: AtomicU64,
    lines_invalid: AtomicU64,
}

impl ServiceStats {
    /// Creates a new [`ServiceStats`] with all counters at zero.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted connection and returns its 1-based id.
    #[inline]
    pub fn record_connection(&self) -> u64 {
        self.connections.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Records a batch pushed onto the job queue.
    #[inline]
    pub fn record_batch_enqueued(&self) {
        self.batches_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a payload that was empty or unreadable.
    #[inline]
    pub fn record_batch_dropped(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a batch counted by a mapper.
    #[inline]
    pub fn record_batch_processed(&self, files: u64, failed: u64, invalid_lines: u64) {
        self.batches_processed.fetch_add(1, Ordering::Relaxed);
        self.files_counted.fetch_add(files, Ordering::Relaxed);
        self.files_failed.fetch_add(failed, Ordering::Relaxed);
        self.lines_invalid.fetch_add(invalid_lines, Ordering::Relaxed);
    }

    /// Records a batch result merged into the global count.
    #[inline]
    pub fn record_batch_merged(&self) {
        self.batches_merged.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of batches enqueued so far.
    #[inline]
    #[must_use]
    pub fn batches_enqueued(&self) -> u64 {
        self.batches_enqueued.load(Ordering::Relaxed)
    }

    /// Returns the number of batches merged so far.
    #[inline]
    #[must_use]
    pub fn batches_merged(&self) -> u64 {
        self.batches_merged.load(Ordering::Relaxed)
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            connections: self.connections.load(Ordering::Relaxed),
            batches_enqueued: self.batches_enqueued.load(Ordering::Relaxed),
            batches_dropped: self.batches_dropped.load(Ordering::Relaxed),
            batches_processed: self.batches_processed.load(Ordering::Relaxed),
            batches_merged: self.batches_merged.load(Ordering::Relaxed),
            files_counted: self.files_counted.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            lines_invalid: self.lines_invalid.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of [`ServiceStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    /// Connections accepted.
    pub connections: u64,
    /// Non-empty batches pushed onto the job queue.
    pub batches_enqueued: u64,
    /// Payloads dropped because they were empty or unreadable.
    pub batches_dropped: u64,
    /// Batches counted by a mapper.
    pub batches_processed: u64,
    /// Batch results merged into the global count.
    pub batches_merged: u64,
    /// Paths handed to the tokenizer (including failures).
    pub files_counted: u64,
    /// Paths that could not be opened, stat'ed, or mapped.
    pub files_failed: u64,
    /// Payload lines skipped because they were not UTF-8.
    pub lines_invalid: u64,
}
