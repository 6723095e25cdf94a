//! Bounded least-recently-used cache of per-file word counts.
//!
//! This module provides [`ResultCache`], a thread-safe LRU keyed by file
//! path. The recency list and the map live inside one [`LruCache`] behind a
//! single [`Mutex`], so every operation is O(1) amortized and atomic.
//!
//! # Access Pattern
//!
//! - **Clones data** on [`lookup()`](ResultCache::lookup); no guard escapes
//! - **First write wins**: inserting an existing key changes nothing
//! - **Hits promote**: a successful lookup makes the entry most recent
//!
//! # Examples
//!
//! ```
//! use std::num::NonZeroUsize;
//! use camino::Utf8Path;
//! use wf_core::WordCount;
//! use wf_scanner::ResultCache;
//!
//! let cache = ResultCache::new(NonZeroUsize::new(2).unwrap());
//! let mut counts = WordCount::new();
//! counts.add("fox", 3);
//!
//! assert!(cache.insert(Utf8Path::new("a.txt"), counts));
//! assert_eq!(cache.lookup(Utf8Path::new("a.txt")).unwrap().get("fox"), 3);
//! assert!(cache.lookup(Utf8Path::new("b.txt")).is_none());
//! assert_eq!((cache.hits(), cache.misses()), (1, 1));
//! ```

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;
use wf_core::{DEFAULT_CACHE_CAPACITY, WordCount};

/// A thread-safe, fixed-capacity LRU cache of [`WordCount`] results.
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<LruCache<Utf8PathBuf, WordCount>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Creates an empty cache holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates an empty cache, treating a zero capacity as one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN))
    }

    /// Returns a clone of the cached counts for `path`, if present.
    ///
    /// A hit moves the entry to the most-recently-used position.
    pub fn lookup(&self, path: &Utf8Path) -> Option<WordCount> {
        let found = self.entries.lock().get(path).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Caches `counts` for `path` unless an entry already exists.
    ///
    /// At capacity, the least-recently-used entry is evicted first.
    /// Returns `true` if the entry was inserted.
    pub fn insert(&self, path: &Utf8Path, counts: WordCount) -> bool {
        let mut entries = self.entries.lock();
        if entries.contains(path) {
            return false;
        }
        if let Some((evicted, _)) = entries.push(path.to_owned(), counts) {
            trace!(path = %evicted, "Evicted cache entry");
        }
        true
    }

    /// Returns `true` if `path` is cached, without touching its recency.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path) -> bool {
        self.entries.lock().contains(path)
    }

    /// Returns the number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> NonZeroUsize {
        self.entries.lock().cap()
    }

    /// Removes every entry. Hit and miss counters are kept.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns the number of successful lookups.
    #[inline]
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of failed lookups.
    #[inline]
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}
