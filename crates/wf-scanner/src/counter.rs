//! Local, cache-aware word counting of scanned files.
//!
//! [`LocalCounter`] counts a set of paths on a dedicated rayon pool. Each
//! path is looked up in the shared [`ResultCache`] first; on a miss the file
//! is tokenized and the result inserted. Per-file tables are folded per rayon
//! task and reduced into one total.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};
use wf_core::{WordCount, count_file};

use crate::cache::ResultCache;
use crate::error::ScanError;

/// Outcome of [`LocalCounter::count`].
#[derive(Debug, Clone)]
pub struct LocalCount {
    /// Merged word counts of every path.
    pub counts: WordCount,
    /// Number of paths processed.
    pub files: usize,
    /// Paths served from the cache.
    pub cache_hits: u64,
    /// Paths that could not be counted and contributed nothing.
    pub failed: u64,
    /// Wall-clock duration of the count.
    pub elapsed: Duration,
}

/// Counts files in parallel, consulting a [`ResultCache`].
#[derive(Debug)]
pub struct LocalCounter {
    cache: Arc<ResultCache>,
    pool: ThreadPool,
}

impl LocalCounter {
    /// Creates a counter backed by `threads` worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ThreadPool`] if the pool cannot be built.
    pub fn new(cache: Arc<ResultCache>, threads: usize) -> Result<Self, ScanError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("count-{i}"))
            .build()?;
        Ok(Self { cache, pool })
    }

    /// Returns the shared cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Counts every path and merges the results.
    ///
    /// Files that cannot be opened, stat'ed, or mapped are logged and
    /// contribute nothing.
    pub fn count(&self, paths: &[Utf8PathBuf]) -> LocalCount {
        let start = Instant::now();
        let hits_before = self.cache.hits();
        let failed = AtomicU64::new(0);

        let counts = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| self.count_one(path, &failed))
                .reduce(WordCount::new, WordCount::merged)
        });

        let result = LocalCount {
            counts,
            files: paths.len(),
            cache_hits: self.cache.hits() - hits_before,
            failed: failed.into_inner(),
            elapsed: start.elapsed(),
        };

        info!(
            files = result.files,
            cache_hits = result.cache_hits,
            failed = result.failed,
            words = result.counts.len(),
            elapsed_ms = result.elapsed.as_millis(),
            "Local count complete"
        );
        result
    }

    fn count_one(&self, path: &Utf8Path, failed: &AtomicU64) -> WordCount {
        self.count_cached(path).unwrap_or_else(|err| {
            failed.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, "Skipping file");
            WordCount::new()
        })
    }

    /// Returns the cached counts for `path`, tokenizing and caching on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Count`] if the file cannot be counted. Nothing is
    /// cached for it.
    pub fn count_cached(&self, path: &Utf8Path) -> Result<WordCount, ScanError> {
        if let Some(counts) = self.cache.lookup(path) {
            debug!(path = %path, "Cache hit");
            return Ok(counts);
        }

        let counts = count_file(path)?;
        self.cache.insert(path, counts.clone());
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::TempDir;
    use wf_core::tokenize;

    fn write(dir: &Utf8Path, name: &str, text: &str) -> Utf8PathBuf {
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        (dir, root)
    }

    #[test]
    fn test_count_matches_reference() {
        let (_dir, root) = temp_root();
        let texts = ["the fox", "the dog, the end", "", "Fox fox"];
        let paths: Vec<_> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| write(&root, &format!("{i}.txt"), t))
            .collect();

        let mut expected = WordCount::new();
        for text in texts {
            expected.merge(&tokenize(text.as_bytes()));
        }

        let counter = LocalCounter::new(Arc::new(ResultCache::default()), 3).unwrap();
        let result = counter.count(&paths);
        assert_eq!(result.counts, expected);
        assert_eq!(result.files, 4);
        assert_eq!(result.failed, 0);
        assert_eq!(result.cache_hits, 0);
    }

    #[test]
    fn test_second_count_uses_cache() {
        let (_dir, root) = temp_root();
        let path = write(&root, "a.txt", "one two two");

        let cache = Arc::new(ResultCache::default());
        let counter = LocalCounter::new(Arc::clone(&cache), 2).unwrap();
        let first = counter.count(std::slice::from_ref(&path));
        assert_eq!(first.cache_hits, 0);
        assert!(cache.contains(&path));

        // Cached value wins even after the file changes.
        fs::write(&path, "three").unwrap();
        let second = counter.count(std::slice::from_ref(&path));
        assert_eq!(second.cache_hits, 1);
        assert_eq!(second.counts.get("two"), 2);
        assert_eq!(second.counts.get("three"), 0);
    }

    #[test]
    fn test_missing_file_contributes_zero() {
        let (_dir, root) = temp_root();
        let good = write(&root, "good.txt", "alpha beta");
        let missing = root.join("missing.txt");

        let cache = Arc::new(ResultCache::default());
        let counter = LocalCounter::new(Arc::clone(&cache), 2).unwrap();
        let result = counter.count(&[good, missing.clone()]);
        assert_eq!(result.failed, 1);
        assert_eq!(result.counts.total(), 2);
        assert!(!cache.contains(&missing));
    }

    #[test]
    fn test_count_cached_reports_count_error() {
        let (_dir, root) = temp_root();
        let missing = root.join("gone.txt");
        let counter = LocalCounter::new(Arc::new(ResultCache::with_capacity(4)), 1).unwrap();

        let err = counter.count_cached(&missing).unwrap_err();
        assert!(matches!(err, ScanError::Count(_)));
        assert!(err.is_recoverable());
        assert_eq!(err.path(), Some(&missing));
        assert!(!counter.cache().contains(&missing));
    }

    #[test]
    fn test_duplicate_paths_count_twice() {
        let (_dir, root) = temp_root();
        let path = write(&root, "dup.txt", "word");
        let counter = LocalCounter::new(Arc::new(ResultCache::default()), 2).unwrap();
        let result = counter.count(&[path.clone(), path.clone(), path]);
        assert_eq!(result.counts.get("word"), 3);
    }

    #[test]
    fn test_empty_input() {
        let counter = LocalCounter::new(Arc::new(ResultCache::default()), 1).unwrap();
        let result = counter.count(&[]);
        assert!(result.counts.is_empty());
        assert_eq!(result.files, 0);
    }
}
