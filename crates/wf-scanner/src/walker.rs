//! Parallel directory traversal with a modification-time cutoff.
//!
//! [`DirectoryScanner`] expands directories on a pool of named worker
//! threads that share one [`Frontier`]. A subdirectory is descended into only
//! if its own modification time is after the cutoff, so an old directory is
//! pruned together with everything below it. Regular files newer than the
//! cutoff are collected.
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use wf_scanner::{Cutoff, DirectoryScanner};
//!
//! let scanner = DirectoryScanner::new(Utf8Path::new("./directory_big"), Cutoff::from_unix_secs(0))?
//!     .with_workers(8);
//! let result = scanner.scan()?;
//! println!("{} files changed", result.files.len());
//! # Ok::<(), wf_scanner::ScanError>(())
//! ```

use std::fs;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::ScanError;
use crate::frontier::Frontier;
use crate::stats::{ScanSnapshot, ScanStats};

/// A modification-time threshold in whole seconds since the Unix epoch.
///
/// Only entries modified strictly after the cutoff are admitted.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
/// use wf_scanner::Cutoff;
///
/// let cutoff = Cutoff::from_unix_secs(1_000);
/// assert!(!cutoff.admits(UNIX_EPOCH + Duration::from_secs(1_000)));
/// // Sub-second precision is ignored.
/// assert!(!cutoff.admits(UNIX_EPOCH + Duration::from_millis(1_000_900)));
/// assert!(cutoff.admits(UNIX_EPOCH + Duration::from_secs(1_001)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cutoff(i64);

impl Cutoff {
    /// Creates a cutoff from seconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_unix_secs(secs: i64) -> Self {
        Self(secs)
    }

    /// Returns the cutoff as seconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_unix_secs(self) -> i64 {
        self.0
    }

    /// Returns `true` if `modified` is strictly after the cutoff.
    #[inline]
    #[must_use]
    pub fn admits(self, modified: SystemTime) -> bool {
        unix_secs(modified) > self.0
    }
}

/// Whole seconds since the epoch, rounded towards negative infinity.
fn unix_secs(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => {
            let before = before.duration();
            let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
            let whole = 0_i64.saturating_sub(secs);
            if before.subsec_nanos() > 0 {
                whole.saturating_sub(1)
            } else {
                whole
            }
        }
    }
}

/// Outcome of a completed scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Regular files modified after the cutoff, in no particular order.
    pub files: Vec<Utf8PathBuf>,
    /// Traversal counters.
    pub stats: ScanSnapshot,
    /// Wall-clock duration of the traversal.
    pub elapsed: Duration,
}

/// A parallel directory scanner.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: Utf8PathBuf,
    cutoff: Cutoff,
    workers: usize,
}

impl DirectoryScanner {
    /// Creates a scanner rooted at `root`.
    ///
    /// The worker count defaults to the available parallelism.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if the root path doesn't exist or
    /// isn't a directory.
    pub fn new(root: &Utf8Path, cutoff: Cutoff) -> Result<Self, ScanError> {
        if !root.exists() {
            return Err(ScanError::config(format!(
                "root path does not exist: {root}"
            )));
        }
        if !root.is_dir() {
            return Err(ScanError::config(format!(
                "root path is not a directory: {root}"
            )));
        }

        Ok(Self {
            root: root.to_owned(),
            cutoff,
            workers: wf_core::default_parallelism(),
        })
    }

    /// Sets the number of worker threads (at least one).
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Returns the root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the configured cutoff.
    #[inline]
    #[must_use]
    pub const fn cutoff(&self) -> Cutoff {
        self.cutoff
    }

    /// Returns the configured worker count.
    #[inline]
    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// Walks the tree and returns every regular file newer than the cutoff.
    ///
    /// The root itself is always expanded. Unreadable directories and
    /// entries are logged, counted, and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Spawn`] if a worker thread cannot be started and
    /// [`ScanError::WorkerPanicked`] if a worker panics.
    pub fn scan(&self) -> Result<ScanResult, ScanError> {
        let start = Instant::now();
        let frontier = Frontier::new(self.root.clone());
        let found = Mutex::new(Vec::new());
        let stats = ScanStats::new();

        info!(
            root = %self.root,
            cutoff = self.cutoff.as_unix_secs(),
            workers = self.workers,
            "Starting scan"
        );

        thread::scope(|scope| -> Result<(), ScanError> {
            let mut handles = Vec::with_capacity(self.workers);
            for id in 0..self.workers {
                let ctx = WorkerContext {
                    id,
                    cutoff: self.cutoff,
                    frontier: &frontier,
                    found: &found,
                    stats: &stats,
                };
                let name = format!("scan-{id}");
                let handle = thread::Builder::new()
                    .name(name.clone())
                    .spawn_scoped(scope, move || ctx.run())
                    .map_err(|source| ScanError::Spawn { name, source })?;
                handles.push((id, handle));
            }

            for (id, handle) in handles {
                handle.join().map_err(|_| ScanError::WorkerPanicked(id))?;
            }
            Ok(())
        })?;

        let files = found.into_inner();
        let elapsed = start.elapsed();
        let stats = stats.snapshot();

        info!(
            files = files.len(),
            dirs = stats.dirs_expanded,
            pruned = stats.dirs_pruned,
            errors = stats.dir_errors,
            elapsed_ms = elapsed.as_millis(),
            "Scan complete"
        );

        Ok(ScanResult {
            files,
            stats,
            elapsed,
        })
    }
}

/// Borrowed state for one scan worker.
struct WorkerContext<'a> {
    id: usize,
    cutoff: Cutoff,
    frontier: &'a Frontier,
    found: &'a Mutex<Vec<Utf8PathBuf>>,
    stats: &'a ScanStats,
}

impl WorkerContext<'_> {
    fn run(&self) {
        debug!(worker = self.id, "Scan worker started");
        while let Some(lease) = self.frontier.next() {
            self.expand(lease.path());
        }
        debug!(worker = self.id, "Scan worker exiting");
    }

    fn expand(&self, dir: &Utf8Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(source) => {
                self.stats.record_dir_error();
                let err = ScanError::read_dir(dir, source);
                warn!(error = %err, "Skipping directory");
                return;
            }
        };
        self.stats.record_dir_expanded();

        let mut matched = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.stats.record_entry_unreadable();
                    debug!(dir = %dir, error = %e, "Failed to read directory entry");
                    continue;
                }
            };

            let path = match Utf8PathBuf::from_path_buf(entry.path()) {
                Ok(path) => path,
                Err(raw) => {
                    self.stats.record_entry_unreadable();
                    warn!(error = %ScanError::NonUtf8Path(raw), "Skipping entry");
                    continue;
                }
            };

            // Follows symlinks, like stat(2).
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    self.stats.record_entry_unreadable();
                    debug!(path = %path, error = %e, "Failed to stat entry");
                    continue;
                }
            };
            let newer = match metadata.modified() {
                Ok(modified) => self.cutoff.admits(modified),
                Err(e) => {
                    self.stats.record_entry_unreadable();
                    debug!(path = %path, error = %e, "No modification time");
                    continue;
                }
            };

            if metadata.is_dir() {
                if newer {
                    trace!(path = %path, "Queueing directory");
                    self.frontier.push(path);
                } else {
                    trace!(path = %path, "Pruning directory");
                    self.stats.record_dir_pruned();
                }
            } else if metadata.is_file() {
                if newer {
                    debug!(path = %path, "Matched file");
                    matched.push(path);
                } else {
                    self.stats.record_file_skipped();
                }
            }
        }

        if !matched.is_empty() {
            self.stats.record_files_matched(matched.len() as u64);
            self.found.lock().append(&mut matched);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use filetime::FileTime;
    use tempfile::TempDir;

    const CUTOFF: i64 = 1_600_000_000;
    const OLD: i64 = CUTOFF - 3_600;
    const NEW: i64 = CUTOFF + 3_600;

    fn set_mtime(path: &Utf8Path, secs: i64) {
        filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
    }

    fn touch(path: &Utf8Path, secs: i64) {
        fs::write(path, b"word").unwrap();
        set_mtime(path, secs);
    }

    fn mkdir(path: &Utf8Path) {
        fs::create_dir(path).unwrap();
    }

    fn utf8_root(dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
    }

    fn scan(root: &Utf8Path, workers: usize) -> ScanResult {
        DirectoryScanner::new(root, Cutoff::from_unix_secs(CUTOFF))
            .unwrap()
            .with_workers(workers)
            .scan()
            .unwrap()
    }

    fn relative(root: &Utf8Path, files: &[Utf8PathBuf]) -> BTreeSet<String> {
        files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string())
            .collect()
    }

    /// Builds:
    ///
    /// ```text
    /// root/            (old, but the root is always expanded)
    ///   top_new.txt    new
    ///   top_old.txt    old
    ///   fresh/         new
    ///     a.txt        new
    ///     b.txt        old
    ///     deeper/      new
    ///       c.txt      new
    ///   stale/         old
    ///     hidden.txt   new (pruned with its parent)
    /// ```
    fn build_tree(root: &Utf8Path) {
        touch(&root.join("top_new.txt"), NEW);
        touch(&root.join("top_old.txt"), OLD);

        let fresh = root.join("fresh");
        mkdir(&fresh);
        touch(&fresh.join("a.txt"), NEW);
        touch(&fresh.join("b.txt"), OLD);
        let deeper = fresh.join("deeper");
        mkdir(&deeper);
        touch(&deeper.join("c.txt"), NEW);
        set_mtime(&deeper, NEW);
        set_mtime(&fresh, NEW);

        let stale = root.join("stale");
        mkdir(&stale);
        touch(&stale.join("hidden.txt"), NEW);
        set_mtime(&stale, OLD);

        set_mtime(root, OLD);
    }

    #[test]
    fn test_cutoff_is_strict_and_whole_seconds() {
        let cutoff = Cutoff::from_unix_secs(CUTOFF);
        let at = UNIX_EPOCH + Duration::from_secs(CUTOFF as u64);
        assert!(!cutoff.admits(at));
        assert!(!cutoff.admits(at + Duration::from_millis(999)));
        assert!(cutoff.admits(at + Duration::from_secs(1)));
    }

    #[test]
    fn test_unix_secs_before_epoch_rounds_down() {
        assert_eq!(unix_secs(UNIX_EPOCH - Duration::from_millis(500)), -1);
        assert_eq!(unix_secs(UNIX_EPOCH - Duration::from_secs(2)), -2);
        assert!(Cutoff::from_unix_secs(-2).admits(UNIX_EPOCH - Duration::from_millis(500)));
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let err = DirectoryScanner::new(
            Utf8Path::new("/nonexistent/wordfleet/root"),
            Cutoff::from_unix_secs(0),
        )
        .unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn test_new_rejects_file_root() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        let file = root.join("file.txt");
        touch(&file, NEW);
        let err = DirectoryScanner::new(&file, Cutoff::from_unix_secs(0)).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn test_with_workers_clamps_to_one() {
        let dir = TempDir::new().unwrap();
        let scanner = DirectoryScanner::new(&utf8_root(&dir), Cutoff::from_unix_secs(0))
            .unwrap()
            .with_workers(0);
        assert_eq!(scanner.workers(), 1);
    }

    #[test]
    fn test_old_directories_are_pruned() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        build_tree(&root);

        let result = scan(&root, 4);
        let expected: BTreeSet<String> = ["top_new.txt", "fresh/a.txt", "fresh/deeper/c.txt"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(relative(&root, &result.files), expected);

        assert_eq!(result.stats.files_matched, 3);
        assert_eq!(result.stats.files_skipped, 2);
        assert_eq!(result.stats.dirs_pruned, 1);
        // root, fresh, deeper
        assert_eq!(result.stats.dirs_expanded, 3);
        assert_eq!(result.stats.dir_errors, 0);
    }

    #[test]
    fn test_result_independent_of_worker_count() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        for d in 0..6 {
            let sub = root.join(format!("d{d}"));
            mkdir(&sub);
            for f in 0..5 {
                touch(&sub.join(format!("f{f}.txt")), NEW);
            }
            set_mtime(&sub, NEW);
        }

        let single = relative(&root, &scan(&root, 1).files);
        let many = relative(&root, &scan(&root, 8).files);
        assert_eq!(single.len(), 30);
        assert_eq!(single, many);
    }

    #[test]
    fn test_empty_root() {
        let dir = TempDir::new().unwrap();
        let result = scan(&utf8_root(&dir), 3);
        assert!(result.files.is_empty());
        assert_eq!(result.stats.dirs_expanded, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_is_followed() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        let target = root.join("target.txt");
        touch(&target, NEW);
        std::os::unix::fs::symlink(&target, root.join("link.txt")).unwrap();

        let found = relative(&root, &scan(&root, 2).files);
        assert!(found.contains("target.txt"));
        assert!(found.contains("link.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        touch(&root.join("sibling.txt"), NEW);
        let open = root.join("open");
        mkdir(&open);
        touch(&open.join("visible.txt"), NEW);
        set_mtime(&open, NEW);
        let locked = root.join("locked");
        mkdir(&locked);
        touch(&locked.join("secret.txt"), NEW);
        set_mtime(&locked, NEW);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged users bypass directory permissions.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }
        let result = scan(&root, 2);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let found = relative(&root, &result.files);
        assert!(found.contains("sibling.txt"));
        assert!(found.contains("open/visible.txt"));
        assert!(!found.contains("locked/secret.txt"));
        assert_eq!(result.stats.dir_errors, 1);
        assert_eq!(result.stats.dirs_expanded, 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_counted_unreadable() {
        let dir = TempDir::new().unwrap();
        let root = utf8_root(&dir);
        std::os::unix::fs::symlink(root.join("missing"), root.join("dangling")).unwrap();

        let result = scan(&root, 2);
        assert!(result.files.is_empty());
        assert_eq!(result.stats.entries_unreadable, 1);
    }
}
