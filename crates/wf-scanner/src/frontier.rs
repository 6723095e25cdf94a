//! Shared queue of directories pending expansion.
//!
//! The [`Frontier`] tracks both queued directories and directories that a
//! worker is currently expanding. Completion is raised only when the queue is
//! empty *and* nothing is in flight, because an in-flight expansion may still
//! push new subdirectories.
//!
//! Each dequeued directory is handed out as a [`DirLease`]. Dropping the
//! lease marks the expansion finished, including when the worker unwinds.

use std::collections::VecDeque;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct FrontierState {
    pending: VecDeque<Utf8PathBuf>,
    in_flight: usize,
    complete: bool,
}

/// Work queue of directories shared by all scan workers.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use wf_scanner::Frontier;
///
/// let frontier = Frontier::new(Utf8PathBuf::from("root"));
/// {
///     let lease = frontier.next().unwrap();
///     assert_eq!(lease.path().as_str(), "root");
///     frontier.push(Utf8PathBuf::from("root/sub"));
/// }
/// let lease = frontier.next().unwrap();
/// assert_eq!(lease.path().as_str(), "root/sub");
/// drop(lease);
///
/// assert!(frontier.is_complete());
/// assert!(frontier.next().is_none());
/// ```
#[derive(Debug)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    available: Condvar,
}

impl Frontier {
    /// Creates a frontier seeded with `root`.
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        let mut pending = VecDeque::new();
        pending.push_back(root);
        Self {
            state: Mutex::new(FrontierState {
                pending,
                in_flight: 0,
                complete: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Queues a directory for expansion and wakes one waiting worker.
    ///
    /// Call this only while holding a [`DirLease`]; once the frontier is
    /// complete, workers have exited and nothing would pick the entry up.
    pub fn push(&self, dir: Utf8PathBuf) {
        let mut state = self.state.lock();
        debug_assert!(!state.complete, "push after frontier completion");
        state.pending.push_back(dir);
        drop(state);
        self.available.notify_one();
    }

    /// Blocks until a directory is available or the scan is complete.
    ///
    /// Returns `None` once the frontier is empty and no directory is being
    /// expanded.
    pub fn next(&self) -> Option<DirLease<'_>> {
        let mut state = self.state.lock();
        loop {
            if let Some(dir) = state.pending.pop_front() {
                state.in_flight += 1;
                return Some(DirLease {
                    frontier: self,
                    dir,
                });
            }
            if state.complete {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Returns `true` once every directory has been expanded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state.lock().complete
    }

    /// Returns the number of directories waiting to be expanded.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 && state.pending.is_empty() {
            state.complete = true;
            drop(state);
            self.available.notify_all();
        }
    }
}

/// A directory checked out of the [`Frontier`] for expansion.
#[derive(Debug)]
pub struct DirLease<'a> {
    frontier: &'a Frontier,
    dir: Utf8PathBuf,
}

impl DirLease<'_> {
    /// Returns the directory to expand.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.dir
    }
}

impl Drop for DirLease<'_> {
    fn drop(&mut self) {
        self.frontier.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_root_is_first_lease() {
        let frontier = Frontier::new(Utf8PathBuf::from("root"));
        assert_eq!(frontier.pending(), 1);
        let lease = frontier.next().unwrap();
        assert_eq!(lease.path().as_str(), "root");
        assert!(!frontier.is_complete());
    }

    #[test]
    fn test_completes_after_last_lease_dropped() {
        let frontier = Frontier::new(Utf8PathBuf::from("root"));
        let lease = frontier.next().unwrap();
        assert!(!frontier.is_complete());
        drop(lease);
        assert!(frontier.is_complete());
        assert!(frontier.next().is_none());
    }

    #[test]
    fn test_push_during_lease_defers_completion() {
        let frontier = Frontier::new(Utf8PathBuf::from("a"));
        let a = frontier.next().unwrap();
        frontier.push(Utf8PathBuf::from("a/b"));
        frontier.push(Utf8PathBuf::from("a/c"));
        drop(a);
        assert!(!frontier.is_complete());

        let b = frontier.next().unwrap();
        let c = frontier.next().unwrap();
        assert_eq!(b.path().as_str(), "a/b");
        assert_eq!(c.path().as_str(), "a/c");
        drop(b);
        assert!(!frontier.is_complete());
        drop(c);
        assert!(frontier.is_complete());
    }

    #[test]
    fn test_waiting_workers_are_released() {
        // A synthetic tree: each directory at depth < 4 has three children.
        let frontier = Frontier::new(Utf8PathBuf::from("0"));
        let expanded = AtomicUsize::new(0);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    while let Some(lease) = frontier.next() {
                        expanded.fetch_add(1, Ordering::Relaxed);
                        let depth = lease.path().as_str().matches('/').count();
                        if depth < 4 {
                            for child in 0..3 {
                                frontier.push(lease.path().join(child.to_string()));
                            }
                        }
                    }
                });
            }
        });

        // 1 + 3 + 9 + 27 + 81
        assert_eq!(expanded.load(Ordering::Relaxed), 121);
        assert!(frontier.is_complete());
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_panicking_worker_still_releases_lease() {
        let frontier = Frontier::new(Utf8PathBuf::from("root"));
        let result = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _lease = frontier.next();
                    panic!("worker failed");
                })
                .join()
        });
        assert!(result.is_err());
        assert!(frontier.is_complete());
    }
}
