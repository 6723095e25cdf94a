//! Scanning agent for wordfleet.
//!
//! This crate finds files modified after a cutoff and either sends their
//! paths to a counting service or counts them locally.
//!
//! # Overview
//!
//! The main entry point is [`ScanAgent`], which combines:
//!
//! - [`DirectoryScanner`]: Parallel traversal over a shared [`Frontier`]
//! - [`ResultCache`]: Bounded LRU of per-file word counts
//! - [`LocalCounter`]: Cache-aware parallel counting on a rayon pool
//! - [`Dispatcher`]: One newline-framed batch per TCP connection
//! - [`ScanStats`]: Atomic counters for the traversal
//!
//! # Example
//!
//! ```no_run
//! use wf_core::ScanConfig;
//! use wf_scanner::{Cutoff, ScanAgent};
//!
//! # async fn run() -> Result<(), wf_scanner::ScanError> {
//! let agent = ScanAgent::new(ScanConfig::default(), Cutoff::from_unix_secs(1_700_000_000))?;
//! let result = agent.scan()?;
//! let report = agent.dispatch(&result.files).await?;
//! println!("sent {} paths", report.paths);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ScanAgent
//!     │
//!     ├── DirectoryScanner (named std threads)
//!     │       │
//!     │       └── Frontier (Mutex<VecDeque> + Condvar, in-flight tracking)
//!     │
//!     ├── LocalCounter (rayon pool)
//!     │       │
//!     │       └── ResultCache (Mutex<LruCache>)
//!     │
//!     └── Dispatcher (tokio TcpStream)
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod cache;
mod counter;
mod dispatch;
mod error;
mod frontier;
mod stats;
mod walker;

pub use cache::ResultCache;
pub use counter::{LocalCount, LocalCounter};
pub use dispatch::{DispatchReport, Dispatcher, EncodedBatch, encode_batch};
pub use error::ScanError;
pub use frontier::{DirLease, Frontier};
pub use stats::{ScanSnapshot, ScanStats};
pub use walker::{Cutoff, DirectoryScanner, ScanResult};

use std::sync::Arc;

use camino::Utf8PathBuf;
use tracing::info;
use wf_core::ScanConfig;

/// The scanning agent: traversal plus either dispatch or local counting.
///
/// # Cloning
///
/// `ScanAgent` is cheaply cloneable. Clones share the same result cache,
/// so an agent can be moved into `spawn_blocking` for the traversal while
/// the caller keeps a handle for dispatch.
#[derive(Debug, Clone)]
pub struct ScanAgent {
    config: ScanConfig,
    scanner: DirectoryScanner,
    cache: Arc<ResultCache>,
}

impl ScanAgent {
    /// Creates an agent from its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] if the root is not an existing directory
    /// or the cache capacity is zero.
    pub fn new(config: ScanConfig, cutoff: Cutoff) -> Result<Self, ScanError> {
        if config.cache_capacity == 0 {
            return Err(ScanError::config("cache capacity must be at least 1"));
        }

        let scanner =
            DirectoryScanner::new(&config.root, cutoff)?.with_workers(config.resolved_workers());
        let cache = Arc::new(ResultCache::with_capacity(config.cache_capacity));

        info!(
            root = %config.root,
            server = %config.server_addr,
            workers = scanner.workers(),
            cache_capacity = config.cache_capacity,
            "Creating scan agent"
        );

        Ok(Self {
            config,
            scanner,
            cache,
        })
    }

    /// Runs the parallel traversal.
    ///
    /// # Errors
    ///
    /// See [`DirectoryScanner::scan`].
    pub fn scan(&self) -> Result<ScanResult, ScanError> {
        self.scanner.scan()
    }

    /// Counts `files` locally, consulting and filling the result cache.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ThreadPool`] if the counting pool cannot be built.
    pub fn count_locally(&self, files: &[Utf8PathBuf]) -> Result<LocalCount, ScanError> {
        let counter = LocalCounter::new(Arc::clone(&self.cache), self.scanner.workers())?;
        Ok(counter.count(files))
    }

    /// Sends `files` to the configured counting service as one batch.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::dispatch`].
    pub async fn dispatch(&self, files: &[Utf8PathBuf]) -> Result<DispatchReport, ScanError> {
        Dispatcher::new(self.config.server_addr).dispatch(files).await
    }

    /// Returns the shared result cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Returns the agent configuration.
    #[must_use]
    pub const fn config(&self) -> &ScanConfig {
        &self.config
    }
}
