//! Mapper workers: batch-level and file-level parallelism.
//!
//! Each of the `N` mapper threads takes one [`Batch`] at a time from the
//! [`JobQueue`]. The files of a batch are counted on a rayon pool shared by
//! all mappers, so the total number of concurrent file tasks stays bounded
//! by that pool. Per-file tables are folded inside each rayon task and
//! reduced once per batch; the batch total is then sent to the aggregator.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use camino::Utf8PathBuf;
use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};
use wf_core::{WordCount, count_file};

use crate::aggregator::AggregatorHandle;
use crate::batch::Batch;
use crate::error::ServiceError;
use crate::queue::JobQueue;
use crate::stats::ServiceStats;

/// Word counts of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchCount {
    /// Merged counts of every readable file.
    pub counts: WordCount,
    /// Files that could not be opened, stat'ed, or mapped.
    pub failed: u64,
}

impl BatchCount {
    fn merged(self, other: Self) -> Self {
        Self {
            counts: self.counts.merged(other.counts),
            failed: self.failed + other.failed,
        }
    }
}

/// Counts `paths` on the current rayon pool.
///
/// A file that cannot be counted is logged and contributes nothing.
pub fn count_paths(paths: &[Utf8PathBuf]) -> BatchCount {
    paths
        .par_iter()
        .map(|path| match count_file(path) {
            Ok(counts) => BatchCount { counts, failed: 0 },
            Err(e) => {
                warn!(error = %e, "Skipping file");
                BatchCount {
                    counts: WordCount::new(),
                    failed: 1,
                }
            }
        })
        .reduce(BatchCount::default, BatchCount::merged)
}

/// Everything a mapper thread needs.
struct MapperContext {
    id: usize,
    queue: Arc<JobQueue>,
    inner: Arc<ThreadPool>,
    aggregator: AggregatorHandle,
    stats: Arc<ServiceStats>,
}

impl MapperContext {
    fn run(self) {
        info!(worker = self.id, "Mapper started");
        while let Some(batch) = self.queue.pop() {
            if let Err(e) = self.process(&batch) {
                error!(worker = self.id, batch = batch.id(), error = %e, "Mapper stopping");
                break;
            }
        }
        info!(worker = self.id, "Mapper exiting");
    }

    fn process(&self, batch: &Batch) -> Result<(), ServiceError> {
        let start = Instant::now();
        let parsed = batch.paths();
        if parsed.invalid > 0 {
            warn!(
                batch = batch.id(),
                lines = parsed.invalid,
                "Skipping lines that are not UTF-8"
            );
        }

        let result = self.inner.install(|| count_paths(&parsed.paths));
        self.stats.record_batch_processed(
            parsed.paths.len() as u64,
            result.failed,
            parsed.invalid as u64,
        );
        debug!(
            batch = batch.id(),
            distinct = result.counts.len(),
            "Submitting batch result"
        );
        self.aggregator.submit(result.counts)?;

        info!(
            worker = self.id,
            batch = batch.id(),
            peer = %batch.peer(),
            files = parsed.paths.len(),
            failed = result.failed,
            elapsed_ms = start.elapsed().as_millis(),
            "Batch processed"
        );
        Ok(())
    }
}

/// A fixed set of named mapper threads.
#[derive(Debug)]
pub struct MapperPool {
    workers: Vec<(String, JoinHandle<()>)>,
}

impl MapperPool {
    /// Starts `workers` mapper threads consuming from `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Spawn`] if a thread cannot be started. The
    /// queue is then shut down and the threads already started are joined.
    pub fn spawn(
        workers: usize,
        queue: &Arc<JobQueue>,
        inner: &Arc<ThreadPool>,
        aggregator: &AggregatorHandle,
        stats: &Arc<ServiceStats>,
    ) -> Result<Self, ServiceError> {
        let mut pool = Self {
            workers: Vec::with_capacity(workers),
        };

        for id in 0..workers {
            let name = format!("mapper-{id}");
            let ctx = MapperContext {
                id,
                queue: Arc::clone(queue),
                inner: Arc::clone(inner),
                aggregator: aggregator.clone(),
                stats: Arc::clone(stats),
            };
            match thread::Builder::new()
                .name(name.clone())
                .spawn(move || ctx.run())
            {
                Ok(handle) => pool.workers.push((name, handle)),
                Err(source) => {
                    queue.shutdown();
                    // Already failing; a panic in a started worker is secondary.
                    let _ = pool.join();
                    return Err(ServiceError::spawn(name, source));
                }
            }
        }

        Ok(pool)
    }

    /// Returns the number of mapper threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns `true` if the pool has no threads.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Waits for every mapper to exit.
    ///
    /// Mappers exit once the queue is shut down and drained, so shut the
    /// queue down first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::WorkerPanicked`] for the first mapper that
    /// panicked; the remaining mappers are still joined.
    pub fn join(self) -> Result<(), ServiceError> {
        let mut first_error = None;
        for (name, handle) in self.workers {
            if handle.join().is_err() {
                error!(worker = %name, "Mapper panicked");
                first_error.get_or_insert(ServiceError::WorkerPanicked(name));
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
