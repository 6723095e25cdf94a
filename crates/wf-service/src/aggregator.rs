//! Global word-count aggregation.
//!
//! One dedicated thread owns the global [`WordCount`]. Mappers send their
//! batch-local tables over an unbounded channel through an
//! [`AggregatorHandle`]; the thread merges them in arrival order. Merging is
//! additive, so the final table does not depend on that order.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, info};
use wf_core::WordCount;

use crate::error::ServiceError;
use crate::stats::ServiceStats;

const THREAD_NAME: &str = "aggregator";

/// Sending side of the aggregator, cloned into every mapper.
#[derive(Debug, Clone)]
pub struct AggregatorHandle {
    tx: mpsc::UnboundedSender<WordCount>,
}

impl AggregatorHandle {
    /// Submits a batch-local table for merging.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::AggregatorClosed`] if the aggregator thread
    /// has stopped.
    pub fn submit(&self, counts: WordCount) -> Result<(), ServiceError> {
        self.tx
            .send(counts)
            .map_err(|_| ServiceError::AggregatorClosed)
    }
}

/// Owner of the aggregating thread.
#[derive(Debug)]
pub struct Aggregator {
    handle: AggregatorHandle,
    thread: JoinHandle<WordCount>,
}

impl Aggregator {
    /// Starts the aggregating thread.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Spawn`] if the thread cannot be started.
    pub fn spawn(stats: Arc<ServiceStats>) -> Result<Self, ServiceError> {
        let (tx, mut rx) = mpsc::unbounded_channel::<WordCount>();

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || {
                let mut global = WordCount::new();
                while let Some(counts) = rx.blocking_recv() {
                    debug!(words = counts.len(), "Merging batch result");
                    global.absorb(counts);
                    stats.record_batch_merged();
                }
                info!(
                    distinct = global.len(),
                    total = global.total(),
                    "Aggregator finished"
                );
                global
            })
            .map_err(|source| ServiceError::spawn(THREAD_NAME, source))?;

        Ok(Self {
            handle: AggregatorHandle { tx },
            thread,
        })
    }

    /// Returns a new sending handle.
    #[must_use]
    pub fn handle(&self) -> AggregatorHandle {
        self.handle.clone()
    }

    /// Closes this side of the channel and waits for the final table.
    ///
    /// Blocks until every [`AggregatorHandle`] has been dropped, so call it
    /// after the mappers have been joined and outside an async context.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::WorkerPanicked`] if the thread panicked.
    pub fn finish(self) -> Result<WordCount, ServiceError> {
        let Self { handle, thread } = self;
        drop(handle);
        thread
            .join()
            .map_err(|_| ServiceError::WorkerPanicked(THREAD_NAME.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::tokenize;

    #[test]
    fn test_finish_without_submissions() {
        let aggregator = Aggregator::spawn(Arc::new(ServiceStats::new())).unwrap();
        assert!(aggregator.finish().unwrap().is_empty());
    }

    #[test]
    fn test_merges_from_many_threads() {
        let stats = Arc::new(ServiceStats::new());
        let aggregator = Aggregator::spawn(Arc::clone(&stats)).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let handle = aggregator.handle();
                scope.spawn(move || {
                    for _ in 0..25 {
                        handle.submit(tokenize(b"the fox the")).unwrap();
                    }
                });
            }
        });

        let global = aggregator.finish().unwrap();
        assert_eq!(global.get("the"), 200);
        assert_eq!(global.get("fox"), 100);
        assert_eq!(stats.batches_merged(), 100);
    }

    #[test]
    fn test_finish_waits_for_outstanding_handles() {
        let aggregator = Aggregator::spawn(Arc::new(ServiceStats::new())).unwrap();
        let handle = aggregator.handle();
        let finisher = std::thread::spawn(move || aggregator.finish());
        // The thread cannot finish while `handle` is alive.
        handle.submit(tokenize(b"late")).unwrap();
        drop(handle);
        let global = finisher.join().unwrap().unwrap();
        assert_eq!(global.get("late"), 1);
    }
}
