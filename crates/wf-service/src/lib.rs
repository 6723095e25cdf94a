//! Word-counting service for wordfleet.
//!
//! The service accepts TCP connections from scanning agents. Each
//! connection carries one newline-delimited batch of file paths; the batch
//! is queued, counted by a mapper, and merged into a process-wide total.
//!
//! # Overview
//!
//! The main entry point is [`Service::start`], which wires together:
//!
//! - [`accept_loop`]: tokio listener, one task per [`Connection`]
//! - [`JobQueue`]: unbounded `Mutex<VecDeque>` + `Condvar` of [`Batch`]es
//! - [`MapperPool`]: N named threads sharing one rayon pool for file tasks
//! - [`Aggregator`]: single thread owning the global [`WordCount`]
//! - [`ServiceStats`]: atomic counters for the final report
//!
//! # Example
//!
//! ```no_run
//! use wf_core::ServiceConfig;
//! use wf_service::Service;
//!
//! # async fn run() -> Result<(), wf_service::ServiceError> {
//! let running = Service::start(ServiceConfig::default()).await?;
//! tokio::signal::ctrl_c().await.ok();
//! let report = running.shutdown().await?;
//! println!("{} distinct words", report.distinct_words());
//! # Ok(())
//! # }
//! ```
//!
//! # Shutdown Order
//!
//! ```text
//! cancel listener ─► wait for connection tasks ─► shut down job queue
//!     ─► join mappers (queue drained) ─► finish aggregator ─► report
//! ```
//!
//! Every batch that was fully received before shutdown is counted. Payloads
//! whose peer has not yet closed its write side are dropped.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod aggregator;
mod batch;
mod connection;
mod error;
mod mapper;
mod queue;
mod report;
mod stats;

pub use aggregator::{Aggregator, AggregatorHandle};
pub use batch::{Batch, ParsedPaths, parse_paths};
pub use connection::{Connection, ConnectionState, accept_loop};
pub use error::ServiceError;
pub use mapper::{BatchCount, MapperPool, count_paths};
pub use queue::JobQueue;
pub use report::{ReportFormat, ServiceReport};
pub use stats::{ServiceSnapshot, ServiceStats};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;
use wf_core::{ServiceConfig, WordCount};

/// Entry point for starting the counting service.
#[derive(Debug, Clone, Copy)]
pub struct Service;

impl Service {
    /// Binds the listener and starts the aggregator, mappers, and acceptor.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] for a zero worker count,
    /// [`ServiceError::Bind`] if the address cannot be bound, and
    /// [`ServiceError::Spawn`] or [`ServiceError::ThreadPool`] if a worker
    /// cannot be started.
    pub async fn start(config: ServiceConfig) -> Result<RunningService, ServiceError> {
        if config.mapper_workers == 0 {
            return Err(ServiceError::config("mapper workers must be at least 1"));
        }
        let inner_threads = config.resolved_inner_parallelism();
        if inner_threads == 0 {
            return Err(ServiceError::config("inner parallelism must be at least 1"));
        }

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServiceError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServiceError::LocalAddr)?;

        let stats = Arc::new(ServiceStats::new());
        let queue = Arc::new(JobQueue::new());
        let aggregator = Aggregator::spawn(Arc::clone(&stats))?;
        let inner = Arc::new(
            rayon::ThreadPoolBuilder::new()
                .num_threads(inner_threads)
                .thread_name(|i| format!("count-{i}"))
                .build()?,
        );
        let mappers = MapperPool::spawn(
            config.mapper_workers,
            &queue,
            &inner,
            &aggregator.handle(),
            &stats,
        )?;

        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();
        let acceptor = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&queue),
            Arc::clone(&stats),
            shutdown.clone(),
            tracker.clone(),
        ));

        info!(
            addr = %local_addr,
            mappers = config.mapper_workers,
            inner_threads,
            "Counting service listening"
        );

        Ok(RunningService {
            local_addr,
            stats,
            queue,
            shutdown,
            tracker,
            acceptor,
            mappers,
            aggregator,
        })
    }
}

/// A started service. Call [`shutdown`](Self::shutdown) to stop it and
/// obtain the final report.
#[derive(Debug)]
pub struct RunningService {
    local_addr: SocketAddr,
    stats: Arc<ServiceStats>,
    queue: Arc<JobQueue>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    acceptor: JoinHandle<()>,
    mappers: MapperPool,
    aggregator: Aggregator,
}

impl RunningService {
    /// Returns the address the listener is bound to.
    #[inline]
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the live statistics.
    #[must_use]
    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    /// Returns the number of batches waiting for a mapper.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Returns a token that stops the listener when cancelled.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stops accepting, drains every received batch, and returns the report.
    ///
    /// Connections still waiting for end of stream are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Join`] if a background task failed and
    /// [`ServiceError::WorkerPanicked`] if a mapper or the aggregator
    /// panicked.
    pub async fn shutdown(self) -> Result<ServiceReport, ServiceError> {
        let Self {
            stats,
            queue,
            shutdown,
            tracker,
            acceptor,
            mappers,
            aggregator,
            ..
        } = self;

        shutdown.cancel();
        acceptor.await?;

        tracker.close();
        tracker.wait().await;
        info!(queued = queue.len(), "Listener stopped, draining job queue");

        let words = tokio::task::spawn_blocking(move || -> Result<WordCount, ServiceError> {
            queue.shutdown();
            mappers.join()?;
            aggregator.finish()
        })
        .await??;

        let report = ServiceReport {
            stats: stats.snapshot(),
            words,
        };
        info!(
            batches = report.stats.batches_merged,
            files = report.stats.files_counted,
            failed = report.stats.files_failed,
            distinct = report.distinct_words(),
            total = report.total_words(),
            "Counting service stopped"
        );
        Ok(report)
    }
}
