//! Unbounded multi-producer, multi-consumer job queue of batches.
//!
//! Connection handlers push without blocking; mapper workers block in
//! [`JobQueue::pop`] until a batch arrives or the queue is shut down. After
//! shutdown, batches already queued are still handed out, then every
//! consumer receives `None`.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::batch::Batch;

#[derive(Debug, Default)]
struct QueueState {
    batches: VecDeque<Batch>,
    shutdown: bool,
}

/// FIFO queue of [`Batch`]es with a shutdown signal.
///
/// # Examples
///
/// ```
/// use std::net::SocketAddr;
/// use wf_service::{Batch, JobQueue};
///
/// let queue = JobQueue::new();
/// let peer = SocketAddr::from(([127, 0, 0, 1], 9000));
/// queue.push(Batch::new(1, peer, b"a.txt\n".to_vec())).unwrap();
/// queue.shutdown();
///
/// // Queued work is drained before consumers are told to stop.
/// assert_eq!(queue.pop().map(|b| b.id()), Some(1));
/// assert!(queue.pop().is_none());
/// ```
#[derive(Debug, Default)]
pub struct JobQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl JobQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a batch and wakes one waiting consumer.
    ///
    /// # Errors
    ///
    /// Returns the batch back if the queue has been shut down.
    pub fn push(&self, batch: Batch) -> Result<(), Batch> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(batch);
        }
        state.batches.push_back(batch);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until a batch is available.
    ///
    /// Returns `None` once the queue is shut down and empty.
    pub fn pop(&self) -> Option<Batch> {
        let mut state = self.state.lock();
        loop {
            if let Some(batch) = state.batches.pop_front() {
                return Some(batch);
            }
            if state.shutdown {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Removes the next batch without blocking.
    pub fn try_pop(&self) -> Option<Batch> {
        self.state.lock().batches.pop_front()
    }

    /// Refuses further pushes and wakes every waiting consumer.
    pub fn shutdown(&self) {
        self.state.lock().shutdown = true;
        self.available.notify_all();
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Returns the number of queued batches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().batches.len()
    }

    /// Returns `true` if no batch is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().batches.is_empty()
    }
}
