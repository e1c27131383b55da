//! Bucket Worker
//!
//! One thread per bucket, draining that bucket's command queue in FIFO order.
//!
//! ## Command flow
//! ```text
//!   caller ──send──▶ [bounded queue] ──recv──▶ worker ──execute──▶ engine
//!     ▲                                          │
//!     └──────────────── reply slot (cap 1) ◀─────┘
//! ```
//!
//! The worker never stops because a command returned an error; the error is
//! the reply. It exits once every sender of its queue is gone and the queue
//! is empty, so every accepted command is executed and answered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver};

use crate::engine::StorageEngine;
use crate::error::{KvError, Result};

/// Receiving half of a reply slot
pub(crate) type ReplySlot<T> = Receiver<Result<T>>;

/// A unit of work for a bucket worker
///
/// Wraps one operation against the engine together with the sending half
/// of its reply slot. Consumed exactly once.
pub(crate) struct Command<E> {
    op: &'static str,
    job: Box<dyn FnOnce(&E) + Send>,
}

impl<E: StorageEngine> Command<E> {
    /// Package `f` as a command and return the slot its result will land in
    pub(crate) fn new<T, F>(op: &'static str, f: F) -> (Self, ReplySlot<T>)
    where
        T: Send + 'static,
        F: FnOnce(&E) -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = bounded(1);
        let job = Box::new(move |engine: &E| {
            // The caller only goes away if its thread died; nothing to do then
            let _ = reply_tx.send(f(engine));
        });
        (Self { op, job }, reply_rx)
    }

    /// Operation name, for logging
    pub(crate) fn op(&self) -> &'static str {
        self.op
    }

    fn execute(self, engine: &E) {
        (self.job)(engine)
    }
}

/// Per-bucket counters
#[derive(Debug, Default)]
pub(crate) struct WorkerCounters {
    processed: AtomicU64,
}

impl WorkerCounters {
    pub(crate) fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

/// Point-in-time statistics for one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketStats {
    /// Bucket index
    pub bucket: usize,

    /// Commands taken off the queue so far
    pub processed: u64,

    /// Commands waiting in the queue
    pub queued: usize,
}

/// Spawn the worker thread for `bucket`
pub(crate) fn spawn<E: StorageEngine>(
    bucket: usize,
    name: String,
    engine: Arc<E>,
    queue: Receiver<Command<E>>,
    counters: Arc<WorkerCounters>,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name)
        .spawn(move || run(bucket, engine, queue, counters))
        .map_err(|e| KvError::Config(format!("failed to spawn worker for bucket {}: {}", bucket, e)))
}

/// Worker loop
fn run<E: StorageEngine>(
    bucket: usize,
    engine: Arc<E>,
    queue: Receiver<Command<E>>,
    counters: Arc<WorkerCounters>,
) {
    tracing::debug!(bucket, "bucket worker started");

    // recv() keeps yielding queued commands after the senders are dropped
    // and only fails once the queue is both disconnected and empty
    while let Ok(command) = queue.recv() {
        tracing::trace!(bucket, op = command.op(), "executing command");
        // Counted before execution: a replied command is always in the stats
        counters.processed.fetch_add(1, Ordering::Relaxed);
        command.execute(&engine);
    }

    tracing::debug!(
        bucket,
        processed = counters.processed(),
        "bucket worker exiting"
    );
}
