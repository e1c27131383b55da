//! Dispatch Gateway
//!
//! The public entry point. Every point operation is packaged as a command,
//! routed to the bucket that owns its key and executed by that bucket's
//! worker; the caller blocks on a private reply slot until the result
//! arrives.
//!
//! ## Responsibilities
//! - Route point operations (get/put/delete/has/CAS/transaction) by key
//! - Pass administrative operations straight through to the engine
//! - Reject everything once closing has begun
//! - Drain accepted commands and release the engine on close

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Sender};
use parking_lot::{Mutex, RwLock};

use crate::config::Config;
use crate::engine::{KeyRange, StorageEngine};
use crate::error::{KvError, Result};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::router::KeyRouter;
use crate::txn::Transaction;
use crate::worker::{self, BucketStats, Command, WorkerCounters};

/// Result of [`Gateway::compare_and_swap_returning_previous`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CasOutcome {
    /// The value stored immediately before the call
    pub observed: Vec<u8>,

    /// Whether the new value was written
    pub swapped: bool,
}

/// Per-key serialized access to a storage engine
///
/// ## Concurrency Model: one worker per bucket
///
/// - Keys are hashed onto `num_buckets` buckets
/// - Each bucket has a bounded FIFO queue and one worker thread, so commands
///   for the same key never overlap and run in arrival order
/// - Commands on different buckets run in parallel with no relative order
/// - A full queue blocks the caller until the worker frees a slot
///
/// ## Shutdown
///
/// `close()` flips the lifecycle to `Closing` (new calls fail fast), drops
/// the bucket senders under the write lock, waits for the workers to drain
/// what was already accepted, then closes the engine.
pub struct Gateway<E: StorageEngine> {
    /// Gateway configuration
    config: Config,

    /// Shared engine handle (also held by every worker)
    engine: Arc<E>,

    /// Key → bucket mapping
    router: KeyRouter,

    /// Open / Closing / Closed
    lifecycle: Lifecycle,

    /// Queue senders, indexed by bucket. Emptied on close.
    queues: RwLock<Vec<Sender<Command<E>>>>,

    /// Worker threads, joined on close
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Per-bucket counters, outlive the workers
    counters: Vec<Arc<WorkerCounters>>,
}

impl<E: StorageEngine> Gateway<E> {
    /// Wrap `engine` and start one worker per bucket
    pub fn open(engine: E, config: Config) -> Result<Self> {
        Self::open_shared(Arc::new(engine), config)
    }

    /// Same as [`Gateway::open`] for an engine the caller keeps a handle to
    pub fn open_shared(engine: Arc<E>, config: Config) -> Result<Self> {
        let num_buckets = config.effective_buckets();
        let capacity = config.effective_queue_capacity();

        let mut queues = Vec::with_capacity(num_buckets);
        let mut workers = Vec::with_capacity(num_buckets);
        let mut counters = Vec::with_capacity(num_buckets);

        for bucket in 0..num_buckets {
            let (tx, rx) = bounded(capacity);
            let bucket_counters = Arc::new(WorkerCounters::default());
            let name = format!("{}-{}", config.thread_name_prefix, bucket);

            let handle = match worker::spawn(
                bucket,
                name,
                Arc::clone(&engine),
                rx,
                Arc::clone(&bucket_counters),
            ) {
                Ok(handle) => handle,
                Err(e) => {
                    // Stop whatever already started before reporting
                    drop(queues);
                    for handle in workers {
                        let _ = JoinHandle::join(handle);
                    }
                    return Err(e);
                }
            };

            queues.push(tx);
            workers.push(handle);
            counters.push(bucket_counters);
        }

        tracing::info!(
            buckets = num_buckets,
            queue_capacity = capacity,
            "gateway opened"
        );

        Ok(Self {
            config,
            engine,
            router: KeyRouter::new(num_buckets),
            lifecycle: Lifecycle::new(),
            queues: RwLock::new(queues),
            workers: Mutex::new(workers),
            counters,
        })
    }

    // =========================================================================
    // Point Operations (serialized per bucket)
    // =========================================================================

    /// Get the value stored under `key`
    ///
    /// A missing key surfaces as the engine's not-found error.
    pub fn get(&self, key: &[u8], opts: Option<&E::ReadOptions>) -> Result<Vec<u8>> {
        self.lifecycle.ensure_open("get")?;
        let k = key.to_vec();
        let ro = opts.cloned().unwrap_or_default();
        self.dispatch("get", key, move |engine| engine.get(&k, &ro))
    }

    /// Insert or overwrite `key`
    pub fn put(&self, key: &[u8], value: &[u8], opts: Option<&E::WriteOptions>) -> Result<()> {
        self.lifecycle.ensure_open("put")?;
        let k = key.to_vec();
        let v = value.to_vec();
        let wo = opts.cloned().unwrap_or_default();
        self.dispatch("put", key, move |engine| engine.put(&k, &v, &wo))
    }

    /// Remove `key`
    pub fn delete(&self, key: &[u8], opts: Option<&E::WriteOptions>) -> Result<()> {
        self.lifecycle.ensure_open("delete")?;
        let k = key.to_vec();
        let wo = opts.cloned().unwrap_or_default();
        self.dispatch("delete", key, move |engine| engine.delete(&k, &wo))
    }

    /// Check whether `key` is present
    pub fn has(&self, key: &[u8], opts: Option<&E::ReadOptions>) -> Result<bool> {
        self.lifecycle.ensure_open("has")?;
        let k = key.to_vec();
        let ro = opts.cloned().unwrap_or_default();
        self.dispatch("has", key, move |engine| engine.has(&k, &ro))
    }

    /// Write `new` only if the stored value equals `expected`
    ///
    /// Returns `Ok(false)` on a mismatch (nothing written). A failed read,
    /// including a missing key, is returned as an error.
    pub fn compare_and_swap(
        &self,
        key: &[u8],
        new: &[u8],
        expected: &[u8],
        ro: Option<&E::ReadOptions>,
        wo: Option<&E::WriteOptions>,
    ) -> Result<bool> {
        self.lifecycle.ensure_open("compare_and_swap")?;
        let k = key.to_vec();
        let new = new.to_vec();
        let expected = expected.to_vec();
        let ro = ro.cloned().unwrap_or_default();
        let wo = wo.cloned().unwrap_or_default();

        self.dispatch("compare_and_swap", key, move |engine| {
            let current = engine.get(&k, &ro)?;
            if current != expected {
                return Ok(false);
            }
            engine.put(&k, &new, &wo)?;
            Ok(true)
        })
    }

    /// Like [`Gateway::compare_and_swap`], also reporting the value seen
    ///
    /// `observed` is what was stored right before the call: the old value
    /// when the swap happened, the current value when it did not. A CAS
    /// loop can retry with `observed` as its next `expected` without a
    /// separate read.
    pub fn compare_and_swap_returning_previous(
        &self,
        key: &[u8],
        new: &[u8],
        expected: &[u8],
        ro: Option<&E::ReadOptions>,
        wo: Option<&E::WriteOptions>,
    ) -> Result<CasOutcome> {
        self.lifecycle.ensure_open("compare_and_swap_returning_previous")?;
        let k = key.to_vec();
        let new = new.to_vec();
        let expected = expected.to_vec();
        let ro = ro.cloned().unwrap_or_default();
        let wo = wo.cloned().unwrap_or_default();

        self.dispatch("compare_and_swap_returning_previous", key, move |engine| {
            let observed = engine.get(&k, &ro)?;
            if observed != expected {
                return Ok(CasOutcome {
                    observed,
                    swapped: false,
                });
            }
            engine.put(&k, &new, &wo)?;
            Ok(CasOutcome {
                observed,
                swapped: true,
            })
        })
    }

    /// Run `f` with exclusive access to `key`
    ///
    /// The whole callback is a single command on the key's bucket, so no
    /// other operation on that key can interleave with it. Operations on
    /// other keys in the same bucket wait until it returns.
    ///
    /// `f` must not call back into this gateway for a key on the same
    /// bucket; the worker would wait on itself.
    pub fn transaction<T, F>(&self, key: &[u8], f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_, E>) -> Result<T> + Send + 'static,
    {
        self.lifecycle.ensure_open("transaction")?;
        let k = key.to_vec();
        self.dispatch("transaction", key, move |engine| {
            let txn = Transaction::new(&k, engine);
            f(&txn)
        })
    }

    // =========================================================================
    // Administrative Operations (not serialized)
    // =========================================================================

    /// Compact a key range in the engine
    pub fn compact_range(&self, range: &KeyRange) -> Result<()> {
        self.lifecycle.ensure_open("compact_range")?;
        self.engine.compact_range(range)
    }

    /// Look up an engine property
    pub fn property(&self, name: &str) -> Result<String> {
        self.lifecycle.ensure_open("property")?;
        self.engine.property(name)
    }

    /// Acquire an engine snapshot
    pub fn snapshot(&self) -> Result<E::Snapshot> {
        self.lifecycle.ensure_open("snapshot")?;
        self.engine.snapshot()
    }

    /// Approximate stored bytes per range
    pub fn size_of(&self, ranges: &[KeyRange]) -> Result<Vec<u64>> {
        self.lifecycle.ensure_open("size_of")?;
        self.engine.size_of(ranges)
    }

    /// Switch the engine to read-only mode
    pub fn set_read_only(&self) -> Result<()> {
        self.lifecycle.ensure_open("set_read_only")?;
        self.engine.set_read_only()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stop accepting operations, drain the buckets and close the engine
    ///
    /// Every command accepted before the call still runs and gets its reply.
    /// A second call fails with `Closed`.
    pub fn close(&self) -> Result<()> {
        self.lifecycle.begin_close()?;
        tracing::info!("gateway closing");

        // Dispatchers hold the read lock while they check and clone a
        // sender; once we get the write lock no new command can be queued.
        let senders = std::mem::take(&mut *self.queues.write());
        drop(senders);

        let workers = std::mem::take(&mut *self.workers.lock());
        for (bucket, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                tracing::error!(bucket, "bucket worker panicked");
            }
        }

        let result = self.engine.close();
        self.lifecycle.finish_close();
        tracing::info!("gateway closed");
        result
    }

    /// Whether `close()` has begun
    pub fn is_closed(&self) -> bool {
        !self.lifecycle.is_open()
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Bucket that owns `key`
    pub fn bucket_for(&self, key: &[u8]) -> usize {
        self.router.route(key)
    }

    /// Number of buckets
    pub fn num_buckets(&self) -> usize {
        self.router.buckets()
    }

    /// Per-bucket processed/queued counts
    pub fn bucket_stats(&self) -> Vec<BucketStats> {
        let queues = self.queues.read();
        self.counters
            .iter()
            .enumerate()
            .map(|(bucket, counters)| BucketStats {
                bucket,
                processed: counters.processed(),
                queued: queues.get(bucket).map_or(0, |q| q.len()),
            })
            .collect()
    }

    /// The wrapped engine
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Queue `f` on the bucket owning `key` and wait for its reply
    fn dispatch<T, F>(&self, op: &'static str, key: &[u8], f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&E) -> Result<T> + Send + 'static,
    {
        let bucket = self.router.route(key);

        let sender = {
            let queues = self.queues.read();
            // Re-check under the lock: close() flips the state before it
            // takes the write lock, so an empty vector is never observed open
            if !self.lifecycle.is_open() {
                return Err(KvError::Closed { op });
            }
            match queues.get(bucket) {
                Some(sender) => sender.clone(),
                None => return Err(KvError::Closed { op }),
            }
        };

        tracing::trace!(op, bucket, "dispatching command");

        let (command, reply) = Command::new(op, f);
        let sent = sender.send(command);
        drop(sender);
        if sent.is_err() {
            return Err(KvError::WorkerUnavailable { bucket });
        }

        match reply.recv() {
            Ok(result) => result,
            Err(_) => Err(KvError::WorkerUnavailable { bucket }),
        }
    }
}

impl<E: StorageEngine> Drop for Gateway<E> {
    fn drop(&mut self) {
        if self.lifecycle.is_open() {
            tracing::warn!("gateway dropped without explicit close, closing");
            if let Err(e) = self.close() {
                tracing::warn!("close on drop failed: {}", e);
            }
        }
    }
}
