//! In-memory engine
//!
//! BTreeMap-based ordered engine with copy-on-write snapshots.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{KvError, Result};

use super::{KeyRange, StorageEngine};

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// Read options for [`MemEngine`]
#[derive(Debug, Clone, Default)]
pub struct MemReadOptions {
    /// Read from this snapshot instead of the live data
    pub snapshot: Option<MemSnapshot>,
}

/// Write options for [`MemEngine`]
#[derive(Debug, Clone, Default)]
pub struct MemWriteOptions {
    /// Request a synced write (counted, memory has nothing to sync)
    pub sync: bool,
}

/// A frozen view of a [`MemEngine`] at the time it was taken
#[derive(Debug, Clone)]
pub struct MemSnapshot {
    data: Arc<Tree>,
}

impl MemSnapshot {
    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.data.get(key).map(Vec::as_slice)
    }

    /// Check whether the key was present
    pub fn has(&self, key: &[u8]) -> bool {
        self.data.contains_key(key)
    }

    /// Number of entries in the snapshot
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.data.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }
}

/// In-memory ordered storage engine
///
/// ## Concurrency:
/// - `data`: RwLock around an `Arc<BTreeMap>`; writers clone-on-write when a
///   snapshot still shares the map
/// - counters and mode flags are atomics
/// - all methods use `&self`
pub struct MemEngine {
    /// Live data, shared with outstanding snapshots
    data: RwLock<Arc<Tree>>,

    /// Set by `set_read_only`; writes then fail
    read_only: AtomicBool,

    /// Set by `close`; everything then fails
    closed: AtomicBool,

    /// Number of `compact_range` calls
    compactions: AtomicU64,

    /// Number of writes that asked for sync
    sync_writes: AtomicU64,
}

impl MemEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Arc::new(BTreeMap::new())),
            read_only: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            compactions: AtomicU64::new(0),
            sync_writes: AtomicU64::new(0),
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(KvError::EngineClosed);
        }
        Ok(())
    }

    fn ensure_writable(&self, opts: &MemWriteOptions) -> Result<()> {
        self.ensure_open()?;
        if self.read_only.load(Ordering::Acquire) {
            return Err(KvError::ReadOnly);
        }
        if opts.sync {
            self.sync_writes.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Sum of key and value bytes inside `range`
    fn range_bytes(tree: &Tree, range: &KeyRange) -> u64 {
        tree.iter()
            .skip_while(|(k, _)| !range.start.as_deref().map_or(true, |s| k.as_slice() >= s))
            .take_while(|(k, _)| range.limit.as_deref().map_or(true, |l| k.as_slice() < l))
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl Default for MemEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for MemEngine {
    type ReadOptions = MemReadOptions;
    type WriteOptions = MemWriteOptions;
    type Snapshot = MemSnapshot;

    fn get(&self, key: &[u8], opts: &MemReadOptions) -> Result<Vec<u8>> {
        self.ensure_open()?;
        let value = match &opts.snapshot {
            Some(snapshot) => snapshot.get(key).map(<[u8]>::to_vec),
            None => self.data.read().get(key).cloned(),
        };
        value.ok_or(KvError::KeyNotFound)
    }

    fn put(&self, key: &[u8], value: &[u8], opts: &MemWriteOptions) -> Result<()> {
        self.ensure_writable(opts)?;
        let mut data = self.data.write();
        Arc::make_mut(&mut *data).insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8], opts: &MemWriteOptions) -> Result<()> {
        self.ensure_writable(opts)?;
        let mut data = self.data.write();
        if data.contains_key(key) {
            Arc::make_mut(&mut *data).remove(key);
        }
        Ok(())
    }

    fn has(&self, key: &[u8], opts: &MemReadOptions) -> Result<bool> {
        self.ensure_open()?;
        Ok(match &opts.snapshot {
            Some(snapshot) => snapshot.has(key),
            None => self.data.read().contains_key(key),
        })
    }

    fn compact_range(&self, _range: &KeyRange) -> Result<()> {
        self.ensure_open()?;
        self.compactions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn property(&self, name: &str) -> Result<String> {
        self.ensure_open()?;
        let value = match name {
            "mem.entries" => self.len().to_string(),
            "mem.approximate-bytes" => {
                Self::range_bytes(&self.data.read(), &KeyRange::all()).to_string()
            }
            "mem.compactions" => self.compactions.load(Ordering::Relaxed).to_string(),
            "mem.sync-writes" => self.sync_writes.load(Ordering::Relaxed).to_string(),
            "mem.read-only" => self.read_only.load(Ordering::Acquire).to_string(),
            other => return Err(KvError::UnknownProperty(other.to_string())),
        };
        Ok(value)
    }

    fn snapshot(&self) -> Result<MemSnapshot> {
        self.ensure_open()?;
        Ok(MemSnapshot {
            data: Arc::clone(&*self.data.read()),
        })
    }

    fn size_of(&self, ranges: &[KeyRange]) -> Result<Vec<u64>> {
        self.ensure_open()?;
        let data = self.data.read();
        Ok(ranges.iter().map(|r| Self::range_bytes(&data, r)).collect())
    }

    fn set_read_only(&self) -> Result<()> {
        self.ensure_open()?;
        self.read_only.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(KvError::EngineClosed);
        }
        Ok(())
    }
}
