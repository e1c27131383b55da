//! Engine Module
//!
//! The operation interface consumed from the underlying storage engine.
//!
//! ## Responsibilities
//! - Point operations by raw byte key: get / put / delete / has
//! - Whole-store administrative operations (compaction, properties,
//!   snapshots, sizes, read-only mode)
//! - Close
//!
//! The gateway never interprets option or snapshot types; they are passed
//! through to the engine as-is.

mod memory;

pub use memory::{MemEngine, MemReadOptions, MemSnapshot, MemWriteOptions};

use crate::error::Result;

/// A half-open key range `[start, limit)`.
///
/// A `None` bound is unbounded on that side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    /// Inclusive lower bound
    pub start: Option<Vec<u8>>,

    /// Exclusive upper bound
    pub limit: Option<Vec<u8>>,
}

impl KeyRange {
    /// Range covering every key
    pub fn all() -> Self {
        Self::default()
    }

    /// Range `[start, limit)`
    pub fn new(start: impl Into<Vec<u8>>, limit: impl Into<Vec<u8>>) -> Self {
        Self {
            start: Some(start.into()),
            limit: Some(limit.into()),
        }
    }

    /// Check whether a key falls inside the range
    pub fn contains(&self, key: &[u8]) -> bool {
        let above_start = self.start.as_deref().map_or(true, |s| key >= s);
        let below_limit = self.limit.as_deref().map_or(true, |l| key < l);
        above_start && below_limit
    }
}

/// An ordered key-value storage engine.
///
/// Implementations must be safe to call from several threads at once as long
/// as no two calls touch the same key concurrently; the gateway guarantees
/// that for point operations. Administrative operations are called without
/// any serialization and must be internally safe.
pub trait StorageEngine: Send + Sync + 'static {
    /// Engine-defined read options
    type ReadOptions: Clone + Default + Send + Sync + 'static;

    /// Engine-defined write options
    type WriteOptions: Clone + Default + Send + Sync + 'static;

    /// Engine-defined point-in-time view
    type Snapshot: Send + 'static;

    /// Get the value stored under `key`.
    ///
    /// A missing key is an error (`KvError::KeyNotFound` for the built-in
    /// engine).
    fn get(&self, key: &[u8], opts: &Self::ReadOptions) -> Result<Vec<u8>>;

    /// Insert or overwrite `key`
    fn put(&self, key: &[u8], value: &[u8], opts: &Self::WriteOptions) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    fn delete(&self, key: &[u8], opts: &Self::WriteOptions) -> Result<()>;

    /// Check whether `key` is present
    fn has(&self, key: &[u8], opts: &Self::ReadOptions) -> Result<bool>;

    /// Compact the given key range
    fn compact_range(&self, range: &KeyRange) -> Result<()>;

    /// Look up an engine property by name
    fn property(&self, name: &str) -> Result<String>;

    /// Acquire a point-in-time snapshot
    fn snapshot(&self) -> Result<Self::Snapshot>;

    /// Approximate stored bytes for each range, in order
    fn size_of(&self, ranges: &[KeyRange]) -> Result<Vec<u64>>;

    /// Switch the engine to read-only mode
    fn set_read_only(&self) -> Result<()>;

    /// Release the engine
    fn close(&self) -> Result<()>;
}
