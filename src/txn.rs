//! Transaction Context
//!
//! A single-key handle handed to `Gateway::transaction` callbacks.
//!
//! The callback runs as one command on the bucket worker that owns the key,
//! so no other command for that key can interleave with the calls made
//! through the handle. There is no rollback: writes are applied to the
//! engine as they happen.

use crate::engine::StorageEngine;
use crate::error::Result;

/// Exclusive access to one key for the duration of a transaction callback
///
/// Borrows both the key and the engine, so it cannot outlive the callback.
pub struct Transaction<'a, E: StorageEngine> {
    key: &'a [u8],
    engine: &'a E,
}

impl<'a, E: StorageEngine> Transaction<'a, E> {
    pub(crate) fn new(key: &'a [u8], engine: &'a E) -> Self {
        Self { key, engine }
    }

    /// The key this transaction is bound to
    pub fn key(&self) -> &[u8] {
        self.key
    }

    /// Read the current value
    pub fn get(&self, opts: Option<&E::ReadOptions>) -> Result<Vec<u8>> {
        match opts {
            Some(ro) => self.engine.get(self.key, ro),
            None => self.engine.get(self.key, &E::ReadOptions::default()),
        }
    }

    /// Overwrite the value
    pub fn set(&self, value: &[u8], opts: Option<&E::WriteOptions>) -> Result<()> {
        match opts {
            Some(wo) => self.engine.put(self.key, value, wo),
            None => self.engine.put(self.key, value, &E::WriteOptions::default()),
        }
    }

    /// Check whether the key is present
    pub fn has(&self, opts: Option<&E::ReadOptions>) -> Result<bool> {
        match opts {
            Some(ro) => self.engine.has(self.key, ro),
            None => self.engine.has(self.key, &E::ReadOptions::default()),
        }
    }

    /// Remove the key
    pub fn delete(&self, opts: Option<&E::WriteOptions>) -> Result<()> {
        match opts {
            Some(wo) => self.engine.delete(self.key, wo),
            None => self.engine.delete(self.key, &E::WriteOptions::default()),
        }
    }
}
