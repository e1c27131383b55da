//! Key Router
//!
//! Maps a raw byte key to one of N buckets.
//!
//! Routing is a 64-bit xxHash of the key bytes reduced modulo the bucket
//! count. It is stable across processes, so a key always lands on the same
//! bucket for the lifetime of a gateway. Keys sharing a bucket only share a
//! worker; correctness does not depend on the distribution.

use xxhash_rust::xxh64::xxh64;

/// Seed for key hashing
const ROUTE_SEED: u64 = 0;

/// Deterministic key → bucket mapping
#[derive(Debug, Clone, Copy)]
pub struct KeyRouter {
    buckets: usize,
}

impl KeyRouter {
    /// Create a router over `buckets` buckets (at least one)
    pub fn new(buckets: usize) -> Self {
        Self {
            buckets: buckets.max(1),
        }
    }

    /// Pick the bucket that owns `key`
    pub fn route(&self, key: &[u8]) -> usize {
        (xxh64(key, ROUTE_SEED) % self.buckets as u64) as usize
    }

    /// Number of buckets
    pub fn buckets(&self) -> usize {
        self.buckets
    }
}
