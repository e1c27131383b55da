//! Configuration for bucketkv
//!
//! Centralized configuration with sensible defaults.

/// Default number of buckets (serialization units)
pub const DEFAULT_NUM_BUCKETS: usize = 16;

/// Default capacity of each bucket's command queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Main configuration for a gateway instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Bucket Configuration
    // -------------------------------------------------------------------------
    /// Number of buckets the key space is split into.
    /// Each bucket gets one worker thread. Zero means the default.
    pub num_buckets: usize,

    /// Commands a bucket queue holds before callers block.
    /// Zero means the default.
    pub queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Worker Configuration
    // -------------------------------------------------------------------------
    /// Worker threads are named `{thread_name_prefix}-{bucket}`
    pub thread_name_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_buckets: DEFAULT_NUM_BUCKETS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            thread_name_prefix: "bucketkv-bucket".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Bucket count actually used (zero falls back to the default)
    pub fn effective_buckets(&self) -> usize {
        if self.num_buckets == 0 {
            DEFAULT_NUM_BUCKETS
        } else {
            self.num_buckets
        }
    }

    /// Queue capacity actually used (zero falls back to the default)
    pub fn effective_queue_capacity(&self) -> usize {
        if self.queue_capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            self.queue_capacity
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of buckets
    pub fn num_buckets(mut self, count: usize) -> Self {
        self.config.num_buckets = count;
        self
    }

    /// Set the per-bucket queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Set the worker thread name prefix
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
