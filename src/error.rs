//! Error types for bucketkv
//!
//! Provides a unified error type for the gateway and the storage engines
//! behind it. Engine errors travel back to callers unchanged.

use thiserror::Error;

/// Result type alias using KvError
pub type Result<T> = std::result::Result<T, KvError>;

/// Unified error type for bucketkv operations
#[derive(Debug, Error)]
pub enum KvError {
    // -------------------------------------------------------------------------
    // Gateway Errors
    // -------------------------------------------------------------------------
    /// The gateway has started (or finished) closing; nothing was queued
    #[error("{op}(): database is already closed")]
    Closed { op: &'static str },

    /// The worker thread for a bucket is gone (a command panicked)
    #[error("worker for bucket {bucket} is unavailable")]
    WorkerUnavailable { bucket: usize },

    // -------------------------------------------------------------------------
    // Transaction Errors
    // -------------------------------------------------------------------------
    #[error("Transaction aborted: {0}")]
    Aborted(String),

    // -------------------------------------------------------------------------
    // Engine Errors
    // -------------------------------------------------------------------------
    #[error("Key not found")]
    KeyNotFound,

    #[error("Storage engine is closed")]
    EngineClosed,

    #[error("Storage engine is read-only")]
    ReadOnly,

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Corruption detected: {0}")]
    Corruption(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KvError {
    /// True for the "gateway is closed" rejection
    pub fn is_closed(&self) -> bool {
        matches!(self, KvError::Closed { .. })
    }

    /// True when the engine reported a missing key
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::KeyNotFound)
    }
}
