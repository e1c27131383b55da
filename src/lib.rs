//! # bucketkv
//!
//! Per-key serialized access to an ordered key-value engine:
//! - At most one operation in flight per key, without a global lock
//! - Full parallelism across keys that hash to different buckets
//! - Compare-and-swap and single-key transactions on top of a plain engine
//! - Coordinated shutdown that drains accepted work
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Callers                               │
//! │              (any number of threads)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                   Dispatch Gateway                           │
//! │        (lifecycle check → KeyRouter → reply slot)            │
//! └──────┬──────────────┬──────────────────────┬────────────────┘
//!        │              │                      │
//!        ▼              ▼                      ▼
//!   ┌─────────┐    ┌─────────┐           ┌─────────┐
//!   │Bucket 0 │    │Bucket 1 │    ...    │Bucket N │
//!   │ queue + │    │ queue + │           │ queue + │
//!   │ worker  │    │ worker  │           │ worker  │
//!   └────┬────┘    └────┬────┘           └────┬────┘
//!        └──────────────┼─────────────────────┘
//!                       ▼
//!               ┌───────────────┐
//!               │ StorageEngine │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod engine;
pub mod router;
pub mod worker;
pub mod txn;
pub mod lifecycle;
pub mod gateway;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{KvError, Result};
pub use config::Config;
pub use engine::{KeyRange, MemEngine, StorageEngine};
pub use gateway::{CasOutcome, Gateway};
pub use lifecycle::LifecycleState;
pub use txn::Transaction;
pub use worker::BucketStats;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of bucketkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
