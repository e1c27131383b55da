//! Lifecycle Controller
//!
//! Tracks the gateway through `Open → Closing → Closed`.
//!
//! The state is a single atomic so every caller thread sees the transition
//! to `Closing` before any queue is released.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::{KvError, Result};

/// Gateway lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LifecycleState {
    /// Operations are accepted, routed and executed
    Open = 0,

    /// Close has begun; new operations are rejected, accepted ones drain
    Closing = 1,

    /// Terminal
    Closed = 2,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Open,
            1 => LifecycleState::Closing,
            _ => LifecycleState::Closed,
        }
    }
}

/// Atomic lifecycle state machine
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    /// Start in `Open`
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Open as u8),
        }
    }

    /// Current state
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == LifecycleState::Open
    }

    /// Fail with `Closed` unless the gateway is open
    pub fn ensure_open(&self, op: &'static str) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(KvError::Closed { op })
        }
    }

    /// `Open → Closing`. Only one caller ever wins this transition.
    pub fn begin_close(&self) -> Result<()> {
        self.state
            .compare_exchange(
                LifecycleState::Open as u8,
                LifecycleState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| KvError::Closed { op: "close" })
    }

    /// `Closing → Closed`
    pub fn finish_close(&self) {
        self.state
            .store(LifecycleState::Closed as u8, Ordering::Release);
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
