//! Clock collaborator
//!
//! Every record and stats update is stamped with `Clock::now()`. Implementations
//! must be monotonic non-decreasing.

use crate::types::Timestamp;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of monotonic timestamps
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds since the Unix epoch
    fn now(&self) -> Timestamp;
}

/// Wall clock clamped so it never goes backwards
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicI64,
}

impl SystemClock {
    /// New system clock
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let wall = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Manually driven clock for tests and deterministic replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Clock starting at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicI64::new(start),
        }
    }

    /// Move the clock forward by `delta` nanoseconds
    pub fn advance(&self, delta: i64) {
        self.now.fetch_add(delta.max(0), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
