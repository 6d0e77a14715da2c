//! Wall-clock abstraction.
//!
//! # Design
//!
//! Two notions of time exist side by side:
//!
//! - **Simulation time** is owned by the engine and reported in seconds
//!   (`SimEngine::time`).  Trip durations are measured in it.
//! - **Wall time** paces the driver thread and debounces signal changes.
//!   It is read through the [`Clock`] trait so tests can substitute a
//!   [`ManualClock`] and step it deterministically.
//!
//! Clocks report milliseconds since an arbitrary origin; only differences
//! are meaningful.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A monotonic millisecond clock.
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds elapsed since this clock's origin.
    fn now_ms(&self) -> u64;
}

// ── SystemClock ───────────────────────────────────────────────────────────────

/// Real monotonic time, with the origin at construction.
#[derive(Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

// ── ManualClock ───────────────────────────────────────────────────────────────

/// A clock that only moves when told to.  Shareable across threads.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: AtomicU64::new(start_ms) }
    }

    pub fn set_ms(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
