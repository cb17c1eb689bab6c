//! A clock that only moves when told to. Plugs directly into [`topgun_core::HLC`]
//! via [`ClockSource`] so scenarios drive the same HLC code path production
//! traffic does, just without wall-clock time leaking into the result.

use std::sync::atomic::{AtomicU64, Ordering};

use topgun_core::ClockSource;

/// Milliseconds since an arbitrary epoch, advanced only by [`VirtualClock::advance`]
/// or [`VirtualClock::set`]. Never advances on its own.
#[derive(Debug, Default)]
pub struct VirtualClock {
    millis: AtomicU64,
}

impl VirtualClock {
    #[must_use]
    pub fn new() -> Self {
        Self { millis: AtomicU64::new(0) }
    }

    /// Moves the clock forward by `ms`. `ms` is a `u64`, so it is always
    /// non-negative; callers that compute a delta from a signed source
    /// should clamp to zero before calling.
    pub fn advance(&self, ms: u64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    /// Jumps the clock to an absolute time.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    /// Resets the clock to zero.
    pub fn reset(&self) {
        self.millis.store(0, Ordering::SeqCst);
    }
}

impl ClockSource for VirtualClock {
    fn now(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}
