//! Time sources for counters.
//!
//! Counters read time through the [`Clock`] trait, in milliseconds since the
//! Unix epoch. [`SystemClock`] reads the wall clock; [`ManualClock`] is moved
//! by hand, which makes period rollover deterministic in tests.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// A source of timestamps in milliseconds since the Unix epoch.
pub trait Clock: Debug + Send + Sync {
    /// Returns the current time.
    fn now_millis(&self) -> u64;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now_millis(&self) -> u64 {
        // Pre-epoch readings clamp to zero.
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```rust
/// use tassi::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// clock.advance(250);
/// assert_eq!(clock.now_millis(), 1_250);
/// clock.set(10);
/// assert_eq!(clock.now_millis(), 10);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start` milliseconds.
    pub const fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Moves the clock forward by `millis`.
    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::Relaxed);
    }

    /// Sets the clock to an absolute reading, which may go backwards.
    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}
