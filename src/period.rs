//! Period lengths and accuracy modes.
//!
//! A counter is configured with a [`Period`], the length of one elapsed-time
//! bucket, and a [`Mode`], which selects how many buckets must be queued
//! before the oldest one is retired and reported.
//!
//! ```text
//!   FullAccuracy (threshold 3)          LowLatency (threshold 2)
//!   ┌────────┬────────┬────────┐        ┌────────┬────────┐
//!   │ sealed │ sealed │current │        │ sealed │current │
//!   └────────┴────────┴────────┘        └────────┴────────┘
//!     ▲ reported                          ▲ reported
//! ```

use std::fmt;
use std::num::NonZeroU64;

use crate::error::{CounterError, Result};

const SECOND: u64 = 1_000;
const MINUTE: u64 = 60 * SECOND;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;
const WEEK: u64 = 7 * DAY;

/// Length of one reporting period.
///
/// # Examples
///
/// ```rust
/// use tassi::period::{Mode, Period};
///
/// assert_eq!(Period::Minute.millis(), 60_000);
/// assert_eq!(Period::custom(250).unwrap().millis(), 250);
/// assert!(Period::custom(0).is_err());
/// assert_eq!(Period::Hour.default_mode(), Mode::LowLatency);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// One second.
    Second,
    /// One minute.
    Minute,
    /// One hour.
    Hour,
    /// One day (24 hours of elapsed time, not calendar days).
    Day,
    /// One week (7 days of elapsed time).
    Week,
    /// Any other non-zero length in milliseconds.
    Custom(NonZeroU64),
}

impl Period {
    /// Creates a custom period, rejecting a zero length.
    pub fn custom(millis: u64) -> Result<Self> {
        NonZeroU64::new(millis)
            .map(Period::Custom)
            .ok_or(CounterError::InvalidPeriod(millis))
    }

    /// Returns the period length in milliseconds.
    pub const fn millis(&self) -> u64 {
        match self {
            Period::Second => SECOND,
            Period::Minute => MINUTE,
            Period::Hour => HOUR,
            Period::Day => DAY,
            Period::Week => WEEK,
            Period::Custom(ms) => ms.get(),
        }
    }

    /// Returns the mode picked by [`TpsCounter::for_period`](crate::TpsCounter::for_period).
    ///
    /// Periods shorter than an hour can afford to lag one extra period, so they
    /// get [`Mode::FullAccuracy`]. From an hour upward the extra lag costs more
    /// in freshness than the bounded inaccuracy of [`Mode::LowLatency`].
    pub const fn default_mode(&self) -> Mode {
        if self.millis() < HOUR {
            Mode::FullAccuracy
        } else {
            Mode::LowLatency
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Second => f.write_str("second"),
            Period::Minute => f.write_str("minute"),
            Period::Hour => f.write_str("hour"),
            Period::Day => f.write_str("day"),
            Period::Week => f.write_str("week"),
            Period::Custom(ms) => write!(f, "{ms}ms"),
        }
    }
}

/// Accuracy/latency tradeoff of a counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Retire a bucket only once two newer buckets exist. Every increment has
    /// landed before the bucket is read; the report lags one extra period.
    #[default]
    FullAccuracy,
    /// Retire a bucket as soon as its successor exists.
    LowLatency,
}

impl Mode {
    /// Number of queued buckets required before the oldest is retired.
    pub const fn threshold(&self) -> usize {
        match self {
            Mode::FullAccuracy => 3,
            Mode::LowLatency => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis() {
        assert_eq!(Period::Second.millis(), 1_000);
        assert_eq!(Period::Minute.millis(), 60_000);
        assert_eq!(Period::Hour.millis(), 3_600_000);
        assert_eq!(Period::Day.millis(), 86_400_000);
        assert_eq!(Period::Week.millis(), 604_800_000);
    }

    #[test]
    fn test_custom_rejects_zero() {
        assert_eq!(Period::custom(0), Err(CounterError::InvalidPeriod(0)));
        assert_eq!(Period::custom(1500).unwrap().millis(), 1500);
    }

    #[test]
    fn test_default_mode() {
        assert_eq!(Period::Second.default_mode(), Mode::FullAccuracy);
        assert_eq!(Period::Minute.default_mode(), Mode::FullAccuracy);
        assert_eq!(Period::Hour.default_mode(), Mode::LowLatency);
        assert_eq!(Period::Day.default_mode(), Mode::LowLatency);
        assert_eq!(Period::Week.default_mode(), Mode::LowLatency);
        assert_eq!(
            Period::custom(HOUR - 1).unwrap().default_mode(),
            Mode::FullAccuracy
        );
        assert_eq!(
            Period::custom(HOUR).unwrap().default_mode(),
            Mode::LowLatency
        );
    }

    #[test]
    fn test_threshold() {
        assert_eq!(Mode::FullAccuracy.threshold(), 3);
        assert_eq!(Mode::LowLatency.threshold(), 2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Period::Minute.to_string(), "minute");
        assert_eq!(Period::custom(250).unwrap().to_string(), "250ms");
    }
}
