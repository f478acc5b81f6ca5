//! Rate statistics produced by retired buckets.
//!
//! A [`RateStatistic`] is the immutable snapshot of one retired bucket. Its
//! window runs from the bucket's start time to the start time of the bucket
//! that followed it, so the rate reflects the time that actually elapsed,
//! which can be longer than the nominal period when the next period's first
//! event was late.
//!
//! # Feature Flag
//!
//! With the `serde` feature the statistic derives `Serialize` and
//! `Deserialize`:
//!
//! ```toml
//! [dependencies]
//! tassi = { version = "0.1", features = ["serde"] }
//! ```

use std::fmt;

use chrono::{Local, TimeZone};

use crate::counters::bucketer::Bucket;

/// Events counted over one completed period.
///
/// # Examples
///
/// ```rust
/// use tassi::statistic::RateStatistic;
///
/// let stat = RateStatistic {
///     window_start: 0,
///     window_end: 1_060,
///     event_count: 18,
///     period_index: 0,
///     next_period_index: 1,
///     period_millis: 1_000,
/// };
/// assert!((stat.rate() - 16.9811).abs() < 1e-4);
/// assert!(stat.to_string().starts_with("[total trn: 18, tps: 16.9811 trn/s (from "));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateStatistic {
    /// Start time (ms since the epoch) of the retired bucket.
    pub window_start: u64,
    /// Start time of the bucket that followed it.
    pub window_end: u64,
    /// Events attributed to the retired bucket.
    pub event_count: u64,
    /// Period index of the retired bucket.
    pub period_index: u64,
    /// Period index of the following bucket.
    pub next_period_index: u64,
    /// Nominal period length of the counter.
    pub period_millis: u64,
}

impl RateStatistic {
    /// Builds the statistic of `retired`, closed by the start of `next`.
    pub fn between(retired: &Bucket, next: &Bucket, period_millis: u64) -> Self {
        RateStatistic {
            window_start: retired.start_time(),
            window_end: next.start_time(),
            event_count: retired.count(),
            period_index: retired.period_index(),
            next_period_index: next.period_index(),
            period_millis,
        }
    }

    /// Length of the measured window in milliseconds.
    #[inline]
    pub fn window_millis(&self) -> u64 {
        self.window_end.saturating_sub(self.window_start)
    }

    /// Events per second over the window. A zero-length window yields `0.0`.
    pub fn rate(&self) -> f64 {
        let secs = self.window_millis() as f64 / 1000.0;
        if secs > 0.0 {
            self.event_count as f64 / secs
        } else {
            0.0
        }
    }

    /// Number of periods between this bucket and the next that had no events.
    ///
    /// Buckets only exist for periods with at least one event, so a gap in the
    /// period indices means zero activity, not lost data.
    #[inline]
    pub fn skipped_periods(&self) -> u64 {
        self.next_period_index
            .saturating_sub(self.period_index)
            .saturating_sub(1)
    }
}

/// Renders a timestamp as local time of day, `HH:MM:SS.mmm`.
fn time_of_day(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .map(|t| t.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| millis.to_string())
}

impl fmt::Display for RateStatistic {
    /// Formats the statistic as a log fragment:
    /// `[total trn: 18, tps: 16.9811 trn/s (from 10:00:00.000 to 10:00:01.060)]`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[total trn: {}, tps: {:.4} trn/s (from {} to {})]",
            self.event_count,
            self.rate(),
            time_of_day(self.window_start),
            time_of_day(self.window_end)
        )
    }
}
