//! Rate reporter: the counter callers record events into.
//!
//! [`PeriodCounter`] combines the hot-path increment with an at-most-once
//! report per period. The caller whose increment opens a new bucket becomes
//! the sole reporter for the oldest queued bucket, provided the queue has
//! reached the [`Mode`] threshold. Every other call does one increment and
//! returns nothing.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use tassi::clock::ManualClock;
//! use tassi::period::{Mode, Period};
//! use tassi::TpsCounter;
//!
//! let clock = Arc::new(ManualClock::new(0));
//! let counter = TpsCounter::new(Period::Second, Mode::LowLatency)
//!     .with_name("requests")
//!     .with_clock(clock.clone());
//!
//! for _ in 0..10 {
//!     assert_eq!(counter.record_event(), None);
//!     clock.advance(100);
//! }
//!
//! // First event of period 1 reports period 0.
//! let line = counter.record_event().unwrap();
//! assert!(line.starts_with("[total trn: 10, tps: 10.0000 trn/s"));
//! assert_eq!(counter.last_statistic().unwrap().event_count, 10);
//! ```

use std::fmt::{self, Debug, Display};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::clock::{Clock, SystemClock};
use crate::counters::bucketer::{Bucket, PeriodBucketer, Retirement};
use crate::diagnostics::{DiagnosticSink, LogSink};
use crate::error::Result;
use crate::period::{Mode, Period};
use crate::statistic::RateStatistic;

/// Builds a statistic from a retired bucket, the bucket that follows it and
/// the nominal period length in milliseconds.
pub type Strategy<S> = Box<dyn Fn(&Bucket, &Bucket, u64) -> S + Send + Sync>;

/// A bucketed counter that reports one statistic per completed period.
///
/// `S` is the statistic produced by the counter's [`Strategy`]. The common
/// case is [`TpsCounter`], which produces a [`RateStatistic`].
///
/// The counter is `Send + Sync`; share it between threads with `Arc` or keep
/// it in a `static` behind a lazy initializer.
pub struct PeriodCounter<S> {
    name: &'static str,
    period: Period,
    mode: Mode,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn DiagnosticSink>,
    bucketer: PeriodBucketer,
    strategy: Strategy<S>,
    /// Last statistic, keyed by the period index it was built from.
    last: Mutex<Option<(u64, S)>>,
}

/// Counter of events per second over each completed period.
pub type TpsCounter = PeriodCounter<RateStatistic>;

impl TpsCounter {
    /// Creates a rate counter with an explicit mode.
    ///
    /// The counter origin, the start of period 0, is now.
    pub fn new(period: Period, mode: Mode) -> Self {
        Self::with_strategy(period, mode, RateStatistic::between)
    }

    /// Creates a rate counter with the period's [default mode](Period::default_mode).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tassi::period::{Mode, Period};
    /// use tassi::TpsCounter;
    ///
    /// assert_eq!(TpsCounter::for_period(Period::Minute).mode(), Mode::FullAccuracy);
    /// assert_eq!(TpsCounter::for_period(Period::Day).mode(), Mode::LowLatency);
    /// ```
    pub fn for_period(period: Period) -> Self {
        Self::new(period, period.default_mode())
    }
}

impl<S: Clone> PeriodCounter<S> {
    /// Creates a counter producing statistics through `strategy`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tassi::counters::reporter::PeriodCounter;
    /// use tassi::period::{Mode, Period};
    ///
    /// // Only keep the raw event count.
    /// let counter = PeriodCounter::with_strategy(Period::Second, Mode::FullAccuracy, |retired, _, _| {
    ///     retired.count()
    /// });
    /// assert_eq!(counter.record_statistic(), None);
    /// ```
    pub fn with_strategy<F>(period: Period, mode: Mode, strategy: F) -> Self
    where
        F: Fn(&Bucket, &Bucket, u64) -> S + Send + Sync + 'static,
    {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        PeriodCounter {
            name: "",
            period,
            mode,
            bucketer: PeriodBucketer::new(period.millis(), clock.now_millis()),
            clock,
            sink: Arc::new(LogSink),
            strategy: Box::new(strategy),
            last: Mutex::new(None),
        }
    }

    /// Sets the name used in diagnostics, returning `self` for chaining.
    pub fn with_name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    /// Replaces the time source. The counter origin is re-read from `clock`.
    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self {
            bucketer: PeriodBucketer::new(self.period.millis(), clock.now_millis()),
            clock,
            ..self
        }
    }

    /// Replaces the diagnostic sink (default: [`LogSink`]).
    pub fn with_sink(self, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink, ..self }
    }

    /// Returns the counter name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the period length.
    #[inline]
    pub fn period(&self) -> Period {
        self.period
    }

    /// Returns the accuracy mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Records one event and returns the statistic of a completed period, if
    /// this call is the one that reports it.
    ///
    /// Errors are returned as-is; [`record_statistic`](Self::record_statistic)
    /// and [`record_event`](Self::record_event) suppress them.
    pub fn try_record_event(&self) -> Result<Option<S>> {
        let now = self.clock.now_millis();
        if !self.bucketer.record(now)? {
            return Ok(None);
        }

        let threshold = self.mode.threshold();
        let Some(Retirement {
            retired,
            next,
            remaining,
        }) = self.bucketer.retire_oldest(threshold)?
        else {
            return Ok(None);
        };
        if remaining > threshold {
            self.sink.backlog_exceeded(self.name, remaining, threshold);
        }

        let statistic = (self.strategy)(&retired, &next, self.period.millis());
        self.store_last(retired.period_index(), &statistic);
        Ok(Some(statistic))
    }

    /// Records one event, returning a statistic when this call reports one.
    ///
    /// Never fails: errors go to the diagnostic sink and yield `None`.
    pub fn record_statistic(&self) -> Option<S> {
        match self.try_record_event() {
            Ok(statistic) => statistic,
            Err(err) => {
                self.sink.fault(self.name, &err);
                None
            }
        }
    }

    /// Returns the most recent statistic, or `None` before the first report.
    pub fn last_statistic(&self) -> Option<S> {
        self.lock_last()
            .as_ref()
            .map(|(_, statistic)| statistic.clone())
    }

    /// Number of buckets queued, the current one included.
    pub fn backlog(&self) -> Result<usize> {
        self.bucketer.len()
    }

    /// Events counted in buckets that have not been reported yet.
    pub fn pending_events(&self) -> Result<u64> {
        self.bucketer.pending_events()
    }

    /// Keeps the statistic of the newest period when reporters race.
    fn store_last(&self, period_index: u64, statistic: &S) {
        let mut last = self.lock_last();
        if last.as_ref().map_or(true, |(index, _)| *index < period_index) {
            *last = Some((period_index, statistic.clone()));
        }
    }

    /// Recovers a poisoned lock: the cached value is only ever replaced whole.
    fn lock_last(&self) -> MutexGuard<'_, Option<(u64, S)>> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Clone + Display> PeriodCounter<S> {
    /// Records one event. Returns the rendered statistic when this call
    /// reports a completed period, ready to be appended to a log line.
    ///
    /// This is the call to make once per business event. It never fails and
    /// never blocks on I/O; silence is the only symptom of an internal fault.
    #[inline]
    pub fn record_event(&self) -> Option<String> {
        self.record_statistic().map(|statistic| statistic.to_string())
    }
}

impl<S> Debug for PeriodCounter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodCounter")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("mode", &self.mode)
            .field("bucketer", &self.bucketer)
            .finish()
    }
}
