//! Error type for counter operations.
//!
//! Errors produced inside a counter never reach the caller of
//! [`record_event`](crate::counters::reporter::PeriodCounter::record_event):
//! they are handed to the counter's [`DiagnosticSink`](crate::diagnostics::DiagnosticSink)
//! and the call degrades to "no report". [`try_record_event`](crate::counters::reporter::PeriodCounter::try_record_event)
//! exposes them for callers that want to see what went wrong.

use thiserror::Error;

/// Errors raised by the bucketing and reporting machinery.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// A lock was poisoned by a thread that panicked while holding it.
    #[error("{0} lock poisoned")]
    Poisoned(&'static str),

    /// A period length of zero milliseconds was requested.
    #[error("invalid period length: {0} ms")]
    InvalidPeriod(u64),

    /// A bucket was retired without a successor to bound its window.
    #[error("retired bucket has no successor")]
    MissingBoundary,
}

/// Result type for counter operations.
pub type Result<T> = std::result::Result<T, CounterError>;
