//! Diagnostic sinks.
//!
//! A counter never decides how its anomalies are surfaced. It reports them to
//! the [`DiagnosticSink`] it was built with; the default [`LogSink`] forwards
//! to the [`log`] facade, so whatever logger the application installed
//! receives them.

use std::fmt::Debug;

use crate::error::CounterError;

/// Receiver for anomalies detected by a counter.
///
/// Implementations must be cheap and must not call back into the counter.
pub trait DiagnosticSink: Debug + Send + Sync {
    /// The bucket queue is longer than the mode's threshold after a
    /// retirement. Periods are being created faster than they are retired,
    /// so the queue will keep growing.
    fn backlog_exceeded(&self, counter: &str, backlog: usize, threshold: usize);

    /// A recording call failed and was suppressed.
    fn fault(&self, counter: &str, error: &CounterError);
}

/// Sink that writes through the `log` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn backlog_exceeded(&self, counter: &str, backlog: usize, threshold: usize) {
        log::warn!(
            "counter {:?}: bucket backlog {} exceeds threshold {}, buckets may leak",
            counter,
            backlog,
            threshold
        );
    }

    fn fault(&self, counter: &str, error: &CounterError) {
        log::error!("counter {:?}: record_event suppressed: {}", counter, error);
    }
}
