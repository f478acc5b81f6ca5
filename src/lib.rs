//! # Tassi - Bucketed Throughput Counters
//!
//! A Rust library for measuring the throughput of hot code paths (requests,
//! messages, transactions) without adding lock contention or unbounded memory
//! to them. Callers record one event per business operation; once per period
//! one of those calls returns a ready-made summary of the period that just
//! completed:
//!
//! ```text
//! Receive MT message, id 1616973592, [total trn: 475, tps: 8.0508 trn/s (from 11:39:06.492 to 11:40:06.439)]
//! Receive MT message, id 1616974408, [total trn: 460, tps: 7.7966 trn/s (from 11:40:06.439 to 11:41:06.433)]
//! ```
//!
//! Grepping the log for `tps` then shows the load of the application period
//! by period.
//!
//! ## How It Works
//!
//! Time since the counter was created is cut into periods. The first event
//! of a period creates a bucket for it; every other event of the period
//! increments that bucket. The caller that opens a new bucket retires the
//! oldest queued bucket and turns it into a [`RateStatistic`](statistic::RateStatistic):
//!
//! ```text
//!   period:      0          1          2          3
//!             ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐
//!   queue:    │ 10 evt │ │  9 evt │ │ 11 evt │ │ current│
//!             └────────┘ └────────┘ └────────┘ └────────┘
//!                 │  retired by the first event of period 2 (FullAccuracy)
//!                 ▼  or of period 1 (LowLatency)
//!   [total trn: 10, tps: 10.0000 trn/s (from 10:00:00.000 to 10:00:01.000)]
//! ```
//!
//! ### Design Principles
//!
//! 1. **Sharded hot path**: an ordinary event takes the calling thread's read
//!    shard of a [`ShardedLock`](crossbeam_utils::sync::ShardedLock) and does
//!    one relaxed increment of a cache-padded, per-thread slot. The read shard
//!    only blocks while a new period's bucket is being installed.
//!
//! 2. **Narrow cold path**: a mutex guards the bucket queue and is taken once
//!    per period boundary and once per report. Statistics are computed and
//!    rendered outside of it.
//!
//! 3. **Exactly-once reports**: each bucket has exactly one opening caller,
//!    and each opener retires at most one bucket, so every period is reported
//!    once and the queue stays at the mode's threshold.
//!
//! 4. **Best effort**: nothing fails into business code. Faults go to an
//!    injected [`DiagnosticSink`](diagnostics::DiagnosticSink) and the call
//!    returns no report.
//!
//! ## Quick Start
//!
//! ```rust
//! use tassi::period::Period;
//! use tassi::TpsCounter;
//!
//! let counter = TpsCounter::for_period(Period::Minute).with_name("mt_messages");
//!
//! // In the request path:
//! if let Some(tps) = counter.record_event() {
//!     log::info!("Receive MT message, {}", tps);
//! }
//!
//! // Or read the structured fields of the last report.
//! if let Some(stat) = counter.last_statistic() {
//!     println!("{} events at {:.2}/s", stat.event_count, stat.rate());
//! }
//! ```
//!
//! ## Accuracy Modes
//!
//! | Mode | Threshold | Reports period `k` at | Use Case |
//! |------|-----------|-----------------------|----------|
//! | [`FullAccuracy`](period::Mode::FullAccuracy) | 3 | first event of `k + 2` | second and minute periods |
//! | [`LowLatency`](period::Mode::LowLatency) | 2 | first event of `k + 1` | hour, day and week periods |
//!
//! ## Idle Periods
//!
//! A period without events has no bucket. The statistic of the bucket before
//! it spans the whole idle stretch, and
//! [`skipped_periods`](statistic::RateStatistic::skipped_periods) tells how
//! many periods were empty.

pub mod clock;
pub mod counters;
pub mod diagnostics;
pub mod error;
pub mod period;
pub mod statistic;

pub use counters::reporter::{PeriodCounter, TpsCounter};
pub use error::{CounterError, Result};
