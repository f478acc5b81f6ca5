//! Period bucketer: attributes events to elapsed-time buckets.
//!
//! The bucketer owns the queue of in-flight buckets (oldest first) and a
//! reference to the current one. Buckets are created lazily by the first
//! event of a period; a period without events never gets a bucket, so
//! consecutive buckets can have period indices more than one apart.
//!
//! # Synchronization
//!
//! ```text
//!   hot path    current.read() ──► bucket.increment()            (per-thread shard)
//!   rollover    queue.lock() ──► push_back ──► current.write()   (once per period)
//!   retirement  queue.lock() ──► pop_front                       (once per report)
//! ```
//!
//! The current reference lives in a [`ShardedLock`], so the hot path only
//! touches the calling thread's read shard. Increments happen while that read
//! guard is held. Rollover swaps the reference under the write side, which
//! waits until every in-flight increment of the previous bucket is done: once
//! a newer bucket is current, the older one is sealed. Increments that go
//! through the slow path are applied while the queue mutex is held, so they
//! are sealed by the same mutex that guards retirement.

use std::collections::VecDeque;
use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_utils::sync::ShardedLock;
use crossbeam_utils::CachePadded;

use crate::counters::{NUM_COMPONENTS, THREAD_SLOT_INDEX};
use crate::error::{CounterError, Result};

/// All events observed during one elapsed-time period.
pub struct Bucket {
    start_time: u64,
    period_index: u64,
    components: [CachePadded<AtomicU64>; NUM_COMPONENTS],
    opened: AtomicBool,
}

impl Bucket {
    fn new(start_time: u64, period_index: u64) -> Self {
        const ZERO: CachePadded<AtomicU64> = CachePadded::new(AtomicU64::new(0));
        Bucket {
            start_time,
            period_index,
            components: [ZERO; NUM_COMPONENTS],
            opened: AtomicBool::new(false),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(start_time: u64, period_index: u64, count: u64) -> Self {
        let bucket = Self::new(start_time, period_index);
        bucket.components[0].store(count, Ordering::Relaxed);
        bucket
    }

    /// Timestamp (ms since the epoch) of the event that created the bucket.
    #[inline]
    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    /// Whole periods elapsed since the counter origin when the bucket was created.
    #[inline]
    pub fn period_index(&self) -> u64 {
        self.period_index
    }

    /// Sums the slots.
    ///
    /// Exact once the bucket is sealed; while it is current the sum may miss
    /// increments that are in flight.
    pub fn count(&self) -> u64 {
        self.components
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .sum()
    }

    /// Counts one event. Returns `true` for exactly one caller per bucket,
    /// the one that opened it (the 0 -> 1 transition of the count).
    #[inline]
    pub(crate) fn increment(&self) -> bool {
        THREAD_SLOT_INDEX.with(|idx| self.components[*idx].fetch_add(1, Ordering::Relaxed));
        // The plain load keeps the flag's cache line shared after the first event.
        !self.opened.load(Ordering::Relaxed) && !self.opened.swap(true, Ordering::AcqRel)
    }
}

impl Debug for Bucket {
    /// Formats the bucket showing non-zero slots only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}{{", self.period_index, self.start_time)?;
        for (i, slot) in self.components.iter().enumerate() {
            let val = slot.load(Ordering::Relaxed);
            if val != 0 {
                write!(f, " [{i}]:{val}")?;
            }
        }
        write!(f, " }}")
    }
}

/// The oldest bucket, removed from the queue, with the bucket that follows it.
#[derive(Debug)]
pub struct Retirement {
    /// The removed bucket. Sealed: no increment can still reach it.
    pub retired: Arc<Bucket>,
    /// The new head of the queue. Its start time closes the retired window.
    pub next: Arc<Bucket>,
    /// Queue length after the removal.
    pub remaining: usize,
}

/// Maps timestamps to buckets and owns the bucket queue.
pub struct PeriodBucketer {
    period_millis: u64,
    origin: u64,
    current: ShardedLock<Option<Arc<Bucket>>>,
    queue: Mutex<VecDeque<Arc<Bucket>>>,
}

impl PeriodBucketer {
    /// Creates an empty bucketer whose period 0 starts at `origin`.
    ///
    /// `period_millis` must be non-zero; [`Period`](crate::period::Period)
    /// guarantees it.
    pub fn new(period_millis: u64, origin: u64) -> Self {
        debug_assert!(period_millis > 0);
        PeriodBucketer {
            period_millis: period_millis.max(1),
            origin,
            current: ShardedLock::new(None),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Timestamp at which period 0 starts.
    #[inline]
    pub fn origin(&self) -> u64 {
        self.origin
    }

    /// Returns the period index of `now`, and `now` clamped to the origin.
    ///
    /// A timestamp before the origin (clock stepped back) counts as the origin.
    #[inline]
    pub fn period_of(&self, now: u64) -> (u64, u64) {
        let now = now.max(self.origin);
        (now, (now - self.origin) / self.period_millis)
    }

    /// Returns the bucket covering `now`, creating it if its period has begun.
    ///
    /// Concurrent callers that see the same new period all receive the same
    /// bucket.
    pub fn current_bucket(&self, now: u64) -> Result<Arc<Bucket>> {
        self.with_current(now, Arc::clone)
    }

    /// Counts one event at `now`. Returns `true` if it opened its bucket.
    #[inline]
    pub fn record(&self, now: u64) -> Result<bool> {
        self.with_current(now, |bucket| bucket.increment())
    }

    /// Runs `f` on the bucket covering `now` while that bucket cannot be
    /// replaced as current.
    fn with_current<R>(&self, now: u64, f: impl FnOnce(&Arc<Bucket>) -> R) -> Result<R> {
        let (now, index) = self.period_of(now);
        {
            let current = self
                .current
                .read()
                .map_err(|_| CounterError::Poisoned("current bucket"))?;
            if let Some(bucket) = current.as_ref() {
                if bucket.period_index >= index {
                    return Ok(f(bucket));
                }
            }
        }
        self.roll_over(now, index, f)
    }

    /// Slow path: appends a bucket for `index` unless another thread already did.
    #[cold]
    fn roll_over<R>(&self, now: u64, index: u64, f: impl FnOnce(&Arc<Bucket>) -> R) -> Result<R> {
        let mut queue = self.lock_queue()?;
        if let Some(tail) = queue.back() {
            // A straggler from an older period lands in the newest bucket.
            if tail.period_index >= index {
                return Ok(f(tail));
            }
        }

        let bucket = Arc::new(Bucket::new(now, index));
        queue.push_back(Arc::clone(&bucket));
        *self
            .current
            .write()
            .map_err(|_| CounterError::Poisoned("current bucket"))? = Some(Arc::clone(&bucket));
        Ok(f(&bucket))
    }

    /// Removes the oldest bucket if the queue holds at least `min_len` buckets.
    ///
    /// Returns `None` when the queue is shorter. `min_len` is clamped to 2 so
    /// a successor always exists.
    pub fn retire_oldest(&self, min_len: usize) -> Result<Option<Retirement>> {
        let mut queue = self.lock_queue()?;
        if queue.len() < min_len.max(2) {
            return Ok(None);
        }
        let retired = queue.pop_front().ok_or(CounterError::MissingBoundary)?;
        let next = queue.front().cloned().ok_or(CounterError::MissingBoundary)?;
        Ok(Some(Retirement {
            retired,
            next,
            remaining: queue.len(),
        }))
    }

    /// Number of queued buckets, the current one included.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock_queue()?.len())
    }

    /// Returns `true` before the first event.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock_queue()?.is_empty())
    }

    /// Sum of the counts of every queued bucket.
    pub fn pending_events(&self) -> Result<u64> {
        Ok(self.lock_queue()?.iter().map(|bucket| bucket.count()).sum())
    }

    #[cfg(test)]
    pub(crate) fn poison_queue(&self) {
        std::thread::scope(|s| {
            let _ = s
                .spawn(|| {
                    let _guard = self.queue.lock().unwrap();
                    panic!("poison");
                })
                .join();
        });
    }

    fn lock_queue(&self) -> Result<MutexGuard<'_, VecDeque<Arc<Bucket>>>> {
        self.queue
            .lock()
            .map_err(|_| CounterError::Poisoned("bucket queue"))
    }
}

impl Debug for PeriodBucketer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("PeriodBucketer");
        s.field("period_millis", &self.period_millis)
            .field("origin", &self.origin);
        match self.queue.try_lock() {
            Ok(queue) => s.field("queue", &*queue),
            Err(_) => s.field("queue", &"<locked>"),
        };
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const ORIGIN: u64 = 1_000_000;

    #[test]
    fn test_first_event_creates_bucket() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        assert!(bucketer.is_empty().unwrap());

        let bucket = bucketer.current_bucket(ORIGIN + 10).unwrap();
        assert_eq!(bucket.period_index(), 0);
        assert_eq!(bucket.start_time(), ORIGIN + 10);
        assert_eq!(bucketer.len().unwrap(), 1);
    }

    #[test]
    fn test_same_period_reuses_bucket() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        let a = bucketer.current_bucket(ORIGIN).unwrap();
        let b = bucketer.current_bucket(ORIGIN + 999).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(bucketer.len().unwrap(), 1);
    }

    #[test]
    fn test_rollover_appends() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        bucketer.current_bucket(ORIGIN).unwrap();
        let next = bucketer.current_bucket(ORIGIN + 1000).unwrap();
        assert_eq!(next.period_index(), 1);
        assert_eq!(next.start_time(), ORIGIN + 1000);
        assert_eq!(bucketer.len().unwrap(), 2);
    }

    #[test]
    fn test_idle_periods_leave_a_gap() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        bucketer.current_bucket(ORIGIN).unwrap();
        let later = bucketer.current_bucket(ORIGIN + 4_500).unwrap();
        assert_eq!(later.period_index(), 4);
        assert_eq!(bucketer.len().unwrap(), 2);
    }

    #[test]
    fn test_timestamp_before_origin_is_clamped() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        assert_eq!(bucketer.period_of(ORIGIN - 5_000), (ORIGIN, 0));

        let bucket = bucketer.current_bucket(0).unwrap();
        assert_eq!(bucket.period_index(), 0);
        assert_eq!(bucket.start_time(), ORIGIN);
    }

    #[test]
    fn test_late_timestamp_uses_newest_bucket() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        bucketer.current_bucket(ORIGIN).unwrap();
        let newest = bucketer.current_bucket(ORIGIN + 2_000).unwrap();
        let late = bucketer.current_bucket(ORIGIN + 500).unwrap();
        assert!(Arc::ptr_eq(&newest, &late));
        assert_eq!(bucketer.len().unwrap(), 2);
    }

    #[test]
    fn test_record_reports_first_event_once() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        assert!(bucketer.record(ORIGIN).unwrap());
        assert!(!bucketer.record(ORIGIN + 1).unwrap());
        assert!(!bucketer.record(ORIGIN + 2).unwrap());
        assert!(bucketer.record(ORIGIN + 1000).unwrap());
        assert_eq!(bucketer.pending_events().unwrap(), 4);
    }

    #[test]
    fn test_retire_oldest_requires_min_len() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        bucketer.record(ORIGIN).unwrap();
        assert!(bucketer.retire_oldest(2).unwrap().is_none());
        // Never retires the only bucket, whatever the caller asks for.
        assert!(bucketer.retire_oldest(0).unwrap().is_none());

        bucketer.record(ORIGIN + 1000).unwrap();
        assert!(bucketer.retire_oldest(3).unwrap().is_none());

        let retirement = bucketer.retire_oldest(2).unwrap().unwrap();
        assert_eq!(retirement.retired.period_index(), 0);
        assert_eq!(retirement.retired.count(), 1);
        assert_eq!(retirement.next.period_index(), 1);
        assert_eq!(retirement.remaining, 1);
        assert_eq!(bucketer.len().unwrap(), 1);
    }

    #[test]
    fn test_concurrent_rollover_creates_one_bucket() {
        let bucketer = Arc::new(PeriodBucketer::new(1000, ORIGIN));
        bucketer.record(ORIGIN).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let b = Arc::clone(&bucketer);
                thread::spawn(move || b.current_bucket(ORIGIN + 1_500).unwrap())
            })
            .collect();
        let buckets: Vec<Arc<Bucket>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        for bucket in &buckets {
            assert!(Arc::ptr_eq(bucket, &buckets[0]));
        }
        assert_eq!(bucketer.len().unwrap(), 2);
    }

    #[test]
    fn test_concurrent_record_single_opener() {
        let bucketer = Arc::new(PeriodBucketer::new(1000, ORIGIN));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let b = Arc::clone(&bucketer);
                thread::spawn(move || {
                    (0..1000)
                        .filter(|_| b.record(ORIGIN + 100).unwrap())
                        .count()
                })
            })
            .collect();
        let openers: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(openers, 1);
        assert_eq!(bucketer.pending_events().unwrap(), 8000);
    }

    #[test]
    fn test_poisoned_queue_is_an_error() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        bucketer.poison_queue();
        assert_eq!(
            bucketer.record(ORIGIN),
            Err(CounterError::Poisoned("bucket queue"))
        );
        assert!(bucketer.retire_oldest(2).is_err());
    }

    #[test]
    fn test_debug() {
        let bucketer = PeriodBucketer::new(1000, ORIGIN);
        bucketer.record(ORIGIN).unwrap();
        let debug_str = format!("{:?}", bucketer);
        assert!(debug_str.contains("period_millis: 1000"));
        assert!(debug_str.contains("#0@1000000"));
    }
}
