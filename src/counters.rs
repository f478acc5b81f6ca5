//! Period counters and the sharding infrastructure behind them.
//!
//! A counter is split in two layers:
//!
//! - [`bucketer`]: maps a timestamp to the bucket of its period, creating
//!   buckets on demand and retiring the oldest one on request.
//! - [`reporter`]: the entry point. Increments the current bucket and, for the
//!   single caller that opened a new bucket, retires and reports the oldest
//!   sealed one.
//!
//! # Sharded Buckets
//!
//! Every bucket stores its count in `NUM_COMPONENTS` cache-padded slots. Each
//! thread is assigned one slot, so concurrent increments of the same bucket
//! hit different cache lines:
//!
//! ```text
//!                          ┌─────────────────────────────────────┐
//!                          │        Bucket (period index k)      │
//!                          ├─────────────────────────────────────┤
//!   Thread 0 ──writes──►   │ [Slot 0] ████████ (CachePadded)     │
//!   Thread 1 ──writes──►   │ [Slot 1] ████████ (CachePadded)     │
//!        ...               │    ...                              │
//!   Thread 63 ─writes──►   │ [Slot 63] ███████ (CachePadded)     │
//!                          └─────────────────────────────────────┘
//!                                          │
//!                                          ▼
//!                                 count() sums the slots
//!                                 once the bucket is retired
//! ```
//!
//! Slots are assigned round-robin. After 64 threads the assignment wraps and
//! threads share slots, which costs contention but never correctness.

pub mod bucketer;
pub mod reporter;

use std::sync::atomic::{AtomicUsize, Ordering};

/// Number of slots per bucket.
///
/// A power of two, large enough that typical thread pools never share a slot.
/// At 64 bytes per padded slot a bucket weighs about 4KB, and a counter holds
/// only a handful of buckets at a time.
pub(crate) const NUM_COMPONENTS: usize = 64;

static NEXT_SLOT_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Slot index of the current thread, assigned on first use.
    pub(crate) static THREAD_SLOT_INDEX: usize = next_slot_id();
}

/// Assigns the next slot id, in `[0, NUM_COMPONENTS)`.
///
/// Relaxed ordering: two threads landing on the same slot only adds
/// contention.
fn next_slot_id() -> usize {
    NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed) % NUM_COMPONENTS
}
