// Timers - Delayed, cancellable tasks on a millisecond time base
//
// The metronome never blocks: everything that happens later is a task in a
// `TimerQueue`, and whoever owns the queue pops due tasks when polled.
// Time comes from a `Clock`, so tests can drive virtual time by hand.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of "now", in milliseconds since an arbitrary origin
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by `Instant`
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests and offline rendering
///
/// Clones share the same time, so a test keeps one handle and gives another
/// to the controller. The f64 is stored as bits in an atomic.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_bits: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: f64) {
        self.now_bits.store(now_ms.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.set(self.now_ms() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now_bits.load(Ordering::Relaxed))
    }
}

/// Handle returned by `TimerQueue::schedule`, used to cancel the task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

struct Entry<T> {
    due_ms: f64,
    handle: TimerHandle,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    // Reversed so the max-heap yields the earliest deadline first,
    // insertion order breaking ties.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .due_ms
            .total_cmp(&self.due_ms)
            .then_with(|| other.handle.0.cmp(&self.handle.0))
    }
}

/// Priority queue of delayed tasks
pub struct TimerQueue<T> {
    heap: BinaryHeap<Entry<T>>,
    next_id: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_id: 0,
        }
    }

    /// Schedule `task` to run `delay_ms` after `now_ms`
    ///
    /// Negative delays are treated as zero.
    pub fn schedule(&mut self, now_ms: f64, delay_ms: f64, task: T) -> TimerHandle {
        self.schedule_at(now_ms + delay_ms.max(0.0), task)
    }

    /// Schedule `task` at an absolute deadline
    pub fn schedule_at(&mut self, due_ms: f64, task: T) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.heap.push(Entry {
            due_ms,
            handle,
            task,
        });
        handle
    }

    /// Cancel one task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.heap.len();
        self.heap.retain(|entry| entry.handle != handle);
        self.heap.len() != before
    }

    /// Cancel every pending task
    pub fn cancel_all(&mut self) {
        self.heap.clear();
    }

    /// Deadline of the earliest pending task
    pub fn next_due_ms(&self) -> Option<f64> {
        self.heap.peek().map(|entry| entry.due_ms)
    }

    /// Remove and return the earliest task if it is due at `now_ms`
    pub fn pop_due(&mut self, now_ms: f64) -> Option<(f64, TimerHandle, T)> {
        if self.next_due_ms()? > now_ms {
            return None;
        }
        self.heap
            .pop()
            .map(|entry| (entry.due_ms, entry.handle, entry.task))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
