//! Timer heap entries.

use std::rc::Rc;
use std::time::{Duration, Instant};

use tern_vm_core::timeout::TimeoutHandle;
use tern_vm_core::Value;

/// A scheduled callback. Cancelled entries stay in the heap as tombstones
/// (the cancellation flag lives on the shared [`TimeoutHandle`]) and are
/// skipped at extraction.
pub struct Timer {
    pub deadline: Instant,
    /// Insertion sequence; equal deadlines fire FIFO.
    pub seq: u64,
    pub callback: Value,
    pub args: Vec<Value>,
    pub handle: Rc<TimeoutHandle>,
    /// Present for `setInterval`: the entry reschedules after each run.
    pub interval: Option<Duration>,
}

/// Heap key: min-ordered by `(deadline, seq)` on top of `BinaryHeap`'s
/// max-heap.
pub struct TimerHeapEntry(pub Timer);

impl PartialEq for TimerHeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.deadline == other.0.deadline && self.0.seq == other.0.seq
    }
}

impl Eq for TimerHeapEntry {}

impl PartialOrd for TimerHeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerHeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // reversed: the heap's max is the earliest deadline
        other
            .0
            .deadline
            .cmp(&self.0.deadline)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}
