//! The event loop: a virtual-timer min-heap plus the async-handle registry,
//! drained cooperatively on the main thread.

use std::rc::Rc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use std::collections::BinaryHeap;
use tracing::{debug, trace};

use tern_vm_core::interp::SyncCx;
use tern_vm_core::timeout::TimeoutHandle;
use tern_vm_core::{EventLoopHook, Interpreter, Value, VmResult};

use crate::handles::HandleRegistry;
use crate::timer::{Timer, TimerHeapEntry};

/// Heap rebuild threshold: compact when tombstones outnumber live timers
/// and the heap has grown past this many entries.
const REBUILD_MIN_LEN: usize = 64;

/// Longest single sleep while waiting on handles with no timer deadline.
const HANDLE_WAIT: Duration = Duration::from_millis(50);

#[derive(Default)]
struct LoopInner {
    heap: BinaryHeap<TimerHeapEntry>,
    /// id -> handle, for numeric `clearTimeout` arguments.
    by_id: FxHashMap<u64, Rc<TimeoutHandle>>,
    next_id: u64,
    next_seq: u64,
}

/// The loop. Timer creation/cancellation can race the loop's own wake
/// signal, so the heap sits under a lock; callbacks always execute outside
/// it.
pub struct EventLoop {
    inner: Mutex<LoopInner>,
    wake: Condvar,
    pub handles: HandleRegistry,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoop {
    pub fn new() -> Self {
        Self { inner: Mutex::new(LoopInner::default()), wake: Condvar::new(), handles: HandleRegistry::new() }
    }

    /// Schedule a timer. Returns the user-visible handle.
    pub fn schedule(
        &self,
        callback: Value,
        args: Vec<Value>,
        delay_ms: f64,
        interval: bool,
    ) -> Rc<TimeoutHandle> {
        let delay = Duration::from_millis(delay_ms.max(0.0) as u64);
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        inner.next_seq += 1;
        let handle = Rc::new(TimeoutHandle::new(inner.next_id, interval));
        let seq = inner.next_seq;
        inner.by_id.insert(handle.id, handle.clone());
        inner.heap.push(TimerHeapEntry(Timer {
            deadline: Instant::now() + delay,
            seq,
            callback,
            args,
            handle: handle.clone(),
            interval: interval.then_some(delay),
        }));
        trace!(id = handle.id, delay_ms, interval, "timer scheduled");
        drop(inner);
        self.wake.notify_all();
        handle
    }

    /// Cancel by handle value or numeric id. The entry becomes a tombstone,
    /// honored at extraction and at delayed-fire time.
    pub fn clear(&self, target: &Value) {
        let handle = match target {
            Value::Ref(tern_vm_core::HeapRef::Timeout(t)) => Some(t.clone()),
            Value::Number(n) => self.inner.lock().by_id.get(&(*n as u64)).cloned(),
            _ => None,
        };
        if let Some(handle) = handle {
            trace!(id = handle.id, "timer cancelled");
            handle.cancel();
            self.maybe_rebuild();
        }
        self.wake.notify_all();
    }

    /// Compact the heap when cancellations dominate it.
    fn maybe_rebuild(&self) {
        let mut inner = self.inner.lock();
        if inner.heap.len() < REBUILD_MIN_LEN {
            return;
        }
        let live = inner.heap.iter().filter(|e| !e.0.handle.is_cancelled()).count();
        if live * 2 < inner.heap.len() {
            debug!(total = inner.heap.len(), live, "compacting timer heap");
            let entries: Vec<TimerHeapEntry> = std::mem::take(&mut inner.heap).into_vec();
            inner.heap = entries.into_iter().filter(|e| !e.0.handle.is_cancelled()).collect();
            let cancelled_ids: Vec<u64> =
                inner.by_id.iter().filter(|(_, h)| h.is_cancelled()).map(|(id, _)| *id).collect();
            for id in cancelled_ids {
                inner.by_id.remove(&id);
            }
        }
    }

    /// Pop every due, live timer. Cancelled entries are dropped here.
    fn take_due(&self, now: Instant) -> Vec<Timer> {
        let mut inner = self.inner.lock();
        let mut due = Vec::new();
        loop {
            let (cancelled, is_due) = match inner.heap.peek() {
                None => break,
                Some(top) => (top.0.handle.is_cancelled(), top.0.deadline <= now),
            };
            if cancelled {
                let entry = inner.heap.pop().expect("peeked entry exists");
                inner.by_id.remove(&entry.0.handle.id);
                continue;
            }
            if !is_due {
                break;
            }
            due.push(inner.heap.pop().expect("peeked entry exists").0);
        }
        due
    }

    fn next_deadline(&self) -> Option<Instant> {
        let inner = self.inner.lock();
        inner.heap.iter().filter(|e| !e.0.handle.is_cancelled()).map(|e| e.0.deadline).min()
    }

    /// Live (non-cancelled, refed) timers.
    fn live_timers(&self) -> usize {
        self.inner.lock().heap.iter().filter(|e| e.0.handle.is_refed()).count()
    }

    /// Run one due timer's callback. Executes outside the heap lock;
    /// cancellation observed mid-drain skips the callback; intervals
    /// reschedule afterwards.
    fn fire(&self, vm: &mut Interpreter, timer: Timer) -> VmResult<()> {
        if timer.handle.is_cancelled() || vm.is_disposed() {
            self.inner.lock().by_id.remove(&timer.handle.id);
            return Ok(());
        }
        let outcome = vm.call_value(&SyncCx, &timer.callback, Value::Undefined, timer.args.clone());
        if let Err(e) = outcome {
            // an uncaught throw in a timer callback kills that callback, not
            // the process
            vm.write_err(&format!("Runtime Error: {}\n", e.message()));
        }
        vm.run_microtasks()?;
        match timer.interval {
            Some(period) if !timer.handle.is_cancelled() => {
                let mut inner = self.inner.lock();
                inner.next_seq += 1;
                let seq = inner.next_seq;
                inner.heap.push(TimerHeapEntry(Timer { deadline: Instant::now() + period, seq, ..timer }));
            }
            _ => {
                self.inner.lock().by_id.remove(&timer.handle.id);
            }
        }
        Ok(())
    }

    /// Drain everything due right now, without sleeping.
    pub fn poll_now(&self, vm: &mut Interpreter) -> VmResult<()> {
        vm.run_microtasks()?;
        loop {
            let due = self.take_due(Instant::now());
            if due.is_empty() {
                return Ok(());
            }
            for timer in due {
                self.fire(vm, timer)?;
            }
            vm.run_microtasks()?;
        }
    }

    /// One blocking iteration: drain due work, otherwise sleep bounded by
    /// the next deadline (or the handle-wait slice). Returns false when no
    /// timers and no refed handles remain.
    pub fn tick_once(&self, vm: &mut Interpreter) -> VmResult<bool> {
        self.poll_now(vm)?;
        if vm.has_microtasks() {
            return Ok(true);
        }
        let refed_handles = self.handles.refed_count();
        // unrefed timers still fire while the loop lives, but only refed
        // ones keep it alive
        if self.live_timers() == 0 && refed_handles == 0 {
            return Ok(false);
        }
        let wait = match self.next_deadline() {
            Some(deadline) => {
                let now = Instant::now();
                if deadline <= now {
                    return Ok(true);
                }
                (deadline - now).min(HANDLE_WAIT)
            }
            // only handles remain: block on the wake signal in slices
            None if refed_handles > 0 => HANDLE_WAIT,
            None => return Ok(false),
        };
        let mut guard = self.inner.lock();
        self.wake.wait_for(&mut guard, wait);
        drop(guard);
        Ok(true)
    }

    /// Drive until no refed handles and no live timers remain.
    pub fn run_until_idle(&self, vm: &mut Interpreter) -> VmResult<()> {
        debug!("draining event loop");
        while self.tick_once(vm)? {}
        Ok(())
    }

    /// Shutdown: cancel every pending timer and drop loop state.
    pub fn dispose(&self) {
        let mut inner = self.inner.lock();
        for entry in inner.heap.iter() {
            entry.0.handle.cancel();
        }
        inner.heap.clear();
        inner.by_id.clear();
        drop(inner);
        self.wake.notify_all();
    }
}

impl EventLoopHook for EventLoop {
    fn poll(&self, vm: &mut Interpreter) -> VmResult<()> {
        self.poll_now(vm)
    }

    fn tick(&self, vm: &mut Interpreter) -> VmResult<bool> {
        self.tick_once(vm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tern_ast::{Resolutions, TypeMap};
    use tern_vm_core::function::NativeFunction;
    use tern_vm_core::HeapRef;

    fn vm() -> Interpreter {
        Interpreter::new(Rc::new(Resolutions::new()), Rc::new(TypeMap::new()))
    }

    fn counting_callback(hits: Rc<Cell<u32>>) -> Value {
        Value::Ref(HeapRef::Native(NativeFunction::new("cb", move |_vm, _this, _args| {
            hits.set(hits.get() + 1);
            Ok(Value::Undefined)
        })))
    }

    #[test]
    fn due_timer_fires_once() {
        let mut vm = vm();
        let event_loop = EventLoop::new();
        let hits = Rc::new(Cell::new(0));
        event_loop.schedule(counting_callback(hits.clone()), Vec::new(), 0.0, false);
        event_loop.run_until_idle(&mut vm).unwrap();
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn cancelled_timer_is_skipped_at_extraction() {
        let mut vm = vm();
        let event_loop = EventLoop::new();
        let hits = Rc::new(Cell::new(0));
        let handle = event_loop.schedule(counting_callback(hits.clone()), Vec::new(), 0.0, false);
        event_loop.clear(&Value::Ref(HeapRef::Timeout(handle)));
        event_loop.run_until_idle(&mut vm).unwrap();
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn unrefed_timer_does_not_keep_the_loop_alive() {
        let mut vm = vm();
        let event_loop = EventLoop::new();
        let hits = Rc::new(Cell::new(0));
        let handle = event_loop.schedule(counting_callback(hits.clone()), Vec::new(), 200.0, false);
        handle.set_refed(false);
        let started = Instant::now();
        event_loop.run_until_idle(&mut vm).unwrap();
        assert!(started.elapsed() < Duration::from_millis(150));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn refed_handle_keeps_tick_reporting_work() {
        let mut vm = vm();
        let event_loop = EventLoop::new();
        let id = event_loop.handles.register();
        assert!(event_loop.tick_once(&mut vm).unwrap());
        event_loop.handles.set_refed(id, false);
        assert!(!event_loop.tick_once(&mut vm).unwrap());
        event_loop.handles.unregister(id);
    }

    #[test]
    fn dispose_cancels_everything() {
        let mut vm = vm();
        let event_loop = EventLoop::new();
        let hits = Rc::new(Cell::new(0));
        event_loop.schedule(counting_callback(hits.clone()), Vec::new(), 0.0, false);
        event_loop.dispose();
        event_loop.run_until_idle(&mut vm).unwrap();
        assert_eq!(hits.get(), 0);
    }
}
