//! Timeout handles returned by `setTimeout`/`setInterval`.

use std::cell::Cell;

/// The user-visible half of a scheduled timer. The event loop's heap entry
/// holds an `Rc` clone; `clearTimeout` flips `cancelled`, which the loop
/// honors both at extraction and at delayed-fire time.
#[derive(Debug)]
pub struct TimeoutHandle {
    pub id: u64,
    pub is_interval: bool,
    cancelled: Cell<bool>,
    refed: Cell<bool>,
}

impl TimeoutHandle {
    pub fn new(id: u64, is_interval: bool) -> Self {
        Self { id, is_interval, cancelled: Cell::new(false), refed: Cell::new(true) }
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    /// Whether this timer keeps the event loop alive.
    pub fn is_refed(&self) -> bool {
        self.refed.get() && !self.cancelled.get()
    }

    pub fn set_refed(&self, refed: bool) {
        self.refed.set(refed);
    }
}
