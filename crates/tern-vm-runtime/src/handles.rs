//! Async-handle registry: long-lived work that keeps the event loop alive.

use parking_lot::Mutex;

use rustc_hash::FxHashMap;

/// Registered long-lived work items. The loop runs while any refed handle
/// remains; `unref` opts a handle out of keep-alive.
#[derive(Default)]
pub struct HandleRegistry {
    inner: Mutex<HandleInner>,
}

#[derive(Default)]
struct HandleInner {
    next_id: u64,
    refed: FxHashMap<u64, bool>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle; returns its id.
    pub fn register(&self) -> u64 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.refed.insert(id, true);
        id
    }

    pub fn unregister(&self, id: u64) {
        self.inner.lock().refed.remove(&id);
    }

    pub fn set_refed(&self, id: u64, refed: bool) {
        if let Some(slot) = self.inner.lock().refed.get_mut(&id) {
            *slot = refed;
        }
    }

    /// Count of handles participating in keep-alive.
    pub fn refed_count(&self) -> usize {
        self.inner.lock().refed.values().filter(|r| **r).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unref_opts_out_of_keep_alive() {
        let handles = HandleRegistry::new();
        let a = handles.register();
        let b = handles.register();
        assert_eq!(handles.refed_count(), 2);
        handles.set_refed(a, false);
        assert_eq!(handles.refed_count(), 1);
        handles.unregister(b);
        assert_eq!(handles.refed_count(), 0);
    }
}
