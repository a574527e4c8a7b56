//! Promise objects.
//!
//! `JsPromise` is deliberately dumb: a state cell plus a FIFO reaction list.
//! Settling returns the drained reactions so the caller (the interpreter's
//! job machinery) can enqueue them as microtasks; resolution-with-a-promise
//! adoption also lives there.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

#[derive(Debug, Clone)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

/// A `then` registration: the two callbacks (undefined = pass-through) and
/// the promise the registration resolves.
#[derive(Debug)]
pub struct Reaction {
    pub on_fulfilled: Value,
    pub on_rejected: Value,
    pub result: Rc<JsPromise>,
}

#[derive(Debug, Default)]
pub struct JsPromise {
    state: RefCell<PromiseState>,
    reactions: RefCell<Vec<Reaction>>,
}

impl Default for PromiseState {
    fn default() -> Self {
        PromiseState::Pending
    }
}

impl JsPromise {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn fulfilled_with(value: Value) -> Rc<Self> {
        Rc::new(Self { state: RefCell::new(PromiseState::Fulfilled(value)), reactions: RefCell::new(Vec::new()) })
    }

    pub fn rejected_with(reason: Value) -> Rc<Self> {
        Rc::new(Self { state: RefCell::new(PromiseState::Rejected(reason)), reactions: RefCell::new(Vec::new()) })
    }

    pub fn state(&self) -> PromiseState {
        self.state.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), PromiseState::Pending)
    }

    /// Transition to fulfilled. No-op (empty drain) when already settled.
    pub fn fulfill(&self, value: Value) -> Vec<Reaction> {
        let mut state = self.state.borrow_mut();
        if !matches!(*state, PromiseState::Pending) {
            return Vec::new();
        }
        *state = PromiseState::Fulfilled(value);
        drop(state);
        std::mem::take(&mut *self.reactions.borrow_mut())
    }

    /// Transition to rejected. No-op (empty drain) when already settled.
    pub fn reject(&self, reason: Value) -> Vec<Reaction> {
        let mut state = self.state.borrow_mut();
        if !matches!(*state, PromiseState::Pending) {
            return Vec::new();
        }
        *state = PromiseState::Rejected(reason);
        drop(state);
        std::mem::take(&mut *self.reactions.borrow_mut())
    }

    /// Queue a reaction while pending.
    pub fn add_reaction(&self, reaction: Reaction) {
        self.reactions.borrow_mut().push(reaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settle_is_one_shot() {
        let p = JsPromise::new();
        assert!(p.is_pending());
        p.fulfill(Value::Number(1.0));
        p.reject(Value::Number(2.0));
        match p.state() {
            PromiseState::Fulfilled(v) => assert_eq!(v.as_number(), Some(1.0)),
            other => panic!("expected fulfilled, got {other:?}"),
        }
    }

    #[test]
    fn settling_drains_reactions_in_fifo_order() {
        let p = JsPromise::new();
        for _ in 0..3 {
            p.add_reaction(Reaction {
                on_fulfilled: Value::Undefined,
                on_rejected: Value::Undefined,
                result: JsPromise::new(),
            });
        }
        let drained = p.fulfill(Value::Undefined);
        assert_eq!(drained.len(), 3);
        assert!(p.fulfill(Value::Undefined).is_empty());
    }
}
