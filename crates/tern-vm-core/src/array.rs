//! Arrays: dense, ordered, growable.

use std::cell::{Cell, RefCell};

use crate::value::Value;

/// A JS array. Elements are dense: writing past the end fills the gap with
/// undefined so indices 0..len-1 always exist.
///
/// The `raw` slot exists only for tagged templates: the cooked-parts array
/// carries the raw parts there.
#[derive(Debug, Default)]
pub struct JsArray {
    elements: RefCell<Vec<Value>>,
    raw: RefCell<Option<Value>>,
    frozen: Cell<bool>,
    sealed: Cell<bool>,
}

impl JsArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(elements: Vec<Value>) -> Self {
        Self {
            elements: RefCell::new(elements),
            raw: RefCell::new(None),
            frozen: Cell::new(false),
            sealed: Cell::new(false),
        }
    }

    pub fn raw(&self) -> Option<Value> {
        self.raw.borrow().clone()
    }

    /// Attach the raw-parts slot. Bypasses the frozen flag: the tagged
    /// template protocol freezes the cooked array first.
    pub fn set_raw(&self, value: Value) {
        *self.raw.borrow_mut() = Some(value);
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Value {
        self.elements.borrow().get(index).cloned().unwrap_or(Value::Undefined)
    }

    /// Index write. Out-of-range writes grow the array (dense fill with
    /// undefined). Frozen arrays reject all writes; sealed arrays reject
    /// growth. Violations silently no-op.
    pub fn set(&self, index: usize, value: Value) -> bool {
        if self.frozen.get() {
            return false;
        }
        let mut elements = self.elements.borrow_mut();
        if index >= elements.len() {
            if self.sealed.get() {
                return false;
            }
            elements.resize(index + 1, Value::Undefined);
        }
        elements[index] = value;
        true
    }

    /// Whether structural mutation (push/pop/splice/...) is currently
    /// allowed. Mutating built-ins raise TypeError when it is not.
    pub fn can_mutate_structure(&self) -> bool {
        !self.frozen.get() && !self.sealed.get()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.get()
    }

    pub fn freeze(&self) {
        self.frozen.set(true);
        self.sealed.set(true);
    }

    pub fn seal(&self) {
        self.sealed.set(true);
    }

    /// Copy of the current elements. Iteration works over a snapshot so user
    /// callbacks mutating the array cannot invalidate the borrow.
    pub fn iter_snapshot(&self) -> Vec<Value> {
        self.elements.borrow().clone()
    }

    /// Run `f` with mutable access to the element vector. Callers must have
    /// checked `can_mutate_structure` first when the operation changes shape.
    pub fn with_elements_mut<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> R) -> R {
        f(&mut self.elements.borrow_mut())
    }

    pub fn with_elements<R>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        f(&self.elements.borrow())
    }

    pub fn push(&self, value: Value) {
        self.elements.borrow_mut().push(value);
    }

    pub fn pop(&self) -> Option<Value> {
        self.elements.borrow_mut().pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_write_fills_densely() {
        let arr = JsArray::new();
        arr.set(2, Value::Number(7.0));
        assert_eq!(arr.len(), 3);
        assert!(arr.get(0).is_undefined());
        assert!(arr.get(1).is_undefined());
        assert_eq!(arr.get(2).as_number(), Some(7.0));
    }

    #[test]
    fn frozen_array_ignores_writes() {
        let arr = JsArray::from_vec(vec![Value::Number(1.0)]);
        arr.freeze();
        assert!(!arr.set(0, Value::Number(2.0)));
        assert!(!arr.can_mutate_structure());
        assert_eq!(arr.get(0).as_number(), Some(1.0));
        assert_eq!(arr.len(), 1);
    }
}
