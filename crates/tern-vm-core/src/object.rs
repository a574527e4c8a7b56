//! Plain objects: insertion-ordered string-keyed property bags.

use std::cell::{Cell, RefCell};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::value::Value;

/// A plain JS object.
///
/// Properties keep insertion order (`IndexMap`). The `raw` slot exists only
/// for the cooked-parts array of tagged templates. Symbol-keyed properties
/// (`@@iterator` and friends) live in a small side table keyed by symbol id.
#[derive(Debug, Default)]
pub struct JsObject {
    props: RefCell<IndexMap<String, Value>>,
    symbol_props: RefCell<FxHashMap<u64, Value>>,
    raw: RefCell<Option<Value>>,
    frozen: Cell<bool>,
    sealed: Cell<bool>,
}

impl JsObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        let obj = Self::new();
        {
            let mut props = obj.props.borrow_mut();
            for (k, v) in entries {
                props.insert(k, v);
            }
        }
        obj
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.props.borrow().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.props.borrow().contains_key(key)
    }

    /// Insert or update. Frozen objects reject all writes; sealed objects
    /// reject new keys but allow updates. Violations silently no-op and
    /// return false.
    pub fn set(&self, key: impl Into<String>, value: Value) -> bool {
        if self.frozen.get() {
            return false;
        }
        let key = key.into();
        let mut props = self.props.borrow_mut();
        if self.sealed.get() && !props.contains_key(&key) {
            return false;
        }
        props.insert(key, value);
        true
    }

    /// Delete a key. Returns false when absent or when structure is locked.
    pub fn delete(&self, key: &str) -> bool {
        if self.frozen.get() || self.sealed.get() {
            return false;
        }
        self.props.borrow_mut().shift_remove(key).is_some()
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.props.borrow().keys().cloned().collect()
    }

    pub fn values(&self) -> Vec<Value> {
        self.props.borrow().values().cloned().collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.props.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.props.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.borrow().is_empty()
    }

    pub fn get_symbol(&self, symbol_id: u64) -> Option<Value> {
        self.symbol_props.borrow().get(&symbol_id).cloned()
    }

    pub fn set_symbol(&self, symbol_id: u64, value: Value) -> bool {
        if self.frozen.get() {
            return false;
        }
        self.symbol_props.borrow_mut().insert(symbol_id, value);
        true
    }

    pub fn raw(&self) -> Option<Value> {
        self.raw.borrow().clone()
    }

    /// Attach the raw-parts slot. Bypasses the frozen flag: the tagged
    /// template protocol freezes the cooked array first, then hangs `raw`
    /// off it.
    pub fn set_raw(&self, value: Value) {
        *self.raw.borrow_mut() = Some(value);
    }

    pub fn freeze(&self) {
        self.frozen.set(true);
        self.sealed.set(true);
    }

    pub fn seal(&self) {
        self.sealed.set(true);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_preserve_insertion_order() {
        let obj = JsObject::new();
        obj.set("z", Value::Number(1.0));
        obj.set("a", Value::Number(2.0));
        obj.set("m", Value::Number(3.0));
        assert_eq!(obj.keys(), vec!["z", "a", "m"]);
        // updating does not move the key
        obj.set("z", Value::Number(9.0));
        assert_eq!(obj.keys(), vec!["z", "a", "m"]);
    }

    #[test]
    fn frozen_rejects_writes_and_deletes() {
        let obj = JsObject::new();
        obj.set("k", Value::Number(1.0));
        obj.freeze();
        assert!(!obj.set("k", Value::Number(2.0)));
        assert!(!obj.set("new", Value::Number(3.0)));
        assert!(!obj.delete("k"));
        assert_eq!(obj.get("k").unwrap().as_number(), Some(1.0));
    }

    #[test]
    fn sealed_allows_updates_but_not_structure() {
        let obj = JsObject::new();
        obj.set("k", Value::Number(1.0));
        obj.seal();
        assert!(obj.set("k", Value::Number(2.0)));
        assert!(!obj.set("new", Value::Number(3.0)));
        assert!(!obj.delete("k"));
    }
}
