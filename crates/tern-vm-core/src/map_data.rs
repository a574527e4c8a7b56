//! Backing stores for Map, Set, WeakMap and WeakSet.
//!
//! Map/Set keep SameValueZero key semantics and insertion-ordered storage
//! with tombstone-based deletion, so iterators opened over a snapshot and
//! late mutation observers agree on order. Weak variants key by allocation
//! identity and hold type-erased `Weak` handles: no iteration, no size.

use std::any::Any;
use std::cell::RefCell;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::value::{HeapRef, Value};

// ============================================================================
// MapKey
// ============================================================================

/// A Map/Set key with SameValueZero hash and equality: `NaN` keys collapse,
/// `-0` and `+0` collapse, heap refs compare by allocation identity.
#[derive(Debug, Clone)]
pub struct MapKey(pub Value);

impl MapKey {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.same_value_zero(&other.0)
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match &self.0 {
            Value::Undefined => state.write_u8(0),
            Value::Null => state.write_u8(1),
            Value::Boolean(b) => {
                state.write_u8(2);
                b.hash(state);
            }
            Value::Number(n) => {
                state.write_u8(3);
                // canonicalize NaN payloads and -0
                let canonical = if n.is_nan() { f64::NAN } else { *n + 0.0 };
                canonical.to_bits().hash(state);
            }
            Value::BigInt(b) => {
                state.write_u8(4);
                b.hash(state);
            }
            Value::String(s) => {
                state.write_u8(5);
                s.hash(state);
            }
            Value::Symbol(s) => {
                state.write_u8(6);
                s.id.hash(state);
            }
            Value::Ref(r) => {
                state.write_u8(7);
                r.ptr_id().hash(state);
            }
        }
    }
}

// ============================================================================
// MapData
// ============================================================================

struct MapInner {
    /// Insertion-ordered entries; `None` = tombstone.
    entries: Vec<Option<(MapKey, Value)>>,
    /// Key -> index in `entries`.
    index: FxHashMap<MapKey, usize>,
    size: usize,
}

/// Internal storage for a `Map`.
#[derive(Default)]
pub struct MapData {
    inner: RefCell<MapInner>,
}

impl Default for MapInner {
    fn default() -> Self {
        Self { entries: Vec::new(), index: FxHashMap::default(), size: 0 }
    }
}

impl std::fmt::Debug for MapData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Map({} entries)", self.size())
    }
}

impl MapData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.inner.borrow().size
    }

    pub fn get(&self, key: &MapKey) -> Option<Value> {
        let inner = self.inner.borrow();
        let idx = *inner.index.get(key)?;
        inner.entries.get(idx).and_then(|e| e.as_ref()).map(|(_, v)| v.clone())
    }

    pub fn has(&self, key: &MapKey) -> bool {
        self.inner.borrow().index.contains_key(key)
    }

    /// Insert or update. Updating preserves the entry's insertion position.
    /// Returns true when an existing entry was updated.
    pub fn set(&self, key: MapKey, value: Value) -> bool {
        let mut inner = self.inner.borrow_mut();
        if let Some(&idx) = inner.index.get(&key) {
            inner.entries[idx] = Some((key, value));
            true
        } else {
            let idx = inner.entries.len();
            inner.index.insert(key.clone(), idx);
            inner.entries.push(Some((key, value)));
            inner.size += 1;
            false
        }
    }

    pub fn delete(&self, key: &MapKey) -> bool {
        let mut inner = self.inner.borrow_mut();
        if let Some(idx) = inner.index.remove(key) {
            inner.entries[idx] = None;
            inner.size -= 1;
            true
        } else {
            false
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.entries.clear();
        inner.index.clear();
        inner.size = 0;
    }

    /// Live entries in insertion order.
    pub fn entries_snapshot(&self) -> Vec<(Value, Value)> {
        self.inner
            .borrow()
            .entries
            .iter()
            .flatten()
            .map(|(k, v)| (k.0.clone(), v.clone()))
            .collect()
    }
}

// ============================================================================
// SetData
// ============================================================================

/// Internal storage for a `Set`: a `MapData` with unit values.
#[derive(Default)]
pub struct SetData {
    map: MapData,
}

impl std::fmt::Debug for SetData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Set({} members)", self.size())
    }
}

impl SetData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> usize {
        self.map.size()
    }

    pub fn has(&self, value: &Value) -> bool {
        self.map.has(&MapKey::new(value.clone()))
    }

    /// Returns true when the member was newly added.
    pub fn add(&self, value: Value) -> bool {
        !self.map.set(MapKey::new(value.clone()), value)
    }

    pub fn delete(&self, value: &Value) -> bool {
        self.map.delete(&MapKey::new(value.clone()))
    }

    pub fn clear(&self) {
        self.map.clear();
    }

    /// Members in insertion order.
    pub fn values_snapshot(&self) -> Vec<Value> {
        self.map.entries_snapshot().into_iter().map(|(k, _)| k).collect()
    }
}

// ============================================================================
// Weak variants
// ============================================================================

/// Downgrade a heap value to a type-erased weak handle. Only object-like
/// values are accepted as weak keys.
fn downgrade(value: &Value) -> Option<Weak<dyn Any>> {
    let Value::Ref(r) = value else { return None };
    Some(match r {
        HeapRef::Array(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        HeapRef::Object(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        HeapRef::Map(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        HeapRef::Set(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        HeapRef::Instance(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        HeapRef::Function(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        HeapRef::Class(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        HeapRef::Date(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        HeapRef::Error(x) => Rc::downgrade(&(x.clone() as Rc<dyn Any>)),
        _ => return None,
    })
}

/// Internal storage for a `WeakMap`. Keys are held weakly; dead entries are
/// pruned on every access.
#[derive(Default)]
pub struct WeakMapData {
    entries: RefCell<FxHashMap<usize, (Weak<dyn Any>, Value)>>,
}

impl std::fmt::Debug for WeakMapData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeakMap")
    }
}

impl WeakMapData {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&self) {
        self.entries.borrow_mut().retain(|_, (weak, _)| weak.strong_count() > 0);
    }

    /// Returns false when the key is not a valid weak key.
    pub fn set(&self, key: &Value, value: Value) -> bool {
        self.prune();
        let Value::Ref(r) = key else { return false };
        let Some(weak) = downgrade(key) else { return false };
        self.entries.borrow_mut().insert(r.ptr_id(), (weak, value));
        true
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.prune();
        let Value::Ref(r) = key else { return None };
        self.entries.borrow().get(&r.ptr_id()).map(|(_, v)| v.clone())
    }

    pub fn has(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&self, key: &Value) -> bool {
        self.prune();
        let Value::Ref(r) = key else { return false };
        self.entries.borrow_mut().remove(&r.ptr_id()).is_some()
    }
}

/// Internal storage for a `WeakSet`.
#[derive(Default)]
pub struct WeakSetData {
    map: WeakMapData,
}

impl std::fmt::Debug for WeakSetData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WeakSet")
    }
}

impl WeakSetData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, value: &Value) -> bool {
        self.map.set(value, Value::Boolean(true))
    }

    pub fn has(&self, value: &Value) -> bool {
        self.map.has(value)
    }

    pub fn delete(&self, value: &Value) -> bool {
        self.map.delete(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_size_tracks_set_and_delete() {
        let map = MapData::new();
        map.set(MapKey::new(Value::string("a")), Value::Number(1.0));
        map.set(MapKey::new(Value::string("b")), Value::Number(2.0));
        map.set(MapKey::new(Value::string("a")), Value::Number(3.0));
        assert_eq!(map.size(), 2);
        assert!(map.delete(&MapKey::new(Value::string("a"))));
        assert!(!map.delete(&MapKey::new(Value::string("a"))));
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn nan_collapses_as_map_key() {
        let map = MapData::new();
        map.set(MapKey::new(Value::Number(f64::NAN)), Value::string("first"));
        map.set(MapKey::new(Value::Number(f64::NAN)), Value::string("second"));
        assert_eq!(map.size(), 1);
        assert_eq!(map.get(&MapKey::new(Value::Number(f64::NAN))).unwrap().as_str(), Some("second"));
    }

    #[test]
    fn update_preserves_insertion_order() {
        let map = MapData::new();
        map.set(MapKey::new(Value::string("x")), Value::Number(1.0));
        map.set(MapKey::new(Value::string("y")), Value::Number(2.0));
        map.set(MapKey::new(Value::string("x")), Value::Number(9.0));
        let keys: Vec<String> =
            map.entries_snapshot().into_iter().map(|(k, _)| k.to_display_string()).collect();
        assert_eq!(keys, vec!["x", "y"]);
    }

    #[test]
    fn weak_map_drops_dead_keys() {
        use crate::object::JsObject;
        let wm = WeakMapData::new();
        let live = Value::object(Rc::new(JsObject::new()));
        wm.set(&live, Value::Number(1.0));
        {
            let dead = Value::object(Rc::new(JsObject::new()));
            wm.set(&dead, Value::Number(2.0));
            assert!(wm.has(&dead));
        }
        assert!(wm.has(&live));
        assert_eq!(wm.entries.borrow().len(), 1);
    }

    #[test]
    fn set_membership_is_same_value_zero() {
        let set = SetData::new();
        assert!(set.add(Value::Number(0.0)));
        assert!(!set.add(Value::Number(-0.0)));
        assert_eq!(set.size(), 1);
    }
}
