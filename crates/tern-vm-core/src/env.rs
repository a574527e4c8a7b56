//! Lexical environments: the parent-linked scope chain.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{VmError, VmResult};
use crate::function::NamespaceObj;
use crate::value::Value;

/// A scope. Cheaply cloneable handle; closures capture one and extend the
/// chain's lifetime.
#[derive(Debug, Clone)]
pub struct Env(Rc<RefCell<EnvInner>>);

#[derive(Debug)]
struct EnvInner {
    parent: Option<Env>,
    bindings: FxHashMap<String, Value>,
    read_only: FxHashSet<String>,
    strict: bool,
    /// Namespace bindings live apart from ordinary values: re-declaring a
    /// namespace with the same name merges additively.
    namespaces: FxHashMap<String, Rc<NamespaceObj>>,
}

impl Env {
    /// A root scope (global or module top level).
    pub fn root() -> Self {
        Self(Rc::new(RefCell::new(EnvInner {
            parent: None,
            bindings: FxHashMap::default(),
            read_only: FxHashSet::default(),
            strict: false,
            namespaces: FxHashMap::default(),
        })))
    }

    /// A child scope. Strictness is inherited.
    pub fn child(&self) -> Self {
        let strict = self.0.borrow().strict;
        Self(Rc::new(RefCell::new(EnvInner {
            parent: Some(self.clone()),
            bindings: FxHashMap::default(),
            read_only: FxHashSet::default(),
            strict,
            namespaces: FxHashMap::default(),
        })))
    }

    pub fn same_scope(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_strict(&self) -> bool {
        self.0.borrow().strict
    }

    pub fn set_strict(&self, strict: bool) {
        self.0.borrow_mut().strict = strict;
    }

    /// Create a binding in this scope, shadowing any outer one.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        let name = name.into();
        let mut inner = self.0.borrow_mut();
        inner.read_only.remove(&name);
        inner.bindings.insert(name, value);
    }

    pub fn mark_read_only(&self, name: &str) {
        self.0.borrow_mut().read_only.insert(name.to_string());
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    /// Nearest binding, walking the chain.
    pub fn lookup(&self, name: &str) -> VmResult<Value> {
        let mut scope = self.clone();
        loop {
            let next = {
                let inner = scope.0.borrow();
                if let Some(v) = inner.bindings.get(name) {
                    return Ok(v.clone());
                }
                if let Some(ns) = inner.namespaces.get(name) {
                    return Ok(Value::Ref(crate::value::HeapRef::Namespace(ns.clone())));
                }
                inner.parent.clone()
            };
            match next {
                Some(parent) => scope = parent,
                None => return Err(VmError::reference_error(format!("{name} is not defined"))),
            }
        }
    }

    /// Mutate the nearest binding. Read-only bindings throw in strict scopes
    /// and silently no-op otherwise.
    pub fn assign(&self, name: &str, value: Value) -> VmResult<()> {
        let mut scope = self.clone();
        loop {
            let next = {
                let mut inner = scope.0.borrow_mut();
                if inner.bindings.contains_key(name) {
                    if inner.read_only.contains(name) {
                        if inner.strict {
                            return Err(VmError::type_error(format!("Assignment to constant variable '{name}'")));
                        }
                        return Ok(());
                    }
                    inner.bindings.insert(name.to_string(), value);
                    return Ok(());
                }
                inner.parent.clone()
            };
            match next {
                Some(parent) => scope = parent,
                None => return Err(VmError::reference_error(format!("{name} is not defined"))),
            }
        }
    }

    fn ancestor(&self, depth: usize) -> VmResult<Env> {
        let mut scope = self.clone();
        for _ in 0..depth {
            let parent = scope.0.borrow().parent.clone();
            scope = parent.ok_or_else(|| VmError::internal("resolver depth exceeds scope chain"))?;
        }
        Ok(scope)
    }

    /// Resolver-directed read: exactly `depth` hops, no further search.
    pub fn get_at(&self, depth: usize, name: &str) -> VmResult<Value> {
        let scope = self.ancestor(depth)?;
        let inner = scope.0.borrow();
        if let Some(v) = inner.bindings.get(name) {
            return Ok(v.clone());
        }
        if let Some(ns) = inner.namespaces.get(name) {
            return Ok(Value::Ref(crate::value::HeapRef::Namespace(ns.clone())));
        }
        Err(VmError::reference_error(format!("{name} is not defined")))
    }

    /// Resolver-directed write: exactly `depth` hops.
    pub fn assign_at(&self, depth: usize, name: &str, value: Value) -> VmResult<()> {
        let scope = self.ancestor(depth)?;
        let mut inner = scope.0.borrow_mut();
        if !inner.bindings.contains_key(name) {
            return Err(VmError::reference_error(format!("{name} is not defined")));
        }
        if inner.read_only.contains(name) {
            if inner.strict {
                return Err(VmError::type_error(format!("Assignment to constant variable '{name}'")));
            }
            return Ok(());
        }
        inner.bindings.insert(name.to_string(), value);
        Ok(())
    }

    /// Bind a namespace, merging additively into an existing one of the same
    /// name in this scope.
    pub fn define_namespace(&self, ns: Rc<NamespaceObj>) -> Rc<NamespaceObj> {
        let mut inner = self.0.borrow_mut();
        if let Some(existing) = inner.namespaces.get(ns.name.as_str()) {
            existing.merge_from(&ns);
            existing.clone()
        } else {
            inner.namespaces.insert(ns.name.clone(), ns.clone());
            ns
        }
    }

    pub fn local_namespace(&self, name: &str) -> Option<Rc<NamespaceObj>> {
        self.0.borrow().namespaces.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assign_mutates_nearest_binding() {
        let root = Env::root();
        root.define("x", Value::Number(1.0));
        let child = root.child();
        child.assign("x", Value::Number(2.0)).unwrap();
        assert_eq!(root.lookup("x").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn shadowing_does_not_touch_outer() {
        let root = Env::root();
        root.define("x", Value::Number(1.0));
        let child = root.child();
        child.define("x", Value::Number(9.0));
        child.assign("x", Value::Number(10.0)).unwrap();
        assert_eq!(root.lookup("x").unwrap().as_number(), Some(1.0));
        assert_eq!(child.lookup("x").unwrap().as_number(), Some(10.0));
    }

    #[test]
    fn unbound_assignment_is_a_reference_error() {
        let env = Env::root();
        assert!(matches!(env.assign("ghost", Value::Null), Err(VmError::ReferenceError(_))));
        assert!(matches!(env.lookup("ghost"), Err(VmError::ReferenceError(_))));
    }

    #[test]
    fn read_only_assignment_depends_on_strictness() {
        let env = Env::root();
        env.define("c", Value::Number(1.0));
        env.mark_read_only("c");
        env.assign("c", Value::Number(2.0)).unwrap();
        assert_eq!(env.lookup("c").unwrap().as_number(), Some(1.0));

        env.set_strict(true);
        assert!(matches!(env.assign("c", Value::Number(3.0)), Err(VmError::TypeError(_))));
    }

    #[test]
    fn get_at_walks_exact_depth() {
        let root = Env::root();
        root.define("x", Value::Number(1.0));
        let mid = root.child();
        mid.define("x", Value::Number(2.0));
        let leaf = mid.child();
        assert_eq!(leaf.get_at(1, "x").unwrap().as_number(), Some(2.0));
        assert_eq!(leaf.get_at(2, "x").unwrap().as_number(), Some(1.0));
        // depth 0 has no binding even though the chain does
        assert!(leaf.get_at(0, "x").is_err());
    }

    #[test]
    fn strictness_inherits_to_children() {
        let root = Env::root();
        root.set_strict(true);
        assert!(root.child().is_strict());
    }
}
