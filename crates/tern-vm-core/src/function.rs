//! Callable and class-shaped heap objects.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use tern_ast::decl::{ClassDecl, FnKind, FunctionDecl};

use crate::builtins::BuiltInMethod;
use crate::env::Env;
use crate::error::VmResult;
use crate::value::Value;

/// Host-implemented function signature: `(vm, this, args)`.
pub type NativeFn = Rc<dyn Fn(&mut crate::interp::Interpreter, &Value, &[Value]) -> VmResult<Value>>;

/// A function value: declaration reference plus captured closure.
///
/// `this` rides the environment chain: non-arrow calls define a fresh
/// binding in the call scope, arrows define none and see the enclosing one.
pub struct Function {
    pub decl: Rc<FunctionDecl>,
    pub closure: Env,
    pub is_arrow: bool,
    /// The class whose body declared this method, for `super` dispatch.
    pub home_class: RefCell<Option<Rc<JsClass>>>,
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function").field("name", &self.decl.name).field("kind", &self.decl.kind).finish()
    }
}

impl Function {
    pub fn new(decl: Rc<FunctionDecl>, closure: Env) -> Self {
        Self { decl, closure, is_arrow: false, home_class: RefCell::new(None) }
    }

    pub fn arrow(decl: Rc<FunctionDecl>, closure: Env) -> Self {
        Self { decl, closure, is_arrow: true, home_class: RefCell::new(None) }
    }

    pub fn kind(&self) -> FnKind {
        self.decl.kind
    }

    pub fn name(&self) -> Option<String> {
        self.decl.name.clone()
    }

    /// Count of non-rest, non-optional, non-defaulted parameters.
    pub fn arity(&self) -> usize {
        self.decl.arity()
    }
}

/// A host function installed as a global (`parseInt`, `setTimeout`, ...).
///
/// Constructor-style natives (`Symbol`, `Promise`, `Number`, ...) also carry
/// a property bag for their statics.
pub struct NativeFunction {
    pub name: String,
    pub func: NativeFn,
    pub properties: RefCell<IndexMap<String, Value>>,
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction").field("name", &self.name).finish()
    }
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&mut crate::interp::Interpreter, &Value, &[Value]) -> VmResult<Value> + 'static,
    ) -> Rc<Self> {
        Rc::new(Self { name: name.into(), func: Rc::new(func), properties: RefCell::new(IndexMap::new()) })
    }

    pub fn set_property(&self, key: impl Into<String>, value: Value) {
        self.properties.borrow_mut().insert(key.into(), value);
    }

    pub fn property(&self, key: &str) -> Option<Value> {
        self.properties.borrow().get(key).cloned()
    }
}

/// A built-in method with its receiver captured at member-access time.
#[derive(Debug)]
pub struct BoundMethod {
    pub method: &'static BuiltInMethod,
    pub receiver: Value,
}

impl BoundMethod {
    pub fn method_name(&self) -> &'static str {
        self.method.name
    }
}

thread_local! {
    static NEXT_CLASS_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_class_id() -> u64 {
    NEXT_CLASS_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        id
    })
}

/// An instance-field descriptor, replayed in declaration order on `new`.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub init: Option<tern_ast::Expr>,
    pub is_private: bool,
    /// Decorator-returned initializer transformers, applied to the initial
    /// value innermost-first on each construction.
    pub transforms: Vec<Value>,
}

/// A class: prototype-less method tables keyed by name, field descriptors
/// and a static property bag.
pub struct JsClass {
    /// Brand for private-element checks: compared against the declaring
    /// class recorded on the access site.
    pub id: u64,
    pub name: String,
    pub superclass: Option<Rc<JsClass>>,
    /// Environment the class body was evaluated in; field initializers and
    /// static blocks close over it.
    pub decl_env: Env,
    pub methods: RefCell<FxHashMap<String, Rc<Function>>>,
    pub static_methods: RefCell<FxHashMap<String, Rc<Function>>>,
    pub getters: RefCell<FxHashMap<String, Rc<Function>>>,
    pub setters: RefCell<FxHashMap<String, Rc<Function>>>,
    pub private_methods: RefCell<FxHashMap<String, Rc<Function>>>,
    pub fields: RefCell<Vec<FieldDescriptor>>,
    pub statics: RefCell<IndexMap<String, Value>>,
}

impl std::fmt::Debug for JsClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsClass").field("name", &self.name).field("id", &self.id).finish()
    }
}

impl JsClass {
    pub fn new(decl: &ClassDecl, superclass: Option<Rc<JsClass>>, decl_env: Env) -> Self {
        Self {
            id: next_class_id(),
            name: decl.name.clone(),
            superclass,
            decl_env,
            methods: RefCell::new(FxHashMap::default()),
            static_methods: RefCell::new(FxHashMap::default()),
            getters: RefCell::new(FxHashMap::default()),
            setters: RefCell::new(FxHashMap::default()),
            private_methods: RefCell::new(FxHashMap::default()),
            fields: RefCell::new(Vec::new()),
            statics: RefCell::new(IndexMap::new()),
        }
    }

    /// Find a method on this class or up the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(m) = self.methods.borrow().get(name) {
            return Some(m.clone());
        }
        self.superclass.as_ref()?.find_method(name)
    }

    pub fn find_getter(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(m) = self.getters.borrow().get(name) {
            return Some(m.clone());
        }
        self.superclass.as_ref()?.find_getter(name)
    }

    pub fn find_setter(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(m) = self.setters.borrow().get(name) {
            return Some(m.clone());
        }
        self.superclass.as_ref()?.find_setter(name)
    }

    pub fn find_static(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.statics.borrow().get(name) {
            return Some(v.clone());
        }
        if let Some(m) = self.static_methods.borrow().get(name) {
            return Some(Value::function(m.clone()));
        }
        self.superclass.as_ref()?.find_static(name)
    }

    /// Constructor, if declared anywhere on the chain.
    pub fn find_constructor(&self) -> Option<Rc<Function>> {
        self.find_method("constructor")
    }

    /// `instanceof` walk.
    pub fn is_subclass_of(&self, other: &JsClass) -> bool {
        if self.id == other.id {
            return true;
        }
        match &self.superclass {
            Some(s) => s.is_subclass_of(other),
            None => false,
        }
    }
}

/// An object created by `new`.
pub struct Instance {
    pub class: Rc<JsClass>,
    pub fields: RefCell<IndexMap<String, Value>>,
    /// Private elements, keyed by `(declaring class id, name)`.
    pub privates: RefCell<FxHashMap<(u64, String), Value>>,
    frozen: Cell<bool>,
    sealed: Cell<bool>,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance").field("class", &self.class.name).finish()
    }
}

impl Instance {
    pub fn new(class: Rc<JsClass>) -> Self {
        Self {
            class,
            fields: RefCell::new(IndexMap::new()),
            privates: RefCell::new(FxHashMap::default()),
            frozen: Cell::new(false),
            sealed: Cell::new(false),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.borrow().get(name).cloned()
    }

    pub fn set_field(&self, name: impl Into<String>, value: Value) -> bool {
        if self.frozen.get() {
            return false;
        }
        let name = name.into();
        let mut fields = self.fields.borrow_mut();
        if self.sealed.get() && !fields.contains_key(&name) {
            return false;
        }
        fields.insert(name, value);
        true
    }

    pub fn delete_field(&self, name: &str) -> bool {
        if self.frozen.get() || self.sealed.get() {
            return false;
        }
        self.fields.borrow_mut().shift_remove(name).is_some()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.borrow().keys().cloned().collect()
    }

    /// Brand check: is `class_id` this instance's class or an ancestor?
    pub fn has_brand(&self, class_id: u64) -> bool {
        let mut cls = Some(self.class.clone());
        while let Some(c) = cls {
            if c.id == class_id {
                return true;
            }
            cls = c.superclass.clone();
        }
        false
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

/// A namespace: name plus member bag, merged additively when re-declared.
#[derive(Debug)]
pub struct NamespaceObj {
    pub name: String,
    pub members: RefCell<IndexMap<String, Value>>,
}

impl NamespaceObj {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), members: RefCell::new(IndexMap::new()) }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.members.borrow().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.members.borrow_mut().insert(key.into(), value);
    }

    /// Additive merge; existing members of `self` win only when `other`
    /// lacks them (later declarations overwrite).
    pub fn merge_from(&self, other: &NamespaceObj) {
        let mut members = self.members.borrow_mut();
        for (k, v) in other.members.borrow().iter() {
            members.insert(k.clone(), v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::decl::ClassDecl;

    fn class(name: &str, superclass: Option<Rc<JsClass>>) -> Rc<JsClass> {
        let decl = ClassDecl::new(name, None, Vec::new());
        Rc::new(JsClass::new(&decl, superclass, Env::root()))
    }

    #[test]
    fn brand_check_covers_superclass_chain() {
        let base = class("Base", None);
        let derived = class("Derived", Some(base.clone()));
        let inst = Instance::new(derived.clone());
        assert!(inst.has_brand(derived.id));
        assert!(inst.has_brand(base.id));
        assert!(!inst.has_brand(9999));
    }

    #[test]
    fn instanceof_walks_chain() {
        let base = class("Base", None);
        let derived = class("Derived", Some(base.clone()));
        let unrelated = class("Other", None);
        assert!(derived.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&derived));
        assert!(!derived.is_subclass_of(&unrelated));
    }

    #[test]
    fn namespace_merge_is_additive() {
        let a = NamespaceObj::new("N");
        a.set("x", Value::Number(1.0));
        let b = NamespaceObj::new("N");
        b.set("y", Value::Number(2.0));
        a.merge_from(&b);
        assert!(a.get("x").is_some());
        assert!(a.get("y").is_some());
    }
}
