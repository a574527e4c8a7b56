//! Property access dispatch: one place that knows, per receiver kind, where
//! a named member comes from — own data, accessor, method table, or bound
//! built-in.

use std::rc::Rc;

use tern_ast::TypeHint;

use crate::builtins::{self, BuiltInMethod};
use crate::error::{VmError, VmResult};
use crate::function::BoundMethod;
use crate::value::{number_to_string, HeapRef, Value};

use super::{EvalContext, Interpreter};

/// Bind a built-in method to its receiver.
fn bind(method: &'static BuiltInMethod, receiver: &Value) -> Value {
    Value::Ref(HeapRef::Bound(Rc::new(BoundMethod { method, receiver: receiver.clone() })))
}

/// Own enumerable string keys of a value, shared by for-in, object spread
/// and object-rest destructuring.
pub(crate) fn own_enumerable_keys(value: &Value) -> Vec<String> {
    match value {
        Value::Ref(HeapRef::Object(o)) => o.keys(),
        Value::Ref(HeapRef::Instance(i)) => i.field_names(),
        Value::Ref(HeapRef::Namespace(n)) => n.members.borrow().keys().cloned().collect(),
        _ => Vec::new(),
    }
}

impl Interpreter {
    /// `object.name`. `hint` is the checker's static type of `object`, used
    /// to route collection receivers straight to their method table.
    pub fn get_member(
        &mut self,
        cx: &dyn EvalContext,
        object: &Value,
        name: &str,
        hint: Option<TypeHint>,
    ) -> VmResult<Value> {
        if object.is_nullish() {
            return Err(VmError::type_error(format!(
                "Cannot read properties of {} (reading '{name}')",
                object.to_display_string()
            )));
        }
        // Checker-directed fast path: a receiver statically known to be a
        // collection skips the generic property walk.
        match hint {
            Some(TypeHint::Map) => {
                if let Value::Ref(HeapRef::Map(m)) = object {
                    if name == "size" {
                        return Ok(Value::Number(m.size() as f64));
                    }
                    if let Some(method) = builtins::map::method(name) {
                        return Ok(bind(method, object));
                    }
                }
            }
            Some(TypeHint::Set) => {
                if let Value::Ref(HeapRef::Set(s)) = object {
                    if name == "size" {
                        return Ok(Value::Number(s.size() as f64));
                    }
                    if let Some(method) = builtins::set::method(name) {
                        return Ok(bind(method, object));
                    }
                }
            }
            _ => {}
        }

        match object {
            Value::String(s) => {
                if name == "length" {
                    return Ok(Value::Number(s.chars().count() as f64));
                }
                builtins::string::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("String has no member '{name}'")))
            }
            Value::Number(n) => builtins::number::method(name)
                .map(|m| bind(m, object))
                .ok_or_else(|| VmError::type_error(format!("Number {} has no member '{name}'", number_to_string(*n)))),
            Value::Boolean(_) | Value::BigInt(_) => builtins::primitive::method(name)
                .map(|m| bind(m, object))
                .ok_or_else(|| VmError::type_error(format!("{} has no member '{name}'", object.type_of()))),
            Value::Symbol(s) => match name {
                "description" => Ok(match &s.description {
                    Some(d) => Value::string(d),
                    None => Value::Undefined,
                }),
                _ => builtins::primitive::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("Symbol has no member '{name}'"))),
            },
            Value::Ref(r) => self.get_heap_member(cx, object, r, name),
            Value::Undefined | Value::Null => unreachable!("nullish receivers rejected above"),
        }
    }

    fn get_heap_member(
        &mut self,
        cx: &dyn EvalContext,
        object: &Value,
        heap: &HeapRef,
        name: &str,
    ) -> VmResult<Value> {
        match heap {
            HeapRef::Array(a) => {
                if name == "length" {
                    return Ok(Value::Number(a.len() as f64));
                }
                if name == "raw"
                    && let Some(raw) = a.raw()
                {
                    return Ok(raw);
                }
                builtins::array::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("Array has no member '{name}'")))
            }
            HeapRef::Object(o) => {
                if let Some(v) = o.get(name) {
                    return Ok(v);
                }
                if name == "raw"
                    && let Some(raw) = o.raw()
                {
                    return Ok(raw);
                }
                Ok(builtins::object::method(name).map(|m| bind(m, object)).unwrap_or(Value::Undefined))
            }
            HeapRef::Map(m) => {
                if name == "size" {
                    return Ok(Value::Number(m.size() as f64));
                }
                builtins::map::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("Map has no member '{name}'")))
            }
            HeapRef::Set(s) => {
                if name == "size" {
                    return Ok(Value::Number(s.size() as f64));
                }
                builtins::set::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("Set has no member '{name}'")))
            }
            HeapRef::WeakMap(_) | HeapRef::WeakSet(_) => builtins::weak::method(name)
                .map(|m| bind(m, object))
                .ok_or_else(|| VmError::type_error(format!("{} has no member '{name}'", object.to_display_string()))),
            HeapRef::RegExp(re) => match name {
                "source" => Ok(Value::string(&re.source)),
                "flags" => Ok(Value::string(&re.flags)),
                "global" => Ok(Value::Boolean(re.is_global())),
                "sticky" => Ok(Value::Boolean(re.is_sticky())),
                "lastIndex" => Ok(Value::Number(re.last_index() as f64)),
                _ => builtins::regexp::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("RegExp has no member '{name}'"))),
            },
            HeapRef::Date(_) => builtins::date::method(name)
                .map(|m| bind(m, object))
                .ok_or_else(|| VmError::type_error(format!("Date has no member '{name}'"))),
            HeapRef::Error(e) => match name {
                "name" => Ok(Value::string(e.name())),
                "message" => Ok(Value::string(e.message.borrow().as_str())),
                "stack" => Ok(Value::string(e.stack.borrow().as_str())),
                "errors" if !e.errors.is_empty() => {
                    Ok(Value::array(Rc::new(crate::array::JsArray::from_vec(e.errors.clone()))))
                }
                _ => Ok(builtins::error::method(name).map(|m| bind(m, object)).unwrap_or(Value::Undefined)),
            },
            HeapRef::Promise(_) => builtins::promise::method(name)
                .map(|m| bind(m, object))
                .ok_or_else(|| VmError::type_error(format!("Promise has no member '{name}'"))),
            HeapRef::TypedArray(t) => match name {
                "length" => Ok(Value::Number(t.len() as f64)),
                "byteLength" => Ok(Value::Number(t.byte_length() as f64)),
                "BYTES_PER_ELEMENT" => Ok(Value::Number(t.kind.bytes_per_element() as f64)),
                _ => builtins::typed_array::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("{} has no member '{name}'", t.kind.constructor_name()))),
            },
            HeapRef::Function(f) => match name {
                "name" => Ok(Value::string(f.name().unwrap_or_default())),
                "length" => Ok(Value::Number(f.arity() as f64)),
                _ => builtins::function::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("Function has no member '{name}'"))),
            },
            HeapRef::Native(n) => {
                if let Some(v) = n.property(name) {
                    return Ok(v);
                }
                match name {
                    "name" => Ok(Value::string(&n.name)),
                    _ => builtins::function::method(name)
                        .map(|m| bind(m, object))
                        .ok_or_else(|| VmError::type_error(format!("Function has no member '{name}'"))),
                }
            }
            HeapRef::Bound(b) => match name {
                "name" => Ok(Value::string(b.method_name())),
                _ => builtins::function::method(name)
                    .map(|m| bind(m, object))
                    .ok_or_else(|| VmError::type_error(format!("Function has no member '{name}'"))),
            },
            HeapRef::Class(c) => match name {
                "name" => Ok(Value::string(&c.name)),
                _ => Ok(c.find_static(name).unwrap_or(Value::Undefined)),
            },
            HeapRef::Instance(inst) => {
                if let Some(v) = inst.get_field(name) {
                    return Ok(v);
                }
                if let Some(getter) = inst.class.find_getter(name) {
                    return self.call_function(&getter, object.clone(), Vec::new());
                }
                if let Some(method) = inst.class.find_method(name) {
                    return Ok(Value::function(method));
                }
                let _ = cx;
                Ok(Value::Undefined)
            }
            HeapRef::Namespace(ns) => Ok(ns.get(name).unwrap_or(Value::Undefined)),
            HeapRef::Generator(_) => builtins::generator::method(name)
                .map(|m| bind(m, object))
                .ok_or_else(|| VmError::type_error(format!("Generator has no member '{name}'"))),
            HeapRef::Timeout(_) => {
                Ok(builtins::timeout::method(name).map(|m| bind(m, object)).unwrap_or(Value::Undefined))
            }
        }
    }

    /// `object.name = value` (plain assignment part; compound logic lives in
    /// the expression handler). Frozen/sealed violations silently no-op.
    pub fn set_member(&mut self, _cx: &dyn EvalContext, object: &Value, name: &str, value: Value) -> VmResult<()> {
        match object {
            Value::Undefined | Value::Null => Err(VmError::type_error(format!(
                "Cannot set properties of {} (setting '{name}')",
                object.to_display_string()
            ))),
            Value::Ref(HeapRef::Object(o)) => {
                o.set(name, value);
                Ok(())
            }
            Value::Ref(HeapRef::Array(a)) => {
                if name == "length" {
                    let new_len = value.coerce_number();
                    if new_len < 0.0 || new_len.fract() != 0.0 {
                        return Err(VmError::range_error("Invalid array length"));
                    }
                    if a.can_mutate_structure() {
                        a.with_elements_mut(|els| els.resize(new_len as usize, Value::Undefined));
                    }
                    return Ok(());
                }
                Ok(())
            }
            Value::Ref(HeapRef::Instance(inst)) => {
                if let Some(setter) = inst.class.find_setter(name) {
                    self.call_function(&setter, object.clone(), vec![value])?;
                    return Ok(());
                }
                inst.set_field(name, value);
                Ok(())
            }
            Value::Ref(HeapRef::Namespace(ns)) => {
                ns.set(name, value);
                Ok(())
            }
            Value::Ref(HeapRef::Class(c)) => {
                c.statics.borrow_mut().insert(name.to_string(), value);
                Ok(())
            }
            Value::Ref(HeapRef::RegExp(re)) if name == "lastIndex" => {
                re.set_last_index(value.coerce_number().max(0.0) as usize);
                Ok(())
            }
            Value::Ref(HeapRef::Native(n)) => {
                n.set_property(name, value);
                Ok(())
            }
            // Writes to primitives and the remaining heap kinds silently
            // no-op, as in sloppy-mode JS.
            _ => Ok(()),
        }
    }

    /// `delete object.name`. Returns what the expression evaluates to.
    pub fn delete_member(&mut self, object: &Value, name: &str) -> VmResult<bool> {
        match object {
            Value::Ref(HeapRef::Object(o)) => Ok(o.delete(name)),
            Value::Ref(HeapRef::Instance(inst)) => Ok(inst.delete_field(name)),
            Value::Ref(HeapRef::Namespace(ns)) => Ok(ns.members.borrow_mut().shift_remove(name).is_some()),
            _ => Ok(false),
        }
    }

    /// `object[index]` where `index` has already been evaluated.
    pub fn get_index_value(&mut self, cx: &dyn EvalContext, object: &Value, index: &Value) -> VmResult<Value> {
        if object.is_nullish() {
            return Err(VmError::type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                object.to_display_string(),
                index.to_display_string()
            )));
        }
        match (object, index) {
            (Value::Ref(HeapRef::Array(a)), Value::Number(n)) => {
                if n.fract() != 0.0 || *n < 0.0 {
                    return Ok(Value::Undefined);
                }
                Ok(a.get(*n as usize))
            }
            (Value::Ref(HeapRef::TypedArray(t)), Value::Number(n)) => {
                if n.fract() != 0.0 || *n < 0.0 {
                    return Ok(Value::Undefined);
                }
                Ok(t.get(*n as usize))
            }
            (Value::String(s), Value::Number(n)) => {
                if n.fract() != 0.0 || *n < 0.0 {
                    return Ok(Value::Undefined);
                }
                Ok(s.chars().nth(*n as usize).map(|c| Value::string(c.to_string())).unwrap_or(Value::Undefined))
            }
            (Value::Ref(HeapRef::Object(o)), key) => Ok(o.get(&key.to_property_key()).unwrap_or(Value::Undefined)),
            (Value::Ref(HeapRef::Instance(_) | HeapRef::Namespace(_)), key) => {
                self.get_member(cx, object, &key.to_property_key(), None)
            }
            (_, key) => self.get_member(cx, object, &key.to_property_key(), None),
        }
    }

    /// `object[index] = value`.
    pub fn set_index_value(
        &mut self,
        cx: &dyn EvalContext,
        object: &Value,
        index: &Value,
        value: Value,
    ) -> VmResult<()> {
        match (object, index) {
            (Value::Ref(HeapRef::Array(a)), Value::Number(n)) => {
                if n.fract() == 0.0 && *n >= 0.0 {
                    a.set(*n as usize, value);
                }
                Ok(())
            }
            (Value::Ref(HeapRef::TypedArray(t)), Value::Number(n)) => {
                if n.fract() == 0.0 && *n >= 0.0 {
                    t.set(*n as usize, value.coerce_number());
                }
                Ok(())
            }
            (Value::Ref(HeapRef::Object(o)), key) => {
                o.set(key.to_property_key(), value);
                Ok(())
            }
            (_, key) => self.set_member(cx, object, &key.to_property_key(), value),
        }
    }

    /// The `in` operator.
    pub fn has_property(&self, object: &Value, key: &Value) -> VmResult<bool> {
        match object {
            Value::Ref(HeapRef::Object(o)) => Ok(o.has(&key.to_property_key())),
            Value::Ref(HeapRef::Array(a)) => {
                let n = key.coerce_number();
                Ok(n.fract() == 0.0 && n >= 0.0 && (n as usize) < a.len())
            }
            Value::Ref(HeapRef::Instance(inst)) => {
                let name = key.to_property_key();
                Ok(inst.get_field(&name).is_some() || inst.class.find_method(&name).is_some())
            }
            Value::Ref(HeapRef::Namespace(ns)) => Ok(ns.get(&key.to_property_key()).is_some()),
            _ => Err(VmError::type_error(format!(
                "Cannot use 'in' operator to search for '{}' in {}",
                key.to_display_string(),
                object.to_display_string()
            ))),
        }
    }
}
