//! Free-standing global functions and the remaining constructor bags.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::function::NativeFunction;
use crate::interp::{Interpreter, SyncCx};
use crate::map_data::{MapData, MapKey, SetData, WeakMapData, WeakSetData};
use crate::typed_array::{ElementKind, JsTypedArray};
use crate::value::{string_to_number, HeapRef, Value};

pub(crate) fn parse_int_str(s: &str, radix: Option<u32>) -> f64 {
    let t = s.trim();
    let (negative, t) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t.strip_prefix('+').unwrap_or(t)),
    };
    let (radix, t) = match radix {
        Some(r) => (r, t),
        None => match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
            Some(hex) => (16, hex),
            None => (10, t),
        },
    };
    // take the longest valid prefix
    let valid: String = t.chars().take_while(|c| c.is_digit(radix)).collect();
    if valid.is_empty() {
        return f64::NAN;
    }
    let n = i64::from_str_radix(&valid, radix).map(|n| n as f64).unwrap_or(f64::NAN);
    if negative { -n } else { n }
}

fn native(name: &str, f: impl Fn(&mut Interpreter, &Value, &[Value]) -> VmResult<Value> + 'static) -> Value {
    Value::Ref(HeapRef::Native(NativeFunction::new(name, f)))
}

pub fn create_parse_int() -> Value {
    native("parseInt", |_vm, _this, args| {
        let s = args.first().map(|v| v.to_display_string()).unwrap_or_default();
        let radix = args.get(1).map(|v| v.coerce_number() as u32).filter(|r| (2..=36).contains(r));
        Ok(Value::Number(parse_int_str(&s, radix)))
    })
}

pub fn create_parse_float() -> Value {
    native("parseFloat", |_vm, _this, args| {
        let s = args.first().map(|v| v.to_display_string()).unwrap_or_default();
        let t = s.trim();
        // longest numeric prefix
        let mut end = 0;
        for i in (0..=t.len()).rev() {
            if t.is_char_boundary(i) && t[..i].parse::<f64>().is_ok() {
                end = i;
                break;
            }
        }
        if end == 0 {
            return Ok(Value::Number(f64::NAN));
        }
        Ok(Value::Number(t[..end].parse().expect("validated prefix")))
    })
}

pub fn create_is_nan() -> Value {
    native("isNaN", |_vm, _this, args| {
        Ok(Value::Boolean(args.first().map(|v| v.coerce_number().is_nan()).unwrap_or(true)))
    })
}

pub fn create_is_finite() -> Value {
    native("isFinite", |_vm, _this, args| {
        Ok(Value::Boolean(args.first().map(|v| v.coerce_number().is_finite()).unwrap_or(false)))
    })
}

/// `structuredClone`, over the JSON-safe subset plus Map/Set/Date.
pub fn create_structured_clone() -> Value {
    native("structuredClone", |vm, _this, args| {
        clone_value(vm, args.first().unwrap_or(&Value::Undefined))
    })
}

fn clone_value(vm: &mut Interpreter, v: &Value) -> VmResult<Value> {
    Ok(match v {
        Value::Ref(HeapRef::Array(a)) => {
            let mut out = Vec::with_capacity(a.len());
            for element in a.iter_snapshot() {
                out.push(clone_value(vm, &element)?);
            }
            Value::array(Rc::new(JsArray::from_vec(out)))
        }
        Value::Ref(HeapRef::Object(o)) => {
            let copy = crate::object::JsObject::new();
            for (k, member) in o.entries() {
                copy.set(k, clone_value(vm, &member)?);
            }
            Value::object(Rc::new(copy))
        }
        Value::Ref(HeapRef::Map(m)) => {
            let copy = MapData::new();
            for (k, member) in m.entries_snapshot() {
                copy.set(MapKey::new(clone_value(vm, &k)?), clone_value(vm, &member)?);
            }
            Value::Ref(HeapRef::Map(Rc::new(copy)))
        }
        Value::Ref(HeapRef::Set(s)) => {
            let copy = SetData::new();
            for member in s.values_snapshot() {
                copy.add(clone_value(vm, &member)?);
            }
            Value::Ref(HeapRef::Set(Rc::new(copy)))
        }
        Value::Ref(HeapRef::Date(d)) => {
            Value::Ref(HeapRef::Date(Rc::new(crate::date::JsDate::from_epoch_ms(d.epoch_ms()))))
        }
        Value::Ref(HeapRef::Function(_) | HeapRef::Native(_) | HeapRef::Bound(_)) => {
            return Err(VmError::type_error("function could not be cloned"));
        }
        other => other.clone(),
    })
}

/// `String` constructor: coercion plus `raw`/`fromCharCode`.
pub fn create_string_constructor() -> Value {
    let ctor = NativeFunction::new("String", |_vm, _this, args| {
        Ok(match args.first() {
            None => Value::string(""),
            Some(v) => Value::string(v.to_display_string()),
        })
    });
    ctor.set_property(
        "raw",
        native("raw", |vm, _this, args| {
            let Some(strings) = args.first() else {
                return Err(VmError::type_error("String.raw expects a template object"));
            };
            let raw = vm.get_member(&SyncCx, strings, "raw", None)?;
            let parts = match raw.as_array() {
                Some(a) => a.iter_snapshot(),
                None => strings.as_array().map(|a| a.iter_snapshot()).unwrap_or_default(),
            };
            let mut out = String::new();
            for (i, part) in parts.iter().enumerate() {
                out.push_str(&part.to_display_string());
                if let Some(sub) = args.get(i + 1) {
                    out.push_str(&sub.to_display_string());
                }
            }
            Ok(Value::string(out))
        }),
    );
    ctor.set_property(
        "fromCharCode",
        native("fromCharCode", |_vm, _this, args| {
            let out: String =
                args.iter().filter_map(|v| char::from_u32(v.coerce_number() as u32)).collect();
            Ok(Value::string(out))
        }),
    );
    Value::Ref(HeapRef::Native(ctor))
}

/// `Boolean` constructor: truthiness coercion.
pub fn create_boolean_constructor() -> Value {
    native("Boolean", |_vm, _this, args| {
        Ok(Value::Boolean(args.first().map(|v| v.is_truthy()).unwrap_or(false)))
    })
}

/// `Array` constructor: `Array(n)` presizes, `Array(a, b, ...)` collects;
/// carries `isArray`/`from`/`of`.
pub fn create_array_constructor() -> Value {
    let ctor = NativeFunction::new("Array", |_vm, _this, args| match args {
        [Value::Number(n)] if n.fract() == 0.0 && *n >= 0.0 => {
            Ok(Value::array(Rc::new(JsArray::from_vec(vec![Value::Undefined; *n as usize]))))
        }
        _ => Ok(Value::array(Rc::new(JsArray::from_vec(args.to_vec())))),
    });
    ctor.set_property("isArray", native("isArray", |_vm, _this, args| {
        Ok(Value::Boolean(matches!(args.first(), Some(Value::Ref(HeapRef::Array(_))))))
    }));
    ctor.set_property("from", native("from", |vm, _this, args| {
        let source = args.first().cloned().unwrap_or(Value::Undefined);
        let mut items = vm.iterate_to_vec(&SyncCx, &source)?;
        if let Some(mapper) = args.get(1).filter(|m| m.is_callable()) {
            for (i, item) in items.iter_mut().enumerate() {
                *item = vm.call_value(&SyncCx, mapper, Value::Undefined, vec![item.clone(), Value::Number(i as f64)])?;
            }
        }
        Ok(Value::array(Rc::new(JsArray::from_vec(items))))
    }));
    ctor.set_property("of", native("of", |_vm, _this, args| {
        Ok(Value::array(Rc::new(JsArray::from_vec(args.to_vec()))))
    }));
    Value::Ref(HeapRef::Native(ctor))
}

/// `Map`/`Set`/`WeakMap`/`WeakSet` constructors, seedable from iterables.
pub fn create_map_constructor() -> Value {
    native("Map", |vm, _this, args| {
        let map = MapData::new();
        if let Some(seed) = args.first().filter(|v| !v.is_nullish()) {
            for entry in vm.iterate_to_vec(&SyncCx, seed)? {
                let k = vm.get_index_value(&SyncCx, &entry, &Value::Number(0.0))?;
                let v = vm.get_index_value(&SyncCx, &entry, &Value::Number(1.0))?;
                map.set(MapKey::new(k), v);
            }
        }
        Ok(Value::Ref(HeapRef::Map(Rc::new(map))))
    })
}

pub fn create_set_constructor() -> Value {
    native("Set", |vm, _this, args| {
        let set = SetData::new();
        if let Some(seed) = args.first().filter(|v| !v.is_nullish()) {
            for member in vm.iterate_to_vec(&SyncCx, seed)? {
                set.add(member);
            }
        }
        Ok(Value::Ref(HeapRef::Set(Rc::new(set))))
    })
}

pub fn create_weak_map_constructor() -> Value {
    native("WeakMap", |_vm, _this, _args| Ok(Value::Ref(HeapRef::WeakMap(Rc::new(WeakMapData::new())))))
}

pub fn create_weak_set_constructor() -> Value {
    native("WeakSet", |_vm, _this, _args| Ok(Value::Ref(HeapRef::WeakSet(Rc::new(WeakSetData::new())))))
}

/// One typed-array constructor (`new Uint8Array(n)` / from array / from
/// another typed array).
pub fn create_typed_array_constructor(kind: ElementKind) -> Value {
    native(kind.constructor_name(), move |_vm, _this, args| {
        Ok(Value::Ref(HeapRef::TypedArray(Rc::new(match args.first() {
            None | Some(Value::Undefined) => JsTypedArray::zeroed(kind, 0),
            Some(Value::Number(n)) => {
                if *n < 0.0 || n.fract() != 0.0 {
                    return Err(VmError::range_error("Invalid typed array length"));
                }
                JsTypedArray::zeroed(kind, *n as usize)
            }
            Some(Value::Ref(HeapRef::Array(a))) => {
                JsTypedArray::from_values(kind, a.iter_snapshot().iter().map(|v| v.coerce_number()))
            }
            Some(Value::Ref(HeapRef::TypedArray(t))) => JsTypedArray::from_values(kind, t.to_vec()),
            Some(other) => {
                return Err(VmError::type_error(format!(
                    "cannot construct {} from {}",
                    kind.constructor_name(),
                    other.to_display_string()
                )));
            }
        }))))
    })
}

/// `Reflect` bag: the object-manipulation subset the runtime exposes.
pub fn create_reflect_object() -> Value {
    let obj = crate::object::JsObject::new();
    obj.set("has", native("has", |vm, _this, args| {
        let target = args.first().cloned().unwrap_or(Value::Undefined);
        let key = args.get(1).cloned().unwrap_or(Value::Undefined);
        Ok(Value::Boolean(vm.has_property(&target, &key)?))
    }));
    obj.set("get", native("get", |vm, _this, args| {
        let target = args.first().cloned().unwrap_or(Value::Undefined);
        let key = args.get(1).cloned().unwrap_or(Value::Undefined);
        vm.get_index_value(&SyncCx, &target, &key)
    }));
    obj.set("set", native("set", |vm, _this, args| {
        let target = args.first().cloned().unwrap_or(Value::Undefined);
        let key = args.get(1).cloned().unwrap_or(Value::Undefined);
        let value = args.get(2).cloned().unwrap_or(Value::Undefined);
        vm.set_index_value(&SyncCx, &target, &key, value)?;
        Ok(Value::Boolean(true))
    }));
    obj.set("ownKeys", native("ownKeys", |_vm, _this, args| {
        let target = args.first().cloned().unwrap_or(Value::Undefined);
        let keys = crate::interp::member::own_enumerable_keys(&target);
        Ok(Value::array(Rc::new(JsArray::from_vec(keys.into_iter().map(Value::string).collect()))))
    }));
    obj.set("apply", native("apply", |vm, _this, args| {
        let target = args.first().cloned().unwrap_or(Value::Undefined);
        let this = args.get(1).cloned().unwrap_or(Value::Undefined);
        let list = match args.get(2) {
            Some(Value::Ref(HeapRef::Array(a))) => a.iter_snapshot(),
            _ => Vec::new(),
        };
        vm.call_value(&SyncCx, &target, this, list)
    }));
    Value::object(Rc::new(obj))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_handles_radix_and_prefixes() {
        assert_eq!(parse_int_str("42px", None), 42.0);
        assert_eq!(parse_int_str("  -17 ", None), -17.0);
        assert_eq!(parse_int_str("0xff", None), 255.0);
        assert_eq!(parse_int_str("101", Some(2)), 5.0);
        assert!(parse_int_str("px", None).is_nan());
    }
}
