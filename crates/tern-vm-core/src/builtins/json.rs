//! The `JSON` namespace object, backed by serde_json.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::function::NativeFunction;
use crate::interp::member::own_enumerable_keys;
use crate::interp::{Interpreter, SyncCx};
use crate::object::JsObject;
use crate::value::{HeapRef, Value};

/// Build the `JSON` global.
pub fn create_json_object() -> Value {
    let obj = JsObject::new();
    obj.set(
        "parse",
        Value::Ref(HeapRef::Native(NativeFunction::new("parse", |_vm, _this, args| {
            let text = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            let parsed: serde_json::Value = serde_json::from_str(&text)
                .map_err(|e| VmError::syntax_error(format!("Unexpected token in JSON: {e}")))?;
            Ok(from_json(&parsed))
        }))),
    );
    obj.set(
        "stringify",
        Value::Ref(HeapRef::Native(NativeFunction::new("stringify", |vm, _this, args| {
            let value = args.first().cloned().unwrap_or(Value::Undefined);
            let Some(json) = to_json(vm, &value)? else {
                return Ok(Value::Undefined);
            };
            let indent = match args.get(2) {
                Some(Value::Number(n)) if *n >= 1.0 => Some(" ".repeat((*n as usize).min(10))),
                Some(Value::String(s)) if !s.is_empty() => Some(s.to_string()),
                _ => None,
            };
            let rendered = match indent {
                Some(indent) => {
                    let buf = Vec::new();
                    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
                    let mut ser = serde_json::Serializer::with_formatter(buf, formatter);
                    serde::Serialize::serialize(&json, &mut ser)
                        .map_err(|e| VmError::internal(format!("JSON serialization failed: {e}")))?;
                    String::from_utf8(ser.into_inner()).expect("serde_json emits utf8")
                }
                None => serde_json::to_string(&json)
                    .map_err(|e| VmError::internal(format!("JSON serialization failed: {e}")))?,
            };
            Ok(Value::string(rendered))
        }))),
    );
    Value::object(Rc::new(obj))
}

fn from_json(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(items) => {
            Value::array(Rc::new(JsArray::from_vec(items.iter().map(from_json).collect())))
        }
        serde_json::Value::Object(entries) => {
            // preserve_order keeps source order here
            let obj = JsObject::new();
            for (k, v) in entries {
                obj.set(k.clone(), from_json(v));
            }
            Value::object(Rc::new(obj))
        }
    }
}

/// Convert to a JSON tree. `None` means the value is not representable
/// (undefined, functions): omitted from objects, null in arrays.
fn to_json(vm: &mut Interpreter, v: &Value) -> VmResult<Option<serde_json::Value>> {
    Ok(Some(match v {
        Value::Undefined | Value::Symbol(_) => return Ok(None),
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if !n.is_finite() {
                serde_json::Value::Null
            } else if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
                // integral doubles render without a trailing `.0`
                serde_json::Value::Number(serde_json::Number::from(*n as i64))
            } else {
                serde_json::Number::from_f64(*n).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
            }
        }
        Value::BigInt(_) => return Err(VmError::type_error("Do not know how to serialize a BigInt")),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Ref(HeapRef::Array(a)) => {
            let mut out = Vec::with_capacity(a.len());
            for element in a.iter_snapshot() {
                out.push(to_json(vm, &element)?.unwrap_or(serde_json::Value::Null));
            }
            serde_json::Value::Array(out)
        }
        Value::Ref(HeapRef::Date(d)) => serde_json::Value::String(d.to_iso_string()),
        Value::Ref(HeapRef::Function(_) | HeapRef::Native(_) | HeapRef::Bound(_) | HeapRef::Class(_)) => {
            return Ok(None);
        }
        Value::Ref(HeapRef::Object(_) | HeapRef::Instance(_) | HeapRef::Namespace(_)) => {
            let mut out = serde_json::Map::new();
            for key in own_enumerable_keys(v) {
                let member = vm.get_index_value(&SyncCx, v, &Value::string(&key))?;
                if let Some(encoded) = to_json(vm, &member)? {
                    out.insert(key, encoded);
                }
            }
            serde_json::Value::Object(out)
        }
        // remaining heap kinds (Map, Set, RegExp, ...) serialize as empty
        // objects, as they do in JS
        Value::Ref(_) => serde_json::Value::Object(serde_json::Map::new()),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::{Resolutions, TypeMap};

    fn vm() -> Interpreter {
        Interpreter::new(Rc::new(Resolutions::new()), Rc::new(TypeMap::new()))
    }

    #[test]
    fn object_round_trip_preserves_key_order() {
        let mut vm = vm();
        let parsed: serde_json::Value = serde_json::from_str(r#"{"z":1,"a":[true,null],"m":"s"}"#).unwrap();
        let value = from_json(&parsed);
        assert_eq!(value.as_object().unwrap().keys(), vec!["z", "a", "m"]);
        let back = to_json(&mut vm, &value).unwrap().unwrap();
        assert_eq!(serde_json::to_string(&back).unwrap(), r#"{"z":1,"a":[true,null],"m":"s"}"#);
    }

    #[test]
    fn undefined_is_omitted_from_objects_but_null_in_arrays() {
        let mut vm = vm();
        let obj = JsObject::new();
        obj.set("keep", Value::Number(1.0));
        obj.set("drop", Value::Undefined);
        let json = to_json(&mut vm, &Value::object(Rc::new(obj))).unwrap().unwrap();
        assert_eq!(serde_json::to_string(&json).unwrap(), r#"{"keep":1}"#);

        let arr = JsArray::from_vec(vec![Value::Undefined]);
        let json = to_json(&mut vm, &Value::array(Rc::new(arr))).unwrap().unwrap();
        assert_eq!(serde_json::to_string(&json).unwrap(), "[null]");
    }
}
