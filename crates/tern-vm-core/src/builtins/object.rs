//! Object prototype methods and the `Object` statics bag.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::function::NativeFunction;
use crate::interp::member::own_enumerable_keys;
use crate::interp::{EvalContext, Interpreter};
use crate::object::JsObject;
use crate::value::{HeapRef, Value};

fn has_own_property(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let key = args[0].to_property_key();
    Ok(Value::Boolean(match recv {
        Value::Ref(HeapRef::Object(o)) => o.has(&key),
        Value::Ref(HeapRef::Instance(i)) => i.get_field(&key).is_some(),
        _ => false,
    }))
}

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(recv.to_display_string()))
}

method_table! {
    pub fn method {
        "hasOwnProperty" => sync(1, 1, has_own_property),
        "toString" => sync(0, 0, to_string),
    }
}

// ============================================================================
// Statics
// ============================================================================

fn pairs(v: &Value, vm: &mut Interpreter) -> VmResult<Vec<(String, Value)>> {
    let mut out = Vec::new();
    for key in own_enumerable_keys(v) {
        let value = vm.get_index_value(&crate::interp::SyncCx, v, &Value::string(&key))?;
        out.push((key, value));
    }
    Ok(out)
}

/// Build the global `Object` constructor: callable (returns a fresh object
/// or its argument), carrying the statics.
pub fn create_object_constructor() -> Value {
    let ctor = NativeFunction::new("Object", |_vm, _this, args| match args.first() {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(Value::object(Rc::new(JsObject::new()))),
        Some(v) => Ok(v.clone()),
    });
    let native = |name: &str, f: fn(&mut Interpreter, &Value, &[Value]) -> VmResult<Value>| {
        Value::Ref(HeapRef::Native(NativeFunction::new(name, f)))
    };

    ctor.set_property("keys", native("keys", |vm, _this, args| {
        let keys = pairs(args.first().unwrap_or(&Value::Undefined), vm)?;
        Ok(Value::array(Rc::new(JsArray::from_vec(keys.into_iter().map(|(k, _)| Value::string(k)).collect()))))
    }));
    ctor.set_property("values", native("values", |vm, _this, args| {
        let entries = pairs(args.first().unwrap_or(&Value::Undefined), vm)?;
        Ok(Value::array(Rc::new(JsArray::from_vec(entries.into_iter().map(|(_, v)| v).collect()))))
    }));
    ctor.set_property("entries", native("entries", |vm, _this, args| {
        let entries = pairs(args.first().unwrap_or(&Value::Undefined), vm)?;
        let out: Vec<Value> = entries
            .into_iter()
            .map(|(k, v)| Value::array(Rc::new(JsArray::from_vec(vec![Value::string(k), v]))))
            .collect();
        Ok(Value::array(Rc::new(JsArray::from_vec(out))))
    }));
    ctor.set_property("fromEntries", native("fromEntries", |vm, _this, args| {
        let entries = vm.iterate_to_vec(&crate::interp::SyncCx, args.first().unwrap_or(&Value::Undefined))?;
        let obj = JsObject::new();
        for entry in entries {
            let key = vm.get_index_value(&crate::interp::SyncCx, &entry, &Value::Number(0.0))?;
            let value = vm.get_index_value(&crate::interp::SyncCx, &entry, &Value::Number(1.0))?;
            obj.set(key.to_property_key(), value);
        }
        Ok(Value::object(Rc::new(obj)))
    }));
    ctor.set_property("hasOwn", native("hasOwn", |vm, _this, args| {
        let target = args.first().cloned().unwrap_or(Value::Undefined);
        let key = args.get(1).cloned().unwrap_or(Value::Undefined);
        has_own_property(vm, &crate::interp::SyncCx, &target, &[key])
    }));
    ctor.set_property("assign", native("assign", |vm, _this, args| {
        let target = args.first().cloned().unwrap_or(Value::Undefined);
        let Some(obj) = target.as_object().cloned() else {
            return Err(VmError::type_error("Object.assign target must be an object"));
        };
        for source in args.get(1..).unwrap_or_default() {
            if source.is_nullish() {
                continue;
            }
            for (k, v) in pairs(source, vm)? {
                obj.set(k, v);
            }
        }
        Ok(target)
    }));
    ctor.set_property("freeze", native("freeze", |_vm, _this, args| {
        let v = args.first().cloned().unwrap_or(Value::Undefined);
        match &v {
            Value::Ref(HeapRef::Object(o)) => o.freeze(),
            Value::Ref(HeapRef::Array(a)) => a.freeze(),
            Value::Ref(HeapRef::Instance(i)) => i.freeze(),
            _ => {}
        }
        Ok(v)
    }));
    ctor.set_property("seal", native("seal", |_vm, _this, args| {
        let v = args.first().cloned().unwrap_or(Value::Undefined);
        match &v {
            Value::Ref(HeapRef::Object(o)) => o.seal(),
            Value::Ref(HeapRef::Array(a)) => a.seal(),
            Value::Ref(HeapRef::Instance(i)) => i.seal(),
            _ => {}
        }
        Ok(v)
    }));
    ctor.set_property("isFrozen", native("isFrozen", |_vm, _this, args| {
        Ok(Value::Boolean(match args.first() {
            Some(Value::Ref(HeapRef::Object(o))) => o.is_frozen(),
            Some(Value::Ref(HeapRef::Array(a))) => a.is_frozen(),
            Some(Value::Ref(HeapRef::Instance(i))) => i.is_frozen(),
            Some(Value::Ref(_)) => false,
            // primitives are vacuously frozen
            _ => true,
        }))
    }));
    ctor.set_property("isSealed", native("isSealed", |_vm, _this, args| {
        Ok(Value::Boolean(match args.first() {
            Some(Value::Ref(HeapRef::Object(o))) => o.is_sealed(),
            Some(Value::Ref(HeapRef::Array(a))) => a.is_sealed(),
            Some(Value::Ref(HeapRef::Instance(i))) => i.is_sealed(),
            Some(Value::Ref(_)) => false,
            _ => true,
        }))
    }));
    Value::Ref(HeapRef::Native(ctor))
}
