//! The `Buffer` surface, backed by `Uint8Array` storage.

use std::rc::Rc;

use crate::error::{VmError, VmResult};
use crate::function::NativeFunction;
use crate::typed_array::{ElementKind, JsTypedArray};
use crate::value::{HeapRef, Value};

fn bytes_of(v: &Value) -> Option<Vec<u8>> {
    match v {
        Value::Ref(HeapRef::TypedArray(t)) if t.kind == ElementKind::Uint8 => {
            Some(t.to_vec().into_iter().map(|n| n as u8).collect())
        }
        _ => None,
    }
}

fn make(bytes: impl IntoIterator<Item = u8>) -> Value {
    Value::Ref(HeapRef::TypedArray(Rc::new(JsTypedArray::from_values(
        ElementKind::Uint8,
        bytes.into_iter().map(|b| b as f64),
    ))))
}

/// Build the global `Buffer` bag: `from`/`alloc`/`byteLength`/`concat`/
/// `isBuffer`.
pub fn create_buffer_object() -> Value {
    let ctor = NativeFunction::new("Buffer", |_vm, _this, _args| {
        Err(VmError::type_error("Buffer is not directly constructable; use Buffer.from or Buffer.alloc"))
    });
    let native = |name: &str, f: fn(&mut crate::interp::Interpreter, &Value, &[Value]) -> VmResult<Value>| {
        Value::Ref(HeapRef::Native(NativeFunction::new(name, f)))
    };

    ctor.set_property("from", native("from", |_vm, _this, args| {
        match args.first() {
            Some(Value::String(s)) => Ok(make(s.bytes())),
            Some(Value::Ref(HeapRef::Array(a))) => {
                Ok(make(a.iter_snapshot().into_iter().map(|v| v.coerce_number() as u8)))
            }
            Some(v) if bytes_of(v).is_some() => Ok(make(bytes_of(v).expect("checked above"))),
            _ => Err(VmError::type_error("Buffer.from expects a string, array, or buffer")),
        }
    }));
    ctor.set_property("alloc", native("alloc", |_vm, _this, args| {
        let n = args.first().map(|v| v.coerce_number()).unwrap_or(0.0);
        if n < 0.0 || n.fract() != 0.0 {
            return Err(VmError::range_error("Invalid buffer size"));
        }
        Ok(Value::Ref(HeapRef::TypedArray(Rc::new(JsTypedArray::zeroed(ElementKind::Uint8, n as usize)))))
    }));
    ctor.set_property("byteLength", native("byteLength", |_vm, _this, args| {
        match args.first() {
            Some(Value::String(s)) => Ok(Value::Number(s.len() as f64)),
            Some(v) => match bytes_of(v) {
                Some(b) => Ok(Value::Number(b.len() as f64)),
                None => Err(VmError::type_error("Buffer.byteLength expects a string or buffer")),
            },
            None => Err(VmError::type_error("Buffer.byteLength expects an argument")),
        }
    }));
    ctor.set_property("concat", native("concat", |_vm, _this, args| {
        let Some(Value::Ref(HeapRef::Array(list))) = args.first() else {
            return Err(VmError::type_error("Buffer.concat expects an array of buffers"));
        };
        let mut out = Vec::new();
        for item in list.iter_snapshot() {
            match bytes_of(&item) {
                Some(b) => out.extend(b),
                None => return Err(VmError::type_error("Buffer.concat list must contain only buffers")),
            }
        }
        Ok(make(out))
    }));
    ctor.set_property("isBuffer", native("isBuffer", |_vm, _this, args| {
        Ok(Value::Boolean(args.first().map(|v| bytes_of(v).is_some()).unwrap_or(false)))
    }));
    Value::Ref(HeapRef::Native(ctor))
}
