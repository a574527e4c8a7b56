//! TypedArray prototype methods.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::typed_array::JsTypedArray;
use crate::value::{relative_index, to_integer_or_infinity, HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<Rc<JsTypedArray>> {
    match recv {
        Value::Ref(HeapRef::TypedArray(t)) => Ok(t.clone()),
        _ => Err(VmError::type_error("receiver is not a typed array")),
    }
}

fn fill(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    receiver(recv)?.fill(args[0].coerce_number());
    Ok(recv.clone())
}

fn at(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let t = receiver(recv)?;
    let len = t.len() as f64;
    let mut i = to_integer_or_infinity(args[0].coerce_number());
    if i < 0.0 {
        i += len;
    }
    if i < 0.0 || i >= len {
        return Ok(Value::Undefined);
    }
    Ok(t.get(i as usize))
}

fn index_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let t = receiver(recv)?;
    let needle = args[0].coerce_number();
    let found = t.to_vec().iter().position(|n| *n == needle);
    Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
}

fn includes(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let t = receiver(recv)?;
    let needle = args[0].coerce_number();
    let found = t.to_vec().iter().any(|n| *n == needle || (n.is_nan() && needle.is_nan()));
    Ok(Value::Boolean(found))
}

fn join(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let t = receiver(recv)?;
    let sep = match args.first() {
        Some(v) if !v.is_undefined() => v.to_display_string(),
        _ => ",".to_string(),
    };
    Ok(Value::string(t.join(&sep)))
}

fn slice(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let t = receiver(recv)?;
    let len = t.len();
    let start = args.first().map(|v| relative_index(v.coerce_number(), len)).unwrap_or(0);
    let end = match args.get(1) {
        Some(v) if !v.is_undefined() => relative_index(v.coerce_number(), len),
        _ => len,
    };
    let data = t.to_vec();
    let out = data.get(start..end.max(start)).unwrap_or_default().to_vec();
    Ok(Value::Ref(HeapRef::TypedArray(Rc::new(JsTypedArray::from_values(t.kind, out)))))
}

/// `toString()` joins with commas; `toString("utf8")` decodes byte arrays
/// (the Buffer surface rides on Uint8Array).
fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let t = receiver(recv)?;
    if let Some(encoding) = args.first().map(|v| v.to_display_string())
        && matches!(encoding.as_str(), "utf8" | "utf-8")
    {
        let bytes: Vec<u8> = t.to_vec().into_iter().map(|n| n as u8).collect();
        return Ok(Value::string(String::from_utf8_lossy(&bytes)));
    }
    Ok(Value::string(t.join(",")))
}

fn to_array(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let t = receiver(recv)?;
    Ok(Value::array(Rc::new(JsArray::from_vec(t.to_vec().into_iter().map(Value::Number).collect()))))
}

method_table! {
    pub fn method {
        "fill" => sync(1, 3, fill),
        "at" => sync(1, 1, at),
        "indexOf" => sync(1, 2, index_of),
        "includes" => sync(1, 2, includes),
        "join" => sync(0, 1, join),
        "slice" => sync(0, 2, slice),
        "toString" => sync(0, 1, to_string),
        "toArray" => sync(0, 0, to_array),
    }
}
