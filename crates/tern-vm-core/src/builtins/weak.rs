//! WeakMap/WeakSet prototype methods. No iteration, no size.

use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::value::{HeapRef, Value};

fn bad_key(v: &Value) -> VmError {
    VmError::type_error(format!("Invalid value used as weak key: {}", v.to_display_string()))
}

fn get(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    match recv {
        Value::Ref(HeapRef::WeakMap(m)) => Ok(m.get(&args[0]).unwrap_or(Value::Undefined)),
        _ => Err(VmError::type_error("receiver is not a WeakMap")),
    }
}

fn set(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    match recv {
        Value::Ref(HeapRef::WeakMap(m)) => {
            if !m.set(&args[0], args.get(1).cloned().unwrap_or(Value::Undefined)) {
                return Err(bad_key(&args[0]));
            }
            Ok(recv.clone())
        }
        _ => Err(VmError::type_error("receiver is not a WeakMap")),
    }
}

fn add(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    match recv {
        Value::Ref(HeapRef::WeakSet(s)) => {
            if !s.add(&args[0]) {
                return Err(bad_key(&args[0]));
            }
            Ok(recv.clone())
        }
        _ => Err(VmError::type_error("receiver is not a WeakSet")),
    }
}

fn has(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    match recv {
        Value::Ref(HeapRef::WeakMap(m)) => Ok(Value::Boolean(m.has(&args[0]))),
        Value::Ref(HeapRef::WeakSet(s)) => Ok(Value::Boolean(s.has(&args[0]))),
        _ => Err(VmError::type_error("receiver is not weak")),
    }
}

fn delete(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    match recv {
        Value::Ref(HeapRef::WeakMap(m)) => Ok(Value::Boolean(m.delete(&args[0]))),
        Value::Ref(HeapRef::WeakSet(s)) => Ok(Value::Boolean(s.delete(&args[0]))),
        _ => Err(VmError::type_error("receiver is not weak")),
    }
}

method_table! {
    pub fn method {
        "get" => sync(1, 1, get),
        "set" => sync(1, 2, set),
        "add" => sync(1, 1, add),
        "has" => sync(1, 1, has),
        "delete" => sync(1, 1, delete),
    }
}
