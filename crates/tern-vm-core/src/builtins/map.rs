//! Map prototype methods.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::map_data::{MapData, MapKey};
use crate::value::{HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<Rc<MapData>> {
    match recv {
        Value::Ref(HeapRef::Map(m)) => Ok(m.clone()),
        _ => Err(VmError::type_error("receiver is not a Map")),
    }
}

fn get(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let m = receiver(recv)?;
    Ok(m.get(&MapKey::new(args[0].clone())).unwrap_or(Value::Undefined))
}

fn set(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let m = receiver(recv)?;
    let key = args[0].clone();
    if key.is_null() {
        return Err(VmError::type_error("Map keys may not be null"));
    }
    m.set(MapKey::new(key), args.get(1).cloned().unwrap_or(Value::Undefined));
    Ok(recv.clone())
}

fn has(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let m = receiver(recv)?;
    Ok(Value::Boolean(m.has(&MapKey::new(args[0].clone()))))
}

fn delete(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let m = receiver(recv)?;
    Ok(Value::Boolean(m.delete(&MapKey::new(args[0].clone()))))
}

fn clear(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    receiver(recv)?.clear();
    Ok(Value::Undefined)
}

fn for_each(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let m = receiver(recv)?;
    let cb = &args[0];
    for (k, v) in m.entries_snapshot() {
        vm.call_value(cx, cb, Value::Undefined, vec![v, k, recv.clone()])?;
    }
    Ok(Value::Undefined)
}

fn keys(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let m = receiver(recv)?;
    let out: Vec<Value> = m.entries_snapshot().into_iter().map(|(k, _)| k).collect();
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn values(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let m = receiver(recv)?;
    let out: Vec<Value> = m.entries_snapshot().into_iter().map(|(_, v)| v).collect();
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn entries(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let m = receiver(recv)?;
    let out: Vec<Value> = m
        .entries_snapshot()
        .into_iter()
        .map(|(k, v)| Value::array(Rc::new(JsArray::from_vec(vec![k, v]))))
        .collect();
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

method_table! {
    pub fn method {
        "get" => sync(1, 1, get),
        "set" => sync(1, 2, set),
        "has" => sync(1, 1, has),
        "delete" => sync(1, 1, delete),
        "clear" => sync(0, 0, clear),
        "forEach" => sync(1, 2, for_each),
        "keys" => sync(0, 0, keys),
        "values" => sync(0, 0, values),
        "entries" => sync(0, 0, entries),
    }
}
