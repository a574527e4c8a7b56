//! Set prototype methods, including the ES2025 set operations.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::map_data::SetData;
use crate::value::{HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<Rc<SetData>> {
    match recv {
        Value::Ref(HeapRef::Set(s)) => Ok(s.clone()),
        _ => Err(VmError::type_error("receiver is not a Set")),
    }
}

fn other_set(v: &Value) -> VmResult<Rc<SetData>> {
    match v {
        Value::Ref(HeapRef::Set(s)) => Ok(s.clone()),
        other => Err(VmError::type_error(format!("{} is not a Set", other.to_display_string()))),
    }
}

fn add(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let member = args[0].clone();
    if member.is_null() {
        return Err(VmError::type_error("Set members may not be null"));
    }
    s.add(member);
    Ok(recv.clone())
}

fn has(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::Boolean(receiver(recv)?.has(&args[0])))
}

fn delete(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::Boolean(receiver(recv)?.delete(&args[0])))
}

fn clear(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    receiver(recv)?.clear();
    Ok(Value::Undefined)
}

fn for_each(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let s = receiver(recv)?;
    let cb = &args[0];
    for v in s.values_snapshot() {
        vm.call_value(cx, cb, Value::Undefined, vec![v.clone(), v, recv.clone()])?;
    }
    Ok(Value::Undefined)
}

fn values(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::array(Rc::new(JsArray::from_vec(receiver(recv)?.values_snapshot()))))
}

fn entries(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let out: Vec<Value> = receiver(recv)?
        .values_snapshot()
        .into_iter()
        .map(|v| Value::array(Rc::new(JsArray::from_vec(vec![v.clone(), v]))))
        .collect();
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn union(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let other = other_set(&args[0])?;
    let out = SetData::new();
    for v in s.values_snapshot() {
        out.add(v);
    }
    for v in other.values_snapshot() {
        out.add(v);
    }
    Ok(Value::Ref(HeapRef::Set(Rc::new(out))))
}

fn intersection(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let other = other_set(&args[0])?;
    let out = SetData::new();
    for v in s.values_snapshot() {
        if other.has(&v) {
            out.add(v);
        }
    }
    Ok(Value::Ref(HeapRef::Set(Rc::new(out))))
}

fn difference(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let other = other_set(&args[0])?;
    let out = SetData::new();
    for v in s.values_snapshot() {
        if !other.has(&v) {
            out.add(v);
        }
    }
    Ok(Value::Ref(HeapRef::Set(Rc::new(out))))
}

fn symmetric_difference(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let other = other_set(&args[0])?;
    let out = SetData::new();
    for v in s.values_snapshot() {
        if !other.has(&v) {
            out.add(v);
        }
    }
    for v in other.values_snapshot() {
        if !s.has(&v) {
            out.add(v);
        }
    }
    Ok(Value::Ref(HeapRef::Set(Rc::new(out))))
}

fn is_subset_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let other = other_set(&args[0])?;
    Ok(Value::Boolean(s.values_snapshot().iter().all(|v| other.has(v))))
}

fn is_superset_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let other = other_set(&args[0])?;
    Ok(Value::Boolean(other.values_snapshot().iter().all(|v| s.has(v))))
}

fn is_disjoint_from(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let s = receiver(recv)?;
    let other = other_set(&args[0])?;
    Ok(Value::Boolean(s.values_snapshot().iter().all(|v| !other.has(v))))
}

method_table! {
    pub fn method {
        "add" => sync(1, 1, add),
        "has" => sync(1, 1, has),
        "delete" => sync(1, 1, delete),
        "clear" => sync(0, 0, clear),
        "forEach" => sync(1, 2, for_each),
        "keys" => sync(0, 0, values),
        "values" => sync(0, 0, values),
        "entries" => sync(0, 0, entries),
        "union" => sync(1, 1, union),
        "intersection" => sync(1, 1, intersection),
        "difference" => sync(1, 1, difference),
        "symmetricDifference" => sync(1, 1, symmetric_difference),
        "isSubsetOf" => sync(1, 1, is_subset_of),
        "isSupersetOf" => sync(1, 1, is_superset_of),
        "isDisjointFrom" => sync(1, 1, is_disjoint_from),
    }
}
