//! Array prototype methods.
//!
//! Mutating methods raise TypeError on frozen receivers (sealed receivers
//! still allow value mutation, so `sort`/`reverse`/`fill` pass); index
//! arguments go through ToIntegerOrInfinity with negative-from-end
//! clamping.

use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::value::{relative_index, to_integer_or_infinity, HeapRef, Value};

use super::VARIADIC;

fn receiver(recv: &Value) -> VmResult<Rc<JsArray>> {
    recv.as_array().cloned().ok_or_else(|| VmError::type_error("receiver is not an Array"))
}

fn require_unlocked(a: &JsArray, op: &str) -> VmResult<()> {
    if !a.can_mutate_structure() {
        return Err(VmError::type_error(format!("Cannot {op} a frozen or sealed array")));
    }
    Ok(())
}

fn require_writable(a: &JsArray, op: &str) -> VmResult<()> {
    if a.is_frozen() {
        return Err(VmError::type_error(format!("Cannot {op} a frozen array")));
    }
    Ok(())
}

/// `(element, index, array)` callback invocation shared by the iteration
/// methods.
fn invoke(
    vm: &mut Interpreter,
    cx: &dyn EvalContext,
    cb: &Value,
    element: Value,
    index: usize,
    array: &Value,
) -> VmResult<Value> {
    vm.call_value(cx, cb, Value::Undefined, vec![element, Value::Number(index as f64), array.clone()])
}

fn push(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    require_unlocked(&a, "push onto")?;
    for arg in args {
        a.push(arg.clone());
    }
    Ok(Value::Number(a.len() as f64))
}

fn pop(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    require_unlocked(&a, "pop from")?;
    Ok(a.pop().unwrap_or(Value::Undefined))
}

fn shift(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    require_unlocked(&a, "shift from")?;
    Ok(a.with_elements_mut(|els| if els.is_empty() { Value::Undefined } else { els.remove(0) }))
}

fn unshift(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    require_unlocked(&a, "unshift onto")?;
    a.with_elements_mut(|els| {
        for (i, arg) in args.iter().enumerate() {
            els.insert(i, arg.clone());
        }
    });
    Ok(Value::Number(a.len() as f64))
}

fn slice(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let len = a.len();
    let start = args.first().map(|v| relative_index(v.coerce_number(), len)).unwrap_or(0);
    let end = match args.get(1) {
        Some(v) if !v.is_undefined() => relative_index(v.coerce_number(), len),
        _ => len,
    };
    let out = a.with_elements(|els| els.get(start..end.max(start)).map(|s| s.to_vec()).unwrap_or_default());
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn splice(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    require_unlocked(&a, "splice")?;
    let removed = splice_impl(&a, args);
    Ok(Value::array(Rc::new(JsArray::from_vec(removed))))
}

fn to_spliced(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let copy = JsArray::from_vec(a.iter_snapshot());
    splice_impl(&copy, args);
    Ok(Value::array(Rc::new(copy)))
}

/// Shared splice body: mutates `a`, returns the removed slice.
fn splice_impl(a: &JsArray, args: &[Value]) -> Vec<Value> {
    let len = a.len();
    let start = args.first().map(|v| relative_index(v.coerce_number(), len)).unwrap_or(0);
    let delete_count = match args.get(1) {
        Some(v) if !v.is_undefined() => {
            let n = to_integer_or_infinity(v.coerce_number()).max(0.0) as usize;
            n.min(len - start)
        }
        _ => len - start,
    };
    let inserted: Vec<Value> = args.get(2..).map(|s| s.to_vec()).unwrap_or_default();
    a.with_elements_mut(|els| els.splice(start..start + delete_count, inserted).collect())
}

fn concat(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let mut out = a.iter_snapshot();
    for arg in args {
        match arg {
            Value::Ref(HeapRef::Array(other)) => out.extend(other.iter_snapshot()),
            other => out.push(other.clone()),
        }
    }
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn join(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let sep = match args.first() {
        Some(v) if !v.is_undefined() => v.to_display_string(),
        _ => ",".to_string(),
    };
    let parts: Vec<String> = a
        .iter_snapshot()
        .iter()
        .map(|v| if v.is_nullish() { String::new() } else { v.to_display_string() })
        .collect();
    Ok(Value::string(parts.join(&sep)))
}

fn reverse(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    require_writable(&a, "reverse")?;
    a.with_elements_mut(|els| els.reverse());
    Ok(recv.clone())
}

fn to_reversed(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let mut out = a.iter_snapshot();
    out.reverse();
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn index_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let needle = args.first().cloned().unwrap_or(Value::Undefined);
    let found = a.with_elements(|els| els.iter().position(|v| v.strict_equals(&needle)));
    Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
}

fn last_index_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let needle = args.first().cloned().unwrap_or(Value::Undefined);
    let found = a.with_elements(|els| els.iter().rposition(|v| v.strict_equals(&needle)));
    Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
}

fn includes(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let needle = args.first().cloned().unwrap_or(Value::Undefined);
    // includes uses SameValueZero, so NaN is findable
    let found = a.with_elements(|els| els.iter().any(|v| v.same_value_zero(&needle)));
    Ok(Value::Boolean(found))
}

fn at(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let len = a.len() as f64;
    let mut i = to_integer_or_infinity(args.first().map(|v| v.coerce_number()).unwrap_or(0.0));
    if i < 0.0 {
        i += len;
    }
    if i < 0.0 || i >= len {
        return Ok(Value::Undefined);
    }
    Ok(a.get(i as usize))
}

fn find(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    for (i, element) in a.iter_snapshot().into_iter().enumerate() {
        if invoke(vm, cx, cb, element.clone(), i, recv)?.is_truthy() {
            return Ok(element);
        }
    }
    Ok(Value::Undefined)
}

fn find_index(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    for (i, element) in a.iter_snapshot().into_iter().enumerate() {
        if invoke(vm, cx, cb, element, i, recv)?.is_truthy() {
            return Ok(Value::Number(i as f64));
        }
    }
    Ok(Value::Number(-1.0))
}

fn find_last(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    let snapshot = a.iter_snapshot();
    for (i, element) in snapshot.into_iter().enumerate().rev() {
        if invoke(vm, cx, cb, element.clone(), i, recv)?.is_truthy() {
            return Ok(element);
        }
    }
    Ok(Value::Undefined)
}

fn find_last_index(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    let snapshot = a.iter_snapshot();
    for (i, element) in snapshot.into_iter().enumerate().rev() {
        if invoke(vm, cx, cb, element, i, recv)?.is_truthy() {
            return Ok(Value::Number(i as f64));
        }
    }
    Ok(Value::Number(-1.0))
}

fn some(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    for (i, element) in a.iter_snapshot().into_iter().enumerate() {
        if invoke(vm, cx, cb, element, i, recv)?.is_truthy() {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

fn every(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    for (i, element) in a.iter_snapshot().into_iter().enumerate() {
        if !invoke(vm, cx, cb, element, i, recv)?.is_truthy() {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

fn map(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    let snapshot = a.iter_snapshot();
    let mut out = Vec::with_capacity(snapshot.len());
    for (i, element) in snapshot.into_iter().enumerate() {
        out.push(invoke(vm, cx, cb, element, i, recv)?);
    }
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn filter(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    let mut out = Vec::new();
    for (i, element) in a.iter_snapshot().into_iter().enumerate() {
        if invoke(vm, cx, cb, element.clone(), i, recv)?.is_truthy() {
            out.push(element);
        }
    }
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn for_each(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    for (i, element) in a.iter_snapshot().into_iter().enumerate() {
        invoke(vm, cx, cb, element, i, recv)?;
    }
    Ok(Value::Undefined)
}

fn reduce(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    let snapshot = a.iter_snapshot();
    let mut iter = snapshot.into_iter().enumerate();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match iter.next() {
            Some((_, first)) => first,
            None => return Err(VmError::type_error("Reduce of empty array with no initial value")),
        },
    };
    for (i, element) in iter {
        acc = vm.call_value(
            cx,
            cb,
            Value::Undefined,
            vec![acc, element, Value::Number(i as f64), recv.clone()],
        )?;
    }
    Ok(acc)
}

fn reduce_right(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    let snapshot = a.iter_snapshot();
    let mut iter = snapshot.into_iter().enumerate().rev();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match iter.next() {
            Some((_, last)) => last,
            None => return Err(VmError::type_error("Reduce of empty array with no initial value")),
        },
    };
    for (i, element) in iter {
        acc = vm.call_value(
            cx,
            cb,
            Value::Undefined,
            vec![acc, element, Value::Number(i as f64), recv.clone()],
        )?;
    }
    Ok(acc)
}

fn flat(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let depth = match args.first() {
        Some(v) if !v.is_undefined() => to_integer_or_infinity(v.coerce_number()),
        _ => 1.0,
    };
    let mut out = Vec::new();
    flatten_into(&a, depth, &mut out);
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn flatten_into(a: &JsArray, depth: f64, out: &mut Vec<Value>) {
    for element in a.iter_snapshot() {
        match &element {
            Value::Ref(HeapRef::Array(inner)) if depth >= 1.0 => flatten_into(inner, depth - 1.0, out),
            _ => out.push(element),
        }
    }
}

fn flat_map(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let cb = &args[0];
    let mut out = Vec::new();
    for (i, element) in a.iter_snapshot().into_iter().enumerate() {
        let mapped = invoke(vm, cx, cb, element, i, recv)?;
        match &mapped {
            Value::Ref(HeapRef::Array(inner)) => out.extend(inner.iter_snapshot()),
            _ => out.push(mapped),
        }
    }
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn fill(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    require_writable(&a, "fill")?;
    let len = a.len();
    let value = args.first().cloned().unwrap_or(Value::Undefined);
    let start = args.get(1).map(|v| relative_index(v.coerce_number(), len)).unwrap_or(0);
    let end = match args.get(2) {
        Some(v) if !v.is_undefined() => relative_index(v.coerce_number(), len),
        _ => len,
    };
    a.with_elements_mut(|els| {
        for slot in els.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    });
    Ok(recv.clone())
}

/// Stable sort with JS semantics: undefined entries partition to the tail,
/// the rest sort by the comparator, or by string comparison (so numbers
/// order as strings) when none is given.
fn sort(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    require_writable(&a, "sort")?;
    let sorted = sort_impl(vm, cx, a.iter_snapshot(), args.first())?;
    a.with_elements_mut(|els| *els = sorted);
    Ok(recv.clone())
}

fn to_sorted(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let a = receiver(recv)?;
    let sorted = sort_impl(vm, cx, a.iter_snapshot(), args.first())?;
    Ok(Value::array(Rc::new(JsArray::from_vec(sorted))))
}

fn sort_impl(
    vm: &mut Interpreter,
    cx: &dyn EvalContext,
    elements: Vec<Value>,
    comparator: Option<&Value>,
) -> VmResult<Vec<Value>> {
    // partition undefined to the tail before sorting the remainder
    let (mut sortable, undefineds): (Vec<Value>, Vec<Value>) =
        elements.into_iter().partition(|v| !v.is_undefined());

    match comparator {
        Some(cb) if cb.is_callable() => {
            // Vec::sort_by is stable; comparator errors are stashed and
            // re-raised after the sort finishes
            let mut failure: Option<crate::error::VmError> = None;
            let mut pairs: Vec<(usize, Value)> = sortable.drain(..).enumerate().collect();
            pairs.sort_by(|(ia, a), (ib, b)| {
                if failure.is_some() {
                    return ia.cmp(ib);
                }
                match vm.call_value(cx, cb, Value::Undefined, vec![a.clone(), b.clone()]) {
                    Ok(v) => {
                        let n = v.coerce_number();
                        if n < 0.0 {
                            std::cmp::Ordering::Less
                        } else if n > 0.0 {
                            std::cmp::Ordering::Greater
                        } else {
                            std::cmp::Ordering::Equal
                        }
                    }
                    Err(e) => {
                        failure = Some(e);
                        ia.cmp(ib)
                    }
                }
            });
            if let Some(e) = failure {
                return Err(e);
            }
            sortable = pairs.into_iter().map(|(_, v)| v).collect();
        }
        _ => {
            sortable.sort_by(|a, b| a.to_display_string().cmp(&b.to_display_string()));
        }
    }
    sortable.extend(undefineds);
    Ok(sortable)
}

fn keys(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let out: Vec<Value> = (0..a.len()).map(|i| Value::Number(i as f64)).collect();
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn values(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    Ok(Value::array(Rc::new(JsArray::from_vec(a.iter_snapshot()))))
}

fn entries(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let a = receiver(recv)?;
    let out: Vec<Value> = a
        .iter_snapshot()
        .into_iter()
        .enumerate()
        .map(|(i, v)| Value::array(Rc::new(JsArray::from_vec(vec![Value::Number(i as f64), v]))))
        .collect();
    Ok(Value::array(Rc::new(JsArray::from_vec(out))))
}

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(recv.to_display_string()))
}

method_table! {
    pub fn method {
        "push" => sync(0, VARIADIC, push),
        "pop" => sync(0, 0, pop),
        "shift" => sync(0, 0, shift),
        "unshift" => sync(0, VARIADIC, unshift),
        "slice" => sync(0, 2, slice),
        "splice" => sync(0, VARIADIC, splice),
        "toSpliced" => sync(0, VARIADIC, to_spliced),
        "concat" => sync(0, VARIADIC, concat),
        "join" => sync(0, 1, join),
        "reverse" => sync(0, 0, reverse),
        "toReversed" => sync(0, 0, to_reversed),
        "indexOf" => sync(1, 2, index_of),
        "lastIndexOf" => sync(1, 2, last_index_of),
        "includes" => sync(1, 2, includes),
        "at" => sync(1, 1, at),
        "find" => sync(1, 2, find),
        "findIndex" => sync(1, 2, find_index),
        "findLast" => sync(1, 2, find_last),
        "findLastIndex" => sync(1, 2, find_last_index),
        "some" => sync(1, 2, some),
        "every" => sync(1, 2, every),
        "map" => sync(1, 2, map),
        "filter" => sync(1, 2, filter),
        "forEach" => sync(1, 2, for_each),
        "reduce" => sync(1, 2, reduce),
        "reduceRight" => sync(1, 2, reduce_right),
        "flat" => sync(0, 1, flat),
        "flatMap" => sync(1, 2, flat_map),
        "fill" => sync(1, 3, fill),
        "sort" => sync(0, 1, sort),
        "toSorted" => sync(0, 1, to_sorted),
        "keys" => sync(0, 0, keys),
        "values" => sync(0, 0, values),
        "entries" => sync(0, 0, entries),
        "toString" => sync(0, 0, to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::{Resolutions, TypeMap};

    fn vm() -> Interpreter {
        Interpreter::new(Rc::new(Resolutions::new()), Rc::new(TypeMap::new()))
    }

    fn arr(values: &[f64]) -> Value {
        Value::array(Rc::new(JsArray::from_vec(values.iter().copied().map(Value::Number).collect())))
    }

    fn numbers(v: &Value) -> Vec<f64> {
        v.as_array().unwrap().iter_snapshot().iter().map(|x| x.coerce_number()).collect()
    }

    #[test]
    fn splice_negative_start() {
        let mut vm = vm();
        let a = arr(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let removed = splice(
            &mut vm,
            &crate::interp::SyncCx,
            &a,
            &[Value::Number(-2.0), Value::Number(1.0), Value::Number(9.0), Value::Number(10.0)],
        )
        .unwrap();
        assert_eq!(numbers(&removed), vec![4.0]);
        assert_eq!(numbers(&a), vec![1.0, 2.0, 3.0, 9.0, 10.0, 5.0]);
    }

    #[test]
    fn default_sort_partitions_undefined_to_tail() {
        let mut vm = vm();
        let a = Value::array(Rc::new(JsArray::from_vec(vec![
            Value::Number(3.0),
            Value::Undefined,
            Value::Number(1.0),
            Value::Undefined,
            Value::Number(2.0),
        ])));
        sort(&mut vm, &crate::interp::SyncCx, &a, &[]).unwrap();
        let elements = a.as_array().unwrap().iter_snapshot();
        assert_eq!(elements[0].as_number(), Some(1.0));
        assert_eq!(elements[1].as_number(), Some(2.0));
        assert_eq!(elements[2].as_number(), Some(3.0));
        assert!(elements[3].is_undefined());
        assert!(elements[4].is_undefined());
    }

    #[test]
    fn default_sort_orders_numbers_as_strings() {
        let mut vm = vm();
        let a = arr(&[10.0, 9.0, 100.0]);
        sort(&mut vm, &crate::interp::SyncCx, &a, &[]).unwrap();
        assert_eq!(numbers(&a), vec![10.0, 100.0, 9.0]);
    }

    #[test]
    fn slice_with_negative_bounds() {
        let mut vm = vm();
        let a = arr(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let s = slice(&mut vm, &crate::interp::SyncCx, &a, &[Value::Number(-3.0), Value::Number(-1.0)]).unwrap();
        assert_eq!(numbers(&s), vec![3.0, 4.0]);
    }

    #[test]
    fn mutators_reject_frozen_receivers() {
        let mut vm = vm();
        let a = arr(&[1.0]);
        a.as_array().unwrap().freeze();
        assert!(push(&mut vm, &crate::interp::SyncCx, &a, &[Value::Number(2.0)]).is_err());
        assert_eq!(a.as_array().unwrap().len(), 1);
    }

    #[test]
    fn includes_finds_nan() {
        let mut vm = vm();
        let a = arr(&[f64::NAN]);
        let found = includes(&mut vm, &crate::interp::SyncCx, &a, &[Value::Number(f64::NAN)]).unwrap();
        assert_eq!(found.as_boolean(), Some(true));
        let idx = index_of(&mut vm, &crate::interp::SyncCx, &a, &[Value::Number(f64::NAN)]).unwrap();
        assert_eq!(idx.as_number(), Some(-1.0));
    }
}
