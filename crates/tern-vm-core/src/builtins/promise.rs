//! Promise prototype methods and constructor statics.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::array::JsArray;
use crate::error::{VmError, VmResult};
use crate::error_object::JsError;
use crate::function::NativeFunction;
use crate::interp::{EvalContext, Interpreter};
use crate::object::JsObject;
use crate::promise::JsPromise;
use crate::value::{HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<Rc<JsPromise>> {
    recv.as_promise().cloned().ok_or_else(|| VmError::type_error("receiver is not a Promise"))
}

fn then(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let p = receiver(recv)?;
    let on_fulfilled = args.first().cloned().unwrap_or(Value::Undefined);
    let on_rejected = args.get(1).cloned().unwrap_or(Value::Undefined);
    Ok(Value::promise(vm.promise_then(&p, on_fulfilled, on_rejected)))
}

fn catch(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let p = receiver(recv)?;
    let on_rejected = args.first().cloned().unwrap_or(Value::Undefined);
    Ok(Value::promise(vm.promise_then(&p, Value::Undefined, on_rejected)))
}

fn finally(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let p = receiver(recv)?;
    let cb = args.first().cloned().unwrap_or(Value::Undefined);
    // the callback runs on either path; the settlement passes through
    let on_fulfilled = {
        let cb = cb.clone();
        NativeFunction::new("", move |vm, _this, args| {
            if cb.is_callable() {
                vm.call_value(&crate::interp::SyncCx, &cb, Value::Undefined, Vec::new())?;
            }
            Ok(args.first().cloned().unwrap_or(Value::Undefined))
        })
    };
    let on_rejected = NativeFunction::new("", move |vm, _this, args| {
        if cb.is_callable() {
            vm.call_value(&crate::interp::SyncCx, &cb, Value::Undefined, Vec::new())?;
        }
        let reason = args.first().cloned().unwrap_or(Value::Undefined);
        Err(VmError::thrown(reason, vm.stack_snapshot()))
    });
    Ok(Value::promise(vm.promise_then(
        &p,
        Value::Ref(HeapRef::Native(on_fulfilled)),
        Value::Ref(HeapRef::Native(on_rejected)),
    )))
}

method_table! {
    pub fn method {
        "then" => sync(0, 2, then),
        "catch" => sync(0, 1, catch),
        "finally" => sync(0, 1, finally),
    }
}

// ============================================================================
// Constructor statics
// ============================================================================

/// Build the global `Promise` constructor: callable with an executor,
/// carrying resolve/reject/all/allSettled/race/any.
pub fn create_promise_constructor() -> Value {
    let ctor = NativeFunction::new("Promise", |vm, _this, args| {
        let executor = args.first().cloned().unwrap_or(Value::Undefined);
        if !executor.is_callable() {
            return Err(VmError::type_error("Promise resolver is not a function"));
        }
        let promise = JsPromise::new();
        let resolve = {
            let promise = promise.clone();
            NativeFunction::new("resolve", move |vm, _this, args| {
                vm.fulfill_promise(&promise, args.first().cloned().unwrap_or(Value::Undefined));
                Ok(Value::Undefined)
            })
        };
        let reject = {
            let promise = promise.clone();
            NativeFunction::new("reject", move |vm, _this, args| {
                vm.reject_promise(&promise, args.first().cloned().unwrap_or(Value::Undefined));
                Ok(Value::Undefined)
            })
        };
        // the executor runs synchronously; a throw inside it rejects
        let outcome = vm.call_value(
            &crate::interp::SyncCx,
            &executor,
            Value::Undefined,
            vec![Value::Ref(HeapRef::Native(resolve)), Value::Ref(HeapRef::Native(reject))],
        );
        if let Err(e) = outcome {
            let reason = vm.error_value(&e);
            vm.reject_promise(&promise, reason);
        }
        Ok(Value::promise(promise))
    });

    ctor.set_property("resolve", native("resolve", |vm, _this, args| {
        let promise = JsPromise::new();
        vm.fulfill_promise(&promise, args.first().cloned().unwrap_or(Value::Undefined));
        Ok(Value::promise(promise))
    }));
    ctor.set_property("reject", native("reject", |vm, _this, args| {
        let _ = vm;
        Ok(Value::promise(JsPromise::rejected_with(args.first().cloned().unwrap_or(Value::Undefined))))
    }));
    ctor.set_property("all", native("all", promise_all));
    ctor.set_property("allSettled", native("allSettled", promise_all_settled));
    ctor.set_property("race", native("race", promise_race));
    ctor.set_property("any", native("any", promise_any));
    Value::Ref(HeapRef::Native(ctor))
}

fn native(
    name: &str,
    f: impl Fn(&mut Interpreter, &Value, &[Value]) -> VmResult<Value> + 'static,
) -> Value {
    Value::Ref(HeapRef::Native(NativeFunction::new(name, f)))
}

/// Register `(on_fulfilled, on_rejected)` natives on an input slot, treating
/// non-promise inputs as already fulfilled.
fn each_input(
    vm: &mut Interpreter,
    input: Value,
    on_fulfilled: Rc<NativeFunction>,
    on_rejected: Rc<NativeFunction>,
) {
    match input.as_promise() {
        Some(p) => {
            let p = p.clone();
            vm.promise_then(&p, Value::Ref(HeapRef::Native(on_fulfilled)), Value::Ref(HeapRef::Native(on_rejected)));
        }
        None => {
            let _ = (on_fulfilled.func.clone())(vm, &Value::Undefined, &[input]);
        }
    }
}

fn promise_all(vm: &mut Interpreter, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let items = vm.iterate_to_vec(&crate::interp::SyncCx, args.first().unwrap_or(&Value::Undefined))?;
    let result = JsPromise::new();
    let n = items.len();
    if n == 0 {
        vm.fulfill_promise(&result, Value::array(Rc::new(JsArray::new())));
        return Ok(Value::promise(result));
    }
    let slots = Rc::new(RefCell::new(vec![Value::Undefined; n]));
    let remaining = Rc::new(Cell::new(n));
    for (i, item) in items.into_iter().enumerate() {
        let on_fulfilled = {
            let slots = slots.clone();
            let remaining = remaining.clone();
            let result = result.clone();
            NativeFunction::new("", move |vm, _this, args| {
                slots.borrow_mut()[i] = args.first().cloned().unwrap_or(Value::Undefined);
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let values = slots.borrow().clone();
                    vm.fulfill_promise(&result, Value::array(Rc::new(JsArray::from_vec(values))));
                }
                Ok(Value::Undefined)
            })
        };
        let on_rejected = {
            let result = result.clone();
            NativeFunction::new("", move |vm, _this, args| {
                vm.reject_promise(&result, args.first().cloned().unwrap_or(Value::Undefined));
                Ok(Value::Undefined)
            })
        };
        each_input(vm, item, on_fulfilled, on_rejected);
    }
    Ok(Value::promise(result))
}

fn settled_entry(status: &str, key: &str, value: Value) -> Value {
    let obj = JsObject::new();
    obj.set("status", Value::string(status));
    obj.set(key, value);
    Value::object(Rc::new(obj))
}

fn promise_all_settled(vm: &mut Interpreter, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let items = vm.iterate_to_vec(&crate::interp::SyncCx, args.first().unwrap_or(&Value::Undefined))?;
    let result = JsPromise::new();
    let n = items.len();
    if n == 0 {
        vm.fulfill_promise(&result, Value::array(Rc::new(JsArray::new())));
        return Ok(Value::promise(result));
    }
    let slots = Rc::new(RefCell::new(vec![Value::Undefined; n]));
    let remaining = Rc::new(Cell::new(n));
    for (i, item) in items.into_iter().enumerate() {
        let finish = |slots: &Rc<RefCell<Vec<Value>>>,
                      remaining: &Rc<Cell<usize>>,
                      result: &Rc<JsPromise>,
                      vm: &mut Interpreter,
                      i: usize,
                      entry: Value| {
            slots.borrow_mut()[i] = entry;
            remaining.set(remaining.get() - 1);
            if remaining.get() == 0 {
                let values = slots.borrow().clone();
                vm.fulfill_promise(result, Value::array(Rc::new(JsArray::from_vec(values))));
            }
        };
        let on_fulfilled = {
            let (slots, remaining, result) = (slots.clone(), remaining.clone(), result.clone());
            NativeFunction::new("", move |vm, _this, args| {
                let value = args.first().cloned().unwrap_or(Value::Undefined);
                finish(&slots, &remaining, &result, vm, i, settled_entry("fulfilled", "value", value));
                Ok(Value::Undefined)
            })
        };
        let on_rejected = {
            let (slots, remaining, result) = (slots.clone(), remaining.clone(), result.clone());
            NativeFunction::new("", move |vm, _this, args| {
                let reason = args.first().cloned().unwrap_or(Value::Undefined);
                finish(&slots, &remaining, &result, vm, i, settled_entry("rejected", "reason", reason));
                Ok(Value::Undefined)
            })
        };
        each_input(vm, item, on_fulfilled, on_rejected);
    }
    Ok(Value::promise(result))
}

fn promise_race(vm: &mut Interpreter, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let items = vm.iterate_to_vec(&crate::interp::SyncCx, args.first().unwrap_or(&Value::Undefined))?;
    let result = JsPromise::new();
    for item in items {
        let on_fulfilled = {
            let result = result.clone();
            NativeFunction::new("", move |vm, _this, args| {
                vm.fulfill_promise(&result, args.first().cloned().unwrap_or(Value::Undefined));
                Ok(Value::Undefined)
            })
        };
        let on_rejected = {
            let result = result.clone();
            NativeFunction::new("", move |vm, _this, args| {
                vm.reject_promise(&result, args.first().cloned().unwrap_or(Value::Undefined));
                Ok(Value::Undefined)
            })
        };
        each_input(vm, item, on_fulfilled, on_rejected);
    }
    Ok(Value::promise(result))
}

fn promise_any(vm: &mut Interpreter, _this: &Value, args: &[Value]) -> VmResult<Value> {
    let items = vm.iterate_to_vec(&crate::interp::SyncCx, args.first().unwrap_or(&Value::Undefined))?;
    let result = JsPromise::new();
    let n = items.len();
    if n == 0 {
        let err = JsError::aggregate(Vec::new(), "All promises were rejected", vm.stack_snapshot());
        vm.reject_promise(&result, Value::error(Rc::new(err)));
        return Ok(Value::promise(result));
    }
    let reasons = Rc::new(RefCell::new(vec![Value::Undefined; n]));
    let remaining = Rc::new(Cell::new(n));
    for (i, item) in items.into_iter().enumerate() {
        let on_fulfilled = {
            let result = result.clone();
            NativeFunction::new("", move |vm, _this, args| {
                vm.fulfill_promise(&result, args.first().cloned().unwrap_or(Value::Undefined));
                Ok(Value::Undefined)
            })
        };
        let on_rejected = {
            let (reasons, remaining, result) = (reasons.clone(), remaining.clone(), result.clone());
            NativeFunction::new("", move |vm, _this, args| {
                reasons.borrow_mut()[i] = args.first().cloned().unwrap_or(Value::Undefined);
                remaining.set(remaining.get() - 1);
                if remaining.get() == 0 {
                    let errors = reasons.borrow().clone();
                    let err = JsError::aggregate(errors, "All promises were rejected", vm.stack_snapshot());
                    vm.reject_promise(&result, Value::error(Rc::new(err)));
                }
                Ok(Value::Undefined)
            })
        };
        each_input(vm, item, on_fulfilled, on_rejected);
    }
    Ok(Value::promise(result))
}
