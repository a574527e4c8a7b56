//! Generator object methods: `next`/`return`/`throw`.
//!
//! Sync generators return the `{value, done}` record directly; async
//! generators hand back a promise of it (the driving happens under the
//! async context).

use std::rc::Rc;

use crate::error::{VmError, VmResult};
use crate::generator::{GeneratorObject, Resume, StepOutcome};
use crate::interp::{AsyncCx, EvalContext, Interpreter};
use crate::object::JsObject;
use crate::promise::JsPromise;
use crate::value::{HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<Rc<GeneratorObject>> {
    match recv {
        Value::Ref(HeapRef::Generator(g)) => Ok(g.clone()),
        _ => Err(VmError::type_error("receiver is not a generator object")),
    }
}

fn step_record(outcome: StepOutcome) -> Value {
    let obj = JsObject::new();
    obj.set("value", outcome.value);
    obj.set("done", Value::Boolean(outcome.done));
    Value::object(Rc::new(obj))
}

fn drive(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, input: Resume) -> VmResult<Value> {
    let generator = receiver(recv)?;
    if generator.is_async() {
        let outcome = generator.resume(vm, &AsyncCx, input);
        return Ok(match outcome {
            Ok(outcome) => {
                let promise = JsPromise::new();
                vm.fulfill_promise(&promise, step_record(outcome));
                Value::promise(promise)
            }
            Err(e) => {
                let reason = vm.error_value(&e);
                Value::promise(JsPromise::rejected_with(reason))
            }
        });
    }
    Ok(step_record(generator.resume(vm, cx, input)?))
}

fn next(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    drive(vm, cx, recv, Resume::Next(args.first().cloned().unwrap_or(Value::Undefined)))
}

fn return_(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    drive(vm, cx, recv, Resume::Return(args.first().cloned().unwrap_or(Value::Undefined)))
}

fn throw(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    drive(vm, cx, recv, Resume::Throw(args.first().cloned().unwrap_or(Value::Undefined)))
}

method_table! {
    pub fn method {
        "next" => sync(0, 1, next),
        "return" => sync(0, 1, return_),
        "throw" => sync(0, 1, throw),
    }
}
