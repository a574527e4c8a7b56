//! Timeout handle methods: `ref`/`unref`/`hasRef`.

use std::rc::Rc;

use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::timeout::TimeoutHandle;
use crate::value::{HeapRef, Value};

fn receiver(recv: &Value) -> VmResult<Rc<TimeoutHandle>> {
    match recv {
        Value::Ref(HeapRef::Timeout(t)) => Ok(t.clone()),
        _ => Err(VmError::type_error("receiver is not a Timeout")),
    }
}

fn ref_(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    receiver(recv)?.set_refed(true);
    Ok(recv.clone())
}

fn unref(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    receiver(recv)?.set_refed(false);
    Ok(recv.clone())
}

fn has_ref(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::Boolean(receiver(recv)?.is_refed()))
}

method_table! {
    pub fn method {
        "ref" => sync(0, 0, ref_),
        "unref" => sync(0, 0, unref),
        "hasRef" => sync(0, 0, has_ref),
    }
}
