//! Shared methods for boolean/bigint/symbol receivers.

use crate::error::VmResult;
use crate::interp::{EvalContext, Interpreter};
use crate::value::Value;

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(recv.to_display_string()))
}

fn value_of(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(recv.clone())
}

method_table! {
    pub fn method {
        "toString" => sync(0, 1, to_string),
        "valueOf" => sync(0, 0, value_of),
    }
}
