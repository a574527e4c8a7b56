//! Function prototype methods: `call`/`apply`/`bind`.

use crate::error::VmResult;
use crate::function::NativeFunction;
use crate::interp::{EvalContext, Interpreter};
use crate::value::{HeapRef, Value};

use super::VARIADIC;

fn call(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let this = args.first().cloned().unwrap_or(Value::Undefined);
    let rest = args.get(1..).map(|s| s.to_vec()).unwrap_or_default();
    vm.call_value(cx, recv, this, rest)
}

fn apply(vm: &mut Interpreter, cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let this = args.first().cloned().unwrap_or(Value::Undefined);
    let rest = match args.get(1) {
        Some(Value::Ref(HeapRef::Array(a))) => a.iter_snapshot(),
        _ => Vec::new(),
    };
    vm.call_value(cx, recv, this, rest)
}

fn bind(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    let target = recv.clone();
    let bound_this = args.first().cloned().unwrap_or(Value::Undefined);
    let partial: Vec<Value> = args.get(1..).map(|s| s.to_vec()).unwrap_or_default();
    let name = format!("bound {}", target_name(&target));
    let bound = NativeFunction::new(name, move |vm, _this, call_args| {
        let mut full = partial.clone();
        full.extend_from_slice(call_args);
        vm.call_value(&crate::interp::SyncCx, &target, bound_this.clone(), full)
    });
    Ok(Value::Ref(HeapRef::Native(bound)))
}

fn target_name(v: &Value) -> String {
    match v {
        Value::Ref(HeapRef::Function(f)) => f.name().unwrap_or_default(),
        Value::Ref(HeapRef::Native(n)) => n.name.clone(),
        Value::Ref(HeapRef::Bound(b)) => b.method_name().to_string(),
        _ => String::new(),
    }
}

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(recv.to_display_string()))
}

method_table! {
    pub fn method {
        "call" => sync(0, VARIADIC, call),
        "apply" => sync(0, 2, apply),
        "bind" => sync(0, VARIADIC, bind),
        "toString" => sync(0, 0, to_string),
    }
}
