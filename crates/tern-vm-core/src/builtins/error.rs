//! Error prototype methods and the error constructor family.

use std::rc::Rc;

use crate::error::{ErrorKind, VmResult};
use crate::error_object::JsError;
use crate::function::NativeFunction;
use crate::interp::{EvalContext, Interpreter};
use crate::value::{HeapRef, Value};

fn to_string(vm: &mut Interpreter, _cx: &dyn EvalContext, recv: &Value, _args: &[Value]) -> VmResult<Value> {
    let _ = vm;
    Ok(Value::string(recv.to_display_string()))
}

method_table! {
    pub fn method {
        "toString" => sync(0, 0, to_string),
    }
}

/// Build one of the error constructors (`Error`, `TypeError`, ...).
pub fn create_error_constructor(kind: ErrorKind) -> Value {
    let ctor = NativeFunction::new(kind.name(), move |vm, _this, args| {
        if kind == ErrorKind::AggregateError {
            let errors = args
                .first()
                .and_then(|v| v.as_array().cloned())
                .map(|a| a.iter_snapshot())
                .unwrap_or_default();
            let message = args.get(1).map(|v| v.to_display_string()).unwrap_or_default();
            return Ok(Value::error(Rc::new(JsError::aggregate(errors, message, vm.stack_snapshot()))));
        }
        let message = args.first().map(|v| v.to_display_string()).unwrap_or_default();
        Ok(Value::error(Rc::new(JsError::new(kind, message, vm.stack_snapshot()))))
    });
    Value::Ref(HeapRef::Native(ctor))
}
