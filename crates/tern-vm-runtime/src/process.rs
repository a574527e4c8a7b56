//! The `process` global.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use tern_vm_core::array::JsArray;
use tern_vm_core::function::NativeFunction;
use tern_vm_core::object::JsObject;
use tern_vm_core::{HeapRef, Value, VmError};

use crate::event_loop::EventLoop;

/// Exit request raised by `process.exit`, observed by the engine after the
/// current top-level statement unwinds. Internal errors are not catchable
/// by user `try`/`catch`.
pub struct ExitRequest {
    pub code: Rc<Cell<Option<i32>>>,
}

impl ExitRequest {
    pub fn new() -> Self {
        Self { code: Rc::new(Cell::new(None)) }
    }
}

impl Default for ExitRequest {
    fn default() -> Self {
        Self::new()
    }
}

fn stream_object(is_err: bool) -> Value {
    let obj = JsObject::new();
    obj.set("isTTY", Value::Boolean(false));
    obj.set(
        "write",
        Value::Ref(HeapRef::Native(NativeFunction::new("write", move |vm, _this, args| {
            let text = args.first().map(|v| v.to_display_string()).unwrap_or_default();
            if is_err {
                vm.write_err(&text);
            } else {
                vm.write_out(&text);
            }
            Ok(Value::Boolean(true))
        }))),
    );
    Value::object(Rc::new(obj))
}

/// Build the `process` global.
///
/// Lifecycle of the shared slots: initialized once at interpreter start;
/// writable only through `process.exitCode` and `setScriptArguments`-style
/// host calls.
pub fn create_process_object(argv: &[String], event_loop: Rc<EventLoop>, exit: &ExitRequest) -> Value {
    let obj = JsObject::new();

    let argv_values: Vec<Value> = argv.iter().map(Value::string).collect();
    obj.set("argv", Value::array(Rc::new(JsArray::from_vec(argv_values))));

    let env_obj = JsObject::new();
    for (k, v) in std::env::vars() {
        env_obj.set(k, Value::string(v));
    }
    obj.set("env", Value::object(Rc::new(env_obj)));

    obj.set("platform", Value::string(platform_name()));
    obj.set("exitCode", Value::Number(0.0));
    obj.set(
        "cwd",
        Value::Ref(HeapRef::Native(NativeFunction::new("cwd", |_vm, _this, _args| {
            Ok(Value::string(
                std::env::current_dir().map(|p| p.display().to_string()).unwrap_or_default(),
            ))
        }))),
    );

    let exit_code = exit.code.clone();
    obj.set(
        "exit",
        Value::Ref(HeapRef::Native(NativeFunction::new("exit", move |_vm, _this, args| {
            let code = args.first().map(|v| v.coerce_number() as i32).unwrap_or(0);
            exit_code.set(Some(code));
            Err(VmError::internal("process.exit"))
        }))),
    );

    let start = Instant::now();
    obj.set(
        "hrtime",
        Value::Ref(HeapRef::Native(NativeFunction::new("hrtime", move |_vm, _this, args| {
            let elapsed = start.elapsed();
            let (mut secs, mut nanos) = (elapsed.as_secs() as f64, elapsed.subsec_nanos() as f64);
            if let Some(Value::Ref(HeapRef::Array(prev))) = args.first() {
                let prev_secs = prev.get(0).coerce_number();
                let prev_nanos = prev.get(1).coerce_number();
                secs -= prev_secs;
                nanos -= prev_nanos;
                if nanos < 0.0 {
                    secs -= 1.0;
                    nanos += 1_000_000_000.0;
                }
            }
            Ok(Value::array(Rc::new(JsArray::from_vec(vec![Value::Number(secs), Value::Number(nanos)]))))
        }))),
    );

    // nextTick rides the timer lane as a zero-delay refed timer; FIFO holds
    // because equal deadlines fire in insertion order
    obj.set(
        "nextTick",
        Value::Ref(HeapRef::Native(NativeFunction::new("nextTick", move |_vm, _this, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            if !callback.is_callable() {
                return Err(VmError::type_error("Callback must be a function"));
            }
            let extra = args.get(1..).map(|s| s.to_vec()).unwrap_or_default();
            event_loop.schedule(callback, extra, 0.0, false);
            Ok(Value::Undefined)
        }))),
    );

    obj.set("stdout", stream_object(false));
    obj.set("stderr", stream_object(true));
    let stdin = JsObject::new();
    stdin.set("isTTY", Value::Boolean(false));
    obj.set("stdin", Value::object(Rc::new(stdin)));

    Value::object(Rc::new(obj))
}

fn platform_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "win32"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else {
        "linux"
    }
}
