//! Global constant installation: everything the language binds at startup.

use std::rc::Rc;

use tern_vm_core::builtins;
use tern_vm_core::function::NativeFunction;
use tern_vm_core::object::JsObject;
use tern_vm_core::typed_array::ElementKind;
use tern_vm_core::{ErrorKind, HeapRef, Interpreter, Value, VmError};

use crate::console::create_console_object;
use crate::event_loop::EventLoop;
use crate::process::{create_process_object, ExitRequest};

/// Install every startup global into the interpreter's root scope.
pub fn install_globals(vm: &mut Interpreter, event_loop: &Rc<EventLoop>, argv: &[String], exit: &ExitRequest) {
    let globals = vm.globals.clone();

    globals.define("NaN", Value::Number(f64::NAN));
    globals.define("Infinity", Value::Number(f64::INFINITY));
    globals.define("undefined", Value::Undefined);
    globals.define("globalThis", Value::object(Rc::new(JsObject::new())));

    globals.define("Math", builtins::math::create_math_object());
    globals.define("JSON", builtins::json::create_json_object());
    globals.define("Object", builtins::object::create_object_constructor());
    globals.define("Array", builtins::global_fns::create_array_constructor());
    globals.define("Number", builtins::number::create_number_constructor());
    globals.define("String", builtins::global_fns::create_string_constructor());
    globals.define("Boolean", builtins::global_fns::create_boolean_constructor());
    globals.define("Symbol", builtins::symbol::create_symbol_constructor());
    globals.define("Promise", builtins::promise::create_promise_constructor());
    globals.define("Date", builtins::date::create_date_constructor());
    globals.define("Buffer", builtins::buffer::create_buffer_object());
    globals.define("Reflect", builtins::global_fns::create_reflect_object());

    globals.define("Map", builtins::global_fns::create_map_constructor());
    globals.define("Set", builtins::global_fns::create_set_constructor());
    globals.define("WeakMap", builtins::global_fns::create_weak_map_constructor());
    globals.define("WeakSet", builtins::global_fns::create_weak_set_constructor());

    for kind in [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
        ErrorKind::URIError,
        ErrorKind::EvalError,
        ErrorKind::AggregateError,
    ] {
        globals.define(kind.name(), builtins::error::create_error_constructor(kind));
    }

    for kind in [
        ElementKind::Int8,
        ElementKind::Uint8,
        ElementKind::Int16,
        ElementKind::Uint16,
        ElementKind::Int32,
        ElementKind::Uint32,
        ElementKind::Float32,
        ElementKind::Float64,
    ] {
        globals.define(kind.constructor_name(), builtins::global_fns::create_typed_array_constructor(kind));
    }

    // integration surface for the host-provided shells: the names exist at
    // startup even though their implementations live outside this core
    let atomics = JsObject::new();
    atomics.freeze();
    globals.define("Atomics", Value::object(Rc::new(atomics)));
    globals.define(
        "SharedArrayBuffer",
        Value::Ref(HeapRef::Native(NativeFunction::new("SharedArrayBuffer", |_vm, _this, _args| {
            Err(VmError::type_error("SharedArrayBuffer requires the host worker runtime"))
        }))),
    );
    globals.define(
        "fetch",
        Value::Ref(HeapRef::Native(NativeFunction::new("fetch", |vm, _this, _args| {
            let reason = vm.make_error(ErrorKind::Error, "fetch requires the host http runtime");
            Ok(Value::promise(tern_vm_core::promise::JsPromise::rejected_with(reason)))
        }))),
    );

    globals.define("parseInt", builtins::global_fns::create_parse_int());
    globals.define("parseFloat", builtins::global_fns::create_parse_float());
    globals.define("isNaN", builtins::global_fns::create_is_nan());
    globals.define("isFinite", builtins::global_fns::create_is_finite());
    globals.define("structuredClone", builtins::global_fns::create_structured_clone());

    globals.define("console", create_console_object());
    globals.define("process", create_process_object(argv, event_loop.clone(), exit));

    install_timer_globals(vm, event_loop);
}

/// `setTimeout`/`setInterval`/`clearTimeout`/`clearInterval`/
/// `queueMicrotask`.
fn install_timer_globals(vm: &mut Interpreter, event_loop: &Rc<EventLoop>) {
    let globals = vm.globals.clone();

    let schedule = |name: &'static str, interval: bool, event_loop: Rc<EventLoop>| {
        Value::Ref(HeapRef::Native(NativeFunction::new(name, move |_vm, _this, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            if !callback.is_callable() {
                return Err(VmError::type_error("Callback must be a function"));
            }
            let delay = args.get(1).map(|v| v.coerce_number()).unwrap_or(0.0);
            let extra = args.get(2..).map(|s| s.to_vec()).unwrap_or_default();
            let handle = event_loop.schedule(callback, extra, delay, interval);
            Ok(Value::Ref(HeapRef::Timeout(handle)))
        })))
    };
    globals.define("setTimeout", schedule("setTimeout", false, event_loop.clone()));
    globals.define("setInterval", schedule("setInterval", true, event_loop.clone()));

    let clear = |name: &'static str, event_loop: Rc<EventLoop>| {
        Value::Ref(HeapRef::Native(NativeFunction::new(name, move |_vm, _this, args| {
            if let Some(target) = args.first() {
                event_loop.clear(target);
            }
            Ok(Value::Undefined)
        })))
    };
    globals.define("clearTimeout", clear("clearTimeout", event_loop.clone()));
    globals.define("clearInterval", clear("clearInterval", event_loop.clone()));

    globals.define(
        "queueMicrotask",
        Value::Ref(HeapRef::Native(NativeFunction::new("queueMicrotask", |vm, _this, args| {
            let callback = args.first().cloned().unwrap_or(Value::Undefined);
            if !callback.is_callable() {
                return Err(VmError::type_error("Callback must be a function"));
            }
            vm.enqueue_job(tern_vm_core::Job {
                callback,
                this: Value::Undefined,
                args: Vec::new(),
                result: None,
            });
            Ok(Value::Undefined)
        }))),
    );
}
