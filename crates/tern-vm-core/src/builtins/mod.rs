//! Built-in method dispatch.
//!
//! Every built-in member is a [`BuiltInMethod`]: a uniform callable carrying
//! its name, arity bounds and implementation. Member access on a built-in
//! receiver produces a bound method (receiver captured); arity is validated
//! on every call. The async flavor's implementation returns a *raw* value
//! which the call wrapper wraps in a promise exactly once — returning an
//! already-wrapped promise from an async implementation is a contract
//! violation (the awaiter would see a nested wrapper).
//!
//! Per-type member tables live in the submodules, declared with
//! [`method_table!`]; global constructor bags (`Math`, `JSON`, `Object`,
//! ...) are built by the `create_*` factories and installed by the runtime
//! crate.

#[macro_use]
mod table;

pub mod array;
pub mod buffer;
pub mod date;
pub mod error;
pub mod function;
pub mod generator;
pub mod global_fns;
pub mod json;
pub mod map;
pub mod math;
pub mod number;
pub mod object;
pub mod primitive;
pub mod promise;
pub mod regexp;
pub mod set;
pub mod string;
pub mod symbol;
pub mod timeout;
pub mod typed_array;
pub mod weak;

use crate::error::{VmError, VmResult};
use crate::interp::{EvalContext, Interpreter};
use crate::promise::JsPromise;
use crate::value::Value;

/// Implementation signature: `(vm, context, receiver, args)`.
pub type BuiltInFn = fn(&mut Interpreter, &dyn EvalContext, &Value, &[Value]) -> VmResult<Value>;

/// Arity bound meaning "no upper limit".
pub const VARIADIC: u8 = u8::MAX;

enum Flavor {
    Sync(BuiltInFn),
    /// Raw return value is promise-wrapped by the call wrapper.
    Async(BuiltInFn),
}

/// A built-in method: name, arity bounds, implementation.
pub struct BuiltInMethod {
    pub name: &'static str,
    pub min_arity: u8,
    pub max_arity: u8,
    flavor: Flavor,
}

impl std::fmt::Debug for BuiltInMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltInMethod").field("name", &self.name).finish()
    }
}

impl BuiltInMethod {
    pub const fn sync(name: &'static str, min_arity: u8, max_arity: u8, func: BuiltInFn) -> Self {
        Self { name, min_arity, max_arity, flavor: Flavor::Sync(func) }
    }

    /// The async flavor: implementation returns a raw value, the wrapper
    /// settles a fresh promise with it.
    pub const fn async_(name: &'static str, min_arity: u8, max_arity: u8, func: BuiltInFn) -> Self {
        Self { name, min_arity, max_arity, flavor: Flavor::Async(func) }
    }

    pub fn check_arity(&self, supplied: usize) -> VmResult<()> {
        if supplied < self.min_arity as usize {
            return Err(VmError::type_error(format!(
                "{} expects at least {} argument(s), got {supplied}",
                self.name, self.min_arity
            )));
        }
        if self.max_arity != VARIADIC && supplied > self.max_arity as usize {
            return Err(VmError::type_error(format!(
                "{} expects at most {} argument(s), got {supplied}",
                self.name, self.max_arity
            )));
        }
        Ok(())
    }

    pub fn call(
        &self,
        vm: &mut Interpreter,
        cx: &dyn EvalContext,
        receiver: &Value,
        args: &[Value],
    ) -> VmResult<Value> {
        match self.flavor {
            Flavor::Sync(f) => f(vm, cx, receiver, args),
            Flavor::Async(f) => match f(vm, cx, receiver, args) {
                Ok(raw) => {
                    let promise = JsPromise::new();
                    vm.fulfill_promise(&promise, raw);
                    Ok(Value::promise(promise))
                }
                Err(e) => {
                    let reason = vm.error_value(&e);
                    Ok(Value::promise(JsPromise::rejected_with(reason)))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::SyncCx;
    use crate::promise::PromiseState;
    use std::rc::Rc;
    use tern_ast::{Resolutions, TypeMap};

    fn echo(_vm: &mut Interpreter, _cx: &dyn EvalContext, _recv: &Value, args: &[Value]) -> VmResult<Value> {
        Ok(args.first().cloned().unwrap_or(Value::Undefined))
    }

    fn fail(_vm: &mut Interpreter, _cx: &dyn EvalContext, _recv: &Value, _args: &[Value]) -> VmResult<Value> {
        Err(VmError::type_error("nope"))
    }

    #[test]
    fn arity_bounds_are_enforced() {
        static M: BuiltInMethod = BuiltInMethod::sync("echo", 1, 2, echo);
        assert!(M.check_arity(0).is_err());
        assert!(M.check_arity(1).is_ok());
        assert!(M.check_arity(2).is_ok());
        assert!(M.check_arity(3).is_err());
    }

    #[test]
    fn async_flavor_wraps_the_raw_return_in_a_promise_exactly_once() {
        static M: BuiltInMethod = BuiltInMethod::async_("echoAsync", 0, 1, echo);
        let mut vm = Interpreter::new(Rc::new(Resolutions::new()), Rc::new(TypeMap::new()));
        let out = M.call(&mut vm, &SyncCx, &Value::Undefined, &[Value::Number(5.0)]).unwrap();
        let promise = out.as_promise().expect("async built-ins return a promise");
        match promise.state() {
            PromiseState::Fulfilled(v) => assert_eq!(v.as_number(), Some(5.0)),
            other => panic!("expected fulfilled, got {other:?}"),
        }
    }

    #[test]
    fn async_flavor_converts_errors_to_rejections() {
        static M: BuiltInMethod = BuiltInMethod::async_("failAsync", 0, 0, fail);
        let mut vm = Interpreter::new(Rc::new(Resolutions::new()), Rc::new(TypeMap::new()));
        let out = M.call(&mut vm, &SyncCx, &Value::Undefined, &[]).unwrap();
        let promise = out.as_promise().expect("async built-ins return a promise");
        assert!(matches!(promise.state(), PromiseState::Rejected(_)));
    }
}
