//! The dual evaluation contexts.
//!
//! Every expression handler takes an `&dyn EvalContext` and routes potential
//! suspension points through [`EvalContext::resolve`]. Sync code pays a
//! virtual call and nothing else; async code gets cooperative suspension.

use std::rc::Rc;

use crate::error::{VmError, VmResult};
use crate::promise::PromiseState;
use crate::value::{HeapRef, Value};

use super::Interpreter;

/// Evaluation context: the one seam between the sync and async walks.
pub trait EvalContext {
    /// Resolve a value at a suspension point. Sync: identity. Async: when
    /// the value is a promise, suspend until it settles; fulfilled promises
    /// resolve to their inner value and rejections surface as
    /// `PromiseRejected`.
    fn resolve(&self, vm: &mut Interpreter, value: Value) -> VmResult<Value>;

    fn is_async(&self) -> bool;
}

/// Synchronous context: values are already values.
pub struct SyncCx;

impl EvalContext for SyncCx {
    fn resolve(&self, _vm: &mut Interpreter, value: Value) -> VmResult<Value> {
        Ok(value)
    }

    fn is_async(&self) -> bool {
        false
    }
}

/// Suspension-aware context used inside async functions, async generators
/// and async `finally` blocks.
pub struct AsyncCx;

impl EvalContext for AsyncCx {
    fn resolve(&self, vm: &mut Interpreter, value: Value) -> VmResult<Value> {
        let Value::Ref(HeapRef::Promise(promise)) = value else {
            // `await x` where x is not a promise is x.
            return Ok(value);
        };
        let promise = Rc::clone(&promise);
        loop {
            vm.run_microtasks()?;
            match promise.state() {
                PromiseState::Fulfilled(v) => return Ok(v),
                PromiseState::Rejected(r) => return Err(VmError::rejected(r)),
                PromiseState::Pending => {}
            }
            let Some(hook) = vm.event_loop.clone() else {
                return Err(VmError::internal("await on a pending promise with no event loop attached"));
            };
            if !hook.tick(vm)? && !vm.has_microtasks() && promise.is_pending() {
                return Err(VmError::internal("deadlock: awaited promise can no longer settle"));
            }
        }
    }

    fn is_async(&self) -> bool {
        true
    }
}
