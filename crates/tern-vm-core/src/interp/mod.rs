//! The tree-walking evaluator.
//!
//! One handler per AST node kind, dispatched by a single exhaustive `match`
//! over the variant tag (`eval_expr` / `exec_stmt`) — the flat registry with
//! build-time exhaustiveness checking. Statement handlers return
//! [`Completion`]; thrown values travel in the `Err` arm of [`VmResult`].
//!
//! Evaluation is parameterized by an [`EvalContext`](context::EvalContext):
//! the sync context resolves values as themselves, the async context
//! suspends on pending promises by cooperatively pumping the event loop.

mod binder;
mod call;
mod class_eval;
mod context;
mod expr;
mod iter;
pub(crate) mod member;
mod stmt;

pub use binder::BindMode;
pub use context::{AsyncCx, EvalContext, SyncCx};
pub use expr::{to_int32, to_uint32};
pub use iter::{IterSource, IterStep};

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;

use tern_ast::{Resolutions, TypeMap};

use crate::error::{ErrorKind, VmError, VmResult};
use crate::error_object::JsError;
use crate::function::Function;
use crate::promise::{JsPromise, PromiseState, Reaction};
use crate::value::{HeapRef, Value};

/// Recursion guard for the host stack.
const MAX_CALL_DEPTH: usize = 2_000;

/// How a statement finished.
///
/// `Throw` is deliberately absent: thrown values propagate through the
/// `Err` arm of `VmResult<Completion>` so `?` threads them through every
/// handler.
#[derive(Debug)]
pub enum Completion {
    Normal,
    Return(Value),
    Break(Option<String>),
    Continue(Option<String>),
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal)
    }
}

/// A queued microtask: invoke `callback(args)` and settle `result` (when
/// present) with the outcome.
pub struct Job {
    pub callback: Value,
    pub this: Value,
    pub args: Vec<Value>,
    pub result: Option<Rc<JsPromise>>,
}

/// Event-loop operations the evaluator needs mid-execution: a non-blocking
/// drain between user loop iterations, and a blocking tick while an `await`
/// waits on a pending promise. Implemented by the runtime crate's loop.
pub trait EventLoopHook {
    /// Run everything currently due (microtasks + expired timers) without
    /// sleeping.
    fn poll(&self, vm: &mut Interpreter) -> VmResult<()>;
    /// Make progress, sleeping bounded by the next deadline if needed.
    /// Returns false when no timers and no live handles remain.
    fn tick(&self, vm: &mut Interpreter) -> VmResult<bool>;
}

/// Where console/process output goes. Swappable so tests capture it.
pub trait OutputSink {
    fn write_out(&self, text: &str);
    fn write_err(&self, text: &str);
}

struct StdioSink;

impl OutputSink for StdioSink {
    fn write_out(&self, text: &str) {
        print!("{text}");
    }

    fn write_err(&self, text: &str) {
        eprint!("{text}");
    }
}

/// Per-module export record, written by `export` statement handlers and read
/// by the linker.
#[derive(Debug, Default)]
pub struct ModuleRecord {
    pub path: String,
    pub exports: RefCell<IndexMap<String, Value>>,
    pub default_export: RefCell<Option<Value>>,
    /// `export = value` (CommonJS interop).
    pub export_assignment: RefCell<Option<Value>>,
}

impl ModuleRecord {
    pub fn new(path: impl Into<String>) -> Rc<Self> {
        Rc::new(Self { path: path.into(), ..Default::default() })
    }

    pub fn set_export(&self, name: impl Into<String>, value: Value) {
        self.exports.borrow_mut().insert(name.into(), value);
    }

    pub fn get_export(&self, name: &str) -> Option<Value> {
        self.exports.borrow().get(name).cloned()
    }
}

/// Synchronous module resolution for `import(...)` and `import.meta`,
/// provided by the linker.
pub trait ModuleHost {
    /// Resolve a dynamic-import specifier relative to `from` and return the
    /// namespace view of the target module.
    fn dynamic_import(&self, specifier: &str, from: &str) -> VmResult<Value>;
}

/// The evaluator.
pub struct Interpreter {
    pub globals: crate::env::Env,
    pub resolutions: Rc<Resolutions>,
    pub type_map: Rc<TypeMap>,
    /// Function-name frames for stack capture.
    call_stack: Vec<String>,
    /// FIFO promise-reaction queue, drained at microtask checkpoints.
    microtasks: VecDeque<Job>,
    pub event_loop: Option<Rc<dyn EventLoopHook>>,
    pub module_host: Option<Rc<dyn ModuleHost>>,
    pub sink: Rc<dyn OutputSink>,
    /// Module record currently executing, target of `export` statements.
    pub current_module: Option<Rc<ModuleRecord>>,
    /// Function currently executing, for `super` dispatch.
    current_function: Option<Rc<Function>>,
    /// Resources registered by `using` declarations, one frame per open
    /// block; disposed in reverse order at scope exit.
    using_stack: Vec<Vec<(Value, bool)>>,
    /// Set at shutdown; timer callbacks check it before invoking user code.
    disposed: bool,
}

impl Interpreter {
    pub fn new(resolutions: Rc<Resolutions>, type_map: Rc<TypeMap>) -> Self {
        Self {
            globals: crate::env::Env::root(),
            resolutions,
            type_map,
            call_stack: Vec::new(),
            microtasks: VecDeque::new(),
            event_loop: None,
            module_host: None,
            sink: Rc::new(StdioSink),
            current_module: None,
            current_function: None,
            using_stack: Vec::new(),
            disposed: false,
        }
    }

    pub fn with_sink(mut self, sink: Rc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Mark shutdown: pending timer callbacks must no longer run user code.
    pub fn dispose(&mut self) {
        self.disposed = true;
    }

    // ------------------------------------------------------------------
    // Stack & error materialization
    // ------------------------------------------------------------------

    pub fn stack_snapshot(&self) -> Vec<String> {
        self.call_stack.iter().rev().cloned().collect()
    }

    fn push_frame(&mut self, name: &str) -> VmResult<()> {
        if self.call_stack.len() >= MAX_CALL_DEPTH {
            return Err(VmError::StackOverflow);
        }
        self.call_stack.push(name.to_string());
        Ok(())
    }

    fn pop_frame(&mut self) {
        self.call_stack.pop();
    }

    /// Materialize a `VmError` into the JS value a `catch` clause binds.
    pub fn error_value(&self, err: &VmError) -> Value {
        match err {
            VmError::Thrown(t) | VmError::PromiseRejected(t) => t.value.clone(),
            other => {
                let kind = other.kind();
                Value::error(Rc::new(JsError::new(kind, other.message(), self.stack_snapshot())))
            }
        }
    }

    /// Construct a runtime error object directly.
    pub fn make_error(&self, kind: ErrorKind, message: impl Into<String>) -> Value {
        Value::error(Rc::new(JsError::new(kind, message, self.stack_snapshot())))
    }

    // ------------------------------------------------------------------
    // Promise jobs
    // ------------------------------------------------------------------

    pub fn enqueue_job(&mut self, job: Job) {
        self.microtasks.push_back(job);
    }

    pub fn has_microtasks(&self) -> bool {
        !self.microtasks.is_empty()
    }

    /// Fulfill `promise`, adopting the inner state when `value` is itself a
    /// promise so wrappers never nest.
    pub fn fulfill_promise(&mut self, promise: &Rc<JsPromise>, value: Value) {
        if let Value::Ref(HeapRef::Promise(inner)) = &value {
            match inner.state() {
                PromiseState::Fulfilled(v) => return self.fulfill_promise(promise, v),
                PromiseState::Rejected(r) => return self.reject_promise(promise, r),
                PromiseState::Pending => {
                    inner.add_reaction(Reaction {
                        on_fulfilled: Value::Undefined,
                        on_rejected: Value::Undefined,
                        result: promise.clone(),
                    });
                    return;
                }
            }
        }
        let reactions = promise.fulfill(value.clone());
        self.schedule_reactions(reactions, &PromiseState::Fulfilled(value));
    }

    pub fn reject_promise(&mut self, promise: &Rc<JsPromise>, reason: Value) {
        let reactions = promise.reject(reason.clone());
        self.schedule_reactions(reactions, &PromiseState::Rejected(reason));
    }

    /// Register a reaction, scheduling immediately when already settled.
    pub fn promise_then(&mut self, promise: &Rc<JsPromise>, on_fulfilled: Value, on_rejected: Value) -> Rc<JsPromise> {
        let result = JsPromise::new();
        let reaction = Reaction { on_fulfilled, on_rejected, result: result.clone() };
        match promise.state() {
            PromiseState::Pending => promise.add_reaction(reaction),
            ref settled => self.schedule_reactions(vec![reaction], settled),
        }
        result
    }

    fn schedule_reactions(&mut self, reactions: Vec<Reaction>, state: &PromiseState) {
        for reaction in reactions {
            let (callback, arg, is_rejection) = match state {
                PromiseState::Fulfilled(v) => (reaction.on_fulfilled.clone(), v.clone(), false),
                PromiseState::Rejected(r) => (reaction.on_rejected.clone(), r.clone(), true),
                PromiseState::Pending => unreachable!("reactions only scheduled on settled promises"),
            };
            if callback.is_callable() {
                self.enqueue_job(Job {
                    callback,
                    this: Value::Undefined,
                    args: vec![arg],
                    result: Some(reaction.result),
                });
            } else if is_rejection {
                // pass-through rejection
                self.reject_promise(&reaction.result, arg);
            } else {
                // pass-through fulfillment
                self.fulfill_promise(&reaction.result, arg);
            }
        }
    }

    /// Drain the microtask queue to empty (jobs may enqueue more jobs).
    pub fn run_microtasks(&mut self) -> VmResult<()> {
        while let Some(job) = self.microtasks.pop_front() {
            let outcome = self.call_value(&SyncCx, &job.callback, job.this.clone(), job.args.clone());
            match (outcome, &job.result) {
                (Ok(v), Some(result)) => self.fulfill_promise(&result.clone(), v),
                (Err(e), Some(result)) => {
                    let reason = self.error_value(&e);
                    self.reject_promise(&result.clone(), reason);
                }
                (Ok(_), None) => {}
                (Err(e), None) => return Err(e),
            }
        }
        Ok(())
    }

    /// Non-blocking drain of due event-loop work, called between user loop
    /// iterations so timers never starve.
    pub fn drain_scheduled(&mut self) -> VmResult<()> {
        self.run_microtasks()?;
        if let Some(hook) = self.event_loop.clone() {
            hook.poll(self)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    pub fn write_out(&self, text: &str) {
        self.sink.write_out(text);
    }

    pub fn write_err(&self, text: &str) {
        self.sink.write_err(text);
    }
}
