//! Generator and async-generator state machines.
//!
//! A generator call does not run the body; it creates a [`GeneratorObject`]
//! holding the callee scope (parameters already bound — the root of the
//! hoisting environment) and, lazily, the body lowered to a flat step
//! program. Resumption (`next`/`return`/`throw`) drives the program from
//! the saved program counter; everything that survives a suspension —
//! locals, parameters, spilled temporaries, parked for-of iterators — lives
//! in the machine state or in the hoisted environment chain.

mod lower;

pub use lower::{GenProgram, Step};

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tern_ast::{Pattern, Stmt};

use crate::env::Env;
use crate::error::{VmError, VmResult};
use crate::function::Function;
use crate::interp::{BindMode, Completion, EvalContext, Interpreter, IterSource, IterStep};
use crate::value::Value;

/// Resumption input.
pub enum Resume {
    Next(Value),
    Return(Value),
    Throw(Value),
}

/// One resumption's outcome.
pub struct StepOutcome {
    pub value: Value,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Suspended,
    Running,
    Done,
}

struct LoopFrame {
    label: Option<String>,
    break_target: usize,
    continue_target: usize,
    is_switch: bool,
    scope_depth: usize,
    try_depth: usize,
}

struct TryFrame {
    catch_target: Option<usize>,
    catch_binding: Option<Pattern>,
    finally_stmts: Option<Vec<Stmt>>,
    scope_depth: usize,
    loop_depth: usize,
}

struct MachineState {
    pc: usize,
    /// Scope chain, innermost last; index 0 is the hoisting environment.
    scopes: Vec<Env>,
    loops: Vec<LoopFrame>,
    tries: Vec<TryFrame>,
    /// Parked iterators, keyed by lowering-assigned slot.
    iters: FxHashMap<u32, IterSource>,
    /// Set while suspended inside a `yield*` delegation.
    delegating: Option<(u32, Option<String>)>,
    /// Hoist slot the next `next(v)` payload lands in, recorded by the
    /// suspending Yield step.
    sent_slot: Option<String>,
    /// `next(v)` payload to forward into a live delegation.
    delegate_sent: Option<Value>,
    status: Status,
}

/// A live generator.
pub struct GeneratorObject {
    pub func: Rc<Function>,
    program: RefCell<Option<Rc<GenProgram>>>,
    state: RefCell<MachineState>,
}

impl std::fmt::Debug for GeneratorObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorObject")
            .field("name", &self.func.name())
            .field("status", &self.state.borrow().status)
            .finish()
    }
}

impl GeneratorObject {
    /// Wrap a just-called generator function. `scope` is the callee scope
    /// with parameters (and `this`) already bound.
    pub fn create(func: Rc<Function>, scope: Env) -> Rc<Self> {
        Rc::new(Self {
            func,
            program: RefCell::new(None),
            state: RefCell::new(MachineState {
                pc: 0,
                scopes: vec![scope],
                loops: Vec::new(),
                tries: Vec::new(),
                iters: FxHashMap::default(),
                delegating: None,
                sent_slot: None,
                delegate_sent: None,
                status: Status::Suspended,
            }),
        })
    }

    pub fn is_async(&self) -> bool {
        self.func.decl.kind == tern_ast::decl::FnKind::AsyncGenerator
    }

    pub fn is_done(&self) -> bool {
        self.state.borrow().status == Status::Done
    }

    fn program(&self) -> VmResult<Rc<GenProgram>> {
        if let Some(p) = self.program.borrow().as_ref() {
            return Ok(p.clone());
        }
        let lowered = Rc::new(lower::Lowering::lower_body(&self.func.decl.body)?);
        *self.program.borrow_mut() = Some(lowered.clone());
        Ok(lowered)
    }

    /// Resume the machine. Returns the `{value, done}` pair `next`/`return`/
    /// `throw` report.
    pub fn resume(self: &Rc<Self>, vm: &mut Interpreter, cx: &dyn EvalContext, input: Resume) -> VmResult<StepOutcome> {
        {
            let state = self.state.borrow();
            match state.status {
                Status::Done => {
                    return Ok(match input {
                        Resume::Next(_) => StepOutcome { value: Value::Undefined, done: true },
                        Resume::Return(v) => StepOutcome { value: v, done: true },
                        Resume::Throw(reason) => return Err(VmError::thrown(reason, vm.stack_snapshot())),
                    });
                }
                Status::Running => {
                    return Err(VmError::type_error("Generator is already running"));
                }
                Status::Suspended => {}
            }
        }
        let program = self.program()?;
        self.state.borrow_mut().status = Status::Running;
        let result = self.run(vm, cx, &program, input);
        let mut state = self.state.borrow_mut();
        match &result {
            Ok(outcome) if outcome.done => state.status = Status::Done,
            Ok(_) => state.status = Status::Suspended,
            Err(_) => state.status = Status::Done,
        }
        drop(state);
        result
    }

    fn run(
        self: &Rc<Self>,
        vm: &mut Interpreter,
        cx: &dyn EvalContext,
        program: &GenProgram,
        input: Resume,
    ) -> VmResult<StepOutcome> {
        // deliver the resumption input at the suspension point
        let mut pending_error: Option<VmError> = None;
        match input {
            Resume::Next(v) => {
                let mut state = self.state.borrow_mut();
                if state.delegating.is_some() {
                    // forwarded into the inner iterator when the Delegate
                    // step re-executes
                    state.delegate_sent = Some(v);
                } else if let Some(slot) = state.sent_slot.take() {
                    state.scopes[0].define(slot, v);
                }
            }
            Resume::Return(v) => {
                return self.complete_with(vm, cx, Completion::Return(v));
            }
            Resume::Throw(reason) => {
                // a throw lands at the suspension point; close any live
                // delegation first
                let delegating = self.state.borrow_mut().delegating.take();
                if let Some((slot, _)) = delegating {
                    let taken = self.state.borrow_mut().iters.remove(&slot);
                    if let Some(mut source) = taken {
                        vm.iter_close(cx, &mut source, Value::Undefined)?;
                    }
                }
                pending_error = Some(VmError::thrown(reason, vm.stack_snapshot()));
            }
        }

        loop {
            if let Some(err) = pending_error.take() {
                match self.unwind_error(vm, cx, err)? {
                    UnwindOutcome::Handled => {}
                    UnwindOutcome::Propagate(err) => return Err(err),
                }
            }
            let pc = self.state.borrow().pc;
            if pc >= program.steps.len() {
                return self.complete_with(vm, cx, Completion::Return(Value::Undefined));
            }
            let step = program.steps[pc].clone();
            match self.exec_step(vm, cx, step) {
                Ok(StepResult::Continue) => {}
                Ok(StepResult::Suspend(value)) => {
                    if self.is_async() {
                        let value = cx.resolve(vm, value)?;
                        return Ok(StepOutcome { value, done: false });
                    }
                    return Ok(StepOutcome { value, done: false });
                }
                Ok(StepResult::Complete(value)) => return Ok(StepOutcome { value, done: true }),
                Err(err) => pending_error = Some(err),
            }
        }
    }

    fn current_env(&self) -> Env {
        let state = self.state.borrow();
        state.scopes.last().expect("machine scope chain is never empty").clone()
    }

    fn exec_step(self: &Rc<Self>, vm: &mut Interpreter, cx: &dyn EvalContext, step: Step) -> VmResult<StepResult> {
        let env = self.current_env();
        match step {
            Step::Exec(stmt) => {
                let completion = vm.exec_stmt(cx, &env, &stmt)?;
                match completion {
                    Completion::Normal => {
                        self.advance();
                        Ok(StepResult::Continue)
                    }
                    Completion::Return(v) => {
                        let outcome = self.complete_with(vm, cx, Completion::Return(v))?;
                        Ok(StepResult::Complete(outcome.value))
                    }
                    Completion::Break(label) => {
                        self.route_break(vm, cx, label.as_deref())?;
                        Ok(StepResult::Continue)
                    }
                    Completion::Continue(label) => {
                        self.route_continue(vm, cx, label.as_deref())?;
                        Ok(StepResult::Continue)
                    }
                }
            }
            Step::Eval { expr, store } => {
                let value = vm.eval_expr(cx, &env, &expr)?;
                if let Some(slot) = store {
                    self.state.borrow().scopes[0].define(slot, value);
                }
                self.advance();
                Ok(StepResult::Continue)
            }
            Step::Yield { value, store } => {
                let value = match &value {
                    Some(e) => vm.eval_expr(cx, &env, e)?,
                    None => Value::Undefined,
                };
                let mut state = self.state.borrow_mut();
                state.pc += 1;
                state.sent_slot = store;
                drop(state);
                Ok(StepResult::Suspend(value))
            }
            Step::Delegate { iter_slot, store } => {
                // drive the inner iterator; suspend on each value it yields,
                // staying on this step so resumption re-enters it
                let sent = {
                    let mut state = self.state.borrow_mut();
                    state.delegating = None;
                    state.delegate_sent.take().unwrap_or(Value::Undefined)
                };
                let step = {
                    let mut state = self.state.borrow_mut();
                    let source = state
                        .iters
                        .get_mut(&iter_slot)
                        .ok_or_else(|| VmError::internal("delegation over an unopened iterator"))?;
                    let mut taken = std::mem::replace(source, IterSource::Values(Default::default()));
                    drop(state);
                    let result = vm.iter_next(cx, &mut taken, sent);
                    let mut state = self.state.borrow_mut();
                    state.iters.insert(iter_slot, taken);
                    result?
                };
                match step {
                    IterStep::Value(v) => {
                        let mut state = self.state.borrow_mut();
                        state.delegating = Some((iter_slot, store));
                        drop(state);
                        Ok(StepResult::Suspend(v))
                    }
                    IterStep::Done(final_value) => {
                        let mut state = self.state.borrow_mut();
                        state.delegating = None;
                        if let Some(slot) = store {
                            state.scopes[0].define(slot, final_value);
                        }
                        state.pc += 1;
                        Ok(StepResult::Continue)
                    }
                }
            }
            Step::IterOpen { expr, iter_slot, keys } => {
                let value = vm.eval_expr(cx, &env, &expr)?;
                let source = if keys {
                    let key_list = crate::interp::member::own_enumerable_keys(&value);
                    IterSource::Values(key_list.into_iter().map(Value::string).collect())
                } else {
                    vm.make_iterator(cx, &value)?
                };
                self.state.borrow_mut().iters.insert(iter_slot, source);
                self.advance();
                Ok(StepResult::Continue)
            }
            Step::IterNext { iter_slot, bind, done_target } => {
                // re-entry from `continue` may leave per-iteration scopes
                // open; the loop frame records the base depth
                {
                    let mut state = self.state.borrow_mut();
                    if let Some(frame) = state.loops.last() {
                        let depth = frame.scope_depth;
                        state.scopes.truncate(depth);
                    }
                }
                let step = {
                    let mut state = self.state.borrow_mut();
                    let source = state
                        .iters
                        .get_mut(&iter_slot)
                        .ok_or_else(|| VmError::internal("advance of an unopened iterator"))?;
                    let mut taken = std::mem::replace(source, IterSource::Values(Default::default()));
                    drop(state);
                    let result = vm.iter_next(cx, &mut taken, Value::Undefined);
                    let mut state = self.state.borrow_mut();
                    state.iters.insert(iter_slot, taken);
                    result?
                };
                match step {
                    IterStep::Value(v) => {
                        let scope = self.current_env().child();
                        if let Some(pattern) = &bind {
                            vm.destructure(cx, &scope, pattern, v, BindMode::Define)?;
                        }
                        self.state.borrow_mut().scopes.push(scope);
                        self.advance();
                        Ok(StepResult::Continue)
                    }
                    IterStep::Done(_) => {
                        self.jump(done_target);
                        Ok(StepResult::Continue)
                    }
                }
            }
            Step::Jump(target) => {
                self.jump(target);
                Ok(StepResult::Continue)
            }
            Step::JumpIfFalse { cond, target } => {
                let v = vm.eval_expr(cx, &env, &cond)?;
                if v.is_truthy() {
                    self.advance();
                } else {
                    self.jump(target);
                }
                Ok(StepResult::Continue)
            }
            Step::EnterScope => {
                let child = env.child();
                self.state.borrow_mut().scopes.push(child);
                self.advance();
                Ok(StepResult::Continue)
            }
            Step::ExitScope => {
                let mut state = self.state.borrow_mut();
                if state.scopes.len() > 1 {
                    state.scopes.pop();
                }
                state.pc += 1;
                Ok(StepResult::Continue)
            }
            Step::PushLoop { label, break_target, continue_target, is_switch } => {
                let mut state = self.state.borrow_mut();
                let scope_depth = state.scopes.len();
                let try_depth = state.tries.len();
                state.loops.push(LoopFrame {
                    label,
                    break_target,
                    continue_target,
                    is_switch,
                    scope_depth,
                    try_depth,
                });
                state.pc += 1;
                Ok(StepResult::Continue)
            }
            Step::PopLoop => {
                let mut state = self.state.borrow_mut();
                state.loops.pop();
                state.pc += 1;
                Ok(StepResult::Continue)
            }
            Step::PushTry { catch_target, catch_binding, finally_stmts } => {
                let mut state = self.state.borrow_mut();
                let scope_depth = state.scopes.len();
                let loop_depth = state.loops.len();
                state.tries.push(TryFrame { catch_target, catch_binding, finally_stmts, scope_depth, loop_depth });
                state.pc += 1;
                Ok(StepResult::Continue)
            }
            Step::PopTry => {
                let frame = self.state.borrow_mut().tries.pop();
                if let Some(frame) = frame
                    && let Some(finally) = &frame.finally_stmts
                {
                    let scope = self.current_env().child();
                    match vm.run_scoped(cx, &scope, finally)? {
                        Completion::Normal => {}
                        Completion::Return(v) => {
                            let outcome = self.complete_with(vm, cx, Completion::Return(v))?;
                            return Ok(StepResult::Complete(outcome.value));
                        }
                        Completion::Break(label) => {
                            self.advance();
                            self.route_break(vm, cx, label.as_deref())?;
                            return Ok(StepResult::Continue);
                        }
                        Completion::Continue(label) => {
                            self.advance();
                            self.route_continue(vm, cx, label.as_deref())?;
                            return Ok(StepResult::Continue);
                        }
                    }
                }
                self.advance();
                Ok(StepResult::Continue)
            }
            Step::Return { expr } => {
                let value = match &expr {
                    Some(e) => vm.eval_expr(cx, &env, e)?,
                    None => Value::Undefined,
                };
                let outcome = self.complete_with(vm, cx, Completion::Return(value))?;
                Ok(StepResult::Complete(outcome.value))
            }
        }
    }

    fn advance(&self) {
        self.state.borrow_mut().pc += 1;
    }

    fn jump(&self, target: usize) {
        self.state.borrow_mut().pc = target;
    }

    /// Break routing: pop frames to the matching loop/switch, running
    /// intervening finallies, then jump.
    fn route_break(&self, vm: &mut Interpreter, cx: &dyn EvalContext, label: Option<&str>) -> VmResult<()> {
        self.route(vm, cx, label, true)
    }

    fn route_continue(&self, vm: &mut Interpreter, cx: &dyn EvalContext, label: Option<&str>) -> VmResult<()> {
        self.route(vm, cx, label, false)
    }

    fn route(&self, vm: &mut Interpreter, cx: &dyn EvalContext, label: Option<&str>, is_break: bool) -> VmResult<()> {
        loop {
            let frame_info = {
                let state = self.state.borrow();
                state.loops.last().map(|f| {
                    (
                        f.label.clone(),
                        f.is_switch,
                        f.break_target,
                        f.continue_target,
                        f.scope_depth,
                        f.try_depth,
                    )
                })
            };
            let Some((frame_label, is_switch, break_target, continue_target, scope_depth, try_depth)) = frame_info
            else {
                return Err(VmError::internal("break/continue escaped the lowered region"));
            };
            let matches = match label {
                Some(l) => frame_label.as_deref() == Some(l),
                // unlabeled continue skips switch frames
                None => is_break || !is_switch,
            };
            if !matches {
                self.state.borrow_mut().loops.pop();
                continue;
            }
            // run finallies of try frames opened inside the loop
            self.unwind_tries_to(vm, cx, try_depth)?;
            let mut state = self.state.borrow_mut();
            state.scopes.truncate(scope_depth);
            if is_break {
                // the PopLoop step at the break target retires the frame
                state.pc = break_target;
            } else {
                state.pc = continue_target;
            }
            return Ok(());
        }
    }

    fn unwind_tries_to(&self, vm: &mut Interpreter, cx: &dyn EvalContext, depth: usize) -> VmResult<()> {
        loop {
            let frame = {
                let mut state = self.state.borrow_mut();
                if state.tries.len() <= depth {
                    return Ok(());
                }
                state.tries.pop()
            };
            if let Some(frame) = frame
                && let Some(finally) = &frame.finally_stmts
            {
                let scope = self.current_env().child();
                vm.run_scoped(cx, &scope, finally)?;
            }
        }
    }

    /// Finish the generator with a completion, unwinding every protected
    /// region's finally on the way out.
    fn complete_with(
        self: &Rc<Self>,
        vm: &mut Interpreter,
        cx: &dyn EvalContext,
        completion: Completion,
    ) -> VmResult<StepOutcome> {
        // close a live delegation first
        let delegating = self.state.borrow_mut().delegating.take();
        if let Some((slot, _)) = delegating {
            let taken = self.state.borrow_mut().iters.remove(&slot);
            if let Some(mut source) = taken {
                vm.iter_close(cx, &mut source, Value::Undefined)?;
            }
        }
        self.unwind_tries_to(vm, cx, 0)?;
        let mut state = self.state.borrow_mut();
        state.status = Status::Done;
        state.scopes.truncate(1);
        state.loops.clear();
        match completion {
            Completion::Return(v) => Ok(StepOutcome { value: v, done: true }),
            _ => Ok(StepOutcome { value: Value::Undefined, done: true }),
        }
    }

    /// Error unwinding: find the nearest catch, running finallies of frames
    /// passed over; no catch means the generator dies and the error
    /// propagates to the resumer.
    fn unwind_error(
        self: &Rc<Self>,
        vm: &mut Interpreter,
        cx: &dyn EvalContext,
        mut err: VmError,
    ) -> VmResult<UnwindOutcome> {
        loop {
            let frame = self.state.borrow_mut().tries.pop();
            let Some(frame) = frame else {
                // no handler: the machine is dead
                let mut state = self.state.borrow_mut();
                state.status = Status::Done;
                state.scopes.truncate(1);
                state.loops.clear();
                return Ok(UnwindOutcome::Propagate(err));
            };
            if let Some(catch_target) = frame.catch_target {
                {
                    let mut state = self.state.borrow_mut();
                    state.scopes.truncate(frame.scope_depth);
                    state.loops.truncate(frame.loop_depth);
                    // a catch-less frame keeps protecting the catch body (the
                    // region's trailing PopTry balances against it), carrying
                    // the finally if there is one
                    let scope_depth = state.scopes.len();
                    let loop_depth = state.loops.len();
                    state.tries.push(TryFrame {
                        catch_target: None,
                        catch_binding: None,
                        finally_stmts: frame.finally_stmts.clone(),
                        scope_depth,
                        loop_depth,
                    });
                }
                let thrown = vm.error_value(&err);
                let scope = self.current_env().child();
                if let Some(binding) = &frame.catch_binding {
                    vm.destructure(cx, &scope, binding, thrown, BindMode::Define)?;
                }
                let mut state = self.state.borrow_mut();
                state.scopes.push(scope);
                state.pc = catch_target;
                return Ok(UnwindOutcome::Handled);
            }
            if let Some(finally) = &frame.finally_stmts {
                let scope = self.current_env().child();
                match vm.run_scoped(cx, &scope, finally) {
                    Ok(_) => {}
                    // a throwing finally replaces the pending error
                    Err(replacement) => err = replacement,
                }
            }
        }
    }
}

enum StepResult {
    Continue,
    Suspend(Value),
    Complete(Value),
}

enum UnwindOutcome {
    Handled,
    Propagate(VmError),
}
