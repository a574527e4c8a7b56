//! Lowering of generator bodies to flat step programs.
//!
//! A suspendable body cannot run on the host stack, so it is compiled once,
//! at first resumption, into a linear program: structured control flow
//! becomes explicit jumps, and every expression containing a `yield` is
//! linearized through numbered hoist slots (`@t0`, `@t1`, ...) that live in
//! the machine's hoisting environment. Statements with no suspension point
//! inside stay whole and run through the tree-walking evaluator.

use tern_ast::{CatchClause, Element, Expr, ExprKind, ObjectProp, Pattern, Stmt, SwitchCase, TemplatePart};

use crate::error::{VmError, VmResult};

/// One step of a lowered body.
#[derive(Debug, Clone)]
pub enum Step {
    /// Non-suspending statement, executed by the tree-walker.
    Exec(Stmt),
    /// Non-suspending expression; result optionally stored to a hoist slot.
    Eval { expr: Expr, store: Option<String> },
    /// Suspend, yielding `value`; the resumption value lands in `store`.
    Yield { value: Option<Expr>, store: Option<String> },
    /// Drive the parked iterator in `iter_slot` to completion, forwarding
    /// resumption values; the final value lands in `store`.
    Delegate { iter_slot: u32, store: Option<String> },
    /// Open an iteration over `expr` and park the handle (hoisted across
    /// suspensions). `keys` switches to for-in key enumeration.
    IterOpen { expr: Expr, iter_slot: u32, keys: bool },
    /// Advance a parked iterator: bind the next value into a fresh
    /// per-iteration scope, or jump to `done_target`.
    IterNext { iter_slot: u32, bind: Option<Pattern>, done_target: usize },
    Jump(usize),
    JumpIfFalse { cond: Expr, target: usize },
    EnterScope,
    ExitScope,
    /// Open a loop (or switch) region for break/continue routing.
    PushLoop { label: Option<String>, break_target: usize, continue_target: usize, is_switch: bool },
    PopLoop,
    /// Open a protected region.
    PushTry { catch_target: Option<usize>, catch_binding: Option<Pattern>, finally_stmts: Option<Vec<Stmt>> },
    /// Close the innermost protected region, running its finally.
    PopTry,
    /// Complete the generator with `expr`'s value, unwinding finallies.
    Return { expr: Option<Expr> },
}

/// A lowered body.
#[derive(Debug)]
pub struct GenProgram {
    pub steps: Vec<Step>,
}

/// Does this expression contain a `yield` at the current function level?
/// Nested function bodies are opaque.
fn expr_has_yield(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Yield { .. } => true,
        ExprKind::Literal(_)
        | ExprKind::RegexLiteral { .. }
        | ExprKind::Variable(_)
        | ExprKind::This
        | ExprKind::Super { .. }
        | ExprKind::ImportMeta
        | ExprKind::ArrowFunction(_)
        | ExprKind::FunctionExpr(_)
        | ExprKind::ClassExpr(_) => false,
        ExprKind::TemplateLiteral(parts) => parts.iter().any(|p| match p {
            TemplatePart::Str(_) => false,
            TemplatePart::Expr(e) => expr_has_yield(e),
        }),
        ExprKind::TaggedTemplate { tag, exprs, .. } => expr_has_yield(tag) || exprs.iter().any(expr_has_yield),
        ExprKind::ArrayLiteral(elements) => elements.iter().any(|e| match e {
            Element::Item(e) | Element::Spread(e) => expr_has_yield(e),
        }),
        ExprKind::ObjectLiteral(props) => props.iter().any(|p| match p {
            ObjectProp::Keyed { value, .. } => expr_has_yield(value),
            ObjectProp::Computed { key, value } => expr_has_yield(key) || expr_has_yield(value),
            ObjectProp::Shorthand(_) => false,
            ObjectProp::Spread(e) => expr_has_yield(e),
        }),
        ExprKind::Assign { value, .. } => expr_has_yield(value),
        ExprKind::Grouping(e)
        | ExprKind::Unary { operand: e, .. }
        | ExprKind::Delete(e)
        | ExprKind::Prefix { target: e, .. }
        | ExprKind::Postfix { target: e, .. }
        | ExprKind::Spread(e)
        | ExprKind::TypeAssertion(e)
        | ExprKind::Satisfies(e)
        | ExprKind::NonNullAssertion(e)
        | ExprKind::Await(e)
        | ExprKind::DynamicImport(e) => expr_has_yield(e),
        ExprKind::Binary { left, right, .. }
        | ExprKind::Logical { left, right, .. }
        | ExprKind::NullishCoalescing { left, right } => expr_has_yield(left) || expr_has_yield(right),
        ExprKind::Ternary { cond, then, otherwise } => {
            expr_has_yield(cond) || expr_has_yield(then) || expr_has_yield(otherwise)
        }
        ExprKind::Call { callee, args, .. } => {
            expr_has_yield(callee)
                || args.iter().any(|a| match a {
                    Element::Item(e) | Element::Spread(e) => expr_has_yield(e),
                })
        }
        ExprKind::New { callee, args } => {
            expr_has_yield(callee)
                || args.iter().any(|a| match a {
                    Element::Item(e) | Element::Spread(e) => expr_has_yield(e),
                })
        }
        ExprKind::Get { object, .. } => expr_has_yield(object),
        ExprKind::GetIndex { object, index, .. } => expr_has_yield(object) || expr_has_yield(index),
        ExprKind::Set { object, value, .. } => expr_has_yield(object) || expr_has_yield(value),
        ExprKind::SetIndex { object, index, value, .. } => {
            expr_has_yield(object) || expr_has_yield(index) || expr_has_yield(value)
        }
        ExprKind::GetPrivate { object, .. } => expr_has_yield(object),
        ExprKind::SetPrivate { object, value, .. } => expr_has_yield(object) || expr_has_yield(value),
        ExprKind::CallPrivate { object, args, .. } => {
            expr_has_yield(object)
                || args.iter().any(|a| match a {
                    Element::Item(e) | Element::Spread(e) => expr_has_yield(e),
                })
        }
    }
}

fn stmts_have_yield(stmts: &[Stmt]) -> bool {
    stmts.iter().any(stmt_has_yield)
}

fn stmt_has_yield(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expression(e) | Stmt::Throw(e) => expr_has_yield(e),
        Stmt::Return(e) => e.as_ref().is_some_and(expr_has_yield),
        Stmt::VarDecl { declarations, .. } => {
            declarations.iter().any(|d| d.init.as_ref().is_some_and(expr_has_yield))
        }
        Stmt::Block(stmts) | Stmt::Sequence(stmts) => stmts_have_yield(stmts),
        Stmt::If { cond, then, otherwise } => {
            expr_has_yield(cond)
                || stmt_has_yield(then)
                || otherwise.as_ref().is_some_and(|s| stmt_has_yield(s))
        }
        Stmt::While { cond, body } => expr_has_yield(cond) || stmt_has_yield(body),
        Stmt::DoWhile { body, cond } => expr_has_yield(cond) || stmt_has_yield(body),
        Stmt::For { init, cond, increment, body } => {
            init.as_deref().is_some_and(stmt_has_yield)
                || cond.as_ref().is_some_and(expr_has_yield)
                || increment.as_ref().is_some_and(expr_has_yield)
                || stmt_has_yield(body)
        }
        Stmt::ForOf { iterable, body, .. } => expr_has_yield(iterable) || stmt_has_yield(body),
        Stmt::ForIn { object, body, .. } => expr_has_yield(object) || stmt_has_yield(body),
        Stmt::TryCatch { try_block, catch, finally } => {
            stmts_have_yield(try_block)
                || catch.as_ref().is_some_and(|c| stmts_have_yield(&c.body))
                || finally.as_ref().is_some_and(|f| stmts_have_yield(f))
        }
        Stmt::Switch { discriminant, cases } => {
            expr_has_yield(discriminant)
                || cases
                    .iter()
                    .any(|c| c.test.as_ref().is_some_and(expr_has_yield) || stmts_have_yield(&c.body))
        }
        Stmt::Labeled { body, .. } => stmt_has_yield(body),
        Stmt::Using { init, .. } => expr_has_yield(init),
        Stmt::Export(tern_ast::ExportDecl::Default(e) | tern_ast::ExportDecl::Assignment(e)) => expr_has_yield(e),
        _ => false,
    }
}

/// Body-to-program compiler.
pub struct Lowering {
    steps: Vec<Step>,
    next_temp: u32,
    next_iter: u32,
}

impl Lowering {
    pub fn lower_body(body: &[Stmt]) -> VmResult<GenProgram> {
        let mut lowering = Self { steps: Vec::new(), next_temp: 0, next_iter: 0 };
        lowering.lower_stmts(body)?;
        Ok(GenProgram { steps: lowering.steps })
    }

    fn temp(&mut self) -> String {
        let slot = format!("@t{}", self.next_temp);
        self.next_temp += 1;
        slot
    }

    fn iter_slot(&mut self) -> u32 {
        let slot = self.next_iter;
        self.next_iter += 1;
        slot
    }

    fn emit(&mut self, step: Step) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    /// Reserve a jump to be patched once the target is known.
    fn emit_jump_placeholder(&mut self) -> usize {
        self.emit(Step::Jump(usize::MAX))
    }

    fn patch_jump(&mut self, at: usize, target: usize) {
        match &mut self.steps[at] {
            Step::Jump(t) => *t = target,
            Step::JumpIfFalse { target: t, .. } => *t = target,
            Step::IterNext { done_target, .. } => *done_target = target,
            Step::PushLoop { break_target, .. } => *break_target = target,
            _ => unreachable!("patching a non-jump step"),
        }
    }

    fn here(&self) -> usize {
        self.steps.len()
    }

    fn lower_stmts(&mut self, stmts: &[Stmt]) -> VmResult<()> {
        for stmt in stmts {
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> VmResult<()> {
        if !stmt_has_yield(stmt) {
            // return still has to unwind through the machine's try frames
            if let Stmt::Return(e) = stmt {
                self.emit(Step::Return { expr: e.clone() });
            } else {
                self.emit(Step::Exec(stmt.clone()));
            }
            return Ok(());
        }
        match stmt {
            Stmt::Expression(e) => {
                let rewritten = self.linearize(e)?;
                self.emit(Step::Eval { expr: rewritten, store: None });
                Ok(())
            }
            Stmt::VarDecl { kind, declarations } => {
                for declarator in declarations {
                    match &declarator.init {
                        Some(init) if expr_has_yield(init) => {
                            let rewritten = self.linearize(init)?;
                            let decl = Stmt::VarDecl {
                                kind: *kind,
                                declarations: vec![tern_ast::Declarator {
                                    target: declarator.target.clone(),
                                    init: Some(rewritten),
                                }],
                            };
                            self.emit(Step::Exec(decl));
                        }
                        _ => {
                            let decl = Stmt::VarDecl { kind: *kind, declarations: vec![declarator.clone()] };
                            self.emit(Step::Exec(decl));
                        }
                    }
                }
                Ok(())
            }
            Stmt::Block(stmts) => {
                self.emit(Step::EnterScope);
                self.lower_stmts(stmts)?;
                self.emit(Step::ExitScope);
                Ok(())
            }
            Stmt::Sequence(stmts) => self.lower_stmts(stmts),
            Stmt::If { cond, then, otherwise } => {
                let cond = self.linearize(cond)?;
                let skip_then = self.emit(Step::JumpIfFalse { cond, target: usize::MAX });
                self.lower_stmt(then)?;
                match otherwise {
                    Some(otherwise) => {
                        let skip_else = self.emit_jump_placeholder();
                        let else_start = self.here();
                        self.patch_jump(skip_then, else_start);
                        self.lower_stmt(otherwise)?;
                        let end = self.here();
                        self.patch_jump(skip_else, end);
                    }
                    None => {
                        let end = self.here();
                        self.patch_jump(skip_then, end);
                    }
                }
                Ok(())
            }
            Stmt::While { cond, body } => self.lower_loop(None, Some(cond), None, body),
            Stmt::DoWhile { body, cond } => self.lower_do_while(None, body, cond),
            Stmt::For { init, cond, increment, body } => {
                self.emit(Step::EnterScope);
                if let Some(init) = init {
                    self.lower_stmt(init)?;
                }
                self.lower_loop(None, cond.as_ref(), increment.as_ref(), body)?;
                self.emit(Step::ExitScope);
                Ok(())
            }
            Stmt::ForOf { binding, iterable, body, .. } => {
                self.lower_for_of(None, binding, iterable, body, false)
            }
            Stmt::ForIn { binding, object, body } => {
                self.lower_for_of(None, &Pattern::Identifier(binding.clone()), object, body, true)
            }
            Stmt::Return(e) => {
                let expr = match e {
                    Some(e) if expr_has_yield(e) => Some(self.linearize(e)?),
                    other => other.clone(),
                };
                self.emit(Step::Return { expr });
                Ok(())
            }
            Stmt::Throw(e) => {
                let rewritten = self.linearize(e)?;
                self.emit(Step::Exec(Stmt::Throw(rewritten)));
                Ok(())
            }
            Stmt::TryCatch { try_block, catch, finally } => self.lower_try(try_block, catch.as_ref(), finally),
            Stmt::Switch { discriminant, cases } => self.lower_switch(None, discriminant, cases),
            Stmt::Labeled { label, body } => self.lower_labeled(label, body),
            Stmt::Using { name, init, is_await } => {
                let rewritten = self.linearize(init)?;
                self.emit(Step::Exec(Stmt::Using { name: name.clone(), init: rewritten, is_await: *is_await }));
                Ok(())
            }
            other => Err(VmError::internal(format!(
                "yield in an unsupported statement position: {other:?}"
            ))),
        }
    }

    fn lower_labeled(&mut self, label: &str, body: &Stmt) -> VmResult<()> {
        match body {
            Stmt::While { cond, body } => self.lower_loop(Some(label), Some(cond), None, body),
            Stmt::DoWhile { body, cond } => self.lower_do_while(Some(label), body, cond),
            Stmt::For { init, cond, increment, body } => {
                self.emit(Step::EnterScope);
                if let Some(init) = init {
                    self.lower_stmt(init)?;
                }
                self.lower_loop(Some(label), cond.as_ref(), increment.as_ref(), body)?;
                self.emit(Step::ExitScope);
                Ok(())
            }
            Stmt::ForOf { binding, iterable, body, .. } => {
                self.lower_for_of(Some(label), binding, iterable, body, false)
            }
            Stmt::ForIn { binding, object, body } => {
                self.lower_for_of(Some(label), &Pattern::Identifier(binding.clone()), object, body, true)
            }
            Stmt::Switch { discriminant, cases } => self.lower_switch(Some(label), discriminant, cases),
            other => self.lower_stmt(other),
        }
    }

    /// Shared while/for skeleton.
    fn lower_loop(
        &mut self,
        label: Option<&str>,
        cond: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> VmResult<()> {
        let push = self.emit(Step::PushLoop {
            label: label.map(str::to_string),
            break_target: usize::MAX,
            continue_target: usize::MAX,
            is_switch: false,
        });
        let top = self.here();
        let exit_jump = match cond {
            Some(cond) => {
                let cond = self.linearize(cond)?;
                Some(self.emit(Step::JumpIfFalse { cond, target: usize::MAX }))
            }
            None => None,
        };
        self.lower_stmt(body)?;
        // `continue` lands on the increment
        let continue_target = self.here();
        if let Some(increment) = increment {
            let rewritten = self.linearize(increment)?;
            self.emit(Step::Eval { expr: rewritten, store: None });
        }
        self.emit(Step::Jump(top));
        let after = self.here();
        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump, after);
        }
        self.emit(Step::PopLoop);
        let break_target = after;
        if let Step::PushLoop { break_target: bt, continue_target: ct, .. } = &mut self.steps[push] {
            *bt = break_target;
            *ct = continue_target;
        }
        Ok(())
    }

    fn lower_do_while(&mut self, label: Option<&str>, body: &Stmt, cond: &Expr) -> VmResult<()> {
        let push = self.emit(Step::PushLoop {
            label: label.map(str::to_string),
            break_target: usize::MAX,
            continue_target: usize::MAX,
            is_switch: false,
        });
        let top = self.here();
        self.lower_stmt(body)?;
        let continue_target = self.here();
        let cond = self.linearize(cond)?;
        let exit = self.emit(Step::JumpIfFalse { cond, target: usize::MAX });
        self.emit(Step::Jump(top));
        let after = self.here();
        self.patch_jump(exit, after);
        self.emit(Step::PopLoop);
        if let Step::PushLoop { break_target: bt, continue_target: ct, .. } = &mut self.steps[push] {
            *bt = after;
            *ct = continue_target;
        }
        Ok(())
    }

    /// for-of / for-in with a suspension inside: the iterator handle parks
    /// in the machine so it survives across yields.
    fn lower_for_of(
        &mut self,
        label: Option<&str>,
        binding: &Pattern,
        iterable: &Expr,
        body: &Stmt,
        keys: bool,
    ) -> VmResult<()> {
        let iterable = self.linearize(iterable)?;
        let slot = self.iter_slot();
        self.emit(Step::IterOpen { expr: iterable, iter_slot: slot, keys });
        let push = self.emit(Step::PushLoop {
            label: label.map(str::to_string),
            break_target: usize::MAX,
            continue_target: usize::MAX,
            is_switch: false,
        });
        let next = self.emit(Step::IterNext {
            iter_slot: slot,
            bind: Some(binding.clone()),
            done_target: usize::MAX,
        });
        self.lower_stmt(body)?;
        self.emit(Step::ExitScope);
        self.emit(Step::Jump(next));
        let after = self.here();
        self.patch_jump(next, after);
        self.emit(Step::PopLoop);
        if let Step::PushLoop { break_target: bt, continue_target: ct, .. } = &mut self.steps[push] {
            *bt = after;
            *ct = next;
        }
        Ok(())
    }

    fn lower_try(
        &mut self,
        try_block: &[Stmt],
        catch: Option<&CatchClause>,
        finally: &Option<Vec<Stmt>>,
    ) -> VmResult<()> {
        if finally.as_ref().is_some_and(|f| stmts_have_yield(f)) {
            return Err(VmError::internal("yield inside a finally block is not supported in generators"));
        }
        let push = self.emit(Step::PushTry {
            catch_target: None,
            catch_binding: catch.and_then(|c| c.param.clone()),
            finally_stmts: finally.clone(),
        });
        self.emit(Step::EnterScope);
        self.lower_stmts(try_block)?;
        self.emit(Step::ExitScope);
        self.emit(Step::PopTry);
        let skip_catch = self.emit_jump_placeholder();
        if let Some(clause) = catch {
            let catch_start = self.here();
            if let Step::PushTry { catch_target, .. } = &mut self.steps[push] {
                *catch_target = Some(catch_start);
            }
            // the machine enters a scope and binds the thrown value before
            // jumping here; a finally-only frame protects the catch body
            self.lower_stmts(&clause.body)?;
            self.emit(Step::ExitScope);
            self.emit(Step::PopTry);
        }
        let end = self.here();
        self.patch_jump(skip_catch, end);
        Ok(())
    }

    fn lower_switch(&mut self, label: Option<&str>, discriminant: &Expr, cases: &[SwitchCase]) -> VmResult<()> {
        let disc = self.linearize(discriminant)?;
        let disc_slot = self.temp();
        self.emit(Step::Eval { expr: disc, store: Some(disc_slot.clone()) });
        let push = self.emit(Step::PushLoop {
            label: label.map(str::to_string),
            break_target: usize::MAX,
            continue_target: usize::MAX,
            is_switch: true,
        });
        self.emit(Step::EnterScope);

        // dispatch chain: test each case, jump to its body on match
        let mut body_jumps = Vec::new();
        let mut default_jump = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let test = self.linearize(test)?;
                let cond = Expr::binary(
                    tern_ast::BinaryOp::EqEqEq,
                    Expr::var(disc_slot.clone()),
                    test,
                );
                let miss = self.emit(Step::JumpIfFalse { cond, target: usize::MAX });
                let hit = self.emit_jump_placeholder();
                body_jumps.push((i, hit));
                let next_test = self.here();
                self.patch_jump(miss, next_test);
            }
        }
        for (i, case) in cases.iter().enumerate() {
            if case.test.is_none() {
                let hit = self.emit_jump_placeholder();
                default_jump = Some((i, hit));
                break;
            }
        }
        let no_match = self.emit_jump_placeholder();

        // bodies, falling through in declaration order
        let mut body_starts = vec![usize::MAX; cases.len()];
        for (i, case) in cases.iter().enumerate() {
            body_starts[i] = self.here();
            self.lower_stmts(&case.body)?;
        }
        let after_bodies = self.here();
        self.emit(Step::ExitScope);
        let pop_at = self.here();
        self.emit(Step::PopLoop);

        for (i, jump) in body_jumps {
            self.patch_jump(jump, body_starts[i]);
        }
        if let Some((i, jump)) = default_jump {
            self.patch_jump(jump, body_starts[i]);
        }
        self.patch_jump(no_match, after_bodies);
        // break skips the ExitScope: routing already truncated the scopes
        if let Step::PushLoop { break_target: bt, continue_target: ct, .. } = &mut self.steps[push] {
            *bt = pop_at;
            *ct = usize::MAX;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expression linearization
    // ------------------------------------------------------------------

    /// Rewrite an expression so it contains no `yield`: each yield becomes
    /// steps plus a hoist-slot read, and every subexpression that evaluates
    /// before a suspension is spilled to a slot to preserve evaluation
    /// order.
    fn linearize(&mut self, expr: &Expr) -> VmResult<Expr> {
        if !expr_has_yield(expr) {
            return Ok(expr.clone());
        }
        match &expr.kind {
            ExprKind::Yield { value, delegate } => {
                let value = match value {
                    Some(v) => Some(self.spillable(v)?),
                    None => None,
                };
                let store = self.temp();
                if *delegate {
                    let slot = self.iter_slot();
                    let value = value.ok_or_else(|| VmError::internal("yield* without an operand"))?;
                    self.emit(Step::IterOpen { expr: value, iter_slot: slot, keys: false });
                    self.emit(Step::Delegate { iter_slot: slot, store: Some(store.clone()) });
                } else {
                    self.emit(Step::Yield { value, store: Some(store.clone()) });
                }
                Ok(Expr::var(store))
            }
            ExprKind::Grouping(inner) => self.linearize(inner),
            ExprKind::Assign { name, op, value } => {
                let value = self.linearize(value)?;
                Ok(Expr::new(
                    expr.id,
                    ExprKind::Assign { name: name.clone(), op: *op, value: Box::new(value) },
                ))
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.spill_before(left, right)?;
                let right = self.linearize(right)?;
                Ok(Expr::synth(ExprKind::Binary { op: *op, left: Box::new(left), right: Box::new(right) }))
            }
            ExprKind::Call { callee, args, optional } => {
                // the callee is not spilled even when an argument suspends:
                // member callees must keep their syntactic shape so the call
                // still sees its receiver
                let callee = Box::new(self.linearize(callee)?);
                let mut lowered_args = Vec::with_capacity(args.len());
                let yields_after: Vec<bool> = (0..args.len())
                    .map(|i| {
                        args[i + 1..].iter().any(|a| match a {
                            Element::Item(e) | Element::Spread(e) => expr_has_yield(e),
                        })
                    })
                    .collect();
                for (i, arg) in args.iter().enumerate() {
                    let lower_one = |l: &mut Self, e: &Expr| -> VmResult<Expr> {
                        if yields_after[i] { l.spillable(e) } else { l.linearize(e) }
                    };
                    lowered_args.push(match arg {
                        Element::Item(e) => Element::Item(lower_one(self, e)?),
                        Element::Spread(e) => Element::Spread(lower_one(self, e)?),
                    });
                }
                Ok(Expr::synth(ExprKind::Call { callee, args: lowered_args, optional: *optional }))
            }
            ExprKind::Ternary { cond, then, otherwise } => {
                // branch arms may suspend: lower as control flow
                let cond = self.linearize(cond)?;
                let out = self.temp();
                let skip_then = self.emit(Step::JumpIfFalse { cond, target: usize::MAX });
                let then = self.linearize(then)?;
                self.emit(Step::Eval { expr: then, store: Some(out.clone()) });
                let skip_else = self.emit_jump_placeholder();
                let else_start = self.here();
                self.patch_jump(skip_then, else_start);
                let otherwise = self.linearize(otherwise)?;
                self.emit(Step::Eval { expr: otherwise, store: Some(out.clone()) });
                let end = self.here();
                self.patch_jump(skip_else, end);
                Ok(Expr::var(out))
            }
            ExprKind::Logical { op, left, right } => {
                // short-circuit with a possibly-suspending right side
                let left = self.linearize(left)?;
                let out = self.temp();
                self.emit(Step::Eval { expr: left, store: Some(out.clone()) });
                let cond = match op {
                    tern_ast::LogicalOp::And => Expr::var(out.clone()),
                    tern_ast::LogicalOp::Or => Expr::unary(tern_ast::UnaryOp::Not, Expr::var(out.clone())),
                };
                let skip = self.emit(Step::JumpIfFalse { cond, target: usize::MAX });
                let right = self.linearize(right)?;
                self.emit(Step::Eval { expr: right, store: Some(out.clone()) });
                let end = self.here();
                self.patch_jump(skip, end);
                Ok(Expr::var(out))
            }
            ExprKind::NullishCoalescing { left, right } => {
                let left = self.linearize(left)?;
                let out = self.temp();
                self.emit(Step::Eval { expr: left, store: Some(out.clone()) });
                let cond = Expr::binary(tern_ast::BinaryOp::EqEq, Expr::var(out.clone()), Expr::null());
                let take_right = self.emit(Step::JumpIfFalse { cond, target: usize::MAX });
                // nullish: evaluate the right side
                let right = self.linearize(right)?;
                self.emit(Step::Eval { expr: right, store: Some(out.clone()) });
                let end = self.here();
                self.patch_jump(take_right, end);
                Ok(Expr::var(out))
            }
            ExprKind::TemplateLiteral(parts) => {
                let mut lowered = Vec::with_capacity(parts.len());
                let yields_after: Vec<bool> = (0..parts.len())
                    .map(|i| {
                        parts[i + 1..].iter().any(|p| match p {
                            TemplatePart::Str(_) => false,
                            TemplatePart::Expr(e) => expr_has_yield(e),
                        })
                    })
                    .collect();
                for (i, part) in parts.iter().enumerate() {
                    lowered.push(match part {
                        TemplatePart::Str(s) => TemplatePart::Str(s.clone()),
                        TemplatePart::Expr(e) => TemplatePart::Expr(if yields_after[i] {
                            self.spillable(e)?
                        } else {
                            self.linearize(e)?
                        }),
                    });
                }
                Ok(Expr::synth(ExprKind::TemplateLiteral(lowered)))
            }
            ExprKind::ArrayLiteral(elements) => {
                let lowered = self.linearize_elements(elements)?;
                Ok(Expr::synth(ExprKind::ArrayLiteral(lowered)))
            }
            ExprKind::ObjectLiteral(props) => {
                let yields_after: Vec<bool> = (0..props.len())
                    .map(|i| {
                        props[i + 1..].iter().any(|p| match p {
                            ObjectProp::Keyed { value, .. } => expr_has_yield(value),
                            ObjectProp::Computed { key, value } => expr_has_yield(key) || expr_has_yield(value),
                            ObjectProp::Shorthand(_) => false,
                            ObjectProp::Spread(e) => expr_has_yield(e),
                        })
                    })
                    .collect();
                let mut lowered = Vec::with_capacity(props.len());
                for (i, prop) in props.iter().enumerate() {
                    let lower_one = |l: &mut Self, e: &Expr| -> VmResult<Expr> {
                        if yields_after[i] { l.spillable(e) } else { l.linearize(e) }
                    };
                    lowered.push(match prop {
                        ObjectProp::Keyed { key, value } => {
                            ObjectProp::Keyed { key: key.clone(), value: lower_one(self, value)? }
                        }
                        ObjectProp::Computed { key, value } => ObjectProp::Computed {
                            key: lower_one(self, key)?,
                            value: lower_one(self, value)?,
                        },
                        ObjectProp::Shorthand(name) => ObjectProp::Shorthand(name.clone()),
                        ObjectProp::Spread(e) => ObjectProp::Spread(lower_one(self, e)?),
                    });
                }
                Ok(Expr::synth(ExprKind::ObjectLiteral(lowered)))
            }
            ExprKind::Unary { op, operand } => {
                Ok(Expr::synth(ExprKind::Unary { op: *op, operand: Box::new(self.linearize(operand)?) }))
            }
            ExprKind::Await(inner) => {
                Ok(Expr::synth(ExprKind::Await(Box::new(self.linearize(inner)?))))
            }
            ExprKind::TypeAssertion(inner) => self.linearize(inner),
            ExprKind::Satisfies(inner) => self.linearize(inner),
            ExprKind::NonNullAssertion(inner) => self.linearize(inner),
            ExprKind::Get { object, name, optional } => Ok(Expr::synth(ExprKind::Get {
                object: Box::new(self.linearize(object)?),
                name: name.clone(),
                optional: *optional,
            })),
            ExprKind::GetIndex { object, index, optional } => {
                let object = self.spill_before(object, index)?;
                Ok(Expr::synth(ExprKind::GetIndex {
                    object: Box::new(object),
                    index: Box::new(self.linearize(index)?),
                    optional: *optional,
                }))
            }
            ExprKind::Set { object, name, op, value } => {
                let object = self.spill_before(object, value)?;
                Ok(Expr::synth(ExprKind::Set {
                    object: Box::new(object),
                    name: name.clone(),
                    op: *op,
                    value: Box::new(self.linearize(value)?),
                }))
            }
            ExprKind::SetIndex { object, index, op, value } => {
                let later_yields = expr_has_yield(index) || expr_has_yield(value);
                let object =
                    if later_yields { self.spillable(object)? } else { self.linearize(object)? };
                let index = self.spill_before(index, value)?;
                Ok(Expr::synth(ExprKind::SetIndex {
                    object: Box::new(object),
                    index: Box::new(index),
                    op: *op,
                    value: Box::new(self.linearize(value)?),
                }))
            }
            other => Err(VmError::internal(format!(
                "yield in an unsupported expression position: {other:?}"
            ))),
        }
    }

    fn linearize_elements(&mut self, elements: &[Element]) -> VmResult<Vec<Element>> {
        let yields_after: Vec<bool> = (0..elements.len())
            .map(|i| {
                elements[i + 1..].iter().any(|a| match a {
                    Element::Item(e) | Element::Spread(e) => expr_has_yield(e),
                })
            })
            .collect();
        let mut lowered = Vec::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            let lower_one = |l: &mut Self, e: &Expr| -> VmResult<Expr> {
                if yields_after[i] { l.spillable(e) } else { l.linearize(e) }
            };
            lowered.push(match element {
                Element::Item(e) => Element::Item(lower_one(self, e)?),
                Element::Spread(e) => Element::Spread(lower_one(self, e)?),
            });
        }
        Ok(lowered)
    }

    /// Lower `left`, spilling its value to a slot when `right` contains a
    /// suspension that would otherwise run before `left`'s use.
    fn spill_before(&mut self, left: &Expr, right: &Expr) -> VmResult<Expr> {
        if expr_has_yield(right) { self.spillable(left) } else { self.linearize(left) }
    }

    /// Lower an expression and pin its value in a hoist slot, so later
    /// suspensions cannot reorder its evaluation.
    fn spillable(&mut self, expr: &Expr) -> VmResult<Expr> {
        let lowered = self.linearize(expr)?;
        let slot = self.temp();
        self.emit(Step::Eval { expr: lowered, store: Some(slot.clone()) });
        Ok(Expr::var(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yield_stmt(n: f64) -> Stmt {
        Stmt::Expression(Expr::yield_(Some(Expr::number(n))))
    }

    #[test]
    fn statements_without_yield_stay_whole() {
        let body = vec![
            Stmt::let_("x", Expr::number(1.0)),
            yield_stmt(1.0),
            Stmt::let_("y", Expr::number(2.0)),
        ];
        let program = Lowering::lower_body(&body).unwrap();
        assert!(matches!(program.steps[0], Step::Exec(_)));
        assert!(program.steps.iter().any(|s| matches!(s, Step::Yield { .. })));
        assert!(matches!(program.steps.last(), Some(Step::Exec(_))));
    }

    #[test]
    fn loops_with_yields_lower_to_jumps() {
        let body = vec![Stmt::While {
            cond: Expr::boolean(true),
            body: Box::new(yield_stmt(1.0)),
        }];
        let program = Lowering::lower_body(&body).unwrap();
        assert!(program.steps.iter().any(|s| matches!(s, Step::PushLoop { .. })));
        assert!(program.steps.iter().any(|s| matches!(s, Step::Jump(_))));
        assert!(program.steps.iter().any(|s| matches!(s, Step::PopLoop)));
    }

    #[test]
    fn yield_in_expression_position_spills_through_a_slot() {
        // let x = (yield 1) + 2;
        let body = vec![Stmt::let_(
            "x",
            Expr::binary(tern_ast::BinaryOp::Add, Expr::yield_(None), Expr::number(2.0)),
        )];
        let program = Lowering::lower_body(&body).unwrap();
        let yield_pos = program.steps.iter().position(|s| matches!(s, Step::Yield { .. })).unwrap();
        let decl_pos = program.steps.iter().position(|s| matches!(s, Step::Exec(Stmt::VarDecl { .. }))).unwrap();
        assert!(yield_pos < decl_pos);
    }

    #[test]
    fn delegation_opens_an_iterator_slot() {
        let body = vec![Stmt::Expression(Expr::yield_from(Expr::array(vec![Expr::number(1.0)])))];
        let program = Lowering::lower_body(&body).unwrap();
        assert!(program.steps.iter().any(|s| matches!(s, Step::IterOpen { .. })));
        assert!(program.steps.iter().any(|s| matches!(s, Step::Delegate { .. })));
    }

    #[test]
    fn yield_inside_finally_is_rejected() {
        let body = vec![Stmt::TryCatch {
            try_block: vec![],
            catch: None,
            finally: Some(vec![yield_stmt(1.0)]),
        }];
        assert!(Lowering::lower_body(&body).is_err());
    }
}
