//! Statement handlers: one arm per `Stmt` variant, exhaustively matched.
//!
//! Every handler returns `VmResult<Completion>`; loops, switches and
//! try/catch/finally inspect the completion tag, thrown values ride the
//! `Err` arm.

use std::rc::Rc;

use tern_ast::{CatchClause, EnumDecl, ExportDecl, Expr, Pattern, Stmt, SwitchCase};

use crate::env::Env;
use crate::error::{VmError, VmResult};
use crate::function::{Function, NamespaceObj};
use crate::object::JsObject;
use crate::value::{number_to_string, HeapRef, Value};

use super::{BindMode, Completion, EvalContext, Interpreter, IterStep, ModuleRecord};

impl Interpreter {
    /// Execute a statement.
    pub fn exec_stmt(&mut self, cx: &dyn EvalContext, env: &Env, stmt: &Stmt) -> VmResult<Completion> {
        match stmt {
            Stmt::Expression(e) => {
                self.eval_expr(cx, env, e)?;
                Ok(Completion::Normal)
            }
            Stmt::VarDecl { kind, declarations } => {
                let mode = BindMode::for_var_kind(*kind);
                for declarator in declarations {
                    let value = match &declarator.init {
                        Some(init) => self.eval_expr(cx, env, init)?,
                        None => Value::Undefined,
                    };
                    self.destructure(cx, env, &declarator.target, value, mode)?;
                }
                Ok(Completion::Normal)
            }
            Stmt::Block(stmts) => {
                let scope = env.child();
                self.run_scoped(cx, &scope, stmts)
            }
            Stmt::Sequence(stmts) => {
                for s in stmts {
                    match self.exec_stmt(cx, env, s)? {
                        Completion::Normal => {}
                        abrupt => return Ok(abrupt),
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::If { cond, then, otherwise } => {
                if self.eval_expr(cx, env, cond)?.is_truthy() {
                    self.exec_stmt(cx, env, then)
                } else if let Some(otherwise) = otherwise {
                    self.exec_stmt(cx, env, otherwise)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Stmt::While { cond, body } => self.exec_while(cx, env, None, cond, body),
            Stmt::DoWhile { body, cond } => self.exec_do_while(cx, env, None, body, cond),
            Stmt::For { init, cond, increment, body } => {
                self.exec_for(cx, env, None, init.as_deref(), cond.as_ref(), increment.as_ref(), body)
            }
            Stmt::ForOf { binding, iterable, body, is_await } => {
                self.exec_for_of(cx, env, None, binding, iterable, body, *is_await)
            }
            Stmt::ForIn { binding, object, body } => self.exec_for_in(cx, env, None, binding, object, body),
            Stmt::Return(value) => {
                let v = match value {
                    Some(e) => self.eval_expr(cx, env, e)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(v))
            }
            Stmt::Break(label) => Ok(Completion::Break(label.clone())),
            Stmt::Continue(label) => Ok(Completion::Continue(label.clone())),
            Stmt::Throw(e) => {
                let value = self.eval_expr(cx, env, e)?;
                Err(VmError::thrown(value, self.stack_snapshot()))
            }
            Stmt::TryCatch { try_block, catch, finally } => {
                self.exec_try(cx, env, try_block, catch.as_ref(), finally.as_deref())
            }
            Stmt::Switch { discriminant, cases } => self.exec_switch(cx, env, None, discriminant, cases),
            Stmt::Labeled { label, body } => self.exec_labeled(cx, env, label, body),
            Stmt::Function(decl) => {
                if let Some(name) = &decl.name {
                    let func = Rc::new(Function::new(decl.clone(), env.clone()));
                    env.define(name.clone(), Value::function(func));
                }
                Ok(Completion::Normal)
            }
            Stmt::Class(decl) => {
                let class = self.eval_class(cx, env, decl)?;
                let value = self.apply_class_decorators(cx, env, decl, Value::Ref(HeapRef::Class(class)))?;
                env.define(decl.name.clone(), value);
                Ok(Completion::Normal)
            }
            Stmt::Enum(decl) => {
                let value = self.eval_enum(cx, env, decl)?;
                env.define(decl.name.clone(), value);
                Ok(Completion::Normal)
            }
            Stmt::Namespace { name, body } => self.exec_namespace(cx, env, name, body),
            Stmt::Export(decl) => self.exec_export(cx, env, decl),
            // Imports are pre-bound by the linker before the body runs.
            Stmt::Import(_) | Stmt::ImportRequire { .. } => Ok(Completion::Normal),
            Stmt::Directive(text) => {
                if text == "use strict" {
                    env.set_strict(true);
                }
                Ok(Completion::Normal)
            }
            Stmt::Using { name, init, is_await } => {
                let value = self.eval_expr(cx, env, init)?;
                env.define(name.clone(), value.clone());
                env.mark_read_only(name);
                if let Some(frame) = self.using_stack.last_mut() {
                    frame.push((value, *is_await));
                }
                Ok(Completion::Normal)
            }
            Stmt::TypeOnly => Ok(Completion::Normal),
        }
    }

    /// Run a statement list in `scope` with a fresh `using` frame; disposes
    /// registered resources in reverse order on every exit path.
    pub fn run_scoped(&mut self, cx: &dyn EvalContext, scope: &Env, stmts: &[Stmt]) -> VmResult<Completion> {
        self.using_stack.push(Vec::new());
        let result = self.run_statements(cx, scope, stmts);
        let resources = self.using_stack.pop().unwrap_or_default();
        let dispose_result = self.dispose_resources(cx, resources);
        match (result, dispose_result) {
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
            (Ok(completion), Ok(())) => Ok(completion),
        }
    }

    fn dispose_resources(&mut self, cx: &dyn EvalContext, resources: Vec<(Value, bool)>) -> VmResult<()> {
        for (resource, is_await) in resources.into_iter().rev() {
            if resource.is_nullish() {
                continue;
            }
            let mut dispose = self.get_member(cx, &resource, "dispose", None).unwrap_or(Value::Undefined);
            if !dispose.is_callable() {
                dispose = self.get_member(cx, &resource, "close", None).unwrap_or(Value::Undefined);
            }
            if dispose.is_callable() {
                let outcome = self.call_value(cx, &dispose, resource, Vec::new())?;
                if is_await {
                    cx.resolve(self, outcome)?;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Loops
    // ------------------------------------------------------------------

    /// Consume a loop body completion: `Ok(false)` = keep looping,
    /// `Ok(true)` = break out, `Err` = propagate upward.
    fn loop_completion(completion: Completion, label: Option<&str>) -> Result<bool, Completion> {
        match completion {
            Completion::Normal => Ok(false),
            Completion::Continue(None) => Ok(false),
            Completion::Continue(Some(l)) if Some(l.as_str()) == label => Ok(false),
            Completion::Break(None) => Ok(true),
            Completion::Break(Some(l)) if Some(l.as_str()) == label => Ok(true),
            other => Err(other),
        }
    }

    pub(super) fn exec_while(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        label: Option<&str>,
        cond: &Expr,
        body: &Stmt,
    ) -> VmResult<Completion> {
        while self.eval_expr(cx, env, cond)?.is_truthy() {
            match Self::loop_completion(self.exec_stmt(cx, env, body)?, label) {
                Ok(false) => {}
                Ok(true) => break,
                Err(abrupt) => return Ok(abrupt),
            }
            self.drain_scheduled()?;
        }
        Ok(Completion::Normal)
    }

    pub(super) fn exec_do_while(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        label: Option<&str>,
        body: &Stmt,
        cond: &Expr,
    ) -> VmResult<Completion> {
        loop {
            match Self::loop_completion(self.exec_stmt(cx, env, body)?, label) {
                Ok(false) => {}
                Ok(true) => break,
                Err(abrupt) => return Ok(abrupt),
            }
            if !self.eval_expr(cx, env, cond)?.is_truthy() {
                break;
            }
            self.drain_scheduled()?;
        }
        Ok(Completion::Normal)
    }

    /// `for(init; cond; incr)`. The initializer runs once in a fresh scope
    /// that also holds the loop variable; the increment still runs after a
    /// `continue`; due timers drain between iterations.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn exec_for(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        label: Option<&str>,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        increment: Option<&Expr>,
        body: &Stmt,
    ) -> VmResult<Completion> {
        let scope = env.child();
        if let Some(init) = init {
            self.exec_stmt(cx, &scope, init)?;
        }
        loop {
            if let Some(cond) = cond
                && !self.eval_expr(cx, &scope, cond)?.is_truthy()
            {
                break;
            }
            match Self::loop_completion(self.exec_stmt(cx, &scope, body)?, label) {
                Ok(false) => {}
                Ok(true) => break,
                Err(abrupt) => return Ok(abrupt),
            }
            if let Some(increment) = increment {
                self.eval_expr(cx, &scope, increment)?;
            }
            self.drain_scheduled()?;
        }
        Ok(Completion::Normal)
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn exec_for_of(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        label: Option<&str>,
        binding: &Pattern,
        iterable: &Expr,
        body: &Stmt,
        is_await: bool,
    ) -> VmResult<Completion> {
        let source_value = self.eval_expr(cx, env, iterable)?;
        let source_value = if is_await { cx.resolve(self, source_value)? } else { source_value };
        let mut source = self.make_iterator(cx, &source_value)?;
        loop {
            let item = match self.iter_next(cx, &mut source, Value::Undefined)? {
                IterStep::Value(v) => v,
                IterStep::Done(_) => break,
            };
            let item = if is_await { cx.resolve(self, item)? } else { item };
            let scope = env.child();
            self.destructure(cx, &scope, binding, item, BindMode::Define)?;
            match Self::loop_completion(self.exec_stmt(cx, &scope, body)?, label) {
                Ok(false) => {}
                Ok(true) => {
                    self.iter_close(cx, &mut source, Value::Undefined)?;
                    break;
                }
                Err(abrupt) => {
                    self.iter_close(cx, &mut source, Value::Undefined)?;
                    return Ok(abrupt);
                }
            }
            self.drain_scheduled()?;
        }
        Ok(Completion::Normal)
    }

    pub(super) fn exec_for_in(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        label: Option<&str>,
        binding: &str,
        object: &Expr,
        body: &Stmt,
    ) -> VmResult<Completion> {
        let source = self.eval_expr(cx, env, object)?;
        let keys: Vec<String> = match &source {
            Value::Ref(HeapRef::Array(a)) => (0..a.len()).map(|i| number_to_string(i as f64)).collect(),
            other => super::member::own_enumerable_keys(other),
        };
        for key in keys {
            let scope = env.child();
            scope.define(binding, Value::string(&key));
            match Self::loop_completion(self.exec_stmt(cx, &scope, body)?, label) {
                Ok(false) => {}
                Ok(true) => break,
                Err(abrupt) => return Ok(abrupt),
            }
            self.drain_scheduled()?;
        }
        Ok(Completion::Normal)
    }

    fn exec_labeled(&mut self, cx: &dyn EvalContext, env: &Env, label: &str, body: &Stmt) -> VmResult<Completion> {
        let completion = match body {
            Stmt::While { cond, body } => self.exec_while(cx, env, Some(label), cond, body)?,
            Stmt::DoWhile { body, cond } => self.exec_do_while(cx, env, Some(label), body, cond)?,
            Stmt::For { init, cond, increment, body } => {
                self.exec_for(cx, env, Some(label), init.as_deref(), cond.as_ref(), increment.as_ref(), body)?
            }
            Stmt::ForOf { binding, iterable, body, is_await } => {
                self.exec_for_of(cx, env, Some(label), binding, iterable, body, *is_await)?
            }
            Stmt::ForIn { binding, object, body } => {
                self.exec_for_in(cx, env, Some(label), binding, object, body)?
            }
            Stmt::Switch { discriminant, cases } => self.exec_switch(cx, env, Some(label), discriminant, cases)?,
            other => self.exec_stmt(cx, env, other)?,
        };
        // a labeled break targeting this statement is consumed here
        match completion {
            Completion::Break(Some(l)) if l == label => Ok(Completion::Normal),
            other => Ok(other),
        }
    }

    // ------------------------------------------------------------------
    // try / catch / finally
    // ------------------------------------------------------------------

    fn exec_try(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        try_block: &[Stmt],
        catch: Option<&CatchClause>,
        finally: Option<&[Stmt]>,
    ) -> VmResult<Completion> {
        let try_scope = env.child();
        let mut outcome = self.run_scoped(cx, &try_scope, try_block);

        if let Err(err) = &outcome
            && let Some(clause) = catch
            && !matches!(err, VmError::Internal(_) | VmError::StackOverflow)
        {
            let thrown = self.error_value(err);
            let catch_scope = env.child();
            if let Some(param) = &clause.param {
                self.destructure(cx, &catch_scope, param, thrown, BindMode::Define)?;
            }
            outcome = self.run_scoped(cx, &catch_scope, &clause.body);
        }

        if let Some(finally_block) = finally {
            // finally runs on every exit path; awaited work inside it
            // completes (through `cx`) before the pending completion
            // continues. Its own abrupt completion or throw replaces the
            // pending one.
            let finally_scope = env.child();
            match self.run_scoped(cx, &finally_scope, finally_block)? {
                Completion::Normal => {}
                replacement => return Ok(replacement),
            }
        }
        outcome
    }

    // ------------------------------------------------------------------
    // switch
    // ------------------------------------------------------------------

    fn exec_switch(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        label: Option<&str>,
        discriminant: &Expr,
        cases: &[SwitchCase],
    ) -> VmResult<Completion> {
        let subject = self.eval_expr(cx, env, discriminant)?;
        let scope = env.child();
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let test_value = self.eval_expr(cx, &scope, test)?;
                if subject.strict_equals(&test_value) {
                    start = Some(i);
                    break;
                }
            }
        }
        let start = match start.or_else(|| cases.iter().position(|c| c.test.is_none())) {
            Some(i) => i,
            None => return Ok(Completion::Normal),
        };
        // fall through subsequent clauses until a break
        for case in &cases[start..] {
            for stmt in &case.body {
                match self.exec_stmt(cx, &scope, stmt)? {
                    Completion::Normal => {}
                    Completion::Break(None) => return Ok(Completion::Normal),
                    Completion::Break(Some(l)) if Some(l.as_str()) == label => return Ok(Completion::Normal),
                    abrupt => return Ok(abrupt),
                }
            }
        }
        Ok(Completion::Normal)
    }

    // ------------------------------------------------------------------
    // enums, namespaces, exports
    // ------------------------------------------------------------------

    /// Enums evaluate to a frozen object with forward mappings, plus
    /// reverse mappings for numeric members.
    fn eval_enum(&mut self, cx: &dyn EvalContext, env: &Env, decl: &EnumDecl) -> VmResult<Value> {
        let obj = JsObject::new();
        let mut next_auto = 0.0;
        for member in &decl.members {
            let value = match &member.init {
                Some(init) => self.eval_expr(cx, env, init)?,
                None => Value::Number(next_auto),
            };
            if let Value::Number(n) = &value {
                next_auto = n + 1.0;
                obj.set(number_to_string(*n), Value::string(&member.name));
            }
            obj.set(member.name.clone(), value);
        }
        obj.freeze();
        Ok(Value::object(Rc::new(obj)))
    }

    fn exec_namespace(&mut self, cx: &dyn EvalContext, env: &Env, name: &str, body: &[Stmt]) -> VmResult<Completion> {
        let ns = env.define_namespace(Rc::new(NamespaceObj::new(name)));
        // the body executes like a module: exported declarations become
        // namespace members
        let record = ModuleRecord::new(format!("namespace:{name}"));
        let saved = self.current_module.replace(record.clone());
        let scope = env.child();
        let result = self.run_scoped(cx, &scope, body);
        self.current_module = saved;
        result?;
        for (k, v) in record.exports.borrow().iter() {
            ns.set(k.clone(), v.clone());
        }
        Ok(Completion::Normal)
    }

    fn exec_export(&mut self, cx: &dyn EvalContext, env: &Env, decl: &ExportDecl) -> VmResult<Completion> {
        match decl {
            ExportDecl::Decl(inner) => {
                self.exec_stmt(cx, env, inner)?;
                if let Some(module) = self.current_module.clone() {
                    for name in Self::declared_names(inner) {
                        // namespaces export their merged object view
                        let value = match env.local_namespace(&name) {
                            Some(ns) => Value::Ref(HeapRef::Namespace(ns)),
                            None => env.lookup(&name)?,
                        };
                        module.set_export(name, value);
                    }
                }
                Ok(Completion::Normal)
            }
            ExportDecl::Named { specifiers, source } => {
                // re-exports from another module are bound by the linker
                if source.is_none()
                    && let Some(module) = self.current_module.clone()
                {
                    for (local, exported) in specifiers {
                        let value = env.lookup(local)?;
                        module.set_export(exported.clone(), value);
                    }
                }
                Ok(Completion::Normal)
            }
            ExportDecl::Default(e) => {
                let value = self.eval_expr(cx, env, e)?;
                if let Some(module) = &self.current_module {
                    *module.default_export.borrow_mut() = Some(value);
                }
                Ok(Completion::Normal)
            }
            ExportDecl::Star { .. } => Ok(Completion::Normal),
            ExportDecl::Assignment(e) => {
                let value = self.eval_expr(cx, env, e)?;
                if let Some(module) = &self.current_module {
                    *module.export_assignment.borrow_mut() = Some(value);
                }
                Ok(Completion::Normal)
            }
        }
    }
}
