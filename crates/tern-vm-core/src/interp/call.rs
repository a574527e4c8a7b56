//! Call machinery: invoking functions, built-ins and constructors.

use std::rc::Rc;

use tern_ast::decl::FnKind;
use tern_ast::Stmt;

use crate::env::Env;
use crate::error::{VmError, VmResult};
use crate::function::{Function, Instance, JsClass};
use crate::promise::JsPromise;
use crate::value::{HeapRef, Value};

use super::{AsyncCx, Completion, EvalContext, Interpreter, SyncCx};

impl Interpreter {
    /// Invoke any callable value.
    pub fn call_value(&mut self, cx: &dyn EvalContext, callee: &Value, this: Value, args: Vec<Value>) -> VmResult<Value> {
        match callee {
            Value::Ref(HeapRef::Function(f)) => self.call_function(&f.clone(), this, args),
            Value::Ref(HeapRef::Native(n)) => {
                let n = n.clone();
                self.push_frame(&n.name)?;
                let result = (n.func.clone())(self, &this, &args);
                self.pop_frame();
                result
            }
            Value::Ref(HeapRef::Bound(b)) => {
                let b = b.clone();
                b.method.check_arity(args.len())?;
                self.push_frame(b.method.name)?;
                let result = b.method.call(self, cx, &b.receiver, &args);
                self.pop_frame();
                result
            }
            Value::Ref(HeapRef::Class(c)) => {
                Err(VmError::type_error(format!("Class constructor {} cannot be invoked without 'new'", c.name)))
            }
            other => Err(VmError::type_error(format!("{} is not a function", other.to_display_string()))),
        }
    }

    /// Invoke a user function. The body's own kind decides the evaluation
    /// context: sync bodies run in the sync context no matter where the call
    /// came from.
    pub fn call_function(&mut self, func: &Rc<Function>, this: Value, args: Vec<Value>) -> VmResult<Value> {
        match func.kind() {
            FnKind::Normal | FnKind::Arrow => {
                let env = self.function_scope(func, this, args)?;
                self.run_function_body(&SyncCx, func, &env)
            }
            FnKind::Async => {
                // An async body runs eagerly under the async context; its
                // outcome settles the promise the caller sees. The raw return
                // value is wrapped exactly once — adoption in
                // `fulfill_promise` collapses a returned promise.
                let promise = JsPromise::new();
                let env = self.function_scope(func, this, args)?;
                match self.run_function_body(&AsyncCx, func, &env) {
                    Ok(v) => self.fulfill_promise(&promise, v),
                    Err(e) => {
                        let reason = self.error_value(&e);
                        self.reject_promise(&promise, reason);
                    }
                }
                Ok(Value::promise(promise))
            }
            FnKind::Generator | FnKind::AsyncGenerator => {
                let env = self.function_scope(func, this, args)?;
                let generator = crate::generator::GeneratorObject::create(func.clone(), env);
                Ok(Value::Ref(HeapRef::Generator(generator)))
            }
        }
    }

    /// Build the call scope: child of the closure, `this` bound for
    /// non-arrows, parameters bound by the binder.
    fn function_scope(&mut self, func: &Rc<Function>, this: Value, args: Vec<Value>) -> VmResult<Env> {
        let env = func.closure.child();
        if !func.is_arrow {
            env.define("this", this);
        }
        self.bind_params(&SyncCx, &env, &func.decl.params, args)?;
        Ok(env)
    }

    /// Execute a function body to completion under `cx`, tracking the frame
    /// and the current function (for `super`).
    pub(super) fn run_function_body(&mut self, cx: &dyn EvalContext, func: &Rc<Function>, env: &Env) -> VmResult<Value> {
        let name = func.name().unwrap_or_else(|| "<anonymous>".to_string());
        self.push_frame(&name)?;
        let saved = self.current_function.replace(func.clone());
        let result = self.run_statements(cx, env, &func.decl.body);
        self.current_function = saved;
        self.pop_frame();
        match result? {
            Completion::Return(v) => Ok(v),
            Completion::Normal => Ok(Value::Undefined),
            Completion::Break(_) | Completion::Continue(_) => {
                Err(VmError::internal("break/continue escaped a function body"))
            }
        }
    }

    /// Run a statement list with function declarations hoisted.
    pub fn run_statements(&mut self, cx: &dyn EvalContext, env: &Env, stmts: &[Stmt]) -> VmResult<Completion> {
        self.hoist_functions(env, stmts);
        for stmt in stmts {
            match self.exec_stmt(cx, env, stmt)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    /// Pre-bind function declarations so mutual recursion works regardless
    /// of statement order.
    pub fn hoist_functions(&mut self, env: &Env, stmts: &[Stmt]) {
        for stmt in stmts {
            let decl = match stmt {
                Stmt::Function(decl) => decl,
                Stmt::Export(tern_ast::ExportDecl::Decl(inner)) => match inner.as_ref() {
                    Stmt::Function(decl) => decl,
                    _ => continue,
                },
                _ => continue,
            };
            if let Some(name) = &decl.name {
                let func = Rc::new(Function::new(decl.clone(), env.clone()));
                env.define(name.clone(), Value::function(func));
            }
        }
    }

    pub(super) fn current_function(&self) -> Option<Rc<Function>> {
        self.current_function.clone()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// `new Class(args)`: allocate, replay field initializers in declaration
    /// order (base classes first), then run the constructor.
    pub fn construct(&mut self, cx: &dyn EvalContext, class: &Rc<JsClass>, args: Vec<Value>) -> VmResult<Value> {
        let instance = Rc::new(Instance::new(class.clone()));
        let this = Value::Ref(HeapRef::Instance(instance.clone()));
        self.init_fields(cx, class, &this, &instance)?;
        if let Some(ctor) = class.find_constructor() {
            self.call_function(&ctor, this.clone(), args)?;
        }
        Ok(this)
    }

    fn init_fields(
        &mut self,
        cx: &dyn EvalContext,
        class: &Rc<JsClass>,
        this: &Value,
        instance: &Rc<Instance>,
    ) -> VmResult<()> {
        if let Some(superclass) = &class.superclass {
            self.init_fields(cx, superclass, this, instance)?;
        }
        let fields = class.fields.borrow().clone();
        for field in fields {
            let env = class.decl_env.child();
            env.define("this", this.clone());
            let mut value = match &field.init {
                Some(init) => self.eval_expr(cx, &env, init)?,
                None => Value::Undefined,
            };
            for transform in &field.transforms {
                value = self.call_value(cx, transform, Value::Undefined, vec![value])?;
            }
            if field.is_private {
                instance.privates.borrow_mut().insert((class.id, field.name.clone()), value);
            } else {
                instance.set_field(field.name.clone(), value);
            }
        }
        Ok(())
    }
}
