//! Class-body evaluation: method tables, field descriptors, static members
//! and decorator application.

use std::rc::Rc;

use tern_ast::decl::{ClassDecl, ClassMember, MethodKind};
use tern_ast::Expr;

use crate::env::Env;
use crate::error::{VmError, VmResult};
use crate::function::{FieldDescriptor, Function, JsClass};
use crate::value::{HeapRef, Value};

use super::{Completion, EvalContext, Interpreter};

impl Interpreter {
    /// Evaluate a class declaration into a class object.
    ///
    /// Static fields and static blocks run interleaved in declaration order
    /// with `this` bound to the class; the class name itself is visible as a
    /// local while they run. Decorators apply field → accessor → method →
    /// class, inside-out for stacked ones.
    pub fn eval_class(&mut self, cx: &dyn EvalContext, env: &Env, decl: &ClassDecl) -> VmResult<Rc<JsClass>> {
        let superclass = match &decl.superclass {
            Some(e) => match self.eval_expr(cx, env, e)? {
                Value::Ref(HeapRef::Class(c)) => Some(c),
                other => {
                    return Err(VmError::type_error(format!(
                        "Class extends value {} is not a constructor",
                        other.to_display_string()
                    )));
                }
            },
            None => None,
        };

        // the class body closes over a scope where the class name resolves
        let class_scope = env.child();
        let class = Rc::new(JsClass::new(decl, superclass, class_scope.clone()));
        let class_value = Value::Ref(HeapRef::Class(class.clone()));
        class_scope.define(decl.name.clone(), class_value.clone());
        class_scope.mark_read_only(&decl.name);

        // stamp the brand every private-access node in this body shares
        decl.brand.set(class.id);

        // pass 1: install methods so static blocks can call them
        for member in &decl.members {
            if let ClassMember::Method { name, func, kind, is_static, is_private, .. } = member {
                let f = Rc::new(Function::new(func.clone(), class_scope.clone()));
                *f.home_class.borrow_mut() = Some(class.clone());
                match (is_private, is_static, kind) {
                    (true, _, _) => class.private_methods.borrow_mut().insert(name.clone(), f),
                    (false, true, _) => class.static_methods.borrow_mut().insert(name.clone(), f),
                    (false, false, MethodKind::Getter) => class.getters.borrow_mut().insert(name.clone(), f),
                    (false, false, MethodKind::Setter) => class.setters.borrow_mut().insert(name.clone(), f),
                    (false, false, MethodKind::Method) => class.methods.borrow_mut().insert(name.clone(), f),
                };
            }
        }

        // pass 2: statics and static blocks in declaration order, instance
        // field descriptors collected for replay on `new`
        for member in &decl.members {
            match member {
                ClassMember::Field { name, init, is_static: true, .. } => {
                    let scope = class_scope.child();
                    scope.define("this", class_value.clone());
                    let value = match init {
                        Some(e) => self.eval_expr(cx, &scope, e)?,
                        None => Value::Undefined,
                    };
                    class.statics.borrow_mut().insert(name.clone(), value);
                }
                ClassMember::Field { name, init, is_static: false, is_private, .. } => {
                    class.fields.borrow_mut().push(FieldDescriptor {
                        name: name.clone(),
                        init: init.clone(),
                        is_private: *is_private,
                        transforms: Vec::new(),
                    });
                }
                ClassMember::AutoAccessor { name, init, is_static, .. } => {
                    // the accessor pair reads/writes a plain backing field
                    if *is_static {
                        let scope = class_scope.child();
                        scope.define("this", class_value.clone());
                        let value = match init {
                            Some(e) => self.eval_expr(cx, &scope, e)?,
                            None => Value::Undefined,
                        };
                        class.statics.borrow_mut().insert(name.clone(), value);
                    } else {
                        class.fields.borrow_mut().push(FieldDescriptor {
                            name: name.clone(),
                            init: init.clone(),
                            is_private: false,
                            transforms: Vec::new(),
                        });
                    }
                }
                ClassMember::StaticBlock(body) => {
                    let scope = class_scope.child();
                    scope.define("this", class_value.clone());
                    match self.run_scoped(cx, &scope, body)? {
                        Completion::Normal => {}
                        _ => return Err(VmError::syntax_error("illegal abrupt completion in static block")),
                    }
                }
                ClassMember::Method { .. } => {}
            }
        }

        self.apply_member_decorators(cx, env, decl, &class)?;
        Ok(class)
    }

    /// Decorator application in documented order. Method decorators may
    /// replace the method with the callable they return; field decorators
    /// returning a callable become initializer transformers; class
    /// decorators are applied by the caller via [`apply_class_decorators`].
    ///
    /// [`apply_class_decorators`]: Interpreter::apply_class_decorators
    fn apply_member_decorators(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        decl: &ClassDecl,
        class: &Rc<JsClass>,
    ) -> VmResult<()> {
        // fields
        for member in &decl.members {
            if let ClassMember::Field { name, decorators, is_static: false, .. } = member
                && !decorators.is_empty()
            {
                self.decorate_field(cx, env, class, name, decorators)?;
            }
        }
        // accessors
        for member in &decl.members {
            if let ClassMember::AutoAccessor { name, decorators, is_static: false, .. } = member
                && !decorators.is_empty()
            {
                self.decorate_field(cx, env, class, name, decorators)?;
            }
        }
        // methods
        for member in &decl.members {
            if let ClassMember::Method { name, decorators, is_static, is_private: false, kind: MethodKind::Method, .. } =
                member
            {
                // stacked decorators apply inside-out
                for decorator in decorators.iter().rev() {
                    let dec = self.eval_expr(cx, env, decorator)?;
                    let table = if *is_static { &class.static_methods } else { &class.methods };
                    let current = table.borrow().get(name).cloned();
                    if let Some(current) = current {
                        let replaced =
                            self.call_value(cx, &dec, Value::Undefined, vec![Value::function(current.clone())])?;
                        if let Value::Ref(HeapRef::Function(f)) = replaced {
                            *f.home_class.borrow_mut() = Some(class.clone());
                            table.borrow_mut().insert(name.clone(), f);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// A field decorator that returns a callable becomes an initializer
    /// transformer: it receives the initial value on each construction.
    fn decorate_field(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        class: &Rc<JsClass>,
        name: &str,
        decorators: &[Expr],
    ) -> VmResult<()> {
        for decorator in decorators.iter().rev() {
            let dec = self.eval_expr(cx, env, decorator)?;
            let transformer = self.call_value(cx, &dec, Value::Undefined, vec![Value::Undefined])?;
            if transformer.is_callable() {
                let mut fields = class.fields.borrow_mut();
                if let Some(descriptor) = fields.iter_mut().find(|f| f.name == name) {
                    descriptor.transforms.push(transformer);
                }
            }
        }
        Ok(())
    }

    /// `class` decorators, applied after evaluation (outermost last in
    /// source, so innermost-first here). A callable return value replaces
    /// the class binding.
    pub fn apply_class_decorators(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        decl: &ClassDecl,
        class_value: Value,
    ) -> VmResult<Value> {
        let mut current = class_value;
        for decorator in decl.decorators.iter().rev() {
            let dec = self.eval_expr(cx, env, decorator)?;
            let replaced = self.call_value(cx, &dec, Value::Undefined, vec![current.clone()])?;
            if replaced.is_callable() {
                current = replaced;
            }
        }
        Ok(current)
    }
}

