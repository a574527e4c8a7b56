//! Parameter binding and destructuring.
//!
//! One engine serves both: `let`/`const` destructuring, catch-clause
//! bindings, for-of bindings and the parameter prologue all funnel through
//! [`Interpreter::destructure`].

use std::rc::Rc;

use tern_ast::decl::Param;
use tern_ast::{Pattern, Stmt, VarKind};

use crate::array::JsArray;
use crate::env::Env;
use crate::error::{VmError, VmResult};
use crate::object::JsObject;
use crate::value::Value;

use super::{EvalContext, Interpreter, IterStep};

/// What a destructured name does to the target scope.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    Define,
    DefineReadOnly,
    Assign,
}

impl BindMode {
    pub fn for_var_kind(kind: VarKind) -> Self {
        match kind {
            VarKind::Const => BindMode::DefineReadOnly,
            VarKind::Var | VarKind::Let => BindMode::Define,
        }
    }
}

impl Interpreter {
    /// Bind a call's arguments into the callee scope.
    ///
    /// Required parameters fail on missing arguments; optional ones bind
    /// undefined; defaulted ones evaluate their default in the callee scope
    /// (earlier parameters are visible); rest gathers the tail into an
    /// Array.
    pub fn bind_params(&mut self, cx: &dyn EvalContext, env: &Env, params: &[Param], args: Vec<Value>) -> VmResult<()> {
        for (i, param) in params.iter().enumerate() {
            if param.rest {
                let tail: Vec<Value> = args.get(i..).map(|s| s.to_vec()).unwrap_or_default();
                let rest = Value::array(Rc::new(JsArray::from_vec(tail)));
                self.destructure(cx, env, &param.pattern, rest, BindMode::Define)?;
                return Ok(());
            }
            let supplied = args.get(i).cloned();
            let value = match supplied {
                Some(v) if !v.is_undefined() => v,
                _ => {
                    if let Some(default) = &param.default {
                        self.eval_expr(cx, env, default)?
                    } else if param.optional || supplied.is_some() {
                        Value::Undefined
                    } else {
                        return Err(VmError::type_error(format!(
                            "missing required argument {} (got {})",
                            i + 1,
                            args.len()
                        )));
                    }
                }
            };
            self.destructure(cx, env, &param.pattern, value, BindMode::Define)?;
        }
        Ok(())
    }

    /// Destructure `value` against `pattern`, binding names per `mode`.
    pub fn destructure(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        pattern: &Pattern,
        value: Value,
        mode: BindMode,
    ) -> VmResult<()> {
        match pattern {
            Pattern::Identifier(name) => self.bind_name(env, name, value, mode),
            Pattern::Array { elements, rest } => {
                let mut source = self.make_iterator(cx, &value)?;
                for element in elements {
                    let next = match self.iter_next(cx, &mut source, Value::Undefined)? {
                        IterStep::Value(v) => v,
                        IterStep::Done(_) => Value::Undefined,
                    };
                    let Some(element) = element else { continue };
                    let bound = if next.is_undefined()
                        && let Some(default) = &element.default
                    {
                        self.eval_expr(cx, env, default)?
                    } else {
                        next
                    };
                    self.destructure(cx, env, &element.binding, bound, mode)?;
                }
                if let Some(rest_name) = rest {
                    let mut tail = Vec::new();
                    loop {
                        match self.iter_next(cx, &mut source, Value::Undefined)? {
                            IterStep::Value(v) => tail.push(v),
                            IterStep::Done(_) => break,
                        }
                    }
                    let rest_value = Value::array(Rc::new(JsArray::from_vec(tail)));
                    self.bind_name(env, rest_name, rest_value, mode)?;
                }
                Ok(())
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(VmError::type_error(format!(
                        "Cannot destructure '{}' as it is {}",
                        "object pattern",
                        value.to_display_string()
                    )));
                }
                for prop in props {
                    let picked = self.get_index_value(cx, &value, &Value::string(&prop.key))?;
                    let bound = if picked.is_undefined()
                        && let Some(default) = &prop.default
                    {
                        self.eval_expr(cx, env, default)?
                    } else {
                        picked
                    };
                    self.destructure(cx, env, &prop.binding, bound, mode)?;
                }
                if let Some(rest_name) = rest {
                    let matched: Vec<&str> = props.iter().map(|p| p.key.as_str()).collect();
                    let rest_obj = JsObject::new();
                    for key in super::member::own_enumerable_keys(&value) {
                        if !matched.contains(&key.as_str()) {
                            let v = self.get_index_value(cx, &value, &Value::string(&key))?;
                            rest_obj.set(key, v);
                        }
                    }
                    self.bind_name(env, rest_name, Value::object(Rc::new(rest_obj)), mode)?;
                }
                Ok(())
            }
        }
    }

    fn bind_name(&mut self, env: &Env, name: &str, value: Value, mode: BindMode) -> VmResult<()> {
        match mode {
            BindMode::Define => {
                env.define(name, value);
                Ok(())
            }
            BindMode::DefineReadOnly => {
                env.define(name, value);
                env.mark_read_only(name);
                Ok(())
            }
            BindMode::Assign => env.assign(name, value),
        }
    }

    /// Names a declaration statement introduces, for `export <decl>`.
    pub fn declared_names(stmt: &Stmt) -> Vec<String> {
        match stmt {
            Stmt::VarDecl { declarations, .. } => {
                let mut names = Vec::new();
                for declarator in declarations {
                    declarator.target.bound_names(&mut names);
                }
                names
            }
            Stmt::Function(decl) => decl.name.clone().into_iter().collect(),
            Stmt::Class(decl) => vec![decl.name.clone()],
            Stmt::Enum(decl) => vec![decl.name.clone()],
            Stmt::Namespace { name, .. } => vec![name.clone()],
            _ => Vec::new(),
        }
    }
}

