//! Expression handlers: one arm per `ExprKind` variant, exhaustively
//! matched.

use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use tern_ast::{Arg, AssignOp, BinaryOp, Element, Expr, ExprKind, IncOp, Literal, LogicalOp, ObjectProp, TemplatePart, UnaryOp};

use crate::array::JsArray;
use crate::env::Env;
use crate::error::{VmError, VmResult};
use crate::function::Function;
use crate::object::JsObject;
use crate::promise::JsPromise;
use crate::regexp::JsRegExp;
use crate::value::{HeapRef, Value};

use super::{EvalContext, Interpreter};

impl Interpreter {
    /// Evaluate an expression. Dispatch is a single exhaustive `match` on
    /// the variant tag; adding a node kind without a handler is a compile
    /// error.
    pub fn eval_expr(&mut self, cx: &dyn EvalContext, env: &Env, expr: &Expr) -> VmResult<Value> {
        match &expr.kind {
            ExprKind::Literal(lit) => self.eval_literal(lit),
            ExprKind::TemplateLiteral(parts) => self.eval_template(cx, env, parts),
            ExprKind::TaggedTemplate { tag, cooked, raw, exprs } => {
                self.eval_tagged_template(cx, env, tag, cooked, raw, exprs)
            }
            ExprKind::RegexLiteral { pattern, flags } => {
                Ok(Value::Ref(HeapRef::RegExp(Rc::new(JsRegExp::compile(pattern, flags)?))))
            }
            ExprKind::ArrayLiteral(elements) => self.eval_array_literal(cx, env, elements),
            ExprKind::ObjectLiteral(props) => self.eval_object_literal(cx, env, props),
            ExprKind::Variable(name) => match self.resolutions.depth_of(expr.id) {
                Some(depth) => env.get_at(depth, name),
                None => env.lookup(name),
            },
            ExprKind::Assign { name, op, value } => self.eval_assign(cx, env, expr, name, *op, value),
            ExprKind::Grouping(inner) => self.eval_expr(cx, env, inner),
            ExprKind::Binary { op, left, right } => {
                let l = self.eval_expr(cx, env, left)?;
                let r = self.eval_expr(cx, env, right)?;
                self.binary_op(*op, &l, &r)
            }
            ExprKind::Logical { op, left, right } => {
                let l = self.eval_expr(cx, env, left)?;
                match op {
                    LogicalOp::And if !l.is_truthy() => Ok(l),
                    LogicalOp::Or if l.is_truthy() => Ok(l),
                    _ => self.eval_expr(cx, env, right),
                }
            }
            ExprKind::NullishCoalescing { left, right } => {
                let l = self.eval_expr(cx, env, left)?;
                if l.is_nullish() { self.eval_expr(cx, env, right) } else { Ok(l) }
            }
            ExprKind::Ternary { cond, then, otherwise } => {
                if self.eval_expr(cx, env, cond)?.is_truthy() {
                    self.eval_expr(cx, env, then)
                } else {
                    self.eval_expr(cx, env, otherwise)
                }
            }
            ExprKind::Unary { op, operand } => self.eval_unary(cx, env, *op, operand),
            ExprKind::Delete(target) => self.eval_delete(cx, env, target),
            ExprKind::Prefix { op, target } => self.eval_increment(cx, env, *op, target, true),
            ExprKind::Postfix { op, target } => self.eval_increment(cx, env, *op, target, false),
            ExprKind::Call { .. } | ExprKind::Get { .. } | ExprKind::GetIndex { .. } => {
                Ok(self.eval_chain(cx, env, expr)?.unwrap_or(Value::Undefined))
            }
            ExprKind::New { callee, args } => {
                let callee_value = self.eval_expr(cx, env, callee)?;
                let arg_values = self.eval_args(cx, env, args)?;
                match &callee_value {
                    Value::Ref(HeapRef::Class(class)) => self.construct(cx, &class.clone(), arg_values),
                    // Built-in constructors behave identically with and
                    // without `new`.
                    Value::Ref(HeapRef::Native(_)) => {
                        self.call_value(cx, &callee_value, Value::Undefined, arg_values)
                    }
                    other => Err(VmError::type_error(format!("{} is not a constructor", other.to_display_string()))),
                }
            }
            ExprKind::Set { object, name, op, value } => {
                let obj = self.eval_expr(cx, env, object)?;
                if *op == AssignOp::Assign {
                    let v = self.eval_expr(cx, env, value)?;
                    self.set_member(cx, &obj, name, v.clone())?;
                    return Ok(v);
                }
                let old = self.get_member(cx, &obj, name, self.type_map.hint_of(object.id))?;
                let new = match self.logical_shortcut(cx, env, *op, &old, value)? {
                    ShortCircuit::Keep => return Ok(old),
                    ShortCircuit::Write(v) => v,
                };
                self.set_member(cx, &obj, name, new.clone())?;
                Ok(new)
            }
            ExprKind::SetIndex { object, index, op, value } => {
                let obj = self.eval_expr(cx, env, object)?;
                let idx = self.eval_expr(cx, env, index)?;
                if *op == AssignOp::Assign {
                    let v = self.eval_expr(cx, env, value)?;
                    self.set_index_value(cx, &obj, &idx, v.clone())?;
                    return Ok(v);
                }
                let old = self.get_index_value(cx, &obj, &idx)?;
                let new = match self.logical_shortcut(cx, env, *op, &old, value)? {
                    ShortCircuit::Keep => return Ok(old),
                    ShortCircuit::Write(v) => v,
                };
                self.set_index_value(cx, &obj, &idx, new.clone())?;
                Ok(new)
            }
            ExprKind::GetPrivate { object, name, class_id } => {
                let obj = self.eval_expr(cx, env, object)?;
                self.get_private(&obj, name, class_id.get())
            }
            ExprKind::SetPrivate { object, name, op, value, class_id } => {
                let obj = self.eval_expr(cx, env, object)?;
                let brand = class_id.get();
                if *op == AssignOp::Assign {
                    let v = self.eval_expr(cx, env, value)?;
                    self.set_private(&obj, name, brand, v.clone())?;
                    return Ok(v);
                }
                let old = self.get_private(&obj, name, brand)?;
                let new = match self.logical_shortcut(cx, env, *op, &old, value)? {
                    ShortCircuit::Keep => return Ok(old),
                    ShortCircuit::Write(v) => v,
                };
                self.set_private(&obj, name, brand, new.clone())?;
                Ok(new)
            }
            ExprKind::CallPrivate { object, name, args, class_id } => {
                let obj = self.eval_expr(cx, env, object)?;
                let func = self.get_private(&obj, name, class_id.get())?;
                let arg_values = self.eval_args(cx, env, args)?;
                self.call_value(cx, &func, obj, arg_values)
            }
            ExprKind::This => Ok(env.lookup("this").unwrap_or(Value::Undefined)),
            ExprKind::Super { member } => {
                let (_this, func) = self.resolve_super(env, member.as_deref())?;
                Ok(func)
            }
            ExprKind::ArrowFunction(decl) => {
                Ok(Value::function(Rc::new(Function::arrow(decl.clone(), env.clone()))))
            }
            ExprKind::FunctionExpr(decl) => {
                // A named function expression sees its own name as a
                // read-only binding inside the body.
                let scope = match &decl.name {
                    Some(_) => env.child(),
                    None => env.clone(),
                };
                let func = Rc::new(Function::new(decl.clone(), scope.clone()));
                if let Some(name) = &decl.name {
                    scope.define(name.clone(), Value::function(func.clone()));
                    scope.mark_read_only(name);
                }
                Ok(Value::function(func))
            }
            ExprKind::ClassExpr(decl) => {
                let class = self.eval_class(cx, env, decl)?;
                self.apply_class_decorators(cx, env, decl, Value::Ref(HeapRef::Class(class)))
            }
            ExprKind::Spread(_) => Err(VmError::internal("spread outside call/array/object context")),
            ExprKind::TypeAssertion(inner)
            | ExprKind::Satisfies(inner)
            | ExprKind::NonNullAssertion(inner) => self.eval_expr(cx, env, inner),
            ExprKind::Await(inner) => {
                let value = self.eval_expr(cx, env, inner)?;
                cx.resolve(self, value)
            }
            ExprKind::Yield { .. } => {
                Err(VmError::internal("yield reached the plain evaluator outside a generator body"))
            }
            ExprKind::DynamicImport(specifier) => {
                let spec = self.eval_expr(cx, env, specifier)?.to_display_string();
                let from = self.current_module.as_ref().map(|m| m.path.clone()).unwrap_or_default();
                match self.module_host.clone() {
                    Some(host) => match host.dynamic_import(&spec, &from) {
                        Ok(ns) => Ok(Value::promise(JsPromise::fulfilled_with(ns))),
                        Err(e) => {
                            let reason = self.error_value(&e);
                            Ok(Value::promise(JsPromise::rejected_with(reason)))
                        }
                    },
                    None => Ok(Value::promise(JsPromise::rejected_with(
                        self.make_error(crate::error::ErrorKind::Error, format!("Cannot resolve module '{spec}'")),
                    ))),
                }
            }
            ExprKind::ImportMeta => {
                let meta = JsObject::new();
                if let Some(module) = &self.current_module {
                    meta.set("url", Value::string(&module.path));
                }
                Ok(Value::object(Rc::new(meta)))
            }
        }
    }

    fn eval_literal(&mut self, lit: &Literal) -> VmResult<Value> {
        Ok(match lit {
            Literal::Undefined => Value::Undefined,
            Literal::Null => Value::Null,
            Literal::Boolean(b) => Value::Boolean(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::string(s),
            Literal::BigInt(digits) => {
                let parsed = digits
                    .parse::<BigInt>()
                    .map_err(|_| VmError::syntax_error(format!("invalid BigInt literal: {digits}")))?;
                Value::BigInt(Rc::new(parsed))
            }
        })
    }

    // ------------------------------------------------------------------
    // Optional chaining
    // ------------------------------------------------------------------

    /// Evaluate a member/call chain. `None` means an optional link saw a
    /// nullish base and the whole chain short-circuits to undefined without
    /// evaluating anything further along it.
    fn eval_chain(&mut self, cx: &dyn EvalContext, env: &Env, expr: &Expr) -> VmResult<Option<Value>> {
        match &expr.kind {
            ExprKind::Get { object, name, optional } => {
                let Some(base) = self.eval_chain(cx, env, object)? else { return Ok(None) };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let hint = self.type_map.hint_of(object.id);
                Ok(Some(self.get_member(cx, &base, name, hint)?))
            }
            ExprKind::GetIndex { object, index, optional } => {
                let Some(base) = self.eval_chain(cx, env, object)? else { return Ok(None) };
                if *optional && base.is_nullish() {
                    return Ok(None);
                }
                let idx = self.eval_expr(cx, env, index)?;
                Ok(Some(self.get_index_value(cx, &base, &idx)?))
            }
            ExprKind::Call { callee, args, optional } => {
                let (this, func) = match &callee.kind {
                    ExprKind::Get { object, name, optional: member_optional } => {
                        let Some(base) = self.eval_chain(cx, env, object)? else { return Ok(None) };
                        if *member_optional && base.is_nullish() {
                            return Ok(None);
                        }
                        let hint = self.type_map.hint_of(object.id);
                        let func = self.get_member(cx, &base, name, hint)?;
                        (base, func)
                    }
                    ExprKind::GetIndex { object, index, optional: member_optional } => {
                        let Some(base) = self.eval_chain(cx, env, object)? else { return Ok(None) };
                        if *member_optional && base.is_nullish() {
                            return Ok(None);
                        }
                        let idx = self.eval_expr(cx, env, index)?;
                        let func = self.get_index_value(cx, &base, &idx)?;
                        (base, func)
                    }
                    ExprKind::Super { member } => {
                        let (this, func) = self.resolve_super(env, member.as_deref())?;
                        if member.is_none() && func.is_undefined() {
                            // implicit base constructor: field initialization
                            // already ran at construction, nothing to call
                            for arg in args {
                                if let Element::Item(e) | Element::Spread(e) = arg {
                                    self.eval_expr(cx, env, e)?;
                                }
                            }
                            return Ok(Some(Value::Undefined));
                        }
                        (this, func)
                    }
                    _ => {
                        let Some(func) = self.eval_chain(cx, env, callee)? else { return Ok(None) };
                        (Value::Undefined, func)
                    }
                };
                if *optional && func.is_nullish() {
                    return Ok(None);
                }
                let arg_values = self.eval_args(cx, env, args)?;
                Ok(Some(self.call_value(cx, &func, this, arg_values)?))
            }
            _ => Ok(Some(self.eval_expr(cx, env, expr)?)),
        }
    }

    /// Evaluate an argument list, expanding spreads immediately before the
    /// invocation.
    pub(super) fn eval_args(&mut self, cx: &dyn EvalContext, env: &Env, args: &[Arg]) -> VmResult<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Element::Item(e) => out.push(self.eval_expr(cx, env, e)?),
                Element::Spread(e) => {
                    let value = self.eval_expr(cx, env, e)?;
                    out.extend(self.iterate_to_vec(cx, &value)?);
                }
            }
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------

    fn eval_template(&mut self, cx: &dyn EvalContext, env: &Env, parts: &[TemplatePart]) -> VmResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Str(s) => out.push_str(s),
                TemplatePart::Expr(e) => {
                    let v = self.eval_expr(cx, env, e)?;
                    out.push_str(&v.to_display_string());
                }
            }
        }
        Ok(Value::string(out))
    }

    fn eval_tagged_template(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        tag: &Expr,
        cooked: &[String],
        raw: &[String],
        exprs: &[Expr],
    ) -> VmResult<Value> {
        let tag_value = self.eval_expr(cx, env, tag)?;
        let raw_arr = Rc::new(JsArray::from_vec(raw.iter().map(Value::string).collect()));
        raw_arr.freeze();
        let cooked_arr = Rc::new(JsArray::from_vec(cooked.iter().map(Value::string).collect()));
        cooked_arr.freeze();
        cooked_arr.set_raw(Value::array(raw_arr));
        let mut args = vec![Value::array(cooked_arr)];
        for e in exprs {
            args.push(self.eval_expr(cx, env, e)?);
        }
        self.call_value(cx, &tag_value, Value::Undefined, args)
    }

    fn eval_array_literal(&mut self, cx: &dyn EvalContext, env: &Env, elements: &[Element]) -> VmResult<Value> {
        let mut out = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Element::Item(e) => out.push(self.eval_expr(cx, env, e)?),
                Element::Spread(e) => {
                    let value = self.eval_expr(cx, env, e)?;
                    out.extend(self.iterate_to_vec(cx, &value)?);
                }
            }
        }
        Ok(Value::array(Rc::new(JsArray::from_vec(out))))
    }

    fn eval_object_literal(&mut self, cx: &dyn EvalContext, env: &Env, props: &[ObjectProp]) -> VmResult<Value> {
        let obj = JsObject::new();
        for prop in props {
            match prop {
                ObjectProp::Keyed { key, value } => {
                    let v = self.eval_expr(cx, env, value)?;
                    obj.set(key.clone(), v);
                }
                ObjectProp::Computed { key, value } => {
                    let k = self.eval_expr(cx, env, key)?.to_property_key();
                    let v = self.eval_expr(cx, env, value)?;
                    obj.set(k, v);
                }
                ObjectProp::Shorthand(name) => {
                    let v = env.lookup(name)?;
                    obj.set(name.clone(), v);
                }
                ObjectProp::Spread(e) => {
                    let source = self.eval_expr(cx, env, e)?;
                    for key in super::member::own_enumerable_keys(&source) {
                        let v = self.get_index_value(cx, &source, &Value::string(&key))?;
                        obj.set(key, v);
                    }
                }
            }
        }
        Ok(Value::object(Rc::new(obj)))
    }

    // ------------------------------------------------------------------
    // Assignment
    // ------------------------------------------------------------------

    fn eval_assign(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        expr: &Expr,
        name: &str,
        op: AssignOp,
        value: &Expr,
    ) -> VmResult<Value> {
        let depth = self.resolutions.depth_of(expr.id);
        let write = |vm: &mut Self, env: &Env, v: Value| match depth {
            Some(d) => env.assign_at(d, name, v),
            None => {
                let _ = vm;
                env.assign(name, v)
            }
        };
        if op == AssignOp::Assign {
            let v = self.eval_expr(cx, env, value)?;
            write(self, env, v.clone())?;
            return Ok(v);
        }
        let old = match depth {
            Some(d) => env.get_at(d, name)?,
            None => env.lookup(name)?,
        };
        let new = match self.logical_shortcut(cx, env, op, &old, value)? {
            ShortCircuit::Keep => return Ok(old),
            ShortCircuit::Write(v) => v,
        };
        write(self, env, new.clone())?;
        Ok(new)
    }

    /// Shared compound/logical assignment arithmetic. Logical forms skip the
    /// write entirely when short-circuited.
    fn logical_shortcut(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        op: AssignOp,
        old: &Value,
        value: &Expr,
    ) -> VmResult<ShortCircuit> {
        match op {
            AssignOp::AndAnd => {
                if !old.is_truthy() {
                    return Ok(ShortCircuit::Keep);
                }
                Ok(ShortCircuit::Write(self.eval_expr(cx, env, value)?))
            }
            AssignOp::OrOr => {
                if old.is_truthy() {
                    return Ok(ShortCircuit::Keep);
                }
                Ok(ShortCircuit::Write(self.eval_expr(cx, env, value)?))
            }
            AssignOp::Nullish => {
                if !old.is_nullish() {
                    return Ok(ShortCircuit::Keep);
                }
                Ok(ShortCircuit::Write(self.eval_expr(cx, env, value)?))
            }
            _ => {
                let binary = op.binary().ok_or_else(|| VmError::internal("plain assign in compound path"))?;
                let rhs = self.eval_expr(cx, env, value)?;
                Ok(ShortCircuit::Write(self.binary_op(binary, old, &rhs)?))
            }
        }
    }

    fn eval_increment(
        &mut self,
        cx: &dyn EvalContext,
        env: &Env,
        op: IncOp,
        target: &Expr,
        prefix: bool,
    ) -> VmResult<Value> {
        let delta = match op {
            IncOp::Increment => 1.0,
            IncOp::Decrement => -1.0,
        };
        let old = self.eval_expr(cx, env, target)?;
        let (old_num, new) = match &old {
            Value::BigInt(b) => {
                let delta_big = BigInt::from(delta as i64);
                (old.clone(), Value::BigInt(Rc::new(b.as_ref() + delta_big)))
            }
            other => {
                let n = other.coerce_number();
                (Value::Number(n), Value::Number(n + delta))
            }
        };
        match &target.kind {
            ExprKind::Variable(name) => match self.resolutions.depth_of(target.id) {
                Some(d) => env.assign_at(d, name, new.clone())?,
                None => env.assign(name, new.clone())?,
            },
            ExprKind::Get { object, name, .. } => {
                let obj = self.eval_expr(cx, env, object)?;
                self.set_member(cx, &obj, name, new.clone())?;
            }
            ExprKind::GetIndex { object, index, .. } => {
                let obj = self.eval_expr(cx, env, object)?;
                let idx = self.eval_expr(cx, env, index)?;
                self.set_index_value(cx, &obj, &idx, new.clone())?;
            }
            ExprKind::GetPrivate { object, name, class_id } => {
                let obj = self.eval_expr(cx, env, object)?;
                self.set_private(&obj, name, class_id.get(), new.clone())?;
            }
            _ => return Err(VmError::syntax_error("invalid increment target")),
        }
        Ok(if prefix { new } else { old_num })
    }

    fn eval_delete(&mut self, cx: &dyn EvalContext, env: &Env, target: &Expr) -> VmResult<Value> {
        match &target.kind {
            ExprKind::Get { object, name, .. } => {
                let obj = self.eval_expr(cx, env, object)?;
                Ok(Value::Boolean(self.delete_member(&obj, name)?))
            }
            ExprKind::GetIndex { object, index, .. } => {
                let obj = self.eval_expr(cx, env, object)?;
                let idx = self.eval_expr(cx, env, index)?;
                match (&obj, &idx) {
                    (Value::Ref(HeapRef::Array(a)), Value::Number(n)) => {
                        // delete leaves the slot undefined; length is
                        // untouched
                        if !a.can_mutate_structure() {
                            return Ok(Value::Boolean(false));
                        }
                        if n.fract() == 0.0 && *n >= 0.0 && (*n as usize) < a.len() {
                            a.set(*n as usize, Value::Undefined);
                        }
                        Ok(Value::Boolean(true))
                    }
                    _ => Ok(Value::Boolean(self.delete_member(&obj, &idx.to_property_key())?)),
                }
            }
            _ => Ok(Value::Boolean(true)),
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn eval_unary(&mut self, cx: &dyn EvalContext, env: &Env, op: UnaryOp, operand: &Expr) -> VmResult<Value> {
        if op == UnaryOp::Typeof {
            // `typeof unresolved` answers "undefined" rather than throwing.
            if let ExprKind::Variable(name) = &operand.kind
                && env.lookup(name).is_err()
            {
                return Ok(Value::string("undefined"));
            }
            let v = self.eval_expr(cx, env, operand)?;
            return Ok(Value::string(v.type_of()));
        }
        let v = self.eval_expr(cx, env, operand)?;
        Ok(match op {
            UnaryOp::Neg => match &v {
                Value::BigInt(b) => Value::BigInt(Rc::new(-b.as_ref().clone())),
                other => Value::Number(-other.coerce_number()),
            },
            UnaryOp::Plus => Value::Number(v.coerce_number()),
            UnaryOp::Not => Value::Boolean(!v.is_truthy()),
            UnaryOp::BitNot => Value::Number(!(to_int32(v.coerce_number())) as f64),
            UnaryOp::Void => Value::Undefined,
            UnaryOp::Typeof => unreachable!("handled above"),
        })
    }

    /// Binary operator table.
    pub fn binary_op(&mut self, op: BinaryOp, l: &Value, r: &Value) -> VmResult<Value> {
        use BinaryOp::*;
        match op {
            Add => self.add_values(l, r),
            Sub | Mul | Div | Mod | Pow => self.arithmetic(op, l, r),
            EqEq => Ok(Value::Boolean(l.loose_equals(r))),
            NotEq => Ok(Value::Boolean(!l.loose_equals(r))),
            EqEqEq => Ok(Value::Boolean(l.strict_equals(r))),
            NotEqEq => Ok(Value::Boolean(!l.strict_equals(r))),
            Less | LessEq | Greater | GreaterEq => self.relational(op, l, r),
            BitAnd => Ok(Value::Number((to_int32(l.coerce_number()) & to_int32(r.coerce_number())) as f64)),
            BitOr => Ok(Value::Number((to_int32(l.coerce_number()) | to_int32(r.coerce_number())) as f64)),
            BitXor => Ok(Value::Number((to_int32(l.coerce_number()) ^ to_int32(r.coerce_number())) as f64)),
            Shl => Ok(Value::Number(
                (to_int32(l.coerce_number()).wrapping_shl(to_uint32(r.coerce_number()) & 31)) as f64,
            )),
            Shr => Ok(Value::Number(
                (to_int32(l.coerce_number()).wrapping_shr(to_uint32(r.coerce_number()) & 31)) as f64,
            )),
            UShr => Ok(Value::Number(
                (to_uint32(l.coerce_number()).wrapping_shr(to_uint32(r.coerce_number()) & 31)) as f64,
            )),
            In => Ok(Value::Boolean(self.has_property(r, l)?)),
            Instanceof => self.instanceof(l, r),
        }
    }

    /// `+`: concatenation when either side stringifies, IEEE-754 addition
    /// otherwise.
    fn add_values(&mut self, l: &Value, r: &Value) -> VmResult<Value> {
        let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Ref(_) | Value::Symbol(_));
        if stringy(l) || stringy(r) {
            return Ok(Value::string(format!("{}{}", l.to_display_string(), r.to_display_string())));
        }
        if let (Value::BigInt(a), Value::BigInt(b)) = (l, r) {
            return Ok(Value::BigInt(Rc::new(a.as_ref() + b.as_ref())));
        }
        if matches!(l, Value::BigInt(_)) || matches!(r, Value::BigInt(_)) {
            return Err(VmError::type_error("Cannot mix BigInt and other types, use explicit conversions"));
        }
        Ok(Value::Number(l.coerce_number() + r.coerce_number()))
    }

    fn arithmetic(&mut self, op: BinaryOp, l: &Value, r: &Value) -> VmResult<Value> {
        if let (Value::BigInt(a), Value::BigInt(b)) = (l, r) {
            let (a, b) = (a.as_ref(), b.as_ref());
            return Ok(Value::BigInt(Rc::new(match op {
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div => {
                    if b == &BigInt::from(0) {
                        return Err(VmError::range_error("Division by zero"));
                    }
                    a / b
                }
                BinaryOp::Mod => {
                    if b == &BigInt::from(0) {
                        return Err(VmError::range_error("Division by zero"));
                    }
                    a % b
                }
                BinaryOp::Pow => {
                    let exp = b.to_u32().ok_or_else(|| VmError::range_error("Exponent must be non-negative"))?;
                    a.pow(exp)
                }
                _ => unreachable!(),
            })));
        }
        if matches!(l, Value::BigInt(_)) || matches!(r, Value::BigInt(_)) {
            return Err(VmError::type_error("Cannot mix BigInt and other types, use explicit conversions"));
        }
        let (a, b) = (l.coerce_number(), r.coerce_number());
        Ok(Value::Number(match op {
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            BinaryOp::Pow => a.powf(b),
            _ => unreachable!(),
        }))
    }

    fn relational(&mut self, op: BinaryOp, l: &Value, r: &Value) -> VmResult<Value> {
        use std::cmp::Ordering;
        let ordering = match (l, r) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            _ => {
                let (a, b) = (l.coerce_number(), r.coerce_number());
                a.partial_cmp(&b)
            }
        };
        let result = match ordering {
            None => false, // NaN involved
            Some(ord) => match op {
                BinaryOp::Less => ord == Ordering::Less,
                BinaryOp::LessEq => ord != Ordering::Greater,
                BinaryOp::Greater => ord == Ordering::Greater,
                BinaryOp::GreaterEq => ord != Ordering::Less,
                _ => unreachable!(),
            },
        };
        Ok(Value::Boolean(result))
    }

    fn instanceof(&mut self, l: &Value, r: &Value) -> VmResult<Value> {
        match r {
            Value::Ref(HeapRef::Class(class)) => Ok(Value::Boolean(match l {
                Value::Ref(HeapRef::Instance(inst)) => inst.class.is_subclass_of(class),
                _ => false,
            })),
            Value::Ref(HeapRef::Native(n)) => Ok(Value::Boolean(native_instanceof(&n.name, l))),
            _ => Err(VmError::type_error("Right-hand side of 'instanceof' is not callable")),
        }
    }

    // ------------------------------------------------------------------
    // Private elements
    // ------------------------------------------------------------------

    /// Brand-checked private read: field first, then private method.
    pub(super) fn get_private(&mut self, object: &Value, name: &str, brand: u64) -> VmResult<Value> {
        let inst = self.check_brand(object, name, brand)?;
        if let Some(v) = inst.privates.borrow().get(&(brand, name.to_string())) {
            return Ok(v.clone());
        }
        let mut class = Some(inst.class.clone());
        while let Some(c) = class {
            if c.id == brand {
                if let Some(m) = c.private_methods.borrow().get(name) {
                    return Ok(Value::function(m.clone()));
                }
                break;
            }
            class = c.superclass.clone();
        }
        Err(VmError::type_error(format!("Private member #{name} is not defined")))
    }

    pub(super) fn set_private(&mut self, object: &Value, name: &str, brand: u64, value: Value) -> VmResult<()> {
        let inst = self.check_brand(object, name, brand)?;
        inst.privates.borrow_mut().insert((brand, name.to_string()), value);
        Ok(())
    }

    fn check_brand(&self, object: &Value, name: &str, brand: u64) -> VmResult<Rc<crate::function::Instance>> {
        let Value::Ref(HeapRef::Instance(inst)) = object else {
            return Err(VmError::type_error(format!(
                "Cannot read private member #{name} from an object whose class did not declare it"
            )));
        };
        if brand == 0 || !inst.has_brand(brand) {
            return Err(VmError::type_error(format!(
                "Cannot read private member #{name} from an object whose class did not declare it"
            )));
        }
        Ok(inst.clone())
    }

    // ------------------------------------------------------------------
    // super
    // ------------------------------------------------------------------

    /// Resolve `super` / `super.member` against the executing method's home
    /// class. Returns `(this, callable-or-value)`.
    pub(super) fn resolve_super(&mut self, env: &Env, member: Option<&str>) -> VmResult<(Value, Value)> {
        let func = self
            .current_function()
            .ok_or_else(|| VmError::syntax_error("'super' outside of a method"))?;
        let home = func
            .home_class
            .borrow()
            .clone()
            .ok_or_else(|| VmError::syntax_error("'super' outside of a method"))?;
        let superclass = home
            .superclass
            .clone()
            .ok_or_else(|| VmError::syntax_error(format!("'super' in {} which has no superclass", home.name)))?;
        let this = env.lookup("this").unwrap_or(Value::Undefined);
        match member {
            None => {
                let ctor = superclass
                    .find_constructor()
                    .map(Value::function)
                    .unwrap_or(Value::Undefined);
                Ok((this, ctor))
            }
            Some(name) => {
                if let Some(method) = superclass.find_method(name) {
                    return Ok((this.clone(), Value::function(method)));
                }
                if let Some(getter) = superclass.find_getter(name) {
                    let this_for_call = this.clone();
                    let v = self.call_function(&getter, this_for_call, Vec::new())?;
                    return Ok((this, v));
                }
                Ok((this, Value::Undefined))
            }
        }
    }
}

enum ShortCircuit {
    /// Logical assignment short-circuited; the old value is the result and
    /// no write happens.
    Keep,
    Write(Value),
}

/// ToInt32.
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    n as i64 as i32
}

/// ToUint32.
pub fn to_uint32(n: f64) -> u32 {
    to_int32(n) as u32
}

/// `instanceof` against the built-in constructors installed as natives.
fn native_instanceof(ctor: &str, v: &Value) -> bool {
    match ctor {
        "Error" => matches!(v, Value::Ref(HeapRef::Error(_))),
        "TypeError" | "RangeError" | "ReferenceError" | "SyntaxError" | "URIError" | "EvalError"
        | "AggregateError" => match v {
            Value::Ref(HeapRef::Error(e)) => e.kind.name() == ctor,
            _ => false,
        },
        "Array" => matches!(v, Value::Ref(HeapRef::Array(_))),
        "Map" => matches!(v, Value::Ref(HeapRef::Map(_))),
        "Set" => matches!(v, Value::Ref(HeapRef::Set(_))),
        "WeakMap" => matches!(v, Value::Ref(HeapRef::WeakMap(_))),
        "WeakSet" => matches!(v, Value::Ref(HeapRef::WeakSet(_))),
        "Date" => matches!(v, Value::Ref(HeapRef::Date(_))),
        "RegExp" => matches!(v, Value::Ref(HeapRef::RegExp(_))),
        "Promise" => matches!(v, Value::Ref(HeapRef::Promise(_))),
        "Function" => v.is_callable(),
        "Object" => matches!(v, Value::Ref(_)),
        "Int8Array" | "Uint8Array" | "Int16Array" | "Uint16Array" | "Int32Array" | "Uint32Array"
        | "Float32Array" | "Float64Array" => match v {
            Value::Ref(HeapRef::TypedArray(t)) => t.kind.constructor_name() == ctor,
            _ => false,
        },
        _ => false,
    }
}
