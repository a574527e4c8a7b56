//! Expression nodes.

use std::cell::Cell;
use std::rc::Rc;

use crate::decl::{ClassDecl, FunctionDecl};
use crate::NodeId;

/// An expression: a [`NodeId`] for side-table lookups plus the variant.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

/// Literal values as they appear in source.
#[derive(Debug, Clone)]
pub enum Literal {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    /// Digits only; the evaluator parses into an arbitrary-precision integer.
    BigInt(String),
}

/// Binary operators. `in`/`instanceof` ride here so relational dispatch stays
/// in one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    EqEq,
    NotEq,
    EqEqEq,
    NotEqEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    In,
    Instanceof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncOp {
    Increment,
    Decrement,
}

/// Assignment flavor for `Assign`/`Set`/`SetIndex`/`SetPrivate`.
///
/// Compound ops read-modify-write; logical ops (`&&=`, `||=`, `??=`) skip the
/// write entirely when the short-circuit condition holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
    AndAnd,
    OrOr,
    Nullish,
}

impl AssignOp {
    /// The read-modify-write arithmetic behind a compound assignment, if any.
    pub fn binary(self) -> Option<BinaryOp> {
        Some(match self {
            AssignOp::Add => BinaryOp::Add,
            AssignOp::Sub => BinaryOp::Sub,
            AssignOp::Mul => BinaryOp::Mul,
            AssignOp::Div => BinaryOp::Div,
            AssignOp::Mod => BinaryOp::Mod,
            AssignOp::Pow => BinaryOp::Pow,
            AssignOp::BitAnd => BinaryOp::BitAnd,
            AssignOp::BitOr => BinaryOp::BitOr,
            AssignOp::BitXor => BinaryOp::BitXor,
            AssignOp::Shl => BinaryOp::Shl,
            AssignOp::Shr => BinaryOp::Shr,
            AssignOp::UShr => BinaryOp::UShr,
            _ => return None,
        })
    }

    pub fn is_logical(self) -> bool {
        matches!(self, AssignOp::AndAnd | AssignOp::OrOr | AssignOp::Nullish)
    }
}

/// An array-literal element or call argument.
#[derive(Debug, Clone)]
pub enum Element {
    Item(Expr),
    Spread(Expr),
}

/// Call argument list entry.
pub type Arg = Element;

/// An object-literal property.
#[derive(Debug, Clone)]
pub enum ObjectProp {
    /// `key: value` (string or identifier key).
    Keyed { key: String, value: Expr },
    /// `[expr]: value`.
    Computed { key: Expr, value: Expr },
    /// `name` shorthand.
    Shorthand(String),
    /// `...expr`.
    Spread(Expr),
}

/// A segment of a template literal, in source order.
#[derive(Debug, Clone)]
pub enum TemplatePart {
    Str(String),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    /// `` `a${b}c` ``
    TemplateLiteral(Vec<TemplatePart>),
    /// ``tag`a${b}` `` — cooked and raw strings plus substitution expressions.
    TaggedTemplate {
        tag: Box<Expr>,
        cooked: Vec<String>,
        raw: Vec<String>,
        exprs: Vec<Expr>,
    },
    RegexLiteral {
        pattern: String,
        flags: String,
    },
    ArrayLiteral(Vec<Element>),
    ObjectLiteral(Vec<ObjectProp>),
    /// Variable read; resolver depth (when present) is keyed by `Expr::id`.
    Variable(String),
    /// Variable write, plain / compound / logical.
    Assign {
        name: String,
        op: AssignOp,
        value: Box<Expr>,
    },
    Grouping(Box<Expr>),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    NullishCoalescing {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `delete obj.k` / `delete obj[k]`.
    Delete(Box<Expr>),
    Prefix {
        op: IncOp,
        target: Box<Expr>,
    },
    Postfix {
        op: IncOp,
        target: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
        /// `?.()` — short-circuits to undefined on a nullish callee.
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Arg>,
    },
    /// Property read `obj.name` / `obj?.name`.
    Get {
        object: Box<Expr>,
        name: String,
        optional: bool,
    },
    /// Property write, plain / compound / logical.
    Set {
        object: Box<Expr>,
        name: String,
        op: AssignOp,
        value: Box<Expr>,
    },
    GetIndex {
        object: Box<Expr>,
        index: Box<Expr>,
        optional: bool,
    },
    SetIndex {
        object: Box<Expr>,
        index: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
    /// `obj.#name` — `class_id` is stamped by the evaluator when the declaring
    /// class body is evaluated, and checked against the receiver on access.
    GetPrivate {
        object: Box<Expr>,
        name: String,
        class_id: BrandSlot,
    },
    SetPrivate {
        object: Box<Expr>,
        name: String,
        op: AssignOp,
        value: Box<Expr>,
        class_id: BrandSlot,
    },
    CallPrivate {
        object: Box<Expr>,
        name: String,
        args: Vec<Arg>,
        class_id: BrandSlot,
    },
    This,
    /// `super.name` (method or property on the superclass), or bare `super`
    /// when used as a call target in a constructor.
    Super {
        member: Option<String>,
    },
    ArrowFunction(Rc<FunctionDecl>),
    /// Function expression; a name makes it an NFE whose name is a read-only
    /// binding inside the body.
    FunctionExpr(Rc<FunctionDecl>),
    ClassExpr(Rc<ClassDecl>),
    /// Valid only inside call/array/object contexts; kept as a variant so the
    /// visitor surface is complete.
    Spread(Box<Expr>),
    /// `expr as T` — runtime pass-through.
    TypeAssertion(Box<Expr>),
    /// `expr satisfies T` — runtime pass-through.
    Satisfies(Box<Expr>),
    /// `expr!` — runtime pass-through.
    NonNullAssertion(Box<Expr>),
    Await(Box<Expr>),
    Yield {
        value: Option<Box<Expr>>,
        delegate: bool,
    },
    DynamicImport(Box<Expr>),
    ImportMeta,
}

/// Mutable slot for the declaring class's brand, written once during class
/// evaluation. `Cell<u64>` with 0 = not yet stamped.
pub type BrandSlot = Rc<Cell<u64>>;

impl Expr {
    pub fn new(id: NodeId, kind: ExprKind) -> Self {
        Self { id, kind }
    }

    /// Synthesized node: no resolver depth, no type annotation.
    pub fn synth(kind: ExprKind) -> Self {
        Self { id: NodeId::SYNTHETIC, kind }
    }

    pub fn number(n: f64) -> Self {
        Self::synth(ExprKind::Literal(Literal::Number(n)))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::synth(ExprKind::Literal(Literal::String(s.into())))
    }

    pub fn boolean(b: bool) -> Self {
        Self::synth(ExprKind::Literal(Literal::Boolean(b)))
    }

    pub fn undefined() -> Self {
        Self::synth(ExprKind::Literal(Literal::Undefined))
    }

    pub fn null() -> Self {
        Self::synth(ExprKind::Literal(Literal::Null))
    }

    pub fn var(name: impl Into<String>) -> Self {
        Self::synth(ExprKind::Variable(name.into()))
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Self::synth(ExprKind::Assign { name: name.into(), op: AssignOp::Assign, value: Box::new(value) })
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::synth(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) })
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Self::synth(ExprKind::Unary { op, operand: Box::new(operand) })
    }

    pub fn array(items: Vec<Expr>) -> Self {
        Self::synth(ExprKind::ArrayLiteral(items.into_iter().map(Element::Item).collect()))
    }

    pub fn object(props: Vec<(&str, Expr)>) -> Self {
        Self::synth(ExprKind::ObjectLiteral(
            props.into_iter().map(|(k, v)| ObjectProp::Keyed { key: k.to_string(), value: v }).collect(),
        ))
    }

    pub fn get(object: Expr, name: impl Into<String>) -> Self {
        Self::synth(ExprKind::Get { object: Box::new(object), name: name.into(), optional: false })
    }

    pub fn get_index(object: Expr, index: Expr) -> Self {
        Self::synth(ExprKind::GetIndex { object: Box::new(object), index: Box::new(index), optional: false })
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Self::synth(ExprKind::Call {
            callee: Box::new(callee),
            args: args.into_iter().map(Element::Item).collect(),
            optional: false,
        })
    }

    /// `object.name(args...)`.
    pub fn method(object: Expr, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call(Self::get(object, name), args)
    }

    pub fn new_instance(callee: Expr, args: Vec<Expr>) -> Self {
        Self::synth(ExprKind::New { callee: Box::new(callee), args: args.into_iter().map(Element::Item).collect() })
    }

    pub fn await_(expr: Expr) -> Self {
        Self::synth(ExprKind::Await(Box::new(expr)))
    }

    pub fn yield_(value: Option<Expr>) -> Self {
        Self::synth(ExprKind::Yield { value: value.map(Box::new), delegate: false })
    }

    pub fn yield_from(value: Expr) -> Self {
        Self::synth(ExprKind::Yield { value: Some(Box::new(value)), delegate: true })
    }
}
