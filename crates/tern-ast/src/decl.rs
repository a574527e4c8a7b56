//! Function, class and enum declarations.

use crate::expr::Expr;
use crate::pattern::Pattern;
use crate::stmt::Stmt;
use crate::NodeId;

/// What calling convention a function body runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FnKind {
    Normal,
    Arrow,
    Async,
    Generator,
    AsyncGenerator,
}

impl FnKind {
    pub fn is_async(self) -> bool {
        matches!(self, FnKind::Async | FnKind::AsyncGenerator)
    }

    pub fn is_generator(self) -> bool {
        matches!(self, FnKind::Generator | FnKind::AsyncGenerator)
    }
}

/// One parameter descriptor.
///
/// `arity` counts parameters that are neither rest, nor optional, nor
/// defaulted; the binder fails a call that supplies fewer.
#[derive(Debug, Clone)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
    /// `x?: T` — missing argument binds undefined instead of failing.
    pub optional: bool,
    pub rest: bool,
}

impl Param {
    pub fn required(name: impl Into<String>) -> Self {
        Self { pattern: Pattern::Identifier(name.into()), default: None, optional: false, rest: false }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self { pattern: Pattern::Identifier(name.into()), default: None, optional: true, rest: false }
    }

    pub fn defaulted(name: impl Into<String>, default: Expr) -> Self {
        Self { pattern: Pattern::Identifier(name.into()), default: Some(default), optional: false, rest: false }
    }

    pub fn rest(name: impl Into<String>) -> Self {
        Self { pattern: Pattern::Identifier(name.into()), default: None, optional: false, rest: true }
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub id: NodeId,
    /// `None` for anonymous function expressions and arrows.
    pub name: Option<String>,
    pub kind: FnKind,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

impl FunctionDecl {
    pub fn new(name: Option<&str>, kind: FnKind, params: Vec<Param>, body: Vec<Stmt>) -> Self {
        Self { id: NodeId::SYNTHETIC, name: name.map(str::to_string), kind, params, body }
    }

    /// Count of non-rest, non-optional, non-defaulted parameters.
    pub fn arity(&self) -> usize {
        self.params.iter().filter(|p| !p.rest && !p.optional && p.default.is_none()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

/// A member of a class body, in declaration order.
#[derive(Debug, Clone)]
pub enum ClassMember {
    Method {
        name: String,
        func: std::rc::Rc<FunctionDecl>,
        kind: MethodKind,
        is_static: bool,
        is_private: bool,
        decorators: Vec<Expr>,
    },
    Field {
        name: String,
        init: Option<Expr>,
        is_static: bool,
        is_private: bool,
        decorators: Vec<Expr>,
    },
    /// `accessor x = init` — expands to a backing field plus get/set pair.
    AutoAccessor {
        name: String,
        init: Option<Expr>,
        is_static: bool,
        decorators: Vec<Expr>,
    },
    /// `static { ... }`, run in declaration order with `this` = the class.
    StaticBlock(Vec<Stmt>),
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub id: NodeId,
    pub name: String,
    pub superclass: Option<Expr>,
    pub members: Vec<ClassMember>,
    pub decorators: Vec<Expr>,
    /// Brand slot shared with every private-access node inside this class
    /// body; the evaluator stamps it when the class is evaluated.
    pub brand: crate::expr::BrandSlot,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, superclass: Option<Expr>, members: Vec<ClassMember>) -> Self {
        Self {
            id: NodeId::SYNTHETIC,
            name: name.into(),
            superclass,
            members,
            decorators: Vec::new(),
            brand: crate::expr::BrandSlot::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnumMember {
    pub name: String,
    /// Explicit initializer; absent members auto-increment from the previous
    /// numeric value.
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub members: Vec<EnumMember>,
    pub is_const: bool,
}
