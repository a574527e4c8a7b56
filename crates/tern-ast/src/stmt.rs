//! Statement nodes.

use std::rc::Rc;

use crate::decl::{ClassDecl, EnumDecl, FunctionDecl};
use crate::expr::Expr;
use crate::pattern::Pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    /// `catch { ... }` has no parameter.
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` is the `default` clause.
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// One specifier of an `import` statement.
#[derive(Debug, Clone)]
pub enum ImportSpecifier {
    /// `import x from 'p'`.
    Default(String),
    /// `import * as ns from 'p'`.
    Namespace(String),
    /// `import { exported as local }`; `local == exported` without rename.
    Named { exported: String, local: String },
    /// `import { type T }` — erased, leaves no binding.
    TypeOnly(String),
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub source: String,
    pub specifiers: Vec<ImportSpecifier>,
    /// `import type ... from 'p'` — whole statement erased.
    pub type_only: bool,
}

#[derive(Debug, Clone)]
pub enum ExportDecl {
    /// `export <decl>` — the declaration executes, then its names export.
    Decl(Box<Stmt>),
    /// `export { a, b as c }`, optionally re-exporting from a source module.
    Named {
        specifiers: Vec<(String, String)>,
        source: Option<String>,
    },
    /// `export default expr`.
    Default(Expr),
    /// `export * from 'p'`.
    Star { source: String },
    /// `export = expr` (CommonJS interop).
    Assignment(Expr),
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub target: Pattern,
    pub init: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expression(Expr),
    VarDecl {
        kind: VarKind,
        declarations: Vec<Declarator>,
    },
    /// `{ ... }` — introduces a scope.
    Block(Vec<Stmt>),
    /// Statement list with no scope of its own (comma sequences, desugarings).
    Sequence(Vec<Stmt>),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        increment: Option<Expr>,
        body: Box<Stmt>,
    },
    ForOf {
        binding: Pattern,
        iterable: Expr,
        body: Box<Stmt>,
        is_await: bool,
    },
    ForIn {
        binding: String,
        object: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expr),
    TryCatch {
        try_block: Vec<Stmt>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    Function(Rc<FunctionDecl>),
    Class(Rc<ClassDecl>),
    Enum(EnumDecl),
    /// `namespace N { ... }` — additive merge on re-declaration.
    Namespace {
        name: String,
        body: Vec<Stmt>,
    },
    Export(ExportDecl),
    Import(ImportDecl),
    /// `import x = require('p')`.
    ImportRequire {
        name: String,
        source: String,
    },
    /// `"use strict"` and friends.
    Directive(String),
    /// `using x = expr` — `dispose()`/`close()` runs at scope exit in reverse
    /// declaration order.
    Using {
        name: String,
        init: Expr,
        is_await: bool,
    },
    /// Interfaces, type aliases, `declare` statements: parsed, type-checked,
    /// erased here.
    TypeOnly,
}

impl Stmt {
    pub fn expr(e: Expr) -> Self {
        Stmt::Expression(e)
    }

    pub fn let_(name: impl Into<String>, init: Expr) -> Self {
        Stmt::VarDecl {
            kind: VarKind::Let,
            declarations: vec![Declarator { target: Pattern::Identifier(name.into()), init: Some(init) }],
        }
    }

    pub fn const_(name: impl Into<String>, init: Expr) -> Self {
        Stmt::VarDecl {
            kind: VarKind::Const,
            declarations: vec![Declarator { target: Pattern::Identifier(name.into()), init: Some(init) }],
        }
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return(value)
    }
}
