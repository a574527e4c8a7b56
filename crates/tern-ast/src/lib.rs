//! AST and checker-artifact types for the Tern execution core.
//!
//! The parser and the type checker live outside this workspace; this crate is
//! the contract they produce against. It carries:
//!
//! - the sum-typed statement and expression nodes ([`Stmt`], [`Expr`]),
//! - function, class and parameter declarations ([`decl`]),
//! - destructuring patterns ([`Pattern`]),
//! - the artifacts the evaluator consumes alongside the tree: the resolver's
//!   scope-depth map ([`Resolutions`]) and the checker's per-expression type
//!   annotations ([`TypeMap`]).
//!
//! Expressions carry a [`NodeId`] so the side tables can be keyed by node
//! identity without back-pointers into the tree. Hosts (and tests) assemble
//! programs with the constructor helpers on [`Expr`] and [`Stmt`].

mod artifacts;
pub mod decl;
mod expr;
mod pattern;
mod stmt;

pub use artifacts::{Resolutions, TypeHint, TypeMap};
pub use decl::{ClassDecl, ClassMember, EnumDecl, EnumMember, FnKind, FunctionDecl, MethodKind, Param};
pub use expr::{
    Arg, AssignOp, BinaryOp, BrandSlot, Element, Expr, ExprKind, IncOp, Literal, LogicalOp, ObjectProp,
    TemplatePart, UnaryOp,
};
pub use pattern::{ArrayPatternElem, ObjectPatternProp, Pattern};
pub use stmt::{CatchClause, Declarator, ExportDecl, ImportDecl, ImportSpecifier, Stmt, SwitchCase, VarKind};

/// Identity of an expression node, assigned by the parser.
///
/// Side tables ([`Resolutions`], [`TypeMap`]) and the private-access brand
/// records are keyed by this id, so it must be unique within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Id used by synthesized nodes that never participate in resolution.
    pub const SYNTHETIC: NodeId = NodeId(u32::MAX);
}

/// A parsed source file, ready for linking.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Canonical path, as produced by the host resolver.
    pub path: String,
    /// True for module files (own environment), false for scripts (shared
    /// script environment).
    pub is_module: bool,
    /// Top-level statements in source order.
    pub body: Vec<Stmt>,
}

impl SourceFile {
    pub fn module(path: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self { path: path.into(), is_module: true, body }
    }

    pub fn script(path: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self { path: path.into(), is_module: false, body }
    }
}
