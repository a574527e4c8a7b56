//! Shared harness for engine-level tests: build a program out of AST
//! constructors, run it through a full engine, capture the output.
#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use tern_ast::decl::{FnKind, FunctionDecl, Param};
use tern_ast::{Expr, Resolutions, SourceFile, Stmt, TypeMap};
use tern_vm_core::interp::OutputSink;
use tern_vm_runtime::{Engine, EngineOptions};

#[derive(Default)]
pub struct Capture {
    pub out: RefCell<String>,
    pub err: RefCell<String>,
}

impl OutputSink for Capture {
    fn write_out(&self, text: &str) {
        self.out.borrow_mut().push_str(text);
    }

    fn write_err(&self, text: &str) {
        self.err.borrow_mut().push_str(text);
    }
}

/// Run files in order (entry last); returns (exit code, stdout, stderr).
pub fn run_modules(files: Vec<SourceFile>) -> (i32, String, String) {
    let sink = Rc::new(Capture::default());
    let mut engine = Engine::new(Rc::new(Resolutions::new()), Rc::new(TypeMap::new()), EngineOptions::default())
        .with_sink(sink.clone());
    let code = engine.run(&files).expect("engine run should not fail fatally");
    let out = sink.out.borrow().clone();
    let err = sink.err.borrow().clone();
    (code, out, err)
}

pub fn run_module(body: Vec<Stmt>) -> (i32, String, String) {
    run_modules(vec![SourceFile::module("main", body)])
}

/// `console.log(args...)`.
pub fn log(args: Vec<Expr>) -> Stmt {
    Stmt::expr(Expr::method(Expr::var("console"), "log", args))
}

/// A zero-parameter arrow.
pub fn arrow(body: Vec<Stmt>) -> Expr {
    Expr::synth(tern_ast::ExprKind::ArrowFunction(Rc::new(FunctionDecl::new(None, FnKind::Arrow, vec![], body))))
}

/// A one-parameter arrow.
pub fn arrow1(param: &str, body: Vec<Stmt>) -> Expr {
    Expr::synth(tern_ast::ExprKind::ArrowFunction(Rc::new(FunctionDecl::new(
        None,
        FnKind::Arrow,
        vec![Param::required(param)],
        body,
    ))))
}

/// An async function declaration.
pub fn async_fn(name: &str, params: Vec<Param>, body: Vec<Stmt>) -> Stmt {
    Stmt::Function(Rc::new(FunctionDecl::new(Some(name), FnKind::Async, params, body)))
}
