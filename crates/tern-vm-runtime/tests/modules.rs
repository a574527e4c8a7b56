//! Linker behavior: binding, re-export, execute-once, scripts, main().

mod common;

use common::{log, run_module, run_modules};

use std::rc::Rc;

use tern_ast::decl::{FnKind, FunctionDecl, Param};
use tern_ast::{ExportDecl, Expr, ImportDecl, ImportSpecifier, SourceFile, Stmt};

fn export_const(name: &str, value: Expr) -> Stmt {
    Stmt::Export(ExportDecl::Decl(Box::new(Stmt::const_(name, value))))
}

fn import_named(source: &str, names: &[&str]) -> Stmt {
    Stmt::Import(ImportDecl {
        source: source.to_string(),
        specifiers: names
            .iter()
            .map(|n| ImportSpecifier::Named { exported: n.to_string(), local: n.to_string() })
            .collect(),
        type_only: false,
    })
}

#[test]
fn module_diamond_executes_shared_dependency_once() {
    // A -> B -> D, A -> C -> D; D prints "d-init" exactly once
    let d = SourceFile::module("d", vec![log(vec![Expr::string("d-init")]), export_const("x", Expr::number(1.0))]);
    let b = SourceFile::module("b", vec![import_named("d", &["x"]), export_const("bx", Expr::var("x"))]);
    let c = SourceFile::module("c", vec![import_named("d", &["x"]), export_const("cx", Expr::var("x"))]);
    let a = SourceFile::module(
        "a",
        vec![
            import_named("b", &["bx"]),
            import_named("c", &["cx"]),
            log(vec![Expr::binary(tern_ast::BinaryOp::Add, Expr::var("bx"), Expr::var("cx"))]),
        ],
    );
    let (_, out, _) = run_modules(vec![d, b, c, a]);
    assert_eq!(out, "d-init\n2\n");
}

#[test]
fn default_namespace_and_named_imports() {
    let lib = SourceFile::module(
        "lib",
        vec![
            export_const("x", Expr::number(10.0)),
            Stmt::Export(ExportDecl::Default(Expr::number(99.0))),
        ],
    );
    let app = SourceFile::module(
        "app",
        vec![
            Stmt::Import(ImportDecl {
                source: "lib".to_string(),
                specifiers: vec![
                    ImportSpecifier::Default("d".to_string()),
                    ImportSpecifier::Namespace("ns".to_string()),
                    ImportSpecifier::Named { exported: "x".to_string(), local: "localX".to_string() },
                ],
                type_only: false,
            }),
            log(vec![Expr::var("d"), Expr::var("localX"), Expr::get(Expr::var("ns"), "x"), Expr::get(Expr::var("ns"), "default")]),
        ],
    );
    let (_, out, _) = run_modules(vec![lib, app]);
    assert_eq!(out, "99 10 10 99\n");
}

#[test]
fn type_only_imports_leave_no_binding() {
    let lib = SourceFile::module("lib", vec![export_const("T", Expr::number(1.0))]);
    let app = SourceFile::module(
        "app",
        vec![
            Stmt::Import(ImportDecl {
                source: "lib".to_string(),
                specifiers: vec![ImportSpecifier::TypeOnly("T".to_string())],
                type_only: false,
            }),
            log(vec![Expr::unary(tern_ast::UnaryOp::Typeof, Expr::var("T"))]),
        ],
    );
    let (_, out, _) = run_modules(vec![lib, app]);
    assert_eq!(out, "undefined\n");
}

#[test]
fn export_assignment_feeds_import_require() {
    // lib: export = { k: 7 };  app: import m = require('lib')
    let lib = SourceFile::module(
        "lib",
        vec![Stmt::Export(ExportDecl::Assignment(Expr::object(vec![("k", Expr::number(7.0))])))],
    );
    let app = SourceFile::module(
        "app",
        vec![
            Stmt::ImportRequire { name: "m".to_string(), source: "lib".to_string() },
            log(vec![Expr::get(Expr::var("m"), "k")]),
        ],
    );
    let (_, out, _) = run_modules(vec![lib, app]);
    assert_eq!(out, "7\n");
}

#[test]
fn re_exports_copy_from_executed_sources() {
    let base = SourceFile::module("base", vec![export_const("v", Expr::number(3.0))]);
    let hub = SourceFile::module(
        "hub",
        vec![Stmt::Export(ExportDecl::Named {
            specifiers: vec![("v".to_string(), "renamed".to_string())],
            source: Some("base".to_string()),
        })],
    );
    let star_hub = SourceFile::module(
        "star",
        vec![Stmt::Export(ExportDecl::Star { source: "base".to_string() })],
    );
    let app = SourceFile::module(
        "app",
        vec![
            import_named("hub", &["renamed"]),
            import_named("star", &["v"]),
            log(vec![Expr::var("renamed"), Expr::var("v")]),
        ],
    );
    let (_, out, _) = run_modules(vec![base, hub, star_hub, app]);
    assert_eq!(out, "3 3\n");
}

#[test]
fn scripts_share_one_environment() {
    let first = SourceFile::script("first", vec![Stmt::let_("shared", Expr::number(5.0))]);
    let second = SourceFile::script("second", vec![log(vec![Expr::var("shared")])]);
    let (_, out, _) = run_modules(vec![first, second]);
    assert_eq!(out, "5\n");
}

#[test]
fn modules_get_fresh_environments() {
    let first = SourceFile::module("first", vec![Stmt::let_("private_local", Expr::number(5.0))]);
    let second = SourceFile::module(
        "second",
        vec![log(vec![Expr::unary(tern_ast::UnaryOp::Typeof, Expr::var("private_local"))])],
    );
    let (_, out, _) = run_modules(vec![first, second]);
    assert_eq!(out, "undefined\n");
}

#[test]
fn numeric_main_return_becomes_exit_code() {
    let body = vec![Stmt::Function(Rc::new(FunctionDecl::new(
        Some("main"),
        FnKind::Normal,
        vec![Param::optional("argv")],
        vec![Stmt::ret(Some(Expr::number(3.0)))],
    )))];
    let (code, _, _) = run_module(body);
    assert_eq!(code, 3);
}

#[test]
fn async_main_is_awaited() {
    let body = vec![Stmt::Function(Rc::new(FunctionDecl::new(
        Some("main"),
        FnKind::Async,
        vec![],
        vec![
            log(vec![Expr::string("in main")]),
            Stmt::ret(Some(Expr::number(4.0))),
        ],
    )))];
    let (code, out, _) = run_module(body);
    assert_eq!(out, "in main\n");
    assert_eq!(code, 4);
}

#[test]
fn main_receives_process_argv() {
    let body = vec![Stmt::Function(Rc::new(FunctionDecl::new(
        Some("main"),
        FnKind::Normal,
        vec![Param::required("argv")],
        vec![
            log(vec![Expr::get(Expr::var("argv"), "length")]),
            Stmt::ret(None),
        ],
    )))];
    let (code, out, _) = run_module(body);
    assert_eq!(out, "1\n");
    assert_eq!(code, 0);
}

#[test]
fn process_exit_overrides_everything() {
    let body = vec![Stmt::expr(Expr::method(Expr::var("process"), "exit", vec![Expr::number(7.0)]))];
    let (code, _, _) = run_module(body);
    assert_eq!(code, 7);
}

#[test]
fn top_level_throw_prints_runtime_error_and_stops_the_module() {
    let body = vec![
        log(vec![Expr::string("before")]),
        Stmt::Throw(Expr::string("kaboom")),
        log(vec![Expr::string("after")]),
    ];
    let (code, out, err) = run_module(body);
    assert_eq!(out, "before\n");
    assert!(err.contains("Runtime Error: kaboom"));
    assert_eq!(code, 0);
}

#[test]
fn dynamic_import_resolves_linked_modules() {
    let lib = SourceFile::module("lib", vec![export_const("x", Expr::number(5.0))]);
    let app = SourceFile::module(
        "app",
        vec![
            Stmt::const_(
                "ns",
                Expr::await_(Expr::synth(tern_ast::ExprKind::DynamicImport(Box::new(Expr::string("lib"))))),
            ),
            log(vec![Expr::get(Expr::var("ns"), "x")]),
        ],
    );
    let (_, out, _) = run_modules(vec![lib, app]);
    assert_eq!(out, "5\n");
}
