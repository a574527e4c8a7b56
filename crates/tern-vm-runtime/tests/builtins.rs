//! Built-in surface through the full engine: sorting, JSON, collections,
//! freezing, symbols, console formatting.

mod common;

use common::{arrow1, log, run_module};

use tern_ast::{BinaryOp, Expr, Stmt};

#[test]
fn sort_is_stable_and_partitions_undefined_to_the_tail() {
    // [3, undefined, 1, undefined, 2].sort() -> [1, 2, 3, undefined, undefined]
    let body = vec![
        Stmt::const_(
            "arr",
            Expr::array(vec![
                Expr::number(3.0),
                Expr::undefined(),
                Expr::number(1.0),
                Expr::undefined(),
                Expr::number(2.0),
            ]),
        ),
        Stmt::expr(Expr::method(Expr::var("arr"), "sort", vec![])),
        log(vec![Expr::var("arr")]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "[ 1, 2, 3, undefined, undefined ]\n");
}

#[test]
fn splice_with_negative_start_seed_case() {
    let body = vec![
        Stmt::const_(
            "arr",
            Expr::array(vec![
                Expr::number(1.0),
                Expr::number(2.0),
                Expr::number(3.0),
                Expr::number(4.0),
                Expr::number(5.0),
            ]),
        ),
        Stmt::const_(
            "removed",
            Expr::method(
                Expr::var("arr"),
                "splice",
                vec![Expr::number(-2.0), Expr::number(1.0), Expr::number(9.0), Expr::number(10.0)],
            ),
        ),
        log(vec![Expr::var("removed"), Expr::var("arr")]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "[ 4 ] [ 1, 2, 3, 9, 10, 5 ]\n");
}

#[test]
fn json_round_trip_preserves_plain_data() {
    // JSON.parse(JSON.stringify({a: [1, "s", true, null]})).a[1]
    let source = Expr::object(vec![(
        "a",
        Expr::array(vec![Expr::number(1.0), Expr::string("s"), Expr::boolean(true), Expr::null()]),
    )]);
    let stringified = Expr::method(Expr::var("JSON"), "stringify", vec![source]);
    let parsed = Expr::method(Expr::var("JSON"), "parse", vec![stringified]);
    let body = vec![
        Stmt::const_("back", parsed),
        log(vec![Expr::get_index(Expr::get(Expr::var("back"), "a"), Expr::number(1.0))]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "s\n");
}

#[test]
fn map_size_tracks_sets_and_deletes() {
    let body = vec![
        Stmt::const_("m", Expr::new_instance(Expr::var("Map"), vec![])),
        Stmt::expr(Expr::method(Expr::var("m"), "set", vec![Expr::string("k"), Expr::number(1.0)])),
        Stmt::expr(Expr::method(Expr::var("m"), "set", vec![Expr::string("k"), Expr::number(2.0)])),
        Stmt::expr(Expr::method(Expr::var("m"), "set", vec![Expr::string("j"), Expr::number(3.0)])),
        Stmt::expr(Expr::method(Expr::var("m"), "delete", vec![Expr::string("k")])),
        log(vec![Expr::get(Expr::var("m"), "size"), Expr::method(Expr::var("m"), "get", vec![Expr::string("j")])]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "1 3\n");
}

#[test]
fn set_operations_es2025() {
    let seeded = |vals: Vec<f64>| {
        Expr::new_instance(Expr::var("Set"), vec![Expr::array(vals.into_iter().map(Expr::number).collect())])
    };
    let body = vec![
        Stmt::const_("a", seeded(vec![1.0, 2.0, 3.0])),
        Stmt::const_("b", seeded(vec![2.0, 3.0, 4.0])),
        Stmt::const_("u", Expr::method(Expr::var("a"), "union", vec![Expr::var("b")])),
        Stmt::const_("i", Expr::method(Expr::var("a"), "intersection", vec![Expr::var("b")])),
        log(vec![
            Expr::get(Expr::var("u"), "size"),
            Expr::get(Expr::var("i"), "size"),
            Expr::method(Expr::var("a"), "isSubsetOf", vec![Expr::var("u")]),
            Expr::method(Expr::var("a"), "isDisjointFrom", vec![Expr::var("b")]),
        ]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "4 2 true false\n");
}

#[test]
fn object_freeze_makes_delete_false_and_writes_silent() {
    let body = vec![
        Stmt::const_("o", Expr::object(vec![("k", Expr::number(1.0))])),
        Stmt::expr(Expr::method(Expr::var("Object"), "freeze", vec![Expr::var("o")])),
        Stmt::const_(
            "deleted",
            Expr::synth(tern_ast::ExprKind::Delete(Box::new(Expr::get(Expr::var("o"), "k")))),
        ),
        Stmt::expr(Expr::synth(tern_ast::ExprKind::Set {
            object: Box::new(Expr::var("o")),
            name: "k".to_string(),
            op: tern_ast::AssignOp::Assign,
            value: Box::new(Expr::number(99.0)),
        })),
        log(vec![
            Expr::var("deleted"),
            Expr::get(Expr::var("o"), "k"),
            Expr::method(Expr::var("Object"), "isFrozen", vec![Expr::var("o")]),
        ]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "false 1 true\n");
}

#[test]
fn object_keys_values_entries_agree_on_order() {
    let body = vec![
        Stmt::const_("o", Expr::object(vec![("z", Expr::number(1.0)), ("a", Expr::number(2.0))])),
        log(vec![
            Expr::method(Expr::var("Object"), "keys", vec![Expr::var("o")]),
            Expr::method(Expr::var("Object"), "values", vec![Expr::var("o")]),
        ]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "[ 'z', 'a' ] [ 1, 2 ]\n");
}

#[test]
fn symbols_with_equal_descriptions_differ() {
    let make = || Expr::call(Expr::var("Symbol"), vec![Expr::string("s")]);
    let body = vec![log(vec![Expr::binary(BinaryOp::EqEqEq, make(), make())])];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "false\n");
}

#[test]
fn regexp_literal_global_flag_tracks_last_index() {
    let body = vec![
        Stmt::const_("re", Expr::synth(tern_ast::ExprKind::RegexLiteral {
            pattern: "\\d+".to_string(),
            flags: "g".to_string(),
        })),
        Stmt::const_("first", Expr::method(Expr::var("re"), "exec", vec![Expr::string("a1b22")])),
        Stmt::const_("second", Expr::method(Expr::var("re"), "exec", vec![Expr::string("a1b22")])),
        log(vec![
            Expr::get_index(Expr::var("first"), Expr::number(0.0)),
            Expr::get_index(Expr::var("second"), Expr::number(0.0)),
            Expr::get(Expr::var("re"), "lastIndex"),
        ]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "1 22 5\n");
}

#[test]
fn string_methods_compose() {
    let body = vec![
        Stmt::const_("s", Expr::string("  Hello World  ")),
        log(vec![Expr::method(
            Expr::method(Expr::method(Expr::var("s"), "trim", vec![]), "toLowerCase", vec![]),
            "split",
            vec![Expr::string(" ")],
        )]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "[ 'hello', 'world' ]\n");
}

#[test]
fn array_callbacks_receive_element_and_index() {
    let body = vec![
        Stmt::const_("doubled", Expr::method(
            Expr::array(vec![Expr::number(1.0), Expr::number(2.0), Expr::number(3.0)]),
            "map",
            vec![arrow1(
                "x",
                vec![Stmt::ret(Some(Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::number(2.0))))],
            )],
        )),
        Stmt::const_("total", Expr::method(
            Expr::var("doubled"),
            "reduce",
            vec![
                Expr::synth(tern_ast::ExprKind::ArrowFunction(std::rc::Rc::new(tern_ast::decl::FunctionDecl::new(
                    None,
                    tern_ast::decl::FnKind::Arrow,
                    vec![tern_ast::decl::Param::required("acc"), tern_ast::decl::Param::required("x")],
                    vec![Stmt::ret(Some(Expr::binary(BinaryOp::Add, Expr::var("acc"), Expr::var("x"))))],
                )))),
                Expr::number(0.0),
            ],
        )),
        log(vec![Expr::var("total")]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "12\n");
}

#[test]
fn structured_clone_deep_copies() {
    let body = vec![
        Stmt::const_("a", Expr::object(vec![("inner", Expr::array(vec![Expr::number(1.0)]))])),
        Stmt::const_("b", Expr::call(Expr::var("structuredClone"), vec![Expr::var("a")])),
        Stmt::expr(Expr::method(Expr::get(Expr::var("b"), "inner"), "push", vec![Expr::number(2.0)])),
        log(vec![
            Expr::get(Expr::get(Expr::var("a"), "inner"), "length"),
            Expr::get(Expr::get(Expr::var("b"), "inner"), "length"),
        ]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "1 2\n");
}

#[test]
fn typed_arrays_are_zeroed_and_clamped() {
    let body = vec![
        Stmt::const_("ta", Expr::new_instance(Expr::var("Uint8Array"), vec![Expr::number(3.0)])),
        Stmt::expr(Expr::synth(tern_ast::ExprKind::SetIndex {
            object: Box::new(Expr::var("ta")),
            index: Box::new(Expr::number(0.0)),
            op: tern_ast::AssignOp::Assign,
            value: Box::new(Expr::number(300.0)),
        })),
        log(vec![
            Expr::get_index(Expr::var("ta"), Expr::number(0.0)),
            Expr::get_index(Expr::var("ta"), Expr::number(1.0)),
            Expr::get(Expr::var("ta"), "length"),
        ]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "44 0 3\n");
}

#[test]
fn buffer_round_trips_utf8() {
    let body = vec![
        Stmt::const_("b", Expr::method(Expr::var("Buffer"), "from", vec![Expr::string("hi")])),
        log(vec![
            Expr::method(Expr::var("b"), "toString", vec![Expr::string("utf8")]),
            Expr::method(Expr::var("Buffer"), "byteLength", vec![Expr::string("hi")]),
        ]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "hi 2\n");
}

#[test]
fn math_and_number_statics() {
    let body = vec![log(vec![
        Expr::method(Expr::var("Math"), "max", vec![Expr::number(1.0), Expr::number(9.0), Expr::number(4.0)]),
        Expr::method(Expr::var("Math"), "floor", vec![Expr::number(2.7)]),
        Expr::method(Expr::var("Number"), "isInteger", vec![Expr::number(2.0)]),
        Expr::call(Expr::var("parseInt"), vec![Expr::string("42px")]),
    ])];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "9 2 true 42\n");
}
