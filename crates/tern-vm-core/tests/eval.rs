//! Evaluator behavior: expressions, statements, control flow, functions,
//! classes, generators — driven straight through the interpreter with
//! hand-assembled trees.

use std::cell::Cell;
use std::rc::Rc;

use tern_ast::decl::{ClassMember, FnKind, FunctionDecl, MethodKind, Param};
use tern_ast::{
    ArrayPatternElem, AssignOp, BinaryOp, CatchClause, ClassDecl, Declarator, Expr, ExprKind, LogicalOp,
    ObjectPatternProp, Pattern, Resolutions, Stmt, SwitchCase, TypeMap, UnaryOp, VarKind,
};
use tern_vm_core::interp::SyncCx;
use tern_vm_core::{Interpreter, Value, VmError};

fn interpreter() -> Interpreter {
    Interpreter::new(Rc::new(Resolutions::new()), Rc::new(TypeMap::new()))
}

/// Run statements in a fresh scope, then evaluate `result` in it.
fn eval_program(stmts: Vec<Stmt>, result: Expr) -> Value {
    try_eval_program(stmts, result).expect("program should evaluate")
}

fn try_eval_program(stmts: Vec<Stmt>, result: Expr) -> Result<Value, VmError> {
    let mut vm = interpreter();
    let env = vm.globals.child();
    vm.run_statements(&SyncCx, &env, &stmts)?;
    vm.eval_expr(&SyncCx, &env, &result)
}

fn eval(expr: Expr) -> Value {
    eval_program(Vec::new(), expr)
}

fn num(v: &Value) -> f64 {
    v.as_number().unwrap_or_else(|| panic!("expected number, got {v:?}"))
}

fn function(name: &str, params: Vec<Param>, body: Vec<Stmt>) -> Stmt {
    Stmt::Function(Rc::new(FunctionDecl::new(Some(name), FnKind::Normal, params, body)))
}

fn generator(name: &str, params: Vec<Param>, body: Vec<Stmt>) -> Stmt {
    Stmt::Function(Rc::new(FunctionDecl::new(Some(name), FnKind::Generator, params, body)))
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[test]
fn arithmetic_and_string_concat() {
    assert_eq!(num(&eval(Expr::binary(BinaryOp::Add, Expr::number(2.0), Expr::number(3.0)))), 5.0);
    let concat = eval(Expr::binary(BinaryOp::Add, Expr::string("a"), Expr::number(1.0)));
    assert_eq!(concat.as_str(), Some("a1"));
    // array operand stringifies
    let arr = eval(Expr::binary(BinaryOp::Add, Expr::array(vec![Expr::number(1.0)]), Expr::array(vec![Expr::number(2.0)])));
    assert_eq!(arr.as_str(), Some("12"));
    let div = eval(Expr::binary(BinaryOp::Div, Expr::number(1.0), Expr::number(0.0)));
    assert_eq!(num(&div), f64::INFINITY);
}

#[test]
fn comparison_with_nan_is_always_false() {
    for op in [BinaryOp::Less, BinaryOp::LessEq, BinaryOp::Greater, BinaryOp::GreaterEq] {
        let v = eval(Expr::binary(op, Expr::number(f64::NAN), Expr::number(1.0)));
        assert_eq!(v.as_boolean(), Some(false));
    }
}

#[test]
fn logical_operators_short_circuit() {
    // (x = 1, false && (x = 2), x) == 1
    let stmts = vec![
        Stmt::let_("x", Expr::number(1.0)),
        Stmt::expr(Expr::synth(ExprKind::Logical {
            op: LogicalOp::And,
            left: Box::new(Expr::boolean(false)),
            right: Box::new(Expr::assign("x", Expr::number(2.0))),
        })),
    ];
    assert_eq!(num(&eval_program(stmts, Expr::var("x"))), 1.0);

    // nullish coalescing fires only on nullish
    let v = eval(Expr::synth(ExprKind::NullishCoalescing {
        left: Box::new(Expr::number(0.0)),
        right: Box::new(Expr::number(9.0)),
    }));
    assert_eq!(num(&v), 0.0);
    let v = eval(Expr::synth(ExprKind::NullishCoalescing {
        left: Box::new(Expr::null()),
        right: Box::new(Expr::number(9.0)),
    }));
    assert_eq!(num(&v), 9.0);
}

#[test]
fn typeof_table_and_unresolved_name() {
    assert_eq!(eval(Expr::unary(UnaryOp::Typeof, Expr::string("s"))).as_str(), Some("string"));
    assert_eq!(eval(Expr::unary(UnaryOp::Typeof, Expr::null())).as_str(), Some("object"));
    assert_eq!(eval(Expr::unary(UnaryOp::Typeof, Expr::array(vec![]))).as_str(), Some("object"));
    // typeof of an undeclared variable answers instead of throwing
    assert_eq!(eval(Expr::unary(UnaryOp::Typeof, Expr::var("never_declared"))).as_str(), Some("undefined"));
}

#[test]
fn optional_chaining_short_circuits_whole_chain() {
    // let o = undefined; o?.a.b evaluates to undefined without a TypeError
    let stmts = vec![Stmt::let_("o", Expr::undefined())];
    let chain = Expr::synth(ExprKind::Get {
        object: Box::new(Expr::synth(ExprKind::Get {
            object: Box::new(Expr::var("o")),
            name: "a".to_string(),
            optional: true,
        })),
        name: "b".to_string(),
        optional: false,
    });
    assert!(eval_program(stmts, chain).is_undefined());
}

#[test]
fn compound_and_logical_assignment() {
    let stmts = vec![
        Stmt::let_("x", Expr::number(10.0)),
        Stmt::expr(Expr::synth(ExprKind::Assign {
            name: "x".to_string(),
            op: AssignOp::Add,
            value: Box::new(Expr::number(5.0)),
        })),
        Stmt::let_("y", Expr::null()),
        Stmt::expr(Expr::synth(ExprKind::Assign {
            name: "y".to_string(),
            op: AssignOp::Nullish,
            value: Box::new(Expr::number(1.0)),
        })),
        // y is now 1 and non-nullish: no further write
        Stmt::expr(Expr::synth(ExprKind::Assign {
            name: "y".to_string(),
            op: AssignOp::Nullish,
            value: Box::new(Expr::number(99.0)),
        })),
    ];
    let v = eval_program(stmts, Expr::array(vec![Expr::var("x"), Expr::var("y")]));
    let a = v.as_array().unwrap();
    assert_eq!(num(&a.get(0)), 15.0);
    assert_eq!(num(&a.get(1)), 1.0);
}

#[test]
fn increments_prefix_and_postfix() {
    let stmts = vec![
        Stmt::let_("x", Expr::number(1.0)),
        Stmt::let_("post", Expr::synth(ExprKind::Postfix {
            op: tern_ast::IncOp::Increment,
            target: Box::new(Expr::var("x")),
        })),
        Stmt::let_("pre", Expr::synth(ExprKind::Prefix {
            op: tern_ast::IncOp::Increment,
            target: Box::new(Expr::var("x")),
        })),
    ];
    let v = eval_program(stmts, Expr::array(vec![Expr::var("post"), Expr::var("pre"), Expr::var("x")]));
    let a = v.as_array().unwrap();
    assert_eq!((num(&a.get(0)), num(&a.get(1)), num(&a.get(2))), (1.0, 3.0, 3.0));
}

#[test]
fn template_literals_and_tagged_raw_slot() {
    let stmts = vec![
        Stmt::let_("name", Expr::string("tern")),
        function(
            "tag",
            vec![Param::required("strings"), Param::rest("subs")],
            vec![Stmt::ret(Some(Expr::get(Expr::get(Expr::var("strings"), "raw"), "length")))],
        ),
    ];
    let template = Expr::synth(ExprKind::TemplateLiteral(vec![
        tern_ast::TemplatePart::Str("hello ".to_string()),
        tern_ast::TemplatePart::Expr(Expr::var("name")),
    ]));
    assert_eq!(eval_program(stmts.clone(), template).as_str(), Some("hello tern"));

    let tagged = Expr::synth(ExprKind::TaggedTemplate {
        tag: Box::new(Expr::var("tag")),
        cooked: vec!["a\n".to_string(), "b".to_string()],
        raw: vec!["a\\n".to_string(), "b".to_string()],
        exprs: vec![Expr::number(1.0)],
    });
    assert_eq!(num(&eval_program(stmts, tagged)), 2.0);
}

#[test]
fn delete_respects_frozen_receivers() {
    let stmts = vec![Stmt::let_("o", Expr::object(vec![("k", Expr::number(1.0))]))];
    let del = Expr::synth(ExprKind::Delete(Box::new(Expr::get(Expr::var("o"), "k"))));
    assert_eq!(eval_program(stmts, del).as_boolean(), Some(true));
}

// ---------------------------------------------------------------------------
// Statements & control flow
// ---------------------------------------------------------------------------

#[test]
fn block_scoping_shadows_and_restores() {
    let stmts = vec![
        Stmt::let_("x", Expr::number(1.0)),
        Stmt::Block(vec![
            Stmt::let_("x", Expr::number(2.0)),
            Stmt::expr(Expr::assign("x", Expr::number(3.0))),
        ]),
    ];
    assert_eq!(num(&eval_program(stmts, Expr::var("x"))), 1.0);
}

#[test]
fn const_assignment_throws_in_strict_scopes() {
    let mut vm = interpreter();
    let env = vm.globals.child();
    env.set_strict(true);
    let stmts = vec![
        Stmt::const_("c", Expr::number(1.0)),
        Stmt::expr(Expr::assign("c", Expr::number(2.0))),
    ];
    let err = vm.run_statements(&SyncCx, &env, &stmts).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));
}

#[test]
fn while_loop_with_break_and_continue() {
    // sum odd numbers below 10, stopping at 7
    let body = Stmt::Block(vec![
        Stmt::expr(Expr::synth(ExprKind::Assign {
            name: "i".to_string(),
            op: AssignOp::Add,
            value: Box::new(Expr::number(1.0)),
        })),
        Stmt::If {
            cond: Expr::binary(
                BinaryOp::EqEqEq,
                Expr::binary(BinaryOp::Mod, Expr::var("i"), Expr::number(2.0)),
                Expr::number(0.0),
            ),
            then: Box::new(Stmt::Continue(None)),
            otherwise: None,
        },
        Stmt::If {
            cond: Expr::binary(BinaryOp::Greater, Expr::var("i"), Expr::number(6.0)),
            then: Box::new(Stmt::Break(None)),
            otherwise: None,
        },
        Stmt::expr(Expr::synth(ExprKind::Assign {
            name: "sum".to_string(),
            op: AssignOp::Add,
            value: Box::new(Expr::var("i")),
        })),
    ]);
    let stmts = vec![
        Stmt::let_("i", Expr::number(0.0)),
        Stmt::let_("sum", Expr::number(0.0)),
        Stmt::While { cond: Expr::boolean(true), body: Box::new(body) },
    ];
    assert_eq!(num(&eval_program(stmts, Expr::var("sum"))), 9.0);
}

#[test]
fn labeled_break_exits_outer_loop() {
    // outer: for i in 0..3 { for j in 0..3 { if i==1 break outer; hits++ } }
    let inner_body = Stmt::Block(vec![
        Stmt::If {
            cond: Expr::binary(BinaryOp::EqEqEq, Expr::var("i"), Expr::number(1.0)),
            then: Box::new(Stmt::Break(Some("outer".to_string()))),
            otherwise: None,
        },
        Stmt::expr(Expr::synth(ExprKind::Assign {
            name: "hits".to_string(),
            op: AssignOp::Add,
            value: Box::new(Expr::number(1.0)),
        })),
    ]);
    let inner = Stmt::For {
        init: Some(Box::new(Stmt::let_("j", Expr::number(0.0)))),
        cond: Some(Expr::binary(BinaryOp::Less, Expr::var("j"), Expr::number(3.0))),
        increment: Some(Expr::synth(ExprKind::Prefix {
            op: tern_ast::IncOp::Increment,
            target: Box::new(Expr::var("j")),
        })),
        body: Box::new(inner_body),
    };
    let outer = Stmt::Labeled {
        label: "outer".to_string(),
        body: Box::new(Stmt::For {
            init: Some(Box::new(Stmt::let_("i", Expr::number(0.0)))),
            cond: Some(Expr::binary(BinaryOp::Less, Expr::var("i"), Expr::number(3.0))),
            increment: Some(Expr::synth(ExprKind::Prefix {
                op: tern_ast::IncOp::Increment,
                target: Box::new(Expr::var("i")),
            })),
            body: Box::new(inner),
        }),
    };
    let stmts = vec![Stmt::let_("hits", Expr::number(0.0)), outer];
    assert_eq!(num(&eval_program(stmts, Expr::var("hits"))), 3.0);
}

#[test]
fn switch_falls_through_without_break() {
    let cases = vec![
        SwitchCase { test: Some(Expr::number(1.0)), body: vec![Stmt::expr(Expr::assign("log", Expr::string("one")))] },
        SwitchCase {
            test: Some(Expr::number(2.0)),
            body: vec![Stmt::expr(Expr::synth(ExprKind::Assign {
                name: "log".to_string(),
                op: AssignOp::Add,
                value: Box::new(Expr::string("+two")),
            }))],
        },
        SwitchCase {
            test: None,
            body: vec![Stmt::expr(Expr::synth(ExprKind::Assign {
                name: "log".to_string(),
                op: AssignOp::Add,
                value: Box::new(Expr::string("+default")),
            }))],
        },
    ];
    let stmts = vec![
        Stmt::let_("log", Expr::string("")),
        Stmt::Switch { discriminant: Expr::number(1.0), cases },
    ];
    assert_eq!(eval_program(stmts, Expr::var("log")).as_str(), Some("one+two+default"));
}

#[test]
fn switch_matches_by_strict_equality() {
    let cases = vec![SwitchCase {
        test: Some(Expr::string("1")),
        body: vec![Stmt::expr(Expr::assign("hit", Expr::boolean(true))), Stmt::Break(None)],
    }];
    let stmts = vec![
        Stmt::let_("hit", Expr::boolean(false)),
        Stmt::Switch { discriminant: Expr::number(1.0), cases },
    ];
    assert_eq!(eval_program(stmts, Expr::var("hit")).as_boolean(), Some(false));
}

#[test]
fn try_catch_binds_thrown_value_and_finally_always_runs() {
    let stmts = vec![
        Stmt::let_("caught", Expr::undefined()),
        Stmt::let_("cleaned", Expr::boolean(false)),
        Stmt::TryCatch {
            try_block: vec![Stmt::Throw(Expr::string("boom"))],
            catch: Some(CatchClause {
                param: Some(Pattern::ident("e")),
                body: vec![Stmt::expr(Expr::assign("caught", Expr::var("e")))],
            }),
            finally: Some(vec![Stmt::expr(Expr::assign("cleaned", Expr::boolean(true)))]),
        },
    ];
    let v = eval_program(stmts, Expr::array(vec![Expr::var("caught"), Expr::var("cleaned")]));
    let a = v.as_array().unwrap();
    assert_eq!(a.get(0).as_str(), Some("boom"));
    assert_eq!(a.get(1).as_boolean(), Some(true));
}

#[test]
fn finally_replaces_pending_return() {
    let body = vec![Stmt::TryCatch {
        try_block: vec![Stmt::ret(Some(Expr::number(1.0)))],
        catch: None,
        finally: Some(vec![Stmt::ret(Some(Expr::number(2.0)))]),
    }];
    let stmts = vec![function("f", vec![], body)];
    assert_eq!(num(&eval_program(stmts, Expr::call(Expr::var("f"), vec![]))), 2.0);
}

#[test]
fn runtime_errors_materialize_as_error_objects_in_catch() {
    let stmts = vec![
        Stmt::let_("name", Expr::undefined()),
        Stmt::TryCatch {
            try_block: vec![Stmt::expr(Expr::call(Expr::number(5.0), vec![]))],
            catch: Some(CatchClause {
                param: Some(Pattern::ident("e")),
                body: vec![Stmt::expr(Expr::assign("name", Expr::get(Expr::var("e"), "name")))],
            }),
            finally: None,
        },
    ];
    assert_eq!(eval_program(stmts, Expr::var("name")).as_str(), Some("TypeError"));
}

#[test]
fn for_of_iterates_arrays_strings_and_maps() {
    // strings iterate by character
    let stmts = vec![
        Stmt::let_("out", Expr::string("")),
        Stmt::ForOf {
            binding: Pattern::ident("c"),
            iterable: Expr::string("abc"),
            body: Box::new(Stmt::expr(Expr::synth(ExprKind::Assign {
                name: "out".to_string(),
                op: AssignOp::Add,
                value: Box::new(Expr::var("c")),
            }))),
            is_await: false,
        },
    ];
    assert_eq!(eval_program(stmts, Expr::var("out")).as_str(), Some("abc"));
}

#[test]
fn for_in_enumerates_own_keys_in_insertion_order() {
    let stmts = vec![
        Stmt::let_("o", Expr::object(vec![("z", Expr::number(1.0)), ("a", Expr::number(2.0))])),
        Stmt::let_("keys", Expr::string("")),
        Stmt::ForIn {
            binding: "k".to_string(),
            object: Expr::var("o"),
            body: Box::new(Stmt::expr(Expr::synth(ExprKind::Assign {
                name: "keys".to_string(),
                op: AssignOp::Add,
                value: Box::new(Expr::var("k")),
            }))),
        },
    ];
    assert_eq!(eval_program(stmts, Expr::var("keys")).as_str(), Some("za"));
}

#[test]
fn using_disposes_in_reverse_declaration_order() {
    // two resources with dispose() appending their tag
    let make_resource = |tag: &str| {
        Expr::synth(ExprKind::ObjectLiteral(vec![tern_ast::ObjectProp::Keyed {
            key: "dispose".to_string(),
            value: Expr::synth(ExprKind::ArrowFunction(Rc::new(FunctionDecl::new(
                None,
                FnKind::Arrow,
                vec![],
                vec![Stmt::expr(Expr::synth(ExprKind::Assign {
                    name: "order".to_string(),
                    op: AssignOp::Add,
                    value: Box::new(Expr::string(tag)),
                }))],
            )))),
        }]))
    };
    let stmts = vec![
        Stmt::let_("order", Expr::string("")),
        Stmt::Block(vec![
            Stmt::Using { name: "a".to_string(), init: make_resource("a"), is_await: false },
            Stmt::Using { name: "b".to_string(), init: make_resource("b"), is_await: false },
        ]),
    ];
    assert_eq!(eval_program(stmts, Expr::var("order")).as_str(), Some("ba"));
}

// ---------------------------------------------------------------------------
// Functions & destructuring
// ---------------------------------------------------------------------------

#[test]
fn closures_share_captured_bindings() {
    let stmts = vec![
        function(
            "counter",
            vec![],
            vec![
                Stmt::let_("count", Expr::number(0.0)),
                Stmt::ret(Some(Expr::synth(ExprKind::ArrowFunction(Rc::new(FunctionDecl::new(
                    None,
                    FnKind::Arrow,
                    vec![],
                    vec![Stmt::ret(Some(Expr::synth(ExprKind::Prefix {
                        op: tern_ast::IncOp::Increment,
                        target: Box::new(Expr::var("count")),
                    })))],
                )))))),
            ],
        ),
        Stmt::const_("tick", Expr::call(Expr::var("counter"), vec![])),
        Stmt::expr(Expr::call(Expr::var("tick"), vec![])),
        Stmt::expr(Expr::call(Expr::var("tick"), vec![])),
    ];
    assert_eq!(num(&eval_program(stmts, Expr::call(Expr::var("tick"), vec![]))), 3.0);
}

#[test]
fn parameter_binding_defaults_optionals_rest() {
    let stmts = vec![function(
        "f",
        vec![
            Param::required("a"),
            Param::defaulted("b", Expr::number(10.0)),
            Param::optional("c"),
            Param::rest("rest"),
        ],
        vec![Stmt::ret(Some(Expr::array(vec![
            Expr::var("a"),
            Expr::var("b"),
            Expr::unary(UnaryOp::Typeof, Expr::var("c")),
            Expr::get(Expr::var("rest"), "length"),
        ])))],
    )];
    let v = eval_program(
        stmts,
        Expr::call(Expr::var("f"), vec![Expr::number(1.0), Expr::undefined(), Expr::undefined(), Expr::number(7.0), Expr::number(8.0)]),
    );
    let a = v.as_array().unwrap();
    assert_eq!(num(&a.get(0)), 1.0);
    assert_eq!(num(&a.get(1)), 10.0);
    assert_eq!(a.get(2).as_str(), Some("undefined"));
    assert_eq!(num(&a.get(3)), 2.0);
}

#[test]
fn missing_required_argument_fails() {
    let stmts = vec![function("f", vec![Param::required("a")], vec![Stmt::ret(None)])];
    let err = try_eval_program(stmts, Expr::call(Expr::var("f"), vec![])).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));
}

#[test]
fn array_destructuring_with_defaults_and_rest() {
    let pattern = Pattern::Array {
        elements: vec![
            Some(ArrayPatternElem { binding: Pattern::ident("first"), default: None }),
            None,
            Some(ArrayPatternElem { binding: Pattern::ident("third"), default: Some(Expr::number(30.0)) }),
        ],
        rest: Some("tail".to_string()),
    };
    let stmts = vec![Stmt::VarDecl {
        kind: VarKind::Let,
        declarations: vec![Declarator {
            target: pattern,
            init: Some(Expr::array(vec![
                Expr::number(1.0),
                Expr::number(2.0),
                Expr::undefined(),
                Expr::number(4.0),
                Expr::number(5.0),
            ])),
        }],
    }];
    let v = eval_program(
        stmts,
        Expr::array(vec![Expr::var("first"), Expr::var("third"), Expr::get(Expr::var("tail"), "length")]),
    );
    let a = v.as_array().unwrap();
    assert_eq!((num(&a.get(0)), num(&a.get(1)), num(&a.get(2))), (1.0, 30.0, 2.0));
}

#[test]
fn object_destructuring_rename_default_and_rest() {
    let pattern = Pattern::Object {
        props: vec![
            ObjectPatternProp { key: "a".to_string(), binding: Pattern::ident("renamed"), default: None },
            ObjectPatternProp { key: "missing".to_string(), binding: Pattern::ident("m"), default: Some(Expr::number(5.0)) },
        ],
        rest: Some("others".to_string()),
    };
    let stmts = vec![Stmt::VarDecl {
        kind: VarKind::Const,
        declarations: vec![Declarator {
            target: pattern,
            init: Some(Expr::object(vec![
                ("a", Expr::number(1.0)),
                ("b", Expr::number(2.0)),
                ("c", Expr::number(3.0)),
            ])),
        }],
    }];
    let v = eval_program(
        stmts,
        Expr::array(vec![
            Expr::var("renamed"),
            Expr::var("m"),
            Expr::method(Expr::var("others"), "hasOwnProperty", vec![Expr::string("a")]),
            Expr::method(Expr::var("others"), "hasOwnProperty", vec![Expr::string("b")]),
        ]),
    );
    let a = v.as_array().unwrap();
    assert_eq!(num(&a.get(0)), 1.0);
    assert_eq!(num(&a.get(1)), 5.0);
    assert_eq!(a.get(2).as_boolean(), Some(false));
    assert_eq!(a.get(3).as_boolean(), Some(true));
}

#[test]
fn spread_expands_immediately_before_invocation() {
    let stmts = vec![
        function(
            "sum3",
            vec![Param::required("a"), Param::required("b"), Param::required("c")],
            vec![Stmt::ret(Some(Expr::binary(
                BinaryOp::Add,
                Expr::binary(BinaryOp::Add, Expr::var("a"), Expr::var("b")),
                Expr::var("c"),
            )))],
        ),
        Stmt::let_("args", Expr::array(vec![Expr::number(1.0), Expr::number(2.0), Expr::number(3.0)])),
    ];
    let call = Expr::synth(ExprKind::Call {
        callee: Box::new(Expr::var("sum3")),
        args: vec![tern_ast::Element::Spread(Expr::var("args"))],
        optional: false,
    });
    assert_eq!(num(&eval_program(stmts, call)), 6.0);
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

fn method(name: &str, params: Vec<Param>, body: Vec<Stmt>) -> ClassMember {
    ClassMember::Method {
        name: name.to_string(),
        func: Rc::new(FunctionDecl::new(Some(name), FnKind::Normal, params, body)),
        kind: MethodKind::Method,
        is_static: false,
        is_private: false,
        decorators: vec![],
    }
}

#[test]
fn class_fields_methods_and_this() {
    let decl = ClassDecl::new(
        "Point",
        None,
        vec![
            ClassMember::Field {
                name: "x".to_string(),
                init: Some(Expr::number(1.0)),
                is_static: false,
                is_private: false,
                decorators: vec![],
            },
            method(
                "double",
                vec![],
                vec![Stmt::ret(Some(Expr::binary(
                    BinaryOp::Mul,
                    Expr::get(Expr::synth(ExprKind::This), "x"),
                    Expr::number(2.0),
                )))],
            ),
        ],
    );
    let stmts = vec![
        Stmt::Class(Rc::new(decl)),
        Stmt::const_("p", Expr::new_instance(Expr::var("Point"), vec![])),
    ];
    assert_eq!(num(&eval_program(stmts, Expr::method(Expr::var("p"), "double", vec![]))), 2.0);
}

#[test]
fn inheritance_super_calls_and_instanceof() {
    let base = ClassDecl::new(
        "Base",
        None,
        vec![
            method("describe", vec![], vec![Stmt::ret(Some(Expr::string("base")))]),
            method(
                "constructor",
                vec![Param::required("v")],
                vec![Stmt::expr(Expr::synth(ExprKind::Set {
                    object: Box::new(Expr::synth(ExprKind::This)),
                    name: "v".to_string(),
                    op: AssignOp::Assign,
                    value: Box::new(Expr::var("v")),
                }))],
            ),
        ],
    );
    let derived = ClassDecl::new(
        "Derived",
        Some(Expr::var("Base")),
        vec![
            method(
                "constructor",
                vec![],
                vec![Stmt::expr(Expr::synth(ExprKind::Call {
                    callee: Box::new(Expr::synth(ExprKind::Super { member: None })),
                    args: vec![tern_ast::Element::Item(Expr::number(42.0))],
                    optional: false,
                }))],
            ),
            method(
                "describe",
                vec![],
                vec![Stmt::ret(Some(Expr::binary(
                    BinaryOp::Add,
                    Expr::synth(ExprKind::Call {
                        callee: Box::new(Expr::synth(ExprKind::Super { member: Some("describe".to_string()) })),
                        args: vec![],
                        optional: false,
                    }),
                    Expr::string("+derived"),
                )))],
            ),
        ],
    );
    let stmts = vec![
        Stmt::Class(Rc::new(base)),
        Stmt::Class(Rc::new(derived)),
        Stmt::const_("d", Expr::new_instance(Expr::var("Derived"), vec![])),
    ];
    let v = eval_program(
        stmts,
        Expr::array(vec![
            Expr::method(Expr::var("d"), "describe", vec![]),
            Expr::get(Expr::var("d"), "v"),
            Expr::binary(BinaryOp::Instanceof, Expr::var("d"), Expr::var("Base")),
        ]),
    );
    let a = v.as_array().unwrap();
    assert_eq!(a.get(0).as_str(), Some("base+derived"));
    assert_eq!(num(&a.get(1)), 42.0);
    assert_eq!(a.get(2).as_boolean(), Some(true));
}

#[test]
fn getters_and_setters_dispatch_through_the_class() {
    let decl = ClassDecl::new(
        "Box",
        None,
        vec![
            ClassMember::Field {
                name: "raw".to_string(),
                init: Some(Expr::number(0.0)),
                is_static: false,
                is_private: false,
                decorators: vec![],
            },
            ClassMember::Method {
                name: "value".to_string(),
                func: Rc::new(FunctionDecl::new(
                    Some("value"),
                    FnKind::Normal,
                    vec![],
                    vec![Stmt::ret(Some(Expr::get(Expr::synth(ExprKind::This), "raw")))],
                )),
                kind: MethodKind::Getter,
                is_static: false,
                is_private: false,
                decorators: vec![],
            },
            ClassMember::Method {
                name: "value".to_string(),
                func: Rc::new(FunctionDecl::new(
                    Some("value"),
                    FnKind::Normal,
                    vec![Param::required("v")],
                    vec![Stmt::expr(Expr::synth(ExprKind::Set {
                        object: Box::new(Expr::synth(ExprKind::This)),
                        name: "raw".to_string(),
                        op: AssignOp::Assign,
                        value: Box::new(Expr::binary(BinaryOp::Mul, Expr::var("v"), Expr::number(2.0))),
                    }))],
                )),
                kind: MethodKind::Setter,
                is_static: false,
                is_private: false,
                decorators: vec![],
            },
        ],
    );
    let stmts = vec![
        Stmt::Class(Rc::new(decl)),
        Stmt::const_("b", Expr::new_instance(Expr::var("Box"), vec![])),
        Stmt::expr(Expr::synth(ExprKind::Set {
            object: Box::new(Expr::var("b")),
            name: "value".to_string(),
            op: AssignOp::Assign,
            value: Box::new(Expr::number(21.0)),
        })),
    ];
    assert_eq!(num(&eval_program(stmts, Expr::get(Expr::var("b"), "value"))), 42.0);
}

#[test]
fn static_members_and_static_blocks_run_in_order() {
    let decl = ClassDecl::new(
        "Config",
        None,
        vec![
            ClassMember::Field {
                name: "count".to_string(),
                init: Some(Expr::number(1.0)),
                is_static: true,
                is_private: false,
                decorators: vec![],
            },
            ClassMember::StaticBlock(vec![Stmt::expr(Expr::synth(ExprKind::Set {
                object: Box::new(Expr::synth(ExprKind::This)),
                name: "count".to_string(),
                op: AssignOp::Add,
                value: Box::new(Expr::number(10.0)),
            }))]),
        ],
    );
    let stmts = vec![Stmt::Class(Rc::new(decl))];
    assert_eq!(num(&eval_program(stmts, Expr::get(Expr::var("Config"), "count"))), 11.0);
}

#[test]
fn private_fields_require_the_declaring_brand() {
    let brand: tern_ast::BrandSlot = Rc::new(Cell::new(0));
    let mut decl = ClassDecl::new(
        "Vault",
        None,
        vec![
            ClassMember::Field {
                name: "secret".to_string(),
                init: Some(Expr::number(7.0)),
                is_static: false,
                is_private: true,
                decorators: vec![],
            },
            method(
                "reveal",
                vec![],
                vec![Stmt::ret(Some(Expr::synth(ExprKind::GetPrivate {
                    object: Box::new(Expr::synth(ExprKind::This)),
                    name: "secret".to_string(),
                    class_id: brand.clone(),
                })))],
            ),
        ],
    );
    decl.brand = brand;
    let stmts = vec![
        Stmt::Class(Rc::new(decl)),
        Stmt::const_("v", Expr::new_instance(Expr::var("Vault"), vec![])),
    ];
    assert_eq!(num(&eval_program(stmts.clone(), Expr::method(Expr::var("v"), "reveal", vec![]))), 7.0);

    // an access site with a foreign brand fails the check
    let foreign = Expr::synth(ExprKind::GetPrivate {
        object: Box::new(Expr::var("v")),
        name: "secret".to_string(),
        class_id: Rc::new(Cell::new(0)),
    });
    let err = try_eval_program(stmts, foreign).unwrap_err();
    assert!(matches!(err, VmError::TypeError(_)));
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn next_value(r#gen: &str) -> Expr {
    Expr::get(Expr::method(Expr::var(r#gen), "next", vec![]), "value")
}

#[test]
fn generator_yields_in_sequence_then_stays_done() {
    let stmts = vec![
        generator(
            "gen",
            vec![],
            vec![
                Stmt::expr(Expr::yield_(Some(Expr::number(1.0)))),
                Stmt::expr(Expr::yield_(Some(Expr::number(2.0)))),
                Stmt::ret(Some(Expr::number(3.0))),
            ],
        ),
        Stmt::const_("g", Expr::call(Expr::var("gen"), vec![])),
        Stmt::let_("a", next_value("g")),
        Stmt::let_("b", next_value("g")),
        Stmt::const_("third", Expr::method(Expr::var("g"), "next", vec![])),
        Stmt::const_("fourth", Expr::method(Expr::var("g"), "next", vec![])),
    ];
    let v = eval_program(
        stmts,
        Expr::array(vec![
            Expr::var("a"),
            Expr::var("b"),
            Expr::get(Expr::var("third"), "value"),
            Expr::get(Expr::var("third"), "done"),
            Expr::get(Expr::var("fourth"), "done"),
            Expr::unary(UnaryOp::Typeof, Expr::get(Expr::var("fourth"), "value")),
        ]),
    );
    let a = v.as_array().unwrap();
    assert_eq!(num(&a.get(0)), 1.0);
    assert_eq!(num(&a.get(1)), 2.0);
    assert_eq!(num(&a.get(2)), 3.0);
    assert_eq!(a.get(3).as_boolean(), Some(true));
    assert_eq!(a.get(4).as_boolean(), Some(true));
    assert_eq!(a.get(5).as_str(), Some("undefined"));
}

#[test]
fn generator_receives_sent_values() {
    // function* echo() { const x = yield 1; yield x * 10; }
    let stmts = vec![
        generator(
            "echo",
            vec![],
            vec![
                Stmt::const_("x", Expr::yield_(Some(Expr::number(1.0)))),
                Stmt::expr(Expr::yield_(Some(Expr::binary(BinaryOp::Mul, Expr::var("x"), Expr::number(10.0))))),
            ],
        ),
        Stmt::const_("g", Expr::call(Expr::var("echo"), vec![])),
        Stmt::expr(Expr::method(Expr::var("g"), "next", vec![])),
        Stmt::const_("out", Expr::method(Expr::var("g"), "next", vec![Expr::number(4.0)])),
    ];
    assert_eq!(num(&eval_program(stmts, Expr::get(Expr::var("out"), "value"))), 40.0);
}

#[test]
fn generator_delegation_over_arrays() {
    // function* outer() { yield* [1,2]; yield 3 }
    let stmts = vec![
        generator(
            "outer",
            vec![],
            vec![
                Stmt::expr(Expr::yield_from(Expr::array(vec![Expr::number(1.0), Expr::number(2.0)]))),
                Stmt::expr(Expr::yield_(Some(Expr::number(3.0)))),
            ],
        ),
        Stmt::const_("g", Expr::call(Expr::var("outer"), vec![])),
        Stmt::let_("a", next_value("g")),
        Stmt::let_("b", next_value("g")),
        Stmt::let_("c", next_value("g")),
        Stmt::const_("end", Expr::method(Expr::var("g"), "next", vec![])),
    ];
    let v = eval_program(
        stmts,
        Expr::array(vec![Expr::var("a"), Expr::var("b"), Expr::var("c"), Expr::get(Expr::var("end"), "done")]),
    );
    let a = v.as_array().unwrap();
    assert_eq!((num(&a.get(0)), num(&a.get(1)), num(&a.get(2))), (1.0, 2.0, 3.0));
    assert_eq!(a.get(3).as_boolean(), Some(true));
}

#[test]
fn generator_delegates_through_inner_generators() {
    let stmts = vec![
        generator("inner", vec![], vec![Stmt::expr(Expr::yield_(Some(Expr::string("i"))))]),
        generator(
            "outer",
            vec![],
            vec![
                Stmt::expr(Expr::yield_from(Expr::call(Expr::var("inner"), vec![]))),
                Stmt::expr(Expr::yield_(Some(Expr::string("o")))),
            ],
        ),
        Stmt::const_("g", Expr::call(Expr::var("outer"), vec![])),
        Stmt::let_("a", next_value("g")),
        Stmt::let_("b", next_value("g")),
    ];
    let v = eval_program(stmts, Expr::array(vec![Expr::var("a"), Expr::var("b")]));
    let a = v.as_array().unwrap();
    assert_eq!(a.get(0).as_str(), Some("i"));
    assert_eq!(a.get(1).as_str(), Some("o"));
}

#[test]
fn generator_loops_hoist_state_across_yields() {
    // function* range(n) { for (let i = 0; i < n; i++) yield i }
    let stmts = vec![
        generator(
            "range",
            vec![Param::required("n")],
            vec![Stmt::For {
                init: Some(Box::new(Stmt::let_("i", Expr::number(0.0)))),
                cond: Some(Expr::binary(BinaryOp::Less, Expr::var("i"), Expr::var("n"))),
                increment: Some(Expr::synth(ExprKind::Prefix {
                    op: tern_ast::IncOp::Increment,
                    target: Box::new(Expr::var("i")),
                })),
                body: Box::new(Stmt::expr(Expr::yield_(Some(Expr::var("i"))))),
            }],
        ),
        Stmt::let_("sum", Expr::number(0.0)),
        Stmt::ForOf {
            binding: Pattern::ident("v"),
            iterable: Expr::call(Expr::var("range"), vec![Expr::number(5.0)]),
            body: Box::new(Stmt::expr(Expr::synth(ExprKind::Assign {
                name: "sum".to_string(),
                op: AssignOp::Add,
                value: Box::new(Expr::var("v")),
            }))),
            is_await: false,
        },
    ];
    assert_eq!(num(&eval_program(stmts, Expr::var("sum"))), 10.0);
}

#[test]
fn generator_return_runs_pending_finally() {
    // function* g() { try { yield 1; yield 2 } finally { seen = true } }
    let stmts = vec![
        Stmt::let_("seen", Expr::boolean(false)),
        Stmt::Function(Rc::new(FunctionDecl::new(
            Some("g"),
            FnKind::Generator,
            vec![],
            vec![Stmt::TryCatch {
                try_block: vec![
                    Stmt::expr(Expr::yield_(Some(Expr::number(1.0)))),
                    Stmt::expr(Expr::yield_(Some(Expr::number(2.0)))),
                ],
                catch: None,
                finally: Some(vec![Stmt::expr(Expr::assign("seen", Expr::boolean(true)))]),
            }],
        ))),
        Stmt::const_("it", Expr::call(Expr::var("g"), vec![])),
        Stmt::expr(Expr::method(Expr::var("it"), "next", vec![])),
        Stmt::const_("out", Expr::method(Expr::var("it"), "return", vec![Expr::number(99.0)])),
    ];
    let v = eval_program(
        stmts,
        Expr::array(vec![Expr::var("seen"), Expr::get(Expr::var("out"), "value"), Expr::get(Expr::var("out"), "done")]),
    );
    let a = v.as_array().unwrap();
    assert_eq!(a.get(0).as_boolean(), Some(true));
    assert_eq!(num(&a.get(1)), 99.0);
    assert_eq!(a.get(2).as_boolean(), Some(true));
}

#[test]
fn generator_throw_is_catchable_at_the_suspension_point() {
    let stmts = vec![
        Stmt::Function(Rc::new(FunctionDecl::new(
            Some("g"),
            FnKind::Generator,
            vec![],
            vec![Stmt::TryCatch {
                try_block: vec![Stmt::expr(Expr::yield_(Some(Expr::number(1.0))))],
                catch: Some(CatchClause {
                    param: Some(Pattern::ident("e")),
                    body: vec![Stmt::expr(Expr::yield_(Some(Expr::var("e"))))],
                }),
                finally: None,
            }],
        ))),
        Stmt::const_("it", Expr::call(Expr::var("g"), vec![])),
        Stmt::expr(Expr::method(Expr::var("it"), "next", vec![])),
        Stmt::const_("out", Expr::method(Expr::var("it"), "throw", vec![Expr::string("oops")])),
    ];
    assert_eq!(eval_program(stmts, Expr::get(Expr::var("out"), "value")).as_str(), Some("oops"));
}

// ---------------------------------------------------------------------------
// Enums & namespaces
// ---------------------------------------------------------------------------

#[test]
fn enums_get_forward_and_reverse_mappings() {
    let decl = tern_ast::EnumDecl {
        name: "Color".to_string(),
        members: vec![
            tern_ast::EnumMember { name: "Red".to_string(), init: None },
            tern_ast::EnumMember { name: "Green".to_string(), init: None },
            tern_ast::EnumMember { name: "Label".to_string(), init: Some(Expr::string("tag")) },
        ],
        is_const: false,
    };
    let stmts = vec![Stmt::Enum(decl)];
    let v = eval_program(
        stmts,
        Expr::array(vec![
            Expr::get(Expr::var("Color"), "Red"),
            Expr::get(Expr::var("Color"), "Green"),
            Expr::get_index(Expr::var("Color"), Expr::number(1.0)),
            Expr::get(Expr::var("Color"), "Label"),
        ]),
    );
    let a = v.as_array().unwrap();
    assert_eq!(num(&a.get(0)), 0.0);
    assert_eq!(num(&a.get(1)), 1.0);
    assert_eq!(a.get(2).as_str(), Some("Green"));
    assert_eq!(a.get(3).as_str(), Some("tag"));
}

#[test]
fn namespaces_merge_additively() {
    let ns = |exported: Stmt| Stmt::Namespace {
        name: "N".to_string(),
        body: vec![Stmt::Export(tern_ast::ExportDecl::Decl(Box::new(exported)))],
    };
    let stmts = vec![
        ns(Stmt::const_("a", Expr::number(1.0))),
        ns(Stmt::const_("b", Expr::number(2.0))),
    ];
    let v = eval_program(
        stmts,
        Expr::array(vec![Expr::get(Expr::var("N"), "a"), Expr::get(Expr::var("N"), "b")]),
    );
    let a = v.as_array().unwrap();
    assert_eq!((num(&a.get(0)), num(&a.get(1))), (1.0, 2.0));
}

// ---------------------------------------------------------------------------
// Resolver-directed lookup
// ---------------------------------------------------------------------------

#[test]
fn resolver_depth_pins_variable_lookup() {
    use tern_ast::NodeId;
    // two scopes each defining `x`; the resolved read targets the outer one
    let mut resolutions = Resolutions::new();
    let read_id = NodeId(1);
    resolutions.record(read_id, 1);

    let mut vm = Interpreter::new(Rc::new(resolutions), Rc::new(TypeMap::new()));
    let outer = vm.globals.child();
    outer.define("x", Value::Number(1.0));
    let inner = outer.child();
    inner.define("x", Value::Number(2.0));

    let read = Expr::new(read_id, ExprKind::Variable("x".to_string()));
    let v = vm.eval_expr(&SyncCx, &inner, &read).unwrap();
    assert_eq!(v.as_number(), Some(1.0));

    // without a recorded depth the chain walk finds the nearest binding
    let unresolved = Expr::var("x");
    let v = vm.eval_expr(&SyncCx, &inner, &unresolved).unwrap();
    assert_eq!(v.as_number(), Some(2.0));
}
