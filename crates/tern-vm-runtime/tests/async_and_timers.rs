//! Async functions, await, promises, timers and loop ordering.

mod common;

use common::{arrow, arrow1, async_fn, log, run_module};

use tern_ast::decl::Param;
use tern_ast::{CatchClause, Expr, ExprKind, Pattern, Stmt};

#[test]
fn async_return_resolves_and_await_unwraps() {
    // async function f() { return 5 }  console.log(await f(), await 7)
    let body = vec![
        async_fn("f", vec![], vec![Stmt::ret(Some(Expr::number(5.0)))]),
        log(vec![
            Expr::await_(Expr::call(Expr::var("f"), vec![])),
            Expr::await_(Expr::number(7.0)),
        ]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "5 7\n");
}

#[test]
fn async_throw_rejects_and_catch_binds_reason() {
    let body = vec![
        async_fn("boom", vec![], vec![Stmt::Throw(Expr::string("reason"))]),
        Stmt::TryCatch {
            try_block: vec![Stmt::expr(Expr::await_(Expr::call(Expr::var("boom"), vec![])))],
            catch: Some(CatchClause {
                param: Some(Pattern::ident("e")),
                body: vec![log(vec![Expr::string("caught"), Expr::var("e")])],
            }),
            finally: None,
        },
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "caught reason\n");
}

#[test]
fn await_promise_resolve_is_identity() {
    // console.log((await Promise.resolve(3)) === 3)
    let resolved = Expr::method(Expr::var("Promise"), "resolve", vec![Expr::number(3.0)]);
    let body = vec![log(vec![Expr::binary(
        tern_ast::BinaryOp::EqEqEq,
        Expr::await_(resolved),
        Expr::number(3.0),
    )])];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "true\n");
}

#[test]
fn async_finally_completes_before_pending_throw_continues() {
    // async function cleanup() { console.log("c") }
    // try { try { throw "e" } finally { await cleanup() } } catch (e) { console.log("caught", e) }
    let body = vec![
        async_fn("cleanup", vec![], vec![log(vec![Expr::string("c")])]),
        Stmt::TryCatch {
            try_block: vec![Stmt::TryCatch {
                try_block: vec![Stmt::Throw(Expr::string("e"))],
                catch: None,
                finally: Some(vec![Stmt::expr(Expr::await_(Expr::call(Expr::var("cleanup"), vec![])))]),
            }],
            catch: Some(CatchClause {
                param: Some(Pattern::ident("e")),
                body: vec![log(vec![Expr::string("caught"), Expr::var("e")])],
            }),
            finally: None,
        },
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "c\ncaught e\n");
}

#[test]
fn then_chains_run_as_microtasks() {
    // Promise.resolve(2).then(x => x * 2).then(x => console.log(x))
    let chain = Expr::method(
        Expr::method(
            Expr::method(Expr::var("Promise"), "resolve", vec![Expr::number(2.0)]),
            "then",
            vec![arrow1(
                "x",
                vec![Stmt::ret(Some(Expr::binary(tern_ast::BinaryOp::Mul, Expr::var("x"), Expr::number(2.0))))],
            )],
        ),
        "then",
        vec![arrow1("x", vec![log(vec![Expr::var("x")])])],
    );
    let (_, out, _) = run_module(vec![Stmt::expr(chain)]);
    assert_eq!(out, "4\n");
}

#[test]
fn promise_executor_with_timer_resolution() {
    // const p = new Promise(res => setTimeout(() => res(9), 20)); console.log(await p)
    let executor = arrow1(
        "res",
        vec![Stmt::expr(Expr::call(
            Expr::var("setTimeout"),
            vec![arrow(vec![Stmt::expr(Expr::call(Expr::var("res"), vec![Expr::number(9.0)]))]), Expr::number(20.0)],
        ))],
    );
    let body = vec![
        Stmt::const_("p", Expr::new_instance(Expr::var("Promise"), vec![executor])),
        log(vec![Expr::await_(Expr::var("p"))]),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "9\n");
}

#[test]
fn promise_all_aggregates_in_order() {
    let all = Expr::method(
        Expr::var("Promise"),
        "all",
        vec![Expr::array(vec![
            Expr::method(Expr::var("Promise"), "resolve", vec![Expr::number(1.0)]),
            Expr::number(2.0),
        ])],
    );
    let body = vec![log(vec![Expr::await_(all)])];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "[ 1, 2 ]\n");
}

#[test]
fn cancelled_timer_never_fires() {
    // const t = setTimeout(() => console.log("cancelled"), 50); clearTimeout(t);
    // setTimeout(() => console.log("other"), 80);
    let body = vec![
        Stmt::const_(
            "t",
            Expr::call(
                Expr::var("setTimeout"),
                vec![arrow(vec![log(vec![Expr::string("cancelled")])]), Expr::number(50.0)],
            ),
        ),
        Stmt::expr(Expr::call(Expr::var("clearTimeout"), vec![Expr::var("t")])),
        Stmt::expr(Expr::call(
            Expr::var("setTimeout"),
            vec![arrow(vec![log(vec![Expr::string("other")])]), Expr::number(80.0)],
        )),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "other\n");
}

#[test]
fn interval_reschedules_until_cleared() {
    // let n = 0; const t = setInterval(() => { n++; console.log(n); if (n >= 3) clearInterval(t) }, 5)
    let callback = arrow(vec![
        Stmt::expr(Expr::synth(ExprKind::Prefix {
            op: tern_ast::IncOp::Increment,
            target: Box::new(Expr::var("n")),
        })),
        log(vec![Expr::var("n")]),
        Stmt::If {
            cond: Expr::binary(tern_ast::BinaryOp::GreaterEq, Expr::var("n"), Expr::number(3.0)),
            then: Box::new(Stmt::expr(Expr::call(Expr::var("clearInterval"), vec![Expr::var("t")]))),
            otherwise: None,
        },
    ]);
    let body = vec![
        Stmt::let_("n", Expr::number(0.0)),
        Stmt::const_("t", Expr::call(Expr::var("setInterval"), vec![callback, Expr::number(5.0)])),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "1\n2\n3\n");
}

#[test]
fn equal_deadlines_fire_in_insertion_order() {
    let body = vec![
        Stmt::expr(Expr::call(
            Expr::var("setTimeout"),
            vec![arrow(vec![log(vec![Expr::string("a")])]), Expr::number(0.0)],
        )),
        Stmt::expr(Expr::call(
            Expr::var("setTimeout"),
            vec![arrow(vec![log(vec![Expr::string("b")])]), Expr::number(0.0)],
        )),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "a\nb\n");
}

#[test]
fn next_tick_rides_the_zero_delay_lane_fifo() {
    let next_tick = Expr::get(Expr::var("process"), "nextTick");
    let body = vec![
        Stmt::expr(Expr::call(next_tick.clone(), vec![arrow(vec![log(vec![Expr::string("tick1")])])])),
        Stmt::expr(Expr::call(next_tick, vec![arrow(vec![log(vec![Expr::string("tick2")])])])),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "tick1\ntick2\n");
}

#[test]
fn queue_microtask_runs_before_timers() {
    let body = vec![
        Stmt::expr(Expr::call(
            Expr::var("setTimeout"),
            vec![arrow(vec![log(vec![Expr::string("timer")])]), Expr::number(0.0)],
        )),
        Stmt::expr(Expr::call(Expr::var("queueMicrotask"), vec![arrow(vec![log(vec![Expr::string("micro")])])])),
    ];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "micro\ntimer\n");
}

#[test]
fn timer_callback_arguments_pass_through() {
    // setTimeout((a, b) => console.log(a + b), 0, 40, 2)
    let callback = Expr::synth(ExprKind::ArrowFunction(std::rc::Rc::new(tern_ast::decl::FunctionDecl::new(
        None,
        tern_ast::decl::FnKind::Arrow,
        vec![Param::required("a"), Param::required("b")],
        vec![log(vec![Expr::binary(tern_ast::BinaryOp::Add, Expr::var("a"), Expr::var("b"))])],
    ))));
    let body = vec![Stmt::expr(Expr::call(
        Expr::var("setTimeout"),
        vec![callback, Expr::number(0.0), Expr::number(40.0), Expr::number(2.0)],
    ))];
    let (_, out, _) = run_module(body);
    assert_eq!(out, "42\n");
}
