//! Execution context integration tests
//!
//! Scripts, error snapshots, value handles and termination against live
//! isolates. Each test owns one context on its own thread.

mod common;

use std::thread;
use std::time::Duration;

use common::{context, eval, init_tracing};
use v8bridge::{Context, ContextConfig, HandleError};

#[test]
fn test_run_returns_value() {
    let mut ctx = context();

    let handle = ctx.run("1+1", "test.js").unwrap();
    assert_eq!(ctx.value_to_string(&handle).unwrap(), "2");
    assert_eq!(handle.context(), ctx.id());
}

#[test]
fn test_statement_result_is_undefined() {
    let mut ctx = context();

    assert_eq!(eval(&mut ctx, "var x = 5;"), "undefined");
    assert_eq!(eval(&mut ctx, "x * 2"), "10");
}

#[test]
fn test_globals_persist_between_runs() {
    let mut ctx = context();

    ctx.run("globalThis.counter = 1;", "a.js").unwrap();
    ctx.run("counter += 41;", "b.js").unwrap();
    assert_eq!(eval(&mut ctx, "counter"), "42");
}

#[test]
fn test_thrown_error_is_snapshotted() {
    let mut ctx = context();

    let err = ctx.run("throw new Error('boom')", "test.js").unwrap_err();
    assert!(err.message.contains("boom"));
    assert!(err.location.as_deref().unwrap().starts_with("test.js"));
    assert!(err.stack.as_deref().unwrap().contains("boom"));
    assert!(!err.is_termination());
}

#[test]
fn test_location_is_one_indexed() {
    let mut ctx = context();

    let err = ctx.run("var a = 1;\n  throw 'oops';", "test.js").unwrap_err();
    assert_eq!(err.message, "oops");
    assert!(err.location.as_deref().unwrap().ends_with(":2:3"));
}

#[test]
fn test_syntax_error() {
    let mut ctx = context();

    let err = ctx.run("let = ;", "bad.js").unwrap_err();
    assert!(err.message.starts_with("SyntaxError"));
    assert!(err.location.as_deref().unwrap().starts_with("bad.js:1"));
}

#[test]
fn test_error_outlives_context() {
    let err = {
        let mut ctx = context();
        ctx.run("throw new TypeError('kept')", "keep.js").unwrap_err()
    };
    assert_eq!(err.message, "TypeError: kept");
}

#[test]
fn test_context_usable_after_error() {
    let mut ctx = context();

    assert!(ctx.run("undefinedFunction()", "test.js").is_err());
    assert_eq!(eval(&mut ctx, "'still' + ' alive'"), "still alive");
}

#[test]
fn test_double_dispose_is_noop() {
    let mut ctx = context();
    let handle = ctx.run("({})", "test.js").unwrap();
    assert_eq!(ctx.live_values(), 1);

    assert!(ctx.dispose_value(handle));
    assert!(!ctx.dispose_value(handle));
    assert_eq!(ctx.live_values(), 0);
    assert_eq!(ctx.value_to_string(&handle), Err(HandleError::Stale));
}

#[test]
fn test_foreign_handle_is_rejected() {
    init_tracing();
    let mut first = Context::new().unwrap();
    let handle = first.run("'first'", "first.js").unwrap();

    let mut second = Context::new().unwrap();
    assert_eq!(
        second.value_to_string(&handle),
        Err(HandleError::ForeignContext)
    );
    assert!(!second.dispose_value(handle));
}

#[test]
fn test_dispose_in_creation_order() {
    init_tracing();
    let mut first = Context::new().unwrap();
    let mut second = Context::new().unwrap();
    assert_eq!(eval(&mut first, "'first'"), "first");
    assert_eq!(eval(&mut second, "'second'"), "second");

    first.dispose();
    assert_eq!(eval(&mut second, "1 + 2"), "3");

    let mut third = Context::new().unwrap();
    second.dispose();
    assert_eq!(eval(&mut third, "'third'"), "third");
    third.dispose();
}

#[test]
fn test_older_context_runs_after_newer_created() {
    init_tracing();
    let mut older = Context::new().unwrap();
    older.run("globalThis.name = 'older';", "older.js").unwrap();

    let mut newer = Context::new().unwrap();
    newer.run("globalThis.name = 'newer';", "newer.js").unwrap();

    for _ in 0..3 {
        assert_eq!(eval(&mut older, "name"), "older");
        assert_eq!(eval(&mut newer, "name"), "newer");
    }

    let err = older.run("throw new Error('older failed')", "older.js").unwrap_err();
    assert!(err.message.contains("older failed"));
    assert_eq!(eval(&mut newer, "name"), "newer");
}

#[test]
fn test_contexts_dropped_in_any_order() {
    init_tracing();
    let mut contexts: Vec<Context> = (0..4).map(|_| Context::new().unwrap()).collect();
    for (i, ctx) in contexts.iter_mut().enumerate() {
        assert_eq!(eval(ctx, &format!("{} * 10", i)), (i * 10).to_string());
    }

    // A Vec drops front to back, the same order the contexts were created.
    drop(contexts);

    let mut ctx = Context::new().unwrap();
    assert_eq!(eval(&mut ctx, "'after'"), "after");
}

#[test]
fn test_dispose_with_live_values() {
    let mut ctx = context();
    let handle = ctx.run("[1, 2, 3]", "test.js").unwrap();
    let id = ctx.id();

    ctx.dispose();
    assert_eq!(handle.context(), id);
}

#[test]
fn test_host_functions_installed() {
    let mut ctx = context();

    assert_eq!(eval(&mut ctx, "typeof bridge.print"), "function");
    assert_eq!(eval(&mut ctx, "typeof bridge.log"), "function");
    assert_eq!(eval(&mut ctx, "typeof bridge.registerCallback"), "function");
    assert_eq!(eval(&mut ctx, "bridge.print('hello', 1, true)"), "undefined");
    assert_eq!(eval(&mut ctx, "bridge.log('to', 'stderr')"), "undefined");
}

#[test]
fn test_custom_namespace() {
    init_tracing();
    let config = ContextConfig::default().with_namespace("host");
    let mut ctx = Context::with_config(config).unwrap();

    assert_eq!(ctx.config().namespace, "host");
    assert_eq!(eval(&mut ctx, "typeof host.print"), "function");
    assert_eq!(eval(&mut ctx, "typeof bridge"), "undefined");
}

#[test]
fn test_invalid_config_is_rejected() {
    init_tracing();
    let config = ContextConfig::default().with_namespace("");
    assert!(Context::with_config(config).is_err());
}

#[test]
fn test_register_callback_rejects_non_function() {
    let mut ctx = context();

    let err = ctx.run("bridge.registerCallback(42)", "test.js").unwrap_err();
    assert!(err.message.starts_with("TypeError"));
    assert!(!ctx.has_callback());

    ctx.run("bridge.registerCallback(() => {})", "test.js").unwrap();
    assert!(ctx.has_callback());
}

#[test]
fn test_terminate_running_script() {
    let mut ctx = context();
    let handle = ctx.termination_handle();

    let killer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        handle.terminate()
    });

    let err = ctx.run("while (true) {}", "spin.js").unwrap_err();
    assert!(killer.join().unwrap());
    assert!(err.is_termination());
    assert!(err.location.is_none());

    assert_eq!(eval(&mut ctx, "6 * 7"), "42");
}

#[test]
fn test_version() {
    let _ctx = context();
    assert!(v8bridge::is_initialized());
    assert!(v8bridge::version().contains('.'));
}
