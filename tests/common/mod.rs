//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::sync::Once;

use v8bridge::{Context, ValueHandle};

static TRACING: Once = Once::new();

/// Route bridge logs through the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A fresh context with logging enabled
pub fn context() -> Context {
    init_tracing();
    Context::new().unwrap()
}

/// Run `source` and stringify the result
pub fn eval(ctx: &mut Context, source: &str) -> String {
    let handle: ValueHandle = ctx.run(source, "eval.js").unwrap();
    let text = ctx.value_to_string(&handle).unwrap();
    ctx.dispose_value(handle);
    text
}
