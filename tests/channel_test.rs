//! Message channel integration tests

mod common;

use common::{context, eval};
use v8bridge::SendError;

#[test]
fn test_send_without_callback() {
    let mut ctx = context();

    assert_eq!(ctx.send(vec![1, 2, 3]), Err(SendError::NoCallback));
    assert_eq!(ctx.send(Vec::new()), Err(SendError::NoCallback));
    assert_eq!(SendError::NoCallback.code(), 2);
}

#[test]
fn test_payload_arrives_intact() {
    let mut ctx = context();
    ctx.run(
        "globalThis.calls = 0;
         bridge.registerCallback((buf) => {
             calls += 1;
             globalThis.isBuffer = buf instanceof ArrayBuffer;
             globalThis.got = Array.from(new Uint8Array(buf)).join(',');
         });",
        "setup.js",
    )
    .unwrap();

    ctx.send(vec![0, 1, 2, 127, 255]).unwrap();

    assert_eq!(eval(&mut ctx, "calls"), "1");
    assert_eq!(eval(&mut ctx, "isBuffer"), "true");
    assert_eq!(eval(&mut ctx, "got"), "0,1,2,127,255");
}

#[test]
fn test_empty_payload() {
    let mut ctx = context();
    ctx.run(
        "bridge.registerCallback((buf) => { globalThis.size = buf.byteLength; });",
        "setup.js",
    )
    .unwrap();

    ctx.send(Vec::new()).unwrap();
    assert_eq!(eval(&mut ctx, "size"), "0");
}

#[test]
fn test_second_callback_replaces_first() {
    let mut ctx = context();
    ctx.run(
        "globalThis.first = 0;
         globalThis.second = 0;
         bridge.registerCallback(() => { first += 1; });
         bridge.registerCallback(() => { second += 1; });",
        "setup.js",
    )
    .unwrap();

    ctx.send(b"ping".to_vec()).unwrap();
    ctx.send(b"pong".to_vec()).unwrap();

    assert_eq!(eval(&mut ctx, "first + ':' + second"), "0:2");
}

#[test]
fn test_callback_may_reregister() {
    let mut ctx = context();
    ctx.run(
        "globalThis.seen = [];
         bridge.registerCallback((buf) => {
             seen.push('a' + buf.byteLength);
             bridge.registerCallback((buf) => { seen.push('b' + buf.byteLength); });
         });",
        "setup.js",
    )
    .unwrap();

    ctx.send(vec![1]).unwrap();
    ctx.send(vec![1, 2]).unwrap();

    assert_eq!(eval(&mut ctx, "seen.join(',')"), "a1,b2");
}

#[test]
fn test_throwing_callback() {
    let mut ctx = context();
    ctx.run(
        "bridge.registerCallback(() => { throw new Error('nope'); });",
        "setup.js",
    )
    .unwrap();

    let err = ctx.send(vec![42]).unwrap_err();
    assert_eq!(err, SendError::CallbackRaised);
    assert_eq!(err.code(), 3);

    let last = ctx.last_error().unwrap();
    assert!(last.message.contains("nope"));
    assert!(last.location.as_deref().unwrap().starts_with("setup.js"));

    assert!(ctx.has_callback());
    assert_eq!(eval(&mut ctx, "'recovered'"), "recovered");
}

#[test]
fn test_last_error_cleared_by_successful_send() {
    let mut ctx = context();
    ctx.run(
        "globalThis.fail = true;
         bridge.registerCallback(() => { if (fail) { fail = false; throw new Error('once'); } });",
        "setup.js",
    )
    .unwrap();

    assert_eq!(ctx.send(vec![1]), Err(SendError::CallbackRaised));
    assert!(ctx.last_error().unwrap().message.contains("once"));

    ctx.send(vec![2]).unwrap();
    assert!(ctx.last_error().is_none());
}

#[test]
fn test_callback_registered_from_module() {
    let mut ctx = context();
    ctx.load_module(
        "bridge.registerCallback((buf) => { globalThis.fromModule = buf.byteLength; });",
        "listener.js",
        v8bridge::NoImports,
    )
    .unwrap();

    ctx.send(vec![9; 16]).unwrap();
    assert_eq!(eval(&mut ctx, "fromModule"), "16");
}
