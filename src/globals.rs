// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host functions installed into every context
//!
//! Implements, under the configured namespace object:
//! - `print(...args)` - space-joined arguments to stdout
//! - `log(...args)` - space-joined arguments to stderr
//! - `registerCallback(fn)` - fill the context's message callback slot

use std::io::Write;

use crate::context;
use crate::error::{Error, Result};

/// Create the namespace object on the global of `context`.
pub(crate) fn install(
    scope: &mut v8::HandleScope,
    context: v8::Local<v8::Context>,
    namespace: &str,
) -> Result<()> {
    let object = v8::Object::new(scope);
    set_function(scope, object, "print", print)?;
    set_function(scope, object, "log", log)?;
    set_function(scope, object, "registerCallback", register_callback)?;

    let global = context.global(scope);
    let key = v8::String::new(scope, namespace).ok_or(Error::Setup("namespace name"))?;
    global
        .set(scope, key.into(), object.into())
        .ok_or(Error::Setup("namespace object"))?;
    Ok(())
}

fn set_function(
    scope: &mut v8::HandleScope,
    target: v8::Local<v8::Object>,
    name: &str,
    callback: impl v8::MapFnTo<v8::FunctionCallback>,
) -> Result<()> {
    let key = v8::String::new(scope, name).ok_or(Error::Setup("function name"))?;
    let function = v8::Function::new(scope, callback).ok_or(Error::Setup("host function"))?;
    function.set_name(key);
    target
        .set(scope, key.into(), function.into())
        .ok_or(Error::Setup("host function binding"))?;
    Ok(())
}

fn join_args(scope: &mut v8::HandleScope, args: &v8::FunctionCallbackArguments) -> String {
    (0..args.length())
        .map(|i| args.get(i).to_rust_string_lossy(scope))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print(scope: &mut v8::HandleScope, args: v8::FunctionCallbackArguments, _rv: v8::ReturnValue) {
    let line = join_args(scope, &args);
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{}", line);
    let _ = out.flush();
}

fn log(scope: &mut v8::HandleScope, args: v8::FunctionCallbackArguments, _rv: v8::ReturnValue) {
    let line = join_args(scope, &args);
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{}", line);
    let _ = err.flush();
}

fn register_callback(
    scope: &mut v8::HandleScope,
    args: v8::FunctionCallbackArguments,
    _rv: v8::ReturnValue,
) {
    let Ok(function) = v8::Local::<v8::Function>::try_from(args.get(0)) else {
        throw_type_error(scope, "registerCallback expects a function");
        return;
    };
    let Some(state) = context::state_of(scope) else {
        return;
    };
    let function = v8::Global::new(scope, function);
    state.borrow_mut().callback = Some(function);
    tracing::trace!("message callback registered");
}

fn throw_type_error(scope: &mut v8::HandleScope, message: &str) {
    if let Some(message) = v8::String::new(scope, message) {
        let exception = v8::Exception::type_error(scope, message);
        scope.throw_exception(exception);
    }
}
