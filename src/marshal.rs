// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Conversion of caught exceptions into [`JsError`] snapshots.

use crate::error::JsError;

/// Snapshot the exception held by a `TryCatch`.
pub(crate) fn from_try_catch(tc: &mut v8::TryCatch<v8::HandleScope>) -> JsError {
    if tc.has_terminated() {
        return JsError::terminated();
    }

    let message = tc
        .exception()
        .map(|exception| exception.to_rust_string_lossy(tc))
        .unwrap_or_else(|| "unknown error".to_string());
    let location = tc.message().map(|msg| location_of(tc, msg));
    let stack = tc
        .stack_trace()
        .map(|stack| stack.to_rust_string_lossy(tc))
        .filter(|stack| !stack.is_empty());

    JsError {
        message,
        location,
        stack,
    }
}

/// Snapshot an exception value that was not caught by a `TryCatch`, such as
/// the rejection recorded on an errored module.
pub(crate) fn from_exception(
    scope: &mut v8::HandleScope,
    exception: v8::Local<v8::Value>,
) -> JsError {
    let message = exception.to_rust_string_lossy(scope);
    let msg = v8::Exception::create_message(scope, exception);
    let location = Some(location_of(scope, msg));
    let stack = stack_property(scope, exception);

    JsError {
        message,
        location,
        stack,
    }
}

fn location_of(scope: &mut v8::HandleScope, msg: v8::Local<v8::Message>) -> String {
    let origin = msg
        .get_script_resource_name(scope)
        .map(|name| name.to_rust_string_lossy(scope))
        .unwrap_or_default();
    let line = msg.get_line_number(scope);
    // The engine counts columns from zero, stack traces from one.
    let column = msg.get_start_column() + 1;
    format_location(&origin, line, Some(column))
}

fn stack_property(
    scope: &mut v8::HandleScope,
    exception: v8::Local<v8::Value>,
) -> Option<String> {
    let object = exception.to_object(scope)?;
    let key = v8::String::new(scope, "stack")?;
    let stack = object.get(scope, key.into())?;
    if stack.is_null_or_undefined() {
        return None;
    }
    Some(stack.to_rust_string_lossy(scope)).filter(|stack| !stack.is_empty())
}

/// Format `origin:line:column`, dropping segments that are unknown.
///
/// A column without a line is dropped as well, since it would be read as
/// the line.
pub(crate) fn format_location(origin: &str, line: Option<usize>, column: Option<usize>) -> String {
    let mut location = origin.to_string();
    if let Some(line) = line {
        location.push_str(&format!(":{}", line));
        if let Some(column) = column {
            location.push_str(&format!(":{}", column));
        }
    }
    location
}
