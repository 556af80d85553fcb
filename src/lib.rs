// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # v8bridge
//!
//! Host-side bridge for running scripts in embedded V8 isolates.
//!
//! ## Overview
//!
//! This crate drives an opaque script engine from a Rust host:
//! - Isolated execution contexts with a namespaced set of host functions
//! - Script execution with results held as context-scoped value handles
//! - ES module graphs resolved through a host callback
//! - Thrown exceptions snapshotted into owned [`JsError`] values
//! - A byte-oriented message channel into running script
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use v8bridge::{Context, StaticResolver};
//!
//! let mut ctx = Context::new()?;
//! let value = ctx.run("1 + 1", "main.js")?;
//! assert_eq!(ctx.value_to_string(&value)?, "2");
//!
//! let resolver = StaticResolver::new().with_module("dep.js", "export const x = 1;");
//! ctx.load_module("import { x } from 'dep.js'; bridge.print(x);", "main.js", resolver)?;
//!
//! ctx.run("bridge.registerCallback((buf) => bridge.log(buf.byteLength))", "cb.js")?;
//! ctx.send(vec![1, 2, 3])?;
//! ```
//!
//! ## Threading
//!
//! A [`Context`] stays on the thread that created it. Contexts on different
//! threads run in parallel; a [`TerminationHandle`] is the one piece that may
//! cross threads.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod channel;
pub mod config;
mod context;
pub mod error;
mod globals;
mod marshal;
pub mod modules;
mod runtime;
mod value;

pub use config::{Config, ContextConfig, RuntimeConfig};
pub use context::{Context, TerminationHandle};
pub use error::{Error, HandleError, JsError, ModuleError, ResolveError, Result, SendError};
pub use modules::{
    FnResolver, ModuleResolver, NoImports, ResolveScope, StaticResolver, resolve_with,
};
pub use runtime::{initialize, initialize_with, is_initialized, version};
pub use value::{ContextId, ValueHandle};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
