// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! ES module support
//!
//! - `registry`: compiled modules by name and by identity
//! - `resolver`: the host resolver interface and the in-flight resolver table
//! - `loader`: compile, resolve, instantiate and evaluate a module graph

mod loader;
mod registry;
mod resolver;

pub(crate) use registry::ModuleRegistry;

pub use resolver::{
    FnResolver, ModuleResolver, NoImports, ResolveScope, StaticResolver, resolve_with,
};
