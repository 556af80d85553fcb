// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-side module resolution.
//!
//! A resolver maps an import specifier and its referrer to the canonical name
//! of an already-loaded module. While a load is in flight its resolver is
//! registered in a process-wide table under a fresh token; the table has its
//! own lock so resolution in one context never waits on another context.

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::context::Context;
use crate::error::{ModuleError, ResolveError};

/// Maps `(specifier, referrer)` to a canonical module name.
pub trait ModuleResolver: Send + Sync {
    /// Resolve `specifier` as imported by the module named `referrer`.
    ///
    /// The returned name must already be loaded in the context. A resolver
    /// that fetches dependencies on demand loads them through `scope` first.
    fn resolve(
        &self,
        scope: &mut ResolveScope<'_>,
        specifier: &str,
        referrer: &str,
    ) -> Result<String, ResolveError>;
}

impl<R: ModuleResolver + ?Sized> ModuleResolver for Arc<R> {
    fn resolve(
        &self,
        scope: &mut ResolveScope<'_>,
        specifier: &str,
        referrer: &str,
    ) -> Result<String, ResolveError> {
        (**self).resolve(scope, specifier, referrer)
    }
}

/// Resolver backed by a closure. Built with [`resolve_with`].
pub struct FnResolver<F>(F);

impl<F> ModuleResolver for FnResolver<F>
where
    F: Fn(&mut ResolveScope<'_>, &str, &str) -> Result<String, ResolveError> + Send + Sync,
{
    fn resolve(
        &self,
        scope: &mut ResolveScope<'_>,
        specifier: &str,
        referrer: &str,
    ) -> Result<String, ResolveError> {
        (self.0)(scope, specifier, referrer)
    }
}

/// Wrap a closure as a resolver.
///
/// ```rust,ignore
/// let resolver = resolve_with(|_scope, specifier, _referrer| Ok(specifier.to_string()));
/// ```
pub fn resolve_with<F>(f: F) -> FnResolver<F>
where
    F: Fn(&mut ResolveScope<'_>, &str, &str) -> Result<String, ResolveError> + Send + Sync,
{
    FnResolver(f)
}

/// Resolver for graphs without imports; any specifier is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImports;

impl ModuleResolver for NoImports {
    fn resolve(
        &self,
        _scope: &mut ResolveScope<'_>,
        specifier: &str,
        referrer: &str,
    ) -> Result<String, ResolveError> {
        tracing::debug!(specifier, referrer, "import rejected by NoImports");
        Err(ResolveError::default())
    }
}

/// Resolver serving module sources from memory.
///
/// Specifiers are canonical names. A specifier that is not loaded yet is
/// loaded from the in-memory sources before it is named, so a whole graph
/// can be loaded from its entry module.
#[derive(Default)]
pub struct StaticResolver {
    sources: FxHashMap<String, String>,
    loading: Mutex<FxHashSet<String>>,
}

impl StaticResolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module source under its canonical name
    pub fn with_module(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.sources.insert(name.into(), source.into());
        self
    }

    /// Source registered for `name`
    pub fn source(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }
}

impl ModuleResolver for StaticResolver {
    fn resolve(
        &self,
        scope: &mut ResolveScope<'_>,
        specifier: &str,
        referrer: &str,
    ) -> Result<String, ResolveError> {
        if scope.has_module(specifier) {
            return Ok(specifier.to_string());
        }
        let source = self.sources.get(specifier).ok_or_else(|| {
            tracing::debug!(specifier, referrer, "no source for specifier");
            ResolveError::default()
        })?;

        // A module is registered only after its own imports resolve, so an
        // import cycle would recurse forever.
        if !self.loading.lock().insert(specifier.to_string()) {
            tracing::warn!(specifier, referrer, "import cycle");
            return Err(ResolveError::default());
        }
        let loaded = scope.load_module(source, specifier);
        self.loading.lock().remove(specifier);

        loaded
            .map(|()| specifier.to_string())
            .map_err(|err| ResolveError::new(err.code()))
    }
}

/// What a resolver may do with the context while a load is in flight.
pub struct ResolveScope<'a> {
    context: &'a mut Context,
    resolver: Arc<dyn ModuleResolver>,
}

impl<'a> ResolveScope<'a> {
    pub(crate) fn new(context: &'a mut Context, resolver: Arc<dyn ModuleResolver>) -> Self {
        Self { context, resolver }
    }

    /// Load a dependency with the resolver of the current load.
    pub fn load_module(&mut self, source: &str, name: &str) -> Result<(), ModuleError> {
        self.context
            .load_module_shared(source, name, Arc::clone(&self.resolver))
    }

    /// Whether a module is already loaded under `name`
    pub fn has_module(&self, name: &str) -> bool {
        self.context.has_module(name)
    }

    /// The context being loaded into
    pub fn context(&mut self) -> &mut Context {
        self.context
    }
}

/// Token naming a registered resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResolverToken(u64);

impl fmt::Display for ResolverToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ResolverTable {
    next: u64,
    entries: FxHashMap<ResolverToken, Arc<dyn ModuleResolver>>,
}

static RESOLVERS: LazyLock<Mutex<ResolverTable>> = LazyLock::new(|| {
    Mutex::new(ResolverTable {
        next: 0,
        entries: FxHashMap::default(),
    })
});

/// Registration of a resolver for the duration of one load.
///
/// Dropping it releases the token.
pub(crate) struct Registration {
    token: ResolverToken,
}

impl Registration {
    pub(crate) fn token(&self) -> ResolverToken {
        self.token
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        RESOLVERS.lock().entries.remove(&self.token);
    }
}

/// Register `resolver` under a fresh token.
pub(crate) fn register(resolver: Arc<dyn ModuleResolver>) -> Registration {
    let mut table = RESOLVERS.lock();
    table.next += 1;
    let token = ResolverToken(table.next);
    table.entries.insert(token, resolver);
    Registration { token }
}

/// The resolver registered under `token`, if it is still registered.
pub(crate) fn lookup(token: ResolverToken) -> Option<Arc<dyn ModuleResolver>> {
    RESOLVERS.lock().entries.get(&token).cloned()
}
