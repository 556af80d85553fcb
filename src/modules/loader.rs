// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module graph loading.
//!
//! A load runs four phases: compile, resolve, instantiate and evaluate. The
//! host resolver is only consulted while resolving, with no engine scope
//! open, so a resolver may load further modules into the same context.
//! Linking answers from the tables captured while resolving and never calls
//! back into the host.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, error, trace};

use super::registry::ModuleId;
use super::resolver::{self, ModuleResolver, ResolveScope};
use crate::context::{Context, SharedState, script_origin, state_of};
use crate::error::{JsError, ModuleError, ResolveError};
use crate::marshal;

impl Context {
    /// Load a module and everything it imports, then evaluate it.
    ///
    /// `resolver` maps each import of the module to the name of a module
    /// already loaded in this context. It may load dependencies itself
    /// through the [`ResolveScope`] it is given.
    ///
    /// On failure the status is available through [`ModuleError::code`] and
    /// any script-level error through [`Context::last_error`].
    pub fn load_module<R>(&mut self, source: &str, name: &str, resolver: R) -> Result<(), ModuleError>
    where
        R: ModuleResolver + 'static,
    {
        self.load_module_shared(source, name, Arc::new(resolver))
    }

    pub(crate) fn load_module_shared(
        &mut self,
        source: &str,
        name: &str,
        resolver: Arc<dyn ModuleResolver>,
    ) -> Result<(), ModuleError> {
        self.clear_error();

        debug!(context = %self.id, module = name, "compiling module");
        let (module, hash, specifiers) = self.compile_module(source, name)?;

        debug!(context = %self.id, module = name, imports = specifiers.len(), "resolving imports");
        let table = self.resolve_imports(name, &specifiers, resolver)?;

        let id = {
            let mut state = self.state.borrow_mut();
            let id = state.modules.register(name, hash, module);
            state.modules.record_resolutions(id, table);
            id
        };

        debug!(context = %self.id, module = name, "instantiating module");
        self.instantiate(id, name)?;

        debug!(context = %self.id, module = name, "evaluating module");
        self.evaluate(id, name)?;

        debug!(context = %self.id, module = name, "module loaded");
        Ok(())
    }

    /// Whether a module is loaded under `name`
    pub fn has_module(&self, name: &str) -> bool {
        self.state.borrow().modules.contains(name)
    }

    /// Names of all loaded modules, sorted
    pub fn module_names(&self) -> Vec<String> {
        self.state.borrow().modules.names()
    }

    fn compile_module(
        &mut self,
        source: &str,
        name: &str,
    ) -> Result<(v8::Global<v8::Module>, i32, Vec<String>), ModuleError> {
        let compiled = {
            let _entered = self.enter();
            let scope = &mut v8::HandleScope::with_context(&mut self.isolate, &self.global);
            let tc = &mut v8::TryCatch::new(scope);
            match compile(tc, source, name) {
                Some(module) => {
                    let specifiers = import_specifiers(tc, module);
                    let hash = module.get_identity_hash().get();
                    Ok((v8::Global::new(tc, module), hash, specifiers))
                }
                None => Err(marshal::from_try_catch(tc)),
            }
        };

        compiled.map_err(|err| {
            error!(
                context = %self.id,
                module = name,
                message = %err.message,
                location = err.location.as_deref().unwrap_or(""),
                "module failed to compile"
            );
            self.fail(err);
            ModuleError::Compile(name.to_string())
        })
    }

    fn resolve_imports(
        &mut self,
        referrer: &str,
        specifiers: &[String],
        resolver: Arc<dyn ModuleResolver>,
    ) -> Result<FxHashMap<String, ModuleId>, ModuleError> {
        let registration = resolver::register(resolver);
        let token = registration.token();
        let mut table = FxHashMap::default();

        for specifier in specifiers {
            if table.contains_key(specifier) {
                continue;
            }

            trace!(%token, specifier = %specifier, referrer, "resolving import");
            let resolved = match resolver::lookup(token) {
                Some(resolver) => {
                    let mut scope = ResolveScope::new(self, Arc::clone(&resolver));
                    resolver.resolve(&mut scope, specifier, referrer)
                }
                None => Err(ResolveError::default()),
            };

            let resolved = match resolved {
                Ok(resolved) => resolved,
                Err(source) => {
                    let err = ModuleError::Resolver {
                        specifier: specifier.clone(),
                        referrer: referrer.to_string(),
                        source,
                    };
                    debug!(context = %self.id, error = %err, "import rejected");
                    self.record_error(JsError::new(err.to_string()));
                    return Err(err);
                }
            };

            let found = self.state.borrow().modules.lookup(&resolved);
            let Some(id) = found else {
                let err = ModuleError::UnknownModule {
                    specifier: specifier.clone(),
                    resolved,
                };
                debug!(context = %self.id, error = %err, "import resolved to unloaded module");
                self.record_error(JsError::new(err.to_string()));
                return Err(err);
            };
            table.insert(specifier.clone(), id);
        }

        Ok(table)
    }

    fn instantiate(&mut self, id: ModuleId, name: &str) -> Result<(), ModuleError> {
        let outcome = {
            let _entered = self.enter();
            let scope = &mut v8::HandleScope::with_context(&mut self.isolate, &self.global);
            let tc = &mut v8::TryCatch::new(scope);
            match module_local(tc, &self.state, id) {
                Some(module) => match module.instantiate_module(tc, resolve_callback) {
                    Some(true) => Ok(()),
                    _ => Err(marshal::from_try_catch(tc)),
                },
                None => Err(JsError::new(format!("module '{}' is not registered", name))),
            }
        };

        outcome.map_err(|err| {
            debug!(context = %self.id, module = name, error = %err, "module failed to link");
            self.fail(err);
            ModuleError::Instantiation(name.to_string())
        })
    }

    fn evaluate(&mut self, id: ModuleId, name: &str) -> Result<(), ModuleError> {
        let outcome = {
            let _entered = self.enter();
            let scope = &mut v8::HandleScope::with_context(&mut self.isolate, &self.global);
            let tc = &mut v8::TryCatch::new(scope);
            match module_local(tc, &self.state, id) {
                Some(module) => evaluate_module(tc, module),
                None => Err(JsError::new(format!("module '{}' is not registered", name))),
            }
        };

        outcome.map_err(|err| {
            error!(
                context = %self.id,
                module = name,
                message = %err.message,
                location = err.location.as_deref().unwrap_or(""),
                stack = err.stack.as_deref().unwrap_or(""),
                "module evaluation failed"
            );
            self.fail(err);
            ModuleError::Evaluation(name.to_string())
        })
    }

    fn fail(&mut self, err: JsError) {
        self.recover(&err);
        self.record_error(err);
    }
}

fn compile<'s>(
    scope: &mut v8::HandleScope<'s>,
    source: &str,
    name: &str,
) -> Option<v8::Local<'s, v8::Module>> {
    let code = v8::String::new(scope, source)?;
    let origin = script_origin(scope, name, true)?;
    let source = v8::script_compiler::Source::new(code, Some(&origin));
    v8::script_compiler::compile_module(scope, source)
}

/// Import specifiers in declaration order, duplicates included.
fn import_specifiers(scope: &mut v8::HandleScope, module: v8::Local<v8::Module>) -> Vec<String> {
    let requests = module.get_module_requests();
    (0..requests.length())
        .filter_map(|i| {
            let request = requests.get(scope, i)?;
            let request = v8::Local::<v8::ModuleRequest>::try_from(request).ok()?;
            Some(request.get_specifier().to_rust_string_lossy(scope))
        })
        .collect()
}

fn module_local<'s>(
    scope: &mut v8::HandleScope<'s>,
    state: &SharedState,
    id: ModuleId,
) -> Option<v8::Local<'s, v8::Module>> {
    let state = state.borrow();
    let module = state.modules.module(id)?;
    Some(v8::Local::new(scope, module))
}

fn evaluate_module(
    tc: &mut v8::TryCatch<v8::HandleScope>,
    module: v8::Local<v8::Module>,
) -> Result<(), JsError> {
    let Some(result) = module.evaluate(tc) else {
        return Err(marshal::from_try_catch(tc));
    };

    // Top-level await leaves the evaluation promise pending.
    if let Ok(promise) = v8::Local::<v8::Promise>::try_from(result) {
        if promise.state() == v8::PromiseState::Pending {
            tc.perform_microtask_checkpoint();
        }
    }
    if tc.has_terminated() {
        return Err(JsError::terminated());
    }

    if module.get_status() == v8::ModuleStatus::Errored {
        let exception = module.get_exception();
        return Err(marshal::from_exception(tc, exception));
    }
    Ok(())
}

/// Answers the engine's link-time queries from the recorded tables.
fn resolve_callback<'a>(
    context: v8::Local<'a, v8::Context>,
    specifier: v8::Local<'a, v8::String>,
    _import_attributes: v8::Local<'a, v8::FixedArray>,
    referrer: v8::Local<'a, v8::Module>,
) -> Option<v8::Local<'a, v8::Module>> {
    let scope = &mut unsafe { v8::CallbackScope::new(context) };
    let specifier = specifier.to_rust_string_lossy(scope);

    let resolved = state_of(scope).and_then(|state| {
        let state = state.borrow();
        let referrer_id = state
            .modules
            .identify(referrer.get_identity_hash().get(), |module| {
                v8::Local::new(scope, module) == referrer
            })?;
        let id = state.modules.resolve(referrer_id, &specifier)?;
        if let Some(record) = state.modules.record(id) {
            trace!(specifier = %specifier, resolved = %record.name, "linking import");
        }
        state
            .modules
            .module(id)
            .map(|module| v8::Local::new(scope, module))
    });

    if resolved.is_none() {
        let message = format!("Cannot resolve module '{}'", specifier);
        if let Some(message) = v8::String::new(scope, &message) {
            let exception = v8::Exception::reference_error(scope, message);
            scope.throw_exception(exception);
        }
    }
    resolved
}
