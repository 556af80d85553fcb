// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Execution contexts: one isolate plus one global scope.
//!
//! A context is pinned to the thread that created it. Every operation takes
//! `&mut self`, so two operations on the same context can never overlap,
//! while contexts owned by different threads run fully in parallel.
//!
//! The isolate is entered only for the duration of an operation. Contexts
//! sharing a thread can therefore be used and disposed in any order.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use crate::config::ContextConfig;
use crate::error::{HandleError, JsError, Result};
use crate::globals;
use crate::marshal;
use crate::modules::ModuleRegistry;
use crate::runtime;
use crate::value::{ContextId, SlotArena, ValueHandle};

/// State reachable from engine callbacks through the isolate slot.
#[derive(Default)]
pub(crate) struct ContextState {
    /// Function registered by script through `registerCallback`
    pub(crate) callback: Option<v8::Global<v8::Function>>,
    /// Compiled modules and their resolution tables
    pub(crate) modules: ModuleRegistry<v8::Global<v8::Module>>,
    /// Most recent failure of a module load or message delivery
    pub(crate) last_error: Option<JsError>,
}

impl ContextState {
    fn release(&mut self) {
        self.callback = None;
        self.modules = ModuleRegistry::default();
    }
}

pub(crate) type SharedState = Rc<RefCell<ContextState>>;

/// Fetch the state of the context owning `isolate`.
pub(crate) fn state_of(isolate: &v8::Isolate) -> Option<SharedState> {
    isolate.get_slot::<SharedState>().cloned()
}

/// An isolated engine instance with its own global scope.
///
/// Dropping the context disposes it.
pub struct Context {
    pub(crate) id: ContextId,
    pub(crate) config: ContextConfig,
    pub(crate) values: SlotArena<v8::Global<v8::Value>>,
    pub(crate) state: SharedState,
    pub(crate) global: v8::Global<v8::Context>,
    // Must stay last: every handle above is released before the isolate.
    pub(crate) isolate: v8::OwnedIsolate,
}

impl Context {
    /// Create a context with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(ContextConfig::default())
    }

    /// Create a context.
    ///
    /// Initializes the engine on first use.
    pub fn with_config(config: ContextConfig) -> Result<Self> {
        config.validate()?;
        runtime::initialize();

        let id = ContextId::next();
        let mut params = v8::CreateParams::default();
        if let Some(max) = config.max_heap_size {
            params = params.heap_limits(config.initial_heap_size.unwrap_or(0), max);
        }

        let mut isolate = v8::Isolate::new(params);
        isolate.set_capture_stack_trace_for_uncaught_exceptions(
            true,
            config.stack_trace_limit.min(i32::MAX as u32) as i32,
        );

        let state: SharedState = Rc::new(RefCell::new(ContextState::default()));
        isolate.set_slot(Rc::clone(&state));

        let global = {
            let scope = &mut v8::HandleScope::new(&mut isolate);
            let context = v8::Context::new(scope);
            let scope = &mut v8::ContextScope::new(scope, context);
            globals::install(scope, context, &config.namespace)?;
            v8::Global::new(scope, context)
        };

        // The isolate is entered on creation. Leave it so that it is only
        // entered while an operation runs on it.
        unsafe { isolate.exit() };

        debug!(context = %id, namespace = %config.namespace, "context created");

        Ok(Self {
            id,
            config,
            values: SlotArena::new(id),
            state,
            global,
            isolate,
        })
    }

    /// Identifier of this context
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Settings this context was created with
    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Compile and run `source` as a classic script.
    ///
    /// `origin` names the script in locations and stack traces. Compile and
    /// runtime failures are both returned as a [`JsError`].
    pub fn run(&mut self, source: &str, origin: &str) -> std::result::Result<ValueHandle, JsError> {
        let outcome = {
            let _entered = self.enter();
            let scope = &mut v8::HandleScope::with_context(&mut self.isolate, &self.global);
            let tc = &mut v8::TryCatch::new(scope);
            match compile_and_run(tc, source, origin) {
                Some(value) => Ok(v8::Global::new(tc, value)),
                None => Err(marshal::from_try_catch(tc)),
            }
        };

        match outcome {
            Ok(value) => {
                let handle = self.values.insert(value);
                debug!(context = %self.id, origin, "script completed");
                Ok(handle)
            }
            Err(err) => {
                self.recover(&err);
                debug!(context = %self.id, origin, error = %err, "script failed");
                Err(err)
            }
        }
    }

    /// String form of a value, as `String(value)` would produce it.
    pub fn value_to_string(&mut self, handle: &ValueHandle) -> std::result::Result<String, HandleError> {
        let value = self.values.get(handle)?;
        let _entered = Entered::new(&mut self.isolate);
        let scope = &mut v8::HandleScope::with_context(&mut self.isolate, &self.global);
        let tc = &mut v8::TryCatch::new(scope);
        let value = v8::Local::new(tc, value);
        Ok(value.to_rust_string_lossy(tc))
    }

    /// Release a value handle.
    ///
    /// Returns `false` when there was nothing to release, which makes a
    /// second disposal of the same handle a no-op.
    pub fn dispose_value(&mut self, handle: ValueHandle) -> bool {
        self.values.remove(&handle).is_ok()
    }

    /// Number of value handles not yet disposed
    pub fn live_values(&self) -> usize {
        self.values.len()
    }

    /// Whether script has registered a message callback
    pub fn has_callback(&self) -> bool {
        self.state.borrow().callback.is_some()
    }

    /// The failure of the most recent module load or message delivery.
    ///
    /// Each load and each delivery starts by clearing it, so it is `None`
    /// after one that succeeded.
    pub fn last_error(&self) -> Option<JsError> {
        self.state.borrow().last_error.clone()
    }

    /// A handle that can stop running script from another thread.
    pub fn termination_handle(&self) -> TerminationHandle {
        TerminationHandle {
            inner: self.isolate.thread_safe_handle(),
        }
    }

    /// Dispose the context and everything it owns.
    ///
    /// Outstanding value handles become inert.
    pub fn dispose(self) {
        drop(self);
    }

    /// Enter the isolate until the returned guard drops.
    pub(crate) fn enter(&mut self) -> Entered {
        Entered::new(&mut self.isolate)
    }

    pub(crate) fn clear_error(&self) {
        self.state.borrow_mut().last_error = None;
    }

    pub(crate) fn record_error(&self, err: JsError) {
        self.state.borrow_mut().last_error = Some(err);
    }

    /// Make the isolate usable again after a forced termination.
    pub(crate) fn recover(&mut self, err: &JsError) {
        if err.is_termination() {
            self.isolate.cancel_terminate_execution();
        }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // The isolate must be the current one when it is disposed; its own
        // drop exits it again.
        unsafe { self.isolate.enter() };
        debug!(
            context = %self.id,
            live_values = self.values.len(),
            modules = self.state.borrow().modules.len(),
            "disposing context"
        );
        self.values.clear();
        self.state.borrow_mut().release();
    }
}

/// Keeps an isolate entered on the current thread.
///
/// Entries nest on the engine's per-thread stack, so a context may be
/// entered while another context is entered.
pub(crate) struct Entered {
    isolate: *mut v8::Isolate,
}

impl Entered {
    fn new(isolate: &mut v8::Isolate) -> Self {
        unsafe { isolate.enter() };
        Self {
            isolate: isolate as *mut v8::Isolate,
        }
    }
}

impl Drop for Entered {
    fn drop(&mut self) {
        // The isolate outlives the guard: guards only live inside operations
        // borrowing the owning context.
        unsafe { (*self.isolate).exit() };
    }
}

/// Stops script running in a context, from any thread.
#[derive(Clone)]
pub struct TerminationHandle {
    inner: v8::IsolateHandle,
}

impl TerminationHandle {
    /// Forcibly stop the script currently running in the context.
    ///
    /// Returns `false` if the context has already been disposed.
    pub fn terminate(&self) -> bool {
        self.inner.terminate_execution()
    }
}

fn compile_and_run<'s>(
    scope: &mut v8::HandleScope<'s>,
    source: &str,
    origin: &str,
) -> Option<v8::Local<'s, v8::Value>> {
    let source = v8::String::new(scope, source)?;
    let origin = script_origin(scope, origin, false)?;
    let script = v8::Script::compile(scope, source, Some(&origin))?;
    script.run(scope)
}

pub(crate) fn script_origin<'s>(
    scope: &mut v8::HandleScope<'s>,
    name: &str,
    is_module: bool,
) -> Option<v8::ScriptOrigin<'s>> {
    let name = v8::String::new(scope, name)?;
    Some(v8::ScriptOrigin::new(
        scope,
        name.into(),
        0,
        0,
        false,
        0,
        None,
        false,
        false,
        is_module,
        None,
    ))
}
