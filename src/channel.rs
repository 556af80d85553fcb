// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host-to-script message channel.
//!
//! Script fills the context's single callback slot through
//! `registerCallback`; [`Context::send`] hands a payload to that callback as
//! an `ArrayBuffer`.

use tracing::{debug, error};

use crate::context::{Context, SharedState};
use crate::error::SendError;
use crate::marshal;

impl Context {
    /// Deliver `payload` to the callback registered by script.
    ///
    /// The bytes move into an engine backing store and are freed by the
    /// engine once the buffer is collected. A callback that throws is
    /// reported through the log and [`Context::last_error`], which a
    /// successful delivery clears.
    pub fn send(&mut self, payload: Vec<u8>) -> Result<(), SendError> {
        self.clear_error();
        let len = payload.len();
        let outcome = {
            let _entered = self.enter();
            let scope = &mut v8::HandleScope::with_context(&mut self.isolate, &self.global);
            let Some(callback) = callback_local(scope, &self.state) else {
                debug!(context = %self.id, bytes = len, "no callback registered");
                return Err(SendError::NoCallback);
            };

            let store = v8::ArrayBuffer::new_backing_store_from_boxed_slice(payload.into_boxed_slice())
                .make_shared();
            let buffer = v8::ArrayBuffer::with_backing_store(scope, &store);

            let tc = &mut v8::TryCatch::new(scope);
            let receiver = tc.get_current_context().global(tc);
            match callback.call(tc, receiver.into(), &[buffer.into()]) {
                Some(_) => Ok(()),
                None => Err(marshal::from_try_catch(tc)),
            }
        };

        match outcome {
            Ok(()) => {
                debug!(context = %self.id, bytes = len, "message delivered");
                Ok(())
            }
            Err(err) => {
                error!(
                    context = %self.id,
                    message = %err.message,
                    location = err.location.as_deref().unwrap_or(""),
                    stack = err.stack.as_deref().unwrap_or(""),
                    "message callback raised"
                );
                self.recover(&err);
                self.record_error(err);
                Err(SendError::CallbackRaised)
            }
        }
    }
}

fn callback_local<'s>(
    scope: &mut v8::HandleScope<'s>,
    state: &SharedState,
) -> Option<v8::Local<'s, v8::Function>> {
    let state = state.borrow();
    let callback = state.callback.as_ref()?;
    Some(v8::Local::new(scope, callback))
}
