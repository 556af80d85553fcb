// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Process-wide engine initialization.
//!
//! The platform and the engine are set up exactly once per process and never
//! torn down. Every context shares them; nothing here is mutable afterwards.

use std::sync::Once;

use crate::config::RuntimeConfig;

static INIT: Once = Once::new();

/// Initialize the engine with default settings.
///
/// Safe to call any number of times; only the first call does work.
pub fn initialize() {
    initialize_with(&RuntimeConfig::default());
}

/// Initialize the engine with explicit settings.
///
/// The configuration of the first call wins; later calls are no-ops.
pub fn initialize_with(config: &RuntimeConfig) {
    INIT.call_once(|| {
        if let Some(flags) = config.v8_flags.as_deref() {
            v8::V8::set_flags_from_string(flags);
        }
        let platform = v8::new_default_platform(config.worker_threads, false).make_shared();
        v8::V8::initialize_platform(platform);
        v8::V8::initialize();
        tracing::debug!(version = v8::V8::get_version(), "engine initialized");
    });
}

/// Whether the engine has been initialized.
pub fn is_initialized() -> bool {
    INIT.is_completed()
}

/// Version of the embedded engine.
pub fn version() -> &'static str {
    v8::V8::get_version()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_is_idempotent() {
        initialize();
        initialize();
        initialize_with(&RuntimeConfig {
            v8_flags: None,
            worker_threads: 1,
        });
        assert!(is_initialized());
    }

    #[test]
    fn test_version_is_dotted() {
        initialize();
        let version = version();
        assert!(version.split('.').count() >= 3, "unexpected version {}", version);
    }
}
