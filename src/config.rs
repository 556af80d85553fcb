// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Configuration for the runtime and its contexts.
//!
//! Values come from defaults, then an optional TOML file, then `V8BRIDGE_*`
//! environment variables.
//!
//! ```toml
//! [runtime]
//! v8_flags = "--stack-size=2048"
//!
//! [context]
//! namespace = "host"
//! stack_trace_limit = 20
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

/// Default name of the global object holding the host functions.
pub const DEFAULT_NAMESPACE: &str = "bridge";

/// Default number of frames captured for uncaught exceptions.
pub const DEFAULT_STACK_TRACE_LIMIT: u32 = 10;

/// Combined configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Process-wide settings
    pub runtime: RuntimeConfig,
    /// Per-context settings
    pub context: ContextConfig,
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.load_from_env();
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `V8BRIDGE_*` environment variables.
    pub fn load_from_env(&mut self) {
        self.runtime.load_from_env();
        self.context.load_from_env();
    }
}

/// Settings consumed once, by the first runtime initialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Extra engine flags, e.g. `--stack-size=2048`
    pub v8_flags: Option<String>,

    /// Platform worker threads (0 picks a default)
    pub worker_threads: u32,
}

impl RuntimeConfig {
    /// Apply `V8BRIDGE_V8_FLAGS` and `V8BRIDGE_WORKER_THREADS`.
    pub fn load_from_env(&mut self) {
        if let Ok(flags) = std::env::var("V8BRIDGE_V8_FLAGS") {
            self.v8_flags = Some(flags);
        }
        if let Some(threads) = env_parse("V8BRIDGE_WORKER_THREADS") {
            self.worker_threads = threads;
        }
    }
}

/// Settings for a single execution context.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Global object exposing `print`, `log` and `registerCallback`
    pub namespace: String,

    /// Frames captured for uncaught exceptions
    pub stack_trace_limit: u32,

    /// Initial heap size in bytes
    pub initial_heap_size: Option<usize>,

    /// Maximum heap size in bytes
    pub max_heap_size: Option<usize>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            stack_trace_limit: DEFAULT_STACK_TRACE_LIMIT,
            initial_heap_size: None,
            max_heap_size: None,
        }
    }
}

impl ContextConfig {
    /// Use a different namespace object name.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Capture a different number of stack frames.
    pub fn with_stack_trace_limit(mut self, limit: u32) -> Self {
        self.stack_trace_limit = limit;
        self
    }

    /// Bound the heap. The initial size defaults to zero.
    pub fn with_heap_limits(mut self, initial: usize, max: usize) -> Self {
        self.initial_heap_size = Some(initial);
        self.max_heap_size = Some(max);
        self
    }

    /// Apply `V8BRIDGE_NAMESPACE`, `V8BRIDGE_STACK_TRACE_LIMIT` and
    /// `V8BRIDGE_MAX_HEAP_SIZE`.
    pub fn load_from_env(&mut self) {
        if let Ok(namespace) = std::env::var("V8BRIDGE_NAMESPACE") {
            if !namespace.is_empty() {
                self.namespace = namespace;
            }
        }
        if let Some(limit) = env_parse("V8BRIDGE_STACK_TRACE_LIMIT") {
            self.stack_trace_limit = limit;
        }
        if let Some(max) = env_parse("V8BRIDGE_MAX_HEAP_SIZE") {
            self.max_heap_size = Some(max);
        }
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(Error::Config("namespace must not be empty".to_string()));
        }
        if let (Some(initial), Some(max)) = (self.initial_heap_size, self.max_heap_size) {
            if initial > max {
                return Err(Error::Config(format!(
                    "initial heap size {} exceeds maximum {}",
                    initial, max
                )));
            }
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.namespace, "bridge");
        assert_eq!(config.stack_trace_limit, 10);
        assert!(config.max_heap_size.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml(
            r#"
            [context]
            namespace = "host"
            "#,
        )
        .unwrap();
        assert_eq!(config.context.namespace, "host");
        assert_eq!(config.context.stack_trace_limit, DEFAULT_STACK_TRACE_LIMIT);
        assert_eq!(config.runtime, RuntimeConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_types() {
        let err = Config::from_toml("[context]\nstack_trace_limit = \"many\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_json() {
        let config: ContextConfig =
            serde_json::from_str(r#"{"max_heap_size": 67108864}"#).unwrap();
        assert_eq!(config.max_heap_size, Some(64 * 1024 * 1024));
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[runtime]\nworker_threads = 2\n\n[context]\nstack_trace_limit = 3").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.runtime.worker_threads, 2);
        assert_eq!(config.context.stack_trace_limit, 3);
    }

    #[test]
    fn test_validate() {
        let empty = ContextConfig::default().with_namespace("");
        assert!(empty.validate().is_err());

        let inverted = ContextConfig::default().with_heap_limits(2048, 1024);
        assert!(inverted.validate().is_err());

        let ok = ContextConfig::default().with_heap_limits(0, 1 << 26);
        assert!(ok.validate().is_ok());
    }
}
