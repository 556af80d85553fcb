// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the bridge
//!
//! Script-level failures never cross the bridge as engine objects. They are
//! snapshotted into a [`JsError`] and returned as data; the module loader and
//! message channel additionally map their failures onto integer status codes.

use std::fmt;
use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Message reported when a script was forcibly stopped.
pub const TERMINATED_MESSAGE: &str = "ExecutionTerminated: script execution has been terminated";

/// Snapshot of an exception thrown inside a context.
///
/// The strings are owned by the host, so the error outlives the isolate and
/// the scope it was captured in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsError {
    /// String representation of the thrown value, e.g. `Error: boom`
    pub message: String,
    /// `origin:line:column` with a one-indexed column
    pub location: Option<String>,
    /// The `stack` of the thrown value, verbatim
    pub stack: Option<String>,
}

impl JsError {
    /// Create an error carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            stack: None,
        }
    }

    /// The error reported for a terminated execution
    pub fn terminated() -> Self {
        Self::new(TERMINATED_MESSAGE)
    }

    /// Whether this error records a forced termination
    pub fn is_termination(&self) -> bool {
        self.message == TERMINATED_MESSAGE && self.location.is_none()
    }
}

impl fmt::Display for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stack {
            Some(stack) if f.alternate() => f.write_str(stack),
            _ => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for JsError {}

/// Failure reported by a module resolver.
///
/// The code is surfaced verbatim as the status of the whole load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("resolver failed with status {code}")]
pub struct ResolveError {
    code: i32,
}

impl ResolveError {
    /// Create a resolver failure. A zero code would read as success, so it
    /// is reported as 1.
    pub fn new(code: i32) -> Self {
        Self {
            code: if code == 0 { 1 } else { code },
        }
    }

    /// The status code to report
    pub fn code(&self) -> i32 {
        self.code
    }
}

impl Default for ResolveError {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Errors from loading a module graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleError {
    /// The module source failed to compile
    #[error("failed to compile module '{0}'")]
    Compile(String),

    /// The resolver rejected a specifier
    #[error("resolver rejected '{specifier}' imported by '{referrer}' (status {})", .source.code())]
    Resolver {
        /// The import specifier
        specifier: String,
        /// The importing module
        referrer: String,
        /// The resolver's failure
        source: ResolveError,
    },

    /// The resolver named a module that was never loaded
    #[error("'{specifier}' resolved to unknown module '{resolved}'")]
    UnknownModule {
        /// The import specifier
        specifier: String,
        /// The canonical name returned by the resolver
        resolved: String,
    },

    /// The graph could not be linked
    #[error("failed to instantiate module '{0}'")]
    Instantiation(String),

    /// Top-level evaluation threw
    #[error("failed to evaluate module '{0}'")]
    Evaluation(String),
}

impl ModuleError {
    /// Integer status code for this failure. Success is 0.
    pub fn code(&self) -> i32 {
        match self {
            ModuleError::Compile(_) => 1,
            ModuleError::Resolver { source, .. } => source.code(),
            ModuleError::UnknownModule { .. } => 2,
            ModuleError::Instantiation(_) => 3,
            ModuleError::Evaluation(_) => 4,
        }
    }
}

/// Errors from delivering a message into a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    /// The script never registered a callback
    #[error("no callback registered")]
    NoCallback,

    /// The callback threw
    #[error("callback raised an exception")]
    CallbackRaised,
}

impl SendError {
    /// Integer status code for this failure. Success is 0.
    pub fn code(&self) -> i32 {
        match self {
            SendError::NoCallback => 2,
            SendError::CallbackRaised => 3,
        }
    }
}

/// Misuse of a value handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HandleError {
    /// The handle was produced by a different context
    #[error("value handle belongs to another context")]
    ForeignContext,

    /// The handle's slot was already released
    #[error("value handle is stale")]
    Stale,
}

/// Errors that can occur in the bridge
#[derive(Debug, Error)]
pub enum Error {
    /// Script compile or runtime failure
    #[error("{0}")]
    Script(#[from] JsError),

    /// Module loading failure
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Message delivery failure
    #[error(transparent)]
    Send(#[from] SendError),

    /// Value handle misuse
    #[error(transparent)]
    Handle(#[from] HandleError),

    /// The engine could not allocate a context's built-ins
    #[error("context setup failed: {0}")]
    Setup(&'static str),

    /// Configuration could not be read
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
