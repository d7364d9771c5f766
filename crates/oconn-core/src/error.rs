// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for OCONN.
//!
//! # Error Hierarchy
//!
//! ```text
//! BridgeError (root)
//! ├── ConfigError   - Environment and descriptor configuration
//! ├── PlaneError    - Control-plane (OPC UA) operations
//! ├── SessionError  - Native OSPAPI session operations
//! ├── CollectError  - Collection workflows
//! ├── ProgramError  - Program-management workflow
//! └── SinkError     - Event-stream publishing
//! ```
//!
//! Nothing in the core is fatal to the process: every error here is handled
//! by logging, resetting the owning trigger, and retrying on the next
//! dispatch. `is_retryable()` distinguishes transient conditions from
//! configuration problems.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{MachineName, ScreenKind};

// =============================================================================
// BridgeError - Root Error Type
// =============================================================================

/// The root error type for OCONN.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Control-plane error.
    #[error("Control-plane error: {0}")]
    Plane(#[from] PlaneError),

    /// Native session error.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Collection workflow error.
    #[error("Collection error: {0}")]
    Collect(#[from] CollectError),

    /// Program-management workflow error.
    #[error("Program-management error: {0}")]
    Program(#[from] ProgramError),

    /// Event-stream sink error.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl BridgeError {
    /// Returns `true` if this error is retryable on a later dispatch.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Config(_) => false,
            BridgeError::Plane(e) => e.is_retryable(),
            BridgeError::Session(e) => e.is_retryable(),
            BridgeError::Collect(e) => e.is_retryable(),
            BridgeError::Program(_) => false,
            BridgeError::Sink(_) => true,
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Config(_) => "config",
            BridgeError::Plane(_) => "plane",
            BridgeError::Session(_) => "session",
            BridgeError::Collect(_) => "collect",
            BridgeError::Program(_) => "program",
            BridgeError::Sink(_) => "sink",
        }
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a configuration file.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("Failed to parse '{path}': {message}")]
    Parse {
        /// Path to the file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("Invalid value for '{field}': {message}")]
    Invalid {
        /// The offending field or environment variable.
        field: String,
        /// What was wrong with it.
        message: String,
    },
}

impl ConfigError {
    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// PlaneError
// =============================================================================

/// Control-plane (OPC UA) errors.
///
/// Note that a single-node read returning a not-good status is *not* an
/// error at this level: node absence is information, and the `ControlPlane`
/// seam models it as `None`. These variants cover operations whose failure
/// the caller must act on.
#[derive(Debug, Error)]
pub enum PlaneError {
    /// The session to the server is not established.
    #[error("Control plane is not connected")]
    NotConnected,

    /// Connection establishment failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Error message.
        message: String,
    },

    /// A browse request failed.
    #[error("Browse failed for '{node}': {message}")]
    Browse {
        /// The browsed node.
        node: String,
        /// Error message.
        message: String,
    },

    /// A subscription or monitored-item request failed.
    #[error("Subscription failed: {message}")]
    Subscription {
        /// Error message.
        message: String,
    },

    /// A service-level operation failed.
    #[error("Operation failed for '{node}': {message}")]
    Operation {
        /// The node involved.
        node: String,
        /// Error message.
        message: String,
    },
}

impl PlaneError {
    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a browse error.
    pub fn browse(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Browse {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Creates a subscription error.
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Creates an operation error.
    pub fn operation(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Operation {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlaneError::NotConnected | PlaneError::Connection { .. }
        )
    }
}

// =============================================================================
// SessionError
// =============================================================================

/// Native OSPAPI session errors.
///
/// A `Native` error never closes the session; churning native connections
/// destabilizes the controller.
#[derive(Debug, Error, Clone)]
pub enum SessionError {
    /// The machine has no usable IP address configured.
    #[error("No IP address configured for '{machine}'")]
    NoAddress {
        /// The machine.
        machine: MachineName,
    },

    /// The native connect failed.
    #[error("Connect failed for '{machine}': {message}")]
    ConnectFailed {
        /// The machine.
        machine: MachineName,
        /// Error message from the binding.
        message: String,
    },

    /// The binding reported an error for a data call.
    #[error("Native call failed: {message}")]
    Native {
        /// The binding's error message.
        message: String,
    },

    /// A controller command returned a non-zero result.
    #[error("Command returned {code}: {message}")]
    Command {
        /// Native result code.
        code: i32,
        /// The machine's error message, possibly empty.
        message: String,
    },
}

impl SessionError {
    /// Creates a no-address error.
    pub fn no_address(machine: MachineName) -> Self {
        Self::NoAddress { machine }
    }

    /// Creates a connect-failed error.
    pub fn connect_failed(machine: MachineName, message: impl Into<String>) -> Self {
        Self::ConnectFailed {
            machine,
            message: message.into(),
        }
    }

    /// Creates a native call error.
    pub fn native(message: impl Into<String>) -> Self {
        Self::Native {
            message: message.into(),
        }
    }

    /// Creates a command error.
    pub fn command(code: i32, message: impl Into<String>) -> Self {
        Self::Command {
            code,
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::ConnectFailed { .. } | SessionError::Native { .. }
        )
    }
}

// =============================================================================
// CollectError
// =============================================================================

/// Collection workflow errors.
#[derive(Debug, Error)]
pub enum CollectError {
    /// No descriptor matches the trigger's field segment.
    #[error("No API descriptor for field '{field}'")]
    UnknownField {
        /// The field name from the trigger node.
        field: String,
    },

    /// The matching descriptor is disabled.
    #[error("API descriptor for field '{field}' is disabled")]
    Disabled {
        /// The field name.
        field: String,
    },

    /// The underlying session failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A screen collection was aborted.
    #[error("Screen {screen} aborted: {message}")]
    ScreenAborted {
        /// The screen that was being collected.
        screen: ScreenKind,
        /// Why it stopped.
        message: String,
    },
}

impl CollectError {
    /// Creates an unknown-field error.
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    /// Creates a disabled-descriptor error.
    pub fn disabled(field: impl Into<String>) -> Self {
        Self::Disabled {
            field: field.into(),
        }
    }

    /// Creates a screen-aborted error.
    pub fn screen_aborted(screen: ScreenKind, message: impl Into<String>) -> Self {
        Self::ScreenAborted {
            screen,
            message: message.into(),
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            CollectError::Session(e) => e.is_retryable(),
            CollectError::ScreenAborted { .. } => true,
            _ => false,
        }
    }
}

// =============================================================================
// ProgramError
// =============================================================================

/// Program-management workflow errors.
///
/// The `Display` text of these variants is written verbatim into the
/// `ProgramManagement.Exception` node, so the wording is part of the
/// external contract.
#[derive(Debug, Error)]
pub enum ProgramError {
    /// The source program file does not exist.
    #[error("File copy failed: Source file does not exist - {filepath}")]
    SourceMissing {
        /// The missing source path as given.
        filepath: String,
    },

    /// `MainFile` was empty on trigger.
    #[error("Program selection failed: MainFile is empty")]
    MissingMainFile,

    /// Session acquisition or the native call failed.
    #[error("{0}")]
    Session(#[from] SessionError),

    /// `SelectMainProgram` returned a non-zero result.
    #[error("{message}")]
    Command {
        /// The machine's error message (or a formatted code).
        message: String,
    },

    /// Anything that should have been impossible; serialized to a crash dump.
    #[error("Unexpected error in ProgramManagement: {message}")]
    Unexpected {
        /// Diagnostic message.
        message: String,
    },
}

impl ProgramError {
    /// Creates a source-missing error.
    pub fn source_missing(filepath: impl Into<String>) -> Self {
        Self::SourceMissing {
            filepath: filepath.into(),
        }
    }

    /// Creates a command error from the machine's error message and code.
    pub fn command(code: i32, message: &str) -> Self {
        let message = if message.trim().is_empty() {
            format!("SelectMainProgram returned {}", code)
        } else {
            message.to_string()
        };
        Self::Command { message }
    }

    /// Creates an unexpected error.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Returns `true` if this error should be serialized to a crash dump.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, ProgramError::Unexpected { .. })
    }
}

// =============================================================================
// SinkError
// =============================================================================

/// Event-stream sink errors. Publishes are best-effort; these are logged
/// and never abort collection.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The publish failed.
    #[error("Publish failed: {message}")]
    PublishFailed {
        /// Error message.
        message: String,
    },
}

impl SinkError {
    /// Creates a publish-failed error.
    pub fn publish_failed(message: impl Into<String>) -> Self {
        Self::PublishFailed {
            message: message.into(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// A Result type with BridgeError.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A Result type with PlaneError.
pub type PlaneResult<T> = Result<T, PlaneError>;

/// A Result type with SessionError.
pub type SessionResult<T> = Result<T, SessionError>;

/// A Result type with CollectError.
pub type CollectResult<T> = Result<T, CollectError>;

/// A Result type with ProgramError.
pub type ProgramResult<T> = Result<T, ProgramError>;

// =============================================================================
// Tests
// =============================================================================
