//! Error types for account-forge.
//!
//! This module defines two families of errors:
//!
//! - [`ForgeError`], used while the server starts up: loading the
//!   configuration, reading step definitions, binding sockets.
//! - [`WorkflowError`], raised while a session is running. Every variant
//!   maps to an [`ErrorKind`] and renders a client-facing message via
//!   [`WorkflowError::client_message`]. Workflow errors never escape a
//!   session; they are turned into step errors sent to the client.
//!
//! # Error Handling Strategy
//!
//! - Use `ForgeError` for anything that prevents the server from running
//! - Use `anyhow::Error` (via `ForgeError::Other`) for unexpected errors
//! - Configuration problems found at runtime carry a stable [`ErrorCode`]
//!   so an administrator can find them in the logs

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::session::SessionState;

/// Core error type for start-up and configuration failures.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A step definition document could not be parsed.
    #[error("Failed to parse step definition {source_name}: {message}")]
    StepParseError { source_name: String, message: String },

    /// Step definitions are inconsistent (dangling links, unknown handlers).
    #[error("Invalid step definitions: {message}")]
    StepDefinitionError { message: String },

    /// Referenced step does not exist.
    #[error("Unknown step: {id}")]
    UnknownStep { id: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for account-forge operations.
pub type Result<T> = std::result::Result<T, ForgeError>;

/// Stable codes reported to clients when the server is misconfigured.
///
/// Clients relay the code to the administrator; the full context is in
/// the server log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// `server.previous` names a step that does not exist.
    PreviousStepNotFound,
    /// A non-final step declares no next step.
    NextStepNotDeclared,
    /// The next step named by a step does not exist.
    NextStepNotFound,
    /// A step names a handler missing from the handler table.
    MethodNotFound,
    /// The designated first step does not exist.
    FirstStepNotFound,
    /// The account store rejected the new account.
    CreateFailed,
}

impl ErrorCode {
    /// The code as shown to clients, without the leading `#`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreviousStepNotFound => "stpNotFnd",
            Self::NextStepNotDeclared => "nexStpNon",
            Self::NextStepNotFound => "nexStpFai",
            Self::MethodNotFound => "metNofou",
            Self::FirstStepNotFound => "fstStpFai",
            Self::CreateFailed => "creFaiDisk",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

/// Coarse classification of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    UserInput,
    DuplicateAccount,
    StoreFailure,
    InvalidState,
    ConnectionClosed,
}

/// Errors raised while driving a workflow session.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    /// The step data or handler table is inconsistent.
    #[error("configuration error {code}: {detail}")]
    Configuration { code: ErrorCode, detail: String },

    /// The client sent a value that failed validation.
    #[error("{message}")]
    UserInput { message: String },

    /// Another account already uses this login.
    #[error("login '{login}' is already taken")]
    DuplicateAccount { login: String },

    /// The account store could not persist the account.
    #[error("store failure: {detail}")]
    StoreFailure { detail: String },

    /// The operation is not valid in the session's current state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The connection closed before the operation could run.
    #[error("connection closed")]
    ConnectionClosed,
}

impl WorkflowError {
    /// Shorthand for a configuration error.
    pub fn config(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Configuration {
            code,
            detail: detail.into(),
        }
    }

    /// Shorthand for a user-input error.
    pub fn user_input(message: impl Into<String>) -> Self {
        Self::UserInput {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::UserInput { .. } => ErrorKind::UserInput,
            Self::DuplicateAccount { .. } => ErrorKind::DuplicateAccount,
            Self::StoreFailure { .. } => ErrorKind::StoreFailure,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::ConnectionClosed => ErrorKind::ConnectionClosed,
        }
    }

    /// Message shown to the client in a step error.
    ///
    /// Configuration and store failures hide their detail behind a code.
    pub fn client_message(&self) -> String {
        match self {
            Self::Configuration { code, .. } => badly_configured(*code),
            Self::UserInput { message } => message.clone(),
            Self::DuplicateAccount { .. } => {
                "This login is already used by another account. Please choose another one !"
                    .to_string()
            }
            Self::StoreFailure { .. } => format!(
                "Failed to create account : server storage error. (code: {})",
                ErrorCode::CreateFailed
            ),
            Self::InvalidState { .. } => "This action is not possible now !".to_string(),
            Self::ConnectionClosed => "Connection closed.".to_string(),
        }
    }
}

fn badly_configured(code: ErrorCode) -> String {
    format!(
        "Internal Error. This server was badly configured.\nPlease mail this server's administrator ! (code: {})",
        code
    )
}
