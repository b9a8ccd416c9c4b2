//! Messages exchanged with account-creation clients.
//!
//! Messages are plain serde types tagged by `type`; the transport decides
//! how they are framed.
//!
//! # Example
//!
//! ```
//! use account_forge::protocol::ClientMessage;
//!
//! let msg: ClientMessage =
//!     serde_json::from_str(r#"{"type":"step_result","properties":{"data.login":"rand"}}"#).unwrap();
//! assert!(matches!(msg, ClientMessage::StepResult { .. }));
//! ```

use serde::{Deserialize, Serialize};

use crate::steps::{Properties, StepDefinition, StepKind};

/// A personalized step as shown to the client. Never contains `server.*`
/// properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMessage {
    pub step_id: String,
    pub kind: StepKind,
    pub title: String,
    pub previous_enabled: bool,
    pub next_enabled: bool,
    pub last_step: bool,
    pub properties: Properties,
}

impl StepMessage {
    /// A message carrying `step`'s flags and the given client properties.
    pub fn new(step: &StepDefinition, properties: Properties) -> Self {
        Self {
            step_id: step.id.clone(),
            kind: step.kind,
            title: step.title.clone(),
            previous_enabled: step.previous_enabled,
            next_enabled: step.next_enabled,
            last_step: step.last_step,
            properties,
        }
    }
}

/// Why a connection was refused before or instead of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefusalCode {
    BadRequest,
    UnknownAccount,
    BadPassword,
    AccountDeleted,
    DeleteFailed,
    WrongKey,
}

impl RefusalCode {
    /// Human-readable text for the code.
    pub fn message(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad request.",
            Self::UnknownAccount => "Unknown account.",
            Self::BadPassword => "Wrong password.",
            Self::AccountDeleted => "Account deleted.",
            Self::DeleteFailed => "Failed to delete account.",
            Self::WrongKey => "Wrong access key.",
        }
    }
}

/// Client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// First message of a connection, carrying the access key.
    Hello { key: String },
    /// Ask for the first step.
    Start,
    /// Answers for the current step. Only `data.*` keys are used.
    StepResult {
        #[serde(default)]
        properties: Properties,
    },
    /// Go back one step.
    Previous,
    /// Abandon the creation.
    Cancel,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Step(StepMessage),
    /// The last action failed; the client stays on the current step.
    StepError { text: String },
    /// The account exists. Sent once, right before the connection closes.
    CreationCompleted {
        account_id: u64,
        server_id: u32,
        login: String,
        password: String,
        display_name: String,
    },
    /// Access control outcome, followed by a close. A successful deletion
    /// request also ends this way, with `account_deleted`.
    Refused { code: RefusalCode, message: String },
}

impl ServerMessage {
    pub fn step_error(text: impl Into<String>) -> Self {
        Self::StepError { text: text.into() }
    }

    pub fn refused(code: RefusalCode) -> Self {
        Self::Refused {
            code,
            message: code.message().to_string(),
        }
    }
}
