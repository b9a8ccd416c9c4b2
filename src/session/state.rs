//! Lifecycle states of a workflow session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a session is in its lifecycle.
///
/// ```text
/// Unstarted -> AwaitingClientInput -> (AwaitingClientInput | Finalizing)
///           -> Completed | Cancelled | Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, first step not yet sent.
    Unstarted,
    /// A step has been sent; waiting for the client's answer.
    AwaitingClientInput,
    /// The last step was answered; the account is being committed.
    Finalizing,
    /// The account was committed and the connection closed.
    Completed,
    /// The client cancelled or the connection dropped.
    Cancelled,
    /// The session could not start.
    Failed,
}

impl SessionState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unstarted => "unstarted",
            Self::AwaitingClientInput => "awaiting client input",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}
