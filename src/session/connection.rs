//! The outbound side of a client connection.
//!
//! Sessions talk to clients through the [`Connection`] trait so the state
//! machine can be driven without a socket. [`ChannelConnection`] feeds a
//! transport writer task; [`RecordingConnection`] captures everything for
//! assertions in tests.

use tokio::sync::mpsc;

use crate::protocol::ServerMessage;

/// Outbound half of a client connection.
pub trait Connection: Send {
    /// Queue a message. Ignored once the connection is closed.
    fn send(&mut self, message: ServerMessage);

    /// Close the connection after the queued messages.
    fn close(&mut self);

    /// Whether either side has closed the connection.
    fn is_closed(&self) -> bool;
}

/// What a transport writer receives.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(ServerMessage),
    Close,
}

/// A connection backed by an unbounded channel to a writer task.
///
/// The connection counts as closed when the session closed it or when
/// the writer went away.
#[derive(Debug)]
pub struct ChannelConnection {
    tx: mpsc::UnboundedSender<Outbound>,
    closed: bool,
}

impl ChannelConnection {
    pub fn new(tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { tx, closed: false }
    }

    /// A connection and the receiver its writer reads from.
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl Connection for ChannelConnection {
    fn send(&mut self, message: ServerMessage) {
        if self.is_closed() {
            return;
        }
        if self.tx.send(Outbound::Message(message)).is_err() {
            self.closed = true;
        }
    }

    fn close(&mut self) {
        if !self.closed {
            let _ = self.tx.send(Outbound::Close);
            self.closed = true;
        }
    }

    fn is_closed(&self) -> bool {
        self.closed || self.tx.is_closed()
    }
}

/// Connection double that records every message.
///
/// # Example
///
/// ```
/// use account_forge::protocol::ServerMessage;
/// use account_forge::session::{Connection, RecordingConnection};
///
/// let mut conn = RecordingConnection::new();
/// conn.send(ServerMessage::step_error("Unknown hair color !"));
/// assert_eq!(conn.errors(), vec!["Unknown hair color !"]);
/// ```
#[derive(Debug, Default)]
pub struct RecordingConnection {
    messages: Vec<ServerMessage>,
    closed_locally: bool,
    closed_remotely: bool,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the peer hanging up.
    pub fn hang_up(&mut self) {
        self.closed_remotely = true;
    }

    /// All messages sent, oldest first.
    pub fn messages(&self) -> &[ServerMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ServerMessage> {
        self.messages.last()
    }

    /// Ids of the steps sent, in order.
    pub fn step_ids(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::Step(step) => Some(step.step_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Texts of the step errors sent, in order.
    pub fn errors(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::StepError { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether the session closed the connection.
    pub fn closed_by_server(&self) -> bool {
        self.closed_locally
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

impl Connection for RecordingConnection {
    fn send(&mut self, message: ServerMessage) {
        if !self.is_closed() {
            self.messages.push(message);
        }
    }

    fn close(&mut self) {
        self.closed_locally = true;
    }

    fn is_closed(&self) -> bool {
        self.closed_locally || self.closed_remotely
    }
}
