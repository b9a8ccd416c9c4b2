//! Mailbox that serializes the messages of one session.
//!
//! The session lives inside a tokio task. Each inbound message is applied
//! on the blocking pool with the session moved in and back out, so a
//! commit writing to disk never stalls the reactor while messages for the
//! same session still run one at a time.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::error;

use super::connection::Connection;
use super::state::SessionState;
use super::workflow::WorkflowSession;
use crate::context::ServerContext;
use crate::protocol::ClientMessage;

#[derive(Debug)]
enum SessionEvent {
    Client(ClientMessage),
    /// A line that did not decode as a client message.
    Unreadable,
    Closed,
}

/// Handle to a running session task.
#[derive(Debug)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
    task: JoinHandle<SessionState>,
}

impl SessionHandle {
    /// Queue a client message. Returns false once the session has ended.
    pub fn send(&self, message: ClientMessage) -> bool {
        self.tx.send(SessionEvent::Client(message)).is_ok()
    }

    /// Queue the reply to an unreadable line behind the messages already
    /// received.
    pub fn unreadable(&self) -> bool {
        self.tx.send(SessionEvent::Unreadable).is_ok()
    }

    /// Report that the client went away.
    pub fn connection_closed(&self) {
        let _ = self.tx.send(SessionEvent::Closed);
    }

    /// Wait for the session to reach a terminal state.
    ///
    /// Must not be called again once it has returned.
    pub async fn wait(&mut self) -> SessionState {
        match (&mut self.task).await {
            Ok(state) => state,
            Err(e) => {
                error!("Session task failed: {}", e);
                SessionState::Failed
            }
        }
    }
}

/// Start a session for `connection` on the current runtime.
pub fn spawn_session<C>(ctx: Arc<ServerContext>, connection: C) -> SessionHandle
where
    C: Connection + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let mut session = WorkflowSession::new(ctx, connection);

        while let Some(event) = rx.recv().await {
            let applied = tokio::task::spawn_blocking(move || {
                match event {
                    SessionEvent::Client(message) => {
                        // Already reported to the client.
                        let _ = session.handle(message);
                    }
                    SessionEvent::Unreadable => session.unreadable_message(),
                    SessionEvent::Closed => session.connection_closed(),
                }
                session
            })
            .await;

            session = match applied {
                Ok(session) => session,
                Err(e) => {
                    error!("Session handler panicked: {}", e);
                    return SessionState::Failed;
                }
            };
            if session.is_finished() {
                break;
            }
        }

        session.connection_closed();
        session.state()
    });

    SessionHandle { tx, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::protocol::{RefusalCode, ServerMessage};
    use crate::session::{ChannelConnection, Outbound};

    fn context() -> Arc<ServerContext> {
        Arc::new(ServerContext::from_config(ServerConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn start_then_cancel() {
        let (connection, mut outbound) = ChannelConnection::pair();
        let mut handle = spawn_session(context(), connection);

        assert!(handle.send(ClientMessage::Start));
        assert!(handle.send(ClientMessage::Cancel));
        assert_eq!(handle.wait().await, SessionState::Cancelled);

        match outbound.recv().await {
            Some(Outbound::Message(ServerMessage::Step(step))) => assert_eq!(step.step_id, "welcome"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(outbound.recv().await, Some(Outbound::Close));
    }

    #[tokio::test]
    async fn unreadable_reply_follows_earlier_messages() {
        let (connection, mut outbound) = ChannelConnection::pair();
        let mut handle = spawn_session(context(), connection);

        assert!(handle.send(ClientMessage::Start));
        assert!(handle.unreadable());
        assert!(handle.send(ClientMessage::Cancel));
        assert_eq!(handle.wait().await, SessionState::Cancelled);

        match outbound.recv().await {
            Some(Outbound::Message(ServerMessage::Step(step))) => assert_eq!(step.step_id, "welcome"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            outbound.recv().await,
            Some(Outbound::Message(ServerMessage::step_error(
                RefusalCode::BadRequest.message()
            )))
        );
        assert_eq!(outbound.recv().await, Some(Outbound::Close));
    }

    #[tokio::test]
    async fn closed_connection_cancels_session() {
        let (connection, _outbound) = ChannelConnection::pair();
        let mut handle = spawn_session(context(), connection);

        handle.send(ClientMessage::Start);
        handle.connection_closed();
        assert_eq!(handle.wait().await, SessionState::Cancelled);
    }

    #[tokio::test]
    async fn dropping_the_handle_ends_the_session() {
        let (connection, mut outbound) = ChannelConnection::pair();
        let handle = spawn_session(context(), connection);
        drop(handle);

        // The session owns the only sender; the channel closes with it.
        assert_eq!(outbound.recv().await, None);
    }
}
