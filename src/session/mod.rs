//! Workflow sessions.
//!
//! One session exists per client connection. It owns the account under
//! construction, walks the client through the step graph and hands the
//! finished account to the commit gateway.
//!
//! - [`WorkflowSession`]: the synchronous state machine
//! - [`spawn_session`]: runs a session behind a tokio mailbox
//! - [`Connection`]: the outbound seam, with [`ChannelConnection`] for
//!   transports and [`RecordingConnection`] for tests

mod actor;
mod connection;
mod state;
mod workflow;

pub use actor::{spawn_session, SessionHandle};
pub use connection::{ChannelConnection, Connection, Outbound, RecordingConnection};
pub use state::SessionState;
pub use workflow::WorkflowSession;
