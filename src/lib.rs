//! account-forge - data-driven, multi-step account creation server.
//!
//! A client connects, presents an access key and is walked through a
//! wizard whose pages, branches and validation bindings are declared in
//! YAML step definitions. Answers are applied to an account under
//! construction; the last page commits it to the account store.
//!
//! # Modules
//!
//! - [`steps`] - Step definitions, their validation and the registry
//! - [`handlers`] - Name-to-function table applying client values
//! - [`templating`] - Personalization of steps before they are sent
//! - [`session`] - The per-connection workflow state machine
//! - [`gateway`] - Atomic hand-off of finished accounts to the store
//! - [`store`] - Account storage backends
//! - [`access`] - Connection keys and account deletion
//! - [`transport`] - JSON-lines TCP adapter
//! - [`config`] - Server configuration loading and validation
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use account_forge::config::ServerConfig;
//! use account_forge::context::ServerContext;
//! use account_forge::session::{RecordingConnection, WorkflowSession};
//!
//! let ctx = Arc::new(ServerContext::from_config(ServerConfig::default()).unwrap());
//! let mut session = WorkflowSession::new(ctx, RecordingConnection::new());
//! session.start().unwrap();
//! assert_eq!(session.current_step_id(), Some("welcome"));
//! ```

pub mod access;
pub mod account;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod protocol;
pub mod session;
pub mod steps;
pub mod store;
pub mod templating;
pub mod transport;
pub mod ui;

pub use error::{ForgeError, Result};
