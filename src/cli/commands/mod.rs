//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. This allows:
//! - Single binary with subcommands (`account-forge serve`, `account-forge check`)
//! - Shared configuration discovery
//! - Consistent global flag handling

pub mod check;
pub mod dispatcher;
pub mod schema;
pub mod serve;

pub use dispatcher::{Command, CommandDispatcher, CommandResult, ConfigSource};
