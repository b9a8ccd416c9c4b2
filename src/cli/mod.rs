//! Command-line interface for account-forge.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{CheckArgs, Cli, Commands, ServeArgs};
pub use commands::{Command, CommandDispatcher, CommandResult};
