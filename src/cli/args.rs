//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// account-forge - data-driven account creation server.
#[derive(Debug, Parser)]
#[command(name = "account-forge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to config file (overrides account-forge.yml discovery)
    #[arg(short, long, global = true, env = "ACCOUNT_FORGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory searched for account-forge.yml (defaults to current directory)
    #[arg(short, long, global = true)]
    pub dir: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the account creation server
    Serve(ServeArgs),

    /// Validate the configuration and step definitions
    Check(CheckArgs),

    /// Print the JSON schema of the configuration file
    Schema,
}

/// Arguments for the `serve` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides `bind` from the config)
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Arguments for the `check` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CheckArgs {
    /// Also list every step id
    #[arg(long)]
    pub steps: bool,
}
