//! Schema command implementation.

use crate::config::ServerConfig;
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// Prints the JSON schema of `account-forge.yml`.
pub struct SchemaCommand;

impl Command for SchemaCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let schema = schemars::schema_for!(ServerConfig);
        let json = serde_json::to_string_pretty(&schema).map_err(anyhow::Error::from)?;
        ui.message(&json);
        Ok(CommandResult::success())
    }
}
