//! Check command implementation.
//!
//! `account-forge check` loads the configuration and the step
//! definitions exactly as `serve` would, reports every problem found and
//! prints a short summary.

use crate::cli::args::CheckArgs;
use crate::config::{validate_config, StoreConfig};
use crate::error::{ForgeError, Result};
use crate::handlers::HandlerTable;
use crate::steps::StepRegistry;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, ConfigSource};

/// The check command implementation.
pub struct CheckCommand {
    source: ConfigSource,
    args: CheckArgs,
}

impl CheckCommand {
    pub fn new(source: ConfigSource, args: CheckArgs) -> Self {
        Self { source, args }
    }
}

impl Command for CheckCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let config = match self.source.load() {
            Ok(config) => config,
            Err(ForgeError::ConfigParseError { path, message }) => {
                ui.error(&format!("Parse error in {}: {}", path.display(), message));
                return Ok(CommandResult::failure(1));
            }
            Err(e) => return Err(e),
        };

        let problems = validate_config(&config);
        for problem in &problems {
            ui.error(&format!("[{}] {}", problem.rule, problem.message));
        }

        let handlers = HandlerTable::builtin();
        let registry = match StepRegistry::from_config(&config, &handlers) {
            Ok(registry) => Some(registry),
            Err(e) => {
                ui.error(&e.to_string());
                None
            }
        };

        let Some(registry) = registry.filter(|_| problems.is_empty()) else {
            return Ok(CommandResult::failure(1));
        };

        ui.show_header(&config.symbolic_name);
        ui.show_field("server id", &config.server_id.to_string());
        ui.show_field("bind", &config.bind);
        ui.show_field(
            "store",
            &match &config.store {
                StoreConfig::Memory => "memory".to_string(),
                StoreConfig::File { path } => format!("file ({})", path.display()),
            },
        );
        ui.show_field("first step", registry.first_step_id());
        ui.show_field("steps", &registry.len().to_string());
        ui.show_field("handlers", &handlers.mutator_names().count().to_string());
        ui.show_field("fingerprint", registry.fingerprint());

        if self.args.steps {
            for id in registry.ids() {
                ui.message(id);
            }
        }

        ui.success("Configuration is valid");
        Ok(CommandResult::success())
    }
}
