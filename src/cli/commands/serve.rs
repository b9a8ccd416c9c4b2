//! Serve command implementation.
//!
//! `account-forge serve` builds the server context and runs the TCP
//! adapter until interrupted.

use std::sync::Arc;

use crate::cli::args::ServeArgs;
use crate::config::validate_config;
use crate::context::ServerContext;
use crate::error::Result;
use crate::transport;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult, ConfigSource};

/// The serve command implementation.
pub struct ServeCommand {
    source: ConfigSource,
    args: ServeArgs,
}

impl ServeCommand {
    pub fn new(source: ConfigSource, args: ServeArgs) -> Self {
        Self { source, args }
    }
}

impl Command for ServeCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let mut config = self.source.load()?;
        if let Some(bind) = &self.args.bind {
            config.bind = bind.clone();
        }

        let problems = validate_config(&config);
        if !problems.is_empty() {
            for problem in &problems {
                ui.error(&format!("[{}] {}", problem.rule, problem.message));
            }
            return Ok(CommandResult::failure(2));
        }

        let ctx = Arc::new(ServerContext::from_config(config)?);
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(run(ctx, ui))?;

        ui.message("Server stopped");
        Ok(CommandResult::success())
    }
}

async fn run(ctx: Arc<ServerContext>, ui: &mut dyn UserInterface) -> Result<()> {
    let listener = transport::bind(&ctx).await?;
    let local = listener.local_addr()?;
    ui.success(&format!(
        "{} accepting accounts on {}",
        ctx.config.symbolic_name, local
    ));

    tokio::select! {
        result = transport::serve(Arc::clone(&ctx), listener) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
            Ok(())
        }
    }
}
