//! Everything a session needs, assembled once at start-up.

use anyhow::Context as _;

use crate::access::AccessControl;
use crate::config::ServerConfig;
use crate::error::Result;
use crate::gateway::CommitGateway;
use crate::handlers::HandlerTable;
use crate::steps::StepRegistry;
use crate::store::open_store;

/// Shared, read-only server state.
///
/// Built once and handed to every session behind an `Arc`. Only the
/// gateway and access control hold mutable state, each behind its own
/// lock.
#[derive(Debug)]
pub struct ServerContext {
    pub config: ServerConfig,
    pub handlers: HandlerTable,
    pub registry: StepRegistry,
    pub gateway: CommitGateway,
    pub access: AccessControl,
}

impl ServerContext {
    /// Assemble a context from its parts.
    pub fn new(
        config: ServerConfig,
        handlers: HandlerTable,
        registry: StepRegistry,
        gateway: CommitGateway,
    ) -> Self {
        let access = AccessControl::new(config.access_key.clone());
        Self {
            config,
            handlers,
            registry,
            gateway,
            access,
        }
    }

    /// Load the steps and open the store named by `config`.
    ///
    /// Special keys left unset in the configuration get random values.
    pub fn from_config(mut config: ServerConfig) -> Result<Self> {
        let generated = config.special_keys.generate_missing();
        for (name, key) in config.special_keys.entries() {
            if generated.contains(&name) {
                tracing::info!(
                    character = name,
                    key = key.unwrap_or_default(),
                    "Generated special character key"
                );
            }
        }

        let handlers = HandlerTable::builtin();
        let registry = StepRegistry::from_config(&config, &handlers)?;
        let (store, ids) = open_store(&config.store).context("failed to open account store")?;
        let gateway = CommitGateway::new(store, ids, config.server_id);

        tracing::info!(
            server = %config.symbolic_name,
            server_id = config.server_id,
            steps = registry.len(),
            accounts = gateway.store().len(),
            "Server context ready"
        );
        Ok(Self::new(config, handlers, registry, gateway))
    }
}
