//! Name-to-handler dispatch.
//!
//! Step definitions refer to handlers by name (`server.method`,
//! `server.<suffix>.method`, templating markers). The [`HandlerTable`]
//! resolves those names against a fixed catalog registered at start-up.
//! Lookups never reach outside the table.

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::account::ConstructionTarget;
use crate::config::ServerConfig;

/// Failure of a handler invocation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// No handler is registered under this name.
    #[error("unknown handler '{0}'")]
    UnknownHandler(String),

    /// The client value failed validation. The message is shown to the
    /// player as is.
    #[error("{0}")]
    Rejected(String),
}

impl BuildError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// A handler that validates a client value and applies it to the target.
pub type Mutator = fn(&ServerConfig, &mut ConstructionTarget, &str) -> Result<(), BuildError>;

/// A zero-argument handler producing text for templating.
pub type Informer = fn(&ServerConfig, &ConstructionTarget) -> Option<String>;

/// Registered handlers, keyed by the names used in step definitions.
#[derive(Clone, Default)]
pub struct HandlerTable {
    mutators: BTreeMap<&'static str, Mutator>,
    informers: BTreeMap<&'static str, Informer>,
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("mutators", &self.mutators.keys().collect::<Vec<_>>())
            .field("informers", &self.informers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The table with every built-in handler registered.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for &(name, handler) in super::builders::CATALOG {
            table.register(name, handler);
        }
        for &(name, handler) in super::info::CATALOG {
            table.register_informer(name, handler);
        }
        table
    }

    /// Register a mutating handler, replacing any previous one.
    pub fn register(&mut self, name: &'static str, handler: Mutator) {
        self.mutators.insert(name, handler);
    }

    /// Register a zero-argument handler, replacing any previous one.
    pub fn register_informer(&mut self, name: &'static str, handler: Informer) {
        self.informers.insert(name, handler);
    }

    pub fn has_mutator(&self, name: &str) -> bool {
        self.mutators.contains_key(name)
    }

    pub fn has_informer(&self, name: &str) -> bool {
        self.informers.contains_key(name)
    }

    pub fn mutator_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.mutators.keys().copied()
    }

    pub fn informer_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.informers.keys().copied()
    }

    /// Invoke the mutating handler `name` with the client value `arg`.
    pub fn invoke(
        &self,
        name: &str,
        config: &ServerConfig,
        target: &mut ConstructionTarget,
        arg: &str,
    ) -> Result<(), BuildError> {
        let handler = self
            .mutators
            .get(name)
            .ok_or_else(|| BuildError::UnknownHandler(name.to_string()))?;
        handler(config, target, arg)
    }

    /// Invoke the zero-argument handler `name`.
    ///
    /// `Ok(None)` means the handler exists but has nothing to say yet.
    pub fn invoke0(
        &self,
        name: &str,
        config: &ServerConfig,
        target: &ConstructionTarget,
    ) -> Result<Option<String>, BuildError> {
        let handler = self
            .informers
            .get(name)
            .ok_or_else(|| BuildError::UnknownHandler(name.to_string()))?;
        Ok(handler(config, target))
    }
}
