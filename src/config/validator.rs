//! Server configuration validation.
//!
//! This module checks a loaded [`ServerConfig`] for values that would
//! make the server misbehave at runtime:
//! - Names and keys that must not be empty
//! - The bind address must be a socket address
//! - The access key must not collide with the deletion request prefix
//! - Special character keys must be distinct

use crate::access::DELETE_PREFIX;
use crate::config::schema::{ServerConfig, StoreConfig};
use crate::error::{ForgeError, Result};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    fn new(rule: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a configuration and return all errors.
///
/// This function collects all validation errors rather than stopping
/// at the first one.
pub fn validate_config(config: &ServerConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_identity(config));
    errors.extend(validate_network(config));
    errors.extend(validate_special_keys(config));

    if let StoreConfig::File { path } = &config.store {
        if path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "empty-store-path",
                "File store requires a non-empty 'path'",
            ));
        }
    }

    errors
}

fn validate_identity(config: &ServerConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.symbolic_name.trim().is_empty() {
        errors.push(ValidationError::new(
            "empty-name",
            "'symbolic_name' must not be empty",
        ));
    }
    if config.first_step.trim().is_empty() {
        errors.push(ValidationError::new(
            "empty-first-step",
            "'first_step' must name a step",
        ));
    }
    if config.access_key.is_empty() {
        errors.push(ValidationError::new(
            "empty-access-key",
            "'access_key' must not be empty",
        ));
    } else if config.access_key.starts_with(DELETE_PREFIX) {
        errors.push(ValidationError::new(
            "reserved-access-key",
            format!(
                "'access_key' must not start with '{}', which is reserved for deletion requests",
                DELETE_PREFIX
            ),
        ));
    }

    errors
}

fn validate_network(config: &ServerConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.bind.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "invalid-bind",
            format!("'bind' is not a socket address: {}", config.bind),
        ));
    }
    if config.max_connections == 0 {
        errors.push(ValidationError::new(
            "no-connections",
            "'max_connections' must be at least 1",
        ));
    }

    errors
}

fn validate_special_keys(config: &ServerConfig) -> Vec<ValidationError> {
    let keys = &config.special_keys;
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut errors = Vec::new();

    for (name, key) in keys.entries() {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            continue;
        };
        if let Some(other) = seen.insert(key, name) {
            errors.push(ValidationError::new(
                "duplicate-special-key",
                format!(
                    "Special keys '{}' and '{}' use the same value",
                    other, name
                ),
            ));
        }
    }

    errors
}

/// Validate and return Result (for convenience).
///
/// # Errors
///
/// Returns `ConfigValidationError` if any validation rules fail.
pub fn validate(config: &ServerConfig) -> Result<()> {
    let errors = validate_config(config);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(ForgeError::ConfigValidationError {
            message: messages.join("; "),
        })
    }
}
