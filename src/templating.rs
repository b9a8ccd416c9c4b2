//! Personalization of step definitions before they are sent.
//!
//! A step may declare templating markers of the form
//!
//! ```yaml
//! init.label: "Welcome to $SERVER$ !"
//! server.label.$SERVER$: getServerName
//! ```
//!
//! For each marker the zero-argument handler (`getServerName`) is invoked
//! and its result replaces the **first** occurrence of the pattern
//! (`$SERVER$`) in the sibling `init.<suffix>` property. A handler that
//! yields nothing is rendered as [`ERROR_SENTINEL`].
//!
//! Only the copy sent to the client changes; the registry's definition
//! is never modified, so personalizing twice against the same target
//! produces the same message.

use crate::account::ConstructionTarget;
use crate::config::ServerConfig;
use crate::handlers::HandlerTable;
use crate::protocol::StepMessage;
use crate::steps::{StepDefinition, INIT_PREFIX, SERVER_PREFIX};

/// Substituted when a handler has no value.
pub const ERROR_SENTINEL: &str = "#ERROR#";

/// A `server.<suffix>.$PATTERN$` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateMarker<'a> {
    /// The property key holding the marker.
    pub key: &'a str,
    /// Names the `init.<suffix>` property to rewrite.
    pub suffix: &'a str,
    /// Text to replace, dollars included.
    pub pattern: &'a str,
    /// Zero-argument handler producing the replacement.
    pub handler: &'a str,
}

impl<'a> TemplateMarker<'a> {
    /// Parse a property as a templating marker.
    ///
    /// Returns `None` for properties that are not markers, and for
    /// markers with an empty suffix, pattern, or handler name.
    pub fn parse(key: &'a str, value: &'a str) -> Option<Self> {
        let rest = key.strip_prefix(SERVER_PREFIX)?;
        if !rest.ends_with('$') {
            return None;
        }
        let dollar = rest.find('$')?;
        let suffix = rest[..dollar].strip_suffix('.')?;
        let pattern = &rest[dollar..];
        let handler = value.trim();

        if suffix.is_empty() || pattern.len() < 2 || handler.is_empty() {
            return None;
        }
        Some(Self {
            key,
            suffix,
            pattern,
            handler,
        })
    }
}

/// Whether `key` has the shape of a marker, valid or not.
pub fn looks_like_marker(key: &str) -> bool {
    key.starts_with(SERVER_PREFIX) && key.ends_with('$') && key.contains(".$")
}

/// All well-formed markers declared by a step, in declaration order.
pub fn markers(step: &StepDefinition) -> impl Iterator<Item = TemplateMarker<'_>> {
    step.properties
        .with_prefix(SERVER_PREFIX)
        .filter_map(|(k, v)| TemplateMarker::parse(k, v))
}

/// Build the client message for `step`, resolving every marker against
/// `target`.
pub fn personalize(
    step: &StepDefinition,
    target: &ConstructionTarget,
    handlers: &HandlerTable,
    config: &ServerConfig,
) -> StepMessage {
    let mut properties = step.client_properties();

    for marker in markers(step) {
        let init_key = format!("{}{}", INIT_PREFIX, marker.suffix);
        let Some(text) = properties.get(&init_key) else {
            continue;
        };
        if !text.contains(marker.pattern) {
            continue;
        }

        let value = match handlers.invoke0(marker.handler, config, target) {
            Ok(Some(value)) => value,
            Ok(None) => ERROR_SENTINEL.to_string(),
            Err(e) => {
                tracing::error!(step = %step.id, marker = marker.key, "Templating failed: {}", e);
                ERROR_SENTINEL.to_string()
            }
        };
        let replaced = text.replacen(marker.pattern, &value, 1);
        properties.insert(init_key, replaced);
    }

    StepMessage::new(step, properties)
}
