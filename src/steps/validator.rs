//! Consistency checks for a set of step definitions.
//!
//! Runs once at load time so that broken step data stops the server
//! before any client connects:
//! - Step ids must be unique and non-empty
//! - Every `next` and `previous` link must name a known step
//! - Branching keys must have a non-empty suffix
//! - Handler names must exist in the handler table
//! - Non-final steps must declare at least one way forward
//! - The designated first step must exist

use std::collections::HashSet;

use super::definition::{StepDefinition, SERVER_PREFIX};
use crate::error::{ForgeError, Result};
use crate::handlers::HandlerTable;
use crate::templating::{looks_like_marker, TemplateMarker};

/// A problem found in the step definitions.
#[derive(Debug, Clone)]
pub struct StepValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
    /// Offending step, if any
    pub step: Option<String>,
}

impl StepValidationError {
    fn new(rule: &str, step: Option<&str>, message: String) -> Self {
        Self {
            rule: rule.to_string(),
            message,
            step: step.map(str::to_string),
        }
    }
}

/// Validate step definitions and return all errors.
pub fn validate_steps(
    steps: &[StepDefinition],
    first_step: &str,
    handlers: &HandlerTable,
) -> Vec<StepValidationError> {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for step in steps {
        if step.id.trim().is_empty() {
            errors.push(StepValidationError::new(
                "empty-id",
                None,
                "A step has an empty id".to_string(),
            ));
        } else if !ids.insert(step.id.as_str()) {
            errors.push(StepValidationError::new(
                "duplicate-step",
                Some(&step.id),
                format!("Step '{}' is defined more than once", step.id),
            ));
        }
    }

    if !ids.contains(first_step) {
        errors.push(StepValidationError::new(
            "missing-first-step",
            None,
            format!("First step '{}' is not defined", first_step),
        ));
    }

    for step in steps {
        errors.extend(validate_links(step, &ids));
        errors.extend(validate_handlers(step, handlers));
    }

    errors
}

fn validate_links(step: &StepDefinition, ids: &HashSet<&str>) -> Vec<StepValidationError> {
    let mut errors = Vec::new();
    let mut has_next = false;

    for (key, target) in step.links() {
        if key.ends_with(".next") {
            has_next = true;
        }
        if is_malformed_branch(key) {
            errors.push(StepValidationError::new(
                "malformed-branch",
                Some(&step.id),
                format!("Step '{}' has a branching key with no suffix: '{}'", step.id, key),
            ));
        }
        if !ids.contains(target) {
            errors.push(StepValidationError::new(
                "unknown-link",
                Some(&step.id),
                format!(
                    "Step '{}' links to '{}' via '{}', which does not exist",
                    step.id, target, key
                ),
            ));
        }
    }

    if !step.last_step && !has_next {
        errors.push(StepValidationError::new(
            "dead-end",
            Some(&step.id),
            format!(
                "Step '{}' is not a last step but declares no next step",
                step.id
            ),
        ));
    }

    errors
}

/// `server..next`, `server..method` and friends.
fn is_malformed_branch(key: &str) -> bool {
    key.strip_prefix(SERVER_PREFIX)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn validate_handlers(step: &StepDefinition, handlers: &HandlerTable) -> Vec<StepValidationError> {
    let mut errors = Vec::new();

    for (key, value) in step.properties.with_prefix(SERVER_PREFIX) {
        if key.ends_with(".method") || key == "server.method" {
            if is_malformed_branch(key) {
                errors.push(StepValidationError::new(
                    "malformed-branch",
                    Some(&step.id),
                    format!("Step '{}' has a method key with no suffix: '{}'", step.id, key),
                ));
            }
            if !handlers.has_mutator(value) {
                errors.push(StepValidationError::new(
                    "unknown-method",
                    Some(&step.id),
                    format!("Step '{}' uses unknown handler '{}' in '{}'", step.id, value, key),
                ));
            }
            continue;
        }

        if looks_like_marker(key) {
            match TemplateMarker::parse(key, value) {
                Some(marker) if !handlers.has_informer(marker.handler) => {
                    errors.push(StepValidationError::new(
                        "unknown-template-handler",
                        Some(&step.id),
                        format!(
                            "Step '{}' uses unknown handler '{}' in '{}'",
                            step.id, marker.handler, key
                        ),
                    ));
                }
                Some(_) => {}
                None => errors.push(StepValidationError::new(
                    "malformed-marker",
                    Some(&step.id),
                    format!("Step '{}' has a malformed templating key '{}'", step.id, key),
                )),
            }
        }
    }

    errors
}

/// Validate and return Result (for convenience).
///
/// # Errors
///
/// Returns `StepDefinitionError` if any validation rules fail.
pub fn validate(steps: &[StepDefinition], first_step: &str, handlers: &HandlerTable) -> Result<()> {
    let errors = validate_steps(steps, first_step, handlers);

    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
        Err(ForgeError::StepDefinitionError {
            message: messages.join("; "),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, props: &[(&str, &str)]) -> StepDefinition {
        let mut step = StepDefinition::new(id);
        step.properties = props.iter().copied().collect();
        step
    }

    fn last(id: &str, props: &[(&str, &str)]) -> StepDefinition {
        let mut step = step(id, props);
        step.last_step = true;
        step
    }

    fn rules(steps: &[StepDefinition], first: &str) -> Vec<String> {
        validate_steps(steps, first, &HandlerTable::builtin())
            .into_iter()
            .map(|e| e.rule)
            .collect()
    }

    #[test]
    fn consistent_steps_pass() {
        let steps = vec![
            step(
                "login",
                &[
                    ("data.login", ""),
                    ("server.login.method", "setLogin"),
                    ("server.next", "done"),
                ],
            ),
            last("done", &[("server.previous", "login")]),
        ];
        assert!(rules(&steps, "login").is_empty());
        assert!(validate(&steps, "login", &HandlerTable::builtin()).is_ok());
    }

    #[test]
    fn reports_dangling_links() {
        let steps = vec![
            step("a", &[("server.next", "b"), ("server.previous", "zero")]),
            last("b", &[]),
        ];
        let errors = validate_steps(&steps, "a", &HandlerTable::builtin());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule, "unknown-link");
        assert!(errors[0].message.contains("zero"));
    }

    #[test]
    fn reports_missing_first_step() {
        let steps = vec![last("b", &[])];
        assert_eq!(rules(&steps, "a"), vec!["missing-first-step"]);
    }

    #[test]
    fn reports_duplicates() {
        let steps = vec![last("a", &[]), last("a", &[])];
        assert_eq!(rules(&steps, "a"), vec!["duplicate-step"]);
    }

    #[test]
    fn reports_malformed_branch_keys() {
        let steps = vec![
            step("a", &[("server..next", "b")]),
            last("b", &[]),
        ];
        assert!(rules(&steps, "a").contains(&"malformed-branch".to_string()));
    }

    #[test]
    fn reports_unknown_handlers() {
        let steps = vec![last(
            "a",
            &[
                ("init.x", "$Y$"),
                ("data.name", ""),
                ("server.name.method", "setNickname"),
                ("server.x.$Y$", "getWeather"),
            ],
        )];
        let found = rules(&steps, "a");
        assert!(found.contains(&"unknown-method".to_string()));
        assert!(found.contains(&"unknown-template-handler".to_string()));
    }

    #[test]
    fn reports_malformed_markers() {
        let steps = vec![last("a", &[("server..$Y$", "getServerName")])];
        assert!(rules(&steps, "a").contains(&"malformed-marker".to_string()));
    }

    #[test]
    fn reports_dead_ends() {
        let steps = vec![step("a", &[])];
        assert_eq!(rules(&steps, "a"), vec!["dead-end"]);
    }

    #[test]
    fn branch_next_alone_is_a_way_forward() {
        let steps = vec![
            step(
                "a",
                &[
                    ("init.choice0", "Warder"),
                    ("data.choice", "0"),
                    ("server.method", "setWotCharacterClass"),
                    ("server.choice0.next", "b"),
                ],
            ),
            last("b", &[]),
        ];
        assert!(rules(&steps, "a").is_empty());
    }

    #[test]
    fn data_keys_without_handlers_are_allowed() {
        let steps = vec![
            step(
                "a",
                &[
                    ("init.choice0", "Left"),
                    ("init.choice1", "Right"),
                    ("data.choice", "0"),
                    ("data.nickname", ""),
                    ("server.choice0.next", "b"),
                    ("server.choice1.next", "b"),
                ],
            ),
            last("b", &[]),
        ];
        assert!(rules(&steps, "a").is_empty());
    }

    #[test]
    fn combined_message_lists_every_problem() {
        let steps = vec![step("a", &[("server.next", "nowhere")])];
        let err = validate(&steps, "start", &HandlerTable::builtin()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("start"));
        assert!(msg.contains("nowhere"));
    }
}
