//! The step definition registry.
//!
//! Definitions are loaded once at start-up, validated as a whole, and
//! then shared read-only by every session. The registry is either the
//! built-in wizard embedded in the binary or a directory of YAML files
//! named by the configuration.

use include_dir::{include_dir, Dir};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::definition::{StepDefinition, StepFile};
use super::validator;
use crate::config::ServerConfig;
use crate::error::{ForgeError, Result};
use crate::handlers::HandlerTable;

/// Embedded default wizard.
static WIZARD_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/wizard");

/// Loaded, validated step definitions.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: HashMap<String, Arc<StepDefinition>>,
    ids: Vec<String>,
    first_step: String,
    fingerprint: String,
}

impl StepRegistry {
    /// Build a registry from definitions, failing on any inconsistency.
    pub fn from_definitions(
        definitions: Vec<StepDefinition>,
        first_step: &str,
        handlers: &HandlerTable,
    ) -> Result<Self> {
        validator::validate(&definitions, first_step, handlers)?;

        let mut ids: Vec<String> = definitions.iter().map(|d| d.id.clone()).collect();
        ids.sort();
        let fingerprint = fingerprint(&definitions);
        let steps = definitions
            .into_iter()
            .map(|d| (d.id.clone(), Arc::new(d)))
            .collect();

        Ok(Self {
            steps,
            ids,
            first_step: first_step.to_string(),
            fingerprint,
        })
    }

    /// Load the built-in wizard.
    pub fn builtin(first_step: &str, handlers: &HandlerTable) -> Result<Self> {
        let mut files: Vec<_> = WIZARD_DIR
            .files()
            .filter(|f| is_yaml(f.path()))
            .collect();
        files.sort_by(|a, b| a.path().cmp(b.path()));

        let mut definitions = Vec::new();
        for file in files {
            let name = file.path().display().to_string();
            let content = file
                .contents_utf8()
                .ok_or_else(|| ForgeError::StepParseError {
                    source_name: name.clone(),
                    message: "Invalid UTF-8".to_string(),
                })?;
            definitions.extend(parse_steps(content, &name)?);
        }

        Self::from_definitions(definitions, first_step, handlers)
    }

    /// Load every `*.yml`/`*.yaml` file in `dir`, in file name order.
    pub fn load_dir(dir: &Path, first_step: &str, handlers: &HandlerTable) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && is_yaml(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        if paths.is_empty() {
            return Err(ForgeError::StepDefinitionError {
                message: format!("No step definition files in {}", dir.display()),
            });
        }

        let mut definitions = Vec::new();
        for path in paths {
            let content = fs::read_to_string(&path)?;
            definitions.extend(parse_steps(&content, &path.display().to_string())?);
        }

        Self::from_definitions(definitions, first_step, handlers)
    }

    /// Load the registry selected by the configuration.
    pub fn from_config(config: &ServerConfig, handlers: &HandlerTable) -> Result<Self> {
        let registry = match &config.steps_dir {
            Some(dir) => Self::load_dir(dir, &config.first_step, handlers)?,
            None => Self::builtin(&config.first_step, handlers)?,
        };
        tracing::info!(
            steps = registry.len(),
            fingerprint = %registry.fingerprint(),
            "Loaded step definitions"
        );
        Ok(registry)
    }

    /// Look up a step by id.
    pub fn get_step(&self, id: &str) -> Option<Arc<StepDefinition>> {
        self.steps.get(id).cloned()
    }

    /// The step sessions start with.
    pub fn first_step(&self) -> Option<Arc<StepDefinition>> {
        self.get_step(&self.first_step)
    }

    pub fn first_step_id(&self) -> &str {
        &self.first_step
    }

    /// Step ids in sorted order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Short hash identifying the loaded definitions.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yml" || ext == "yaml")
}

/// Parse a step file.
pub fn parse_steps(content: &str, source_name: &str) -> Result<Vec<StepDefinition>> {
    let file: StepFile =
        serde_yaml::from_str(content).map_err(|e| ForgeError::StepParseError {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
    Ok(file.steps)
}

/// Hash of the definitions, independent of file layout and load order.
fn fingerprint(definitions: &[StepDefinition]) -> String {
    let mut sorted: Vec<&StepDefinition> = definitions.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = Sha256::new();
    for step in sorted {
        hasher.update(step.id.as_bytes());
        hasher.update(
            format!(
                "|{:?}|{}|{}|{}|{}\n",
                step.kind, step.title, step.previous_enabled, step.next_enabled, step.last_step
            )
            .as_bytes(),
        );
        for (key, value) in step.properties.iter() {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
