//! Configuration file discovery and loading.
//!
//! The server looks for two files in its working directory:
//!
//! 1. `account-forge.yml`, the shared configuration
//! 2. `account-forge.local.yml`, machine-local overrides
//!
//! When neither exists, the built-in defaults are used. An explicit
//! `--config` path is loaded on its own, without overrides.

use crate::config::merger::merge_layers;
use crate::config::schema::ServerConfig;
use crate::error::{ForgeError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the shared configuration file.
pub const CONFIG_FILE: &str = "account-forge.yml";

/// Name of the local override file.
pub const LOCAL_CONFIG_FILE: &str = "account-forge.local.yml";

/// Configuration files found in a directory, in merge order.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// `account-forge.yml`
    pub main: Option<PathBuf>,

    /// `account-forge.local.yml`
    pub local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files in `dir`.
    pub fn discover(dir: &Path) -> Self {
        Self {
            main: existing(dir.join(CONFIG_FILE)),
            local: existing(dir.join(LOCAL_CONFIG_FILE)),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.main.iter().chain(self.local.iter()).collect()
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.exists().then_some(path)
}

/// Load a single config file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist and
/// `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<ServerConfig> {
    let content = read(path)?;
    parse_config(&content, path)
}

/// Parse YAML content into a [`ServerConfig`].
///
/// An empty document yields the defaults.
pub fn parse_config(content: &str, source_path: &Path) -> Result<ServerConfig> {
    if content.trim().is_empty() {
        return Ok(ServerConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ForgeError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ForgeError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ForgeError::Io(e)
        }
    })
}

fn load_config_value(path: &Path) -> Result<serde_yaml::Value> {
    let content = read(path)?;
    if content.trim().is_empty() {
        return Ok(serde_yaml::Value::Mapping(Default::default()));
    }
    serde_yaml::from_str(&content).map_err(|e| ForgeError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and merge the config files found in `dir`.
pub fn load_merged_config(dir: &Path) -> Result<ServerConfig> {
    let paths = ConfigPaths::discover(dir);
    let existing = paths.all_existing();
    if existing.is_empty() {
        tracing::debug!("No configuration in {}, using defaults", dir.display());
        return Ok(ServerConfig::default());
    }

    let layers = existing
        .iter()
        .map(|path| load_config_value(path))
        .collect::<Result<Vec<_>>>()?;

    serde_yaml::from_value(merge_layers(&layers)).map_err(|e| ForgeError::ConfigParseError {
        path: dir.join(CONFIG_FILE),
        message: format!("Failed to parse merged config: {}", e),
    })
}

/// Load config with optional path override.
///
/// If `config_override` is provided, loads only that file without merging.
pub fn load_config(dir: &Path, config_override: Option<&Path>) -> Result<ServerConfig> {
    match config_override {
        Some(path) => load_config_file(path),
        None => load_merged_config(dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StoreConfig;
    use tempfile::TempDir;

    #[test]
    fn discover_finds_main_and_local() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "server_id: 1").unwrap();
        fs::write(temp.path().join(LOCAL_CONFIG_FILE), "server_id: 2").unwrap();

        let paths = ConfigPaths::discover(temp.path());
        assert!(paths.main.is_some());
        assert!(paths.local.is_some());
        assert_eq!(paths.all_existing().len(), 2);
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn local_file_overrides_main_file() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "server_id: 1\nsymbolic_name: Tar Valon\n",
        )
        .unwrap();
        fs::write(temp.path().join(LOCAL_CONFIG_FILE), "server_id: 9\n").unwrap();

        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(config.server_id, 9);
        assert_eq!(config.symbolic_name, "Tar Valon");
    }

    #[test]
    fn local_file_alone_is_enough() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(LOCAL_CONFIG_FILE),
            "store:\n  kind: file\n  path: accounts\n",
        )
        .unwrap();

        let config = load_merged_config(temp.path()).unwrap();
        assert_eq!(
            config.store,
            StoreConfig::File {
                path: PathBuf::from("accounts")
            }
        );
    }

    #[test]
    fn invalid_yaml_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.yml");
        fs::write(&path, "server_id: [not a number").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ForgeError::ConfigParseError { .. }));
        assert!(err.to_string().contains("broken.yml"));
    }

    #[test]
    fn explicit_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = load_config(temp.path(), Some(&temp.path().join("nope.yml"))).unwrap_err();
        assert!(matches!(err, ForgeError::ConfigNotFound { .. }));
    }

    #[test]
    fn explicit_file_ignores_local_overrides() {
        let temp = TempDir::new().unwrap();
        let explicit = temp.path().join("prod.yml");
        fs::write(&explicit, "server_id: 4").unwrap();
        fs::write(temp.path().join(LOCAL_CONFIG_FILE), "server_id: 5").unwrap();

        let config = load_config(temp.path(), Some(&explicit)).unwrap();
        assert_eq!(config.server_id, 4);
    }

    #[test]
    fn empty_file_parses_to_defaults() {
        let config = parse_config("", Path::new("empty.yml")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }
}
