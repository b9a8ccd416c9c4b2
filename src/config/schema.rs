//! Configuration schema definitions for account-forge.
//!
//! This module contains the struct definitions that map to the
//! `account-forge.yml` configuration file.

use rand::distributions::Alphanumeric;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for `account-forge.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServerConfig {
    /// Numeric id of this server, embedded in every account it creates.
    pub server_id: u32,

    /// Display name returned by the `getServerName` handler.
    pub symbolic_name: String,

    /// Contact address returned by the `getAdminEmail` handler.
    pub admin_email: String,

    /// Socket address the TCP adapter listens on.
    pub bind: String,

    /// Connection key that opens an account-creation session.
    pub access_key: String,

    /// Id of the step every session starts with.
    pub first_step: String,

    /// Directory of step definition files. The built-in wizard is used
    /// when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_dir: Option<PathBuf>,

    /// Where accounts are persisted.
    pub store: StoreConfig,

    /// Secret keys unlocking special characters.
    pub special_keys: SpecialKeys,

    /// Maximum number of concurrent sessions served by the TCP adapter.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_id: 0,
            symbolic_name: "account-forge".to_string(),
            admin_email: "admin@localhost".to_string(),
            bind: "127.0.0.1:25500".to_string(),
            access_key: default_access_key(),
            first_step: "welcome".to_string(),
            steps_dir: None,
            store: StoreConfig::default(),
            special_keys: SpecialKeys::default(),
            max_connections: 64,
        }
    }
}

fn default_access_key() -> String {
    "AccountServerPlease!".to_string()
}

/// Account store backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Accounts live in memory and vanish on restart.
    #[default]
    Memory,
    /// One JSON document per account under `path`.
    File { path: PathBuf },
}

/// Keys typed by players to obtain a special character.
///
/// An unset key is replaced by a random one when the server starts; an
/// empty key disables that character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SpecialKeys {
    /// Unlocks the Dark One.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shaitan: Option<String>,
    /// Unlocks the Amyrlin Seat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amyrlin: Option<String>,
    /// Unlocks the Keeper of the Chronicles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chronicles: Option<String>,
    /// Unlocks the M'Hael.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mhael: Option<String>,
}

/// Length of a generated special key.
pub const GENERATED_KEY_LEN: usize = 23;

impl SpecialKeys {
    /// Every key with its name.
    pub fn entries(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("shaitan", self.shaitan.as_deref()),
            ("amyrlin", self.amyrlin.as_deref()),
            ("chronicles", self.chronicles.as_deref()),
            ("mhael", self.mhael.as_deref()),
        ]
    }

    /// Give every unset key a random value. Returns the names filled in.
    pub fn generate_missing(&mut self) -> Vec<&'static str> {
        let mut generated = Vec::new();
        for (name, key) in [
            ("shaitan", &mut self.shaitan),
            ("amyrlin", &mut self.amyrlin),
            ("chronicles", &mut self.chronicles),
            ("mhael", &mut self.mhael),
        ] {
            if key.is_none() {
                *key = Some(random_key());
                generated.push(name);
            }
        }
        generated
    }
}

fn random_key() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_KEY_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: ServerConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.access_key, "AccountServerPlease!");
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn parses_file_store() {
        let yaml = r#"
server_id: 7
store:
  kind: file
  path: /var/lib/forge
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server_id, 7);
        assert_eq!(
            config.store,
            StoreConfig::File {
                path: PathBuf::from("/var/lib/forge")
            }
        );
    }

    #[test]
    fn special_keys_default_to_unset() {
        let yaml = "special_keys:\n  shaitan: \"\"\n";
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.special_keys.shaitan.as_deref(), Some(""));
        assert_eq!(config.special_keys.mhael, None);
        assert_eq!(ServerConfig::default().special_keys.amyrlin, None);
    }

    #[test]
    fn generate_missing_fills_only_unset_keys() {
        let mut keys = SpecialKeys {
            shaitan: Some(String::new()),
            amyrlin: Some("flame".to_string()),
            ..Default::default()
        };

        let generated = keys.generate_missing();

        assert_eq!(generated, vec!["chronicles", "mhael"]);
        assert_eq!(keys.shaitan.as_deref(), Some(""));
        assert_eq!(keys.amyrlin.as_deref(), Some("flame"));
        let chronicles = keys.chronicles.as_deref().unwrap();
        assert_eq!(chronicles.len(), GENERATED_KEY_LEN);
        assert!(chronicles.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(keys.chronicles, keys.mhael);
    }

    #[test]
    fn json_schema_lists_top_level_fields() {
        let schema = schemars::schema_for!(ServerConfig);
        let json = serde_json::to_string(&schema).unwrap();
        assert!(json.contains("first_step"));
        assert!(json.contains("special_keys"));
    }
}
