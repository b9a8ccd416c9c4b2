//! Server configuration loading, parsing, and validation.
//!
//! This module handles all aspects of configuration:
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Layering of local overrides in [`merger`]
//! - Validation in [`validator`]
//!
//! # Example
//!
//! ```
//! use account_forge::config::{load_merged_config, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! fs::write(temp.path().join("account-forge.yml"), "server_id: 12").unwrap();
//!
//! let config = load_merged_config(temp.path()).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.server_id, 12);
//! ```

pub mod loader;
pub mod merger;
pub mod schema;
pub mod validator;

pub use loader::{
    load_config, load_config_file, load_merged_config, parse_config, ConfigPaths, CONFIG_FILE,
    LOCAL_CONFIG_FILE,
};
pub use merger::{deep_merge, merge_layers};
pub use schema::{ServerConfig, SpecialKeys, StoreConfig, GENERATED_KEY_LEN};
pub use validator::{validate, validate_config, ValidationError};
