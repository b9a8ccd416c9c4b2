//! Handlers invoked by step definitions.
//!
//! - [`table`] - the [`HandlerTable`] resolving handler names
//! - [`builders`] - mutating handlers (`setLogin`, `setWotCharacterClass`, ...)
//! - [`info`] - zero-argument handlers used for templating
//!
//! Handler names keep the camelCase spelling used by existing step data.
//!
//! # Example
//!
//! ```
//! use account_forge::account::ConstructionTarget;
//! use account_forge::config::ServerConfig;
//! use account_forge::handlers::HandlerTable;
//!
//! let table = HandlerTable::builtin();
//! let config = ServerConfig::default();
//! let mut target = ConstructionTarget::new();
//!
//! table.invoke("setLogin", &config, &mut target, "egwene").unwrap();
//! assert_eq!(target.login.as_deref(), Some("egwene"));
//! ```

pub mod builders;
pub mod info;
pub mod table;

pub use table::{BuildError, HandlerTable, Informer, Mutator};
