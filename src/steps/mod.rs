//! Step definitions for the account-creation wizard.
//!
//! - [`definition`] - [`StepDefinition`] and its ordered [`Properties`]
//! - [`registry`] - [`StepRegistry`], loading and indexing definitions
//! - [`validator`] - load-time consistency checks
//!
//! # Example
//!
//! ```
//! use account_forge::handlers::HandlerTable;
//! use account_forge::steps::StepRegistry;
//!
//! let registry = StepRegistry::builtin("welcome", &HandlerTable::builtin()).unwrap();
//! let first = registry.first_step().unwrap();
//! assert!(!first.previous_enabled);
//! ```

pub mod definition;
pub mod registry;
pub mod validator;

pub use definition::{
    Properties, StepDefinition, StepFile, StepKind, DATA_PREFIX, INIT_PREFIX, SERVER_PREFIX,
};
pub use registry::{parse_steps, StepRegistry};
pub use validator::{validate_steps, StepValidationError};
