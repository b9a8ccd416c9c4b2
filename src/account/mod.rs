//! Account model built by the creation wizard.
//!
//! - [`target`] - the in-progress account graph
//! - [`character`] - character classes, ranks, and colour catalogs

pub mod character;
pub mod target;

pub use character::{Character, CharacterClass, CLOAK_COLORS, CLOAK_RANKS, HAIR_COLORS};
pub use target::{account_name, ConstructionTarget, Inventory, Profile};
