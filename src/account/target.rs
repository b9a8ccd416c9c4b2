//! The account under construction.
//!
//! A [`ConstructionTarget`] is created empty when a session starts and is
//! filled in by handlers as the player answers each step. It is owned by
//! exactly one session until the commit gateway turns it into a stored
//! account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::character::Character;

/// Player-facing identity of an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Short nickname shown in game.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    /// Full name of the character.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_player_name: Option<String>,
    /// Free-form background story. `Some("")` means the player chose to
    /// write it later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_past: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<Character>,
}

/// Items owned by the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub items: Vec<String>,
}

impl Inventory {
    /// Items a new character starts with.
    pub fn starter(character: Option<&Character>) -> Self {
        let mut items = Vec::new();
        if let Some(color) = character.and_then(|c| c.cloak_color.as_deref()) {
            items.push(format!("{} cloak", color));
        }
        Self { items }
    }
}

/// An account as it is being assembled by a workflow session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructionTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Server that created the account. Set at commit.
    #[serde(default)]
    pub original_server_id: u32,
    /// Per-server sequence number. Set at commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_client_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_connection: Option<DateTime<Utc>>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub inventory: Inventory,
}

impl ConstructionTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn character(&self) -> Option<&Character> {
        self.profile.character.as_ref()
    }

    pub fn character_mut(&mut self) -> Option<&mut Character> {
        self.profile.character.as_mut()
    }

    /// Name shown in the completion message: the full name if set,
    /// otherwise the nickname.
    pub fn display_name(&self) -> Option<&str> {
        self.profile
            .full_player_name
            .as_deref()
            .or(self.profile.player_name.as_deref())
    }

    /// Fields still required before the account can be committed.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.login.is_none() {
            missing.push("login");
        }
        if self.password.is_none() {
            missing.push("password");
        }
        if self.profile.character.is_none() {
            missing.push("character");
        }
        missing
    }

    /// Unique account name, available once ids are assigned.
    ///
    /// Format: `<login>-<original server id>-<local client id>`.
    pub fn account_name(&self) -> Option<String> {
        let login = self.login.as_deref()?;
        let local_id = self.local_client_id?;
        Some(account_name(login, self.original_server_id, local_id))
    }
}

/// Compose an account name from its parts.
pub fn account_name(login: &str, server_id: u32, local_client_id: u64) -> String {
    format!("{}-{}-{}", login, server_id, local_client_id)
}
