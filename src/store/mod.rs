//! Durable account storage.
//!
//! This module provides:
//! - [`AccountStore`] trait, the seam between the commit gateway and the
//!   storage backend
//! - [`MemoryStore`] for tests and throwaway servers
//! - [`FileStore`], one JSON document per account with atomic writes
//! - [`ClientIdAllocator`], the persisted per-server account counter
//!
//! Stores are keyed by login. `create` returns only once the account is
//! durable, and an account is visible to `contains`/`get` only after that.

pub mod client_ids;
pub mod file;
pub mod memory;

pub use client_ids::ClientIdAllocator;
pub use file::FileStore;
pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::account::{Inventory, Profile};
use crate::config::StoreConfig;

/// An account as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    /// `<login>-<server id>-<local client id>`
    pub account_name: String,
    pub login: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub original_server_id: u32,
    pub local_client_id: u64,
    pub created_at: DateTime<Utc>,
    pub last_connection: DateTime<Utc>,
    pub profile: Profile,
    #[serde(default)]
    pub inventory: Inventory,
}

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An account with this login already exists.
    #[error("account '{login}' already exists")]
    Duplicate { login: String },

    /// No account with this login.
    #[error("account '{login}' not found")]
    NotFound { login: String },

    /// A stored document could not be read back.
    #[error("corrupt account file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("failed to encode account: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage backend for accounts.
///
/// Implementations use interior mutability and are shared between all
/// sessions.
pub trait AccountStore: Send + Sync {
    /// Whether an account with this login exists.
    fn contains(&self, login: &str) -> bool;

    fn get(&self, login: &str) -> Option<StoredAccount>;

    /// Persist a new account.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if the login is taken, or an IO error if the
    /// account could not be made durable. On error nothing is visible.
    fn create(&self, account: StoredAccount) -> Result<(), StoreError>;

    /// Remove an account, returning it.
    fn delete(&self, login: &str) -> Result<StoredAccount, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Open the store and client-id allocator named by the configuration.
pub fn open_store(
    config: &StoreConfig,
) -> Result<(Arc<dyn AccountStore>, ClientIdAllocator), StoreError> {
    match config {
        StoreConfig::Memory => Ok((Arc::new(MemoryStore::new()), ClientIdAllocator::in_memory(0))),
        StoreConfig::File { path } => {
            let store = FileStore::open(path)?;
            let ids = ClientIdAllocator::open(&path.join(client_ids::COUNTER_FILE))?;
            Ok((Arc::new(store), ids))
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_account(login: &str, local_client_id: u64) -> StoredAccount {
    let now = Utc::now();
    StoredAccount {
        account_name: crate::account::account_name(login, 1, local_client_id),
        login: login.to_string(),
        password: "secret".to_string(),
        email: None,
        original_server_id: 1,
        local_client_id,
        created_at: now,
        last_connection: now,
        profile: Profile::default(),
        inventory: Inventory::default(),
    }
}
