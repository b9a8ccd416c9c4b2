//! Hand-off of finished accounts to the account store.
//!
//! The [`CommitGateway`] is the only place where a construction target
//! becomes a stored account. It guarantees:
//!
//! - at most one account per login, even when sessions finish at the
//!   same time
//! - nothing is visible before the store confirms durability
//! - no lock is held while the store writes
//!
//! Uniqueness is enforced by reserving the login in a pending set under a
//! short lock that also checks the store. The reservation is released
//! when the commit returns, successfully or not.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::account::{account_name, ConstructionTarget, Inventory};
use crate::store::{AccountStore, ClientIdAllocator, StoreError, StoredAccount};

/// Why a commit was refused.
#[derive(Debug, Error)]
pub enum CommitError {
    /// Required fields are still empty.
    #[error("account is incomplete, missing: {}", .missing.join(", "))]
    Incomplete { missing: Vec<&'static str> },

    /// Another account holds, or is about to hold, this login.
    #[error("login '{login}' is already taken")]
    DuplicateName { login: String },

    /// The store could not persist the account.
    #[error("store failure: {0}")]
    Store(#[source] StoreError),
}

impl From<StoreError> for CommitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { login } => Self::DuplicateName { login },
            other => Self::Store(other),
        }
    }
}

/// Atomic check-and-insert in front of an [`AccountStore`].
pub struct CommitGateway {
    store: Arc<dyn AccountStore>,
    ids: ClientIdAllocator,
    server_id: u32,
    pending: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for CommitGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitGateway")
            .field("server_id", &self.server_id)
            .field("accounts", &self.store.len())
            .finish()
    }
}

/// A login held by an in-flight commit.
struct Reservation<'a> {
    pending: &'a Mutex<HashSet<String>>,
    login: String,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&self.login);
        }
    }
}

impl CommitGateway {
    pub fn new(store: Arc<dyn AccountStore>, ids: ClientIdAllocator, server_id: u32) -> Self {
        Self {
            store,
            ids,
            server_id,
            pending: Mutex::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    pub fn server_id(&self) -> u32 {
        self.server_id
    }

    /// Whether no stored or in-flight account uses `login`.
    pub fn is_login_available(&self, login: &str) -> bool {
        let pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(_) => return false,
        };
        !pending.contains(login) && !self.store.contains(login)
    }

    fn reserve(&self, login: &str) -> Result<Reservation<'_>, CommitError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| CommitError::Store(std::io::Error::other("pending lock poisoned").into()))?;
        if self.store.contains(login) || !pending.insert(login.to_string()) {
            return Err(CommitError::DuplicateName {
                login: login.to_string(),
            });
        }
        Ok(Reservation {
            pending: &self.pending,
            login: login.to_string(),
        })
    }

    /// Persist the target as a new account.
    ///
    /// The target itself is not modified; the returned account carries
    /// the assigned ids and timestamps.
    pub fn commit(&self, target: &ConstructionTarget) -> Result<StoredAccount, CommitError> {
        let missing = target.missing_fields();
        let (Some(login), Some(password), Some(_)) = (
            target.login.as_deref(),
            target.password.as_deref(),
            target.character(),
        ) else {
            return Err(CommitError::Incomplete { missing });
        };

        let _reservation = self.reserve(login)?;

        let local_client_id = self.ids.allocate()?;
        let now = Utc::now();
        let account = StoredAccount {
            account_name: account_name(login, self.server_id, local_client_id),
            login: login.to_string(),
            password: password.to_string(),
            email: target.email.clone(),
            original_server_id: self.server_id,
            local_client_id,
            created_at: now,
            last_connection: now,
            profile: target.profile.clone(),
            inventory: Inventory::starter(target.character()),
        };

        self.store.create(account.clone())?;
        tracing::info!(
            login = %account.login,
            account = %account.account_name,
            "Account created"
        );
        Ok(account)
    }

    /// Remove an account from the store.
    pub fn delete(&self, login: &str) -> Result<StoredAccount, StoreError> {
        let account = self.store.delete(login)?;
        tracing::info!(login = %login, account = %account.account_name, "Account deleted");
        Ok(account)
    }
}
