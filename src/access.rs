//! Connection keys and account deletion.
//!
//! Every connection opens with a key:
//!
//! - the server's access key opens an account-creation session
//! - `deleteAccount:<login>:<password>` deletes an existing account
//! - anything else is refused
//!
//! Deletion requests are rate limited per login. After
//! [`MAX_FAILURES`] wrong passwords the login is locked for
//! [`LOCKOUT`], during which every deletion attempt is refused.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::gateway::CommitGateway;
use crate::protocol::RefusalCode;

/// Prefix of an account-deletion key.
pub const DELETE_PREFIX: &str = "deleteAccount:";

/// Wrong passwords tolerated before a login is locked.
pub const MAX_FAILURES: u32 = 3;

/// How long a locked login refuses deletion.
pub const LOCKOUT: Duration = Duration::from_secs(30);

/// What a connection key asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRequest {
    Create,
    Delete { login: String, password: String },
    /// A deletion key without a login.
    Malformed,
    WrongKey,
}

#[derive(Debug, Default, Clone, Copy)]
struct Failures {
    count: u32,
    locked_until: Option<Instant>,
}

/// Checks connection keys and applies the deletion lockout.
#[derive(Debug)]
pub struct AccessControl {
    access_key: String,
    failures: Mutex<HashMap<String, Failures>>,
}

impl AccessControl {
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Classify the key presented by a client.
    pub fn classify(&self, key: &str) -> AccessRequest {
        if key == self.access_key {
            return AccessRequest::Create;
        }
        let Some(rest) = key.strip_prefix(DELETE_PREFIX) else {
            return AccessRequest::WrongKey;
        };
        match rest.split_once(':') {
            Some((login, password)) if !login.is_empty() => AccessRequest::Delete {
                login: login.to_string(),
                password: password.to_string(),
            },
            _ => AccessRequest::Malformed,
        }
    }

    /// Delete `login` if `password` matches, returning the refusal code
    /// sent back to the client.
    pub fn delete_account(&self, gateway: &CommitGateway, login: &str, password: &str) -> RefusalCode {
        self.delete_account_at(gateway, login, password, Instant::now())
    }

    fn delete_account_at(
        &self,
        gateway: &CommitGateway,
        login: &str,
        password: &str,
        now: Instant,
    ) -> RefusalCode {
        if self.is_locked_at(login, now) {
            warn!(login = %login, "Deletion refused, login is locked");
            return RefusalCode::BadPassword;
        }

        let Some(account) = gateway.store().get(login) else {
            warn!(login = %login, "Deletion refused, unknown account");
            return RefusalCode::UnknownAccount;
        };

        if account.password != password {
            self.record_failure(login, now);
            warn!(login = %login, "Deletion refused, wrong password");
            return RefusalCode::BadPassword;
        }

        self.clear_failures(login);
        match gateway.delete(login) {
            Ok(_) => {
                info!(login = %login, "Account deleted on client request");
                RefusalCode::AccountDeleted
            }
            Err(e) => {
                tracing::error!(login = %login, "Failed to delete account: {}", e);
                RefusalCode::DeleteFailed
            }
        }
    }

    /// Whether deletion attempts for `login` are currently refused.
    pub fn is_locked(&self, login: &str) -> bool {
        self.is_locked_at(login, Instant::now())
    }

    fn is_locked_at(&self, login: &str, now: Instant) -> bool {
        let Ok(mut failures) = self.failures.lock() else {
            return true;
        };
        match failures.get(login).and_then(|f| f.locked_until) {
            Some(until) if now < until => true,
            Some(_) => {
                failures.remove(login);
                false
            }
            None => false,
        }
    }

    fn record_failure(&self, login: &str, now: Instant) {
        let Ok(mut failures) = self.failures.lock() else {
            return;
        };
        let entry = failures.entry(login.to_string()).or_default();
        entry.count += 1;
        if entry.count >= MAX_FAILURES {
            entry.locked_until = Some(now + LOCKOUT);
            entry.count = 0;
        }
    }

    fn clear_failures(&self, login: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(login);
        }
    }
}
