//! In-memory account store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{AccountStore, StoreError, StoredAccount};

/// Accounts held in a map. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, StoredAccount>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryStore {
    fn contains(&self, login: &str) -> bool {
        self.accounts
            .read()
            .map(|accounts| accounts.contains_key(login))
            .unwrap_or(false)
    }

    fn get(&self, login: &str) -> Option<StoredAccount> {
        self.accounts.read().ok()?.get(login).cloned()
    }

    fn create(&self, account: StoredAccount) -> Result<(), StoreError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| std::io::Error::other("account map lock poisoned"))?;
        if accounts.contains_key(&account.login) {
            return Err(StoreError::Duplicate {
                login: account.login,
            });
        }
        accounts.insert(account.login.clone(), account);
        Ok(())
    }

    fn delete(&self, login: &str) -> Result<StoredAccount, StoreError> {
        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| std::io::Error::other("account map lock poisoned"))?;
        accounts.remove(login).ok_or_else(|| StoreError::NotFound {
            login: login.to_string(),
        })
    }

    fn len(&self) -> usize {
        self.accounts.read().map(|a| a.len()).unwrap_or(0)
    }
}
