//! File-backed account store.
//!
//! Each account is a JSON document named after its account name. Writes
//! go to a temporary file that is renamed into place, so a document is
//! either complete or absent. An in-memory index keyed by login is
//! rebuilt from the directory at open and updated only after the rename
//! succeeds.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{AccountStore, StoreError, StoredAccount};

const EXTENSION: &str = "json";

/// Accounts stored as files in one directory.
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    index: RwLock<HashMap<String, StoredAccount>>,
}

impl FileStore {
    /// Open (creating if needed) the store rooted at `root`.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or a document cannot be
    /// parsed.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root)?;

        let mut index = HashMap::new();
        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let account = read_account(&path)?;
            index.insert(account.login.clone(), account);
        }
        tracing::debug!(accounts = index.len(), "Opened account store at {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            index: RwLock::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn account_path(&self, account_name: &str) -> PathBuf {
        self.root.join(format!("{}.{}", account_name, EXTENSION))
    }

    fn lock_poisoned() -> StoreError {
        StoreError::Io(std::io::Error::other("account index lock poisoned"))
    }
}

fn read_account(path: &Path) -> Result<StoredAccount, StoreError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Write-to-temp-then-rename.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StoreError> {
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

impl AccountStore for FileStore {
    fn contains(&self, login: &str) -> bool {
        self.index
            .read()
            .map(|index| index.contains_key(login))
            .unwrap_or(false)
    }

    fn get(&self, login: &str) -> Option<StoredAccount> {
        self.index.read().ok()?.get(login).cloned()
    }

    fn create(&self, account: StoredAccount) -> Result<(), StoreError> {
        if self.contains(&account.login) {
            return Err(StoreError::Duplicate {
                login: account.login,
            });
        }

        let path = self.account_path(&account.account_name);
        let content = serde_json::to_vec_pretty(&account)?;
        write_atomic(&path, &content)?;

        let mut index = self.index.write().map_err(|_| Self::lock_poisoned())?;
        if index.contains_key(&account.login) {
            drop(index);
            let _ = fs::remove_file(&path);
            return Err(StoreError::Duplicate {
                login: account.login,
            });
        }
        index.insert(account.login.clone(), account);
        Ok(())
    }

    fn delete(&self, login: &str) -> Result<StoredAccount, StoreError> {
        let account = self.get(login).ok_or_else(|| StoreError::NotFound {
            login: login.to_string(),
        })?;

        fs::remove_file(self.account_path(&account.account_name))?;

        let mut index = self.index.write().map_err(|_| Self::lock_poisoned())?;
        index.remove(login);
        Ok(account)
    }

    fn len(&self) -> usize {
        self.index.read().map(|index| index.len()).unwrap_or(0)
    }
}
