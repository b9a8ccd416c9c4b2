//! Per-server local client ids.
//!
//! Every account created by a server gets the next local client id. The
//! last id handed out is saved after each allocation, and a restarted
//! server continues from the saved value plus one, so ids are never
//! reused even after a crash.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::StoreError;

/// File name of the counter inside a file store directory.
pub const COUNTER_FILE: &str = "client-ids";

/// Hands out increasing local client ids.
#[derive(Debug)]
pub struct ClientIdAllocator {
    next: Mutex<u64>,
    path: Option<PathBuf>,
}

impl ClientIdAllocator {
    /// An allocator that is not persisted.
    pub fn in_memory(start: u64) -> Self {
        Self {
            next: Mutex::new(start),
            path: None,
        }
    }

    /// Load the counter saved at `path`; a missing file starts at zero.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let next = match fs::read_to_string(path) {
            Ok(content) => {
                let last: u64 = content.trim().parse().map_err(|e| StoreError::Corrupt {
                    path: path.to_path_buf(),
                    message: format!("invalid client id counter: {}", e),
                })?;
                last + 1
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            next: Mutex::new(next),
            path: Some(path.to_path_buf()),
        })
    }

    /// Reserve the next id and persist it before returning.
    pub fn allocate(&self) -> Result<u64, StoreError> {
        let mut next = self
            .next
            .lock()
            .map_err(|_| std::io::Error::other("client id lock poisoned"))?;
        let id = *next;
        if let Some(path) = &self.path {
            let temp_path = path.with_extension("tmp");
            fs::write(&temp_path, id.to_string())?;
            fs::rename(&temp_path, path)?;
        }
        *next = id + 1;
        Ok(id)
    }

    /// The id the next allocation will return.
    pub fn peek(&self) -> u64 {
        self.next.lock().map(|next| *next).unwrap_or(0)
    }
}
