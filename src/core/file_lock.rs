//! Advisory store locking using flock(2) on a sidecar file.

use crate::error::{Result, VaultError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;

/// A held lock. Released on drop (closing the file releases the flock).
#[derive(Debug)]
pub struct FileLock {
    _file: File,
}

impl FileLock {
    /// Acquire an exclusive lock, blocking until available.
    pub fn exclusive(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive()
            .map_err(|e| VaultError::io(format!("acquire lock {}", path.display()), e))?;
        Ok(Self { _file: file })
    }

    /// Acquire a shared lock, blocking while a writer holds the file.
    pub fn shared(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_shared()
            .map_err(|e| VaultError::io(format!("acquire shared lock {}", path.display()), e))?;
        Ok(Self { _file: file })
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| VaultError::io(format!("open lock file {}", path.display()), e))
}
