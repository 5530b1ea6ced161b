//! Persistent key-value store of connection entries.
//!
//! The whole store is one JSON document. A ReadOnly open takes a shared lock,
//! a ReadWrite open an exclusive one; pending writes are flushed atomically by
//! [`CredentialStore::close`]. Dropping a store without closing it discards
//! every write made through it.

use crate::constants;
use crate::core::file_lock::FileLock;
use crate::error::{Result, VaultError};
use crate::models::entry::ConnectionEntry;
use crate::models::keypair::StoredKeyPair;
use crate::models::store_file::StoreFile;
use crate::util::fs as vault_fs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::ReadOnly => write!(f, "read-only"),
            AccessMode::ReadWrite => write!(f, "read-write"),
        }
    }
}

#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    mode: AccessMode,
    doc: StoreFile,
    dirty: bool,
    created: bool,
    _lock: Option<FileLock>,
}

/// Sidecar lock file path for a store.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn lookup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl CredentialStore {
    pub fn open(path: &Path, mode: AccessMode) -> Result<Self> {
        if mode == AccessMode::ReadOnly && !path.exists() {
            return Err(VaultError::store_open(path, "no such store"));
        }
        if path.is_dir() {
            return Err(VaultError::store_open(path, "is a directory"));
        }

        let lock = match mode {
            AccessMode::ReadWrite => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    if !parent.exists() {
                        vault_fs::ensure_dir(parent, constants::STORE_DIR_MODE)
                            .map_err(|e| VaultError::store_open(path, e))?;
                    }
                }
                Some(
                    FileLock::exclusive(&lock_path(path))
                        .map_err(|e| VaultError::store_open(path, e))?,
                )
            }
            // Readers of a shared store may lack write access to its directory.
            AccessMode::ReadOnly => match FileLock::shared(&lock_path(path)) {
                Ok(lock) => Some(lock),
                Err(e) => {
                    warn!("reading {} without a lock: {}", path.display(), e);
                    None
                }
            },
        };

        // Another writer may have created the store while we waited for the lock.
        let exists = path.exists();
        let (doc, created) = if exists {
            (read_document(path)?, false)
        } else {
            (StoreFile::default(), true)
        };

        debug!(path = %path.display(), %mode, created, "store opened");
        Ok(Self {
            path: path.to_path_buf(),
            mode,
            doc,
            dirty: created,
            created,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Whether this open created the store.
    pub fn is_new(&self) -> bool {
        self.created
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = lookup_key(name);
        key != constants::KEYPAIR_KEY && self.doc.records.contains_key(&key)
    }

    pub fn get(&self, name: &str) -> Result<ConnectionEntry> {
        let key = lookup_key(name);
        if key == constants::KEYPAIR_KEY {
            return Err(VaultError::NotFound(name.to_string()));
        }
        let raw = self
            .doc
            .records
            .get(&key)
            .ok_or_else(|| VaultError::NotFound(name.to_string()))?;
        decode_entry(&key, raw)
    }

    /// Insert or replace the entry stored under `name`.
    pub fn put(&mut self, name: &str, entry: &ConnectionEntry) -> Result<()> {
        self.require_writable("put")?;
        let key = lookup_key(name);
        if key == constants::KEYPAIR_KEY {
            return Err(VaultError::Usage(format!("{} is a reserved name", name)));
        }
        let value = serde_json::to_value(entry).map_err(|e| VaultError::CorruptEntry {
            name: key.clone(),
            reason: e.to_string(),
        })?;
        self.doc.records.insert(key, value);
        self.dirty = true;
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        self.require_writable("delete")?;
        let key = lookup_key(name);
        if key == constants::KEYPAIR_KEY || self.doc.records.remove(&key).is_none() {
            return Err(VaultError::NotFound(name.to_string()));
        }
        self.dirty = true;
        Ok(())
    }

    /// Sorted entry names, without the reserved keypair key.
    pub fn keys(&self) -> Vec<String> {
        self.doc
            .records
            .keys()
            .filter(|k| k.as_str() != constants::KEYPAIR_KEY)
            .cloned()
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.keys().len()
    }

    /// Every entry in name order. Records that fail to decode are yielded as
    /// `CorruptEntry` so bulk scans can report and skip them.
    pub fn entries(&self) -> impl Iterator<Item = Result<ConnectionEntry>> + '_ {
        self.doc
            .records
            .iter()
            .filter(|(k, _)| k.as_str() != constants::KEYPAIR_KEY)
            .map(|(k, v)| decode_entry(k, v))
    }

    pub fn keypair_slot(&self) -> Result<Option<StoredKeyPair>> {
        match self.doc.records.get(constants::KEYPAIR_KEY) {
            None => Ok(None),
            Some(raw) => serde_json::from_value(raw.clone())
                .map(Some)
                .map_err(|e| VaultError::CorruptEntry {
                    name: constants::KEYPAIR_KEY.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn set_keypair_slot(&mut self, keypair: &StoredKeyPair) -> Result<()> {
        self.require_writable("store keypair")?;
        let value = serde_json::to_value(keypair).map_err(|e| VaultError::CorruptEntry {
            name: constants::KEYPAIR_KEY.to_string(),
            reason: e.to_string(),
        })?;
        self.doc
            .records
            .insert(constants::KEYPAIR_KEY.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    /// Last modification time of the backing file.
    pub fn modified_at(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).and_then(|m| m.modified()).ok()
    }

    /// Flush pending writes and release the lock.
    pub fn close(self) -> Result<()> {
        if self.mode == AccessMode::ReadWrite && self.dirty {
            save_document(&self.path, &self.doc)?;
            debug!(path = %self.path.display(), "store flushed");
        }
        debug!(path = %self.path.display(), "store closed");
        Ok(())
    }

    fn require_writable(&self, action: &str) -> Result<()> {
        if self.mode == AccessMode::ReadOnly {
            return Err(VaultError::ReadOnly(format!(
                "cannot {} in {}",
                action,
                self.path.display()
            )));
        }
        Ok(())
    }
}

fn decode_entry(key: &str, raw: &serde_json::Value) -> Result<ConnectionEntry> {
    serde_json::from_value(raw.clone()).map_err(|e| VaultError::CorruptEntry {
        name: key.to_string(),
        reason: e.to_string(),
    })
}

fn read_document(path: &Path) -> Result<StoreFile> {
    let content = fs::read(path).map_err(|e| VaultError::store_open(path, e))?;
    if content.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(StoreFile::default());
    }
    let mut doc: StoreFile = serde_json::from_slice(&content)
        .map_err(|e| VaultError::store_open(path, format!("unreadable store format: {}", e)))?;
    if doc.format != constants::STORE_FORMAT {
        return Err(VaultError::store_open(
            path,
            format!("not a logonmgr store (format '{}')", doc.format),
        ));
    }
    if doc.version == 0 {
        doc.version = 1;
    }
    if doc.version > constants::STORE_VERSION {
        return Err(VaultError::store_open(
            path,
            format!(
                "store format version {} is newer than supported version {}",
                doc.version,
                constants::STORE_VERSION
            ),
        ));
    }
    Ok(doc)
}

fn save_document(path: &Path, doc: &StoreFile) -> Result<()> {
    let mut doc = doc.clone();
    doc.version = constants::STORE_VERSION;
    let content = serde_json::to_vec_pretty(&doc)
        .map_err(|e| VaultError::io("serialize store", std::io::Error::other(e)))?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".logons-")
        .tempfile_in(dir)
        .map_err(|e| VaultError::io("create temp store", e))?;
    tmp.write_all(&content)
        .map_err(|e| VaultError::io("write store", e))?;
    tmp.flush().map_err(|e| VaultError::io("flush store", e))?;
    // A replaced store keeps its mode and, where permitted, its ownership.
    let file_mode = vault_fs::existing_mode(path).unwrap_or(constants::STORE_FILE_MODE);
    if path.exists() && !vault_fs::copy_ownership(path, tmp.path())? {
        warn!(
            "cannot keep owner of {}; it will be owned by the current user",
            path.display()
        );
    }
    vault_fs::set_permissions(tmp.path(), file_mode)?;
    tmp.persist(path)
        .map_err(|e| VaultError::io(format!("persist store {}", path.display()), e.error))?;
    Ok(())
}
