//! Error kinds shared by the store, key manager, and command handlers.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("{0}")]
    Usage(String),

    #[error("{0}")]
    MissingFile(String),

    #[error("{0} is invalid")]
    UnknownCommand(String),

    #[error("unable to open {}: {reason}", path.display())]
    StoreOpen { path: PathBuf, reason: String },

    #[error("Connection Entry {0} not found")]
    NotFound(String),

    #[error("Connection Entry {0} already exists")]
    AlreadyExists(String),

    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("crypto: {0}")]
    Crypto(String),

    #[error("corrupt entry {name}: {reason}")]
    CorruptEntry { name: String, reason: String },

    #[error("store is open read-only: {0}")]
    ReadOnly(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, VaultError>;

impl VaultError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn store_open(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::StoreOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            VaultError::MissingFile(_) => 2,
            VaultError::UnknownCommand(_) => 3,
            VaultError::StoreOpen { .. } => 4,
            _ => 1,
        }
    }

    /// Whether a batch operation may report this error and move on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            VaultError::NotFound(_)
                | VaultError::AlreadyExists(_)
                | VaultError::CorruptEntry { .. }
                | VaultError::InvalidAttribute(_)
                | VaultError::InvalidOptions(_)
                | VaultError::Usage(_)
        )
    }
}
