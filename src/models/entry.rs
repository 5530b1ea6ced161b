use crate::constants;
use crate::error::{Result, VaultError};
use crate::models::options::{render_options, Options};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Password ciphertext as stored. Only `core::keys` can open it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SealedPassword(pub String);

impl SealedPassword {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<SealedPassword>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dbms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default)]
    pub options: Options,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub last_modified_at: DateTime<Utc>,
    pub last_modified_by: String,
}

impl ConnectionEntry {
    /// A new, empty entry stamped as created by `actor` at `now`.
    pub fn new(name: &str, actor: &str, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            name: normalize_name(name)?,
            userid: None,
            password: None,
            server: None,
            dbms: None,
            database: None,
            options: Options::new(),
            created_at: now,
            created_by: actor.to_string(),
            last_modified_at: now,
            last_modified_by: actor.to_string(),
        })
    }

    /// Re-stamp the modification fields. Never moves `last_modified_at` backwards.
    pub fn touch(&mut self, actor: &str, now: DateTime<Utc>) {
        if now > self.last_modified_at {
            self.last_modified_at = now;
        }
        self.last_modified_by = actor.to_string();
    }
}

/// Lowercase and validate an entry name.
pub fn normalize_name(raw: &str) -> Result<String> {
    let name = raw.trim().to_lowercase();
    if name.is_empty() {
        return Err(VaultError::Usage("connection name cannot be empty".into()));
    }
    if name.contains('=') {
        return Err(VaultError::Usage(format!(
            "expected connection name but found keyword: {}",
            raw
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err(VaultError::Usage(format!(
            "invalid connection name '{}': only [a-z0-9._-] allowed",
            raw
        )));
    }
    Ok(name)
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

/// Multi-line rendering used by `show` and `query`. The password is masked.
impl fmt::Display for ConnectionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "name: {}", self.name)?;
        writeln!(f, "userid: {}", or_dash(&self.userid))?;
        match self.password {
            Some(_) => writeln!(f, "password: {}", constants::ENCRYPTED_MARKER)?,
            None => writeln!(f, "password: -")?,
        }
        writeln!(f, "server: {}", or_dash(&self.server))?;
        writeln!(f, "dbms: {}", or_dash(&self.dbms))?;
        writeln!(f, "database: {}", or_dash(&self.database))?;
        writeln!(f, "options: {}", render_options(&self.options))?;
        writeln!(f, "create_ts: {}", self.created_at.to_rfc3339())?;
        writeln!(f, "create_userid: {}", self.created_by)?;
        writeln!(f, "last_updt_ts: {}", self.last_modified_at.to_rfc3339())?;
        write!(f, "last_updt_userid: {}", self.last_modified_by)
    }
}
