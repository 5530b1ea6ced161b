//! Typed attribute access for connection entries.
//!
//! Every attribute a command may name is listed in [`ATTRIBUTES`] with its
//! canonical name, accepted aliases, and whether it can be written or used as
//! a query criterion. Anything else is rejected with `InvalidAttribute`.

use crate::core::keys::KeyPair;
use crate::error::{Result, VaultError};
use crate::models::entry::{ConnectionEntry, SealedPassword};
use crate::models::options::{parse_options, render_options, Options};
use chrono::{DateTime, Utc};
use zeroize::Zeroizing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Name,
    Userid,
    Password,
    Server,
    Dbms,
    Database,
    Options,
    CreateTs,
    CreateUserid,
    LastUpdtTs,
    LastUpdtUserid,
}

pub struct AttributeSpec {
    pub attribute: Attribute,
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub writable: bool,
    pub queryable: bool,
}

#[rustfmt::skip]
pub const ATTRIBUTES: &[AttributeSpec] = &[
    AttributeSpec { attribute: Attribute::Name, name: "name", aliases: &[], writable: false, queryable: true },
    AttributeSpec { attribute: Attribute::Userid, name: "userid", aliases: &[], writable: true, queryable: true },
    AttributeSpec { attribute: Attribute::Password, name: "password", aliases: &[], writable: true, queryable: false },
    AttributeSpec { attribute: Attribute::Server, name: "server", aliases: &[], writable: true, queryable: true },
    AttributeSpec { attribute: Attribute::Dbms, name: "dbms", aliases: &[], writable: true, queryable: true },
    AttributeSpec { attribute: Attribute::Database, name: "database", aliases: &[], writable: true, queryable: true },
    AttributeSpec { attribute: Attribute::Options, name: "options", aliases: &["dboptions"], writable: true, queryable: false },
    AttributeSpec { attribute: Attribute::CreateTs, name: "create-ts", aliases: &["create_ts"], writable: false, queryable: true },
    AttributeSpec { attribute: Attribute::CreateUserid, name: "create-userid", aliases: &["create_userid"], writable: false, queryable: true },
    AttributeSpec { attribute: Attribute::LastUpdtTs, name: "last-updt-ts", aliases: &["last_updt_ts"], writable: false, queryable: true },
    AttributeSpec { attribute: Attribute::LastUpdtUserid, name: "last-updt-userid", aliases: &["last_updt_userid"], writable: false, queryable: true },
];

impl Attribute {
    fn spec(self) -> &'static AttributeSpec {
        ATTRIBUTES
            .iter()
            .find(|s| s.attribute == self)
            .unwrap_or(&ATTRIBUTES[0])
    }

    pub fn parse(name: &str) -> Result<Self> {
        let lower = name.trim().to_lowercase();
        ATTRIBUTES
            .iter()
            .find(|s| s.name == lower || s.aliases.contains(&lower.as_str()))
            .map(|s| s.attribute)
            .ok_or_else(|| VaultError::InvalidAttribute(name.to_string()))
    }

    /// Parse a name that a command intends to write.
    pub fn parse_writable(name: &str) -> Result<Self> {
        let attribute = Self::parse(name)?;
        if !attribute.is_writable() {
            return Err(VaultError::InvalidAttribute(format!(
                "{} cannot be set",
                attribute.name()
            )));
        }
        Ok(attribute)
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn is_writable(self) -> bool {
        self.spec().writable
    }

    pub fn is_queryable(self) -> bool {
        self.spec().queryable
    }
}

/// How the password attribute is rendered by [`get`].
pub enum Reveal<'a> {
    Sealed,
    Plaintext(&'a KeyPair),
}

/// How an options value is combined with the existing mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    Merge,
    Replace,
}

/// A validated, ready-to-apply attribute change. Building one performs all
/// parsing and encryption, so applying it cannot fail.
#[derive(Debug, Clone)]
pub enum Change {
    Text(Attribute, Option<String>),
    Password(Option<SealedPassword>),
    Options(Options),
    ClearOptions,
}

fn timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Read one attribute as text. `None` when the attribute is unset.
pub fn get(
    entry: &ConnectionEntry,
    attribute: Attribute,
    reveal: Reveal<'_>,
) -> Result<Option<Zeroizing<String>>> {
    let text = match attribute {
        Attribute::Name => Some(entry.name.clone()),
        Attribute::Userid => entry.userid.clone(),
        Attribute::Server => entry.server.clone(),
        Attribute::Dbms => entry.dbms.clone(),
        Attribute::Database => entry.database.clone(),
        Attribute::Options => Some(render_options(&entry.options)),
        Attribute::CreateTs => Some(timestamp(&entry.created_at)),
        Attribute::CreateUserid => Some(entry.created_by.clone()),
        Attribute::LastUpdtTs => Some(timestamp(&entry.last_modified_at)),
        Attribute::LastUpdtUserid => Some(entry.last_modified_by.clone()),
        Attribute::Password => {
            return match (&entry.password, reveal) {
                (None, _) => Ok(None),
                (Some(sealed), Reveal::Sealed) => Ok(Some(Zeroizing::new(sealed.0.clone()))),
                (Some(sealed), Reveal::Plaintext(keys)) => keys.open(sealed).map(Some),
            };
        }
    };
    Ok(text.map(Zeroizing::new))
}

/// Validate `value` for `attribute`, encrypting or parsing it as needed.
pub fn prepare(attribute: Attribute, value: &str, keys: &KeyPair) -> Result<Change> {
    if !attribute.is_writable() {
        return Err(VaultError::InvalidAttribute(format!(
            "{} cannot be set",
            attribute.name()
        )));
    }
    let change = match attribute {
        Attribute::Password if value.is_empty() => Change::Password(None),
        Attribute::Password => Change::Password(Some(keys.seal(value)?)),
        Attribute::Options if value.trim().is_empty() => Change::ClearOptions,
        Attribute::Options => Change::Options(parse_options(value)?),
        other if value.is_empty() => Change::Text(other, None),
        other => Change::Text(other, Some(value.to_string())),
    };
    Ok(change)
}

/// Apply a prepared change without touching the audit fields.
pub fn apply(entry: &mut ConnectionEntry, change: Change, mode: SetMode) {
    match change {
        Change::Password(sealed) => entry.password = sealed,
        Change::Options(options) => match mode {
            SetMode::Merge => entry.options.extend(options),
            SetMode::Replace => entry.options = options,
        },
        Change::ClearOptions => entry.options.clear(),
        Change::Text(attribute, value) => match attribute {
            Attribute::Userid => entry.userid = value,
            Attribute::Server => entry.server = value,
            Attribute::Dbms => entry.dbms = value,
            Attribute::Database => entry.database = value,
            // prepare() only yields writable text attributes
            _ => {}
        },
    }
}

/// Set one attribute and re-stamp the modification fields.
/// The caller persists the entry.
pub fn set(
    entry: &mut ConnectionEntry,
    attribute: Attribute,
    value: &str,
    mode: SetMode,
    keys: &KeyPair,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let change = prepare(attribute, value, keys)?;
    apply(entry, change, mode);
    entry.touch(actor, now);
    Ok(())
}

/// Exact-match test used by `query`.
pub fn matches(entry: &ConnectionEntry, attribute: Attribute, expected: &str) -> Result<bool> {
    if !attribute.is_queryable() {
        return Err(VaultError::InvalidAttribute(format!(
            "{} cannot be used as a query criterion",
            attribute.name()
        )));
    }
    let actual = get(entry, attribute, Reveal::Sealed)?;
    Ok(actual.as_deref().map(|s| s.as_str()) == Some(expected))
}
