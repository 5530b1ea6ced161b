//! Commands that create, change, or remove entries.

use crate::cli::dispatch::Session;
use crate::constants;
use crate::core::attributes::{self, Attribute, Change, SetMode};
use crate::core::exchange;
use crate::core::keys::KeyPair;
use crate::error::{Result, VaultError};
use crate::models::entry::{normalize_name, ConnectionEntry};
use chrono::Utc;
use dialoguer::Password;
use zeroize::Zeroizing;

/// Parse and validate every `attr=value` argument before anything is applied.
fn prepare_assignments(args: &[String], keys: &KeyPair) -> Result<Vec<Change>> {
    args.iter()
        .map(|arg| {
            let (attribute, value) = exchange::parse_assignment(arg)?;
            attributes::prepare(attribute, &value, keys)
        })
        .collect()
}

/// Create one entry from `name attr=value ...`. Returns the stored name.
pub(crate) fn add_entry(session: &mut Session<'_>, args: &[String]) -> Result<String> {
    let raw = args
        .first()
        .ok_or_else(|| VaultError::Usage("connection name is required".to_string()))?;
    let name = normalize_name(raw)?;
    if session.store.contains(&name) {
        return Err(VaultError::AlreadyExists(name));
    }
    let changes = prepare_assignments(&args[1..], &session.keys)?;

    let mut entry = ConnectionEntry::new(&name, session.actor, Utc::now())?;
    for change in changes {
        attributes::apply(&mut entry, change, SetMode::Replace);
    }
    session.store.put(&name, &entry)?;
    Ok(name)
}

pub fn run_add(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let name = add_entry(session, args)?;
    session.emit(&format!("Entry {} added.", name))
}

pub fn run_update(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let name = &args[0];
    let mut entry = session.store.get(name)?;
    let changes = prepare_assignments(&args[1..], &session.keys)?;
    for change in changes {
        attributes::apply(&mut entry, change, SetMode::Merge);
    }
    entry.touch(session.actor, Utc::now());
    session.store.put(name, &entry)?;
    session.emit(&format!("Entry {} updated.", entry.name))
}

fn prompt_password(name: &str) -> Result<Zeroizing<String>> {
    let secret = Password::new()
        .with_prompt(format!("Password for {}", name))
        .allow_empty_password(false)
        .interact()
        .map_err(|e| VaultError::io("read password from prompt", std::io::Error::other(e)))?;
    Ok(Zeroizing::new(secret))
}

pub fn run_set(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    if args.len() > 3 {
        return Err(VaultError::Usage(
            "usage: logonmgr set <connection_name> <attribute> [<value>]".to_string(),
        ));
    }
    let name = &args[0];
    let attribute = Attribute::parse_writable(&args[1])?;
    let mut entry = session.store.get(name)?;

    let value = match args.get(2) {
        Some(value) => Zeroizing::new(value.clone()),
        None if attribute == Attribute::Password && !session.non_interactive => {
            prompt_password(&entry.name)?
        }
        None => {
            return Err(VaultError::Usage(format!(
                "a value for {} is required",
                attribute.name()
            )))
        }
    };

    attributes::set(
        &mut entry,
        attribute,
        &value,
        SetMode::Replace,
        &session.keys,
        session.actor,
        Utc::now(),
    )?;
    session.store.put(name, &entry)?;
    session.emit(&format!("Entry {} updated.", entry.name))
}

pub fn run_remove_option(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let name = &args[0];
    let mut entry = session.store.get(name)?;
    if entry.options.is_empty() {
        return session.emit(&format!("Entry {} has no options to remove.", entry.name));
    }

    let mut changed = false;
    for option in &args[1..] {
        if option.eq_ignore_ascii_case(constants::ALL_KEYWORD) {
            entry.options.clear();
            changed = true;
            session.emit(&format!("All options cleared for entry {}.", entry.name))?;
            break;
        }
        if entry.options.remove(option).is_some() {
            changed = true;
            session.emit(&format!("Option {} removed.", option))?;
        } else {
            session.emit(&format!("{} is not in options.", option))?;
        }
    }

    if !changed {
        return session.emit(&format!("Nothing to update for entry {}.", entry.name));
    }
    entry.touch(session.actor, Utc::now());
    session.store.put(name, &entry)
}

pub fn run_delete(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let name = &args[0];
    session.store.delete(name)?;
    session.emit(&format!("Entry {} deleted.", name.trim().to_lowercase()))
}
