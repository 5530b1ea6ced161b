//! Batch imports from text files.
//!
//! Both commands process a file line by line: a bad line is reported on
//! stderr and skipped, good lines are kept, and the command exits 1 if any
//! line failed.

use crate::cli::dispatch::Session;
use crate::cli::entry;
use crate::core::exchange::{self, ExchangeRecord};
use crate::error::{Result, VaultError};
use crate::models::entry::{normalize_name, ConnectionEntry};
use chrono::Utc;
use std::fs;
use std::path::Path;
use tracing::debug;

fn read_input(args: &[String]) -> Result<(String, String)> {
    let file = args
        .first()
        .ok_or_else(|| VaultError::MissingFile("Filename is required.".to_string()))?;
    let content = fs::read_to_string(Path::new(file))
        .map_err(|e| VaultError::io(format!("read {}", file), e))?;
    Ok((file.clone(), content))
}

/// Insert or overwrite one entry from an exchange record. Creation audit
/// fields of an existing entry are preserved.
fn upsert(session: &mut Session<'_>, record: ExchangeRecord) -> Result<String> {
    let name = normalize_name(&record.name)?;
    let now = Utc::now();
    let mut entry = match session.store.get(&name) {
        Ok(mut existing) => {
            existing.touch(session.actor, now);
            existing
        }
        Err(VaultError::NotFound(_)) => ConnectionEntry::new(&name, session.actor, now)?,
        Err(e) => return Err(e),
    };
    entry.password = match record.password {
        Some(plain) => Some(session.keys.seal(&plain)?),
        None => None,
    };
    entry.userid = record.userid;
    entry.server = record.server;
    entry.dbms = record.dbms;
    entry.database = record.database;
    session.store.put(&name, &entry)?;
    Ok(name)
}

pub fn run_load_from_text(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let (file, content) = read_input(args)?;
    session.emit(&format!("Processing file: {}", file))?;

    let mut imported = 0usize;
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let outcome = exchange::parse_line(line).and_then(|record| upsert(session, record));
        match outcome {
            Ok(name) => {
                debug!(line = index + 1, entry = %name, "imported");
                imported += 1;
            }
            Err(e) if e.is_recoverable() => {
                debug!(line = index + 1, "record skipped: {}", e);
                session.report(&format!("{}: line {}", file, index + 1), &e);
            }
            Err(e) => return Err(e),
        }
    }
    session.emit(&format!("Imported {} records.", imported))
}

pub fn run_bulk_add(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let (file, content) = read_input(args)?;

    let mut added = 0usize;
    for (index, line) in content.lines().enumerate() {
        let outcome = match exchange::split_add_line(line) {
            Ok(None) => continue,
            Ok(Some(add_args)) => entry::add_entry(session, &add_args),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(name) => {
                session.emit(&format!("Entry {} added.", name))?;
                added += 1;
            }
            Err(e) if e.is_recoverable() => {
                debug!(line = index + 1, "add skipped: {}", e);
                session.report(&format!("{}: line {}", file, index + 1), &e);
            }
            Err(e) => return Err(e),
        }
    }
    debug!(added, "bulk add finished");
    Ok(())
}
