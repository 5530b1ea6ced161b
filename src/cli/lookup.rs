//! Read-only commands: listing, display, export, and attribute getters.

use crate::cli::dispatch::Session;
use crate::constants;
use crate::core::attributes::{self, Attribute, Reveal};
use crate::core::exchange;
use crate::error::{Result, VaultError};
use crate::models::entry::ConnectionEntry;
use chrono::{DateTime, Local};
use comfy_table::{presets::UTF8_FULL, Attribute as CellAttribute, Cell, Table};
use tracing::debug;

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

pub fn run_list(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let long = match args.first().map(String::as_str) {
        None => false,
        Some("-l") | Some("--long") => true,
        Some(other) => {
            return Err(VaultError::Usage(format!(
                "unexpected argument '{}', usage: logonmgr list [--long]",
                other
            )))
        }
    };

    if !long {
        for name in session.store.keys() {
            session.emit(&name)?;
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Name").add_attribute(CellAttribute::Bold),
        Cell::new("Userid").add_attribute(CellAttribute::Bold),
        Cell::new("Server").add_attribute(CellAttribute::Bold),
        Cell::new("Dbms").add_attribute(CellAttribute::Bold),
        Cell::new("Database").add_attribute(CellAttribute::Bold),
        Cell::new("Modified").add_attribute(CellAttribute::Bold),
    ]);

    let entries: Vec<Result<ConnectionEntry>> = session.store.entries().collect();
    for entry in entries {
        match entry {
            Ok(entry) => {
                table.add_row(vec![
                    entry.name.clone(),
                    or_dash(&entry.userid),
                    or_dash(&entry.server),
                    or_dash(&entry.dbms),
                    or_dash(&entry.database),
                    entry
                        .last_modified_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string(),
                ]);
            }
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                session.report("list", &e);
            }
        }
    }
    session.emit(&table.to_string())
}

pub fn run_show(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let entry = session.store.get(&args[0])?;
    session.emit(&entry.to_string())
}

/// Prints a single attribute. `password <name> decrypt` reveals the plaintext.
pub fn run_getter(session: &mut Session<'_>, attribute: Attribute, args: &[String]) -> Result<()> {
    let entry = session.store.get(&args[0])?;
    let decrypt = match args.get(1) {
        None => false,
        Some(flag) if attribute == Attribute::Password && flag.eq_ignore_ascii_case("decrypt") => {
            true
        }
        Some(other) => {
            return Err(VaultError::Usage(format!(
                "unexpected argument '{}' for {}",
                other,
                attribute.name()
            )))
        }
    };
    let reveal = if decrypt {
        Reveal::Plaintext(&session.keys)
    } else {
        Reveal::Sealed
    };
    let value = attributes::get(&entry, attribute, reveal)?;
    session.emit(value.as_deref().map(|v| v.as_str()).unwrap_or(""))
}

/// Entry names selected by a `<name>|all` argument. `None` when every entry is selected.
fn selection(arg: Option<&String>) -> Option<&str> {
    match arg {
        None => None,
        Some(name) if name.eq_ignore_ascii_case(constants::ALL_KEYWORD) => None,
        Some(name) => Some(name.as_str()),
    }
}

/// Run `render` over the selected entries. A single named entry must exist
/// and decode; in a full scan unreadable entries are reported and skipped.
fn for_each_selected<F>(session: &mut Session<'_>, selected: Option<&str>, mut render: F) -> Result<()>
where
    F: FnMut(&mut Session<'_>, &ConnectionEntry) -> Result<()>,
{
    if let Some(name) = selected {
        let entry = session.store.get(name)?;
        return render(session, &entry);
    }
    let entries: Vec<Result<ConnectionEntry>> = session.store.entries().collect();
    for entry in entries {
        let outcome = entry.and_then(|entry| {
            render(session, &entry).map_err(|e| match e {
                VaultError::Crypto(reason) => VaultError::CorruptEntry {
                    name: entry.name.clone(),
                    reason,
                },
                other => other,
            })
        });
        if let Err(e) = outcome {
            if !e.is_recoverable() {
                return Err(e);
            }
            debug!("skipping entry: {}", e);
            session.report("skipped", &e);
        }
    }
    Ok(())
}

pub fn run_export(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let selected = selection(args.first());
    let fields = if args.len() > 1 {
        args[1..]
            .iter()
            .map(|f| Attribute::parse(f))
            .collect::<Result<Vec<_>>>()?
    } else {
        exchange::EXPORT_FIELDS.to_vec()
    };
    for_each_selected(session, selected, |session, entry| {
        let line = exchange::render_fields(entry, &fields, &session.keys)?;
        session.emit(&line)
    })
}

pub fn run_gen_add_cmd(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let selected = selection(args.first());
    // A full dump is written without the command prefix so it can be fed to bulk-add.
    let prefix = if selected.is_some() { "logonmgr add " } else { "" };
    for_each_selected(session, selected, |session, entry| {
        let line = exchange::render_add_args(entry, &session.keys)?;
        session.emit(&format!("{}{}", prefix, line.as_str()))
    })
}

pub fn run_query(session: &mut Session<'_>, args: &[String]) -> Result<()> {
    let mut criteria = Vec::with_capacity(args.len());
    for arg in args {
        let (key, value) = arg.split_once('=').ok_or_else(|| {
            VaultError::Usage(format!("expected attribute=value, found '{}'", arg))
        })?;
        let attribute = Attribute::parse(key)?;
        if !attribute.is_queryable() {
            return Err(VaultError::InvalidAttribute(format!(
                "{} cannot be used as a query criterion",
                attribute.name()
            )));
        }
        criteria.push((attribute, value.to_string()));
    }

    let entries: Vec<Result<ConnectionEntry>> = session.store.entries().collect();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable entry: {}", e);
                session.report("query", &e);
                continue;
            }
        };
        let mut hit = true;
        for (attribute, expected) in &criteria {
            if !attributes::matches(&entry, *attribute, expected)? {
                hit = false;
                break;
            }
        }
        if hit {
            session.emit(&entry.to_string())?;
            session.emit("")?;
        }
    }
    Ok(())
}

pub fn run_info(session: &mut Session<'_>, _args: &[String]) -> Result<()> {
    let modified = session
        .store
        .modified_at()
        .map(|t| {
            DateTime::<Local>::from(t)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string());
    let lines = [
        constants::VERSION_BANNER.to_string(),
        format!("Logons file path: {}", session.store.path().display()),
        format!("Last modification: {}", modified),
        format!("Number of entries: {}", session.store.entry_count()),
        format!("Key fingerprint: {}", session.keys.fingerprint()),
    ];
    for line in lines {
        session.emit(&line)?;
    }
    Ok(())
}
