//! Command table and per-command session.
//!
//! One dispatch is one store open/close cycle: the command's access mode
//! decides the lock, the keypair is ensured right after open, and the store is
//! flushed only when the handler succeeds.

use crate::cli::{entry, help, lookup, transfer};
use crate::core::attributes::Attribute;
use crate::core::keys::{self, KeyPair};
use crate::core::paths::StoreLocation;
use crate::core::store::{AccessMode, CredentialStore};
use crate::error::{Result, VaultError};
use crate::models::settings::Settings;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Process-level inputs shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub file: Option<PathBuf>,
    pub local: bool,
    pub settings: Settings,
    pub actor: String,
    pub non_interactive: bool,
}

/// State owned by one command invocation.
pub struct Session<'a> {
    pub store: CredentialStore,
    pub keys: KeyPair,
    pub actor: &'a str,
    pub non_interactive: bool,
    out: &'a mut dyn Write,
    failures: usize,
}

impl Session<'_> {
    /// Write one line of command output.
    pub fn emit(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line).map_err(|e| VaultError::io("write output", e))
    }

    /// Report a non-fatal failure and keep going.
    pub fn report(&mut self, context: &str, err: &VaultError) {
        eprintln!("{}: {}", context, err);
        self.failures += 1;
    }
}

pub type StoreHandler = fn(&mut Session<'_>, &[String]) -> Result<()>;
pub type HelpHandler = fn(&mut dyn Write) -> Result<()>;

#[derive(Clone, Copy)]
pub enum Handler {
    Store(AccessMode, StoreHandler),
    Getter(Attribute),
    Help(HelpHandler),
}

pub struct CommandSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub usage: &'static str,
    pub summary: &'static str,
    pub min_args: usize,
    pub handler: Handler,
}

impl CommandSpec {
    /// Access mode the store is opened with, `None` for commands that never open it.
    pub fn access_mode(&self) -> Option<AccessMode> {
        match self.handler {
            Handler::Store(mode, _) => Some(mode),
            Handler::Getter(_) => Some(AccessMode::ReadOnly),
            Handler::Help(_) => None,
        }
    }
}

use AccessMode::{ReadOnly, ReadWrite};

#[rustfmt::skip]
pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec { name: "add", aliases: &[], usage: "<connection_name> <attr=value ...>", summary: "Adds an entry", min_args: 1, handler: Handler::Store(ReadWrite, entry::run_add) },
    CommandSpec { name: "update", aliases: &[], usage: "<connection_name> <attr1=value1> [<attr2=value2> ...]", summary: "Updates one or more attributes of an entry; options are merged", min_args: 2, handler: Handler::Store(ReadWrite, entry::run_update) },
    CommandSpec { name: "set", aliases: &[], usage: "<connection_name> <attribute> [<value>]", summary: "Sets a single attribute of an entry; options are replaced", min_args: 2, handler: Handler::Store(ReadWrite, entry::run_set) },
    CommandSpec { name: "remove-option", aliases: &["rm-options", "rm-option"], usage: "<connection_name> <optionname ...>|ALL", summary: "Removes one, more or all options of an entry", min_args: 2, handler: Handler::Store(ReadWrite, entry::run_remove_option) },
    CommandSpec { name: "delete", aliases: &[], usage: "<connection_name>", summary: "Removes an entry", min_args: 1, handler: Handler::Store(ReadWrite, entry::run_delete) },
    CommandSpec { name: "load-from-text", aliases: &["load_from_textfile", "load-from-textfile"], usage: "<filename>", summary: "Loads entries written by export (same field order)", min_args: 0, handler: Handler::Store(ReadWrite, transfer::run_load_from_text) },
    CommandSpec { name: "bulk-add", aliases: &["bulk_add"], usage: "<args_file>", summary: "Adds every `name attr=value ...` line of a file", min_args: 0, handler: Handler::Store(ReadWrite, transfer::run_bulk_add) },
    CommandSpec { name: "list", aliases: &[], usage: "[--long]", summary: "Lists entry names", min_args: 0, handler: Handler::Store(ReadOnly, lookup::run_list) },
    CommandSpec { name: "show", aliases: &[], usage: "<connection_name>", summary: "Displays all attributes of an entry; the password stays encrypted", min_args: 1, handler: Handler::Store(ReadOnly, lookup::run_show) },
    CommandSpec { name: "export", aliases: &[], usage: "[<connection_name>|all] [<field> ...]", summary: "Exports entries pipe-delimited with the password decrypted", min_args: 0, handler: Handler::Store(ReadOnly, lookup::run_export) },
    CommandSpec { name: "gen-add-cmd", aliases: &["gen_add_cmd"], usage: "<connection_name>|all", summary: "Exports entries in add command format; `all` writes bulk-add input", min_args: 1, handler: Handler::Store(ReadOnly, lookup::run_gen_add_cmd) },
    CommandSpec { name: "query", aliases: &[], usage: "<attr=value ...>", summary: "Shows entries matching every attr=value criterion", min_args: 1, handler: Handler::Store(ReadOnly, lookup::run_query) },
    CommandSpec { name: "userid", aliases: &[], usage: "<connection_name>", summary: "Retrieves the userid attribute", min_args: 1, handler: Handler::Getter(Attribute::Userid) },
    CommandSpec { name: "password", aliases: &[], usage: "<connection_name> [decrypt]", summary: "Retrieves the password attribute, decrypted on request", min_args: 1, handler: Handler::Getter(Attribute::Password) },
    CommandSpec { name: "server", aliases: &[], usage: "<connection_name>", summary: "Retrieves the server attribute", min_args: 1, handler: Handler::Getter(Attribute::Server) },
    CommandSpec { name: "dbms", aliases: &[], usage: "<connection_name>", summary: "Retrieves the dbms attribute", min_args: 1, handler: Handler::Getter(Attribute::Dbms) },
    CommandSpec { name: "database", aliases: &[], usage: "<connection_name>", summary: "Retrieves the database attribute", min_args: 1, handler: Handler::Getter(Attribute::Database) },
    CommandSpec { name: "options", aliases: &["dboptions"], usage: "<connection_name>", summary: "Retrieves the options attribute", min_args: 1, handler: Handler::Getter(Attribute::Options) },
    CommandSpec { name: "create-ts", aliases: &["create_ts"], usage: "<connection_name>", summary: "Retrieves the creation timestamp", min_args: 1, handler: Handler::Getter(Attribute::CreateTs) },
    CommandSpec { name: "create-userid", aliases: &["create_userid"], usage: "<connection_name>", summary: "Retrieves the creating user", min_args: 1, handler: Handler::Getter(Attribute::CreateUserid) },
    CommandSpec { name: "last-updt-ts", aliases: &["last_updt_ts"], usage: "<connection_name>", summary: "Retrieves the last modification timestamp", min_args: 1, handler: Handler::Getter(Attribute::LastUpdtTs) },
    CommandSpec { name: "last-updt-userid", aliases: &["last_updt_userid"], usage: "<connection_name>", summary: "Retrieves the last modifying user", min_args: 1, handler: Handler::Getter(Attribute::LastUpdtUserid) },
    CommandSpec { name: "info", aliases: &[], usage: "", summary: "Shows version, store path, last modification and number of entries", min_args: 0, handler: Handler::Store(ReadOnly, lookup::run_info) },
    CommandSpec { name: "help", aliases: &[], usage: "", summary: "Shows general usage", min_args: 0, handler: Handler::Help(help::run_help) },
    CommandSpec { name: "help-commands", aliases: &[], usage: "", summary: "Shows more detailed help for commands", min_args: 0, handler: Handler::Help(help::run_help_commands) },
];

pub fn lookup(command: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|c| c.name == command || c.aliases.contains(&command))
}

/// Result of a completed command.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Records reported and skipped along the way.
    pub failures: usize,
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        if self.failures == 0 {
            0
        } else {
            1
        }
    }
}

pub fn dispatch(
    command: &str,
    args: &[String],
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<Outcome> {
    let spec = lookup(command).ok_or_else(|| VaultError::UnknownCommand(command.to_string()))?;
    if args.len() < spec.min_args {
        return Err(VaultError::Usage(format!(
            "usage: logonmgr {} {}",
            spec.name, spec.usage
        )));
    }

    let mode = match (spec.handler, spec.access_mode()) {
        (Handler::Help(run), _) => {
            run(out)?;
            return Ok(Outcome::default());
        }
        (_, Some(mode)) => mode,
        (_, None) => AccessMode::ReadOnly,
    };

    let location = StoreLocation::resolve(ctx.file.clone(), ctx.local, &ctx.settings)?;
    let mode = if location.path.exists() {
        mode
    } else {
        AccessMode::ReadWrite
    };
    debug!(command = spec.name, %mode, store = %location, source = ?location.source, "dispatching");

    let mut store = CredentialStore::open(&location.path, mode)?;
    if store.is_new() {
        eprintln!("Creating new file: {}", location);
    }
    let keys = keys::ensure_keys(&mut store)?;
    let mut session = Session {
        store,
        keys,
        actor: &ctx.actor,
        non_interactive: ctx.non_interactive,
        out,
        failures: 0,
    };

    let result = match spec.handler {
        Handler::Store(_, run) => run(&mut session, args),
        Handler::Getter(attribute) => lookup::run_getter(&mut session, attribute, args),
        Handler::Help(_) => Ok(()),
    };

    let Session {
        store, failures, ..
    } = session;
    match result {
        Ok(()) => {
            store.close()?;
            Ok(Outcome { failures })
        }
        Err(e) => {
            debug!(command = spec.name, "discarding pending writes after failure");
            drop(store);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_and_aliases_unique() {
        let mut seen = HashSet::new();
        for spec in COMMANDS {
            assert!(seen.insert(spec.name), "duplicate {}", spec.name);
            for alias in spec.aliases {
                assert!(seen.insert(alias), "duplicate {}", alias);
            }
        }
    }

    #[test]
    fn test_access_modes() {
        for name in ["add", "update", "set", "remove-option", "delete", "load-from-text", "bulk-add"] {
            assert_eq!(lookup(name).unwrap().access_mode(), Some(AccessMode::ReadWrite), "{}", name);
        }
        for name in ["list", "show", "export", "query", "info", "userid", "password", "create-ts"] {
            assert_eq!(lookup(name).unwrap().access_mode(), Some(AccessMode::ReadOnly), "{}", name);
        }
        assert_eq!(lookup("help").unwrap().access_mode(), None);
    }

    #[test]
    fn test_legacy_aliases_resolve() {
        assert_eq!(lookup("rm-options").unwrap().name, "remove-option");
        assert_eq!(lookup("load_from_textfile").unwrap().name, "load-from-text");
        assert_eq!(lookup("dboptions").unwrap().name, "options");
        assert_eq!(lookup("last_updt_ts").unwrap().name, "last-updt-ts");
    }

    #[test]
    fn test_unknown_command() {
        let mut out = Vec::new();
        let err = dispatch("frobnicate", &[], &Context::default(), &mut out).unwrap_err();
        assert!(matches!(err, VaultError::UnknownCommand(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_short_args_is_usage_error() {
        let mut out = Vec::new();
        let err = dispatch("show", &[], &Context::default(), &mut out).unwrap_err();
        assert!(matches!(err, VaultError::Usage(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_help_needs_no_store() {
        let mut out = Vec::new();
        let outcome = dispatch("help", &[], &Context::default(), &mut out).unwrap();
        assert_eq!(outcome.exit_code(), 0);
        assert!(String::from_utf8(out).unwrap().contains("help-commands"));
    }
}
