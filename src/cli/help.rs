//! Usage text rendered from the command table.

use crate::cli::dispatch::{CommandSpec, COMMANDS};
use crate::error::{Result, VaultError};
use std::io::Write;

const STORE_FLAGS: &str = "\
Store selection:
  -f, --file <PATH>   use the store at PATH
  -l, --local         use $HOME/logons.db (or $HOME/logons.db.<hostname> if present)
  otherwise           $APP_OBJECTS_DIR/logons.db, then [store].path from the config file";

fn write_all(out: &mut dyn Write, text: &str) -> Result<()> {
    out.write_all(text.as_bytes())
        .map_err(|e| VaultError::io("write output", e))
}

fn synopsis(spec: &CommandSpec) -> String {
    if spec.usage.is_empty() {
        spec.name.to_string()
    } else {
        format!("{} {}", spec.name, spec.usage)
    }
}

pub fn usage_text() -> String {
    let names: Vec<&str> = COMMANDS.iter().map(|c| c.name).collect();
    format!(
        "usage: logonmgr [-f <PATH> | -l] <command> [<args>]\n\n\
         Commands: {}\n\n\
         Run `logonmgr help-commands` for details on each command.\n",
        names.join(", ")
    )
}

pub fn run_help(out: &mut dyn Write) -> Result<()> {
    write_all(out, &usage_text())?;
    write_all(out, &format!("\n{}\n", STORE_FLAGS))
}

pub fn run_help_commands(out: &mut dyn Write) -> Result<()> {
    let width = COMMANDS
        .iter()
        .map(|c| synopsis(c).len())
        .max()
        .unwrap_or(0);
    let mut text = String::from("usage: logonmgr [-f <PATH> | -l] <command> [<args>]\n\n");
    for spec in COMMANDS {
        text.push_str(&format!(
            "  {:<width$}  {}\n",
            synopsis(spec),
            spec.summary,
            width = width
        ));
        if !spec.aliases.is_empty() {
            text.push_str(&format!(
                "  {:<width$}  (also: {})\n",
                "",
                spec.aliases.join(", "),
                width = width
            ));
        }
    }
    write_all(out, &text)
}
