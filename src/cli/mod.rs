//! CLI parsing and routing into the command dispatcher.

use crate::core::settings;
use crate::error::VaultError;
use crate::models::settings::Settings;
use crate::util::identity;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;

pub mod dispatch;
pub mod entry;
pub mod help;
pub mod lookup;
pub mod transfer;

#[cfg(test)]
mod scenarios;

use dispatch::Context;

#[derive(Parser, Debug)]
#[command(
    name = "logonmgr",
    version,
    about = "Encrypted store of database connection entries",
    after_help = "Run `logonmgr help-commands` for the list of commands."
)]
pub struct Cli {
    /// Store file to use
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Use the per-user store in $HOME
    #[arg(short = 'l', long, conflicts_with = "file")]
    pub local: bool,

    /// Configuration file (default: $LOGONMGR_CONFIG or ~/.config/logonmgr/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Run in non-interactive mode (no prompts, suitable for automation)
    #[arg(long, env = "LOGONMGR_NON_INTERACTIVE")]
    pub non_interactive: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to run
    pub command: Option<String>,

    /// Command arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Load the configuration file. A missing file yields defaults; an
    /// unreadable one yields defaults plus a warning for the caller to print.
    pub fn load_settings(&self) -> (Settings, Option<String>) {
        match settings::locate(self.config.clone()) {
            None => (Settings::default(), None),
            Some(path) => match settings::load(&path) {
                Ok(settings) => (settings, None),
                Err(e) => (Settings::default(), Some(format!("{:#}", e))),
            },
        }
    }

    /// Run the command and return the process exit status.
    pub fn run(self, settings: Settings) -> i32 {
        let stdout = io::stdout();
        let mut out = stdout.lock();

        let Some(command) = self.command else {
            let _ = out.write_all(help::usage_text().as_bytes());
            return 1;
        };

        let ctx = Context {
            file: self.file,
            local: self.local,
            settings,
            actor: identity::detect_actor(),
            non_interactive: self.non_interactive,
        };

        let status = match dispatch::dispatch(&command, &self.args, &ctx, &mut out) {
            Ok(outcome) => outcome.exit_code(),
            Err(e) => {
                eprintln!("{}", e);
                if matches!(e, VaultError::UnknownCommand(_)) {
                    eprint!("{}", help::usage_text());
                }
                e.exit_code()
            }
        };
        let _ = out.flush();
        status
    }
}
