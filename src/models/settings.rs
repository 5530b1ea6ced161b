//! Optional TOML configuration.

use crate::constants;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// Store used when neither `--file`, `--local` nor `$APP_OBJECTS_DIR` apply.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// File name used under `$HOME` by `--local`.
    #[serde(default = "default_local_name")]
    pub local_name: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: None,
            local_name: default_local_name(),
        }
    }
}

fn default_local_name() -> String {
    constants::DEFAULT_STORE_NAME.to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSection {
    /// `tracing` filter directive, e.g. `logonmgr=debug`.
    #[serde(default)]
    pub filter: Option<String>,
}
