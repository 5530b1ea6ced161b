//! Loading of the optional TOML configuration file.

use crate::constants;
use crate::models::settings::Settings;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file location: explicit flag, `$LOGONMGR_CONFIG`, then
/// `$XDG_CONFIG_HOME/logonmgr/config.toml` or `$HOME/.config/logonmgr/config.toml`.
pub fn locate(config_arg: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = config_arg {
        return Some(path);
    }
    if let Ok(path) = env::var(constants::CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    let base = match env::var("XDG_CONFIG_HOME") {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(env::var("HOME").ok()?).join(".config"),
    };
    Some(base.join("logonmgr").join("config.toml"))
}

pub fn load(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let settings: Settings = toml::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(settings)
}
