//! Store path resolution.

use crate::constants;
use crate::error::{Result, VaultError};
use crate::models::settings::Settings;
use crate::util::identity;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    FileArg,
    Local,
    ObjectsDir,
    Config,
}

#[derive(Debug, Clone)]
pub struct StoreLocation {
    pub path: PathBuf,
    pub source: LocationSource,
}

impl StoreLocation {
    /// Resolve the store path from `--file`, `--local`, `$APP_OBJECTS_DIR`,
    /// or the configuration file, in that order.
    pub fn resolve(file_arg: Option<PathBuf>, local: bool, settings: &Settings) -> Result<Self> {
        Self::resolve_from(
            file_arg,
            local,
            settings,
            env::var(constants::OBJECTS_DIR_ENV).ok(),
            env::var("HOME").ok(),
            identity::hostname(),
        )
    }

    fn resolve_from(
        file_arg: Option<PathBuf>,
        local: bool,
        settings: &Settings,
        objects_dir: Option<String>,
        home: Option<String>,
        hostname: Option<String>,
    ) -> Result<Self> {
        if let Some(path) = file_arg {
            return Ok(Self {
                path,
                source: LocationSource::FileArg,
            });
        }
        if local {
            let home = home
                .filter(|h| !h.is_empty())
                .ok_or_else(|| VaultError::Usage("--local requires HOME to be set".into()))?;
            let base = PathBuf::from(home).join(&settings.store.local_name);
            // A host-specific store takes precedence when one exists.
            let path = match hostname {
                Some(host) => {
                    let mut name = base.clone().into_os_string();
                    name.push(format!(".{}", host));
                    let per_host = PathBuf::from(name);
                    if per_host.exists() {
                        per_host
                    } else {
                        base
                    }
                }
                None => base,
            };
            return Ok(Self {
                path,
                source: LocationSource::Local,
            });
        }
        if let Some(dir) = objects_dir.filter(|d| !d.is_empty()) {
            return Ok(Self {
                path: PathBuf::from(dir).join(constants::DEFAULT_STORE_NAME),
                source: LocationSource::ObjectsDir,
            });
        }
        if let Some(path) = &settings.store.path {
            return Ok(Self {
                path: path.clone(),
                source: LocationSource::Config,
            });
        }
        Err(VaultError::MissingFile(format!(
            "you must set {} or use -f/--file or -l/--local to point to the logons file",
            constants::OBJECTS_DIR_ENV
        )))
    }
}

impl std::fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
