use crate::error::{Result, VaultError};
use std::fs;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::{MetadataExt, PermissionsExt};

pub fn ensure_dir(path: &Path, mode: u32) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .map_err(|e| VaultError::io(format!("create directory {}", path.display()), e))?;
    }
    set_permissions(path, mode)
}

pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let perm = fs::Permissions::from_mode(mode);
        fs::set_permissions(path, perm).map_err(|e| {
            VaultError::io(
                format!("set permissions {:o} on {}", mode, path.display()),
                e,
            )
        })?;
    }
    Ok(())
}

/// Permission bits of an existing file, `None` if it does not exist.
pub fn existing_mode(path: &Path) -> Option<u32> {
    #[cfg(unix)]
    {
        fs::metadata(path)
            .ok()
            .map(|m| m.permissions().mode() & 0o7777)
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        None
    }
}

/// Give `target` the owner and group of `source`, as far as the caller may.
/// Only root can change the owner; any user can hand a file to one of its
/// own groups. Returns whether the full ownership was applied.
pub fn copy_ownership(source: &Path, target: &Path) -> Result<bool> {
    #[cfg(unix)]
    {
        use nix::unistd::{chown, Gid, Uid};
        let meta = match fs::metadata(source) {
            Ok(meta) => meta,
            Err(_) => return Ok(false),
        };
        let current = fs::metadata(target)
            .map_err(|e| VaultError::io(format!("stat {}", target.display()), e))?;
        if current.uid() == meta.uid() && current.gid() == meta.gid() {
            return Ok(true);
        }
        let owner = Some(Uid::from_raw(meta.uid()));
        let group = Some(Gid::from_raw(meta.gid()));
        if chown(target, owner, group).is_ok() {
            return Ok(true);
        }
        Ok(chown(target, None, group).is_ok() && current.uid() == meta.uid())
    }
    #[cfg(not(unix))]
    {
        let _ = (source, target);
        Ok(true)
    }
}
