//! Acting-user and host identity.

use nix::unistd::{getuid, User};

/// Identity recorded in `created_by` / `last_modified_by`.
///
/// A sudo session is attributed to the invoking user, otherwise `$USER`.
/// Falls back to the passwd entry of the real uid, then to the numeric uid.
pub fn detect_actor() -> String {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if !user.is_empty() {
            return format!("{}(sudo)", user);
        }
    }
    if let Ok(user) = std::env::var("USER") {
        if !user.is_empty() {
            return user;
        }
    }
    let uid = getuid();
    match User::from_uid(uid) {
        Ok(Some(user)) => user.name,
        _ => format!("uid:{}", uid),
    }
}

/// Short host name, if it can be determined.
pub fn hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
}
