//! Centralized constants for permissions, paths, and limits.

/// Version banner printed by `info`.
pub const VERSION_BANNER: &str = concat!("logonmgr version ", env!("CARGO_PKG_VERSION"));

/// File name of the store inside `$APP_OBJECTS_DIR` and `$HOME`.
pub const DEFAULT_STORE_NAME: &str = "logons.db";

/// Environment variable naming the shared objects directory.
pub const OBJECTS_DIR_ENV: &str = "APP_OBJECTS_DIR";

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "LOGONMGR_CONFIG";

/// Reserved store key holding the keypair. `@` is never valid in an entry name.
pub const KEYPAIR_KEY: &str = "@keypair";

/// Format marker written at the top of every store file.
pub const STORE_FORMAT: &str = "logonmgr-store";

/// Newest store format version this build reads and writes.
pub const STORE_VERSION: u32 = 1;

/// Permission mode for the store file.
pub const STORE_FILE_MODE: u32 = 0o600;

/// Permission mode for a store directory created on first write.
pub const STORE_DIR_MODE: u32 = 0o700;

/// Marker shown instead of a password ciphertext.
pub const ENCRYPTED_MARKER: &str = "[encrypted]";

/// Maximum password size in bytes (64 KiB).
pub const MAX_PASSWORD_SIZE: usize = 65_536;

/// Number of fields in a pipe-delimited exchange record.
pub const EXCHANGE_FIELDS: usize = 6;

/// Keyword that selects every entry (`export all`, `remove-option name ALL`).
pub const ALL_KEYWORD: &str = "all";
