//! Local credential vault for database and application connection profiles.
//!
//! Entries live in a single key-value store file. Passwords are sealed with
//! the store's keypair and every mutation is stamped with audit metadata.
//!
//! ## Modules
//! - `cli`: Command table, session, and handlers
//! - `core`: Store, key management, attribute access, exchange format
//! - `models`: Data structures
//! - `util`: System utilities (fs, identity)

pub mod cli;
pub mod constants;
pub mod core;
pub mod error;
pub mod models;
pub mod util;
