//! Data structures persisted in the store and configuration files.

pub mod entry;
pub mod keypair;
pub mod options;
pub mod settings;
pub mod store_file;
