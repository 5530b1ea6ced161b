//! Core business logic modules.

pub mod attributes;
pub mod exchange;
pub mod file_lock;
pub mod keys;
pub mod paths;
pub mod settings;
pub mod store;
