//! Utility modules for filesystem and process identity.

pub mod fs;
pub mod identity;
