//! On-disk store document.

use crate::constants;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whole-file store document. Records stay raw JSON so one bad record does not
/// prevent the rest of the store from loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub records: BTreeMap<String, serde_json::Value>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            format: default_format(),
            version: constants::STORE_VERSION,
            records: BTreeMap::new(),
        }
    }
}

fn default_format() -> String {
    constants::STORE_FORMAT.to_string()
}
