//! Scalar option values attached to an entry.

use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type Options = BTreeMap<String, OptionValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Integer(i) => write!(f, "{}", i),
            OptionValue::Float(x) => write!(f, "{}", x),
            OptionValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl TryFrom<serde_json::Value> for OptionValue {
    type Error = String;

    fn try_from(value: serde_json::Value) -> std::result::Result<Self, Self::Error> {
        match value {
            serde_json::Value::Bool(b) => Ok(OptionValue::Bool(b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(OptionValue::Integer(i))
                } else if let Some(x) = n.as_f64() {
                    Ok(OptionValue::Float(x))
                } else {
                    Err(format!("number {} out of range", n))
                }
            }
            serde_json::Value::String(s) => Ok(OptionValue::Text(s)),
            serde_json::Value::Null => Err("null is not a scalar value".into()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                Err("nested values are not allowed".into())
            }
        }
    }
}

/// Parse an options mapping written as a JSON object of scalars.
///
/// The text is only ever parsed, never evaluated.
pub fn parse_options(text: &str) -> Result<Options> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| VaultError::InvalidOptions(format!("{} ({})", text, e)))?;
    let object = match value {
        serde_json::Value::Object(map) => map,
        _ => {
            return Err(VaultError::InvalidOptions(format!(
                "{} cannot be converted to a mapping",
                text
            )))
        }
    };
    let mut options = Options::new();
    for (key, value) in object {
        let scalar = OptionValue::try_from(value)
            .map_err(|e| VaultError::InvalidOptions(format!("option {}: {}", key, e)))?;
        options.insert(key, scalar);
    }
    Ok(options)
}

/// Render options as a compact JSON object, the same syntax `parse_options` reads.
pub fn render_options(options: &Options) -> String {
    serde_json::to_string(options).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars() {
        let opts = parse_options(r#"{"timeout":30,"ssl":true,"ratio":0.5,"mode":"ro"}"#).unwrap();
        assert_eq!(opts["timeout"], OptionValue::Integer(30));
        assert_eq!(opts["ssl"], OptionValue::Bool(true));
        assert_eq!(opts["ratio"], OptionValue::Float(0.5));
        assert_eq!(opts["mode"], OptionValue::Text("ro".into()));
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        assert!(parse_options("[1,2]").is_err());
        assert!(parse_options("42").is_err());
        assert!(parse_options("__import__('os')").is_err());
    }

    #[test]
    fn test_parse_rejects_nested_and_null() {
        assert!(parse_options(r#"{"a":{"b":1}}"#).is_err());
        assert!(parse_options(r#"{"a":[1]}"#).is_err());
        assert!(parse_options(r#"{"a":null}"#).is_err());
    }

    #[test]
    fn test_render_is_parseable() {
        let opts = parse_options(r#"{"retries":3,"timeout":30}"#).unwrap();
        let text = render_options(&opts);
        assert_eq!(text, r#"{"retries":3,"timeout":30}"#);
        assert_eq!(parse_options(&text).unwrap(), opts);
    }
}
