//! Text exchange formats: pipe-delimited export records and `add` command lines.

use crate::constants;
use crate::core::attributes::{self, Attribute, Reveal};
use crate::core::keys::KeyPair;
use crate::error::{Result, VaultError};
use crate::models::entry::ConnectionEntry;
use zeroize::Zeroizing;

/// One `name|userid|password|server|dbms|database` line. The password is plaintext.
#[derive(Debug)]
pub struct ExchangeRecord {
    pub name: String,
    pub userid: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub server: Option<String>,
    pub dbms: Option<String>,
    pub database: Option<String>,
}

fn non_empty(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

pub fn parse_line(line: &str) -> Result<ExchangeRecord> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() != constants::EXCHANGE_FIELDS {
        return Err(VaultError::Usage(format!(
            "expected {} pipe-delimited fields, found {}",
            constants::EXCHANGE_FIELDS,
            fields.len()
        )));
    }
    Ok(ExchangeRecord {
        name: fields[0].to_string(),
        userid: non_empty(fields[1]),
        password: non_empty(fields[2]).map(Zeroizing::new),
        server: non_empty(fields[3]),
        dbms: non_empty(fields[4]),
        database: non_empty(fields[5]),
    })
}

/// The fixed export field order.
pub const EXPORT_FIELDS: [Attribute; constants::EXCHANGE_FIELDS] = [
    Attribute::Name,
    Attribute::Userid,
    Attribute::Password,
    Attribute::Server,
    Attribute::Dbms,
    Attribute::Database,
];

/// Render the chosen attributes of an entry, pipe-delimited, password decrypted.
pub fn render_fields(
    entry: &ConnectionEntry,
    fields: &[Attribute],
    keys: &KeyPair,
) -> Result<Zeroizing<String>> {
    let mut parts: Vec<Zeroizing<String>> = Vec::with_capacity(fields.len());
    for field in fields {
        let value = attributes::get(entry, *field, Reveal::Plaintext(keys))?;
        parts.push(value.unwrap_or_else(|| Zeroizing::new(String::new())));
    }
    let joined: Vec<&str> = parts.iter().map(|p| p.as_str()).collect();
    Ok(Zeroizing::new(joined.join("|")))
}

/// Split `attr=value` at the first `=`.
pub fn parse_assignment(arg: &str) -> Result<(Attribute, String)> {
    let (key, value) = arg.split_once('=').ok_or_else(|| {
        VaultError::Usage(format!("expected attribute=value, found '{}'", arg))
    })?;
    let attribute = Attribute::parse_writable(key)?;
    Ok((attribute, value.to_string()))
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c)
}

/// Quote a value so a POSIX shell and [`split_add_line`] read it back verbatim.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty() && value.chars().all(is_shell_safe) {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Split a line into words the way a POSIX shell does for plain words:
/// whitespace separates, single quotes are literal, double quotes and
/// backslashes escape. No expansion takes place.
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(VaultError::Usage("unterminated single quote".into())),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => word.push(c),
                            Some(c) => {
                                word.push('\\');
                                word.push(c);
                            }
                            None => break,
                        },
                        Some(c) => word.push(c),
                        None => return Err(VaultError::Usage("unterminated double quote".into())),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(c) = chars.next() {
                    word.push(c);
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

/// A `name attr=value ...` line as read by `bulk-add`. Blank lines and
/// `#` comments yield `None`.
pub fn split_add_line(line: &str) -> Result<Option<Vec<String>>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    split_words(trimmed).map(Some)
}

/// Render an entry as `add` arguments, password decrypted and values
/// shell-quoted. Unset attributes are omitted.
pub fn render_add_args(entry: &ConnectionEntry, keys: &KeyPair) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(entry.name.clone());
    for attribute in [
        Attribute::Userid,
        Attribute::Password,
        Attribute::Server,
        Attribute::Database,
        Attribute::Dbms,
    ] {
        if let Some(value) = attributes::get(entry, attribute, Reveal::Plaintext(keys))? {
            let quoted = Zeroizing::new(shell_quote(&value));
            line.push(' ');
            line.push_str(attribute.name());
            line.push('=');
            line.push_str(&quoted);
        }
    }
    if !entry.options.is_empty() {
        if let Some(value) = attributes::get(entry, Attribute::Options, Reveal::Sealed)? {
            line.push_str(&format!(" options={}", shell_quote(&value)));
        }
    }
    Ok(line)
}
