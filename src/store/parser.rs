//! Flat key-value file parsing.
//!
//! ```text
//! # comment
//! config_version = 2
//! [rendering]
//! enableFog = true        → rendering.enableFog = "true"
//! [rendering.entityCulling]
//! mode = "FAST"           → rendering.entityCulling.mode = "FAST"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Mapping from dotted key to raw string value, rebuilt on every load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawStore {
    values: BTreeMap<String, String>,
}

impl RawStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Move the value at `old` to `new`. Only applies when `old` is present
    /// and `new` is not, so repeating it is a no-op.
    pub fn rename(&mut self, old: &str, new: &str) -> bool {
        if !self.values.contains_key(old) || self.values.contains_key(new) {
            return false;
        }
        match self.values.remove(old) {
            Some(value) => {
                self.values.insert(new.to_string(), value);
                tracing::debug!(from = old, to = new, "Renamed config key");
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for RawStore {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Reader and writer for the persisted flat format.
pub struct FlatStore;

impl FlatStore {
    /// Parse file contents into a raw store.
    pub fn parse(content: &str) -> RawStore {
        let mut store = RawStore::new();
        let mut section = String::new();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() >= 2 {
                section = trimmed[1..trimmed.len() - 1].trim().to_string();
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if key.is_empty() {
                continue;
            }

            let full_key = if section.is_empty() {
                key.to_string()
            } else {
                format!("{section}.{key}")
            };
            store.insert(full_key, unquote(value.trim()));
        }

        store
    }

    /// Read and parse a file, surfacing I/O errors.
    pub fn read(path: &Path) -> io::Result<RawStore> {
        let content = fs::read_to_string(path)?;
        let store = Self::parse(&content);
        tracing::debug!(path = %path.display(), entries = store.len(), "Loaded config values");
        Ok(store)
    }
}

/// Strip surrounding double quotes and resolve escapes. Unquoted text is
/// returned as is.
pub(crate) fn unquote(value: &str) -> String {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        unescape(&value[1..value.len() - 1])
    } else {
        value.to_string()
    }
}

/// Resolve `\"`, `\\`, `\n`, `\r`, `\t` and `\uXXXX`. Unknown escapes
/// are kept verbatim.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if hex.len() == 4 => {
                        out.push(decoded);
                        chars.nth(3);
                    }
                    _ => out.push_str("\\u"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
