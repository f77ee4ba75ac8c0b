//! Whitelisted storage keys
//!
//! Contact identifiers and asset file names come from request paths and
//! bodies. They only ever reach the filesystem as one of these types, so a
//! key can never contain a separator, a `..` component or a leading dot.

use super::StoreError;
use std::fmt;

const MAX_KEY_LEN: usize = 128;

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Identifier of a contact file (`<key>.json`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Accept `raw` only if it is 1–128 chars of `[A-Za-z0-9_-]`
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        if raw.is_empty() || raw.len() > MAX_KEY_LEN || !raw.chars().all(is_key_char) {
            return Err(StoreError::InvalidKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Accept a client file name such as `ada_lovelace.json`
    pub fn from_filename(filename: &str) -> Result<Self, StoreError> {
        let trimmed = filename.trim();
        Self::parse(trimmed.strip_suffix(".json").unwrap_or(trimmed))
    }

    /// `firstname_lastname`, lower-cased, other characters replaced by `-`
    pub fn derive(first_name: &str, last_name: &str) -> Result<Self, StoreError> {
        let key = format!("{}_{}", slug(first_name), slug(last_name));
        Self::parse(&key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn slug(part: &str) -> String {
    part.trim()
        .to_lowercase()
        .chars()
        .map(|c| if is_key_char(c) { c } else { '-' })
        .collect()
}

/// File name of an image asset: `<stem>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetName(String);

impl AssetName {
    /// Stem is a valid [`StorageKey`]; extension, if any, is 1–8 ASCII alphanumerics
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidKey(raw.to_string());
        let (stem, ext) = match raw.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (raw, None),
        };
        StorageKey::parse(stem).map_err(|_| invalid())?;
        if let Some(ext) = ext {
            if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid());
            }
        }
        Ok(Self(raw.to_string()))
    }

    /// Build a fresh name from a stem and extension
    pub fn generate(stem: &str, extension: &str) -> Result<Self, StoreError> {
        Self::parse(&format!("{}.{}", stem, extension))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
