//! ORM tag settings.
//!
//! Fields carry a tag string such as `column:user_name;size:64;not null;unique`.
//! Keys are case-insensitive and stored upper-cased; flags without a value are
//! stored with an empty value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const TAG_SIZE: &str = "SIZE";
pub const TAG_AUTO_INCREMENT: &str = "AUTO_INCREMENT";
pub const TAG_PRIMARY_KEY: &str = "PRIMARY_KEY";
pub const TAG_NOT_NULL: &str = "NOT NULL";
pub const TAG_UNIQUE: &str = "UNIQUE";
pub const TAG_DEFAULT: &str = "DEFAULT";
pub const TAG_COLUMN: &str = "COLUMN";
pub const TAG_TYPE: &str = "TYPE";
pub const TAG_INDEX: &str = "INDEX";
pub const TAG_UNIQUE_INDEX: &str = "UNIQUE_INDEX";
pub const TAG_IGNORE: &str = "-";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSettings {
    settings: BTreeMap<String, String>,
}

impl TagSettings {
    /// Create an empty set of tag settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a tag string.
    ///
    /// Entries are separated by `;`. Each entry is `key` or `key:value`; only the
    /// first `:` splits, so values such as `DEFAULT:'a:b'` survive intact.
    pub fn parse(tag: &str) -> Self {
        let settings = tag
            .split(';')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match entry.split_once(':') {
                Some((key, value)) => (key.trim().to_uppercase(), value.trim().to_string()),
                None => (entry.to_uppercase(), String::new()),
            })
            .collect();
        Self { settings }
    }

    /// Set a key, returning the updated settings.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.settings
            .insert(key.as_ref().to_uppercase(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(&key.to_uppercase()).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.settings.contains_key(&key.to_uppercase())
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Declared size, 0 when absent or not a number.
    pub fn size(&self) -> usize {
        self.get(TAG_SIZE)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_auto_increment(&self) -> bool {
        self.contains(TAG_AUTO_INCREMENT)
    }

    pub fn is_primary_key(&self) -> bool {
        self.contains(TAG_PRIMARY_KEY)
    }

    pub fn is_not_null(&self) -> bool {
        self.contains(TAG_NOT_NULL)
    }

    pub fn is_unique(&self) -> bool {
        self.contains(TAG_UNIQUE)
    }

    pub fn is_ignored(&self) -> bool {
        self.contains(TAG_IGNORE)
    }

    pub fn default_value(&self) -> Option<&str> {
        self.get(TAG_DEFAULT).filter(|v| !v.is_empty())
    }

    pub fn column_name(&self) -> Option<&str> {
        self.get(TAG_COLUMN).filter(|v| !v.is_empty())
    }

    /// Explicit SQL type overriding the kind mapping.
    pub fn sql_type(&self) -> Option<&str> {
        self.get(TAG_TYPE).filter(|v| !v.is_empty())
    }

    /// Index names declared with `INDEX`. An empty list means the flag was set
    /// without a name and the dialect picks one.
    pub fn index(&self) -> Option<Vec<String>> {
        self.get(TAG_INDEX).map(split_names)
    }

    pub fn unique_index(&self) -> Option<Vec<String>> {
        self.get(TAG_UNIQUE_INDEX).map(split_names)
    }
}

fn split_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys_case_insensitive() {
        let tags = TagSettings::parse("size:255;auto_increment;Primary_Key");
        assert_eq!(tags.size(), 255);
        assert!(tags.is_auto_increment());
        assert!(tags.is_primary_key());
        assert!(!tags.is_not_null());
    }

    #[test]
    fn test_size_not_a_number_is_zero() {
        assert_eq!(TagSettings::parse("SIZE:abc").size(), 0);
        assert_eq!(TagSettings::parse("SIZE").size(), 0);
        assert_eq!(TagSettings::new().size(), 0);
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let tags = TagSettings::parse("default:'a:b'");
        assert_eq!(tags.default_value(), Some("'a:b'"));
    }

    #[test]
    fn test_empty_entries_skipped() {
        let tags = TagSettings::parse(";; not null ;");
        assert!(tags.is_not_null());
        assert_eq!(tags, TagSettings::new().with("not null", ""));
    }

    #[test]
    fn test_index_names() {
        let tags = TagSettings::parse("index:idx_a, idx_b;unique_index");
        assert_eq!(
            tags.index(),
            Some(vec!["idx_a".to_string(), "idx_b".to_string()])
        );
        assert_eq!(tags.unique_index(), Some(Vec::new()));
    }

    #[test]
    fn test_column_and_type() {
        let tags = TagSettings::parse("column:user_name;type:citext");
        assert_eq!(tags.column_name(), Some("user_name"));
        assert_eq!(tags.sql_type(), Some("citext"));
    }
}
