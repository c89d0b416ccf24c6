//! Change sets: named differences between desired and observed state

use serde::{Deserialize, Serialize};
use std::fmt;

/// The desired value carried by a single change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeValue {
    Bool(bool),
    Number(u64),
    Text(String),
    List(Vec<String>),
}

impl ChangeValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<bool> for ChangeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u64> for ChangeValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl From<u32> for ChangeValue {
    fn from(value: u32) -> Self {
        Self::Number(u64::from(value))
    }
}

impl From<String> for ChangeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for ChangeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for ChangeValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Ordered mapping from change name to desired value
///
/// Insertion order is preserved so that corrective commands are rendered
/// in the order the differences were detected. Inserting an existing key
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    entries: Vec<(String, ChangeValue)>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a change, replacing any earlier value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ChangeValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ChangeValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Change names in detection order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChangeValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = (&'a str, &'a ChangeValue);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order() {
        let mut changes = ChangeSet::new();
        changes.insert("IovEnabled", true);
        changes.insert("AllowManagementOS", false);
        changes.insert("NetAdapterName", "Ethernet");

        let names: Vec<&str> = changes.names().collect();
        assert_eq!(names, ["IovEnabled", "AllowManagementOS", "NetAdapterName"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut changes = ChangeSet::new();
        changes.insert("a", 1u64);
        changes.insert("b", 2u64);
        changes.insert("a", 3u64);

        assert_eq!(changes.len(), 2);
        assert_eq!(changes.names().next(), Some("a"));
        assert_eq!(changes.get("a").and_then(ChangeValue::as_number), Some(3));
    }

    #[test]
    fn test_value_accessors_are_typed() {
        let value = ChangeValue::from(vec!["LAN".to_string()]);
        assert_eq!(value.as_list(), Some(&["LAN".to_string()][..]));
        assert_eq!(value.as_bool(), None);
        assert_eq!(value.to_string(), "[LAN]");
    }
}
