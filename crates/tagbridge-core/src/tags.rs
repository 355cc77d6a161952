//! The in-memory tag model.
//!
//! A [`TagMap`] is the typed form of one file's metadata: a mapping from a
//! case-normalized key (`"ARTIST"`, `"TITLE"`, ...) to one or more text
//! values. Keys are uppercased on insert, following the property-map
//! convention of the underlying tag formats. The flat wire representation
//! exchanged across the call boundary lives in [`crate::rows`].

use std::collections::BTreeMap;

/// Multi-valued tag mapping for one audio file.
///
/// Invariant: a key present in the map has at least one value. Callers
/// express "delete this key" through the write path's empty value segment
/// (see [`crate::merge`]), never by storing an empty value list;
/// [`TagMap::set`] with an empty list removes the key instead.
///
/// Key order is not semantically meaningful, but iteration is sorted so
/// that encoding the same map always produces the same row sequence.
/// Value order within a key is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    entries: BTreeMap<String, Vec<String>>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of (key, value) pairs, i.e. the row count of the encoded form.
    pub fn value_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Get the values stored under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(&normalize(key)).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize(key))
    }

    /// Replace the value list for `key`. An empty list removes the key,
    /// preserving the at-least-one-value invariant.
    pub fn set(&mut self, key: &str, values: Vec<String>) {
        let key = normalize(key);
        if values.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, values);
        }
    }

    /// Append one value to `key`, creating the entry if absent.
    pub fn push_value(&mut self, key: &str, value: String) {
        self.entries.entry(normalize(key)).or_default().push(value);
    }

    /// Remove `key` entirely, returning its values if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.entries.remove(&normalize(key))
    }

    /// Iterate entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

/// Case-normalize a tag key. The empty key is legal and passes through.
fn normalize(key: &str) -> String {
    key.to_uppercase()
}
