//! # Sorted (tree) map
//!
//! A dynamically resized array of entries kept sorted by key, with binary
//! search for lookup/floor/ceiling (spec.md §3/§4.5 "Sorted (tree) map").
//! Insert/remove are O(n) via a shift, matching the source; no attempt is
//! made to hide that behind a balanced-tree implementation, since the
//! testable properties (§8) only pin down order and lookup semantics, not
//! asymptotics.

use crate::rt::RtValue;

pub struct SortedMap {
    entries: Vec<(String, RtValue)>,
}

impl SortedMap {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn search(&self, key: &str) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.as_str().cmp(key))
    }

    pub fn get(&self, key: &str) -> Option<&RtValue> {
        self.search(key).ok().map(|i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.search(key).is_ok()
    }

    pub fn insert(&mut self, key: &str, value: RtValue) {
        match self.search(key) {
            Ok(i) => self.entries[i].1 = value,
            Err(i) => self.entries.insert(i, (key.to_string(), value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<RtValue> {
        let i = self.search(key).ok()?;
        Some(self.entries.remove(i).1)
    }

    /// Largest key <= `key`.
    pub fn floor(&self, key: &str) -> Option<(&str, &RtValue)> {
        match self.search(key) {
            Ok(i) => Some((&self.entries[i].0, &self.entries[i].1)),
            Err(0) => None,
            Err(i) => Some((&self.entries[i - 1].0, &self.entries[i - 1].1)),
        }
    }

    /// Smallest key >= `key`.
    pub fn ceil(&self, key: &str) -> Option<(&str, &RtValue)> {
        match self.search(key) {
            Ok(i) => Some((&self.entries[i].0, &self.entries[i].1)),
            Err(i) if i < self.entries.len() => Some((&self.entries[i].0, &self.entries[i].1)),
            Err(_) => None,
        }
    }

    pub fn first(&self) -> Option<(&str, &RtValue)> {
        self.entries.first().map(|(k, v)| (k.as_str(), v))
    }

    pub fn last(&self) -> Option<(&str, &RtValue)> {
        self.entries.last().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RtValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for SortedMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_stay_sorted_after_inserts() {
        let mut m = SortedMap::new();
        for k in ["m", "a", "z", "b"] {
            m.insert(k, RtValue::box_int(1));
        }
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["a", "b", "m", "z"]);
    }

    #[test]
    fn floor_and_ceil_bracket_a_missing_key() {
        let mut m = SortedMap::new();
        m.insert("b", RtValue::box_int(1));
        m.insert("d", RtValue::box_int(2));
        assert_eq!(m.floor("c").map(|(k, _)| k), Some("b"));
        assert_eq!(m.ceil("c").map(|(k, _)| k), Some("d"));
        assert_eq!(m.floor("a"), None);
        assert_eq!(m.ceil("e"), None);
    }

    #[test]
    fn first_and_last() {
        let mut m = SortedMap::new();
        m.insert("m", RtValue::box_int(1));
        m.insert("a", RtValue::box_int(2));
        m.insert("z", RtValue::box_int(3));
        assert_eq!(m.first().map(|(k, _)| k), Some("a"));
        assert_eq!(m.last().map(|(k, _)| k), Some("z"));
    }
}
