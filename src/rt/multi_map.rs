//! # Multi-map
//!
//! A string-keyed hash chain whose bucket values are sequences (spec.md
//! §3/§4.5 "Multi-map"). `get` always returns a fresh copy so callers can't
//! mutate the stored sequence through the returned handle; `get_first`
//! avoids that copy when only the head is needed.

use crate::rt::{fnv1a, RtValue, Seq};

const INITIAL_BUCKETS: usize = 16;

pub struct MultiMap {
    buckets: Vec<Vec<(String, Vec<RtValue>)>>,
    distinct_keys: usize,
    total_values: usize,
}

impl MultiMap {
    pub fn new() -> Self {
        Self { buckets: vec![Vec::new(); INITIAL_BUCKETS], distinct_keys: 0, total_values: 0 }
    }

    pub fn distinct_key_count(&self) -> usize {
        self.distinct_keys
    }

    pub fn total_value_count(&self) -> usize {
        self.total_values
    }

    fn bucket_index(&self, key: &str, nbuckets: usize) -> usize {
        (fnv1a(key.as_bytes()) as usize) % nbuckets
    }

    fn find_slot(&self, key: &str) -> Option<&(String, Vec<RtValue>)> {
        let idx = self.bucket_index(key, self.buckets.len());
        self.buckets[idx].iter().find(|(k, _)| k == key)
    }

    /// Appends `value` to `key`'s value sequence, creating it if absent.
    pub fn put(&mut self, key: &str, value: RtValue) {
        self.maybe_resize();
        let idx = self.bucket_index(key, self.buckets.len());
        if let Some(slot) = self.buckets[idx].iter_mut().find(|(k, _)| k == key) {
            slot.1.push(value);
        } else {
            self.buckets[idx].push((key.to_string(), vec![value]));
            self.distinct_keys += 1;
        }
        self.total_values += 1;
    }

    /// A fresh `Seq` copy of every value stored for `key`; empty (never
    /// null) when the key is absent, per spec.md §4.5 "Multi-map".
    pub fn get(&self, key: &str) -> Seq {
        let mut out = Seq::new();
        if let Some((_, values)) = self.find_slot(key) {
            for v in values {
                out.push(v.clone());
            }
        }
        out
    }

    pub fn get_first(&self, key: &str) -> Option<RtValue> {
        self.find_slot(key).and_then(|(_, values)| values.first().cloned())
    }

    pub fn remove_all(&mut self, key: &str) -> bool {
        let idx = self.bucket_index(key, self.buckets.len());
        let bucket = &mut self.buckets[idx];
        let Some(pos) = bucket.iter().position(|(k, _)| k == key) else {
            return false;
        };
        let (_, values) = bucket.remove(pos);
        self.distinct_keys -= 1;
        self.total_values -= values.len();
        true
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find_slot(key).is_some()
    }

    fn maybe_resize(&mut self) {
        if (self.distinct_keys + 1) * 4 > self.buckets.len() * 3 {
            let new_count = self.buckets.len() * 2;
            let mut new_buckets: Vec<Vec<(String, Vec<RtValue>)>> = vec![Vec::new(); new_count];
            for bucket in self.buckets.drain(..) {
                for (k, v) in bucket {
                    let idx = (fnv1a(k.as_bytes()) as usize) % new_count;
                    new_buckets[idx].push((k, v));
                }
            }
            self.buckets = new_buckets;
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().flatten().map(|(k, _)| k.as_str())
    }
}

impl Default for MultiMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_appends_and_tracks_counts_independently() {
        let mut m = MultiMap::new();
        m.put("a", RtValue::box_int(1));
        m.put("a", RtValue::box_int(2));
        m.put("b", RtValue::box_int(3));
        assert_eq!(m.distinct_key_count(), 2);
        assert_eq!(m.total_value_count(), 3);
        assert_eq!(m.get("a").len(), 2);
    }

    #[test]
    fn get_on_missing_key_is_empty_not_null() {
        let m = MultiMap::new();
        assert_eq!(m.get("missing").len(), 0);
    }

    #[test]
    fn get_first_returns_only_head() {
        let mut m = MultiMap::new();
        m.put("a", RtValue::box_int(10));
        m.put("a", RtValue::box_int(20));
        assert!(matches!(m.get_first("a"), Some(RtValue::Box(b)) if b.as_int() == Some(10)));
        assert!(m.get_first("missing").is_none());
    }

    #[test]
    fn remove_all_drops_the_key() {
        let mut m = MultiMap::new();
        m.put("a", RtValue::box_int(1));
        m.put("a", RtValue::box_int(2));
        assert!(m.remove_all("a"));
        assert_eq!(m.distinct_key_count(), 0);
        assert_eq!(m.total_value_count(), 0);
        assert!(!m.remove_all("a"));
    }
}
