//! # Hash map (string-keyed)
//!
//! Bucket array with separate chaining, FNV-1a over key bytes, and a 3/4
//! load-factor resize threshold (spec.md §3/§4.5 "Hash map"). Built by hand
//! rather than wrapping `std::collections::HashMap` because the source's
//! retain/release contract ("keys copied to heap; values retained") and the
//! exact resize policy are themselves part of what this crate models, not
//! incidental to it.

use crate::rt::{fnv1a, RtValue};

const INITIAL_BUCKETS: usize = 16;

pub struct HashMap {
    buckets: Vec<Vec<(String, RtValue)>>,
    count: usize,
}

impl HashMap {
    pub fn new() -> Self {
        Self { buckets: vec![Vec::new(); INITIAL_BUCKETS], count: 0 }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn bucket_index(&self, key: &str) -> usize {
        (fnv1a(key.as_bytes()) as usize) % self.buckets.len()
    }

    pub fn get(&self, key: &str) -> Option<&RtValue> {
        let idx = self.bucket_index(key);
        self.buckets[idx].iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or overwrites `key`; overwriting releases (drops) the old
    /// value before the new one takes its place.
    pub fn set(&mut self, key: &str, value: RtValue) {
        self.maybe_resize();
        let idx = self.bucket_index(key);
        if let Some(slot) = self.buckets[idx].iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
            return;
        }
        self.buckets[idx].push((key.to_string(), value));
        self.count += 1;
    }

    pub fn remove(&mut self, key: &str) -> Option<RtValue> {
        let idx = self.bucket_index(key);
        let bucket = &mut self.buckets[idx];
        let pos = bucket.iter().position(|(k, _)| k == key)?;
        self.count -= 1;
        Some(bucket.remove(pos).1)
    }

    fn maybe_resize(&mut self) {
        if (self.count + 1) * 4 > self.buckets.len() * 3 {
            let new_count = self.buckets.len() * 2;
            let mut new_buckets: Vec<Vec<(String, RtValue)>> = vec![Vec::new(); new_count];
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

    pub fn values(&self) -> impl Iterator<Item = &RtValue> {
        self.buckets.iter().flatten().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RtValue)> {
        self.buckets.iter().flatten().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for HashMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let mut m = HashMap::new();
        m.set("a", RtValue::box_int(1));
        m.set("b", RtValue::box_int(2));
        assert!(matches!(m.get("a"), Some(RtValue::Box(b)) if b.as_int() == Some(1)));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn overwrite_replaces_value_without_growing_count() {
        let mut m = HashMap::new();
        m.set("a", RtValue::box_int(1));
        m.set("a", RtValue::box_int(2));
        assert_eq!(m.len(), 1);
        assert!(matches!(m.get("a"), Some(RtValue::Box(b)) if b.as_int() == Some(2)));
    }

    #[test]
    fn grows_past_load_factor_without_losing_entries() {
        let mut m = HashMap::new();
        for i in 0..100 {
            m.set(&format!("k{i}"), RtValue::box_int(i));
        }
        assert_eq!(m.len(), 100);
        for i in 0..100 {
            assert!(m.contains_key(&format!("k{i}")));
        }
    }

    #[test]
    fn remove_drops_entry() {
        let mut m = HashMap::new();
        m.set("a", RtValue::box_int(1));
        assert!(m.remove("a").is_some());
        assert!(m.get("a").is_none());
        assert_eq!(m.len(), 0);
    }
}
