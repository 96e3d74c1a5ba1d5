//! # Integer map
//!
//! Hash chains keyed by `i64` with a 64-bit integer mix (spec.md §3/§4.5
//! "Integer map"). No key copy is needed since `i64` is `Copy`, unlike the
//! string-keyed maps.

use crate::rt::{mix64, RtValue};

const INITIAL_BUCKETS: usize = 16;

pub struct IntMap {
    buckets: Vec<Vec<(i64, RtValue)>>,
    count: usize,
}

impl IntMap {
    pub fn new() -> Self {
        Self { buckets: vec![Vec::new(); INITIAL_BUCKETS], count: 0 }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn bucket_index(&self, key: i64, nbuckets: usize) -> usize {
        (mix64(key as u64) as usize) % nbuckets
    }

    pub fn get(&self, key: i64) -> Option<&RtValue> {
        let idx = self.bucket_index(key, self.buckets.len());
        self.buckets[idx].iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: i64) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: i64, value: RtValue) {
        self.maybe_resize();
        let idx = self.bucket_index(key, self.buckets.len());
        if let Some(slot) = self.buckets[idx].iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return;
        }
        self.buckets[idx].push((key, value));
        self.count += 1;
    }

    pub fn remove(&mut self, key: i64) -> Option<RtValue> {
        let idx = self.bucket_index(key, self.buckets.len());
        let bucket = &mut self.buckets[idx];
        let pos = bucket.iter().position(|(k, _)| *k == key)?;
        self.count -= 1;
        Some(bucket.remove(pos).1)
    }

    fn maybe_resize(&mut self) {
        if (self.count + 1) * 4 > self.buckets.len() * 3 {
            let new_count = self.buckets.len() * 2;
            let mut new_buckets: Vec<Vec<(i64, RtValue)>> = vec![Vec::new(); new_count];
            for bucket in self.buckets.drain(..) {
                for (k, v) in bucket {
                    let idx = (mix64(k as u64) as usize) % new_count;
                    new_buckets[idx].push((k, v));
                }
            }
            self.buckets = new_buckets;
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.buckets.iter().flatten().map(|(k, _)| *k)
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &RtValue)> {
        self.buckets.iter().flatten().map(|(k, v)| (*k, v))
    }
}

impl Default for IntMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_roundtrips() {
        let mut m = IntMap::new();
        m.insert(-5, RtValue::box_int(1));
        m.insert(1_000_000, RtValue::box_int(2));
        assert!(matches!(m.get(-5), Some(RtValue::Box(b)) if b.as_int() == Some(1)));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn grows_without_losing_entries() {
        let mut m = IntMap::new();
        for i in 0..200i64 {
            m.insert(i, RtValue::box_int(i));
        }
        for i in 0..200i64 {
            assert!(m.contains_key(i));
        }
    }
}
