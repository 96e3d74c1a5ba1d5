//! # Frozen map
//!
//! Open-addressed hash table built once from parallel key/value sequences;
//! no mutation after construction (spec.md §3/§4.5 "Frozen map"). Slot count
//! is sized to keep load factor under 50%, per spec.

use crate::rt::{fnv1a, RtValue};

pub struct FrozenMap {
    slots: Vec<Option<(String, RtValue)>>,
    len: usize,
}

impl FrozenMap {
    /// Builds a frozen map from parallel `keys`/`values`; later duplicate
    /// keys overwrite earlier ones, matching ordinary map construction
    /// semantics. Panics if the two slices differ in length.
    pub fn build(keys: &[String], values: &[RtValue]) -> Self {
        assert_eq!(keys.len(), values.len(), "FrozenMap::build: keys/values length mismatch");

        let distinct = {
            let mut seen: Vec<&str> = Vec::new();
            for k in keys {
                if !seen.contains(&k.as_str()) {
                    seen.push(k.as_str());
                }
            }
            seen.len()
        };
        let mut slot_count = 1usize;
        while slot_count < distinct * 2 || slot_count == 0 {
            slot_count = (slot_count * 2).max(4);
        }

        let mut slots: Vec<Option<(String, RtValue)>> = (0..slot_count).map(|_| None).collect();
        let mut len = 0;
        for (k, v) in keys.iter().zip(values.iter()) {
            let mut idx = (fnv1a(k.as_bytes()) as usize) % slot_count;
            loop {
                match &slots[idx] {
                    Some((existing, _)) if existing == k => {
                        slots[idx] = Some((k.clone(), v.clone()));
                        break;
                    }
                    Some(_) => idx = (idx + 1) % slot_count,
                    None => {
                        slots[idx] = Some((k.clone(), v.clone()));
                        len += 1;
                        break;
                    }
                }
            }
        }
        Self { slots, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, key: &str) -> Option<&RtValue> {
        if self.slots.is_empty() {
            return None;
        }
        let slot_count = self.slots.len();
        let mut idx = (fnv1a(key.as_bytes()) as usize) % slot_count;
        for _ in 0..slot_count {
            match &self.slots[idx] {
                Some((k, v)) if k == key => return Some(v),
                Some(_) => idx = (idx + 1) % slot_count,
                None => return None,
            }
        }
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|s| s.as_ref().map(|(k, _)| k.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RtValue)> {
        self.slots.iter().filter_map(|s| s.as_ref().map(|(k, v)| (k.as_str(), v)))
    }

    /// Structural equality of two frozen maps: same set of keys, and
    /// `crate::rt::rt_eq`-equal values for each (spec.md §8 scenario 6).
    pub fn equals(a: &FrozenMap, b: &FrozenMap) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.iter().all(|(k, v)| b.get(k).is_some_and(|bv| crate::rt::rt_eq(v, bv)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_ab() -> FrozenMap {
        FrozenMap::build(
            &["a".to_string(), "b".to_string()],
            &[RtValue::box_int(1), RtValue::box_int(2)],
        )
    }

    #[test]
    fn get_returns_constructed_values() {
        let m = build_ab();
        assert!(matches!(m.get("a"), Some(RtValue::Box(b)) if b.as_int() == Some(1)));
        assert!(matches!(m.get("b"), Some(RtValue::Box(b)) if b.as_int() == Some(2)));
        assert!(m.get("c").is_none());
    }

    #[test]
    fn equals_is_order_independent() {
        let a = build_ab();
        let b = FrozenMap::build(
            &["b".to_string(), "a".to_string()],
            &[RtValue::box_int(2), RtValue::box_int(1)],
        );
        assert!(FrozenMap::equals(&a, &b));
    }

    #[test]
    fn load_factor_stays_under_half() {
        let keys: Vec<String> = (0..40).map(|i| format!("k{i}")).collect();
        let values: Vec<RtValue> = (0..40).map(RtValue::box_int).collect();
        let m = FrozenMap::build(&keys, &values);
        assert!(m.len() as f64 / m.slots.len() as f64 < 0.5);
        for i in 0..40 {
            assert!(m.contains_key(&format!("k{i}")));
        }
    }
}
