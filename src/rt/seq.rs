//! # Sequence
//!
//! The dynamic array of boxed/heap element handles (spec.md §3/§4.5
//! "Sequence"). Capacity starts at 16 and doubles on overflow; when
//! `owns_elements` is set, ownership transfer on `push`/`set`/`clear` is the
//! caller's responsibility in the source's retain/release sense, but in this
//! port ownership transfer *is* Rust's move semantics — see [`crate::rt`]'s
//! module doc for why there is no separate `push_raw`.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::rt::{rng::Rng, ClassId, RtValue};

const INITIAL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct Seq {
    items: Vec<RtValue>,
    /// When set, the sequence is considered to own its elements for the
    /// purposes of spec.md's retain/release bookkeeping. Rust's `Drop`
    /// already releases every element regardless of this flag; it is kept
    /// as data (not behavior) so code mirroring the source's ownership
    /// contract can still inspect it.
    owns_elements: bool,
}

impl Seq {
    pub fn new() -> Self {
        Self::with_owns(true)
    }

    pub fn with_owns(owns_elements: bool) -> Self {
        Self { items: Vec::with_capacity(INITIAL_CAPACITY), owns_elements }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn owns_elements(&self) -> bool {
        self.owns_elements
    }

    pub fn class_id(&self) -> ClassId {
        ClassId::Seq
    }

    fn grow_for_one_more(&mut self) {
        if self.items.len() == self.items.capacity() {
            let new_cap = (self.items.capacity().max(INITIAL_CAPACITY / 2)) * 2;
            let additional = new_cap - self.items.len();
            self.items.reserve_exact(additional);
        }
    }

    pub fn push(&mut self, val: RtValue) {
        self.grow_for_one_more();
        self.items.push(val);
    }

    pub fn pop(&mut self) -> RtValue {
        self.items.pop().unwrap_or_else(|| panic!("Seq.Pop: sequence is empty"))
    }

    pub fn try_pop(&mut self) -> Option<RtValue> {
        self.items.pop()
    }

    pub fn get(&self, idx: i64) -> RtValue {
        self.bounds_check(idx, "Seq.Get");
        self.items[idx as usize].clone()
    }

    pub fn set(&mut self, idx: i64, val: RtValue) {
        self.bounds_check(idx, "Seq.Set");
        self.items[idx as usize] = val;
    }

    pub fn insert(&mut self, idx: i64, val: RtValue) {
        if idx < 0 || idx as usize > self.items.len() {
            panic!("Seq.Insert: index out of bounds");
        }
        self.grow_for_one_more();
        self.items.insert(idx as usize, val);
    }

    pub fn remove(&mut self, idx: i64) -> RtValue {
        self.bounds_check(idx, "Seq.Remove");
        self.items.remove(idx as usize)
    }

    fn bounds_check(&self, idx: i64, op: &str) {
        if idx < 0 || idx as usize >= self.items.len() {
            panic!("{op}: index out of bounds");
        }
    }

    /// Appends every element of `other`, snapshotting `other`'s length up
    /// front so `seq.push_all(seq.clone())`-style self-append (two handles
    /// to the same backing data) still copies exactly the original
    /// elements rather than looping.
    pub fn push_all(&mut self, other: &Seq) {
        let n = other.items.len();
        for i in 0..n {
            self.push(other.items[i].clone());
        }
    }

    pub fn slice(&self, start: i64, end: i64) -> Seq {
        let len = self.items.len() as i64;
        let start = start.clamp(0, len) as usize;
        let end = end.clamp(0, len).max(start as i64) as usize;
        let mut out = Seq::with_owns(self.owns_elements);
        for v in &self.items[start..end] {
            out.push(v.clone());
        }
        out
    }

    pub fn clone_seq(&self) -> Seq {
        self.slice(0, self.items.len() as i64)
    }

    pub fn reverse(&mut self) {
        self.items.reverse();
    }

    /// Fisher-Yates shuffle, last index down to 1, driven by `rng` so
    /// re-seeding the same `Rng` reproduces the same permutation.
    pub fn shuffle(&mut self, rng: &mut Rng) {
        let n = self.items.len();
        for i in (1..n).rev() {
            let j = rng.below((i + 1) as u32) as usize;
            self.items.swap(i, j);
        }
    }

    pub fn sort(&mut self) {
        self.items.sort_by(cmp_rt);
    }

    pub fn sort_desc(&mut self) {
        self.items.sort_by(|a, b| cmp_rt(b, a));
    }

    pub fn sort_by(&mut self, mut cmp: impl FnMut(&RtValue, &RtValue) -> Ordering) {
        self.items.sort_by(|a, b| cmp(a, b));
    }

    pub fn keep(&self, mut pred: impl FnMut(&RtValue) -> bool) -> Seq {
        let mut out = Seq::with_owns(self.owns_elements);
        for v in &self.items {
            if pred(v) {
                out.push(v.clone());
            }
        }
        out
    }

    pub fn reject(&self, mut pred: impl FnMut(&RtValue) -> bool) -> Seq {
        self.keep(|v| !pred(v))
    }

    pub fn apply(&self, mut f: impl FnMut(&RtValue) -> RtValue) -> Seq {
        let mut out = Seq::with_owns(self.owns_elements);
        for v in &self.items {
            out.push(f(v));
        }
        out
    }

    pub fn all(&self, mut pred: impl FnMut(&RtValue) -> bool) -> bool {
        self.items.iter().all(|v| pred(v))
    }

    pub fn any(&self, mut pred: impl FnMut(&RtValue) -> bool) -> bool {
        self.items.iter().any(|v| pred(v))
    }

    pub fn none(&self, mut pred: impl FnMut(&RtValue) -> bool) -> bool {
        !self.any(&mut pred)
    }

    pub fn count_where(&self, mut pred: impl FnMut(&RtValue) -> bool) -> usize {
        self.items.iter().filter(|v| pred(v)).count()
    }

    pub fn find_where(&self, mut pred: impl FnMut(&RtValue) -> bool) -> Option<RtValue> {
        self.items.iter().find(|v| pred(v)).cloned()
    }

    pub fn take(&self, n: usize) -> Seq {
        self.slice(0, n.min(self.items.len()) as i64)
    }

    pub fn drop(&self, n: usize) -> Seq {
        self.slice(n as i64, self.items.len() as i64)
    }

    pub fn take_while(&self, mut pred: impl FnMut(&RtValue) -> bool) -> Seq {
        let mut out = Seq::with_owns(self.owns_elements);
        for v in &self.items {
            if !pred(v) {
                break;
            }
            out.push(v.clone());
        }
        out
    }

    pub fn drop_while(&self, mut pred: impl FnMut(&RtValue) -> bool) -> Seq {
        let mut idx = 0;
        for v in &self.items {
            if !pred(v) {
                break;
            }
            idx += 1;
        }
        self.slice(idx as i64, self.items.len() as i64)
    }

    pub fn fold(&self, init: RtValue, mut f: impl FnMut(RtValue, &RtValue) -> RtValue) -> RtValue {
        let mut acc = init;
        for v in &self.items {
            acc = f(acc, v);
        }
        acc
    }

    pub fn iter(&self) -> impl Iterator<Item = &RtValue> {
        self.items.iter()
    }

    pub fn into_rc(self) -> Rc<std::cell::RefCell<Seq>> {
        Rc::new(std::cell::RefCell::new(self))
    }
}

impl Default for Seq {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<RtValue> for Seq {
    fn from_iter<I: IntoIterator<Item = RtValue>>(iter: I) -> Self {
        let mut out = Seq::new();
        for v in iter {
            out.push(v);
        }
        out
    }
}

/// Default total order across heterogeneous `RtValue`s: numeric kinds
/// compare numerically, strings lexicographically by byte, and values of
/// different kinds fall back to ordering by `ClassId` so `sort()` on a
/// non-homogeneous sequence is still a well-defined (if arbitrary) total
/// order rather than a panic.
fn cmp_rt(a: &RtValue, b: &RtValue) -> Ordering {
    use RtValue::*;
    match (a, b) {
        (Box(x), Box(y)) => match (x.as_ref(), y.as_ref()) {
            (crate::rt::Boxed::Int(i), crate::rt::Boxed::Int(j)) => i.cmp(j),
            (crate::rt::Boxed::Float(i), crate::rt::Boxed::Float(j)) => {
                i.partial_cmp(j).unwrap_or(Ordering::Equal)
            }
            (crate::rt::Boxed::Bool(i), crate::rt::Boxed::Bool(j)) => i.cmp(j),
            _ => a.class_of_key().cmp(&b.class_of_key()),
        },
        (Str(x), Str(y)) => x.0.cmp(&y.0),
        _ => a.class_of_key().cmp(&b.class_of_key()),
    }
}

impl RtValue {
    fn class_of_key(&self) -> u8 {
        self.class_of() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_then_pop_roundtrips() {
        let mut s = Seq::new();
        s.push(RtValue::box_int(1));
        s.push(RtValue::box_int(2));
        assert_eq!(s.len(), 2);
        let v = s.pop();
        assert!(matches!(v, RtValue::Box(b) if b.as_int() == Some(2)));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn capacity_doubles_on_overflow() {
        let mut s = Seq::new();
        assert_eq!(s.capacity(), 16);
        for i in 0..16 {
            s.push(RtValue::box_int(i));
        }
        let cap_before = s.capacity();
        s.push(RtValue::box_int(99));
        assert!(s.capacity() >= cap_before * 2 - 1);
        assert!(s.len() <= s.capacity());
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn get_out_of_bounds_traps() {
        let s = Seq::new();
        s.get(0);
    }

    #[test]
    #[should_panic(expected = "Seq.Pop: sequence is empty")]
    fn pop_empty_traps() {
        let mut s = Seq::new();
        s.pop();
    }

    #[test]
    fn push_all_handles_self_append_snapshot() {
        let mut s = Seq::new();
        s.push(RtValue::box_int(1));
        s.push(RtValue::box_int(2));
        let snapshot = s.clone_seq();
        s.push_all(&snapshot);
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn reverse_twice_is_identity() {
        let mut s: Seq = (0..5).map(RtValue::box_int).collect();
        let original = s.clone_seq();
        s.reverse();
        s.reverse();
        for i in 0..5 {
            assert!(matches!((s.get(i as i64), original.get(i as i64)),
                (RtValue::Box(a), RtValue::Box(b)) if a.as_int() == b.as_int()));
        }
    }

    #[test]
    fn sort_is_stable_and_idempotent_on_sorted_input() {
        let mut s: Seq = [3, 1, 2, 1].into_iter().map(RtValue::box_int).collect();
        s.sort();
        let values: Vec<i64> = s.iter().map(|v| match v {
            RtValue::Box(b) => b.as_int().unwrap(),
            _ => unreachable!(),
        }).collect();
        assert_eq!(values, vec![1, 1, 2, 3]);
        let before = values.clone();
        s.sort();
        let after: Vec<i64> = s.iter().map(|v| match v {
            RtValue::Box(b) => b.as_int().unwrap(),
            _ => unreachable!(),
        }).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn shuffle_is_deterministic_for_same_seed() {
        let mut a: Seq = (0..10).map(RtValue::box_int).collect();
        let mut b: Seq = (0..10).map(RtValue::box_int).collect();
        a.shuffle(&mut Rng::new(1234));
        b.shuffle(&mut Rng::new(1234));
        for i in 0..10 {
            assert!(matches!((a.get(i), b.get(i)),
                (RtValue::Box(x), RtValue::Box(y)) if x.as_int() == y.as_int()));
        }
    }

    #[test]
    fn functional_helpers() {
        let s: Seq = (0..10).map(RtValue::box_int).collect();
        let evens = s.keep(|v| matches!(v, RtValue::Box(b) if b.as_int().unwrap() % 2 == 0));
        assert_eq!(evens.len(), 5);
        assert!(s.any(|v| matches!(v, RtValue::Box(b) if b.as_int() == Some(9))));
        assert!(s.none(|v| matches!(v, RtValue::Box(b) if b.as_int() == Some(99))));
        assert_eq!(s.count_where(|v| matches!(v, RtValue::Box(b) if b.as_int().unwrap() < 3)), 3);
        let sum = s.fold(RtValue::box_int(0), |acc, v| match (acc, v) {
            (RtValue::Box(a), RtValue::Box(b)) => RtValue::box_int(a.as_int().unwrap() + b.as_int().unwrap()),
            _ => unreachable!(),
        });
        assert!(matches!(sum, RtValue::Box(b) if b.as_int() == Some(45)));
    }
}
