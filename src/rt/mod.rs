//! # Boxed-value collection runtime
//!
//! The reference-counted containers a lowered BASIC program targets at run
//! time (spec.md §3/§4.5): a dynamic [`seq::Seq`], three string-keyed map
//! variants plus an integer-keyed and a multi-valued one, a content-equal
//! [`set::Set`], and the [`boxed::Boxed`] primitive wrapper that lets them
//! all compare scalars by value.
//!
//! **Reference counting vs. GC (spec.md §9 design note).** The source models
//! every heap object with an explicit header (class id, refcount, optional
//! finalizer) and manual retain/release. Rust's `Rc<T>` *is* that header:
//! cloning an `Rc` is retain, dropping the last handle runs `T`'s `Drop` impl
//! as the finalizer, and the count is non-atomic because — as spec.md §5
//! requires — this runtime is single-threaded. Containers therefore hold
//! their elements as `RtValue`, whose heap-backed variants (`Str`, `Seq`, the
//! map/set variants) are themselves `Rc`-wrapped; there is no separate
//! hand-rolled header struct, and no unsafe code.
//!
//! Every container module exposes a small free-function API
//! (`rt_seq_push`, `rt_map_get`, ...) alongside the Rust-idiomatic inherent
//! methods, so that a lowering pass emitting IL `call @rt_seq_push(...)`
//! instructions has a 1:1 target without needing an FFI shim.

pub mod boxed;
pub mod frozen_map;
pub mod hash_map;
pub mod int_map;
pub mod multi_map;
pub mod ordered_map;
pub mod rng;
pub mod seq;
pub mod set;
pub mod sorted_map;

use std::rc::Rc;

pub use boxed::Boxed;
pub use frozen_map::FrozenMap;
pub use hash_map::HashMap;
pub use int_map::IntMap;
pub use multi_map::MultiMap;
pub use ordered_map::OrderedMap;
pub use seq::Seq;
pub use set::Set;
pub use sorted_map::SortedMap;

use std::cell::RefCell;

/// Class id used for `rt_class_of` introspection and the set/map hash
/// dispatch of spec.md §4.5. A closed tag, not an open `u32` like the
/// source's `g_classIds` table: every runtime type this crate defines has a
/// variant here, and there are no user-defined heap classes in scope (§1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassId {
    Null,
    BoxInt,
    BoxFloat,
    BoxBool,
    Str,
    Seq,
    HashMap,
    OrderedMap,
    SortedMap,
    FrozenMap,
    IntMap,
    MultiMap,
    Set,
}

/// An owned, immutable byte string, the runtime's `Str` heap object.
///
/// Kept as its own type rather than a bare `Rc<[u8]>` so `class_of` and the
/// set/map content hash can distinguish it from a `Boxed::Int`/`Boxed::Float`
/// tag byte wearing the same `Rc` shape (spec.md §4.5 "Box": "a tag ... so
/// the collection equality/hash helpers can compare boxed primitives by
/// value while falling back to pointer identity for non-boxed references").
#[derive(Debug, PartialEq, Eq)]
pub struct RtStr(pub Vec<u8>);

impl RtStr {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Rc<Self> {
        Rc::new(RtStr(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Any value a [`seq::Seq`], map, or [`set::Set`] may hold: either a boxed
/// primitive / string compared by content, or a handle to another heap
/// container compared by identity (spec.md §4.5 "Set": `hash`/`equal`
/// dispatch on box tag, falling back to pointer identity otherwise).
#[derive(Debug, Clone)]
pub enum RtValue {
    Null,
    Box(Rc<Boxed>),
    Str(Rc<RtStr>),
    Seq(Rc<RefCell<Seq>>),
    HashMap(Rc<RefCell<HashMap>>),
    OrderedMap(Rc<RefCell<OrderedMap>>),
    SortedMap(Rc<RefCell<SortedMap>>),
    FrozenMap(Rc<FrozenMap>),
    IntMap(Rc<RefCell<IntMap>>),
    MultiMap(Rc<RefCell<MultiMap>>),
    Set(Rc<RefCell<Set>>),
}

impl RtValue {
    pub fn box_int(v: i64) -> Self {
        RtValue::Box(Boxed::int(v))
    }

    pub fn box_float(v: f64) -> Self {
        RtValue::Box(Boxed::float(v))
    }

    pub fn box_bool(v: bool) -> Self {
        RtValue::Box(Boxed::boolean(v))
    }

    pub fn str(bytes: impl Into<Vec<u8>>) -> Self {
        RtValue::Str(RtStr::new(bytes))
    }

    pub fn class_of(&self) -> ClassId {
        match self {
            RtValue::Null => ClassId::Null,
            RtValue::Box(b) => b.class_id(),
            RtValue::Str(_) => ClassId::Str,
            RtValue::Seq(_) => ClassId::Seq,
            RtValue::HashMap(_) => ClassId::HashMap,
            RtValue::OrderedMap(_) => ClassId::OrderedMap,
            RtValue::SortedMap(_) => ClassId::SortedMap,
            RtValue::FrozenMap(_) => ClassId::FrozenMap,
            RtValue::IntMap(_) => ClassId::IntMap,
            RtValue::MultiMap(_) => ClassId::MultiMap,
            RtValue::Set(_) => ClassId::Set,
        }
    }

    /// `true` for `Null` and any `Box`/`Str`, which compare and hash by
    /// content rather than by heap identity.
    pub fn is_content_comparable(&self) -> bool {
        matches!(self, RtValue::Null | RtValue::Box(_) | RtValue::Str(_))
    }
}

/// Content-aware equality (spec.md §3 "Content-aware equality", §4.5
/// "Set"). Two boxed primitives or strings of the *same* kind compare by
/// value; anything else — including a `Box`/`Str` compared against a
/// container handle, or two container handles of the same kind — compares
/// by pointer identity.
pub fn rt_eq(a: &RtValue, b: &RtValue) -> bool {
    match (a, b) {
        (RtValue::Null, RtValue::Null) => true,
        (RtValue::Box(x), RtValue::Box(y)) => x.content_eq(y),
        (RtValue::Str(x), RtValue::Str(y)) => x.0 == y.0,
        (RtValue::Seq(x), RtValue::Seq(y)) => Rc::ptr_eq(x, y),
        (RtValue::HashMap(x), RtValue::HashMap(y)) => Rc::ptr_eq(x, y),
        (RtValue::OrderedMap(x), RtValue::OrderedMap(y)) => Rc::ptr_eq(x, y),
        (RtValue::SortedMap(x), RtValue::SortedMap(y)) => Rc::ptr_eq(x, y),
        (RtValue::FrozenMap(x), RtValue::FrozenMap(y)) => Rc::ptr_eq(x, y),
        (RtValue::IntMap(x), RtValue::IntMap(y)) => Rc::ptr_eq(x, y),
        (RtValue::MultiMap(x), RtValue::MultiMap(y)) => Rc::ptr_eq(x, y),
        (RtValue::Set(x), RtValue::Set(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

/// Content-aware hash, the `hash(v)` of spec.md §4.5 "Set": FNV-1a over
/// string bytes, a 64-bit bit mix for boxed integers/floats/bools, and a
/// pointer-derived value (stable for the object's lifetime, per
/// `Rc::as_ptr`) for anything else.
pub fn rt_hash(v: &RtValue) -> u64 {
    match v {
        RtValue::Null => 0,
        RtValue::Box(b) => b.content_hash(),
        RtValue::Str(s) => fnv1a(&s.0),
        RtValue::Seq(x) => ptr_hash(Rc::as_ptr(x) as usize),
        RtValue::HashMap(x) => ptr_hash(Rc::as_ptr(x) as usize),
        RtValue::OrderedMap(x) => ptr_hash(Rc::as_ptr(x) as usize),
        RtValue::SortedMap(x) => ptr_hash(Rc::as_ptr(x) as usize),
        RtValue::FrozenMap(x) => ptr_hash(Rc::as_ptr(x) as usize),
        RtValue::IntMap(x) => ptr_hash(Rc::as_ptr(x) as usize),
        RtValue::MultiMap(x) => ptr_hash(Rc::as_ptr(x) as usize),
        RtValue::Set(x) => ptr_hash(Rc::as_ptr(x) as usize),
    }
}

/// The 64-bit FNV-1a hash (spec.md glossary), shared by the string-keyed
/// map, the set, and `Boxed`'s own `Str`-adjacent dispatch.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// 64-bit mix used for integer keys (`IntMap`) and pointer-identity hashing
/// (splitmix64's finalizer; avalanches well without a multiply-by-prime
/// table).
pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58476d1ce4e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d049bb133111eb);
    x ^= x >> 31;
    x
}

fn ptr_hash(addr: usize) -> u64 {
    mix64(addr as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_ints_compare_by_content() {
        let a = RtValue::box_int(42);
        let b = RtValue::box_int(42);
        assert!(rt_eq(&a, &b));
        assert_eq!(rt_hash(&a), rt_hash(&b));
    }

    #[test]
    fn strings_compare_by_content() {
        let a = RtValue::str(*b"hi");
        let b = RtValue::str(*b"hi");
        assert!(rt_eq(&a, &b));
    }

    #[test]
    fn sequences_compare_by_identity() {
        let s1 = RtValue::Seq(Rc::new(RefCell::new(Seq::new())));
        let s2 = RtValue::Seq(Rc::new(RefCell::new(Seq::new())));
        assert!(!rt_eq(&s1, &s2));
        let s1_clone = s1.clone();
        assert!(rt_eq(&s1, &s1_clone));
    }
}
