//! # Boxed primitives
//!
//! `Boxed` wraps an `i64`, `f64`, or `bool` behind a tag so sequences can
//! carry heterogeneous primitives while maps/sets still compare by content
//! (spec.md §3 "Box", §4.5). The tag is the enum discriminant itself rather
//! than a hand-rolled byte field — Rust's tagged union already is the "tag
//! byte distinct from the string magic marker" the source needs a manual
//! field for.

use std::rc::Rc;

use crate::rt::{mix64, ClassId};

#[derive(Debug, Clone, Copy)]
pub enum Boxed {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Boxed {
    pub fn int(v: i64) -> Rc<Self> {
        Rc::new(Boxed::Int(v))
    }

    pub fn float(v: f64) -> Rc<Self> {
        Rc::new(Boxed::Float(v))
    }

    pub fn boolean(v: bool) -> Rc<Self> {
        Rc::new(Boxed::Bool(v))
    }

    pub fn class_id(&self) -> ClassId {
        match self {
            Boxed::Int(_) => ClassId::BoxInt,
            Boxed::Float(_) => ClassId::BoxFloat,
            Boxed::Bool(_) => ClassId::BoxBool,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Boxed::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Boxed::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Boxed::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Value equality within the same kind; a boxed int never equals a
    /// boxed float even at the same numeric value (spec.md §4.5 dispatches
    /// "on box tag", not on numeric value after coercion).
    pub fn content_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Boxed::Int(a), Boxed::Int(b)) => a == b,
            (Boxed::Float(a), Boxed::Float(b)) => a.to_bits() == b.to_bits(),
            (Boxed::Bool(a), Boxed::Bool(b)) => a == b,
            _ => false,
        }
    }

    pub fn content_hash(&self) -> u64 {
        match self {
            Boxed::Int(v) => mix64(*v as u64),
            Boxed::Float(v) => mix64(v.to_bits()),
            Boxed::Bool(v) => mix64(*v as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_kinds_never_content_equal() {
        let i = Boxed::Int(1);
        let b = Boxed::Bool(true);
        assert!(!i.content_eq(&b));
    }

    #[test]
    fn float_content_eq_is_bitwise() {
        assert!(!Boxed::Float(0.0).content_eq(&Boxed::Float(-0.0)));
        assert!(Boxed::Float(f64::NAN).content_eq(&Boxed::Float(f64::NAN)));
    }
}
