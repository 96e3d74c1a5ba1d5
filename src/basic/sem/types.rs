//! # Semantic type lattice
//!
//! The small, closed type set the analyzer reasons over (spec.md §4.3). This
//! is deliberately coarser than the IL's type set: `Int`/`Float` fold over
//! every BASIC numeric width, and `ArrayInt` models the one array element
//! type this dialect's DIM/REDIM supports.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemType {
    Int,
    Float,
    String,
    Bool,
    ArrayInt,
    Unknown,
}

impl SemType {
    pub fn is_numeric(self) -> bool {
        matches!(self, SemType::Int | SemType::Float)
    }

    /// Default type driven by a BASIC type-suffix sigil: `$` -> String,
    /// `#`/`!` -> Float, `%`/`&` -> Int, otherwise Int (spec.md §4.3).
    pub fn from_suffix(name: &str) -> SemType {
        match name.chars().last() {
            Some('$') => SemType::String,
            Some('#') | Some('!') => SemType::Float,
            Some('%') | Some('&') => SemType::Int,
            _ => SemType::Int,
        }
    }
}

impl fmt::Display for SemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SemType::Int => "Int",
            SemType::Float => "Float",
            SemType::String => "String",
            SemType::Bool => "Bool",
            SemType::ArrayInt => "ArrayInt",
            SemType::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

/// `Float` if either side is `Float`, else `Int` (spec.md §4.3).
pub fn common_numeric_type(a: SemType, b: SemType) -> SemType {
    if a == SemType::Float || b == SemType::Float {
        SemType::Float
    } else {
        SemType::Int
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_drives_default_type() {
        assert_eq!(SemType::from_suffix("NAME$"), SemType::String);
        assert_eq!(SemType::from_suffix("X#"), SemType::Float);
        assert_eq!(SemType::from_suffix("COUNT%"), SemType::Int);
        assert_eq!(SemType::from_suffix("PLAIN"), SemType::Int);
    }

    #[test]
    fn common_numeric_type_prefers_float() {
        assert_eq!(common_numeric_type(SemType::Int, SemType::Float), SemType::Float);
        assert_eq!(common_numeric_type(SemType::Int, SemType::Int), SemType::Int);
    }
}
