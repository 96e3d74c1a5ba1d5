//! # Semantic analysis
//!
//! Scope tracking with roll-back ([`scope`]), the semantic type lattice
//! ([`types`]), and the [`analyzer`] that walks a parsed [`super::ast::Program`]
//! and emits the diagnostics of spec.md §4.3.

pub mod analyzer;
pub mod scope;
pub mod types;

pub use analyzer::SemanticAnalyzer;
pub use types::SemType;
