//! # BASIC front end
//!
//! Lexer, AST, parser, and semantic analyzer for the BASIC dialect described
//! in spec.md §2 L2. [`lexer`] turns source text into a [`token`] stream,
//! [`parser`] turns that stream into an [`ast::Program`], and [`sem`]
//! annotates the program with types and diagnoses scope/control-flow errors.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod sem;
pub mod token;

pub use ast::Program;
pub use parser::Parser;
pub use sem::analyzer::SemanticAnalyzer;
