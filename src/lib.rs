//! # ilbc
//!
//! A BASIC → IL compiler front end, the IL's textual codec, and the boxed-
//! value collection runtime the compiled programs target.
//!
//! ## Pipeline
//!
//! 1. [`source`] registers source text and renders caret diagnostics.
//! 2. [`basic::lexer`] tokenizes BASIC source.
//! 3. [`basic::parser`] parses the token stream into a [`basic::ast::Program`].
//! 4. [`basic::sem::analyzer`] type-checks and scope-resolves the program.
//! 5. AST → IL lowering is a separate pass, out of scope for this crate.
//! 6. [`il::parser`]/[`il::printer`] are the textual codec for the IL that a
//!    lowering pass (or a hand-written test fixture) produces.
//! 7. [`rt`] is the reference-counted collection runtime a lowered program's
//!    array/map/set operations target at run time.
//!
//! ## Example
//!
//! ```rust
//! use ilbc::basic::lexer::Lexer;
//! use ilbc::basic::parser::parse_program;
//! use ilbc::basic::sem::analyzer::SemanticAnalyzer;
//! use ilbc::diag::DiagnosticEmitter;
//! use ilbc::source::FileId;
//!
//! let source = "10 LET X = 4 / 0\n20 END\n";
//! let mut diags = DiagnosticEmitter::new();
//! let tokens = Lexer::new(source, FileId(0)).scan(&mut diags);
//! let program = parse_program(tokens, &mut diags);
//! SemanticAnalyzer::new(&mut diags).analyze(&program);
//! assert_eq!(diags.error_count(), 1);
//! assert_eq!(diags.diagnostics()[0].code, "B2002");
//! ```

pub mod basic;
pub mod cursor;
pub mod diag;
pub mod il;
pub mod rt;
pub mod source;
