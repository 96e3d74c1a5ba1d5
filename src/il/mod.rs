//! # IL textual codec and core model
//!
//! A strongly-typed SSA intermediate language: [`model`] defines the in-memory
//! structures, [`parser`] and [`printer`] are exact inverses of each other
//! over the textual form (spec.md §4.4), and [`escape`]/[`operand`]/[`types`]/
//! [`value`] are the shared primitives both layers build on.

pub mod escape;
pub mod model;
pub mod operand;
pub mod parser;
pub mod printer;
pub mod types;
pub mod value;

pub use model::{
    BasicBlock, BlockParam, BranchTarget, Extern, Function, Global, GlobalInit, Instr, Module,
    Opcode, OpcodeInfo, Param,
};
pub use parser::{parse_module, IlParseError};
pub use printer::print_module;
pub use types::Type;
pub use value::Value;
