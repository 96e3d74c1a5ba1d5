//! # IL core model
//!
//! Module, function, basic block, instruction, global, and extern — the
//! structures the textual codec (§4.4) parses into and prints from.

use crate::il::types::Type;
use crate::il::value::Value;
use crate::source::SourceLoc;

/// Closed opcode enum. Non-terminator arithmetic/memory/call opcodes plus the
/// terminator set (`br`, `cbr`, `ret`, `switch`, `trap`), per SPEC_FULL.md §2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Iconst, Fconst, Sconst,
    Add, Sub, Mul, SDiv, UDiv, SRem, URem,
    And, Or, Xor, Shl, LShr, AShr,
    IcmpEq, IcmpNe, IcmpSlt, IcmpSle, IcmpSgt, IcmpSge,
    FAdd, FSub, FMul, FDiv,
    FcmpEq, FcmpNe, FcmpLt, FcmpLe, FcmpGt, FcmpGe,
    Sitofp, Fptosi, Zext, Trunc,
    Alloca, Load, Store, Gep,
    Call, AddrOf, ConstStr,
    Br, Cbr, Ret, Switch, Trap,
}

/// Static dispatch-table entry for one opcode: whether it terminates its
/// block and whether it yields an SSA result. Modeled as a match over the
/// opcode sum rather than a virtual method table, per spec.md §9's operator
/// dispatch design note (the same "dense static table" shape applies here).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    pub is_terminator: bool,
    pub has_result: bool,
}

impl Opcode {
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Iconst => "iconst", Opcode::Fconst => "fconst", Opcode::Sconst => "sconst",
            Opcode::Add => "add", Opcode::Sub => "sub", Opcode::Mul => "mul",
            Opcode::SDiv => "sdiv", Opcode::UDiv => "udiv", Opcode::SRem => "srem", Opcode::URem => "urem",
            Opcode::And => "and", Opcode::Or => "or", Opcode::Xor => "xor",
            Opcode::Shl => "shl", Opcode::LShr => "lshr", Opcode::AShr => "ashr",
            Opcode::IcmpEq => "icmp_eq", Opcode::IcmpNe => "icmp_ne",
            Opcode::IcmpSlt => "icmp_slt", Opcode::IcmpSle => "icmp_sle",
            Opcode::IcmpSgt => "icmp_sgt", Opcode::IcmpSge => "icmp_sge",
            Opcode::FAdd => "fadd", Opcode::FSub => "fsub", Opcode::FMul => "fmul", Opcode::FDiv => "fdiv",
            Opcode::FcmpEq => "fcmp_eq", Opcode::FcmpNe => "fcmp_ne",
            Opcode::FcmpLt => "fcmp_lt", Opcode::FcmpLe => "fcmp_le",
            Opcode::FcmpGt => "fcmp_gt", Opcode::FcmpGe => "fcmp_ge",
            Opcode::Sitofp => "sitofp", Opcode::Fptosi => "fptosi",
            Opcode::Zext => "zext", Opcode::Trunc => "trunc",
            Opcode::Alloca => "alloca", Opcode::Load => "load", Opcode::Store => "store", Opcode::Gep => "gep",
            Opcode::Call => "call", Opcode::AddrOf => "addr_of", Opcode::ConstStr => "const_str",
            Opcode::Br => "br", Opcode::Cbr => "cbr", Opcode::Ret => "ret",
            Opcode::Switch => "switch", Opcode::Trap => "trap",
        }
    }

    pub fn parse(mnemonic: &str) -> Option<Opcode> {
        Some(match mnemonic {
            "iconst" => Opcode::Iconst, "fconst" => Opcode::Fconst, "sconst" => Opcode::Sconst,
            "add" => Opcode::Add, "sub" => Opcode::Sub, "mul" => Opcode::Mul,
            "sdiv" => Opcode::SDiv, "udiv" => Opcode::UDiv, "srem" => Opcode::SRem, "urem" => Opcode::URem,
            "and" => Opcode::And, "or" => Opcode::Or, "xor" => Opcode::Xor,
            "shl" => Opcode::Shl, "lshr" => Opcode::LShr, "ashr" => Opcode::AShr,
            "icmp_eq" => Opcode::IcmpEq, "icmp_ne" => Opcode::IcmpNe,
            "icmp_slt" => Opcode::IcmpSlt, "icmp_sle" => Opcode::IcmpSle,
            "icmp_sgt" => Opcode::IcmpSgt, "icmp_sge" => Opcode::IcmpSge,
            "fadd" => Opcode::FAdd, "fsub" => Opcode::FSub, "fmul" => Opcode::FMul, "fdiv" => Opcode::FDiv,
            "fcmp_eq" => Opcode::FcmpEq, "fcmp_ne" => Opcode::FcmpNe,
            "fcmp_lt" => Opcode::FcmpLt, "fcmp_le" => Opcode::FcmpLe,
            "fcmp_gt" => Opcode::FcmpGt, "fcmp_ge" => Opcode::FcmpGe,
            "sitofp" => Opcode::Sitofp, "fptosi" => Opcode::Fptosi,
            "zext" => Opcode::Zext, "trunc" => Opcode::Trunc,
            "alloca" => Opcode::Alloca, "load" => Opcode::Load, "store" => Opcode::Store, "gep" => Opcode::Gep,
            "call" => Opcode::Call, "addr_of" => Opcode::AddrOf, "const_str" => Opcode::ConstStr,
            "br" => Opcode::Br, "cbr" => Opcode::Cbr, "ret" => Opcode::Ret,
            "switch" => Opcode::Switch, "trap" => Opcode::Trap,
            _ => return None,
        })
    }

    pub fn info(self) -> OpcodeInfo {
        let is_terminator = matches!(self, Opcode::Br | Opcode::Cbr | Opcode::Ret | Opcode::Switch | Opcode::Trap);
        let has_result = !matches!(
            self,
            Opcode::Store | Opcode::Br | Opcode::Cbr | Opcode::Ret | Opcode::Switch | Opcode::Trap
        );
        OpcodeInfo { is_terminator, has_result }
    }
}

/// One branch target: a block label plus its positional SSA argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchTarget {
    pub label: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub opcode: Opcode,
    /// SSA result id, present iff `opcode.info().has_result`.
    pub result: Option<u32>,
    pub ty: Type,
    pub operands: Vec<Value>,
    pub targets: Vec<BranchTarget>,
    /// Trap kind code, e.g. `"DivideByZero"`, used only by `Opcode::Trap`.
    pub trap_kind: Option<String>,
    pub loc: SourceLoc,
}

impl Instr {
    pub fn is_terminator(&self) -> bool {
        self.opcode.info().is_terminator
    }
}

/// One SSA basic-block parameter: id plus type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockParam {
    pub id: u32,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub params: Vec<BlockParam>,
    pub instrs: Vec<Instr>,
}

impl BasicBlock {
    pub fn terminator(&self) -> Option<&Instr> {
        self.instrs.last().filter(|i| i.is_terminator())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    pub id: u32,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub ret_ty: Type,
    pub params: Vec<Param>,
    /// First block is the entry block.
    pub blocks: Vec<BasicBlock>,
    /// Per-function monotonic temp-id counter, reset at parse.
    pub next_temp: u32,
}

impl Function {
    pub fn entry(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }

    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extern {
    pub name: String,
    pub ret_ty: Type,
    pub param_tys: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    Str(Vec<u8>),
    Scalar(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub init: GlobalInit,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub version: String,
    pub target: Option<String>,
    pub externs: Vec<Extern>,
    pub globals: Vec<Global>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(version: impl Into<String>) -> Self {
        Self { version: version.into(), ..Default::default() }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
