//! # BASIC abstract syntax tree
//!
//! Expression and statement node variants (spec.md §3). Every statement
//! carries a 1-based line and [`SourceLoc`]; a [`StmtList`] propagates its
//! location from the first non-empty child when available.

use crate::source::SourceLoc;

pub type SemType = crate::basic::sem::types::SemType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add, Sub, Mul, Div, IDiv, Mod, Pow,
    Eq, Ne, Lt, Le, Gt, Ge,
    And, Or, AndAlso, OrElse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLit(i64, SourceLoc),
    FloatLit(f64, SourceLoc),
    BoolLit(bool, SourceLoc),
    StringLit(String, SourceLoc),
    Var(String, SourceLoc),
    ArrayElem { name: String, index: Box<Expr>, loc: SourceLoc },
    Unary { op: UnOp, operand: Box<Expr>, loc: SourceLoc },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, loc: SourceLoc },
    BuiltinCall { tag: crate::basic::token::Builtin, args: Vec<Expr>, loc: SourceLoc },
    UserCall { callee: String, args: Vec<Expr>, loc: SourceLoc },
    LBound { name: String, loc: SourceLoc },
    UBound { name: String, loc: SourceLoc },
    New { type_name: String, args: Vec<Expr>, loc: SourceLoc },
    Me(SourceLoc),
    Member { target: Box<Expr>, name: String, loc: SourceLoc },
    MethodCall { target: Box<Expr>, name: String, args: Vec<Expr>, loc: SourceLoc },
}

impl Expr {
    pub fn loc(&self) -> SourceLoc {
        match self {
            Expr::IntLit(_, l)
            | Expr::FloatLit(_, l)
            | Expr::BoolLit(_, l)
            | Expr::StringLit(_, l)
            | Expr::Var(_, l)
            | Expr::ArrayElem { loc: l, .. }
            | Expr::Unary { loc: l, .. }
            | Expr::Binary { loc: l, .. }
            | Expr::BuiltinCall { loc: l, .. }
            | Expr::UserCall { loc: l, .. }
            | Expr::LBound { loc: l, .. }
            | Expr::UBound { loc: l, .. }
            | Expr::New { loc: l, .. }
            | Expr::Me(l)
            | Expr::Member { loc: l, .. }
            | Expr::MethodCall { loc: l, .. } => *l,
        }
    }
}

/// A single item in a PRINT/WRITE item list: the expression plus the
/// separator that followed it in source (needed to preserve column
/// alignment semantics, since `,` and `;` separators print differently).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintSep {
    Comma,
    Semicolon,
    /// No separator: this was the last item.
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrintItem {
    pub expr: Expr,
    pub sep: PrintSep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    While,
    Do,
    For,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoTestKind {
    PreWhile,
    PreUntil,
    PostWhile,
    PostUntil,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Input,
    Output,
    Append,
    Binary,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    Next,
    Label,
    Here,
}

/// One `CASE` arm of a SELECT CASE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseArm {
    /// Scalar integer labels, e.g. `CASE 1, 2, 3`.
    pub labels: Vec<i64>,
    /// Inclusive integer ranges, e.g. `CASE 1 TO 5`.
    pub ranges: Vec<(i64, i64)>,
    /// Relational half-open forms, e.g. `CASE IS > 10`.
    pub relational: Vec<(BinOp, i64)>,
    /// String labels, mutually exclusive with the numeric forms above
    /// within one SELECT CASE.
    pub string_labels: Vec<String>,
    pub body: Vec<Stmt>,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
    pub is_array: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcDecl {
    pub name: String,
    pub is_function: bool,
    pub params: Vec<Param>,
    /// Defaults to the "unknown" sentinel (empty string) until the analyzer
    /// infers it for a FUNCTION with no explicit `AS` clause.
    pub return_type: String,
    pub body: Vec<Stmt>,
    pub loc: SourceLoc,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { target: Expr, expr: Expr, loc: SourceLoc },
    Dim { name: String, size: Option<Expr>, ty: Option<String>, loc: SourceLoc },
    Redim { name: String, size: Expr, loc: SourceLoc },
    Const { name: String, expr: Expr, loc: SourceLoc },
    StaticDecl { name: String, loc: SourceLoc },
    SharedDecl { name: String, loc: SourceLoc },

    Print { items: Vec<PrintItem>, channel: Option<Expr>, loc: SourceLoc },
    WriteChannel { channel: Expr, items: Vec<PrintItem>, loc: SourceLoc },
    Open { path: Expr, mode: OpenMode, channel: Expr, loc: SourceLoc },
    Close { channel: Option<Expr>, loc: SourceLoc },
    Seek { channel: Expr, position: Expr, loc: SourceLoc },
    Input { targets: Vec<Expr>, channel: Option<Expr>, prompt: Option<String>, loc: SourceLoc },
    LineInputChannel { channel: Expr, target: Expr, loc: SourceLoc },

    If { cond: Expr, then_branch: Vec<Stmt>, else_ifs: Vec<(Expr, Vec<Stmt>)>, else_branch: Option<Vec<Stmt>>, loc: SourceLoc },
    SelectCase { selector: Expr, arms: Vec<CaseArm>, else_body: Option<Vec<Stmt>>, loc: SourceLoc },

    While { cond: Expr, body: Vec<Stmt>, loc: SourceLoc },
    Do { pre: DoTestKind, pre_cond: Option<Expr>, body: Vec<Stmt>, post: DoTestKind, post_cond: Option<Expr>, loc: SourceLoc },
    For { var: String, start: Expr, end: Expr, step: Option<Expr>, body: Vec<Stmt>, next_var: Option<String>, loc: SourceLoc },
    Next { loc: SourceLoc },
    Exit { kind: LoopKind, loc: SourceLoc },

    Goto { target: String, loc: SourceLoc },
    Gosub { target: String, loc: SourceLoc },
    Return { expr: Option<Expr>, is_gosub_return: bool, loc: SourceLoc },

    OnErrorGoto { target: Option<String>, loc: SourceLoc },
    Resume { mode: ResumeMode, label: Option<String>, loc: SourceLoc },

    End { loc: SourceLoc },
    Randomize { seed: Option<Expr>, loc: SourceLoc },
    Cls { loc: SourceLoc },
    Color { fg: Expr, bg: Option<Expr>, loc: SourceLoc },
    Locate { row: Expr, col: Expr, loc: SourceLoc },
    Cursor { visible: Expr, loc: SourceLoc },
    AltScreen { enabled: Expr, loc: SourceLoc },
    Sleep { millis: Expr, loc: SourceLoc },

    Call { callee: String, args: Vec<Expr>, loc: SourceLoc },
    ExprStmt { expr: Expr, loc: SourceLoc },

    Try { body: Vec<Stmt>, catch_body: Vec<Stmt>, loc: SourceLoc },

    ClassDecl { name: String, base: Option<String>, interfaces: Vec<String>, members: Vec<Stmt>, loc: SourceLoc },
    InterfaceDecl { name: String, methods: Vec<ProcDecl>, loc: SourceLoc },
    NamespaceDecl { name: String, body: Vec<Stmt>, loc: SourceLoc },
    UsingDecl { name: String, loc: SourceLoc },

    ProcDecl(ProcDecl),

    /// A sequence of statements produced by the statement sequencer; carries
    /// its own location propagated from the first non-empty child.
    List { stmts: Vec<Stmt>, loc: SourceLoc },
}

impl Stmt {
    pub fn loc(&self) -> SourceLoc {
        match self {
            Stmt::Let { loc, .. }
            | Stmt::Dim { loc, .. }
            | Stmt::Redim { loc, .. }
            | Stmt::Const { loc, .. }
            | Stmt::StaticDecl { loc, .. }
            | Stmt::SharedDecl { loc, .. }
            | Stmt::Print { loc, .. }
            | Stmt::WriteChannel { loc, .. }
            | Stmt::Open { loc, .. }
            | Stmt::Close { loc, .. }
            | Stmt::Seek { loc, .. }
            | Stmt::Input { loc, .. }
            | Stmt::LineInputChannel { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::SelectCase { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::Do { loc, .. }
            | Stmt::For { loc, .. }
            | Stmt::Next { loc }
            | Stmt::Exit { loc, .. }
            | Stmt::Goto { loc, .. }
            | Stmt::Gosub { loc, .. }
            | Stmt::Return { loc, .. }
            | Stmt::OnErrorGoto { loc, .. }
            | Stmt::Resume { loc, .. }
            | Stmt::End { loc }
            | Stmt::Randomize { loc, .. }
            | Stmt::Cls { loc }
            | Stmt::Color { loc, .. }
            | Stmt::Locate { loc, .. }
            | Stmt::Cursor { loc, .. }
            | Stmt::AltScreen { loc, .. }
            | Stmt::Sleep { loc, .. }
            | Stmt::Call { loc, .. }
            | Stmt::ExprStmt { loc, .. }
            | Stmt::Try { loc, .. }
            | Stmt::ClassDecl { loc, .. }
            | Stmt::InterfaceDecl { loc, .. }
            | Stmt::NamespaceDecl { loc, .. }
            | Stmt::UsingDecl { loc, .. }
            | Stmt::List { loc, .. } => *loc,
            Stmt::ProcDecl(p) => p.loc,
        }
    }
}

/// A labeled statement: an optional numeric line label and/or named label
/// prefix, attached to the underlying statement.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledStmt {
    pub numeric_label: Option<i64>,
    pub named_label: Option<String>,
    pub stmt: Stmt,
}

/// A complete parsed program: ordered procedure declarations and ordered
/// main-sequence statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub procs: Vec<ProcDecl>,
    pub main: Vec<LabeledStmt>,
}
