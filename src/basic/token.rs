//! # BASIC token types
//!
//! Defines every token kind the lexer can produce for this BASIC dialect.
//!
//! ## Token structure
//!
//! Each token carries:
//! - `kind`: the token type (keyword, operator, literal, identifier, ...)
//! - `lexeme`: the original source text
//! - `loc`: the location of the token's first character

use crate::source::SourceLoc;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub loc: SourceLoc,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, loc: SourceLoc) -> Self {
        Self { kind, lexeme: lexeme.into(), loc }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }
}

/// Closed token-kind set. Ordering within `Keyword` matches the statement
/// registry dispatch table in `basic::parser`.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    Plus,
    Minus,
    Star,
    Slash,
    Backslash, // integer divide `\`
    Caret,     // exponent `^`
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
    Colon,
    Semicolon,
    Hash, // leading `#` for channel-routed I/O
    Dot,
    At,

    Newline,
    Eof,
}

/// Every reserved word recognised by the lexer's keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Let, Dim, Redim, Const, Static, Shared,
    Print, Write, Open, Close, Seek, Input, Line,
    If, Then, ElseIf, Else, EndIf,
    Select, Case, Is, To, EndSelect,
    While, Wend, Do, Loop, Until,
    For, Next, Step, Exit,
    Goto, Gosub, Return,
    On, Error, Resume,
    End,
    Sub, Function, As,
    Call,
    Class, Interface, Namespace, Using, New, Me,
    Try, Catch,
    Randomize, Cls, Color, Locate, Cursor, AltScreen, Sleep,
    And, Or, Not, AndAlso, OrElse, Mod,
    True, False,
    LBound, UBound,
}

/// Maps a case-insensitive identifier spelling to its reserved keyword, or
/// `None` when the spelling is an ordinary identifier.
pub fn lookup_keyword(word: &str) -> Option<Keyword> {
    let upper = word.to_ascii_uppercase();
    Some(match upper.as_str() {
        "LET" => Keyword::Let,
        "DIM" => Keyword::Dim,
        "REDIM" => Keyword::Redim,
        "CONST" => Keyword::Const,
        "STATIC" => Keyword::Static,
        "SHARED" => Keyword::Shared,
        "PRINT" => Keyword::Print,
        "WRITE" => Keyword::Write,
        "OPEN" => Keyword::Open,
        "CLOSE" => Keyword::Close,
        "SEEK" => Keyword::Seek,
        "INPUT" => Keyword::Input,
        "LINE" => Keyword::Line,
        "IF" => Keyword::If,
        "THEN" => Keyword::Then,
        "ELSEIF" => Keyword::ElseIf,
        "ELSE" => Keyword::Else,
        "ENDIF" => Keyword::EndIf,
        "SELECT" => Keyword::Select,
        "CASE" => Keyword::Case,
        "IS" => Keyword::Is,
        "TO" => Keyword::To,
        "WHILE" => Keyword::While,
        "WEND" => Keyword::Wend,
        "DO" => Keyword::Do,
        "LOOP" => Keyword::Loop,
        "UNTIL" => Keyword::Until,
        "FOR" => Keyword::For,
        "NEXT" => Keyword::Next,
        "STEP" => Keyword::Step,
        "EXIT" => Keyword::Exit,
        "GOTO" => Keyword::Goto,
        "GOSUB" => Keyword::Gosub,
        "RETURN" => Keyword::Return,
        "ON" => Keyword::On,
        "ERROR" => Keyword::Error,
        "RESUME" => Keyword::Resume,
        "END" => Keyword::End,
        "SUB" => Keyword::Sub,
        "FUNCTION" => Keyword::Function,
        "AS" => Keyword::As,
        "CALL" => Keyword::Call,
        "CLASS" => Keyword::Class,
        "INTERFACE" => Keyword::Interface,
        "NAMESPACE" => Keyword::Namespace,
        "USING" => Keyword::Using,
        "NEW" => Keyword::New,
        "ME" => Keyword::Me,
        "TRY" => Keyword::Try,
        "CATCH" => Keyword::Catch,
        "RANDOMIZE" => Keyword::Randomize,
        "CLS" => Keyword::Cls,
        "COLOR" => Keyword::Color,
        "LOCATE" => Keyword::Locate,
        "CURSOR" => Keyword::Cursor,
        "ALTSCREEN" => Keyword::AltScreen,
        "SLEEP" => Keyword::Sleep,
        "AND" => Keyword::And,
        "OR" => Keyword::Or,
        "NOT" => Keyword::Not,
        "ANDALSO" => Keyword::AndAlso,
        "ORELSE" => Keyword::OrElse,
        "MOD" => Keyword::Mod,
        "TRUE" => Keyword::True,
        "FALSE" => Keyword::False,
        "LBOUND" => Keyword::LBound,
        "UBOUND" => Keyword::UBound,
        _ => return None,
    })
}

/// Two-word keyword phrases the lexer folds into a single logical keyword
/// during statement dispatch (the lexer itself emits the two words as
/// separate tokens; the parser recognises the pair).
pub const END_IF: (&str, &str) = ("END", "IF");
pub const END_SELECT: (&str, &str) = ("END", "SELECT");
pub const END_SUB: (&str, &str) = ("END", "SUB");
pub const END_FUNCTION: (&str, &str) = ("END", "FUNCTION");
pub const ON_ERROR: (&str, &str) = ("ON", "ERROR");

/// Builtin function/procedure tags recognised by name (not reserved words —
/// a user may shadow them as a procedure name, resolved at call-site by the
/// parser's known-procedure set taking priority).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Abs, Sgn, Sqr, Int, Fix, Rnd,
    Sin, Cos, Tan, Atn, Log, Exp,
    Len, Mid, Left, Right, Chr, Asc, Str, Val, UCase, LCase, Trim, InStr, Space,
}

pub fn lookup_builtin(word: &str) -> Option<Builtin> {
    let upper = word.to_ascii_uppercase();
    Some(match upper.as_str() {
        "ABS" => Builtin::Abs,
        "SGN" => Builtin::Sgn,
        "SQR" => Builtin::Sqr,
        "INT" => Builtin::Int,
        "FIX" => Builtin::Fix,
        "RND" => Builtin::Rnd,
        "SIN" => Builtin::Sin,
        "COS" => Builtin::Cos,
        "TAN" => Builtin::Tan,
        "ATN" => Builtin::Atn,
        "LOG" => Builtin::Log,
        "EXP" => Builtin::Exp,
        "LEN" => Builtin::Len,
        "MID" | "MID$" => Builtin::Mid,
        "LEFT" | "LEFT$" => Builtin::Left,
        "RIGHT" | "RIGHT$" => Builtin::Right,
        "CHR" | "CHR$" => Builtin::Chr,
        "ASC" => Builtin::Asc,
        "STR" | "STR$" => Builtin::Str,
        "VAL" => Builtin::Val,
        "UCASE" | "UCASE$" => Builtin::UCase,
        "LCASE" | "LCASE$" => Builtin::LCase,
        "TRIM" | "TRIM$" => Builtin::Trim,
        "INSTR" => Builtin::InStr,
        "SPACE" | "SPACE$" => Builtin::Space,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_lookup_is_case_insensitive() {
        assert_eq!(lookup_keyword("if"), Some(Keyword::If));
        assert_eq!(lookup_keyword("If"), Some(Keyword::If));
        assert_eq!(lookup_keyword("IF"), Some(Keyword::If));
        assert_eq!(lookup_keyword("IFX"), None);
    }

    #[test]
    fn builtin_lookup_accepts_dollar_suffix() {
        assert_eq!(lookup_builtin("MID$"), Some(Builtin::Mid));
        assert_eq!(lookup_builtin("MID"), Some(Builtin::Mid));
        assert_eq!(lookup_builtin("COUNTER"), None);
    }
}
