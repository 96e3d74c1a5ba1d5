//! # BASIC parser
//!
//! Recursive-descent parser over the [`Token`](crate::basic::token::Token)
//! stream (spec.md §4.2). Statement dispatch is a `match` on the leading
//! keyword rather than a literal function-pointer table — the idiomatic
//! realization of the "statement-parselet registry" the spec describes: a
//! `match` over a closed keyword enum compiles to the same dense jump table
//! a registry would give, without the indirection.
//!
//! Parser state tracks the set of names already known to be procedures and
//! the set of names declared with `DIM`, used to break the `name(...)`
//! ambiguity between a call and an array index (spec.md §4.2 "Expression
//! parsing"). On a syntax error the parser emits a diagnostic and
//! synchronises to the next statement boundary so later statements still
//! get a chance to parse (spec.md §4.2 "Error recovery").

use std::collections::{HashMap, HashSet};

use crate::basic::ast::*;
use crate::basic::token::{Keyword, Token, TokenKind};
use crate::diag::DiagnosticEmitter;
use crate::source::{SourceLoc, SourceSpan};

/// Parses a full token stream (already lexed and terminated by `Eof`) into a
/// [`Program`], emitting diagnostics into `diags` as it goes.
pub fn parse_program(tokens: Vec<Token>, diags: &mut DiagnosticEmitter) -> Program {
    Parser::new(tokens, diags).parse_program()
}

pub struct Parser<'d> {
    toks: Vec<Token>,
    pos: usize,
    diags: &'d mut DiagnosticEmitter,
    known_procs: HashSet<String>,
    declared_arrays: HashSet<String>,
    /// Set once a non-USING, non-NAMESPACE top-level declaration has been
    /// seen, for `E_NS_001` ("USING must precede other declarations").
    saw_non_using_decl: bool,
    /// Namespaces named in a top-level `USING`, for the `E_NS_003`
    /// ambiguous-type-resolution pass run once the whole program is parsed.
    using_namespaces: HashSet<String>,
}

impl<'d> Parser<'d> {
    pub fn new(tokens: Vec<Token>, diags: &'d mut DiagnosticEmitter) -> Self {
        Self {
            toks: tokens,
            pos: 0,
            diags,
            known_procs: HashSet::new(),
            declared_arrays: HashSet::new(),
            saw_non_using_decl: false,
            using_namespaces: HashSet::new(),
        }
    }

    // ---- token stream primitives -----------------------------------

    fn cur(&self) -> &Token {
        &self.toks[self.pos.min(self.toks.len() - 1)]
    }

    fn cur_loc(&self) -> SourceLoc {
        self.cur().loc
    }

    fn is_eof(&self) -> bool {
        matches!(self.cur().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.cur().clone();
        if !self.is_eof() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.cur().kind) == std::mem::discriminant(kind)
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        self.cur().is_keyword(kw)
    }

    fn at_kw(&self, kws: &[Keyword]) -> bool {
        kws.iter().any(|k| self.check_kw(*k))
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.check_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kw(&mut self, kw: Keyword, code: &'static str, what: &str) -> bool {
        if self.eat_kw(kw) {
            true
        } else {
            self.error(code, format!("expected {what}"));
            false
        }
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&mut self, code: &'static str, msg: impl Into<String>) {
        self.diags.error(code, msg, SourceSpan::point(self.cur_loc()));
    }

    fn skip_newlines(&mut self) {
        while matches!(self.cur().kind, TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.cur().kind, TokenKind::Newline | TokenKind::Colon) {
            self.advance();
        }
    }

    /// Recovers from a syntax error by skipping to the next statement
    /// boundary: end-of-line, colon, or `Eof` (never consumed).
    fn sync_to_stmt_boundary(&mut self) {
        while !matches!(self.cur().kind, TokenKind::Newline | TokenKind::Colon | TokenKind::Eof) {
            self.advance();
        }
    }

    fn ident_name(&mut self) -> Option<String> {
        match self.cur().kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    // ---- program / top level -----------------------------------------

    pub fn parse_program(mut self) -> Program {
        let mut program = Program::default();
        self.skip_separators();
        while !self.is_eof() {
            if self.check_kw(Keyword::Using) {
                if self.saw_non_using_decl {
                    self.error("E_NS_001", "USING directives must precede other declarations");
                }
                if let Some(stmt) = self.parse_using_decl() {
                    program.main.push(LabeledStmt { numeric_label: None, named_label: None, stmt });
                }
            } else if self.check_kw(Keyword::Namespace) {
                if let Some(stmt) = self.parse_namespace_decl() {
                    program.main.push(LabeledStmt { numeric_label: None, named_label: None, stmt });
                }
            } else if self.check_kw(Keyword::Class) {
                self.saw_non_using_decl = true;
                if let Some(stmt) = self.parse_class_decl() {
                    program.main.push(LabeledStmt { numeric_label: None, named_label: None, stmt });
                }
            } else if self.check_kw(Keyword::Interface) {
                self.saw_non_using_decl = true;
                if let Some(stmt) = self.parse_interface_decl() {
                    program.main.push(LabeledStmt { numeric_label: None, named_label: None, stmt });
                }
            } else if self.check_kw(Keyword::Sub) || self.check_kw(Keyword::Function) {
                self.saw_non_using_decl = true;
                if let Some(proc) = self.parse_proc_decl() {
                    self.known_procs.insert(proc.name.clone());
                    program.procs.push(proc);
                }
            } else {
                self.saw_non_using_decl = true;
                let labeled = self.parse_labeled_statement();
                program.main.push(labeled);
            }
            self.skip_separators();
        }
        self.check_ambiguous_namespaces(&program);
        program
    }

    /// `E_NS_003`: a bare type name visible through two or more `USING`-
    /// imported namespaces is ambiguous. Only meaningful once the whole
    /// program is parsed, since a `USING` earlier in the file can make a
    /// class declared later in another `NAMESPACE` block ambiguous.
    fn check_ambiguous_namespaces(&mut self, program: &Program) {
        if self.using_namespaces.len() < 2 {
            return;
        }
        let mut namespace_types: HashMap<String, HashSet<String>> = HashMap::new();
        for labeled in &program.main {
            Self::collect_namespace_types(&labeled.stmt, None, &mut namespace_types);
        }
        for labeled in &program.main {
            self.check_stmt_types(&labeled.stmt, &namespace_types);
        }
        for proc in &program.procs {
            for param in &proc.params {
                if let Some(t) = &param.ty {
                    self.check_ambiguous_type_name(t, proc.loc, &namespace_types);
                }
            }
            if !proc.return_type.is_empty() {
                self.check_ambiguous_type_name(&proc.return_type, proc.loc, &namespace_types);
            }
            for stmt in &proc.body {
                self.check_stmt_types(stmt, &namespace_types);
            }
        }
    }

    fn collect_namespace_types(stmt: &Stmt, current_ns: Option<&str>, out: &mut HashMap<String, HashSet<String>>) {
        match stmt {
            Stmt::NamespaceDecl { name, body, .. } => {
                for s in body {
                    Self::collect_namespace_types(s, Some(name), out);
                }
            }
            Stmt::ClassDecl { name, members, .. } => {
                if let Some(ns) = current_ns {
                    out.entry(name.clone()).or_default().insert(ns.to_string());
                }
                for m in members {
                    Self::collect_namespace_types(m, current_ns, out);
                }
            }
            Stmt::InterfaceDecl { name, .. } => {
                if let Some(ns) = current_ns {
                    out.entry(name.clone()).or_default().insert(ns.to_string());
                }
            }
            Stmt::List { stmts, .. } => {
                for s in stmts {
                    Self::collect_namespace_types(s, current_ns, out);
                }
            }
            _ => {}
        }
    }

    fn check_ambiguous_type_name(&mut self, name: &str, loc: SourceLoc, namespace_types: &HashMap<String, HashSet<String>>) {
        if name.contains('.') {
            return;
        }
        if let Some(owners) = namespace_types.get(name) {
            let visible: Vec<&String> = self.using_namespaces.iter().filter(|ns| owners.contains(*ns)).collect();
            if visible.len() > 1 {
                let mut names: Vec<&str> = visible.iter().map(|s| s.as_str()).collect();
                names.sort_unstable();
                self.diags.error(
                    "E_NS_003",
                    format!("type '{name}' is ambiguous between namespaces {}", names.join(", ")),
                    SourceSpan::point(loc),
                );
            }
        }
    }

    fn check_stmt_types(&mut self, stmt: &Stmt, namespace_types: &HashMap<String, HashSet<String>>) {
        match stmt {
            Stmt::Dim { ty: Some(t), loc, .. } => self.check_ambiguous_type_name(t, *loc, namespace_types),
            Stmt::ClassDecl { base, interfaces, members, loc, .. } => {
                if let Some(b) = base {
                    self.check_ambiguous_type_name(b, *loc, namespace_types);
                }
                for i in interfaces {
                    self.check_ambiguous_type_name(i, *loc, namespace_types);
                }
                for m in members {
                    self.check_stmt_types(m, namespace_types);
                }
            }
            Stmt::ProcDecl(p) => {
                for param in &p.params {
                    if let Some(t) = &param.ty {
                        self.check_ambiguous_type_name(t, p.loc, namespace_types);
                    }
                }
                if !p.return_type.is_empty() {
                    self.check_ambiguous_type_name(&p.return_type, p.loc, namespace_types);
                }
                for s in &p.body {
                    self.check_stmt_types(s, namespace_types);
                }
            }
            Stmt::NamespaceDecl { body, .. } => {
                for s in body {
                    self.check_stmt_types(s, namespace_types);
                }
            }
            Stmt::If { cond, then_branch, else_ifs, else_branch, .. } => {
                self.check_expr_types(cond, namespace_types);
                for s in then_branch {
                    self.check_stmt_types(s, namespace_types);
                }
                for (c, b) in else_ifs {
                    self.check_expr_types(c, namespace_types);
                    for s in b {
                        self.check_stmt_types(s, namespace_types);
                    }
                }
                if let Some(b) = else_branch {
                    for s in b {
                        self.check_stmt_types(s, namespace_types);
                    }
                }
            }
            Stmt::While { cond, body, .. } => {
                self.check_expr_types(cond, namespace_types);
                for s in body {
                    self.check_stmt_types(s, namespace_types);
                }
            }
            Stmt::Do { pre_cond, body, post_cond, .. } => {
                if let Some(c) = pre_cond {
                    self.check_expr_types(c, namespace_types);
                }
                for s in body {
                    self.check_stmt_types(s, namespace_types);
                }
                if let Some(c) = post_cond {
                    self.check_expr_types(c, namespace_types);
                }
            }
            Stmt::For { start, end, step, body, .. } => {
                self.check_expr_types(start, namespace_types);
                self.check_expr_types(end, namespace_types);
                if let Some(s) = step {
                    self.check_expr_types(s, namespace_types);
                }
                for s in body {
                    self.check_stmt_types(s, namespace_types);
                }
            }
            Stmt::SelectCase { selector, arms, else_body, .. } => {
                self.check_expr_types(selector, namespace_types);
                for arm in arms {
                    for s in &arm.body {
                        self.check_stmt_types(s, namespace_types);
                    }
                }
                if let Some(b) = else_body {
                    for s in b {
                        self.check_stmt_types(s, namespace_types);
                    }
                }
            }
            Stmt::Try { body, catch_body, .. } => {
                for s in body {
                    self.check_stmt_types(s, namespace_types);
                }
                for s in catch_body {
                    self.check_stmt_types(s, namespace_types);
                }
            }
            Stmt::Let { target, expr, .. } => {
                self.check_expr_types(target, namespace_types);
                self.check_expr_types(expr, namespace_types);
            }
            Stmt::ExprStmt { expr, .. } => self.check_expr_types(expr, namespace_types),
            Stmt::Call { args, .. } => {
                for a in args {
                    self.check_expr_types(a, namespace_types);
                }
            }
            Stmt::Print { items, .. } => {
                for it in items {
                    self.check_expr_types(&it.expr, namespace_types);
                }
            }
            Stmt::List { stmts, .. } => {
                for s in stmts {
                    self.check_stmt_types(s, namespace_types);
                }
            }
            _ => {}
        }
    }

    fn check_expr_types(&mut self, expr: &Expr, namespace_types: &HashMap<String, HashSet<String>>) {
        match expr {
            Expr::New { type_name, args, loc } => {
                self.check_ambiguous_type_name(type_name, *loc, namespace_types);
                for a in args {
                    self.check_expr_types(a, namespace_types);
                }
            }
            Expr::Unary { operand, .. } => self.check_expr_types(operand, namespace_types),
            Expr::Binary { lhs, rhs, .. } => {
                self.check_expr_types(lhs, namespace_types);
                self.check_expr_types(rhs, namespace_types);
            }
            Expr::ArrayElem { index, .. } => self.check_expr_types(index, namespace_types),
            Expr::BuiltinCall { args, .. } | Expr::UserCall { args, .. } => {
                for a in args {
                    self.check_expr_types(a, namespace_types);
                }
            }
            Expr::Member { target, .. } => self.check_expr_types(target, namespace_types),
            Expr::MethodCall { target, args, .. } => {
                self.check_expr_types(target, namespace_types);
                for a in args {
                    self.check_expr_types(a, namespace_types);
                }
            }
            _ => {}
        }
    }

    fn parse_labeled_statement(&mut self) -> LabeledStmt {
        let mut numeric_label = None;
        let mut named_label = None;

        if let TokenKind::IntLiteral(n) = self.cur().kind {
            numeric_label = Some(n);
            self.advance();
        } else if let TokenKind::Identifier(name) = self.cur().kind.clone() {
            // `name:` is a named label; anything else is the start of an
            // expression-statement or unparenthesised call.
            if matches!(self.toks.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Colon)) {
                named_label = Some(name);
                self.advance();
                self.advance();
            }
        }

        let stmt = self.parse_statement();
        LabeledStmt { numeric_label, named_label, stmt }
    }

    // ---- statement dispatch -------------------------------------------

    /// One statement. On an unrecoverable parse failure returns a `List`
    /// wrapper around whatever was recovered, so the caller always has a
    /// `Stmt` to push (spec.md scenario 2: a synthesized then-branch after
    /// `B0004`).
    fn parse_statement(&mut self) -> Stmt {
        let loc = self.cur_loc();
        match self.cur().kind.clone() {
            TokenKind::Keyword(kw) => self.parse_keyword_statement(kw, loc),
            TokenKind::Identifier(name) => self.parse_identifier_leading_statement(name, loc),
            _ => {
                self.error("B0001", format!("unexpected token '{}'", self.cur().lexeme));
                self.sync_to_stmt_boundary();
                Stmt::List { stmts: vec![], loc }
            }
        }
    }

    fn parse_keyword_statement(&mut self, kw: Keyword, loc: SourceLoc) -> Stmt {
        match kw {
            Keyword::Let => self.parse_let(loc),
            Keyword::Dim => self.parse_dim(loc),
            Keyword::Redim => self.parse_redim(loc),
            Keyword::Const => self.parse_const(loc),
            Keyword::Static => self.parse_static(loc),
            Keyword::Shared => self.parse_shared(loc),
            Keyword::Print => self.parse_print(loc),
            Keyword::Write => self.parse_write(loc),
            Keyword::Open => self.parse_open(loc),
            Keyword::Close => self.parse_close(loc),
            Keyword::Seek => self.parse_seek(loc),
            Keyword::Input => self.parse_input(loc),
            Keyword::Line => self.parse_line_input(loc),
            Keyword::If => self.parse_if(loc),
            Keyword::Select => self.parse_select_case(loc),
            Keyword::While => self.parse_while(loc),
            Keyword::Do => self.parse_do(loc),
            Keyword::For => self.parse_for(loc),
            Keyword::Next => self.parse_next(loc),
            Keyword::Exit => self.parse_exit(loc),
            Keyword::Goto => self.parse_goto(loc),
            Keyword::Gosub => self.parse_gosub(loc),
            Keyword::Return => self.parse_return(loc),
            Keyword::On => self.parse_on_error(loc),
            Keyword::Resume => self.parse_resume(loc),
            Keyword::End => self.parse_end(loc),
            Keyword::Randomize => self.parse_randomize(loc),
            Keyword::Cls => {
                self.advance();
                Stmt::Cls { loc }
            }
            Keyword::Color => self.parse_color(loc),
            Keyword::Locate => self.parse_locate(loc),
            Keyword::Cursor => self.parse_cursor(loc),
            Keyword::AltScreen => self.parse_altscreen(loc),
            Keyword::Sleep => self.parse_sleep(loc),
            Keyword::Call => self.parse_call(loc),
            Keyword::Try => self.parse_try(loc),
            Keyword::Using => {
                self.parse_using_decl().unwrap_or(Stmt::List { stmts: vec![], loc })
            }
            _ => {
                self.error("B0001", format!("unexpected statement keyword '{:?}'", kw));
                self.sync_to_stmt_boundary();
                Stmt::List { stmts: vec![], loc }
            }
        }
    }

    /// An identifier at statement position is either an assignment target
    /// (`X = expr`, `X(i) = expr`) or a bare procedure call (`Foo 1, 2`)
    /// when `name` is already a known procedure. Otherwise the parser emits
    /// a diagnostic suggesting parentheses.
    fn parse_identifier_leading_statement(&mut self, name: String, loc: SourceLoc) -> Stmt {
        if self.known_procs.contains(&name) && !self.peek_is_assignment() {
            self.advance();
            let args = self.parse_call_args_no_parens();
            return Stmt::Call { callee: name, args, loc };
        }
        self.parse_let(loc)
    }

    fn peek_is_assignment(&self) -> bool {
        // `name = ...` or `name(index) = ...`: look past an optional
        // parenthesised index for a following `=`.
        let mut i = self.pos + 1;
        if matches!(self.toks.get(i).map(|t| &t.kind), Some(TokenKind::LParen)) {
            let mut depth = 1;
            i += 1;
            while depth > 0 {
                match self.toks.get(i).map(|t| &t.kind) {
                    Some(TokenKind::LParen) => depth += 1,
                    Some(TokenKind::RParen) => depth -= 1,
                    Some(TokenKind::Eof) | None => return false,
                    _ => {}
                }
                i += 1;
            }
        }
        matches!(self.toks.get(i).map(|t| &t.kind), Some(TokenKind::Eq))
    }

    // ---- LET / DIM / CONST ---------------------------------------------

    fn parse_let(&mut self, loc: SourceLoc) -> Stmt {
        self.eat_kw(Keyword::Let);
        let target = self.parse_primary_lvalue();
        if !self.eat(TokenKind::Eq) {
            self.error("B0001", "expected '=' in assignment");
            self.sync_to_stmt_boundary();
            return Stmt::Let { target: target.clone(), expr: target, loc };
        }
        let expr = self.parse_expr();
        Stmt::Let { target, expr, loc }
    }

    /// Parses the assignable left-hand side: a bare variable or an array
    /// element. Reuses `parse_primary` since the grammar is identical; the
    /// analyzer rejects non-lvalue shapes (spec.md §4.3 assignment typing).
    fn parse_primary_lvalue(&mut self) -> Expr {
        self.parse_primary()
    }

    fn parse_dim(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let name = self.ident_name().unwrap_or_default();
        let mut size = None;
        if self.eat(TokenKind::LParen) {
            size = Some(self.parse_expr());
            self.eat(TokenKind::RParen);
            self.declared_arrays.insert(name.clone());
        }
        let mut ty = None;
        if self.eat_kw(Keyword::As) {
            ty = self.ident_name();
        }
        Stmt::Dim { name, size, ty, loc }
    }

    fn parse_redim(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let name = self.ident_name().unwrap_or_default();
        self.eat(TokenKind::LParen);
        let size = self.parse_expr();
        self.eat(TokenKind::RParen);
        self.declared_arrays.insert(name.clone());
        Stmt::Redim { name, size, loc }
    }

    fn parse_const(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let name = self.ident_name().unwrap_or_default();
        self.eat(TokenKind::Eq);
        let expr = self.parse_expr();
        Stmt::Const { name, expr, loc }
    }

    fn parse_static(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let name = self.ident_name().unwrap_or_default();
        Stmt::StaticDecl { name, loc }
    }

    fn parse_shared(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let name = self.ident_name().unwrap_or_default();
        Stmt::SharedDecl { name, loc }
    }

    // ---- I/O ------------------------------------------------------------

    fn parse_print(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let channel = self.parse_optional_channel_prefix();
        let items = self.parse_print_items();
        Stmt::Print { items, channel, loc }
    }

    fn parse_write(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let channel = self
            .parse_optional_channel_prefix()
            .unwrap_or_else(|| self.synthesize_missing_channel());
        let items = self.parse_print_items();
        Stmt::WriteChannel { channel, items, loc }
    }

    fn synthesize_missing_channel(&mut self) -> Expr {
        self.error("B0001", "expected '#<channel>' after WRITE");
        Expr::IntLit(0, self.cur_loc())
    }

    fn parse_optional_channel_prefix(&mut self) -> Option<Expr> {
        if self.eat(TokenKind::Hash) {
            let expr = self.parse_expr();
            self.eat(TokenKind::Comma);
            Some(expr)
        } else {
            None
        }
    }

    fn parse_print_items(&mut self) -> Vec<PrintItem> {
        let mut items = Vec::new();
        if matches!(self.cur().kind, TokenKind::Newline | TokenKind::Colon | TokenKind::Eof) {
            return items;
        }
        loop {
            let expr = self.parse_expr();
            let sep = if self.eat(TokenKind::Comma) {
                PrintSep::Comma
            } else if self.eat(TokenKind::Semicolon) {
                PrintSep::Semicolon
            } else {
                PrintSep::None
            };
            let is_last = sep == PrintSep::None;
            items.push(PrintItem { expr, sep });
            if is_last {
                break;
            }
            if matches!(self.cur().kind, TokenKind::Newline | TokenKind::Colon | TokenKind::Eof) {
                break;
            }
        }
        items
    }

    fn parse_open(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let path = self.parse_expr();
        self.expect_kw(Keyword::For, "B0001", "'FOR' in OPEN statement");
        let mode = self.parse_open_mode();
        self.expect_kw(Keyword::As, "B0001", "'AS' in OPEN statement");
        self.eat(TokenKind::Hash);
        let channel = self.parse_expr();
        Stmt::Open { path, mode, channel, loc }
    }

    fn parse_open_mode(&mut self) -> OpenMode {
        let name = self.ident_name().unwrap_or_default().to_ascii_uppercase();
        match name.as_str() {
            "OUTPUT" => OpenMode::Output,
            "APPEND" => OpenMode::Append,
            "BINARY" => OpenMode::Binary,
            "RANDOM" => OpenMode::Random,
            _ => {
                if name != "INPUT" {
                    self.error("B0001", format!("unknown OPEN mode '{name}'"));
                }
                OpenMode::Input
            }
        }
    }

    fn parse_close(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let channel = if self.eat(TokenKind::Hash) || matches!(self.cur().kind, TokenKind::Identifier(_) | TokenKind::IntLiteral(_)) {
            Some(self.parse_expr())
        } else {
            None
        };
        Stmt::Close { channel, loc }
    }

    fn parse_seek(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        self.eat(TokenKind::Hash);
        let channel = self.parse_expr();
        self.eat(TokenKind::Comma);
        let position = self.parse_expr();
        Stmt::Seek { channel, position, loc }
    }

    fn parse_input(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let channel = self.parse_optional_channel_prefix();
        let mut prompt = None;
        if channel.is_none() {
            if let TokenKind::StringLiteral(s) = self.cur().kind.clone() {
                self.advance();
                self.eat(TokenKind::Semicolon);
                self.eat(TokenKind::Comma);
                prompt = Some(s);
            }
        }
        let mut targets = vec![self.parse_primary_lvalue()];
        while self.eat(TokenKind::Comma) {
            targets.push(self.parse_primary_lvalue());
        }
        if channel.is_some() && targets.len() > 1 {
            self.error("B0001", "INPUT# with multiple targets is not yet supported");
        }
        Stmt::Input { targets, channel, prompt, loc }
    }

    fn parse_line_input(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        self.expect_kw(Keyword::Input, "B0001", "'INPUT' after 'LINE'");
        let channel = self.parse_optional_channel_prefix().unwrap_or_else(|| self.synthesize_missing_channel());
        let target = self.parse_primary_lvalue();
        Stmt::LineInputChannel { channel, target, loc }
    }

    // ---- IF / SELECT CASE ------------------------------------------------

    fn parse_if(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let cond = self.parse_expr();
        self.expect_kw(Keyword::Then, "B0001", "'THEN' after IF condition");

        if matches!(self.cur().kind, TokenKind::Newline) {
            self.skip_newlines();
            let then_branch = self.parse_stmt_list_until(|p| {
                p.at_kw(&[Keyword::ElseIf, Keyword::Else]) || (p.check_kw(Keyword::End) && p.peek_kw_is(Keyword::If))
            });
            let mut else_ifs = Vec::new();
            let mut else_branch = None;
            loop {
                self.skip_separators();
                if self.eat_kw(Keyword::ElseIf) {
                    let c = self.parse_expr();
                    self.expect_kw(Keyword::Then, "B0001", "'THEN' after ELSEIF condition");
                    self.skip_newlines();
                    let body = self.parse_stmt_list_until(|p| {
                        p.at_kw(&[Keyword::ElseIf, Keyword::Else]) || (p.check_kw(Keyword::End) && p.peek_kw_is(Keyword::If))
                    });
                    else_ifs.push((c, body));
                } else if self.eat_kw(Keyword::Else) {
                    self.skip_newlines();
                    let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::End) && p.peek_kw_is(Keyword::If));
                    else_branch = Some(body);
                    break;
                } else {
                    break;
                }
            }
            if self.check_kw(Keyword::End) && self.peek_kw_is(Keyword::If) {
                self.advance();
                self.advance();
            } else {
                self.error("B0004", "missing END IF");
            }
            Stmt::If { cond, then_branch, else_ifs, else_branch, loc }
        } else {
            let then_branch = vec![self.parse_statement()];
            let mut else_ifs = Vec::new();
            let mut else_branch = None;
            self.skip_optional_label();
            if self.eat_kw(Keyword::Else) {
                self.skip_optional_label();
                else_branch = Some(vec![self.parse_statement()]);
            }
            Stmt::If { cond, then_branch, else_ifs, else_branch, loc }
        }
    }

    /// Single-line IF/ELSE may have a bare line-number label between the
    /// branch keyword and the statement (spec.md §4.2 "IF blocks").
    fn skip_optional_label(&mut self) {
        if let TokenKind::IntLiteral(_) = self.cur().kind {
            if matches!(self.toks.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Colon)) {
                self.advance();
                self.advance();
            }
        }
    }

    fn peek_kw_is(&self, kw: Keyword) -> bool {
        matches!(self.toks.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Keyword(k)) if *k == kw)
    }

    /// Statement sequencer (spec.md §4.2 "Statement sequencer" / §9): gathers
    /// statements, each optionally colon-chained, until `terminator` fires
    /// or `Eof` is hit. Never consumes `Eof`.
    fn parse_stmt_list_until(&mut self, terminator: impl Fn(&Parser) -> bool) -> Vec<Stmt> {
        let mut out = Vec::new();
        loop {
            self.skip_separators();
            if self.is_eof() || terminator(self) {
                break;
            }
            out.push(self.parse_statement());
            if matches!(self.cur().kind, TokenKind::Colon) {
                continue;
            }
        }
        out
    }

    fn parse_select_case(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        self.expect_kw(Keyword::Case, "B0001", "'CASE' after SELECT");
        let selector = self.parse_expr();
        self.skip_newlines();

        let mut arms = Vec::new();
        let mut else_body = None;
        loop {
            self.skip_separators();
            if self.check_kw(Keyword::End) && self.peek_kw_is(Keyword::Select) {
                self.advance();
                self.advance();
                break;
            }
            if self.is_eof() {
                self.error("ERR_SelectCase_MissingEndSelect", "SELECT CASE missing END SELECT terminator");
                break;
            }
            if !self.eat_kw(Keyword::Case) {
                self.error("B0001", "expected CASE or END SELECT");
                self.sync_to_stmt_boundary();
                continue;
            }
            let arm_loc = self.cur_loc();
            if self.eat_kw(Keyword::Else) {
                self.skip_newlines();
                let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::Case) || (p.check_kw(Keyword::End) && p.peek_kw_is(Keyword::Select)));
                if else_body.is_some() {
                    self.diags.error("ERR_SelectCase_DuplicateElse", "duplicate CASE ELSE", SourceSpan::point(arm_loc));
                } else {
                    else_body = Some(body);
                }
                continue;
            }
            let (labels, ranges, relational, string_labels) = self.parse_case_label_list();
            if labels.is_empty() && ranges.is_empty() && relational.is_empty() && string_labels.is_empty() {
                self.diags.error("ERR_Case_EmptyLabelList", "CASE arm requires at least one label", SourceSpan::point(arm_loc));
            }
            self.skip_newlines();
            let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::Case) || (p.check_kw(Keyword::End) && p.peek_kw_is(Keyword::Select)));
            arms.push(CaseArm { labels, ranges, relational, string_labels, body, loc: arm_loc });
        }
        Stmt::SelectCase { selector, arms, else_body, loc }
    }

    fn parse_case_label_list(&mut self) -> (Vec<i64>, Vec<(i64, i64)>, Vec<(BinOp, i64)>, Vec<String>) {
        let mut labels = Vec::new();
        let mut ranges = Vec::new();
        let mut relational = Vec::new();
        let mut string_labels = Vec::new();
        loop {
            if let TokenKind::StringLiteral(s) = self.cur().kind.clone() {
                self.advance();
                string_labels.push(s);
            } else if self.eat_kw(Keyword::Is) {
                let op = self.parse_relop();
                let sign = if self.eat(TokenKind::Minus) { -1 } else { self.eat(TokenKind::Plus); 1 };
                let n = self.expect_int_literal();
                relational.push((op, sign * n));
            } else {
                let sign = if self.eat(TokenKind::Minus) { -1 } else { self.eat(TokenKind::Plus); 1 };
                let n = sign * self.expect_int_literal();
                if self.eat_kw(Keyword::To) {
                    let hi_sign = if self.eat(TokenKind::Minus) { -1 } else { self.eat(TokenKind::Plus); 1 };
                    let hi = hi_sign * self.expect_int_literal();
                    ranges.push((n, hi));
                } else {
                    labels.push(n);
                }
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        (labels, ranges, relational, string_labels)
    }

    fn parse_relop(&mut self) -> BinOp {
        match self.cur().kind {
            TokenKind::Eq => { self.advance(); BinOp::Eq }
            TokenKind::Ne => { self.advance(); BinOp::Ne }
            TokenKind::Lt => { self.advance(); BinOp::Lt }
            TokenKind::Le => { self.advance(); BinOp::Le }
            TokenKind::Gt => { self.advance(); BinOp::Gt }
            TokenKind::Ge => { self.advance(); BinOp::Ge }
            _ => {
                self.error("B0001", "expected a relational operator after IS");
                BinOp::Eq
            }
        }
    }

    fn expect_int_literal(&mut self) -> i64 {
        if let TokenKind::IntLiteral(n) = self.cur().kind {
            self.advance();
            n
        } else {
            self.error("B0001", "expected an integer literal in CASE label");
            0
        }
    }

    // ---- loops -----------------------------------------------------------

    fn parse_while(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let cond = self.parse_expr();
        self.skip_newlines();
        let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::Wend));
        if !self.eat_kw(Keyword::Wend) {
            self.error("B0001", "missing WEND");
        }
        Stmt::While { cond, body, loc }
    }

    fn parse_do(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let (pre, pre_cond) = self.parse_do_test_clause(true);
        self.skip_newlines();
        let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::Loop));
        if !self.eat_kw(Keyword::Loop) {
            self.error("B0001", "missing LOOP");
        }
        let (post, post_cond) = self.parse_do_test_clause(false);
        if pre != DoTestKind::None && post != DoTestKind::None {
            self.diags.error("B0001", "DO loop cannot have both a pre-test and a post-test", SourceSpan::point(loc));
        }
        Stmt::Do { pre, pre_cond, body, post, post_cond, loc }
    }

    fn parse_do_test_clause(&mut self, is_pre: bool) -> (DoTestKind, Option<Expr>) {
        if self.eat_kw(Keyword::While) {
            let kind = if is_pre { DoTestKind::PreWhile } else { DoTestKind::PostWhile };
            (kind, Some(self.parse_expr()))
        } else if self.eat_kw(Keyword::Until) {
            let kind = if is_pre { DoTestKind::PreUntil } else { DoTestKind::PostUntil };
            (kind, Some(self.parse_expr()))
        } else {
            (DoTestKind::None, None)
        }
    }

    fn parse_for(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let var = self.ident_name().unwrap_or_default();
        self.eat(TokenKind::Eq);
        let start = self.parse_expr();
        self.expect_kw(Keyword::To, "B0001", "'TO' in FOR statement");
        let end = self.parse_expr();
        let step = if self.eat_kw(Keyword::Step) { Some(self.parse_expr()) } else { None };
        self.skip_newlines();
        let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::Next));
        let mut next_var = None;
        if self.eat_kw(Keyword::Next) {
            next_var = self.ident_name();
        } else {
            self.error("B0001", "missing NEXT");
        }
        Stmt::For { var, start, end, step, body, next_var, loc }
    }

    fn parse_next(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        self.ident_name();
        Stmt::Next { loc }
    }

    fn parse_exit(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let kind = if self.eat_kw(Keyword::For) {
            LoopKind::For
        } else if self.eat_kw(Keyword::While) {
            LoopKind::While
        } else if self.eat_kw(Keyword::Do) {
            LoopKind::Do
        } else {
            self.error("B0002", "expected FOR, WHILE, or DO after EXIT");
            LoopKind::For
        };
        Stmt::Exit { kind, loc }
    }

    // ---- GOTO / GOSUB / RETURN / ON ERROR / RESUME -----------------------

    fn parse_goto(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let target = self.parse_label_ref();
        Stmt::Goto { target, loc }
    }

    fn parse_gosub(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let target = self.parse_label_ref();
        Stmt::Gosub { target, loc }
    }

    fn parse_label_ref(&mut self) -> String {
        if let TokenKind::IntLiteral(n) = self.cur().kind {
            self.advance();
            n.to_string()
        } else if let Some(name) = self.ident_name() {
            name
        } else {
            self.error("B0001", "expected a label");
            String::new()
        }
    }

    fn parse_return(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let expr = if matches!(self.cur().kind, TokenKind::Newline | TokenKind::Colon | TokenKind::Eof) {
            None
        } else {
            Some(self.parse_expr())
        };
        Stmt::Return { expr, is_gosub_return: false, loc }
    }

    fn parse_on_error(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        self.expect_kw(Keyword::Error, "B0001", "'ERROR' after ON");
        self.expect_kw(Keyword::Goto, "B0001", "'GOTO' after ON ERROR");
        if let TokenKind::IntLiteral(0) = self.cur().kind {
            self.advance();
            Stmt::OnErrorGoto { target: None, loc }
        } else {
            let target = self.parse_label_ref();
            Stmt::OnErrorGoto { target: Some(target), loc }
        }
    }

    fn parse_resume(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        if self.eat_kw(Keyword::Next) {
            Stmt::Resume { mode: ResumeMode::Next, label: None, loc }
        } else if matches!(self.cur().kind, TokenKind::Identifier(_) | TokenKind::IntLiteral(_)) {
            let label = self.parse_label_ref();
            Stmt::Resume { mode: ResumeMode::Label, label: Some(label), loc }
        } else {
            Stmt::Resume { mode: ResumeMode::Here, label: None, loc }
        }
    }

    // ---- misc statements ---------------------------------------------

    fn parse_end(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        Stmt::End { loc }
    }

    fn parse_randomize(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let seed = if matches!(self.cur().kind, TokenKind::Newline | TokenKind::Colon | TokenKind::Eof) {
            None
        } else {
            Some(self.parse_expr())
        };
        Stmt::Randomize { seed, loc }
    }

    fn parse_color(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let fg = self.parse_expr();
        let bg = if self.eat(TokenKind::Comma) { Some(self.parse_expr()) } else { None };
        Stmt::Color { fg, bg, loc }
    }

    fn parse_locate(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let row = self.parse_expr();
        self.eat(TokenKind::Comma);
        let col = self.parse_expr();
        Stmt::Locate { row, col, loc }
    }

    fn parse_cursor(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let visible = self.parse_expr();
        Stmt::Cursor { visible, loc }
    }

    fn parse_altscreen(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let enabled = self.parse_expr();
        Stmt::AltScreen { enabled, loc }
    }

    fn parse_sleep(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let millis = self.parse_expr();
        Stmt::Sleep { millis, loc }
    }

    fn parse_call(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        let callee = self.ident_name().unwrap_or_default();
        let args = if self.eat(TokenKind::LParen) {
            let args = self.parse_arg_list();
            self.eat(TokenKind::RParen);
            args
        } else {
            self.parse_call_args_no_parens()
        };
        Stmt::Call { callee, args, loc }
    }

    fn parse_call_args_no_parens(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if matches!(self.cur().kind, TokenKind::Newline | TokenKind::Colon | TokenKind::Eof) {
            return args;
        }
        args.push(self.parse_expr());
        while self.eat(TokenKind::Comma) {
            args.push(self.parse_expr());
        }
        args
    }

    fn parse_try(&mut self, loc: SourceLoc) -> Stmt {
        self.advance();
        self.skip_newlines();
        let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::Catch));
        let mut catch_body = Vec::new();
        if self.eat_kw(Keyword::Catch) {
            self.skip_newlines();
            catch_body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::End) && p.peek_kw_is(Keyword::Try));
        }
        if self.check_kw(Keyword::End) && self.peek_kw_is(Keyword::Try) {
            self.advance();
            self.advance();
        } else {
            self.error("B0001", "missing END TRY");
        }
        if body.is_empty() && catch_body.is_empty() {
            self.diags.warning("B3203", "empty TRY/CATCH", SourceSpan::point(loc));
        }
        Stmt::Try { body, catch_body, loc }
    }

    // ---- procedures --------------------------------------------------

    fn parse_proc_decl(&mut self) -> Option<ProcDecl> {
        let loc = self.cur_loc();
        let is_function = self.check_kw(Keyword::Function);
        self.advance();
        let name = self.ident_name().unwrap_or_default();
        let mut params = Vec::new();
        if self.eat(TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                loop {
                    params.push(self.parse_param());
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.eat(TokenKind::RParen);
        }
        let mut return_type = String::new();
        if self.eat_kw(Keyword::As) {
            return_type = self.ident_name().unwrap_or_default();
            if !is_function {
                self.error("B4007", "SUB cannot declare a return type with AS");
            }
        }
        self.skip_newlines();
        let end_kw = if is_function { Keyword::Function } else { Keyword::Sub };
        let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::End) && p.peek_kw_is(end_kw));
        if self.check_kw(Keyword::End) && self.peek_kw_is(end_kw) {
            self.advance();
            self.advance();
        } else {
            self.error("B0001", if is_function { "missing END FUNCTION" } else { "missing END SUB" });
        }
        Some(ProcDecl { name, is_function, params, return_type, body, loc })
    }

    fn parse_param(&mut self) -> Param {
        let name = self.ident_name().unwrap_or_default();
        let mut is_array = false;
        if self.eat(TokenKind::LParen) {
            is_array = true;
            self.eat(TokenKind::RParen);
        }
        let mut ty = None;
        if self.eat_kw(Keyword::As) {
            ty = self.ident_name();
        }
        Param { name, ty, is_array }
    }

    // ---- OOP: class / interface / namespace / using --------------------

    fn parse_class_decl(&mut self) -> Option<Stmt> {
        let loc = self.cur_loc();
        self.advance();
        let name = self.ident_name().unwrap_or_default();
        let mut base = None;
        if self.eat_kw(Keyword::As) {
            base = self.ident_name();
        }
        let mut interfaces = Vec::new();
        while self.eat(TokenKind::Comma) {
            if let Some(i) = self.ident_name() {
                interfaces.push(i);
            }
        }
        self.skip_newlines();
        let mut members = Vec::new();
        loop {
            self.skip_separators();
            if self.check_kw(Keyword::End) && self.peek_kw_is(Keyword::Class) {
                self.advance();
                self.advance();
                break;
            }
            if self.is_eof() {
                self.error("B0001", "missing END CLASS");
                break;
            }
            if self.check_kw(Keyword::Sub) || self.check_kw(Keyword::Function) {
                if let Some(p) = self.parse_proc_decl() {
                    members.push(Stmt::ProcDecl(p));
                }
            } else if self.check_kw(Keyword::Dim) {
                let dim_loc = self.cur_loc();
                members.push(self.parse_dim(dim_loc));
            } else {
                members.push(self.parse_statement());
            }
        }
        Some(Stmt::ClassDecl { name, base, interfaces, members, loc })
    }

    /// `analyzeInterfaceDecl` in the original performs no structural
    /// validation beyond recording the declaration; this parser mirrors
    /// that by collecting method signatures without checking bodies
    /// (spec.md §9 "hook for future validation").
    fn parse_interface_decl(&mut self) -> Option<Stmt> {
        let loc = self.cur_loc();
        self.advance();
        let name = self.ident_name().unwrap_or_default();
        self.skip_newlines();
        let mut methods = Vec::new();
        loop {
            self.skip_separators();
            if self.check_kw(Keyword::End) && self.peek_kw_is(Keyword::Interface) {
                self.advance();
                self.advance();
                break;
            }
            if self.is_eof() {
                self.error("B0001", "missing END INTERFACE");
                break;
            }
            if self.check_kw(Keyword::Sub) || self.check_kw(Keyword::Function) {
                let sig_loc = self.cur_loc();
                let is_function = self.check_kw(Keyword::Function);
                self.advance();
                let name = self.ident_name().unwrap_or_default();
                let mut params = Vec::new();
                if self.eat(TokenKind::LParen) {
                    if !self.check(&TokenKind::RParen) {
                        loop {
                            params.push(self.parse_param());
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.eat(TokenKind::RParen);
                }
                let mut return_type = String::new();
                if self.eat_kw(Keyword::As) {
                    return_type = self.ident_name().unwrap_or_default();
                }
                methods.push(ProcDecl { name, is_function, params, return_type, body: vec![], loc: sig_loc });
            } else {
                self.advance();
            }
        }
        Some(Stmt::InterfaceDecl { name, methods, loc })
    }

    fn parse_namespace_decl(&mut self) -> Option<Stmt> {
        let loc = self.cur_loc();
        self.advance();
        let name = self.parse_qualified_name();
        if name == "Viper" {
            self.diags.error("E_NS_002", "the root namespace 'Viper' is reserved", SourceSpan::point(loc));
        }
        self.skip_newlines();
        let body = self.parse_stmt_list_until(|p| p.check_kw(Keyword::End) && p.peek_kw_is(Keyword::Namespace));
        if self.check_kw(Keyword::End) && self.peek_kw_is(Keyword::Namespace) {
            self.advance();
            self.advance();
        } else {
            self.error("B0001", "missing END NAMESPACE");
        }
        Some(Stmt::NamespaceDecl { name, body, loc })
    }

    fn parse_using_decl(&mut self) -> Option<Stmt> {
        let loc = self.cur_loc();
        self.advance();
        let name = self.parse_qualified_name();
        if name == "Viper" {
            self.diags.error("E_NS_002", "the root namespace 'Viper' is reserved", SourceSpan::point(loc));
        } else {
            self.using_namespaces.insert(name.clone());
        }
        Some(Stmt::UsingDecl { name, loc })
    }

    fn parse_qualified_name(&mut self) -> String {
        let mut parts = vec![self.ident_name().unwrap_or_default()];
        while self.eat(TokenKind::Dot) {
            parts.push(self.ident_name().unwrap_or_default());
        }
        parts.join(".")
    }

    // ---- expressions -----------------------------------------------------

    fn parse_expr(&mut self) -> Expr {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Expr {
        let mut lhs = self.parse_and();
        loop {
            let op = if self.check_kw(Keyword::Or) {
                BinOp::Or
            } else if self.check_kw(Keyword::OrElse) {
                BinOp::OrElse
            } else {
                break;
            };
            let loc = self.cur_loc();
            self.advance();
            let rhs = self.parse_and();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        lhs
    }

    fn parse_and(&mut self) -> Expr {
        let mut lhs = self.parse_not();
        loop {
            let op = if self.check_kw(Keyword::And) {
                BinOp::And
            } else if self.check_kw(Keyword::AndAlso) {
                BinOp::AndAlso
            } else {
                break;
            };
            let loc = self.cur_loc();
            self.advance();
            let rhs = self.parse_not();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        lhs
    }

    fn parse_not(&mut self) -> Expr {
        if self.check_kw(Keyword::Not) {
            let loc = self.cur_loc();
            self.advance();
            let operand = self.parse_not();
            return Expr::Unary { op: UnOp::Not, operand: Box::new(operand), loc };
        }
        self.parse_relational()
    }

    fn parse_relational(&mut self) -> Expr {
        let mut lhs = self.parse_additive();
        loop {
            let op = match self.cur().kind {
                TokenKind::Eq => BinOp::Eq,
                TokenKind::Ne => BinOp::Ne,
                TokenKind::Lt => BinOp::Lt,
                TokenKind::Le => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::Ge => BinOp::Ge,
                _ => break,
            };
            let loc = self.cur_loc();
            self.advance();
            let rhs = self.parse_additive();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        lhs
    }

    fn parse_additive(&mut self) -> Expr {
        let mut lhs = self.parse_multiplicative();
        loop {
            let op = match self.cur().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            let loc = self.cur_loc();
            self.advance();
            let rhs = self.parse_multiplicative();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        lhs
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut lhs = self.parse_idiv_mod();
        loop {
            let op = match self.cur().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            let loc = self.cur_loc();
            self.advance();
            let rhs = self.parse_idiv_mod();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        lhs
    }

    fn parse_idiv_mod(&mut self) -> Expr {
        let mut lhs = self.parse_pow();
        loop {
            let op = if self.check(&TokenKind::Backslash) {
                BinOp::IDiv
            } else if self.check_kw(Keyword::Mod) {
                BinOp::Mod
            } else {
                break;
            };
            let loc = self.cur_loc();
            self.advance();
            let rhs = self.parse_pow();
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        lhs
    }

    /// Exponentiation is right-associative: `2 ^ 3 ^ 2 == 2 ^ (3 ^ 2)`.
    fn parse_pow(&mut self) -> Expr {
        let lhs = self.parse_unary();
        if self.check(&TokenKind::Caret) {
            let loc = self.cur_loc();
            self.advance();
            let rhs = self.parse_pow();
            return Expr::Binary { op: BinOp::Pow, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        lhs
    }

    fn parse_unary(&mut self) -> Expr {
        let loc = self.cur_loc();
        if self.eat(TokenKind::Minus) {
            let operand = self.parse_unary();
            return Expr::Unary { op: UnOp::Neg, operand: Box::new(operand), loc };
        }
        if self.eat(TokenKind::Plus) {
            let operand = self.parse_unary();
            return Expr::Unary { op: UnOp::Pos, operand: Box::new(operand), loc };
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Expr {
        let loc = self.cur_loc();
        match self.cur().kind.clone() {
            TokenKind::IntLiteral(n) => {
                self.advance();
                Expr::IntLit(n, loc)
            }
            TokenKind::FloatLiteral(f) => {
                self.advance();
                Expr::FloatLit(f, loc)
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Expr::StringLit(s, loc)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Expr::BoolLit(true, loc)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Expr::BoolLit(false, loc)
            }
            TokenKind::Keyword(Keyword::Me) => {
                self.advance();
                Expr::Me(loc)
            }
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                let type_name = self.ident_name().unwrap_or_default();
                let mut args = Vec::new();
                if self.eat(TokenKind::LParen) {
                    args = self.parse_arg_list();
                    self.eat(TokenKind::RParen);
                }
                self.parse_member_tail(Expr::New { type_name, args, loc })
            }
            TokenKind::Keyword(Keyword::LBound) => {
                self.advance();
                self.eat(TokenKind::LParen);
                let name = self.ident_name().unwrap_or_default();
                self.eat(TokenKind::RParen);
                Expr::LBound { name, loc }
            }
            TokenKind::Keyword(Keyword::UBound) => {
                self.advance();
                self.eat(TokenKind::LParen);
                let name = self.ident_name().unwrap_or_default();
                self.eat(TokenKind::RParen);
                Expr::UBound { name, loc }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.eat(TokenKind::RParen);
                self.parse_member_tail(inner)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                if let Some(builtin) = crate::basic::token::lookup_builtin(&name) {
                    let args = if self.eat(TokenKind::LParen) {
                        let args = self.parse_arg_list();
                        self.eat(TokenKind::RParen);
                        args
                    } else {
                        Vec::new()
                    };
                    return self.parse_member_tail(Expr::BuiltinCall { tag: builtin, args, loc });
                }
                self.parse_name_reference(name, loc)
            }
            _ => {
                self.error("B0001", format!("unexpected token '{}' in expression", self.cur().lexeme));
                Expr::IntLit(0, loc)
            }
        }
    }

    /// Resolves the `name`/`name(...)` ambiguity: a known procedure wins as
    /// a call, a `DIM`-declared name wins as an array index, otherwise a
    /// diagnostic suggests parentheses for an (as yet unknown) procedure
    /// call (spec.md §4.2 "Expression parsing").
    fn parse_name_reference(&mut self, name: String, loc: SourceLoc) -> Expr {
        if !self.check(&TokenKind::LParen) {
            return self.parse_member_tail(Expr::Var(name, loc));
        }
        if self.known_procs.contains(&name) {
            self.advance();
            let args = self.parse_arg_list();
            self.eat(TokenKind::RParen);
            return self.parse_member_tail(Expr::UserCall { callee: name, args, loc });
        }
        self.advance();
        let args = self.parse_arg_list();
        self.eat(TokenKind::RParen);
        if self.declared_arrays.contains(&name) {
            let index = args.into_iter().next().unwrap_or(Expr::IntLit(0, loc));
            return self.parse_member_tail(Expr::ArrayElem { name, index: Box::new(index), loc });
        }
        self.diags.warning(
            "B0001",
            format!("'{name}(' parses as a procedure call; declare '{name}' with DIM to index it as an array"),
            SourceSpan::point(loc),
        );
        self.parse_member_tail(Expr::UserCall { callee: name, args, loc })
    }

    fn parse_member_tail(&mut self, mut expr: Expr) -> Expr {
        loop {
            if !self.eat(TokenKind::Dot) {
                break;
            }
            let loc = self.cur_loc();
            let name = self.ident_name().unwrap_or_default();
            if self.eat(TokenKind::LParen) {
                let args = self.parse_arg_list();
                self.eat(TokenKind::RParen);
                expr = Expr::MethodCall { target: Box::new(expr), name, args, loc };
            } else {
                expr = Expr::Member { target: Box::new(expr), name, loc };
            }
        }
        expr
    }

    fn parse_arg_list(&mut self) -> Vec<Expr> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            return args;
        }
        args.push(self.parse_expr());
        while self.eat(TokenKind::Comma) {
            args.push(self.parse_expr());
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic::lexer::Lexer;
    use crate::source::FileId;

    fn parse(src: &str) -> (Program, DiagnosticEmitter) {
        let mut diags = DiagnosticEmitter::new();
        let tokens = Lexer::new(src, FileId(0)).scan(&mut diags);
        let program = parse_program(tokens, &mut diags);
        (program, diags)
    }

    #[test]
    fn parses_let_with_expression() {
        let (program, diags) = parse("10 LET A = 1 + 2 * 3\n");
        assert!(diags.is_clean());
        assert_eq!(program.main.len(), 1);
        assert_eq!(program.main[0].numeric_label, Some(10));
        match &program.main[0].stmt {
            Stmt::Let { expr, .. } => match expr {
                Expr::Binary { op: BinOp::Add, .. } => {}
                other => panic!("expected Add at top, got {other:?}"),
            },
            other => panic!("expected Let, got {other:?}"),
        }
    }

    #[test]
    fn precedence_multiplies_before_adds() {
        let (program, _) = parse("LET A = 2 + 3 * 4\n");
        match &program.main[0].stmt {
            Stmt::Let { expr: Expr::Binary { op: BinOp::Add, lhs, rhs, .. }, .. } => {
                assert!(matches!(**lhs, Expr::IntLit(2, _)));
                assert!(matches!(**rhs, Expr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn pow_is_right_associative() {
        let (program, _) = parse("LET A = 2 ^ 3 ^ 2\n");
        match &program.main[0].stmt {
            Stmt::Let { expr: Expr::Binary { op: BinOp::Pow, lhs, rhs, .. }, .. } => {
                assert!(matches!(**lhs, Expr::IntLit(2, _)));
                assert!(matches!(**rhs, Expr::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn multiline_if_without_end_if_emits_b0004_and_recovers() {
        let (program, diags) = parse("10 IF 1 THEN\n20 PRINT 1\n30 END\n");
        assert_eq!(diags.diagnostics().iter().filter(|d| d.code == "B0004").count(), 1);
        assert_eq!(program.main.len(), 1);
        match &program.main[0].stmt {
            Stmt::If { then_branch, .. } => assert_eq!(then_branch.len(), 2),
            other => panic!("expected If, got {other:?}"),
        }
    }

    #[test]
    fn select_case_parses_ranges_and_relational_arms() {
        let (program, diags) = parse("SELECT CASE X\nCASE 1 TO 5\nPRINT 1\nCASE IS > 10\nPRINT 2\nCASE ELSE\nPRINT 3\nEND SELECT\n");
        assert!(diags.is_clean());
        match &program.main[0].stmt {
            Stmt::SelectCase { arms, else_body, .. } => {
                assert_eq!(arms.len(), 2);
                assert_eq!(arms[0].ranges, vec![(1, 5)]);
                assert_eq!(arms[1].relational, vec![(BinOp::Gt, 10)]);
                assert!(else_body.is_some());
            }
            other => panic!("expected SelectCase, got {other:?}"),
        }
    }

    #[test]
    fn empty_case_label_list_is_diagnosed() {
        let (_, diags) = parse("SELECT CASE X\nCASE\nPRINT 1\nEND SELECT\n");
        assert_eq!(diags.diagnostics()[0].code, "ERR_Case_EmptyLabelList");
    }

    #[test]
    fn for_loop_parses_step_and_next_var() {
        let (program, diags) = parse("FOR I = 1 TO 10 STEP 2\nPRINT I\nNEXT I\n");
        assert!(diags.is_clean());
        match &program.main[0].stmt {
            Stmt::For { var, step, next_var, .. } => {
                assert_eq!(var, "I");
                assert!(step.is_some());
                assert_eq!(next_var.as_deref(), Some("I"));
            }
            other => panic!("expected For, got {other:?}"),
        }
    }

    #[test]
    fn function_declaration_records_params_and_return_type() {
        let (program, diags) = parse("FUNCTION ADD(A AS INTEGER, B AS INTEGER) AS INTEGER\nRETURN A + B\nEND FUNCTION\n");
        assert!(diags.is_clean());
        assert_eq!(program.procs.len(), 1);
        assert_eq!(program.procs[0].params.len(), 2);
        assert_eq!(program.procs[0].return_type, "INTEGER");
    }

    #[test]
    fn sub_with_as_type_emits_b4007() {
        let (_, diags) = parse("SUB FOO() AS INTEGER\nEND SUB\n");
        assert_eq!(diags.diagnostics()[0].code, "B4007");
    }

    #[test]
    fn known_procedure_call_without_parens_parses_as_call() {
        let (program, diags) = parse("SUB GREET(NAME AS STRING)\nPRINT NAME\nEND SUB\nGREET \"bob\"\n");
        assert!(diags.is_clean());
        match &program.main[0].stmt {
            Stmt::Call { callee, args, .. } => {
                assert_eq!(callee, "GREET");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn array_index_requires_prior_dim() {
        let (program, _) = parse("DIM A(10)\nLET A(1) = 5\n");
        match &program.main[1].stmt {
            Stmt::Let { target: Expr::ArrayElem { name, .. }, .. } => assert_eq!(name, "A"),
            other => panic!("expected array element assignment, got {other:?}"),
        }
    }
}
