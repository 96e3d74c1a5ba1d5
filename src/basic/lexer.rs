//! # BASIC lexer
//!
//! Scans source text into a flat [`Token`] stream using the shared
//! [`Cursor`](crate::cursor::Cursor). Unrecognised characters and
//! unterminated strings are reported through the diagnostic emitter but do
//! not stop the scan — the lexer always produces a token stream ending in
//! `Eof`, leaving statement-level recovery to the parser.

use crate::basic::token::{lookup_keyword, Token, TokenKind};
use crate::cursor::Cursor;
use crate::diag::DiagnosticEmitter;
use crate::source::{FileId, SourceLoc};

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    file: FileId,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, file: FileId) -> Self {
        Self { cursor: Cursor::new(text), file }
    }

    fn loc(&self) -> SourceLoc {
        let pos = self.cursor.pos();
        SourceLoc::new(self.file, pos.line, pos.col)
    }

    /// Scans the full token stream, always terminated by `Eof`.
    pub fn scan(mut self, diags: &mut DiagnosticEmitter) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.cursor.skip_whitespace();
            let loc = self.loc();
            let ch = self.cursor.peek();
            if ch == '\0' {
                tokens.push(Token::new(TokenKind::Eof, "", loc));
                break;
            }
            if ch == '\n' {
                self.cursor.advance();
                tokens.push(Token::new(TokenKind::Newline, "\n", loc));
                continue;
            }
            if ch == '\r' {
                self.cursor.advance();
                continue;
            }
            if ch == '\'' || (ch == 'R' && self.cursor.remaining().to_ascii_uppercase().starts_with("REM")
                && !self.cursor.remaining().as_bytes().get(3).is_some_and(|b| b.is_ascii_alphanumeric()))
            {
                self.skip_line_comment();
                continue;
            }
            if ch == '"' {
                tokens.push(self.scan_string(diags, loc));
                continue;
            }
            if ch.is_ascii_digit() {
                tokens.push(self.scan_number(loc));
                continue;
            }
            if ch.is_ascii_alphabetic() || ch == '_' {
                tokens.push(self.scan_word(loc));
                continue;
            }
            if let Some(tok) = self.scan_operator(loc) {
                tokens.push(tok);
                continue;
            }

            diags.error("B0001", format!("unexpected character '{ch}'"), crate::source::SourceSpan::point(loc));
            self.cursor.advance();
        }
        tokens
    }

    fn skip_line_comment(&mut self) {
        while !matches!(self.cursor.peek(), '\n' | '\0') {
            self.cursor.advance();
        }
    }

    fn scan_string(&mut self, diags: &mut DiagnosticEmitter, loc: SourceLoc) -> Token {
        self.cursor.advance(); // opening quote
        let mut raw = String::new();
        loop {
            match self.cursor.peek() {
                '"' => {
                    self.cursor.advance();
                    break;
                }
                '\0' | '\n' => {
                    diags.error("B0003", "unterminated string literal", crate::source::SourceSpan::point(loc));
                    break;
                }
                '\\' => {
                    raw.push(self.cursor.advance());
                    if !matches!(self.cursor.peek(), '\0' | '\n') {
                        raw.push(self.cursor.advance());
                    }
                }
                c => {
                    raw.push(c);
                    self.cursor.advance();
                }
            }
        }
        let decoded = crate::il::escape::decode(&raw).unwrap_or_else(|_| {
            diags.error("B0003", "invalid escape sequence in string literal", crate::source::SourceSpan::point(loc));
            raw.as_bytes().to_vec()
        });
        let text = String::from_utf8_lossy(&decoded).into_owned();
        Token::new(TokenKind::StringLiteral(text.clone()), format!("\"{raw}\""), loc)
    }

    fn scan_number(&mut self, loc: SourceLoc) -> Token {
        let mut lexeme = String::new();
        while self.cursor.peek().is_ascii_digit() {
            lexeme.push(self.cursor.advance());
        }
        let mut is_float = false;
        if self.cursor.peek() == '.' && self.cursor.peek_at(1).is_ascii_digit() {
            is_float = true;
            lexeme.push(self.cursor.advance());
            while self.cursor.peek().is_ascii_digit() {
                lexeme.push(self.cursor.advance());
            }
        }
        if matches!(self.cursor.peek(), 'e' | 'E') {
            let save = self.cursor.pos();
            let mut exp = String::new();
            exp.push(self.cursor.advance());
            if matches!(self.cursor.peek(), '+' | '-') {
                exp.push(self.cursor.advance());
            }
            if self.cursor.peek().is_ascii_digit() {
                while self.cursor.peek().is_ascii_digit() {
                    exp.push(self.cursor.advance());
                }
                lexeme.push_str(&exp);
                is_float = true;
            } else {
                self.cursor.seek(save);
            }
        }
        // Trailing type-suffix sigil is consumed as part of the lexeme but
        // does not change the literal's numeric kind; the analyzer applies
        // suffix-driven default typing to the *variable* it's attached to,
        // not to bare numeric literals.
        if matches!(self.cursor.peek(), '#' | '!') {
            is_float = true;
            self.cursor.advance();
        } else if matches!(self.cursor.peek(), '%' | '&') {
            self.cursor.advance();
        }

        if is_float {
            let value: f64 = lexeme.parse().unwrap_or(0.0);
            Token::new(TokenKind::FloatLiteral(value), lexeme, loc)
        } else {
            let value: i64 = lexeme.parse().unwrap_or(0);
            Token::new(TokenKind::IntLiteral(value), lexeme, loc)
        }
    }

    fn scan_word(&mut self, loc: SourceLoc) -> Token {
        let mut name = String::new();
        self.cursor.consume_identifier(&mut name);
        if let Some(kw) = lookup_keyword(&name) {
            Token::new(TokenKind::Keyword(kw), name, loc)
        } else {
            Token::new(TokenKind::Identifier(name.clone()), name, loc)
        }
    }

    fn scan_operator(&mut self, loc: SourceLoc) -> Option<Token> {
        let two = (self.cursor.peek(), self.cursor.peek_at(1));
        let (kind, len) = match two {
            ('<', '>') => (TokenKind::Ne, 2),
            ('<', '=') => (TokenKind::Le, 2),
            ('>', '=') => (TokenKind::Ge, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('\\', _) => (TokenKind::Backslash, 1),
            ('^', _) => (TokenKind::Caret, 1),
            ('=', _) => (TokenKind::Eq, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            (',', _) => (TokenKind::Comma, 1),
            (':', _) => (TokenKind::Colon, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            ('#', _) => (TokenKind::Hash, 1),
            ('.', _) => (TokenKind::Dot, 1),
            ('@', _) => (TokenKind::At, 1),
            _ => return None,
        };
        let mut lexeme = String::new();
        for _ in 0..len {
            lexeme.push(self.cursor.advance());
        }
        Some(Token::new(kind, lexeme, loc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> (Vec<Token>, DiagnosticEmitter) {
        let mut diags = DiagnosticEmitter::new();
        let tokens = Lexer::new(src, FileId(0)).scan(&mut diags);
        (tokens, diags)
    }

    #[test]
    fn scans_let_statement() {
        let (tokens, diags) = scan("LET A = 1\n");
        assert!(diags.is_clean());
        let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
        assert!(matches!(kinds[0], TokenKind::Keyword(_)));
        assert!(matches!(kinds[1], TokenKind::Identifier(n) if n == "A"));
        assert!(matches!(kinds[2], TokenKind::Eq));
        assert!(matches!(kinds[3], TokenKind::IntLiteral(1)));
    }

    #[test]
    fn distinguishes_int_and_float_literals() {
        let (tokens, _) = scan("10 3.5 1e3 2.0e-2");
        assert!(matches!(tokens[0].kind, TokenKind::IntLiteral(10)));
        assert!(matches!(tokens[1].kind, TokenKind::FloatLiteral(v) if (v - 3.5).abs() < 1e-9));
        assert!(matches!(tokens[2].kind, TokenKind::FloatLiteral(v) if (v - 1000.0).abs() < 1e-9));
        assert!(matches!(tokens[3].kind, TokenKind::FloatLiteral(v) if (v - 0.02).abs() < 1e-9));
    }

    #[test]
    fn scans_escaped_string_literal() {
        let (tokens, diags) = scan("\"hi\\nthere\"");
        assert!(diags.is_clean());
        assert!(matches!(&tokens[0].kind, TokenKind::StringLiteral(s) if s == "hi\nthere"));
    }

    #[test]
    fn unterminated_string_emits_b0003() {
        let (_, diags) = scan("\"oops");
        assert_eq!(diags.error_count(), 1);
        assert_eq!(diags.diagnostics()[0].code, "B0003");
    }

    #[test]
    fn rem_comment_and_quote_comment_are_skipped() {
        let (tokens, _) = scan("10 REM a comment\n20 ' also a comment\n30 END\n");
        let lexemes: Vec<_> = tokens.iter().map(|t| t.lexeme.as_str()).collect();
        assert!(!lexemes.iter().any(|l| l.contains("comment")));
    }

    #[test]
    fn ne_le_ge_are_two_character_operators() {
        let (tokens, _) = scan("<> <= >=");
        assert!(matches!(tokens[0].kind, TokenKind::Ne));
        assert!(matches!(tokens[1].kind, TokenKind::Le));
        assert!(matches!(tokens[2].kind, TokenKind::Ge));
    }
}
