//! # Text cursor
//!
//! A zero-allocation scanner over a character buffer, shared by the IL
//! textual codec and the BASIC lexer. Generalizes the teacher's
//! `lexer::cursor::Cursor` (which only needed `advance`/`peek`/position
//! tracking for LC-3's simple token shapes) with the identifier/number/
//! keyword helpers the BASIC and IL grammars both need.
//!
//! All failure paths leave the cursor untouched: every `consume_*` method
//! either succeeds and advances, or returns `false`/`None` having moved the
//! cursor by zero bytes.

/// Cursor position: byte offset plus derived 1-based line / 0-based column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

/// A lightweight, non-owning cursor over source text.
///
/// Operates on bytes rather than `Vec<char>`: source text is required to be
/// ASCII outside string literals (spec.md §6), so byte offset and character
/// index coincide and no per-source allocation is needed.
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: Pos,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { bytes: text.as_bytes(), pos: Pos { offset: 0, line: 1, col: 0 } }
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn offset(&self) -> usize {
        self.pos.offset
    }

    pub fn is_at_end(&self) -> bool {
        self.pos.offset >= self.bytes.len()
    }

    /// Returns the current character, or `'\0'` at end of input.
    pub fn peek(&self) -> char {
        self.bytes.get(self.pos.offset).copied().map(|b| b as char).unwrap_or('\0')
    }

    /// Returns the character `n` bytes ahead of the cursor, or `'\0'` past
    /// the end.
    pub fn peek_at(&self, n: usize) -> char {
        self.bytes
            .get(self.pos.offset + n)
            .copied()
            .map(|b| b as char)
            .unwrap_or('\0')
    }

    /// Consumes one character and updates line/column. A newline resets
    /// column to 0 and increments line.
    pub fn advance(&mut self) -> char {
        let ch = self.peek();
        if self.pos.offset < self.bytes.len() {
            self.pos.offset += 1;
            if ch == '\n' {
                self.pos.line += 1;
                self.pos.col = 0;
            } else {
                self.pos.col += 1;
            }
        }
        ch
    }

    pub fn skip_whitespace(&mut self) {
        while matches!(self.peek(), ' ' | '\t') {
            self.advance();
        }
    }

    /// Consumes `c` if it is the current character. Never rewinds.
    pub fn consume(&mut self, c: char) -> bool {
        if self.peek() == c {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Alias kept for call sites that read more naturally as a conditional
    /// probe rather than a requirement.
    pub fn consume_if(&mut self, c: char) -> bool {
        self.consume(c)
    }

    /// Consumes characters while `pred` holds and returns the gathered text.
    pub fn consume_while(&mut self, mut pred: impl FnMut(char) -> bool) -> String {
        let mut out = String::new();
        while !self.is_at_end() && pred(self.peek()) {
            out.push(self.advance());
        }
        out
    }

    /// Consumes a qualified identifier: alphabetic or `_`/`.` start, then
    /// alphanumeric/`_`/`.`/`$` body. The `.` and `$` admission supports
    /// qualified names (`Ns.Type`) and BASIC's legacy type-suffix sigils.
    pub fn consume_identifier(&mut self, out: &mut String) -> bool {
        let start = self.pos;
        let first = self.peek();
        if !(first.is_ascii_alphabetic() || first == '_' || first == '.') {
            return false;
        }
        out.push(self.advance());
        while matches!(self.peek(), c if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$') {
            out.push(self.advance());
        }
        debug_assert!(self.pos.offset > start.offset);
        true
    }

    /// Consumes an optionally-signed run of digits.
    pub fn consume_number(&mut self, out: &mut String) -> bool {
        let start = self.pos;
        if matches!(self.peek(), '+' | '-') {
            out.push(self.peek());
            self.advance();
        }
        let digits_start = out.len();
        while self.peek().is_ascii_digit() {
            out.push(self.advance());
        }
        if out.len() == digits_start {
            self.seek(start);
            out.clear();
            return false;
        }
        true
    }

    /// Consumes `kw` only on a full-word boundary: the character following
    /// `kw` (if any) must not be identifier body, so `consume_keyword("END")`
    /// does not match a prefix of `ENDIF`.
    pub fn consume_keyword(&mut self, kw: &str) -> bool {
        let start = self.pos;
        for expect in kw.chars() {
            if self.peek().to_ascii_uppercase() != expect.to_ascii_uppercase() {
                self.seek(start);
                return false;
            }
            self.advance();
        }
        let next = self.peek();
        if next.is_ascii_alphanumeric() || next == '_' {
            self.seek(start);
            return false;
        }
        true
    }

    /// Moves the cursor to `offset`, recomputing line/column from the start
    /// of the buffer when seeking backward (forward seeks replay `advance`
    /// from the current position so line/col stay correct without a
    /// full rescan).
    pub fn seek(&mut self, target: Pos) {
        if target.offset >= self.pos.offset {
            while self.pos.offset < target.offset {
                self.advance();
            }
        } else {
            self.pos = Pos { offset: 0, line: 1, col: 0 };
            while self.pos.offset < target.offset {
                self.advance();
            }
        }
    }

    pub fn seek_offset(&mut self, offset: usize) {
        let offset = offset.min(self.bytes.len());
        if offset >= self.pos.offset {
            while self.pos.offset < offset {
                self.advance();
            }
        } else {
            self.pos = Pos { offset: 0, line: 1, col: 0 };
            while self.pos.offset < offset {
                self.advance();
            }
        }
    }

    pub fn remaining(&self) -> &'a str {
        std::str::from_utf8(&self.bytes[self.pos.offset..]).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_line_and_column() {
        let mut c = Cursor::new("ab\ncd");
        assert_eq!(c.advance(), 'a');
        assert_eq!(c.pos().col, 1);
        assert_eq!(c.advance(), 'b');
        assert_eq!(c.advance(), '\n');
        assert_eq!(c.pos().line, 2);
        assert_eq!(c.pos().col, 0);
        assert_eq!(c.advance(), 'c');
        assert_eq!(c.pos().col, 1);
    }

    #[test]
    fn consume_identifier_accepts_qualified_names_and_sigils() {
        let mut c = Cursor::new("Ns.Type$ rest");
        let mut out = String::new();
        assert!(c.consume_identifier(&mut out));
        assert_eq!(out, "Ns.Type$");
    }

    #[test]
    fn consume_number_accepts_sign_and_rewinds_on_failure() {
        let mut c = Cursor::new("-42x");
        let mut out = String::new();
        assert!(c.consume_number(&mut out));
        assert_eq!(out, "-42");

        let mut c2 = Cursor::new("abc");
        let mut out2 = String::new();
        let pos_before = c2.pos();
        assert!(!c2.consume_number(&mut out2));
        assert_eq!(c2.pos(), pos_before);
    }

    #[test]
    fn consume_keyword_requires_word_boundary() {
        let mut c = Cursor::new("ENDIF");
        assert!(!c.consume_keyword("END"));
        assert_eq!(c.offset(), 0);

        let mut c2 = Cursor::new("END IF");
        assert!(c2.consume_keyword("END"));
        assert_eq!(c2.offset(), 3);
    }

    #[test]
    fn seek_backward_recomputes_line_and_column() {
        let mut c = Cursor::new("abc\ndef");
        let start = c.pos();
        while c.peek() != 'd' {
            c.advance();
        }
        let mid = c.pos();
        assert_eq!(mid.line, 2);
        c.seek(start);
        assert_eq!(c.pos(), start);
        c.seek(mid);
        assert_eq!(c.pos(), mid);
    }

    #[test]
    fn never_allocates_beyond_consumed_text() {
        let mut c = Cursor::new("   \t  hello");
        c.skip_whitespace();
        assert_eq!(c.remaining(), "hello");
    }
}
