//! # Source locations and the source map
//!
//! Defines the location types shared by every layer (lexer, parser, analyzer,
//! IL codec) and a small map from file id to the underlying text, used to
//! render caret diagnostics.

use std::fmt;

/// Identifies one source file registered with a [`SourceMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A single point in source text: file, 1-based line, 0-based column.
///
/// `FileId(u32::MAX)` combined with `line == 0` is the sentinel "no location"
/// value, distinguishable from any real location (lines are always >= 1 once
/// a location has been observed from source).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    pub file: FileId,
    pub line: u32,
    pub col: u32,
}

impl SourceLoc {
    pub const fn new(file: FileId, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }

    /// The empty/invalid location sentinel.
    pub const fn invalid() -> Self {
        Self { file: FileId(u32::MAX), line: 0, col: 0 }
    }

    pub const fn is_valid(&self) -> bool {
        self.line != 0
    }
}

impl Default for SourceLoc {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}:{}", self.line, self.col)
        } else {
            write!(f, "<unknown>")
        }
    }
}

/// An inclusive pair of [`SourceLoc`]s spanning a lexeme, expression, or
/// statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    pub start: SourceLoc,
    pub end: SourceLoc,
}

impl SourceSpan {
    pub const fn new(start: SourceLoc, end: SourceLoc) -> Self {
        Self { start, end }
    }

    pub const fn point(loc: SourceLoc) -> Self {
        Self { start: loc, end: loc }
    }

    pub const fn invalid() -> Self {
        Self { start: SourceLoc::invalid(), end: SourceLoc::invalid() }
    }

    pub const fn is_valid(&self) -> bool {
        self.start.is_valid()
    }
}

impl Default for SourceSpan {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

/// Maps a [`FileId`] to the file's path and full text, so diagnostics can
/// render a caret under the offending column.
#[derive(Debug, Default, Clone)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

#[derive(Debug, Clone)]
struct SourceFile {
    path: String,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Registers a new file and returns its id.
    pub fn add_file(&mut self, path: impl Into<String>, text: impl Into<String>) -> FileId {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        self.files.push(SourceFile { path: path.into(), text, line_starts });
        FileId((self.files.len() - 1) as u32)
    }

    pub fn path(&self, file: FileId) -> Option<&str> {
        self.files.get(file.0 as usize).map(|f| f.path.as_str())
    }

    pub fn text(&self, file: FileId) -> Option<&str> {
        self.files.get(file.0 as usize).map(|f| f.text.as_str())
    }

    /// Returns the full text of the 1-based `line` within `file`, without the
    /// trailing newline, for caret rendering.
    pub fn line_text(&self, file: FileId, line: u32) -> Option<&str> {
        let f = self.files.get(file.0 as usize)?;
        let idx = line.checked_sub(1)? as usize;
        let start = *f.line_starts.get(idx)?;
        let end = f
            .line_starts
            .get(idx + 1)
            .map(|&e| e.saturating_sub(1))
            .unwrap_or(f.text.len());
        let end = end.min(f.text.len());
        Some(f.text[start..end].trim_end_matches('\r'))
    }

    /// Renders a two-line "source line" + "caret" block for `loc`.
    pub fn render_caret(&self, loc: SourceLoc) -> String {
        match self.line_text(loc.file, loc.line) {
            Some(text) => {
                let col = loc.col as usize;
                let mut caret = " ".repeat(col);
                caret.push('^');
                format!("{text}\n{caret}")
            }
            None => String::new(),
        }
    }
}

fn compute_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_sentinel_is_distinguishable() {
        assert!(!SourceLoc::invalid().is_valid());
        assert!(SourceLoc::new(FileId(0), 1, 0).is_valid());
    }

    #[test]
    fn line_text_strips_trailing_newline() {
        let mut map = SourceMap::new();
        let id = map.add_file("a.bas", "10 LET A = 1\n20 END\n");
        assert_eq!(map.line_text(id, 1), Some("10 LET A = 1"));
        assert_eq!(map.line_text(id, 2), Some("20 END"));
        assert_eq!(map.line_text(id, 3), None);
    }

    #[test]
    fn caret_points_at_column() {
        let mut map = SourceMap::new();
        let id = map.add_file("a.bas", "LET X = 1");
        let rendered = map.render_caret(SourceLoc::new(id, 1, 4));
        let mut lines = rendered.lines();
        assert_eq!(lines.next(), Some("LET X = 1"));
        assert_eq!(lines.next(), Some("    ^"));
    }
}
