//! Line and column tracking cursor over CSS source text.
//!
//! The cursor is deliberately low-level: it never skips whitespace or
//! comments on its own, because whitespace is significant between selector
//! parts (the descendant combinator). Callers decide when to consume it.

use crate::error::{ErrorKind, ParseError};

/// A saved cursor position, restorable with [`Source::restore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    index: usize,
    line: i32,
    column: i32,
}

/// A character cursor over CSS source content.
///
/// Positions are 1-based. A newline increments the line and resets the
/// column; every other character advances the column by one.
#[derive(Debug)]
pub struct Source {
    chars: Vec<char>,
    index: usize,
    line: i32,
    column: i32,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '-' || c == '\\'
}

fn is_ident_char(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

impl Source {
    /// Creates a cursor over the given content, starting at line 1, column 1.
    pub fn new(content: &str) -> Self {
        Self::anchored(content, 1, 1)
    }

    /// Creates a cursor over a fragment that originally appeared at the
    /// given position, so units parsed out of it report document positions.
    pub fn anchored(content: &str, line: i32, column: i32) -> Self {
        Self { chars: content.chars().collect(), index: 0, line, column }
    }

    /// Current character index into the content.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Current 1-based line.
    pub fn line(&self) -> i32 {
        self.line
    }

    /// Current 1-based column.
    pub fn column(&self) -> i32 {
        self.column
    }

    /// True once every character has been consumed.
    pub fn eof(&self) -> bool {
        self.index >= self.chars.len()
    }

    /// The character under the cursor, if any.
    pub fn current(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    /// The character `offset` positions ahead of the cursor.
    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    /// Consumes and returns the character under the cursor.
    pub fn next(&mut self) -> Option<char> {
        let c = self.current()?;
        self.index += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consumes the given character if it is under the cursor. The cursor
    /// does not move on a mismatch.
    pub fn optionally(&mut self, c: char) -> bool {
        if self.current() == Some(c) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Consumes the given literal, ASCII case-insensitively, if it is fully
    /// present at the cursor. The cursor does not move on a mismatch.
    pub fn optionally_ignore_case(&mut self, literal: &str) -> bool {
        let snapshot = self.snapshot();
        for expected in literal.chars() {
            match self.next() {
                Some(c) if c.eq_ignore_ascii_case(&expected) => {}
                _ => {
                    self.restore(snapshot);
                    return false;
                }
            }
        }
        true
    }

    /// Consumes the given character or fails with a positional error.
    pub fn expect(&mut self, c: char, kind: ErrorKind) -> Result<(), ParseError> {
        if self.optionally(c) {
            Ok(())
        } else {
            Err(self.error(kind))
        }
    }

    /// Consumes characters while the predicate holds, returning them.
    pub fn chomp(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.current() {
            if !predicate(c) {
                break;
            }
            out.push(c);
            self.next();
        }
        out
    }

    /// Consumes whitespace.
    pub fn skip_whitespace(&mut self) {
        while matches!(self.current(), Some(c) if c.is_whitespace()) {
            self.next();
        }
    }

    /// Reads a CSS identifier, or returns `None` without moving the cursor.
    ///
    /// The first character must be a letter, `_`, `-` or `\`; subsequent
    /// characters additionally allow digits. A lone `-` not followed by
    /// another identifier character is not an identifier.
    pub fn read_ident(&mut self) -> Option<String> {
        let first = self.current()?;
        if !is_ident_start(first) {
            return None;
        }
        if first == '-' && !matches!(self.peek_at(1), Some(c) if is_ident_char(c)) {
            return None;
        }
        Some(self.chomp(is_ident_char))
    }

    /// Reads a quoted string, returning the quote character and the content
    /// between the quotes. Backslash escapes are kept verbatim and are
    /// opaque to this layer. Returns `None` without moving the cursor if no
    /// quote is present; fails with [`ErrorKind::UnclosedString`] if the
    /// string never terminates.
    pub fn read_string(&mut self) -> Result<Option<(char, String)>, ParseError> {
        let quote = match self.current() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Ok(None),
        };
        let open = self.error(ErrorKind::UnclosedString);
        self.next();

        let mut content = String::new();
        loop {
            match self.next() {
                Some('\\') => {
                    content.push('\\');
                    if let Some(escaped) = self.next() {
                        content.push(escaped);
                    }
                }
                Some(c) if c == quote => return Ok(Some((quote, content))),
                Some(c) => content.push(c),
                None => return Err(open),
            }
        }
    }

    /// Reads a numeric value (optional sign, digits, optional fraction),
    /// returning its verbatim text, or `None` without moving the cursor.
    pub fn read_number(&mut self) -> Option<String> {
        let snapshot = self.snapshot();
        let mut text = String::new();

        if let Some(sign @ ('+' | '-')) = self.current() {
            text.push(sign);
            self.next();
        }

        let integral = self.chomp(|c| c.is_ascii_digit());
        text.push_str(&integral);

        if self.current() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.next();
            text.push('.');
            text.push_str(&self.chomp(|c| c.is_ascii_digit()));
        } else if integral.is_empty() {
            self.restore(snapshot);
            return None;
        }

        Some(text)
    }

    /// Consumes a run of whitespace and `/* ... */` comments, pushing each
    /// comment body (delimiters stripped) into the buffer. An unterminated
    /// comment at end of input is consumed silently; comments never produce
    /// errors.
    pub fn collect_comments(&mut self, buffer: &mut Vec<String>) {
        loop {
            self.skip_whitespace();
            if self.current() == Some('/') && self.peek_at(1) == Some('*') {
                self.next();
                self.next();
                let mut body = String::new();
                loop {
                    if self.eof() {
                        break;
                    }
                    if self.current() == Some('*') && self.peek_at(1) == Some('/') {
                        self.next();
                        self.next();
                        break;
                    }
                    body.push(self.next().unwrap());
                }
                buffer.push(body);
            } else {
                return;
            }
        }
    }

    /// Saves the exact cursor position.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot { index: self.index, line: self.line, column: self.column }
    }

    /// Restores a position previously saved with [`Source::snapshot`].
    pub fn restore(&mut self, snapshot: Snapshot) {
        self.index = snapshot.index;
        self.line = snapshot.line;
        self.column = snapshot.column;
    }

    /// Creates a positional error of the given kind at the cursor.
    pub fn error(&self, kind: ErrorKind) -> ParseError {
        ParseError::new(kind, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut src = Source::new("ab\ncd");
        assert_eq!((src.line(), src.column()), (1, 1));
        src.next();
        assert_eq!((src.line(), src.column()), (1, 2));
        src.next();
        src.next();
        assert_eq!((src.line(), src.column()), (2, 1));
        src.next();
        assert_eq!((src.line(), src.column()), (2, 2));
    }

    #[test]
    fn optionally_does_not_move_on_mismatch() {
        let mut src = Source::new("abc");
        assert!(!src.optionally('x'));
        assert_eq!(src.index(), 0);
        assert!(src.optionally('a'));
        assert_eq!(src.index(), 1);
    }

    #[test]
    fn snapshot_restores_exactly() {
        let mut src = Source::new("a\nbc");
        src.next();
        src.next();
        let snapshot = src.snapshot();
        src.next();
        src.next();
        src.restore(snapshot);
        assert_eq!(src.index(), 2);
        assert_eq!((src.line(), src.column()), (2, 1));
    }

    #[test]
    fn reads_identifiers() {
        let mut src = Source::new("border-radius:");
        assert_eq!(src.read_ident().as_deref(), Some("border-radius"));
        assert_eq!(src.current(), Some(':'));
    }

    #[test]
    fn reads_hyphen_led_identifiers() {
        let mut src = Source::new("-moz-calc(");
        assert_eq!(src.read_ident().as_deref(), Some("-moz-calc"));
    }

    #[test]
    fn rejects_non_identifiers_without_advancing() {
        let mut src = Source::new("123abc");
        assert_eq!(src.read_ident(), None);
        assert_eq!(src.index(), 0);

        let mut src = Source::new("- x");
        assert_eq!(src.read_ident(), None);
        assert_eq!(src.index(), 0);
    }

    #[test]
    fn reads_strings_with_opaque_escapes() {
        let mut src = Source::new(r#""a\"b" rest"#);
        let (quote, content) = src.read_string().unwrap().unwrap();
        assert_eq!(quote, '"');
        assert_eq!(content, r#"a\"b"#);
        assert_eq!(src.current(), Some(' '));
    }

    #[test]
    fn unclosed_string_is_an_error() {
        let mut src = Source::new("'abc");
        let err = src.read_string().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnclosedString);
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn reads_numbers() {
        let mut src = Source::new("10.5em");
        assert_eq!(src.read_number().as_deref(), Some("10.5"));
        assert_eq!(src.current(), Some('e'));

        let mut src = Source::new("-3px");
        assert_eq!(src.read_number().as_deref(), Some("-3"));

        let mut src = Source::new(".5");
        assert_eq!(src.read_number(), None);
        assert_eq!(src.index(), 0);
    }

    #[test]
    fn collects_comments_and_whitespace() {
        let mut buffer = Vec::new();
        let mut src = Source::new("  /* one */\n/*two*/ .class");
        src.collect_comments(&mut buffer);
        assert_eq!(buffer, vec![" one ".to_string(), "two".to_string()]);
        assert_eq!(src.current(), Some('.'));
    }

    #[test]
    fn unterminated_comment_is_tolerated() {
        let mut buffer = Vec::new();
        let mut src = Source::new("/* dangling");
        src.collect_comments(&mut buffer);
        assert!(src.eof());
        assert_eq!(buffer, vec![" dangling".to_string()]);
    }

    #[test]
    fn anchored_positions_offset_into_the_document() {
        let mut src = Source::anchored("abc", 4, 10);
        src.next();
        assert_eq!((src.line(), src.column()), (4, 11));
    }

    #[test]
    fn case_insensitive_literal_match() {
        let mut src = Source::new("IMPORTANT;");
        assert!(src.optionally_ignore_case("important"));
        assert_eq!(src.current(), Some(';'));

        let mut src = Source::new("imp");
        assert!(!src.optionally_ignore_case("important"));
        assert_eq!(src.index(), 0);
    }
}
