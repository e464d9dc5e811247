//! Character scanner.
use itertools::{multipeek, MultiPeek};
use std::str::CharIndices;

/// Character returned by the cursor once the source is exhausted.
///
/// Source text may contain a literal null character, so
/// [`Cursor::at_end`] is the authority on end-of-file.
pub const EOF_CHAR: char = '\0';

/// Wrapper for source code that keeps a cursor position.
///
/// Allows forward lookup via peeking.
pub struct Cursor<'a> {
    /// Iterator over UTF-8 encoded source code.
    ///
    /// `MultiPeek` advances an internal peek cursor on each call
    /// to `peek()`, which is reset on `next()` or `reset_peek()`.
    chars: MultiPeek<CharIndices<'a>>,
    /// Byte position and value of the current character.
    current: (usize, char),
    /// Number of bytes in source.
    len: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: multipeek(source.char_indices()),
            current: (0, EOF_CHAR),
            len: source.len(),
            line: 1,
            column: 0,
        }
    }

    /// The character under the cursor.
    #[inline]
    pub fn current(&self) -> char {
        self.current.1
    }

    /// Byte offset of the character under the cursor.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.current.0 as u32
    }

    /// Byte offset of the character following the current one.
    #[inline]
    pub fn peek_offset(&self) -> u32 {
        if self.at_end() {
            self.len as u32
        } else {
            (self.current.0 + self.current.1.len_utf8()) as u32
        }
    }

    /// Line of the character under the cursor, 1-based.
    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Column of the character under the cursor, 1-based.
    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Advance the cursor and return the new current character.
    pub fn next(&mut self) -> char {
        let prev = self.current.1;

        match self.chars.next() {
            Some((index, c)) => {
                if prev == '\n' {
                    self.line += 1;
                    self.column = 1;
                } else {
                    self.column += 1;
                }
                self.current = (index, c);
            }
            None => {
                // There is no end-of-file character, so the
                // position is set past the last byte.
                self.current = (self.len, EOF_CHAR);
            }
        }

        self.current.1
    }

    /// The character after the current one, without advancing.
    pub fn peek(&mut self) -> char {
        self.chars.reset_peek();
        let c = self.chars.peek().map(|(_, c)| *c).unwrap_or(EOF_CHAR);
        self.chars.reset_peek();
        c
    }

    /// Indicates if the cursor is past the last character of the source.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.current.0 >= self.len
    }
}
