//! Lexical analysis
use log::trace;
use smol_str::SmolStr;

use super::{
    cursor::Cursor,
    tokens::{Keyword, Span, Token, TokenKind},
};
use crate::error::{JackError, JackResult, Location};

/// Largest integer constant the VM can push directly.
pub const MAX_INTEGER: u16 = 32767;

pub struct Lexer<'a> {
    /// Character scanner
    cursor: Cursor<'a>,
    /// Keep reference to the source so the parser can
    /// slice fragments from it.
    original: &'a str,
    /// Start absolute byte position of the current token
    /// in the source.
    start_pos: u32,
    start_loc: Location,
}

impl<'a> Lexer<'a> {
    pub fn new(source_code: &'a str) -> Self {
        let mut cursor = Cursor::new(source_code);

        // Initial state of the cursor is a non-existant EOF char,
        // but the initial state of the lexer should be a valid
        // token starting character.
        //
        // Prime the cursor for the first iteration.
        cursor.next();

        let start_pos = cursor.offset();

        Self {
            cursor,
            original: source_code,
            start_pos,
            start_loc: Location::default(),
        }
    }

    /// Scan the source characters and construct the next token.
    ///
    /// Returns `None` once the source is exhausted.
    ///
    /// ## Implementation
    ///
    /// Each call starts with the cursor pointing at the first character
    /// not yet consumed, which may be whitespace or the start of a comment.
    /// When a token is built the cursor is left on the character following
    /// the token's last character.
    pub fn next_token(&mut self) -> JackResult<Option<Token>> {
        self.erase_trivia();

        if self.cursor.at_end() {
            return Ok(None);
        }

        self.start_token();

        let kind = match self.cursor.current() {
            '"' => self.consume_string()?,
            '0'..='9' => self.consume_number()?,
            '_' | 'a'..='z' | 'A'..='Z' => self.consume_ident(),
            c => TokenKind::Symbol(c),
        };

        let token = self.make_token(kind);
        trace!("token {:?} at {}:{}", token.kind, token.span.line, token.span.column);

        Ok(Some(token))
    }

    /// Create a span using the starting position of the current token,
    /// and the offset after the character under the cursor.
    fn make_span(&self) -> Span {
        let start = self.start_pos;
        let end = self.cursor.peek_offset();

        debug_assert!(end >= start);

        Span {
            index: start,
            size: end - start,
            line: self.start_loc.line,
            column: self.start_loc.column,
        }
    }

    fn fragment(&self) -> &'a str {
        self.make_span().fragment(self.original)
    }

    /// Primes the lexer to consume the next token.
    fn start_token(&mut self) {
        self.start_pos = self.cursor.offset();
        self.start_loc = Location {
            line: self.cursor.line(),
            column: self.cursor.column(),
        };
    }

    /// Build a token, using the source text from the position
    /// stored by [`start_token`](struct.Lexer.html#fn-start_token) up to and
    /// including the character under the cursor.
    ///
    /// Also prepare the cursor for the next iteration.
    fn make_token(&mut self, kind: TokenKind) -> Token {
        let token = Token {
            span: self.make_span(),
            kind,
        };

        self.cursor.next();
        debug_assert!(self.cursor.at_end() || self.cursor.offset() == token.span.end());

        token
    }

    fn error(&self, message: impl ToString) -> JackError {
        JackError::lexical(self.start_loc, message)
    }
}

/// Specialised tokens.
impl<'a> Lexer<'a> {
    /// Skip whitespace, line comments and block comments until
    /// the cursor rests on the start of a token or the end of source.
    fn erase_trivia(&mut self) {
        while !self.cursor.at_end() {
            match (self.cursor.current(), self.cursor.peek()) {
                (c, _) if c.is_whitespace() => {
                    self.cursor.next();
                }
                ('/', '/') => self.erase_line_comment(),
                ('/', '*') => self.erase_block_comment(),
                _ => break,
            }
        }
    }

    /// Erase comment line up to, but not including, the trailing newline.
    fn erase_line_comment(&mut self) {
        debug_assert_eq!(self.cursor.current(), '/');

        while !self.cursor.at_end() && !is_newline(self.cursor.current()) {
            self.cursor.next();
        }
    }

    /// Erase a block comment, including the closing `*/`.
    ///
    /// Block comments don't nest. A comment that is still open
    /// at end of source swallows the rest of the file.
    fn erase_block_comment(&mut self) {
        // Opening "/*"
        self.cursor.next();
        self.cursor.next();

        while !self.cursor.at_end() {
            if self.cursor.current() == '*' && self.cursor.peek() == '/' {
                self.cursor.next();
                self.cursor.next();
                return;
            }
            self.cursor.next();
        }
    }

    /// Make a string constant token.
    ///
    /// There are no escape sequences, and the string must
    /// be closed on the line it was opened.
    fn consume_string(&mut self) -> JackResult<TokenKind> {
        debug_assert_eq!(self.cursor.current(), '"');

        let content_start = self.cursor.peek_offset() as usize;
        let mut length: u32 = 0;

        loop {
            self.cursor.next();

            if self.cursor.at_end() || is_newline(self.cursor.current()) {
                return Err(self.error("unterminated string constant"));
            }

            let c = self.cursor.current();
            if c as u32 > MAX_INTEGER as u32 {
                return Err(self.error(format!("character '{c}' can't be represented in a string constant")));
            }

            if c == '"' {
                let content_end = self.cursor.offset() as usize;
                let value = &self.original[content_start..content_end];
                return Ok(TokenKind::StringConstant(SmolStr::from(value)));
            }

            // The length is pushed as a constant when the string is built.
            length += 1;
            if length > MAX_INTEGER as u32 {
                return Err(self.error(format!("string constant is longer than {MAX_INTEGER} characters")));
            }
        }
    }

    /// Make an integer constant token.
    fn consume_number(&mut self) -> JackResult<TokenKind> {
        debug_assert!(is_digit(self.cursor.current()));

        while is_digit(self.cursor.peek()) {
            self.cursor.next();
        }

        let next = self.cursor.peek();
        if is_alphabetic(next) {
            let message = format!(
                "invalid identifier '{}{next}...', identifiers can't start with a digit",
                self.fragment()
            );
            return Err(self.error(message));
        }

        let fragment = self.fragment();
        match fragment.parse::<u32>() {
            Ok(value) if value <= MAX_INTEGER as u32 => Ok(TokenKind::IntegerConstant(value as u16)),
            _ => Err(self.error(format!(
                "integer constant {fragment} is out of range 0..={MAX_INTEGER}"
            ))),
        }
    }

    /// Make an identifier or keyword token.
    fn consume_ident(&mut self) -> TokenKind {
        debug_assert!(is_letter(self.cursor.current()));

        while is_letter_or_digit(self.cursor.peek()) {
            self.cursor.next();
        }

        // Attempt to convert identifier to keyword.
        match Keyword::parse(self.fragment()) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(SmolStr::from(self.fragment())),
        }
    }
}

fn is_newline(c: char) -> bool {
    matches!(c, '\r' | '\n')
}

#[allow(clippy::manual_is_ascii_check)] // consistency with other functions
fn is_digit(c: char) -> bool {
    matches!(c, '0'..='9')
}

fn is_alphabetic(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z')
}

fn is_letter(c: char) -> bool {
    is_alphabetic(c) || c == '_'
}

fn is_letter_or_digit(c: char) -> bool {
    is_letter(c) || is_digit(c)
}

impl<'a> IntoIterator for Lexer<'a> {
    type Item = JackResult<Token>;
    type IntoIter = LexerIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        LexerIter {
            lexer: self,
            done: false,
        }
    }
}

/// Convenience iterator that wraps the lexer.
///
/// Iteration stops after the first error.
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct LexerIter<'a> {
    done: bool,
    lexer: Lexer<'a>,
}

impl<'a> Iterator for LexerIter<'a> {
    type Item = JackResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.lexer.next_token() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .into_iter()
            .map(|result| result.map(|token| token.kind))
            .collect::<JackResult<Vec<_>>>()
            .unwrap()
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(SmolStr::from(name))
    }

    #[test]
    fn test_lex_statement() {
        use TokenKind as TK;

        assert_eq!(
            kinds("let x = 42;"),
            vec![
                TK::Keyword(Keyword::Let),
                ident("x"),
                TK::Symbol('='),
                TK::IntegerConstant(42),
                TK::Symbol(';'),
            ]
        );
    }

    #[test]
    fn test_lex_comments() {
        use TokenKind as TK;

        let source = "// line comment\n\
                      a /* inline */ b\n\
                      /** block\n  * spanning lines\n  */ c // trailing\n";
        assert_eq!(kinds(source), vec![ident("a"), ident("b"), ident("c")]);

        // Block comments don't nest.
        assert_eq!(
            kinds("/* outer /* inner */ x */"),
            vec![ident("x"), TK::Symbol('*'), TK::Symbol('/')]
        );
    }

    #[test]
    fn test_lex_unclosed_block_comment() {
        assert_eq!(kinds("a /* never closed\n b c"), vec![ident("a")]);
    }

    #[test]
    fn test_lex_string() {
        use TokenKind as TK;

        assert_eq!(
            kinds("do Output.printString(\"a // b\");"),
            vec![
                TK::Keyword(Keyword::Do),
                ident("Output"),
                TK::Symbol('.'),
                ident("printString"),
                TK::Symbol('('),
                TK::StringConstant(SmolStr::from("a // b")),
                TK::Symbol(')'),
                TK::Symbol(';'),
            ]
        );
        assert_eq!(kinds("\"\""), vec![TK::StringConstant(SmolStr::default())]);
    }

    #[test]
    fn test_lex_unterminated_string() {
        let mut lexer = Lexer::new("let s = \"abc\n\";");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let err = lexer.next_token().unwrap_err();
        assert!(err.is_lexical());
        assert_eq!(err.location(), Some(Location { line: 1, column: 9 }));

        assert!(Lexer::new("\"abc").next_token().unwrap_err().is_lexical());
    }

    #[test]
    fn test_lex_string_length_limit() {
        let longest = format!("\"{}\"", "a".repeat(MAX_INTEGER as usize));
        match Lexer::new(longest.as_str()).next_token().unwrap().unwrap().kind {
            TokenKind::StringConstant(value) => assert_eq!(value.len(), MAX_INTEGER as usize),
            kind => panic!("expected string constant, found {kind:?}"),
        }

        for size in [MAX_INTEGER as usize + 1, 40000, 65537] {
            let source = format!("\"{}\"", "a".repeat(size));
            let err = Lexer::new(source.as_str()).next_token().unwrap_err();
            assert!(err.is_lexical(), "{}", err);
            assert_eq!(err.location(), Some(Location { line: 1, column: 1 }));
        }
    }

    #[test]
    fn test_lex_digit_followed_by_letter() {
        let err = Lexer::new("123abc").next_token().unwrap_err();
        assert!(err.is_lexical());
    }

    #[test]
    fn test_lex_integer_range() {
        assert_eq!(kinds("32767"), vec![TokenKind::IntegerConstant(32767)]);
        assert!(Lexer::new("32768").next_token().unwrap_err().is_lexical());
        assert!(Lexer::new("99999999999").next_token().unwrap_err().is_lexical());
    }

    #[test]
    fn test_lex_keywords_and_identifiers() {
        use TokenKind as TK;

        assert_eq!(
            kinds("class _Foo classy this1 this"),
            vec![
                TK::Keyword(Keyword::Class),
                ident("_Foo"),
                ident("classy"),
                ident("this1"),
                TK::Keyword(Keyword::This),
            ]
        );
    }

    #[test]
    fn test_lex_spans() {
        let source = "class Main {\n  field int x;\n}";
        let tokens = Lexer::new(source)
            .into_iter()
            .collect::<JackResult<Vec<_>>>()
            .unwrap();

        assert_eq!(tokens.len(), 8);
        assert_eq!(tokens[1].span.fragment(source), "Main");
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 7));
        assert_eq!(tokens[3].span.fragment(source), "field");
        assert_eq!((tokens[3].span.line, tokens[3].span.column), (2, 3));
        assert_eq!((tokens[7].span.line, tokens[7].span.column), (3, 1));
    }

    #[test]
    fn test_lex_empty() {
        assert!(kinds("").is_empty());
        assert!(kinds("  \n\t// nothing here").is_empty());
    }
}
