//! Token stream with one token of look ahead.
use itertools::Itertools;
use smol_str::SmolStr;

use super::{Keyword, Lexer, Token, TokenKind};
use crate::error::{JackError, JackResult, Location};

/// Pull based stream of tokens with a single slot peek buffer.
///
/// Tokens are lazily lexed. Peeking or consuming the next token
/// triggers the internal lexer, and at most one token is ever
/// buffered ahead of the parser.
pub struct TokenStream<'a> {
    lexer: Lexer<'a>,
    /// Token fetched by a peek but not yet consumed.
    peeked: Option<Token>,
    /// A copy of the previous token.
    /// This is used to build errors that refer
    /// to the end of the source.
    prev: Option<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            peeked: None,
            prev: None,
        }
    }

    /// Return the next token without advancing the cursor.
    ///
    /// Returns `None` when lexing is done.
    pub fn peek(&mut self) -> JackResult<Option<&Token>> {
        if self.peeked.is_none() {
            self.peeked = self.lexer.next_token()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Indicates whether there are tokens left to consume.
    pub fn has_more_tokens(&mut self) -> JackResult<bool> {
        Ok(self.peek()?.is_some())
    }

    /// Consumes the next token regardless of kind.
    ///
    /// # Errors
    ///
    /// Returns a syntax error at end-of-file, since every caller
    /// is at a point in the grammar where a token is required.
    pub fn next_token(&mut self) -> JackResult<Token> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => match self.lexer.next_token()? {
                Some(token) => token,
                None => return Err(self.eof_error()),
            },
        };
        self.prev = Some(token.clone());
        Ok(token)
    }

    /// Peek the next token, failing at end-of-file.
    fn peek_required(&mut self) -> JackResult<&Token> {
        if self.peek()?.is_none() {
            return Err(self.eof_error());
        }
        // Buffer was filled by the peek above.
        self.peeked.as_ref().ok_or_else(|| self.eof_error())
    }

    /// The next token's keyword, if it is one.
    pub fn peek_keyword(&mut self) -> JackResult<Option<Keyword>> {
        Ok(match self.peek()? {
            Some(Token {
                kind: TokenKind::Keyword(keyword),
                ..
            }) => Some(*keyword),
            _ => None,
        })
    }

    /// The next token's symbol character, if it is one.
    pub fn peek_symbol(&mut self) -> JackResult<Option<char>> {
        Ok(match self.peek()? {
            Some(Token {
                kind: TokenKind::Symbol(c),
                ..
            }) => Some(*c),
            _ => None,
        })
    }

    /// Test whether the next token is one of the given keywords.
    pub fn is_keyword(&mut self, keywords: &[Keyword]) -> JackResult<bool> {
        Ok(match self.peek()? {
            Some(Token {
                kind: TokenKind::Keyword(keyword),
                ..
            }) => keywords.contains(keyword),
            _ => false,
        })
    }

    /// Test whether the next token is one of the given symbols.
    pub fn is_symbol(&mut self, symbols: &[char]) -> JackResult<bool> {
        Ok(match self.peek()? {
            Some(Token {
                kind: TokenKind::Symbol(c),
                ..
            }) => symbols.contains(c),
            _ => false,
        })
    }

    /// Consumes the next token if it's the given symbol.
    ///
    /// Returns true when matched. Does not consume the token otherwise.
    pub fn match_symbol(&mut self, symbol: char) -> JackResult<bool> {
        if self.is_symbol(&[symbol])? {
            self.next_token()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Consumes the next token, which must be one of the given keywords.
    pub fn consume_keyword(&mut self, keywords: &[Keyword]) -> JackResult<Keyword> {
        let kind = self.peek_required()?.kind.clone();
        match kind {
            TokenKind::Keyword(keyword) if keywords.contains(&keyword) => {
                self.next_token()?;
                Ok(keyword)
            }
            _ => {
                let expected = keywords.iter().map(|k| format!("'{k}'")).join(" or ");
                Err(self.mismatch(expected))
            }
        }
    }

    /// Consumes the next token, which must be one of the given symbols.
    pub fn consume_symbol(&mut self, symbols: &[char]) -> JackResult<char> {
        let kind = self.peek_required()?.kind.clone();
        match kind {
            TokenKind::Symbol(c) if symbols.contains(&c) => {
                self.next_token()?;
                Ok(c)
            }
            _ => {
                let expected = symbols.iter().map(|c| format!("'{c}'")).join(" or ");
                Err(self.mismatch(expected))
            }
        }
    }

    /// Consumes the next token, which must be an identifier.
    pub fn consume_identifier(&mut self) -> JackResult<(SmolStr, Token)> {
        let kind = self.peek_required()?.kind.clone();
        match kind {
            TokenKind::Identifier(name) => {
                let token = self.next_token()?;
                Ok((name, token))
            }
            _ => Err(self.mismatch("identifier")),
        }
    }

    /// Consumes a type name.
    ///
    /// Types are the primitive keywords `int`, `char` and `boolean`, or
    /// a class name. When `allow_void` is set, `void` is accepted as well.
    pub fn consume_type(&mut self, allow_void: bool) -> JackResult<SmolStr> {
        let kind = self.peek_required()?.kind.clone();
        match kind {
            TokenKind::Keyword(keyword) if keyword.is_primitive_type() || (allow_void && keyword == Keyword::Void) => {
                self.next_token()?;
                Ok(SmolStr::from(keyword.as_str()))
            }
            TokenKind::Identifier(name) => {
                self.next_token()?;
                Ok(name)
            }
            _ => Err(self.mismatch("type")),
        }
    }

    /// Location of the next token, or the end of the previous
    /// token when the stream is exhausted.
    pub fn location(&mut self) -> JackResult<Location> {
        if let Some(token) = self.peek()? {
            return Ok(Location::from(&token.span));
        }
        Ok(self.end_location())
    }

    fn end_location(&self) -> Location {
        self.prev
            .as_ref()
            .map(|token| Location {
                line: token.span.line,
                column: token.span.column + token.span.size,
            })
            .unwrap_or(Location { line: 1, column: 1 })
    }

    #[cold]
    fn eof_error(&self) -> JackError {
        JackError::syntax(self.end_location(), "unexpected end of file")
    }

    /// Error describing the peeked token as unexpected.
    #[cold]
    pub fn mismatch(&self, expected: impl AsRef<str>) -> JackError {
        match self.peeked.as_ref() {
            Some(token) => JackError::syntax(
                &token.span,
                format!("expected {}, found '{}'", expected.as_ref(), token.kind),
            ),
            None => self.eof_error(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_peek_does_not_consume() {
        let mut stream = TokenStream::new(Lexer::new("foo ( )"));

        assert!(stream.peek().unwrap().unwrap().kind.is_identifier());
        assert!(stream.peek().unwrap().unwrap().kind.is_identifier());
        let (name, _) = stream.consume_identifier().unwrap();
        assert_eq!(name, "foo");

        assert!(stream.is_symbol(&['.', '(']).unwrap());
        assert!(!stream.is_symbol(&['.']).unwrap());
        assert!(stream.match_symbol('(').unwrap());
        assert_eq!(stream.consume_symbol(&[')']).unwrap(), ')');
        assert!(!stream.has_more_tokens().unwrap());
    }

    #[test]
    fn test_consume_mismatch() {
        let mut stream = TokenStream::new(Lexer::new("let x"));

        let err = stream.consume_keyword(&[Keyword::Do, Keyword::If]).unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(err.to_string(), "syntax error at 1:1: expected 'do' or 'if', found 'let'");

        // Mismatch leaves the token in place.
        assert_eq!(stream.consume_keyword(&[Keyword::Let]).unwrap(), Keyword::Let);
        assert!(stream.consume_symbol(&[';']).unwrap_err().is_syntax());
    }

    #[test]
    fn test_consume_type() {
        let mut stream = TokenStream::new(Lexer::new("int Array void void"));

        assert_eq!(stream.consume_type(false).unwrap(), "int");
        assert_eq!(stream.consume_type(false).unwrap(), "Array");
        assert!(stream.consume_type(false).unwrap_err().is_syntax());
        assert_eq!(stream.consume_type(true).unwrap(), "void");
    }

    #[test]
    fn test_unexpected_eof() {
        let mut stream = TokenStream::new(Lexer::new("class"));
        stream.next_token().unwrap();

        let err = stream.next_token().unwrap_err();
        assert!(err.is_syntax());
        assert_eq!(err.location(), Some(Location { line: 1, column: 6 }));
        assert!(stream.consume_identifier().unwrap_err().is_syntax());
    }
}
