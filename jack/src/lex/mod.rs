//! Lexical analysis
mod cursor;
mod lexer;
mod token_stream;
mod tokens;

pub use self::{
    lexer::{Lexer, LexerIter, MAX_INTEGER},
    token_stream::TokenStream,
    tokens::{Keyword, Span, Token, TokenKind},
};
