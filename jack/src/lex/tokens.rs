//! Tokens

use smol_str::SmolStr;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub span: Span,
    pub kind: TokenKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Reserved identifiers
    Keyword(Keyword),
    /// User defined name of a class, subroutine or variable.
    Identifier(SmolStr),
    /// Single punctuation character.
    Symbol(char),
    /// Number literal in the range `0..=32767`
    IntegerConstant(u16),
    /// String literal, without the surrounding quotes.
    StringConstant(SmolStr),
}

impl TokenKind {
    #[inline]
    pub fn is_identifier(&self) -> bool {
        matches!(self, TokenKind::Identifier(_))
    }
}

/// Formats the token the way it's written in source, used in error messages.
impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Keyword(keyword) => write!(f, "{keyword}"),
            Self::Identifier(name) => write!(f, "{name}"),
            Self::Symbol(c) => write!(f, "{c}"),
            Self::IntegerConstant(n) => write!(f, "{n}"),
            Self::StringConstant(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Span {
    /// Byte offset of the token in the source.
    pub index: u32,
    /// Size of the token in bytes.
    pub size: u32,
    pub line: u32,
    pub column: u32,
}

impl Span {
    #[inline]
    pub fn fragment<'a>(&self, text: &'a str) -> &'a str {
        &text[(self.index as usize)..(self.index as usize + self.size as usize)]
    }

    /// Ending index of the span, exclusive.
    #[inline]
    pub fn end(&self) -> u32 {
        self.index + self.size
    }
}

/// Reserved keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[rustfmt::skip]
pub enum Keyword {
    // ------------------------------------------------------------------------
    // Declarations
    Class,        // class
    Constructor,  // constructor
    Function,     // function
    Method,       // method
    Field,        // field
    Static,       // static
    Var,          // var

    // ------------------------------------------------------------------------
    // Types
    Int,          // int
    Char,         // char
    Boolean,      // boolean
    Void,         // void

    // ------------------------------------------------------------------------
    // Constants
    True,         // true
    False,        // false
    Null,         // null
    This,         // this

    // ------------------------------------------------------------------------
    // Statements
    Let,          // let
    Do,           // do
    If,           // if
    Else,         // else
    While,        // while
    Return,       // return
}

impl Keyword {
    #[rustfmt::skip]
    pub fn parse(text: impl AsRef<str>) -> Option<Self> {
        match text.as_ref() {
            "class"       => Some(Self::Class),
            "constructor" => Some(Self::Constructor),
            "function"    => Some(Self::Function),
            "method"      => Some(Self::Method),
            "field"       => Some(Self::Field),
            "static"      => Some(Self::Static),
            "var"         => Some(Self::Var),
            // ----------------------------------------------------------------
            "int"         => Some(Self::Int),
            "char"        => Some(Self::Char),
            "boolean"     => Some(Self::Boolean),
            "void"        => Some(Self::Void),
            // ----------------------------------------------------------------
            "true"        => Some(Self::True),
            "false"       => Some(Self::False),
            "null"        => Some(Self::Null),
            "this"        => Some(Self::This),
            // ----------------------------------------------------------------
            "let"         => Some(Self::Let),
            "do"          => Some(Self::Do),
            "if"          => Some(Self::If),
            "else"        => Some(Self::Else),
            "while"       => Some(Self::While),
            "return"      => Some(Self::Return),
            // ----------------------------------------------------------------
            _ => None,
        }
    }

    #[rustfmt::skip]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Class       => "class",
            Self::Constructor => "constructor",
            Self::Function    => "function",
            Self::Method      => "method",
            Self::Field       => "field",
            Self::Static      => "static",
            Self::Var         => "var",
            Self::Int         => "int",
            Self::Char        => "char",
            Self::Boolean     => "boolean",
            Self::Void        => "void",
            Self::True        => "true",
            Self::False       => "false",
            Self::Null        => "null",
            Self::This        => "this",
            Self::Let         => "let",
            Self::Do          => "do",
            Self::If          => "if",
            Self::Else        => "else",
            Self::While       => "while",
            Self::Return      => "return",
        }
    }

    /// Built in types that can't be the receiver of a method call.
    #[inline]
    pub fn is_primitive_type(&self) -> bool {
        matches!(self, Self::Int | Self::Char | Self::Boolean)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_span_fragment() {
        const CODE: &str = "let x = 42;";

        let span = |index, size, column| Span {
            index,
            size,
            line: 1,
            column,
        };
        let spans = [span(0, 3, 1), span(4, 1, 5), span(8, 2, 9), span(10, 1, 11)];

        assert_eq!(spans[0].fragment(CODE), "let");
        assert_eq!(spans[1].fragment(CODE), "x");
        assert_eq!(spans[2].fragment(CODE), "42");
        assert_eq!(spans[3].fragment(CODE), ";");
        assert_eq!(spans[3].end(), 11);
    }

    #[test]
    fn test_keyword_round_trip_text() {
        for text in ["class", "constructor", "method", "boolean", "while", "return", "null"] {
            let keyword = Keyword::parse(text).unwrap();
            assert_eq!(keyword.as_str(), text);
        }
        assert_eq!(Keyword::parse("Class"), None);
        assert_eq!(Keyword::parse("length"), None);
    }
}
