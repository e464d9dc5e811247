//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::lex::Span;

pub type JackResult<T> = std::result::Result<T, JackError>;

#[derive(Debug)]
pub enum JackError {
    /// Malformed token in the source text.
    Lexical { loc: Location, message: String },
    /// Token of the wrong kind or value at a grammar decision point.
    Syntax { loc: Location, message: String },
    /// Well formed code referring to names in ways the symbol table rejects.
    Semantic { loc: Location, message: String },
    Io(std::io::Error),
    Fmt(fmt::Error),
}

/// Position in the source text, 1-based.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl From<&Span> for Location {
    fn from(span: &Span) -> Self {
        Location {
            line: span.line,
            column: span.column,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl JackError {
    #[cold]
    #[inline(never)]
    pub fn lexical(loc: impl Into<Location>, message: impl ToString) -> Self {
        Self::Lexical {
            loc: loc.into(),
            message: message.to_string(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn syntax(loc: impl Into<Location>, message: impl ToString) -> Self {
        Self::Syntax {
            loc: loc.into(),
            message: message.to_string(),
        }
    }

    #[cold]
    #[inline(never)]
    pub fn semantic(loc: impl Into<Location>, message: impl ToString) -> Self {
        Self::Semantic {
            loc: loc.into(),
            message: message.to_string(),
        }
    }

    /// Source location of a compile error.
    ///
    /// I/O and formatting errors have no location.
    pub fn location(&self) -> Option<Location> {
        match self {
            Self::Lexical { loc, .. } | Self::Syntax { loc, .. } | Self::Semantic { loc, .. } => Some(*loc),
            Self::Io(_) | Self::Fmt(_) => None,
        }
    }

    #[inline]
    pub fn is_lexical(&self) -> bool {
        matches!(self, Self::Lexical { .. })
    }

    #[inline]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. })
    }

    #[inline]
    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Semantic { .. })
    }
}

impl Display for JackError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical { loc, message } => write!(f, "lexical error at {loc}: {message}"),
            Self::Syntax { loc, message } => write!(f, "syntax error at {loc}: {message}"),
            Self::Semantic { loc, message } => write!(f, "semantic error at {loc}: {message}"),
            Self::Io(err) => write!(f, "{}", err),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for JackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Fmt(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for JackError {
    fn from(err: std::io::Error) -> Self {
        JackError::Io(err)
    }
}

impl From<fmt::Error> for JackError {
    fn from(err: fmt::Error) -> Self {
        JackError::Fmt(err)
    }
}
