use smol_str::SmolStr;
use std::{collections::BTreeMap, fmt};

use super::ir::Segment;
use crate::lex::MAX_INTEGER;

/// A declared name and the storage location assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: SmolStr,
    /// Declared type, either a primitive keyword or a class name.
    pub ty: SmolStr,
    pub kind: SymbolKind,
    /// Dense index within the symbol's scope and kind.
    pub index: u16,
}

impl Symbol {
    /// VM segment holding the symbol's value.
    #[inline]
    pub fn segment(&self) -> Segment {
        self.kind.segment()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Shared by all instances of a class.
    Static,
    /// Per object instance.
    Field,
    Argument,
    /// Subroutine local declared with `var`.
    Local,
}

impl SymbolKind {
    /// Slot in the per kind counters.
    #[inline]
    fn ordinal(&self) -> usize {
        *self as usize
    }

    #[inline]
    pub fn scope(&self) -> SymbolScope {
        match self {
            Self::Static | Self::Field => SymbolScope::Class,
            Self::Argument | Self::Local => SymbolScope::Subroutine,
        }
    }

    #[rustfmt::skip]
    pub fn segment(&self) -> Segment {
        match self {
            Self::Static   => Segment::Static,
            Self::Field    => Segment::This,
            Self::Argument => Segment::Argument,
            Self::Local    => Segment::Local,
        }
    }
}

impl fmt::Display for SymbolKind {
    #[rustfmt::skip]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Static   => write!(f, "static"),
            Self::Field    => write!(f, "field"),
            Self::Argument => write!(f, "argument"),
            Self::Local    => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Fields and statics, lives for the whole class.
    Class,
    /// Arguments and locals, rebuilt for every subroutine.
    Subroutine,
}

/// Name environment of one class compilation.
///
/// Lookup checks the subroutine scope before the class scope,
/// so arguments and locals shadow fields and statics.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class: BTreeMap<SmolStr, Symbol>,
    subroutine: BTreeMap<SmolStr, Symbol>,
    /// Symbols defined so far, indexed by kind.
    counts: [u16; 4],
}

impl SymbolTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the subroutine scope. The class scope is untouched.
    pub fn start_subroutine(&mut self) {
        self.subroutine.clear();
        self.counts[SymbolKind::Argument.ordinal()] = 0;
        self.counts[SymbolKind::Local.ordinal()] = 0;
    }

    /// Declare a new name in the scope its kind belongs to.
    ///
    /// The index is the number of symbols of the same kind
    /// already defined in that scope.
    pub fn define(&mut self, name: impl Into<SmolStr>, ty: impl Into<SmolStr>, kind: SymbolKind) -> Result<&Symbol, SymbolError> {
        let name = name.into();
        let index = self.count(kind);

        let scope = match kind.scope() {
            SymbolScope::Class => &mut self.class,
            SymbolScope::Subroutine => &mut self.subroutine,
        };

        if let Some(existing) = scope.get(&name) {
            return Err(SymbolError::AlreadyDefined {
                name,
                kind: existing.kind,
            });
        }

        // Segment indices share the VM's constant range.
        if index > MAX_INTEGER {
            return Err(SymbolError::TooMany { name, kind });
        }

        let symbol = Symbol {
            name: name.clone(),
            ty: ty.into(),
            kind,
            index,
        };
        self.counts[kind.ordinal()] += 1;

        Ok(scope.entry(name).or_insert(symbol))
    }

    /// Resolve a name, subroutine scope first.
    pub fn lookup(&self, name: &str) -> Result<&Symbol, SymbolError> {
        self.get(name)
            .ok_or_else(|| SymbolError::Undefined { name: SmolStr::from(name) })
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.subroutine.get(name).or_else(|| self.class.get(name))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of symbols of the given kind in the scope the kind belongs to.
    #[inline]
    pub fn count(&self, kind: SymbolKind) -> u16 {
        self.counts[kind.ordinal()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolError {
    AlreadyDefined { name: SmolStr, kind: SymbolKind },
    Undefined { name: SmolStr },
    /// No index left in the segment for another symbol of this kind.
    TooMany { name: SmolStr, kind: SymbolKind },
}

impl std::error::Error for SymbolError {}

impl fmt::Display for SymbolError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AlreadyDefined { name, kind } => write!(f, "'{name}' is already defined as a {kind} in this scope"),
            Self::Undefined { name } => write!(f, "undefined name '{name}'"),
            Self::TooMany { name, kind } => {
                write!(f, "can't define '{name}', more than {} {kind} variables", MAX_INTEGER as u32 + 1)
            }
        }
    }
}
