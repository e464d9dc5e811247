//! Code generation
mod engine;
mod ir;
mod symbol;
mod writer;

pub use self::{
    engine::{CompilationEngine, SubroutineKind},
    ir::{ArithmeticOp, Segment, VmCommand},
    symbol::{Symbol, SymbolError, SymbolKind, SymbolScope, SymbolTable},
    writer::{render, VmWriter},
};
