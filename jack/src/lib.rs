//! Compiler from Jack classes to stack machine VM code.
pub mod compile;
mod error;
pub mod lex;

use self::{compile::CompilationEngine, lex::Lexer};

pub const IMPL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub use self::error::{JackError, JackResult, Location};

/// Compile the class in the given source into VM commands.
pub fn compile_str(source_code: impl AsRef<str>) -> JackResult<Vec<compile::VmCommand>> {
    let lexer = Lexer::new(source_code.as_ref());
    CompilationEngine::new(lexer).compile_class()
}

/// Compile the class in the given source into VM program text.
pub fn compile_to_vm(source_code: impl AsRef<str>) -> JackResult<String> {
    let code = compile_str(source_code)?;
    Ok(compile::render(&code)?)
}

pub mod prelude {
    pub use super::{
        compile::{CompilationEngine, Segment, SymbolKind, SymbolTable, VmCommand, VmWriter},
        error::{JackError, JackResult, Location},
        lex::{Keyword, Lexer, Token, TokenKind, TokenStream},
    };
}
