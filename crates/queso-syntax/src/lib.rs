//! Lexer and recursive descent parser for queso source code.
//!
//! This crate takes source text and produces an AST defined in `queso-ast`.
//! queso is fully parenthesized, so the parser has no precedence handling;
//! every compound form starts at `(`.

pub mod lexer;
pub mod parser;
pub mod token;

use queso_ast::{FileId, Module};
use queso_diag::Diagnostic;

pub use lexer::lex;
pub use parser::parse_module;
pub use token::{Token, TokenKind};

/// Parse a module directly from source text.
pub fn parse_module_source(source: &str, file: FileId) -> Result<Module, Vec<Diagnostic>> {
    let tokens = lex(source, file)?;
    parse_module(tokens, file)
}
