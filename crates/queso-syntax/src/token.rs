//! Token types produced by the queso lexer.

use queso_ast::Span;

/// The kind of a lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LParen,
    RParen,

    // -- Keywords --
    Define,
    /// `lambda` or `λ`.
    Lambda,

    // -- Literals and names --
    Ident(String),
    /// A number literal, kept as source text.
    Num(String),
    /// `#t` or `#f`.
    Bool(bool),

    Eof,
}

impl TokenKind {
    /// How the token reads in a diagnostic.
    pub fn describe(&self) -> &str {
        match self {
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Define => "define",
            TokenKind::Lambda => "lambda",
            TokenKind::Ident(_) => "identifier",
            TokenKind::Num(_) => "number",
            TokenKind::Bool(true) => "#t",
            TokenKind::Bool(false) => "#f",
            TokenKind::Eof => "<eof>",
        }
    }
}

/// A token with its kind and source span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
