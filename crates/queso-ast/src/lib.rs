//! AST node definitions and source spans for queso.
//!
//! This crate defines the surface syntax tree produced by the parser.
//! Every node carries a [`Span`] for source location tracking. Number
//! literals keep their source text; nothing is numeric until CPS lowering.

/// Identifies a source file in the compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte offset range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span that covers both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(
            self.file, other.file,
            "cannot merge spans from different files"
        );
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A synthetic span for compiler-generated nodes.
    pub fn synthetic() -> Self {
        Self {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
        }
    }
}

/// A value paired with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

// ---------------------------------------------------------------------------
// Literal values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lit {
    /// A number literal, kept as its source text until CPS lowering.
    Num(String),
    Bool(bool),
    Unit,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

pub type Expr = Spanned<ExprKind>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// Literal value.
    Lit(Lit),

    /// Variable reference.
    Var(String),

    /// Function application: `(func arg*)`.
    Call { func: Box<Expr>, args: Vec<Expr> },

    /// Lambda: `(λ (param*) body* tail)`. The final expression is the
    /// function's result; the leading `body` expressions are evaluated for
    /// effect in order.
    Lambda {
        params: Vec<Spanned<String>>,
        body: Vec<Expr>,
        tail: Box<Expr>,
    },
}

// ---------------------------------------------------------------------------
// Items and modules
// ---------------------------------------------------------------------------

pub type Item = Spanned<ItemKind>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    /// Top-level definition: `(define name value)`.
    Define { name: Spanned<String>, value: Expr },
}

/// A whole source file: an ordered sequence of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub items: Vec<Item>,
    pub span: Span,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_merge() {
        let file = FileId(0);
        let a = Span::new(file, 10, 20);
        let b = Span::new(file, 15, 30);
        let merged = a.merge(b);
        assert_eq!(merged.start, 10);
        assert_eq!(merged.end, 30);
    }

    #[test]
    fn span_merge_is_commutative() {
        let file = FileId(0);
        let a = Span::new(file, 4, 9);
        let b = Span::new(file, 1, 6);
        assert_eq!(a.merge(b), b.merge(a));
    }

    #[test]
    fn spanned_map() {
        let s = Spanned::new(42, Span::new(FileId(0), 0, 1));
        let s2 = s.map(|n| n.to_string());
        assert_eq!(s2.node, "42");
    }
}
