//! Recursive descent parser for queso source code.
//!
//! The grammar is small enough that every production is a single function:
//!
//! ```text
//! module := item* EOF
//! item   := '(' 'define' IDENT expr ')'
//! expr   := '(' ')' | BOOL | NUM | IDENT
//!         | '(' 'lambda' '(' IDENT* ')' expr+ ')'
//!         | '(' expr expr* ')'
//! ```
//!
//! The first error aborts the parse; there is no recovery.

use queso_ast::{Expr, ExprKind, FileId, Item, ItemKind, Lit, Module, Span, Spanned};
use queso_diag::{Category, Diagnostic, SourceLocation};

use crate::token::{Token, TokenKind};

/// Parse a token stream into a module.
pub fn parse_module(tokens: Vec<Token>, file: FileId) -> Result<Module, Vec<Diagnostic>> {
    let mut parser = Parser::new(tokens, file);
    parser.module().map_err(|diag| vec![diag])
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: FileId,
}

impl Parser {
    fn new(tokens: Vec<Token>, file: FileId) -> Self {
        Self {
            tokens,
            pos: 0,
            file,
        }
    }

    fn module(&mut self) -> Result<Module, Diagnostic> {
        let mut items = Vec::new();
        while !self.at_eof() {
            items.push(self.item()?);
        }
        let span = match (items.first(), items.last()) {
            (Some(first), Some(last)) => Span::new(self.file, first.span.start, last.span.end),
            _ => Span::new(self.file, 0, 1),
        };
        Ok(Module { items, span })
    }

    fn item(&mut self) -> Result<Item, Diagnostic> {
        let open = self.expect(&TokenKind::LParen)?;
        if !self.match_token(&TokenKind::Define) {
            let t = self.peek();
            return Err(self.error_at(
                t.span,
                format!("Expected 'define', found {}", t.kind.describe()),
            ));
        }
        let name = self.expect_ident()?;
        let value = self.expr()?;
        let close = self.expect(&TokenKind::RParen)?;
        Ok(Spanned::new(
            ItemKind::Define { name, value },
            Span::new(self.file, open.span.start, close.span.end),
        ))
    }

    fn expr(&mut self) -> Result<Expr, Diagnostic> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::Num(text) => {
                self.advance();
                Ok(Spanned::new(ExprKind::Lit(Lit::Num(text)), t.span))
            }
            TokenKind::Bool(value) => {
                self.advance();
                Ok(Spanned::new(ExprKind::Lit(Lit::Bool(value)), t.span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Spanned::new(ExprKind::Var(name), t.span))
            }
            TokenKind::LParen => self.paren_expr(),
            ref kind => Err(self.error_at(
                t.span,
                format!("Expected expression, found {}", kind.describe()),
            )),
        }
    }

    /// An expression starting with `(`: unit, a lambda, or an application.
    fn paren_expr(&mut self) -> Result<Expr, Diagnostic> {
        let open = self.advance();

        if self.check(&TokenKind::RParen) {
            let close = self.advance();
            return Ok(Spanned::new(
                ExprKind::Lit(Lit::Unit),
                Span::new(self.file, open.span.start, close.span.end),
            ));
        }

        if self.match_token(&TokenKind::Lambda) {
            return self.lambda(open);
        }

        let func = self.expr()?;
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) && !self.at_eof() {
            args.push(self.expr()?);
        }
        let close = self.expect(&TokenKind::RParen)?;
        Ok(Spanned::new(
            ExprKind::Call {
                func: Box::new(func),
                args,
            },
            Span::new(self.file, open.span.start, close.span.end),
        ))
    }

    /// The `lambda` keyword has been consumed; `open` is the `(` before it.
    fn lambda(&mut self, open: Token) -> Result<Expr, Diagnostic> {
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while let TokenKind::Ident(_) = self.peek().kind {
            params.push(self.expect_ident()?);
        }
        self.expect(&TokenKind::RParen)?;

        let mut body = Vec::new();
        let mut tail = self.expr()?;
        while !self.check(&TokenKind::RParen) && !self.at_eof() {
            let next = self.expr()?;
            body.push(std::mem::replace(&mut tail, next));
        }
        let close = self.expect(&TokenKind::RParen)?;

        Ok(Spanned::new(
            ExprKind::Lambda {
                params,
                body,
                tail: Box::new(tail),
            },
            Span::new(self.file, open.span.start, close.span.end),
        ))
    }

    // -- Token helpers --

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let t = self.peek().clone();
        if !self.at_eof() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.peek().kind == kind
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let t = self.peek();
            Err(self.error_at(
                t.span,
                format!("Expected {}, found {}", kind.describe(), t.kind.describe()),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<String>, Diagnostic> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let name = name.clone();
            let t = self.advance();
            Ok(Spanned::new(name, t.span))
        } else {
            let t = self.peek();
            Err(self.error_at(
                t.span,
                format!("Expected identifier, found {}", t.kind.describe()),
            ))
        }
    }

    fn error_at(&self, span: Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(Category::Parse, message).at(SourceLocation {
            file_id: self.file.0,
            start: span.start,
            end: span.end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse(source: &str) -> Module {
        let tokens = lex(source, FileId(0)).expect("lex should succeed");
        parse_module(tokens, FileId(0)).expect("parse should succeed")
    }

    fn parse_err(source: &str) -> Diagnostic {
        let tokens = lex(source, FileId(0)).expect("lex should succeed");
        parse_module(tokens, FileId(0))
            .expect_err("parse should fail")
            .remove(0)
    }

    /// Byte span of the first occurrence of `needle` in `source`.
    fn span_of(source: &str, needle: &str) -> Span {
        let start = source.find(needle).expect("needle should occur") as u32;
        Span::new(FileId(0), start, start + needle.len() as u32)
    }

    #[test]
    fn parse_simple_define() {
        let source = "(define a 3)";
        let module = parse(source);
        assert_eq!(module.span, Span::new(FileId(0), 0, 12));
        assert_eq!(module.items.len(), 1);

        let ItemKind::Define { name, value } = &module.items[0].node;
        assert_eq!(module.items[0].span, Span::new(FileId(0), 0, 12));
        assert_eq!(name.node, "a");
        assert_eq!(name.span, span_of(source, "a"));
        assert_eq!(value.node, ExprKind::Lit(Lit::Num("3".to_string())));
        assert_eq!(value.span, span_of(source, "3"));
    }

    #[test]
    fn parse_lambda_define() {
        let source = "(define a (λ (x) x))";
        let module = parse(source);
        let ItemKind::Define { name, value } = &module.items[0].node;
        assert_eq!(name.node, "a");

        // `λ` is two bytes: the lambda runs from its `(` to its `)`.
        let lam_start = source.find("(λ").unwrap() as u32;
        let lam_end = source.len() as u32 - 1;
        assert_eq!(value.span, Span::new(FileId(0), lam_start, lam_end));

        let ExprKind::Lambda { params, body, tail } = &value.node else {
            panic!("expected lambda, got {value:?}");
        };
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].node, "x");
        assert_eq!(params[0].span, span_of(source, "x"));
        assert!(body.is_empty());
        let ExprKind::Var(tail_name) = &tail.node else {
            panic!("expected var tail, got {tail:?}");
        };
        assert_eq!(tail_name, "x");
    }

    #[test]
    fn parse_lambda_body_sequence() {
        let module = parse("(define f (lambda (x y) (log x) y))");
        let ItemKind::Define { value, .. } = &module.items[0].node;
        let ExprKind::Lambda { params, body, tail } = &value.node else {
            panic!("expected lambda");
        };
        assert_eq!(params.len(), 2);
        assert_eq!(body.len(), 1);
        assert!(matches!(body[0].node, ExprKind::Call { .. }));
        assert!(matches!(tail.node, ExprKind::Var(_)));
    }

    #[test]
    fn parse_application_and_unit() {
        let source = "(define f (lambda () (g () #t 12)))";
        let module = parse(source);
        let ItemKind::Define { value, .. } = &module.items[0].node;
        let ExprKind::Lambda { tail, .. } = &value.node else {
            panic!("expected lambda");
        };
        let ExprKind::Call { func, args } = &tail.node else {
            panic!("expected application");
        };
        assert_eq!(func.node, ExprKind::Var("g".to_string()));
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].node, ExprKind::Lit(Lit::Unit));
        assert_eq!(args[0].span, span_of(source, "()"));
        assert_eq!(args[1].node, ExprKind::Lit(Lit::Bool(true)));
        assert_eq!(args[2].node, ExprKind::Lit(Lit::Num("12".to_string())));
    }

    #[test]
    fn empty_module_parses() {
        let tokens = lex("", FileId(0)).expect("lex should succeed");
        let module = parse_module(tokens, FileId(0)).expect("parse should succeed");
        assert!(module.items.is_empty());
    }

    #[test]
    fn item_must_start_with_define() {
        let diag = parse_err("(debug 1)");
        assert!(diag.message.contains("Expected 'define'"));
        assert_eq!(diag.category, Category::Parse);
    }

    #[test]
    fn define_requires_identifier() {
        let diag = parse_err("(define 3 4)");
        assert_eq!(diag.message, "Expected identifier, found number");
    }

    #[test]
    fn unclosed_item_reports_eof() {
        let diag = parse_err("(define a 3");
        assert_eq!(diag.message, "Expected ), found <eof>");
    }

    #[test]
    fn define_is_not_an_expression() {
        let diag = parse_err("(define f (define g 1))");
        assert_eq!(diag.message, "Expected expression, found define");
    }

    #[test]
    fn lambda_requires_a_tail_expression() {
        let diag = parse_err("(define f (λ (x)))");
        assert_eq!(diag.message, "Expected expression, found )");
    }
}
