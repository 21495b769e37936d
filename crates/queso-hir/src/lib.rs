//! Typed intermediate representation (HIR) for queso.
//!
//! HIR is the surface tree with every expression annotated by its resolved
//! [`Ty`]. It is produced by `queso-infer`'s lowering and consumed read-only
//! by CPS lowering. The only shape that does not mirror the surface tree is
//! [`HirExprKind::BinaryOp`]: an application of a recognized builtin
//! operator, normalized so CPS lowering can emit a primitive operation
//! instead of a call.

use queso_ast::{Lit, Span};
use queso_types::Ty;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirModule {
    pub items: Vec<HirItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HirItem {
    Define(HirDefine),
}

/// A typed top-level definition. The value is usually a lambda with a
/// [`Ty::Scheme`] type; an alias like `(define add +)` keeps the plain
/// function type of what it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirDefine {
    pub name: String,
    pub name_span: Span,
    pub value: HirExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirExpr {
    pub kind: HirExprKind,
    pub ty: Ty,
    pub span: Span,
}

/// A lambda parameter with its inferred type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HirParam {
    pub name: String,
    pub ty: Ty,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HirExprKind {
    Lit(Lit),

    Var(String),

    Call {
        func: Box<HirExpr>,
        args: Vec<HirExpr>,
    },

    /// Application of a recognized builtin operator, rewritten into
    /// left-associative pairs: `(+ a b c)` becomes `((a + b) + c)`.
    BinaryOp {
        op: String,
        left: Box<HirExpr>,
        right: Box<HirExpr>,
    },

    Lambda {
        params: Vec<HirParam>,
        body: Vec<HirExpr>,
        tail: Box<HirExpr>,
    },
}

impl HirExpr {
    /// Walk this expression and its children, visiting parents first.
    pub fn walk(&self, visit: &mut impl FnMut(&HirExpr)) {
        visit(self);
        match &self.kind {
            HirExprKind::Lit(_) | HirExprKind::Var(_) => {}
            HirExprKind::Call { func, args } => {
                func.walk(visit);
                for arg in args {
                    arg.walk(visit);
                }
            }
            HirExprKind::BinaryOp { left, right, .. } => {
                left.walk(visit);
                right.walk(visit);
            }
            HirExprKind::Lambda { body, tail, .. } => {
                for expr in body {
                    expr.walk(visit);
                }
                tail.walk(visit);
            }
        }
    }
}
