//! Hindley-Milner type inference with deferred constraint solving for queso.
//!
//! This crate implements:
//! - Constraint-based inference over the surface tree
//! - Deferred equality constraints, solved at each lambda and definition
//!   boundary
//! - Let-generalization against the enclosing scope, with per-call-site
//!   instantiation bookkeeping
//!
//! The engine is scoped to a single top-level definition: [`lower_module`]
//! creates a fresh [`InferEngine`] per `define`, so variables from one
//! definition never leak into the next except through the shared value
//! environment's resolved, substituted types.

pub mod builtins;
pub mod env;
pub mod lower;
pub mod trace;

use std::collections::{BTreeMap, BTreeSet};

use queso_ast::Span;
use queso_hir::{HirExpr, HirExprKind, HirParam};
use queso_types::{
    FnId, FnIdGen, FunctionTy, Ty, TyScheme, TyVarGen, TyVarId, free_ty_vars, occurs_in,
};

pub use env::Environment;
pub use lower::{LowerResult, lower_module};

// Re-export for convenience.
pub use queso_diag::{Category, Diagnostic, DiagnosticError, SourceLocation};

// ---------------------------------------------------------------------------
// Constraints
// ---------------------------------------------------------------------------

/// An equality obligation between two instantiated types.
///
/// Constraints are recorded where they arise and solved in insertion order
/// at the end of the enclosing lambda or definition, so unification does not
/// depend on traversal order.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub left: Ty,
    pub right: Ty,
    pub span: Span,
}

// ---------------------------------------------------------------------------
// Inference engine
// ---------------------------------------------------------------------------

/// Unification engine for a single top-level definition.
///
/// Holds the substitution built by unification, the pending constraint list,
/// and the instantiation lists staged at call sites. Fresh ids come from the
/// compilation session's generators, so no two definitions ever share a
/// variable or function id.
pub struct InferEngine<'g> {
    ty_vars: &'g mut TyVarGen,
    fn_ids: &'g mut FnIdGen,
    substitution: BTreeMap<TyVarId, Ty>,
    constraints: Vec<Constraint>,
    /// Fresh-variable lists staged per instantiated scheme, keyed by the
    /// scheme body's stable function id. Drained once per definition by
    /// [`InferEngine::finalize_instantiations`].
    staged: BTreeMap<FnId, Vec<Vec<Ty>>>,
    /// When true, unification steps are recorded for `check --trace`.
    tracing: bool,
    trace: Vec<trace::UnifyStep>,
}

impl<'g> InferEngine<'g> {
    pub fn new(ty_vars: &'g mut TyVarGen, fn_ids: &'g mut FnIdGen) -> Self {
        Self {
            ty_vars,
            fn_ids,
            substitution: BTreeMap::new(),
            constraints: Vec::new(),
            staged: BTreeMap::new(),
            tracing: false,
            trace: Vec::new(),
        }
    }

    /// Mint a fresh unification variable.
    pub fn fresh_variable(&mut self) -> Ty {
        Ty::Variable(self.ty_vars.fresh())
    }

    /// Mint a fresh function identity.
    pub fn fresh_fn_id(&mut self) -> FnId {
        self.fn_ids.fresh()
    }

    /// Read-only view of the current substitution.
    pub fn substitution(&self) -> &BTreeMap<TyVarId, Ty> {
        &self.substitution
    }

    /// Record an equality constraint without solving it.
    pub fn constrain(&mut self, left: Ty, right: Ty, span: Span) {
        self.constraints.push(Constraint { left, right, span });
    }

    /// Unify two types, extending the substitution.
    ///
    /// Structural equality up to variables: a variable either gains a
    /// binding or its existing binding is unified against the other side.
    /// The occurs check runs before any existing binding is consulted, so a
    /// cyclic binding is never recorded.
    pub fn unify(&mut self, left: &Ty, right: &Ty, span: Span) -> Result<(), DiagnosticError> {
        match (left, right) {
            (Ty::Variable(l), Ty::Variable(r)) if l == r => {
                self.push_unify_step(trace::UnifyAction::Identity, left, right, || {
                    "same variable".into()
                });
                Ok(())
            }
            (Ty::Variable(var), _) => {
                if occurs_in(*var, right) {
                    self.push_unify_step(trace::UnifyAction::OccursCheck, left, right, || {
                        format!("${} occurs in {right}", var.0)
                    });
                    return Err(self_referential(left, span));
                }
                match self.substitution.get(var).cloned() {
                    Some(bound) => self.unify(&bound, right, span),
                    None => {
                        self.push_unify_step(trace::UnifyAction::Bind, left, right, || {
                            format!("${} := {right}", var.0)
                        });
                        self.substitution.insert(*var, right.clone());
                        Ok(())
                    }
                }
            }
            (_, Ty::Variable(var)) => {
                if occurs_in(*var, left) {
                    self.push_unify_step(trace::UnifyAction::OccursCheck, left, right, || {
                        format!("${} occurs in {left}", var.0)
                    });
                    return Err(self_referential(right, span));
                }
                match self.substitution.get(var).cloned() {
                    Some(bound) => self.unify(left, &bound, span),
                    None => {
                        self.push_unify_step(trace::UnifyAction::Bind, left, right, || {
                            format!("${} := {left}", var.0)
                        });
                        self.substitution.insert(*var, left.clone());
                        Ok(())
                    }
                }
            }
            (Ty::Constant(l), Ty::Constant(r)) if l == r => {
                self.push_unify_step(trace::UnifyAction::Identity, left, right, || {
                    "same constant".into()
                });
                Ok(())
            }
            (Ty::Unit, Ty::Unit) => {
                self.push_unify_step(trace::UnifyAction::Identity, left, right, || {
                    "both unit".into()
                });
                Ok(())
            }
            (Ty::Function(l), Ty::Function(r)) if l.parameters.len() == r.parameters.len() => {
                self.push_unify_step(trace::UnifyAction::Decompose, left, right, || {
                    "unify parameters pairwise, then results".into()
                });
                for (lp, rp) in l.parameters.iter().zip(&r.parameters) {
                    self.unify(lp, rp, span)?;
                }
                self.unify(&l.result, &r.result, span)
            }
            _ => {
                self.push_unify_step(trace::UnifyAction::Error, left, right, || {
                    "type mismatch".into()
                });
                Err(mismatch(left, right, span))
            }
        }
    }

    /// Solve every pending constraint in insertion order, then close the
    /// substitution map by rewriting each entry against the whole map.
    /// Earlier entries may reference variables resolved by later ones.
    pub fn solve_constraints(&mut self) -> Result<(), DiagnosticError> {
        let pending = std::mem::take(&mut self.constraints);
        for constraint in &pending {
            self.unify(&constraint.left, &constraint.right, constraint.span)?;
        }

        let ids: Vec<TyVarId> = self.substitution.keys().copied().collect();
        for id in ids {
            let closed = self.substitute(&self.substitution[&id]);
            self.substitution.insert(id, closed);
        }
        Ok(())
    }

    /// Apply the current substitution to a type.
    ///
    /// Variables dereference transitively through the map, so applying an
    /// already substituted type is a no-op. A scheme's own quantified
    /// variables are never rewritten. Recorded instantiation lists are
    /// rewritten along with the function type that carries them.
    pub fn substitute(&self, ty: &Ty) -> Ty {
        self.substitute_bound(ty, &BTreeSet::new())
    }

    /// [`InferEngine::substitute`] for a bare function type.
    pub fn substitute_fun(&self, fun: &FunctionTy) -> FunctionTy {
        self.substitute_fun_bound(fun, &BTreeSet::new())
    }

    fn substitute_bound(&self, ty: &Ty, bound: &BTreeSet<TyVarId>) -> Ty {
        match ty {
            Ty::Unit | Ty::Constant(_) => ty.clone(),
            Ty::Variable(var) => {
                if bound.contains(var) {
                    return ty.clone();
                }
                match self.substitution.get(var) {
                    Some(target) => self.substitute_bound(target, bound),
                    None => ty.clone(),
                }
            }
            Ty::Function(fun) => Ty::Function(self.substitute_fun_bound(fun, bound)),
            Ty::Scheme(scheme) => {
                let mut inner = bound.clone();
                inner.extend(scheme.generics.iter().copied());
                Ty::Scheme(TyScheme {
                    generics: scheme.generics.clone(),
                    body: self.substitute_fun_bound(&scheme.body, &inner),
                })
            }
        }
    }

    fn substitute_fun_bound(&self, fun: &FunctionTy, bound: &BTreeSet<TyVarId>) -> FunctionTy {
        FunctionTy {
            id: fun.id,
            instantiations: fun
                .instantiations
                .iter()
                .map(|vars| vars.iter().map(|v| self.substitute_bound(v, bound)).collect())
                .collect(),
            parameters: fun
                .parameters
                .iter()
                .map(|p| self.substitute_bound(p, bound))
                .collect(),
            result: Box::new(self.substitute_bound(&fun.result, bound)),
        }
    }

    /// Rewrite every type annotation in an expression via
    /// [`InferEngine::substitute`]. Literal nodes pass through.
    pub fn substitute_expr(&self, expr: HirExpr) -> HirExpr {
        let ty = self.substitute(&expr.ty);
        let kind = match expr.kind {
            HirExprKind::Lit(lit) => HirExprKind::Lit(lit),
            HirExprKind::Var(name) => HirExprKind::Var(name),
            HirExprKind::Call { func, args } => HirExprKind::Call {
                func: Box::new(self.substitute_expr(*func)),
                args: args.into_iter().map(|a| self.substitute_expr(a)).collect(),
            },
            HirExprKind::BinaryOp { op, left, right } => HirExprKind::BinaryOp {
                op,
                left: Box::new(self.substitute_expr(*left)),
                right: Box::new(self.substitute_expr(*right)),
            },
            HirExprKind::Lambda { params, body, tail } => HirExprKind::Lambda {
                params: params
                    .into_iter()
                    .map(|p| HirParam {
                        ty: self.substitute(&p.ty),
                        ..p
                    })
                    .collect(),
                body: body.into_iter().map(|e| self.substitute_expr(e)).collect(),
                tail: Box::new(self.substitute_expr(*tail)),
            },
        };
        HirExpr {
            kind,
            ty,
            span: expr.span,
        }
    }

    /// Generalize a resolved function type against the enclosing value
    /// environment: quantify exactly the variables free in the type but not
    /// free anywhere in the environment (shadowed bindings included, a
    /// scheme's own generics excluded).
    ///
    /// Always returns a scheme; a monomorphic function gets an empty
    /// generic set.
    pub fn generalize(&self, fun: FunctionTy, env: &Environment<Ty>) -> TyScheme {
        let mut in_ty = BTreeSet::new();
        for param in &fun.parameters {
            in_ty.extend(free_ty_vars(param));
        }
        in_ty.extend(free_ty_vars(&fun.result));

        let mut in_env = BTreeSet::new();
        env.for_each_value(&mut |ty| in_env.extend(free_ty_vars(ty)));

        TyScheme {
            generics: in_ty.difference(&in_env).copied().collect(),
            body: fun,
        }
    }

    /// Instantiate a scheme with fresh variables.
    ///
    /// Non-scheme types pass through unchanged. When fresh variables are
    /// minted, the list is staged under the scheme body's function id;
    /// [`InferEngine::finalize_instantiations`] appends it to the
    /// environment's scheme once the definition has solved.
    pub fn instantiate(&mut self, ty: &Ty) -> Ty {
        let Ty::Scheme(scheme) = ty else {
            return ty.clone();
        };
        if scheme.generics.is_empty() {
            return Ty::Function(scheme.body.clone());
        }

        let mut fresh = BTreeMap::new();
        let mut minted = Vec::with_capacity(scheme.generics.len());
        for generic in &scheme.generics {
            let var = self.fresh_variable();
            minted.push(var.clone());
            fresh.insert(*generic, var);
        }
        self.staged.entry(scheme.body.id).or_default().push(minted);
        Ty::Function(replace_generics_fun(&scheme.body, &fresh))
    }

    /// Rewrite staged instantiation lists by the solved substitution and
    /// append each to the scheme it instantiated, found by function id among
    /// `valenv`'s own bindings.
    ///
    /// The staging map is drained, so calling this again appends nothing.
    /// Staged ids with no environment binding (anonymous lambdas) are
    /// dropped.
    pub fn finalize_instantiations(&mut self, valenv: &mut Environment<Ty>) {
        let staged = std::mem::take(&mut self.staged);
        for (fn_id, lists) in staged {
            let resolved: Vec<Vec<Ty>> = lists
                .iter()
                .map(|vars| vars.iter().map(|v| self.substitute(v)).collect())
                .collect();

            let found = valenv.local_bindings().find_map(|(name, ty)| match ty {
                Ty::Scheme(scheme) if scheme.body.id == fn_id => {
                    Some((name.clone(), scheme.clone()))
                }
                _ => None,
            });
            let Some((name, mut scheme)) = found else {
                continue;
            };
            scheme.body.instantiations.extend(resolved);
            valenv.insert(name, Ty::Scheme(scheme));
        }
    }

    /// Enable step-by-step unification tracing.
    pub fn enable_tracing(&mut self) {
        self.tracing = true;
    }

    /// Whether unification tracing is currently enabled.
    pub fn is_tracing(&self) -> bool {
        self.tracing
    }

    /// Take and clear the collected unification trace.
    pub fn take_trace(&mut self) -> Vec<trace::UnifyStep> {
        std::mem::take(&mut self.trace)
    }

    fn push_unify_step(
        &mut self,
        action: trace::UnifyAction,
        left: &Ty,
        right: &Ty,
        detail: impl FnOnce() -> String,
    ) {
        if self.tracing {
            let step = self.trace.len() + 1;
            self.trace.push(trace::UnifyStep {
                step,
                action,
                left: left.to_string(),
                right: right.to_string(),
                detail: detail(),
            });
        }
    }
}

/// Replace quantified variables with their fresh counterparts.
///
/// This is a local rewrite against `fresh` only; the engine substitution is
/// never consulted during instantiation.
fn replace_generics(ty: &Ty, fresh: &BTreeMap<TyVarId, Ty>) -> Ty {
    match ty {
        Ty::Unit | Ty::Constant(_) => ty.clone(),
        Ty::Variable(var) => fresh.get(var).cloned().unwrap_or_else(|| ty.clone()),
        Ty::Function(fun) => Ty::Function(replace_generics_fun(fun, fresh)),
        // Schemes only occur at binding level, never inside a function type
        // built by inference.
        Ty::Scheme(_) => ty.clone(),
    }
}

fn replace_generics_fun(fun: &FunctionTy, fresh: &BTreeMap<TyVarId, Ty>) -> FunctionTy {
    FunctionTy {
        id: fun.id,
        instantiations: fun.instantiations.clone(),
        parameters: fun
            .parameters
            .iter()
            .map(|p| replace_generics(p, fresh))
            .collect(),
        result: Box::new(replace_generics(&fun.result, fresh)),
    }
}

fn mismatch(left: &Ty, right: &Ty, span: Span) -> DiagnosticError {
    DiagnosticError::single(
        Diagnostic::error(
            Category::TypeMismatch,
            format!("Expected {left}, found {right}"),
        )
        .at(span_to_location(span)),
    )
}

fn self_referential(var: &Ty, span: Span) -> DiagnosticError {
    DiagnosticError::single(
        Diagnostic::error(
            Category::SelfReferentialType,
            format!("Self-referential type {var}"),
        )
        .at(span_to_location(span)),
    )
}

pub(crate) fn span_to_location(span: Span) -> SourceLocation {
    SourceLocation {
        file_id: span.file.0,
        start: span.start,
        end: span.end,
    }
}
