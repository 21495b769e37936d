//! Lowering from the surface tree to typed HIR.
//!
//! Each top-level `define` is lowered with a fresh [`InferEngine`]:
//! constraints are recorded while walking the value, solved at the
//! definition boundary, and the resolved type is generalized and published
//! to the value environment before the next item is processed. The first
//! error aborts lowering.

use queso_ast::{Expr, ExprKind, Item, ItemKind, Lit, Module, Span, Spanned};
use queso_hir::{HirDefine, HirExpr, HirExprKind, HirItem, HirModule, HirParam};
use queso_types::{FnIdGen, FunctionTy, Ty, TyVarGen};

use crate::builtins::{self, BuiltinIds};
use crate::env::Environment;
use crate::trace::UnifyStep;
use crate::{Category, Diagnostic, DiagnosticError, InferEngine, span_to_location};

/// Everything lowering produces for one module.
#[derive(Debug)]
pub struct LowerResult {
    pub hir: HirModule,
    /// Type constants visible to source programs.
    pub tyenv: Environment<Ty>,
    /// Builtin and user definitions with their resolved schemes, including
    /// the instantiation lists accumulated across the module.
    pub valenv: Environment<Ty>,
    /// Unification steps, empty unless tracing was requested.
    pub trace: Vec<UnifyStep>,
}

/// Type-check a module and lower it to HIR.
pub fn lower_module(
    module: &Module,
    ty_vars: &mut TyVarGen,
    fn_ids: &mut FnIdGen,
    tracing: bool,
) -> Result<LowerResult, DiagnosticError> {
    let mut tyenv = Environment::new();
    let mut valenv = Environment::new();
    let builtins = builtins::install(&mut tyenv, &mut valenv, ty_vars, fn_ids);

    let mut items = Vec::with_capacity(module.items.len());
    let mut trace = Vec::new();
    for item in &module.items {
        let mut engine = InferEngine::new(ty_vars, fn_ids);
        if tracing {
            engine.enable_tracing();
        }
        let lowered = lower_item(&mut engine, &mut valenv, &builtins, item);
        trace.extend(engine.take_trace());
        items.push(lowered?);
    }

    Ok(LowerResult {
        hir: HirModule { items },
        tyenv,
        valenv,
        trace,
    })
}

fn lower_item(
    engine: &mut InferEngine<'_>,
    valenv: &mut Environment<Ty>,
    builtins: &BuiltinIds,
    item: &Item,
) -> Result<HirItem, DiagnosticError> {
    let ItemKind::Define { name, value } = &item.node;

    let lowered = lower_expr(engine, valenv, builtins, value)?;
    engine.solve_constraints()?;
    let lowered = engine.substitute_expr(lowered);
    engine.finalize_instantiations(valenv);

    if !lowered.ty.is_function() {
        return Err(malformed_definition(&name.node, value.span));
    }
    // Published only after the value solved, so the name is not visible
    // inside its own definition.
    valenv.insert(name.node.clone(), lowered.ty.clone());

    Ok(HirItem::Define(HirDefine {
        name: name.node.clone(),
        name_span: name.span,
        value: lowered,
        span: item.span,
    }))
}

fn lower_expr(
    engine: &mut InferEngine<'_>,
    valenv: &Environment<Ty>,
    builtins: &BuiltinIds,
    expr: &Expr,
) -> Result<HirExpr, DiagnosticError> {
    match &expr.node {
        ExprKind::Lit(lit) => Ok(HirExpr {
            kind: HirExprKind::Lit(lit.clone()),
            ty: lit_ty(lit),
            span: expr.span,
        }),
        ExprKind::Var(name) => {
            let Some(bound) = valenv.lookup(name).cloned() else {
                return Err(undefined_variable(name, expr.span));
            };
            Ok(HirExpr {
                kind: HirExprKind::Var(name.clone()),
                ty: engine.instantiate(&bound),
                span: expr.span,
            })
        }
        ExprKind::Call { func, args } => lower_call(engine, valenv, builtins, func, args, expr.span),
        ExprKind::Lambda { params, body, tail } => {
            lower_lambda(engine, valenv, builtins, params, body, tail, expr.span)
        }
    }
}

fn lower_call(
    engine: &mut InferEngine<'_>,
    valenv: &Environment<Ty>,
    builtins: &BuiltinIds,
    func: &Expr,
    args: &[Expr],
    span: Span,
) -> Result<HirExpr, DiagnosticError> {
    let func = lower_expr(engine, valenv, builtins, func)?;

    // `+` is recognized by function identity, not by name, so an alias like
    // `(define add +)` still lowers to operator pairs while a shadowing
    // lambda parameter named `+` does not. A unary `(+ x)` falls through to
    // the general call path and fails arity checking there.
    if args.len() >= 2 && is_builtin_plus(&func.ty, builtins) {
        return lower_operator_chain(engine, valenv, builtins, args, &func.ty, span);
    }

    let fnty = engine.instantiate(&func.ty);
    let mut lowered_args = Vec::with_capacity(args.len());
    for arg in args {
        lowered_args.push(lower_expr(engine, valenv, builtins, arg)?);
    }

    let retty = engine.fresh_variable();
    let mut params = Vec::with_capacity(lowered_args.len());
    for arg in &lowered_args {
        params.push(engine.instantiate(&arg.ty));
    }
    let id = engine.fresh_fn_id();
    let candidate = Ty::Function(FunctionTy::new(id, params, retty.clone()));
    engine.constrain(fnty, candidate, span);

    Ok(HirExpr {
        kind: HirExprKind::Call {
            func: Box::new(func),
            args: lowered_args,
        },
        ty: retty,
        span,
    })
}

/// Rewrite `(+ a b c ...)` into left-associative [`HirExprKind::BinaryOp`]
/// pairs, constraining each pair against the operator's type. Operands are
/// lowered left to right, interleaved with pair construction. Inner pairs
/// span their own operands; the outermost pair spans the whole call.
fn lower_operator_chain(
    engine: &mut InferEngine<'_>,
    valenv: &Environment<Ty>,
    builtins: &BuiltinIds,
    args: &[Expr],
    op_ty: &Ty,
    span: Span,
) -> Result<HirExpr, DiagnosticError> {
    let mut acc = lower_expr(engine, valenv, builtins, &args[0])?;
    for (i, arg) in args[1..].iter().enumerate() {
        let right = lower_expr(engine, valenv, builtins, arg)?;
        let outermost = i == args.len() - 2;
        let pair_span = if outermost {
            span
        } else {
            acc.span.merge(right.span)
        };
        acc = lower_operator_pair(engine, op_ty, acc, right, pair_span);
    }
    Ok(acc)
}

fn lower_operator_pair(
    engine: &mut InferEngine<'_>,
    op_ty: &Ty,
    left: HirExpr,
    right: HirExpr,
    span: Span,
) -> HirExpr {
    let fnty = engine.instantiate(op_ty);
    let retty = engine.fresh_variable();
    let params = vec![engine.instantiate(&left.ty), engine.instantiate(&right.ty)];
    let id = engine.fresh_fn_id();
    engine.constrain(fnty, Ty::Function(FunctionTy::new(id, params, retty.clone())), span);

    HirExpr {
        kind: HirExprKind::BinaryOp {
            op: "+".to_string(),
            left: Box::new(left),
            right: Box::new(right),
        },
        ty: retty,
        span,
    }
}

fn lower_lambda(
    engine: &mut InferEngine<'_>,
    valenv: &Environment<Ty>,
    builtins: &BuiltinIds,
    params: &[Spanned<String>],
    body: &[Expr],
    tail: &Expr,
    span: Span,
) -> Result<HirExpr, DiagnosticError> {
    let mut scope = valenv.new_child();
    let mut hir_params = Vec::with_capacity(params.len());
    for param in params {
        let ty = engine.fresh_variable();
        scope.insert(param.node.clone(), ty.clone());
        hir_params.push(HirParam {
            name: param.node.clone(),
            ty,
            span: param.span,
        });
    }
    let resty = engine.fresh_variable();
    // The identity is fixed at construction so every reference to this
    // lambda, including recursive instantiation bookkeeping, agrees on it.
    let fn_id = engine.fresh_fn_id();

    let mut hir_body = Vec::with_capacity(body.len());
    for expr in body {
        hir_body.push(lower_expr(engine, &scope, builtins, expr)?);
    }
    let hir_tail = lower_expr(engine, &scope, builtins, tail)?;
    let tail_ty = engine.instantiate(&hir_tail.ty);
    engine.constrain(tail_ty, resty.clone(), tail.span);
    engine.solve_constraints()?;

    let fnty = FunctionTy::new(
        fn_id,
        hir_params.iter().map(|p| p.ty.clone()).collect(),
        resty,
    );
    let solved = engine.substitute_fun(&fnty);
    // Generalized against the enclosing scope, not the lambda's own, so
    // parameter variables of outer lambdas stay monomorphic.
    let scheme = engine.generalize(solved, valenv);

    Ok(HirExpr {
        kind: HirExprKind::Lambda {
            params: hir_params,
            body: hir_body,
            tail: Box::new(hir_tail),
        },
        ty: Ty::Scheme(scheme),
        span,
    })
}

fn lit_ty(lit: &Lit) -> Ty {
    match lit {
        Lit::Num(_) => Ty::number(),
        Lit::Bool(_) => Ty::boolean(),
        Lit::Unit => Ty::Unit,
    }
}

fn is_builtin_plus(ty: &Ty, builtins: &BuiltinIds) -> bool {
    matches!(ty, Ty::Function(f) if f.id == builtins.plus)
}

fn undefined_variable(name: &str, span: Span) -> DiagnosticError {
    DiagnosticError::single(
        Diagnostic::error(Category::UndefinedName, format!("Undefined variable {name}"))
            .at(span_to_location(span)),
    )
}

fn malformed_definition(name: &str, span: Span) -> DiagnosticError {
    DiagnosticError::single(
        Diagnostic::error(
            Category::MalformedDefinition,
            format!("Malformed definition {name}"),
        )
        .at(span_to_location(span))
        .with_help("a top-level define must bind a function; wrap the value in a lambda"),
    )
}
