//! Lowering from typed HIR to the CPS tree.
//!
//! The transform threads a continuation through the walk: each expression is
//! lowered to code that computes an atomic [`Value`] and hands it to the
//! continuation. Lambdas become [`CExpr::Fix`] bindings with a trailing
//! continuation parameter; every call allocates a return-address binding so
//! the call itself is a tail transfer.

use queso_ast::{Lit, Span};
use queso_hir::{HirExpr, HirExprKind, HirItem, HirModule, HirParam};

use crate::{CExpr, FixBinding, NameGen, Value};

type Cont<'h> = Box<dyn FnOnce(&mut NameGen, Value) -> CExpr + 'h>;
type ListCont<'h> = Box<dyn FnOnce(&mut NameGen, Vec<Value>) -> CExpr + 'h>;

/// Lower a typed module to one CPS expression.
///
/// Definitions nest right: each becomes a `Fix` whose body holds the
/// remaining items, ending in a jump to `main`.
pub fn lower_module(module: &HirModule, names: &mut NameGen) -> CExpr {
    lower_items(&module.items, names)
}

fn lower_items(items: &[HirItem], names: &mut NameGen) -> CExpr {
    match items.split_first() {
        None => CExpr::App {
            func: Value::Label {
                name: "main".to_string(),
                span: Span::synthetic(),
            },
            args: Vec::new(),
            span: Span::synthetic(),
        },
        Some((HirItem::Define(def), rest)) => match &def.value.kind {
            HirExprKind::Lambda { params, body, tail } => lower_lambda(
                params,
                body,
                tail,
                def.value.span,
                Some((def.name.clone(), def.span)),
                names,
                Box::new(move |names: &mut NameGen, _label| lower_items(rest, names)),
            ),
            // A define whose value is not a lambda (an alias like
            // `(define add +)`) contributes no binding of its own; the
            // value is computed and dropped.
            _ => lower_expr(
                &def.value,
                names,
                Box::new(move |names: &mut NameGen, _value| lower_items(rest, names)),
            ),
        },
    }
}

fn lower_expr<'h>(expr: &'h HirExpr, names: &mut NameGen, cont: Cont<'h>) -> CExpr {
    match &expr.kind {
        HirExprKind::Lit(lit) => {
            let value = literal_value(lit, expr.span);
            cont(names, value)
        }
        HirExprKind::Var(name) => cont(
            names,
            Value::Var {
                name: name.clone(),
                span: expr.span,
            },
        ),
        HirExprKind::BinaryOp { op, left, right } => {
            let result = names.fresh_var();
            let op = op.clone();
            let span = expr.span;
            lower_expr(
                left,
                names,
                Box::new(move |names: &mut NameGen, l| {
                    lower_expr(
                        right,
                        names,
                        Box::new(move |names: &mut NameGen, r| {
                            let branch = cont(
                                names,
                                Value::Var {
                                    name: result.clone(),
                                    span,
                                },
                            );
                            CExpr::PrimOp {
                                op,
                                args: vec![l, r],
                                results: vec![result],
                                branches: vec![branch],
                                span,
                            }
                        }),
                    )
                }),
            )
        }
        HirExprKind::Lambda { params, body, tail } => {
            lower_lambda(params, body, tail, expr.span, None, names, cont)
        }
        HirExprKind::Call { func, args } => {
            let return_address = names.fresh_cont();
            let ret_var = names.fresh_var();
            let span = expr.span;

            // The return-address binding receives the call's value and
            // feeds it to the surrounding continuation.
            let ret_value = Value::Var {
                name: ret_var.clone(),
                span,
            };
            let binding = FixBinding {
                name: return_address.clone(),
                params: vec![ret_var],
                body: cont(names, ret_value),
            };

            let callee_span = func.span;
            let call = lower_expr(
                func,
                names,
                Box::new(move |names: &mut NameGen, f| {
                    lower_values(
                        args,
                        Vec::new(),
                        names,
                        Box::new(move |_names: &mut NameGen, mut values: Vec<Value>| {
                            values.push(Value::Label {
                                name: return_address,
                                span,
                            });
                            CExpr::App {
                                func: f,
                                args: values,
                                span: callee_span,
                            }
                        }),
                    )
                }),
            );

            CExpr::Fix {
                bindings: vec![binding],
                body: Box::new(call),
                span,
            }
        }
    }
}

/// Lower a lambda into a single-binding `Fix` and pass its label on.
///
/// A top-level definition supplies its own name and item span; an anonymous
/// lambda gets a fresh `@@f` name and spans itself.
fn lower_lambda<'h>(
    params: &'h [HirParam],
    body: &'h [HirExpr],
    tail: &'h HirExpr,
    lambda_span: Span,
    named: Option<(String, Span)>,
    names: &mut NameGen,
    cont: Cont<'h>,
) -> CExpr {
    let (fn_name, fix_span) = match named {
        Some((name, span)) => (name, span),
        None => (names.fresh_fn(), lambda_span),
    };
    let k = names.fresh_cont();

    let fn_body = lower_body(body, tail, k.clone(), lambda_span, names);
    let mut param_names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
    param_names.push(k);

    let label = Value::Label {
        name: fn_name.clone(),
        span: lambda_span,
    };
    CExpr::Fix {
        bindings: vec![FixBinding {
            name: fn_name,
            params: param_names,
            body: fn_body,
        }],
        body: Box::new(cont(names, label)),
        span: fix_span,
    }
}

/// Lower a lambda body: effect expressions in order, values discarded, then
/// the tail value applied to the continuation parameter `k`.
fn lower_body<'h>(
    body: &'h [HirExpr],
    tail: &'h HirExpr,
    k: String,
    lambda_span: Span,
    names: &mut NameGen,
) -> CExpr {
    match body.split_first() {
        None => lower_expr(
            tail,
            names,
            Box::new(move |_names: &mut NameGen, value| CExpr::App {
                func: Value::Var {
                    name: k,
                    span: lambda_span,
                },
                args: vec![value],
                span: lambda_span,
            }),
        ),
        Some((first, rest)) => lower_expr(
            first,
            names,
            Box::new(move |names: &mut NameGen, _effect| {
                lower_body(rest, tail, k, lambda_span, names)
            }),
        ),
    }
}

fn lower_values<'h>(
    exprs: &'h [HirExpr],
    acc: Vec<Value>,
    names: &mut NameGen,
    cont: ListCont<'h>,
) -> CExpr {
    match exprs.split_first() {
        None => cont(names, acc),
        Some((first, rest)) => lower_expr(
            first,
            names,
            Box::new(move |names: &mut NameGen, value| {
                let mut acc = acc;
                acc.push(value);
                lower_values(rest, acc, names, cont)
            }),
        ),
    }
}

fn literal_value(lit: &Lit, span: Span) -> Value {
    match lit {
        // The lexer only emits digit runs, which always parse.
        Lit::Num(text) => Value::Number {
            value: text.parse().unwrap_or_default(),
            span,
        },
        Lit::Bool(value) => Value::Boolean {
            value: *value,
            span,
        },
        Lit::Unit => Value::Unit { span },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use queso_ast::FileId;
    use queso_types::{FnIdGen, TyVarGen};

    fn compile(source: &str) -> CExpr {
        let module =
            queso_syntax::parse_module_source(source, FileId(0)).expect("source should parse");
        let mut ty_vars = TyVarGen::new();
        let mut fn_ids = FnIdGen::new();
        let lowered = queso_infer::lower_module(&module, &mut ty_vars, &mut fn_ids, false)
            .expect("source should typecheck");
        let mut names = NameGen::new();
        lower_module(&lowered.hir, &mut names)
    }

    fn span_of(source: &str, fragment: &str) -> Span {
        let start = source.find(fragment).expect("fragment should be present") as u32;
        Span::new(FileId(0), start, start + fragment.len() as u32)
    }

    fn last_span_of(source: &str, fragment: &str) -> Span {
        let start = source.rfind(fragment).expect("fragment should be present") as u32;
        Span::new(FileId(0), start, start + fragment.len() as u32)
    }

    #[test]
    fn an_empty_module_jumps_to_main() {
        let cps = compile("");
        assert_eq!(cps.to_string(), "(app main ())");
        let CExpr::App { func, args, .. } = &cps else {
            panic!("expected an application");
        };
        assert!(matches!(func, Value::Label { name, .. } if name == "main"));
        assert!(args.is_empty());
    }

    #[test]
    fn a_constant_function_returns_through_its_continuation() {
        let source = "(define constant (λ () 3))";
        let cps = compile(source);
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((constant (@@k-0) (app @@k-0 (3)))) (app main ()))"
        );

        // The fix spans the whole item; the return spans the lambda; the
        // literal keeps its own span.
        let CExpr::Fix { bindings, span, .. } = &cps else {
            panic!("expected a fix");
        };
        assert_eq!(*span, span_of(source, "(define constant (λ () 3))"));
        let CExpr::App { args, span, .. } = &bindings[0].body else {
            panic!("expected an application body");
        };
        assert_eq!(*span, span_of(source, "(λ () 3)"));
        assert!(
            matches!(&args[0], Value::Number { value, span }
                if *value == 3.0 && *span == span_of(source, "3"))
        );
    }

    #[test]
    fn identity_forwards_its_parameter() {
        let cps = compile("(define id (λ (x) x))");
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((id (x @@k-0) (app @@k-0 (x)))) (app main ()))"
        );
    }

    #[test]
    fn addition_lowers_to_a_primop() {
        let source = "(define add (λ (x y) (+ x y)))";
        let cps = compile(source);
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((add (x y @@k-0) (prim + (x y) (@@x-0) (app @@k-0 (@@x-0))))) (app main ()))"
        );

        let CExpr::Fix { bindings, .. } = &cps else {
            panic!("expected a fix");
        };
        let CExpr::PrimOp { span, .. } = &bindings[0].body else {
            panic!("expected a primop body");
        };
        assert_eq!(*span, span_of(source, "(+ x y)"));
    }

    #[test]
    fn nested_calls_allocate_one_return_address_each() {
        let source = "(define double-call (λ (x) (debug (debug x))))";
        let cps = compile(source);
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((double-call (x @@k-0) (fix ((@@k-1 (@@x-0) (app @@k-0 (@@x-0)))) (fix ((@@k-2 (@@x-1) (app debug (@@x-1 @@k-1)))) (app debug (x @@k-2)))))) (app main ()))"
        );

        // Applications span their callee; the inner call runs first and
        // returns to `@@k-2`, which forwards into the outer call.
        let CExpr::Fix { bindings, .. } = &cps else {
            panic!("expected a fix");
        };
        let CExpr::Fix { body, .. } = &bindings[0].body else {
            panic!("expected the outer return-address fix");
        };
        let CExpr::Fix { body, .. } = body.as_ref() else {
            panic!("expected the inner return-address fix");
        };
        let CExpr::App { span, .. } = body.as_ref() else {
            panic!("expected the innermost application");
        };
        assert_eq!(*span, last_span_of(source, "debug"), "callee span");
    }

    #[test]
    fn effect_calls_run_before_the_tail() {
        let cps = compile("(define f (λ (x) (log x) x))");
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((f (x @@k-0) (fix ((@@k-1 (@@x-0) (app @@k-0 (x)))) (app log (x @@k-1))))) (app main ()))"
        );
    }

    #[test]
    fn an_aliased_builtin_leaves_no_binding() {
        let cps = compile("(define add +)\n(define f (λ (m n) (add m n)))");
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((f (m n @@k-0) (prim + (m n) (@@x-0) (app @@k-0 (@@x-0))))) (app main ()))"
        );
    }

    #[test]
    fn an_anonymous_lambda_gets_a_fresh_name() {
        let cps = compile("(define f (λ (x) ((λ (y) y) x)))");
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((f (x @@k-0) (fix ((@@k-1 (@@x-0) (app @@k-0 (@@x-0)))) (fix ((@@f-0 (y @@k-2) (app @@k-2 (y)))) (app @@f-0 (x @@k-1)))))) (app main ()))"
        );
    }

    #[test]
    fn operator_chains_nest_their_pairs() {
        let cps = compile("(define f (λ (x y z) (+ x y z)))");
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((f (x y z @@k-0) (prim + (x y) (@@x-1) (prim + (@@x-1 z) (@@x-0) (app @@k-0 (@@x-0)))))) (app main ()))"
        );
    }
}
