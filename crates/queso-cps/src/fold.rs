//! Constant folding over the CPS tree.
//!
//! A `+` primop whose arguments are both number literals is replaced by its
//! branch, with the result variable substituted by the computed literal.
//! Folding one primop can turn the arguments of an enclosing one into
//! literals, so the rewrite re-folds each substituted branch until nothing
//! changes.

use crate::{CExpr, FixBinding, Value};

pub fn fold_constants(expr: CExpr) -> CExpr {
    match expr {
        CExpr::Fix {
            bindings,
            body,
            span,
        } => CExpr::Fix {
            bindings: bindings
                .into_iter()
                .map(|binding| FixBinding {
                    body: fold_constants(binding.body),
                    ..binding
                })
                .collect(),
            body: Box::new(fold_constants(*body)),
            span,
        },
        CExpr::PrimOp {
            op,
            args,
            results,
            branches,
            span,
        } => match folded_plus(&op, &args, &results, &branches) {
            Some((result, value, branch)) => {
                fold_constants(substitute_value(branch, &result, &value))
            }
            None => CExpr::PrimOp {
                op,
                args,
                results,
                branches: branches.into_iter().map(fold_constants).collect(),
                span,
            },
        },
        app @ CExpr::App { .. } => app,
    }
}

/// Fold a `+` over two literals, if possible.
///
/// Returns the result name to substitute, the literal standing in for it
/// (spanning both operands), and the branch to continue with.
fn folded_plus(
    op: &str,
    args: &[Value],
    results: &[String],
    branches: &[CExpr],
) -> Option<(String, Value, CExpr)> {
    if op != "+" {
        return None;
    }
    let (
        [
            Value::Number { value: l, span: ls },
            Value::Number { value: r, span: rs },
        ],
        [result],
        [branch],
    ) = (args, results, branches)
    else {
        return None;
    };
    Some((
        result.clone(),
        Value::Number {
            value: l + r,
            span: ls.merge(*rs),
        },
        branch.clone(),
    ))
}

fn substitute_value(expr: CExpr, from: &str, to: &Value) -> CExpr {
    match expr {
        CExpr::App { func, args, span } => CExpr::App {
            func: replace(func, from, to),
            args: args
                .into_iter()
                .map(|value| replace(value, from, to))
                .collect(),
            span,
        },
        CExpr::Fix {
            bindings,
            body,
            span,
        } => CExpr::Fix {
            bindings: bindings
                .into_iter()
                .map(|binding| FixBinding {
                    body: substitute_value(binding.body, from, to),
                    ..binding
                })
                .collect(),
            body: Box::new(substitute_value(*body, from, to)),
            span,
        },
        CExpr::PrimOp {
            op,
            args,
            results,
            branches,
            span,
        } => CExpr::PrimOp {
            op,
            args: args
                .into_iter()
                .map(|value| replace(value, from, to))
                .collect(),
            results,
            branches: branches
                .into_iter()
                .map(|branch| substitute_value(branch, from, to))
                .collect(),
            span,
        },
    }
}

fn replace(value: Value, from: &str, to: &Value) -> Value {
    match &value {
        // Generated result names are globally unique, so substitution can
        // never capture under a binder.
        Value::Var { name, .. } if name == from => to.clone(),
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NameGen;
    use insta::assert_snapshot;
    use queso_ast::{FileId, Span};
    use queso_types::{FnIdGen, TyVarGen};

    fn compile_folded(source: &str) -> CExpr {
        let module =
            queso_syntax::parse_module_source(source, FileId(0)).expect("source should parse");
        let mut ty_vars = TyVarGen::new();
        let mut fn_ids = FnIdGen::new();
        let lowered = queso_infer::lower_module(&module, &mut ty_vars, &mut fn_ids, false)
            .expect("source should typecheck");
        let mut names = NameGen::new();
        fold_constants(crate::lower::lower_module(&lowered.hir, &mut names))
    }

    fn sp(start: u32, end: u32) -> Span {
        Span::new(FileId(0), start, end)
    }

    #[test]
    fn a_literal_addition_folds_into_its_branch() {
        let prim = CExpr::PrimOp {
            op: "+".to_string(),
            args: vec![
                Value::Number {
                    value: 1.0,
                    span: sp(0, 1),
                },
                Value::Number {
                    value: 2.0,
                    span: sp(2, 3),
                },
            ],
            results: vec!["@@x-0".to_string()],
            branches: vec![CExpr::App {
                func: Value::Var {
                    name: "@@k-0".to_string(),
                    span: sp(0, 3),
                },
                args: vec![Value::Var {
                    name: "@@x-0".to_string(),
                    span: sp(0, 3),
                }],
                span: sp(0, 3),
            }],
            span: sp(0, 3),
        };

        let folded = fold_constants(prim);
        assert_eq!(folded.to_string(), "(app @@k-0 (3))");
        let CExpr::App { args, .. } = &folded else {
            panic!("expected an application");
        };
        assert!(
            matches!(&args[0], Value::Number { value, span }
                if *value == 3.0 && *span == sp(0, 3)),
            "the literal spans both operands"
        );
    }

    #[test]
    fn a_constant_body_folds_to_one_literal() {
        let cps = compile_folded("(define two (λ () (+ 1 1)))");
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((two (@@k-0) (app @@k-0 (2)))) (app main ()))"
        );
    }

    #[test]
    fn folding_cascades_through_nested_additions() {
        let source = "(define ten (λ () (+ (+ 1 2) (+ 3 4))))";
        let cps = compile_folded(source);
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((ten (@@k-0) (app @@k-0 (10)))) (app main ()))"
        );

        // The folded literal spans from the first operand to the last.
        let CExpr::Fix { bindings, .. } = &cps else {
            panic!("expected a fix");
        };
        let CExpr::App { args, .. } = &bindings[0].body else {
            panic!("expected an application body");
        };
        let one = source.find('1').unwrap() as u32;
        let four = source.find('4').unwrap() as u32;
        assert!(
            matches!(&args[0], Value::Number { value, span }
                if *value == 10.0 && *span == sp(one, four + 1))
        );
    }

    #[test]
    fn variables_block_folding() {
        let cps = compile_folded("(define f (λ (x) (+ x 1)))");
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((f (x @@k-0) (prim + (x 1) (@@x-0) (app @@k-0 (@@x-0))))) (app main ()))"
        );
    }

    #[test]
    fn literal_subtrees_fold_under_a_variable_operand() {
        let cps = compile_folded("(define f (λ (x) (+ (+ 1 2) x)))");
        assert_snapshot!(
            cps.to_string(),
            @"(fix ((f (x @@k-0) (prim + (3 x) (@@x-0) (app @@k-0 (@@x-0))))) (app main ()))"
        );
    }

    #[test]
    fn folding_is_idempotent() {
        let once = compile_folded("(define ten (λ () (+ (+ 1 2) (+ 3 4))))");
        assert_eq!(fold_constants(once.clone()), once);
    }
}
