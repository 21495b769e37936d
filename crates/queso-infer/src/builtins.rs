//! Builtin type and value environments seeded before user definitions.
//!
//! Every builtin function type gets a session-minted [`FnId`] so call sites
//! can be correlated back to it. The id of `+` is how application lowering
//! recognizes arithmetic and rewrites it into a `BinaryOp` node; a user
//! rebinding of `+` gets a different id and stays a general call.

use std::collections::BTreeSet;

use queso_types::{FnId, FnIdGen, FunctionTy, Ty, TyScheme, TyVarGen, TyVarId};

use crate::env::Environment;

/// Function ids of builtins that lowering treats specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinIds {
    pub plus: FnId,
}

/// Seed the type and value environments with the builtin bindings:
///
/// ```text
/// debug  : ∀ a. a -> a
/// log    : ∀ a. a -> unit
/// +      : (number, number) -> number
/// =      : ∀ a. (a, a) -> boolean
/// iszero : number -> boolean
/// and    : (boolean, boolean) -> boolean
/// ```
///
/// Ids come from the session's generators, so two sessions never share a
/// builtin identity.
pub fn install(
    tyenv: &mut Environment<Ty>,
    valenv: &mut Environment<Ty>,
    ty_vars: &mut TyVarGen,
    fn_ids: &mut FnIdGen,
) -> BuiltinIds {
    tyenv.insert("number", Ty::number());
    tyenv.insert("boolean", Ty::boolean());

    let a = ty_vars.fresh();
    valenv.insert(
        "debug",
        scheme(
            &[a],
            FunctionTy::new(fn_ids.fresh(), vec![Ty::Variable(a)], Ty::Variable(a)),
        ),
    );

    let b = ty_vars.fresh();
    valenv.insert(
        "log",
        scheme(
            &[b],
            FunctionTy::new(fn_ids.fresh(), vec![Ty::Variable(b)], Ty::Unit),
        ),
    );

    let plus = fn_ids.fresh();
    valenv.insert(
        "+",
        scheme(
            &[],
            FunctionTy::new(plus, vec![Ty::number(), Ty::number()], Ty::number()),
        ),
    );

    let c = ty_vars.fresh();
    valenv.insert(
        "=",
        scheme(
            &[c],
            FunctionTy::new(
                fn_ids.fresh(),
                vec![Ty::Variable(c), Ty::Variable(c)],
                Ty::boolean(),
            ),
        ),
    );

    valenv.insert(
        "iszero",
        scheme(
            &[],
            FunctionTy::new(fn_ids.fresh(), vec![Ty::number()], Ty::boolean()),
        ),
    );

    valenv.insert(
        "and",
        scheme(
            &[],
            FunctionTy::new(
                fn_ids.fresh(),
                vec![Ty::boolean(), Ty::boolean()],
                Ty::boolean(),
            ),
        ),
    );

    BuiltinIds { plus }
}

fn scheme(generics: &[TyVarId], body: FunctionTy) -> Ty {
    Ty::Scheme(TyScheme {
        generics: BTreeSet::from_iter(generics.iter().copied()),
        body,
    })
}
