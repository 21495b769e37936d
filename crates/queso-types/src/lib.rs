//! Type representations for queso.
//!
//! This crate defines the semantic types used by the inference engine:
//! base constants, unification variables, function types with call-site
//! instantiation bookkeeping, and generalized schemes. Identity of a
//! variable is its [`TyVarId`]; two variables are the same variable exactly
//! when their ids are equal, regardless of how they print.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a type variable during inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyVarId(pub u32);

/// Unique identifier for a function type, assigned once at construction and
/// stable across every call-site instantiation of that function. Used to
/// correlate instantiations back to the generalized scheme they came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FnId(pub u32);

/// Mints [`TyVarId`]s. Owned by the compilation session; ids are unique for
/// the session's lifetime and never reused.
#[derive(Debug, Default)]
pub struct TyVarGen {
    next: u32,
}

impl TyVarGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> TyVarId {
        let id = TyVarId(self.next);
        self.next += 1;
        id
    }
}

/// Mints [`FnId`]s. Owned by the compilation session.
#[derive(Debug, Default)]
pub struct FnIdGen {
    next: u32,
}

impl FnIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> FnId {
        let id = FnId(self.next);
        self.next += 1;
        id
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A semantic type in queso.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    /// The unit type.
    Unit,
    /// A nominal base type: `number` or `boolean`.
    Constant(String),
    /// An unresolved unification variable.
    Variable(TyVarId),
    /// A function type.
    Function(FunctionTy),
    /// A let-bound generalized type.
    Scheme(TyScheme),
}

/// A function type with instantiation bookkeeping.
///
/// `instantiations` records, for each generalized call site, the list of
/// fresh variables substituted for the scheme's generics there. Solving is
/// deferred to the end of a definition, so these lists are rewritten by the
/// final substitution before they are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionTy {
    pub id: FnId,
    pub instantiations: Vec<Vec<Ty>>,
    pub parameters: Vec<Ty>,
    pub result: Box<Ty>,
}

impl FunctionTy {
    /// A function type with no recorded instantiations.
    pub fn new(id: FnId, parameters: Vec<Ty>, result: Ty) -> Self {
        Self {
            id,
            instantiations: Vec::new(),
            parameters,
            result: Box::new(result),
        }
    }
}

/// A generalized type: `∀ generics. body`.
///
/// `generics` is exactly the set of variable ids quantified at the binding;
/// an empty set is a monomorphic definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TyScheme {
    pub generics: BTreeSet<TyVarId>,
    pub body: FunctionTy,
}

impl Ty {
    pub fn number() -> Ty {
        Ty::Constant("number".to_string())
    }

    pub fn boolean() -> Ty {
        Ty::Constant("boolean".to_string())
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Ty::Function(_) | Ty::Scheme(_))
    }
}

// ---------------------------------------------------------------------------
// Free variables
// ---------------------------------------------------------------------------

/// Collect the variable ids occurring structurally in `ty`.
///
/// A scheme's quantified variables are bound, not free. Instantiation
/// bookkeeping is not part of a type's structure and does not contribute.
pub fn free_ty_vars(ty: &Ty) -> BTreeSet<TyVarId> {
    let mut vars = BTreeSet::new();
    collect_free(ty, &mut vars);
    vars
}

fn collect_free(ty: &Ty, vars: &mut BTreeSet<TyVarId>) {
    match ty {
        Ty::Unit | Ty::Constant(_) => {}
        Ty::Variable(v) => {
            vars.insert(*v);
        }
        Ty::Function(fun) => collect_free_fun(fun, vars),
        Ty::Scheme(scheme) => {
            let mut inner = BTreeSet::new();
            collect_free_fun(&scheme.body, &mut inner);
            for v in inner.difference(&scheme.generics) {
                vars.insert(*v);
            }
        }
    }
}

fn collect_free_fun(fun: &FunctionTy, vars: &mut BTreeSet<TyVarId>) {
    for param in &fun.parameters {
        collect_free(param, vars);
    }
    collect_free(&fun.result, vars);
}

/// Whether variable `v` occurs structurally inside `ty` (the occurs-check).
pub fn occurs_in(v: TyVarId, ty: &Ty) -> bool {
    match ty {
        Ty::Unit | Ty::Constant(_) => false,
        Ty::Variable(other) => *other == v,
        Ty::Function(fun) => occurs_in_fun(v, fun),
        Ty::Scheme(scheme) => !scheme.generics.contains(&v) && occurs_in_fun(v, &scheme.body),
    }
}

fn occurs_in_fun(v: TyVarId, fun: &FunctionTy) -> bool {
    fun.parameters.iter().any(|p| occurs_in(v, p)) || occurs_in(v, &fun.result)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Names variables during one rendering. Quantified variables get letters
/// `a`, `b`, ... in order of first occurrence in the scheme body; every
/// other variable prints as `$N` where `N` is its id.
struct TyPrinter {
    letters: HashMap<TyVarId, String>,
    next_letter: usize,
}

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

impl TyPrinter {
    fn new() -> Self {
        Self {
            letters: HashMap::new(),
            next_letter: 0,
        }
    }

    /// Assign letters to `generics` in order of first occurrence in `body`.
    fn quantify(&mut self, generics: &BTreeSet<TyVarId>, body: &FunctionTy) -> Vec<String> {
        let mut ordered = Vec::with_capacity(generics.len());
        occurrence_order_fun(body, generics, &mut ordered);
        // Generics that never occur in the body still need a letter.
        for v in generics {
            if !ordered.contains(v) {
                ordered.push(*v);
            }
        }

        let mut names = Vec::with_capacity(ordered.len());
        for v in ordered {
            let i = self.next_letter;
            self.next_letter += 1;
            let name = if i < LETTERS.len() {
                (LETTERS[i] as char).to_string()
            } else {
                format!("t{i}")
            };
            self.letters.insert(v, name.clone());
            names.push(name);
        }
        names
    }

    fn render(&mut self, ty: &Ty, out: &mut String) {
        match ty {
            Ty::Unit => out.push_str("unit"),
            Ty::Constant(name) => out.push_str(name),
            Ty::Variable(v) => match self.letters.get(v) {
                Some(letter) => out.push_str(letter),
                None => out.push_str(&format!("${}", v.0)),
            },
            Ty::Function(fun) => self.render_function(fun, out),
            Ty::Scheme(scheme) => {
                if !scheme.generics.is_empty() {
                    let names = self.quantify(&scheme.generics, &scheme.body);
                    out.push_str("∀ ");
                    out.push_str(&names.join(" "));
                    out.push_str(". ");
                }
                self.render_function(&scheme.body, out);
            }
        }
    }

    fn render_function(&mut self, fun: &FunctionTy, out: &mut String) {
        match fun.parameters.as_slice() {
            [single] => self.render(single, out),
            params => {
                out.push('(');
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.render(param, out);
                }
                out.push(')');
            }
        }
        out.push_str(" -> ");
        self.render(&fun.result, out);
    }
}

/// Push the members of `wanted` into `order` as they first occur in `ty`,
/// parameters before result, depth first.
fn occurrence_order(ty: &Ty, wanted: &BTreeSet<TyVarId>, order: &mut Vec<TyVarId>) {
    match ty {
        Ty::Unit | Ty::Constant(_) => {}
        Ty::Variable(v) => {
            if wanted.contains(v) && !order.contains(v) {
                order.push(*v);
            }
        }
        Ty::Function(fun) => occurrence_order_fun(fun, wanted, order),
        Ty::Scheme(scheme) => occurrence_order_fun(&scheme.body, wanted, order),
    }
}

fn occurrence_order_fun(fun: &FunctionTy, wanted: &BTreeSet<TyVarId>, order: &mut Vec<TyVarId>) {
    for param in &fun.parameters {
        occurrence_order(param, wanted, order);
    }
    occurrence_order(&fun.result, wanted, order);
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        TyPrinter::new().render(self, &mut out);
        f.write_str(&out)
    }
}
