//! Continuation-passing style (CPS) tree for queso.
//!
//! CPS is the pipeline's final artifact: every intermediate value is named,
//! evaluation order is explicit, and control transfer is always a tail call.
//! Functions receive an extra continuation parameter and return by applying
//! it.
//!
//! The tree prints as single-line s-expressions via [`fmt::Display`].

use std::fmt;

use queso_ast::Span;

pub mod fold;
pub mod lower;

pub use fold::fold_constants;
pub use lower::lower_module;

/// An atomic CPS value. Compound computation lives in [`CExpr`] only.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A bound variable: a parameter or a primop result.
    Var { name: String, span: Span },
    /// The name of a [`CExpr::Fix`]-bound function.
    Label { name: String, span: Span },
    Unit { span: Span },
    Number { value: f64, span: Span },
    Boolean { value: bool, span: Span },
}

/// One function bound by a [`CExpr::Fix`].
///
/// A source lambda's binding carries its parameters plus a trailing
/// continuation parameter; a return-address binding carries exactly one
/// parameter, the returned value.
#[derive(Debug, Clone, PartialEq)]
pub struct FixBinding {
    pub name: String,
    pub params: Vec<String>,
    pub body: CExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CExpr {
    /// Tail call: transfer control to `func` with `args`. Never returns.
    App {
        func: Value,
        args: Vec<Value>,
        span: Span,
    },
    /// Bind functions, then continue with `body`.
    Fix {
        bindings: Vec<FixBinding>,
        body: Box<CExpr>,
        span: Span,
    },
    /// Apply a primitive to `args`, binding `results`, then continue with
    /// the branch. Arithmetic primitives have one result and one branch.
    PrimOp {
        op: String,
        args: Vec<Value>,
        results: Vec<String>,
        branches: Vec<CExpr>,
        span: Span,
    },
}

// ---------------------------------------------------------------------------
// Fresh names
// ---------------------------------------------------------------------------

/// Mints hygienic CPS names. Owned by the compilation session; the `@@`
/// prefix cannot appear in source identifiers, so minted names never collide
/// with user bindings.
#[derive(Debug, Default)]
pub struct NameGen {
    fns: u32,
    conts: u32,
    vars: u32,
}

impl NameGen {
    pub fn new() -> Self {
        Self::default()
    }

    /// A function name: `@@f-0`, `@@f-1`, ...
    pub fn fresh_fn(&mut self) -> String {
        let id = self.fns;
        self.fns += 1;
        format!("@@f-{id}")
    }

    /// A continuation name: `@@k-0`, `@@k-1`, ...
    pub fn fresh_cont(&mut self) -> String {
        let id = self.conts;
        self.conts += 1;
        format!("@@k-{id}")
    }

    /// A value name: `@@x-0`, `@@x-1`, ...
    pub fn fresh_var(&mut self) -> String {
        let id = self.vars;
        self.vars += 1;
        format!("@@x-{id}")
    }
}

// ---------------------------------------------------------------------------
// Printing
// ---------------------------------------------------------------------------

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Var { name, .. } | Value::Label { name, .. } => f.write_str(name),
            Value::Unit { .. } => f.write_str("()"),
            // f64 Display drops the fractional part of whole numbers, so a
            // folded `(+ 1 1)` prints as `2`, not `2.0`.
            Value::Number { value, .. } => write!(f, "{value}"),
            Value::Boolean { value: true, .. } => f.write_str("#t"),
            Value::Boolean { value: false, .. } => f.write_str("#f"),
        }
    }
}

fn write_values(f: &mut fmt::Formatter<'_>, values: &[Value]) -> fmt::Result {
    f.write_str("(")?;
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{value}")?;
    }
    f.write_str(")")
}

impl fmt::Display for FixBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} (", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(param)?;
        }
        write!(f, ") {})", self.body)
    }
}

impl fmt::Display for CExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CExpr::App { func, args, .. } => {
                write!(f, "(app {func} ")?;
                write_values(f, args)?;
                f.write_str(")")
            }
            CExpr::Fix { bindings, body, .. } => {
                f.write_str("(fix (")?;
                for (i, binding) in bindings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{binding}")?;
                }
                write!(f, ") {body})")
            }
            CExpr::PrimOp {
                op,
                args,
                results,
                branches,
                ..
            } => {
                write!(f, "(prim {op} ")?;
                write_values(f, args)?;
                f.write_str(" (")?;
                for (i, result) in results.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(result)?;
                }
                f.write_str(")")?;
                for branch in branches {
                    write!(f, " {branch}")?;
                }
                f.write_str(")")
            }
        }
    }
}
