//! Pass pipeline for driving a compilation.
//!
//! A [`Compiler`] is an ordered list of passes. Each pass reads artifacts
//! produced by earlier passes out of the [`Artifacts`] bag and inserts its
//! own; requesting an artifact that no earlier pass produced is a fatal
//! pipeline diagnostic. The bag only accumulates, so later passes (and the
//! CLI) can still see every intermediate form after a run.
//!
//! All fresh-name state lives in the [`CompilationSession`], one per
//! compiled file. Sessions are never shared between compilations.

use std::fs;
use std::path::{Path, PathBuf};

use queso_ast::{FileId, Module};
use queso_cps::{CExpr, NameGen};
use queso_diag::{Category, Diagnostic, DiagnosticError};
use queso_hir::HirModule;
use queso_infer::Environment;
use queso_infer::trace::UnifyStep;
use queso_types::{FnIdGen, Ty, TyVarGen};

/// Generator state for one compilation.
///
/// Owns every id source the pipeline mints from, so two sessions can never
/// hand out overlapping type variables, function ids, or CPS names.
#[derive(Debug, Default)]
pub struct CompilationSession {
    pub ty_vars: TyVarGen,
    pub fn_ids: FnIdGen,
    pub names: NameGen,
    /// When set, the typecheck pass records a unification trace.
    pub tracing: bool,
    pub trace: Vec<UnifyStep>,
}

impl CompilationSession {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Artifacts produced and consumed by pipeline passes.
///
/// One field per artifact key. A getter on an unset field reports which
/// key is missing, which is how a misordered pipeline surfaces.
#[derive(Debug, Default)]
pub struct Artifacts {
    path: Option<PathBuf>,
    source: Option<String>,
    ast: Option<Module>,
    tyenv: Option<Environment<Ty>>,
    valenv: Option<Environment<Ty>>,
    hir: Option<HirModule>,
    cps: Option<CExpr>,
}

impl Artifacts {
    /// Start a compilation from a file on disk.
    pub fn for_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..Self::default()
        }
    }

    /// Start a compilation from in-memory source, skipping the read pass.
    pub fn for_source(source: String) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn path(&self) -> Result<&Path, DiagnosticError> {
        self.path.as_deref().ok_or_else(|| missing("path"))
    }

    pub fn source(&self) -> Result<&str, DiagnosticError> {
        self.source.as_deref().ok_or_else(|| missing("source"))
    }

    pub fn ast(&self) -> Result<&Module, DiagnosticError> {
        self.ast.as_ref().ok_or_else(|| missing("ast"))
    }

    pub fn tyenv(&self) -> Result<&Environment<Ty>, DiagnosticError> {
        self.tyenv.as_ref().ok_or_else(|| missing("tyenv"))
    }

    pub fn valenv(&self) -> Result<&Environment<Ty>, DiagnosticError> {
        self.valenv.as_ref().ok_or_else(|| missing("valenv"))
    }

    pub fn hir(&self) -> Result<&HirModule, DiagnosticError> {
        self.hir.as_ref().ok_or_else(|| missing("hir"))
    }

    pub fn cps(&self) -> Result<&CExpr, DiagnosticError> {
        self.cps.as_ref().ok_or_else(|| missing("cps"))
    }

    pub fn take_cps(&mut self) -> Result<CExpr, DiagnosticError> {
        self.cps.take().ok_or_else(|| missing("cps"))
    }

    pub fn set_source(&mut self, source: String) {
        self.source = Some(source);
    }

    pub fn set_ast(&mut self, ast: Module) {
        self.ast = Some(ast);
    }

    pub fn set_tyenv(&mut self, tyenv: Environment<Ty>) {
        self.tyenv = Some(tyenv);
    }

    pub fn set_valenv(&mut self, valenv: Environment<Ty>) {
        self.valenv = Some(valenv);
    }

    pub fn set_hir(&mut self, hir: HirModule) {
        self.hir = Some(hir);
    }

    pub fn set_cps(&mut self, cps: CExpr) {
        self.cps = Some(cps);
    }
}

fn missing(key: &str) -> DiagnosticError {
    DiagnosticError::single(Diagnostic::error(
        Category::Pipeline,
        format!("missing pipeline artifact `{key}`"),
    ))
}

/// A single pipeline stage.
pub type Pass = fn(&mut CompilationSession, &mut Artifacts) -> Result<(), DiagnosticError>;

#[derive(Debug)]
pub struct Compiler {
    passes: Vec<Pass>,
}

impl Compiler {
    /// Run every pass in order, stopping at the first error.
    pub fn run(
        &self,
        session: &mut CompilationSession,
        artifacts: &mut Artifacts,
    ) -> Result<(), DiagnosticError> {
        for pass in &self.passes {
            pass(session, artifacts)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CompilerBuilder {
    passes: Vec<Pass>,
}

impl CompilerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pass(mut self, pass: Pass) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn build(self) -> Compiler {
        Compiler {
            passes: self.passes,
        }
    }
}

/// Pipeline for `queso check`: stop after typechecking.
pub fn check_pipeline() -> Compiler {
    CompilerBuilder::new()
        .pass(read_source)
        .pass(parse_source)
        .pass(typecheck)
        .build()
}

/// Pipeline for `queso emit`: the full compilation.
pub fn emit_pipeline() -> Compiler {
    CompilerBuilder::new()
        .pass(read_source)
        .pass(parse_source)
        .pass(typecheck)
        .pass(lower_cps)
        .pass(fold_cps)
        .build()
}

pub fn read_source(
    _session: &mut CompilationSession,
    artifacts: &mut Artifacts,
) -> Result<(), DiagnosticError> {
    let path = artifacts.path()?;
    let source = fs::read_to_string(path).map_err(|err| {
        DiagnosticError::single(Diagnostic::error(
            Category::Pipeline,
            format!("failed to read `{}`: {err}", path.display()),
        ))
    })?;
    artifacts.set_source(source);
    Ok(())
}

pub fn parse_source(
    _session: &mut CompilationSession,
    artifacts: &mut Artifacts,
) -> Result<(), DiagnosticError> {
    let source = artifacts.source()?;
    // Sessions compile a single file, so it is always file 0.
    let module = queso_syntax::parse_module_source(source, FileId(0))
        .map_err(DiagnosticError::multiple)?;
    artifacts.set_ast(module);
    Ok(())
}

/// Infer types for every definition. Produces the typed HIR plus both
/// environments, and stashes the unification trace on the session when
/// tracing is on. Builtins are seeded as part of lowering.
pub fn typecheck(
    session: &mut CompilationSession,
    artifacts: &mut Artifacts,
) -> Result<(), DiagnosticError> {
    let module = artifacts.ast()?;
    let lowered = queso_infer::lower_module(
        module,
        &mut session.ty_vars,
        &mut session.fn_ids,
        session.tracing,
    )?;
    session.trace = lowered.trace;
    artifacts.set_hir(lowered.hir);
    artifacts.set_tyenv(lowered.tyenv);
    artifacts.set_valenv(lowered.valenv);
    Ok(())
}

pub fn lower_cps(
    session: &mut CompilationSession,
    artifacts: &mut Artifacts,
) -> Result<(), DiagnosticError> {
    let hir = artifacts.hir()?;
    let cps = queso_cps::lower_module(hir, &mut session.names);
    artifacts.set_cps(cps);
    Ok(())
}

pub fn fold_cps(
    _session: &mut CompilationSession,
    artifacts: &mut Artifacts,
) -> Result<(), DiagnosticError> {
    let cps = artifacts.take_cps()?;
    artifacts.set_cps(queso_cps::fold_constants(cps));
    Ok(())
}
