//! Tracing types for inference observability.
//!
//! These types capture a step-by-step trace of unification, surfaced by
//! `queso check --trace`. Tracing is opt-in via
//! [`crate::InferEngine::enable_tracing`]; when disabled, no steps are
//! recorded and no strings are built.

use serde::Serialize;

/// A single step in a unification trace.
#[derive(Debug, Clone, Serialize)]
pub struct UnifyStep {
    pub step: usize,
    pub action: UnifyAction,
    pub left: String,
    pub right: String,
    pub detail: String,
}

/// What action was taken during a unification step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnifyAction {
    /// Types are already identical; nothing recorded.
    Identity,
    /// Structural recursion: decompose function types into parameter and
    /// result obligations.
    Decompose,
    /// Type variable bound (e.g. `$3 := number`).
    Bind,
    /// Occurs check fired; an infinite type was prevented.
    OccursCheck,
    /// Unification failed with a type mismatch.
    Error,
}

impl UnifyAction {
    pub fn label(self) -> &'static str {
        match self {
            UnifyAction::Identity => "identity",
            UnifyAction::Decompose => "decompose",
            UnifyAction::Bind => "bind",
            UnifyAction::OccursCheck => "occurs_check",
            UnifyAction::Error => "error",
        }
    }
}
