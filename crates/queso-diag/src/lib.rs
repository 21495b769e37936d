//! Error reporting and diagnostics for queso.
//!
//! This crate provides structured diagnostics with source location tracking.
//! Every compilation failure is fatal: diagnostics are collected, wrapped in
//! a [`DiagnosticError`], and surfaced to the caller. There is no recovery
//! and no partial output.
//!
//! Diagnostics are created by other crates (for example, `queso-infer` and
//! `queso-syntax`) and rendered by the CLI.

use std::fmt;

// ---------------------------------------------------------------------------
// Diagnostic severity and categories
// ---------------------------------------------------------------------------

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// Broad category for diagnostics. Used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Source text contains a byte no token can start with.
    Lex,
    /// Token stream does not parse as a module.
    Parse,
    /// A referenced variable has no binding in scope.
    UndefinedName,
    /// Two types failed to unify.
    TypeMismatch,
    /// A type variable occurs inside the type it unifies with.
    SelfReferentialType,
    /// A top-level definition whose value is not a function.
    MalformedDefinition,
    /// A pipeline stage was run without an artifact it requires.
    Pipeline,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Lex,
        Category::Parse,
        Category::UndefinedName,
        Category::TypeMismatch,
        Category::SelfReferentialType,
        Category::MalformedDefinition,
        Category::Pipeline,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Lex => "lex",
            Category::Parse => "parse",
            Category::UndefinedName => "undefined_name",
            Category::TypeMismatch => "type_mismatch",
            Category::SelfReferentialType => "self_referential_type",
            Category::MalformedDefinition => "malformed_definition",
            Category::Pipeline => "pipeline",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::Lex => "E0001",
            Category::Parse => "E0002",
            Category::UndefinedName => "E0003",
            Category::TypeMismatch => "E0004",
            Category::SelfReferentialType => "E0005",
            Category::MalformedDefinition => "E0006",
            Category::Pipeline => "E0007",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Lex => "Source text contains a character that is not part of any token.",
            Category::Parse => "Source text does not parse as a valid queso module.",
            Category::UndefinedName => "A referenced variable or function is undefined.",
            Category::TypeMismatch => "Two types that must be equal cannot be unified.",
            Category::SelfReferentialType => {
                "A type variable would have to contain itself (infinite type)."
            }
            Category::MalformedDefinition => "A top-level `define` must bind a function value.",
            Category::Pipeline => "A compiler stage ran before the artifact it consumes existed.",
        }
    }

    pub fn example_fix(self) -> &'static str {
        match self {
            Category::Lex => "Remove or replace the offending character.",
            Category::Parse => "Fix the syntax near the highlighted span.",
            Category::UndefinedName => "Define the missing name or fix the spelling.",
            Category::TypeMismatch => "Adjust the expression so both sides have the same type.",
            Category::SelfReferentialType => {
                "Break the cycle; a function cannot be applied to itself here."
            }
            Category::MalformedDefinition => "Wrap the defined value in a lambda.",
            Category::Pipeline => "Reorder the passes so producers run before consumers.",
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations (independent of queso-ast's Span)
// ---------------------------------------------------------------------------

/// A source location for diagnostics.
///
/// Uses byte offsets. Callers convert from `queso-ast` spans to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic message.
///
/// Every diagnostic carries enough context to point the user at the failing
/// span without exposing internal compiler state.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0004).
    pub code: Option<String>,
    pub severity: Severity,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    pub location: Option<SourceLocation>,
    /// Suggested fix, if any.
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity: Severity::Error,
            category,
            message: message.into(),
            location: None,
            help: None,
        }
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity: Severity::Warning,
            category,
            message: message.into(),
            location: None,
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{prefix}[{code}]: {}", self.message)?;
        } else {
            write!(f, "{prefix}: {}", self.message)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn single(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }

    pub fn multiple(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_builder() {
        let loc = SourceLocation {
            file_id: 0,
            start: 10,
            end: 20,
        };
        let diag = Diagnostic::error(Category::TypeMismatch, "Expected number, found boolean")
            .at(loc)
            .with_help("both operands of `+` must be numbers");

        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.code.as_deref(), Some("E0004"));
        assert_eq!(diag.category, Category::TypeMismatch);
        assert!(diag.message.contains("Expected number"));
        assert!(diag.help.unwrap().contains("operands"));
    }

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::error(Category::UndefinedName, "Undefined variable y");
        let s = format!("{diag}");
        assert!(s.starts_with("error[E0003]: Undefined variable y"));
    }

    #[test]
    fn warning_display_uses_warning_prefix() {
        let diag = Diagnostic::warning(Category::Parse, "trailing tokens ignored");
        assert!(format!("{diag}").starts_with("warning[E0002]:"));
    }

    #[test]
    fn category_metadata_is_stable_and_unique() {
        let mut codes = std::collections::BTreeSet::new();
        for cat in Category::all() {
            assert!(!cat.as_str().is_empty());
            assert!(!cat.description().is_empty());
            assert!(!cat.example_fix().is_empty());
            assert!(
                codes.insert(cat.code()),
                "duplicate diagnostic code detected: {}",
                cat.code()
            );
        }
    }

    #[test]
    fn diagnostic_error_displays_first() {
        let err = DiagnosticError::multiple(vec![
            Diagnostic::error(Category::Parse, "expected `)`"),
            Diagnostic::error(Category::Parse, "expected expression"),
        ]);
        assert!(err.to_string().contains("expected `)`"));
    }
}
