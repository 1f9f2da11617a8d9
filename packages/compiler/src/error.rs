//! Compile-time diagnostics for the autoescaping passes.
//!
//! Every failure is fatal for the whole compilation unit: the first error
//! unwinds to the entry point and no tree edits are committed.

use thiserror::Error;

/// Failure categories surfaced by analysis and commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A template or typed block begins or ends in a context that is not
    /// valid for its declared content kind.
    KindMismatch,
    /// Conditional/switch branches or a loop body end in incompatible
    /// contexts.
    BranchDivergence,
    /// The context at a dynamic site is too ambiguous to pick a safe
    /// escaping (unknown URL part, unresolved JS slash, recursion whose
    /// output context cannot be computed).
    AmbiguousContext,
    /// A dynamic print or call appears inside an HTML/CSS/JS comment.
    ContentInComment,
    /// An explicit print directive contradicts the inferred context, or an
    /// autoescape-canceling directive appears outside a text block.
    DirectiveIncompatibility,
    /// A `{call}` target cannot be resolved, or a strict call crosses into
    /// an incompatible content kind.
    UnresolvableCall,
    /// Internal consistency violation (double edit, stuck scanner). Always
    /// a bug in the compiler, never in the template.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::KindMismatch => "kind mismatch",
            ErrorKind::BranchDivergence => "branch divergence",
            ErrorKind::AmbiguousContext => "ambiguous context",
            ErrorKind::ContentInComment => "content in comment",
            ErrorKind::DirectiveIncompatibility => "directive incompatibility",
            ErrorKind::UnresolvableCall => "unresolvable call",
            ErrorKind::Internal => "internal error",
        }
    }
}

/// A structured compile error carrying the offending template's name and a
/// 1-based line number.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("template {template}:{line}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub template: String,
    pub line: usize,
    pub message: String,
}

impl CompileError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            template: String::new(),
            line: 0,
            message: message.into(),
        }
    }

    /// Attach the template name and 1-based line, unless an inner error
    /// already carries them (the innermost location wins).
    pub fn at(mut self, template: &str, line: usize) -> Self {
        if self.template.is_empty() {
            self.template = template.to_string();
            self.line = line;
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
