use std::ops::Range;

use thiserror::Error;
use ultraviolet_engine::time::ClockError;
use ultraviolet_uvss::Diagnostic;

// ── Compilation ───────────────────────────────────────────────────────────

/// Why a stylesheet construct could not be compiled.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompilationErrorKind {
    #[error("unresolved type '{0}'")]
    UnresolvedType(String),
    #[error("type '{owner}' has no property '{name}'")]
    UnknownProperty { owner: String, name: String },
    #[error("type '{owner}' has no event '{name}'")]
    UnknownEvent { owner: String, name: String },
    #[error("cannot parse '{text}' as {expected} under culture '{culture}'")]
    InvalidLiteral { text: String, expected: String, culture: String },
    #[error("invalid keyframe time '{0}'")]
    InvalidKeyframeTime(String),
    #[error("unknown easing function '{0}'")]
    UnknownEasing(String),
    #[error("unknown loop behavior '{0}'")]
    UnknownLoopBehavior(String),
    #[error("unknown storyboard '{0}'")]
    UnknownStoryboard(String),
    #[error("invalid culture name '{0}'")]
    InvalidCulture(String),
}

/// A compilation diagnostic, positioned by byte span in the source.
///
/// Collected into [`CompiledDocument::diagnostics`](crate::style::CompiledDocument);
/// never returned as `Err` from `compile`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct CompilationError {
    pub kind: CompilationErrorKind,
    pub span: Range<usize>,
}

impl CompilationError {
    pub(crate) fn new(kind: CompilationErrorKind, span: Range<usize>) -> Self {
        Self { kind, span }
    }
}

/// Why a stylesheet was rejected. Rejected stylesheets are never applied.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StylesheetError {
    #[error("stylesheet has {} syntax error(s); first: {}", .0.len(), first(.0))]
    Syntax(Vec<Diagnostic>),
    #[error("stylesheet has {} compilation error(s); first: {}", .0.len(), first(.0))]
    Compilation(Vec<CompilationError>),
}

fn first<T: std::fmt::Display>(items: &[T]) -> String {
    items.first().map(ToString::to_string).unwrap_or_default()
}

// ── UVML ──────────────────────────────────────────────────────────────────

/// Errors raised while compiling or instantiating UVML templates. These are
/// content errors and end the operation that hit them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UvmlError {
    #[error("uvml syntax error at {line}:{col}: {message}")]
    Markup { line: usize, col: usize, message: String },
    #[error("unknown type '{0}'")]
    UnknownType(String),
    #[error("type '{owner}' has no member '{name}'")]
    UnknownMember { owner: String, name: String },
    #[error("type '{0}' has no usable constructor")]
    NoValidConstructor(String),
    #[error("invalid binding expression '{0}'")]
    InvalidBindingExpression(String),
    #[error("no compiled expression for '{expression}' on data source '{wrapper}'")]
    MissingCompiledExpression { wrapper: String, expression: String },
    #[error("element '{0}' does not exist in this namescope")]
    ElementNotFound(String),
    #[error("element name '{0}' is already registered in this namescope")]
    DuplicateName(String),
    #[error("no event handler named '{0}'")]
    InvalidEventHandler(String),
    #[error("no localized string for key '{0}'")]
    MissingLocalization(String),
    #[error("cannot parse '{text}' as {expected}")]
    InvalidLiteral { text: String, expected: String },
    #[error("template instance has already been finalized")]
    AlreadyFinalized,
    #[error(transparent)]
    Property(#[from] PropertyError),
}

// ── Presentation ──────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PresentationError {
    #[error(transparent)]
    Stylesheet(#[from] StylesheetError),
    #[error(transparent)]
    Uvml(#[from] UvmlError),
    #[error(transparent)]
    Clock(#[from] ClockError),
    #[error("no storyboard named '{0}'")]
    UnknownStoryboard(String),
    #[error("'{element}' has no event '{name}'")]
    UnknownEvent { element: String, name: String },
}

// ── Dependency properties ─────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("'{owner}.{name}' expects {expected}, got {actual}")]
    TypeMismatch { owner: String, name: String, expected: String, actual: String },
    #[error("'{element}' has no property '{name}'")]
    UnknownProperty { element: String, name: String },
    #[error("'{element}' has no collection '{name}'")]
    UnknownCollection { element: String, name: String },
}
