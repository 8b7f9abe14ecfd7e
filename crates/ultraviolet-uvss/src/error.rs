use std::fmt;
use std::ops::Range;

/// Which phase produced a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Unrecognized character or unterminated literal; recovered as a token.
    Lex,
    /// Unexpected token; recovered by synthesizing a missing token or by
    /// skipping input.
    Parse,
}

/// A recovered lex or parse error. Neither phase aborts on these; they are
/// collected next to the tree so tooling can still classify the document.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Byte span in the source text.
    pub span: Range<usize>,
    /// 1-based source line number where the error occurred.
    pub line: usize,
    /// 1-based source column number where the error occurred.
    pub col: usize,
}

impl Diagnostic {
    pub(crate) fn new(
        kind: DiagnosticKind,
        msg: impl Into<String>,
        span: Range<usize>,
        (line, col): (usize, usize),
    ) -> Self {
        Self { kind, message: msg.into(), span, line, col }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.kind {
            DiagnosticKind::Lex => "lex",
            DiagnosticKind::Parse => "parse",
        };
        write!(f, "uvss {} error at {}:{}: {}", phase, self.line, self.col, self.message)
    }
}

impl std::error::Error for Diagnostic {}
