//! Diagnostic reporting infrastructure.
//!
//! Compiler problems are never control flow: each stage records what it
//! found in a shared [`Handler`] and keeps going, so one run reports as many
//! problems as possible. A [`Diagnostic`] bundles the severity, the stage
//! that noticed it, the source position, the message, and optional help
//! lines printed indented under the main line.
//!
//! # Examples
//!
//! ```
//! use kuki_util::{Diagnostic, Handler, Span, Stage};
//!
//! let handler = Handler::new();
//! handler.emit(Diagnostic::error(Stage::Parse, "expected expression", Span::DUMMY));
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.error_count(), 1);
//! ```

use std::cell::RefCell;
use std::fmt;

use crate::span::{SourceMap, Span};

/// Diagnostic severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A problem that prevents code generation
    Error,
    /// A problem worth reporting that does not block compilation
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// The pipeline stage a diagnostic originated from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Tokenization and indentation handling
    Lex,
    /// Syntax analysis
    Parse,
    /// Name resolution
    Resolve,
    /// Type checking and inference
    Types,
    /// Control-flow legality checks
    Flow,
}

/// A single reported problem
///
/// # Examples
///
/// ```
/// use kuki_util::{Diagnostic, Level, Span, Stage};
///
/// let diag = Diagnostic::error(Stage::Lex, "unterminated string", Span::DUMMY)
///     .with_help("close the string with '\"'");
/// assert_eq!(diag.level, Level::Error);
/// assert_eq!(diag.helps.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct Diagnostic {
    /// Severity
    pub level: Level,
    /// Stage that reported the problem
    pub stage: Stage,
    /// Main message
    pub message: String,
    /// Source location of the offending token or node
    pub span: Span,
    /// Hint lines rendered indented under the main line
    pub helps: Vec<String>,
}

impl Diagnostic {
    /// Create a diagnostic
    pub fn new(level: Level, stage: Stage, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            stage,
            message: message.into(),
            span,
            helps: Vec::new(),
        }
    }

    /// Create an error diagnostic
    pub fn error(stage: Stage, message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, stage, message, span)
    }

    /// Create a warning diagnostic
    pub fn warning(stage: Stage, message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, stage, message, span)
    }

    /// Attach a help hint
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.helps.push(help.into());
        self
    }

    /// Render as `{file}:{line}:{column}: {message}` plus indented hints
    pub fn render(&self, sources: &SourceMap) -> String {
        let mut out = format!(
            "{}:{}:{}: {}",
            sources.name(self.span.file_id),
            self.span.line,
            self.span.column,
            self.message
        );
        for help in &self.helps {
            out.push_str("\n  help: ");
            out.push_str(help);
        }
        out
    }
}

/// Accumulator for diagnostics across all stages
///
/// The handler is shared by reference between stages; interior mutability
/// lets a stage holding only `&Handler` report problems.
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create an empty handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// True if any error-level diagnostic has been recorded
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    /// Number of error-level diagnostics
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// Number of warning-level diagnostics
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Warning)
            .count()
    }

    /// Clone out all recorded diagnostics
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Take all recorded diagnostics, leaving the handler empty
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }

    /// Render every diagnostic in source order, one per line
    ///
    /// Ordering is by file, then byte offset, so reported problems read in
    /// the order they appear in the source regardless of which stage found
    /// them.
    pub fn render_all(&self, sources: &SourceMap) -> String {
        let mut diags = self.diagnostics();
        diags.sort_by_key(|d| (d.span.file_id, d.span.start, d.span.end));
        diags
            .iter()
            .map(|d| d.render(sources))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
