//! Diagnostic records and sinks

use std::fmt;
use tracing::{error, info, warn};

/// Severity of a reported diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational only
    Info,
    /// Issue that does not fail the document by default
    Warning,
    /// The document is not compliant
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Where in the document a diagnostic applies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Positional path, e.g. `/ids1/specifications1/specification2`
    pub path: String,
    pub line: usize,
    pub column: usize,
    /// Element local name
    pub kind: String,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.path, self.line, self.column)
    }
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Numeric message code
    pub code: u32,
    pub severity: Severity,
    pub message: String,
    /// `None` for run-level problems not tied to an element
    pub location: Option<Location>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.code, self.severity, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " ({location})")?;
        }
        Ok(())
    }
}

/// Append-only receiver of diagnostics
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for &mut S {
    fn report(&mut self, diagnostic: Diagnostic) {
        (**self).report(diagnostic);
    }
}

/// Drops every diagnostic; only the status is kept
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _diagnostic: Diagnostic) {}
}

/// Keeps diagnostics in memory
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
}

impl CollectingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics with error severity
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Codes of all diagnostics, in report order
    #[must_use]
    pub fn codes(&self) -> Vec<u32> {
        self.diagnostics.iter().map(|d| d.code).collect()
    }

    #[must_use]
    pub fn has_code(&self, code: u32) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Emits each diagnostic as a `tracing` event
#[derive(Debug, Default, Clone)]
pub struct TracingSink {
    /// Document name attached to every event
    pub document: Option<String>,
}

impl TracingSink {
    #[must_use]
    pub fn for_document(document: impl Into<String>) -> Self {
        Self {
            document: Some(document.into()),
        }
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        let document = self.document.as_deref().unwrap_or("-");
        let (path, line, column, kind) = diagnostic.location.as_ref().map_or(("", 0, 0, ""), |l| {
            (l.path.as_str(), l.line, l.column, l.kind.as_str())
        });
        match diagnostic.severity {
            Severity::Error => error!(
                document, code = diagnostic.code, path, line, column, kind,
                "{}", diagnostic.message
            ),
            Severity::Warning => warn!(
                document, code = diagnostic.code, path, line, column, kind,
                "{}", diagnostic.message
            ),
            Severity::Info => info!(
                document, code = diagnostic.code, path, line, column, kind,
                "{}", diagnostic.message
            ),
        }
    }
}
