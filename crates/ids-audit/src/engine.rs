//! Streaming audit engine
//!
//! The engine resolves the structural rules, then drives a [`TokenSource`]
//! through a small state machine: opening tags attach nodes to an arena tree,
//! text accumulates on the open node and closing tags trigger the node's facet
//! audit. Structural diagnostics arrive ahead of the element they describe and
//! are buffered until the next opening tag names their node.

use crate::facets::{AuditContext, Facet, registry};
use crate::options::{AuditOptions, SchemaSelection, WarningBehavior};
use crate::reporter::{Diagnostic, DiagnosticSink, Location, Severity};
use crate::status::AuditStatus;
use crate::structure::{self, StructuralSchema};
use crate::tokens::{StructuralDiagnostic, TokenEvent, TokenSource, XmlTokenSource};
use crate::{Error, Result};
use ids_ir::{NodeId, Tree};
use ids_schema::{SchemaRegistry, SchemaSet};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Audits IDS documents against the structural rules and the IFC schema tables
pub struct AuditEngine {
    options: AuditOptions,
    registry: Arc<SchemaRegistry>,
}

impl AuditEngine {
    /// Engine backed by the configured schema tables, falling back to the embedded ones
    #[must_use]
    pub fn new(options: AuditOptions) -> Self {
        let registry = Arc::new(options.schema_registry());
        Self::with_registry(options, registry)
    }

    /// Engine sharing an existing registry
    #[must_use]
    pub fn with_registry(options: AuditOptions, registry: Arc<SchemaRegistry>) -> Self {
        Self { options, registry }
    }

    #[must_use]
    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    /// Audit the document at `path`
    pub fn audit_file(&self, path: impl AsRef<Path>, sink: &mut dyn DiagnosticSink) -> AuditStatus {
        let path = path.as_ref();
        match File::open(path) {
            Ok(file) => {
                info!(path = %path.display(), "auditing document");
                self.audit(BufReader::new(file), sink)
            }
            Err(e) => report_error(&Error::NotFound(format!("{}: {e}", path.display())), sink),
        }
    }

    /// Audit a document read from `source`
    pub fn audit<R: Read + Seek>(&self, mut source: R, sink: &mut dyn DiagnosticSink) -> AuditStatus {
        let (structural, schemas) = match self.prepare(&mut source) {
            Ok(prepared) => prepared,
            Err(e) => return report_error(&e, sink),
        };
        let tokens = match XmlTokenSource::new(source, structural) {
            Ok(tokens) => tokens,
            Err(e) => return report_error(&e, sink),
        };
        self.run(tokens, &schemas, sink)
    }

    /// Check every configured XSD file with the schema definition check
    pub fn check_schema_files(&self, sink: &mut dyn DiagnosticSink) -> AuditStatus {
        if let Err(e) = self.options.check() {
            return report_error(&e, sink);
        }
        let mut status = AuditStatus::OK;
        for path in &self.options.schema_files {
            if let Err(e) = check_schema_file(path) {
                status |= report_error(&e, sink);
            }
        }
        status
    }

    /// Everything that has to succeed before the first token is read
    fn prepare<R: Read + Seek>(&self, source: &mut R) -> Result<(Option<StructuralSchema>, SchemaSet)> {
        self.options.check()?;

        let structural = if self.options.structure {
            let version = match self.options.schema {
                SchemaSelection::Fixed(version) => version,
                SchemaSelection::Sniff => structure::sniff_version(source)?,
            };
            debug!(%version, "structural rules selected");
            Some(StructuralSchema::for_version(version))
        } else {
            None
        };

        for path in &self.options.schema_files {
            check_schema_file(path)?;
        }

        let schemas = self.registry.all()?;
        Ok((structural, schemas))
    }

    /// Drive `tokens` to the end and fold the outcome
    pub fn run<S: TokenSource>(&self, mut tokens: S, schemas: &SchemaSet, sink: &mut dyn DiagnosticSink) -> AuditStatus {
        let mut run = Run::new(schemas, self.options.warning_behavior, self.options.content);
        while let Some(event) = tokens.next_event() {
            run.handle(event, sink);
        }
        run.finish(sink)
    }
}

fn check_schema_file(path: &Path) -> Result<()> {
    let file = File::open(path).map_err(|e| Error::NotFound(format!("{}: {e}", path.display())))?;
    structure::check_schema_definition(BufReader::new(file)).map_err(|e| match e {
        Error::SchemaDefinition(detail) => Error::SchemaDefinition(format!("{}: {detail}", path.display())),
        other => other,
    })
}

/// Report a run-level error and return its status
fn report_error(error: &Error, sink: &mut dyn DiagnosticSink) -> AuditStatus {
    error!(code = error.code(), "{error}");
    sink.report(Diagnostic {
        code: error.code(),
        severity: Severity::Error,
        message: error.to_string(),
        location: None,
    });
    error.status()
}

/// A structural diagnostic waiting for its node
struct Buffered {
    diagnostic: StructuralDiagnostic,
    severity: Severity,
    flags: AuditStatus,
}

/// State of one document run
struct Run<'s> {
    schemas: &'s SchemaSet,
    warning_behavior: WarningBehavior,
    content: bool,
    tree: Tree<Facet>,
    stack: Vec<NodeId>,
    buffered: VecDeque<Buffered>,
    /// Structural status before the oldest buffered diagnostic arrived
    snapshot: AuditStatus,
    structural: AuditStatus,
    semantic: AuditStatus,
}

impl<'s> Run<'s> {
    fn new(schemas: &'s SchemaSet, warning_behavior: WarningBehavior, content: bool) -> Self {
        Self {
            schemas,
            warning_behavior,
            content,
            tree: Tree::new(),
            stack: Vec::new(),
            buffered: VecDeque::new(),
            snapshot: AuditStatus::OK,
            structural: AuditStatus::OK,
            semantic: AuditStatus::OK,
        }
    }

    fn handle(&mut self, event: TokenEvent, sink: &mut dyn DiagnosticSink) {
        match event {
            TokenEvent::Start {
                name,
                position,
                attributes,
                self_closing,
            } => {
                let facet = registry::build(&name, &attributes);
                let parent = self.stack.last().copied();
                let id = self.tree.insert(parent, name, position, attributes, facet);
                self.flush(Some(id), sink);
                if self_closing {
                    self.audit(id, sink);
                } else {
                    self.stack.push(id);
                }
            }
            TokenEvent::Text(text) => {
                if let Some(top) = self.stack.last() {
                    self.tree.append_text(*top, &text);
                }
            }
            TokenEvent::End { .. } => {
                if let Some(id) = self.stack.pop() {
                    self.audit(id, sink);
                }
            }
            TokenEvent::Diagnostic(diagnostic) => self.buffer(diagnostic),
        }
    }

    /// Status flag and reported severity of a structural diagnostic
    fn classify(&self, diagnostic: &StructuralDiagnostic) -> (AuditStatus, Severity) {
        match diagnostic.severity {
            Severity::Error => (AuditStatus::STRUCTURE_ERROR, Severity::Error),
            Severity::Warning | Severity::Info => match self.warning_behavior {
                WarningBehavior::Info => (AuditStatus::OK, Severity::Info),
                WarningBehavior::Warning => (AuditStatus::STRUCTURE_WARNING, Severity::Warning),
                WarningBehavior::Error => (AuditStatus::STRUCTURE_ERROR, Severity::Error),
            },
        }
    }

    fn buffer(&mut self, diagnostic: StructuralDiagnostic) {
        let (flags, severity) = self.classify(&diagnostic);
        if self.buffered.is_empty() {
            self.snapshot = self.structural;
        }
        self.structural |= flags;
        self.buffered.push_back(Buffered {
            diagnostic,
            severity,
            flags,
        });
    }

    /// Report buffered diagnostics against `node`.
    ///
    /// Occurrence diagnostics that land on an `attribute` facet are dropped and the
    /// structural status rebuilt without them.
    fn flush(&mut self, node: Option<NodeId>, sink: &mut dyn DiagnosticSink) {
        if self.buffered.is_empty() {
            return;
        }
        let on_attribute = node.is_some_and(|id| self.tree[id].kind == "attribute");
        let mut kept = AuditStatus::OK;
        let mut dropped = false;

        while let Some(entry) = self.buffered.pop_front() {
            let message = &entry.diagnostic.message;
            if on_attribute && (message.contains("minOccurs") || message.contains("maxOccurs")) {
                debug!(message = %message, "dropping occurrence diagnostic on attribute facet");
                dropped = true;
                continue;
            }
            kept |= entry.flags;
            let location = Location {
                path: node.map(|id| self.tree.positional_path(id)).unwrap_or_default(),
                line: entry.diagnostic.position.line,
                column: entry.diagnostic.position.column,
                kind: node.map(|id| self.tree[id].kind.clone()).unwrap_or_default(),
            };
            sink.report(Diagnostic {
                code: entry.diagnostic.code,
                severity: entry.severity,
                message: entry.diagnostic.message,
                location: Some(location),
            });
        }

        if dropped {
            self.structural = self.snapshot | kept;
        }
    }

    fn audit(&mut self, id: NodeId, sink: &mut dyn DiagnosticSink) {
        if !self.content {
            return;
        }
        let mut facet = std::mem::take(&mut self.tree[id].payload);
        let status = {
            let mut ctx = AuditContext::new(&self.tree, self.schemas, &mut *sink);
            facet.audit(id, &mut ctx)
        };
        self.tree[id].payload = facet;
        self.semantic |= status;
    }

    fn finish(mut self, sink: &mut dyn DiagnosticSink) -> AuditStatus {
        let root = self.tree.root();
        self.flush(root, sink);
        let status = self.structural | self.semantic;
        if status.is_ok() {
            info!(nodes = self.tree.len(), "document passed the audit");
        } else {
            warn!(nodes = self.tree.len(), %status, "document failed the audit");
        }
        status
    }
}
