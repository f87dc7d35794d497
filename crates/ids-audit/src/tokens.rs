//! XML token stream
//!
//! The engine consumes a flat stream of [`TokenEvent`]s. [`XmlTokenSource`]
//! produces it from raw bytes with `quick-xml`, attaching 1-based positions and
//! interleaving the structural findings of a [`StructuralSchema`]. Findings about
//! an opening tag, including its place in the parent's content model, are queued
//! before its `Start` event; findings about missing children are queued before
//! the `End` event.

use crate::Result;
use crate::messages;
use crate::reporter::Severity;
use crate::structure::{ContentState, Finding, StructuralSchema};
use ids_ir::{Attributes, Position};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::VecDeque;
use std::io::{Cursor, Read};
use tracing::{debug, trace};

/// A structural problem reported by the token source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralDiagnostic {
    pub code: u32,
    pub severity: Severity,
    pub message: String,
    pub position: Position,
}

/// One event of the token stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenEvent {
    Start {
        name: String,
        position: Position,
        attributes: Attributes,
        self_closing: bool,
    },
    Text(String),
    End {
        name: String,
    },
    Diagnostic(StructuralDiagnostic),
}

/// Producer of token events; `None` ends the stream
pub trait TokenSource {
    fn next_event(&mut self) -> Option<TokenEvent>;
}

struct OpenElement {
    name: String,
    content: ContentState,
}

/// Token source over an in-memory XML document
pub struct XmlTokenSource {
    reader: Reader<Cursor<Vec<u8>>>,
    line_starts: Vec<usize>,
    schema: Option<StructuralSchema>,
    pending: VecDeque<TokenEvent>,
    open: Vec<OpenElement>,
    seen_root: bool,
    done: bool,
    buf: Vec<u8>,
}

impl XmlTokenSource {
    /// Read the whole document from `source`.
    ///
    /// Without a `schema` only well-formedness is checked.
    pub fn new<R: Read>(mut source: R, schema: Option<StructuralSchema>) -> Result<Self> {
        let mut bytes = Vec::new();
        source.read_to_end(&mut bytes)?;
        Ok(Self::from_bytes(bytes, schema))
    }

    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>, schema: Option<StructuralSchema>) -> Self {
        let line_starts = std::iter::once(0)
            .chain(bytes.iter().enumerate().filter(|(_, b)| **b == b'\n').map(|(i, _)| i + 1))
            .collect();

        let mut reader = Reader::from_reader(Cursor::new(bytes));
        reader.config_mut().trim_text(true);

        debug!(structural = schema.is_some(), "token source ready");
        Self {
            reader,
            line_starts,
            schema,
            pending: VecDeque::new(),
            open: Vec::new(),
            seen_root: false,
            done: false,
            buf: Vec::new(),
        }
    }

    /// 1-based line and column of a byte offset; columns count characters
    fn position_of(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|start| *start <= offset);
        let start = self.line_starts.get(line.saturating_sub(1)).copied().unwrap_or(0);
        let prefix = self.reader.get_ref().get_ref().get(start..offset).unwrap_or_default();
        let column = std::str::from_utf8(prefix).map_or(prefix.len(), |text| text.chars().count());
        Position::new(line.max(1), column + 1)
    }

    /// Position of the next `<` at or after `from`
    fn tag_position(&self, from: usize) -> Position {
        let bytes = self.reader.get_ref().get_ref();
        let offset = bytes
            .get(from..)
            .and_then(|rest| rest.iter().position(|b| *b == b'<'))
            .map_or(from, |i| from + i);
        self.position_of(offset)
    }

    fn queue_findings(&mut self, findings: Vec<Finding>, position: Position) {
        for finding in findings {
            let code = match finding.severity {
                Severity::Error => messages::STRUCTURE_ERROR,
                Severity::Warning | Severity::Info => messages::STRUCTURE_WARNING,
            };
            self.pending.push_back(TokenEvent::Diagnostic(StructuralDiagnostic {
                code,
                severity: finding.severity,
                message: finding.message,
                position,
            }));
        }
    }

    fn not_well_formed(&mut self, message: String, position: Position) {
        self.pending.push_back(TokenEvent::Diagnostic(StructuralDiagnostic {
            code: messages::NOT_WELL_FORMED,
            severity: Severity::Error,
            message,
            position,
        }));
        self.done = true;
    }

    fn start(&mut self, e: &BytesStart<'_>, position: Position, self_closing: bool) {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let mut attributes = Attributes::new();
        let mut namespaces = Vec::new();
        let mut malformed = Vec::new();

        for attr in e.attributes() {
            match attr {
                Ok(attr) => {
                    let value = match attr.unescape_value() {
                        Ok(v) => v.into_owned(),
                        Err(err) => {
                            malformed.push(Finding {
                                severity: Severity::Error,
                                message: format!("Invalid attribute value on '{name}': {err}"),
                            });
                            continue;
                        }
                    };
                    if attr.key.as_namespace_binding().is_some() {
                        namespaces.push(value);
                    } else {
                        attributes.insert(String::from_utf8_lossy(attr.key.as_ref()), value);
                    }
                }
                Err(err) => malformed.push(Finding {
                    severity: Severity::Error,
                    message: format!("Malformed attribute on '{name}': {err}"),
                }),
            }
        }
        self.queue_findings(malformed, position);

        let parent = self.open.last().map(|o| o.name.clone());
        if parent.is_none() && self.seen_root {
            self.not_well_formed(
                format!("Multiple root elements, found '{name}' after the document element"),
                position,
            );
            return;
        }
        self.seen_root = true;

        if let Some(schema) = &self.schema {
            let mut findings = schema.check_start(&name, parent.as_deref(), &attributes, &namespaces);
            if let Some(open) = self.open.last_mut() {
                findings.extend(schema.check_child(&open.name, &mut open.content, &name));
            }
            self.queue_findings(findings, position);
        }

        trace!(name = %name, line = position.line, self_closing, "start tag");
        self.pending.push_back(TokenEvent::Start {
            name: name.clone(),
            position,
            attributes,
            self_closing,
        });

        if self_closing {
            if let Some(schema) = &self.schema {
                let findings = schema.check_end(&name, &ContentState::default());
                self.queue_findings(findings, position);
            }
        } else {
            self.open.push(OpenElement {
                name,
                content: ContentState::default(),
            });
        }
    }

    fn end(&mut self, position: Position) {
        let Some(element) = self.open.pop() else {
            return;
        };
        if let Some(schema) = &self.schema {
            let findings = schema.check_end(&element.name, &element.content);
            self.queue_findings(findings, position);
        }
        self.pending.push_back(TokenEvent::End { name: element.name });
    }

    /// Read XML events until something is queued or the document ends
    fn fill(&mut self) {
        while self.pending.is_empty() && !self.done {
            let before = usize::try_from(self.reader.buffer_position()).unwrap_or(0);
            self.buf.clear();
            let result = self.reader.read_event_into(&mut self.buf).map(Event::into_owned);
            let event = match result {
                Ok(event) => event,
                Err(err) => {
                    let offset = usize::try_from(self.reader.error_position()).unwrap_or(before);
                    let position = self.position_of(offset);
                    self.not_well_formed(format!("The document is not well-formed: {err}"), position);
                    return;
                }
            };

            match event {
                Event::Start(e) => {
                    let position = self.tag_position(before);
                    self.start(&e, position, false);
                }
                Event::Empty(e) => {
                    let position = self.tag_position(before);
                    self.start(&e, position, true);
                }
                Event::End(_) => {
                    let position = self.tag_position(before);
                    self.end(position);
                }
                Event::Text(e) => match e.unescape() {
                    Ok(text) if !self.open.is_empty() => {
                        self.pending.push_back(TokenEvent::Text(text.into_owned()));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let position = self.position_of(before);
                        self.not_well_formed(format!("Invalid text content: {err}"), position);
                    }
                },
                Event::CData(e) if !self.open.is_empty() => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    self.pending.push_back(TokenEvent::Text(text));
                }
                Event::Eof => {
                    let position = self.position_of(before);
                    if let Some(open) = self.open.last() {
                        let message = format!("Unexpected end of document, '{}' is not closed", open.name);
                        self.not_well_formed(message, position);
                    } else if !self.seen_root {
                        self.not_well_formed("The document has no root element".to_string(), position);
                    }
                    self.done = true;
                }
                _ => {}
            }
        }
    }
}

impl TokenSource for XmlTokenSource {
    fn next_event(&mut self) -> Option<TokenEvent> {
        self.fill();
        self.pending.pop_front()
    }
}
