#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # ids-audit
//!
//! Structural and semantic audit of IDS (Information Delivery Specification) documents.
//!
//! The [`AuditEngine`] streams an XML document through a [`tokens::TokenSource`],
//! builds an [`ids_ir::Tree`] of [`facets::Facet`] payloads on the fly and audits every
//! node once its closing tag is seen, so children are always audited before their
//! parent. Structural diagnostics and semantic results are folded into a single
//! [`AuditStatus`].
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ids_audit::{AuditEngine, AuditOptions, CollectingSink};
//!
//! let engine = AuditEngine::new(AuditOptions::default());
//! let mut sink = CollectingSink::new();
//! let status = engine.audit_file("specification.ids", &mut sink);
//! println!("{status}: {} diagnostics", sink.len());
//! ```

pub mod engine;
pub mod facets;
pub mod messages;
pub mod options;
pub mod reporter;
pub mod status;
pub mod structure;
pub mod tokens;

// Re-export main types
pub use engine::AuditEngine;
pub use options::{AuditOptions, IdsVersion, SchemaSelection, WarningBehavior, IDS_NAMESPACE};
pub use reporter::{CollectingSink, Diagnostic, DiagnosticSink, Location, NullSink, Severity, TracingSink};
pub use status::AuditStatus;

use thiserror::Error;

/// Errors that abort an audit before the document is processed
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IDS schema version not detected: {0}")]
    SchemaVersion(String),

    #[error("Invalid schema definition: {0}")]
    SchemaDefinition(String),

    #[error("Schema metadata error: {0}")]
    Schema(#[from] ids_schema::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Status flag reported for this error
    #[must_use]
    pub fn status(&self) -> AuditStatus {
        match self {
            Self::InvalidOptions(_) => AuditStatus::INVALID_OPTIONS,
            Self::NotFound(_) | Self::SchemaVersion(_) | Self::Io(_) => AuditStatus::NOT_FOUND,
            Self::SchemaDefinition(_) => AuditStatus::XSD_SCHEMA_ERROR,
            Self::Schema(_) => AuditStatus::UNHANDLED_ERROR,
        }
    }

    /// Message code reported for this error
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidOptions(_) => messages::OPTIONS,
            Self::NotFound(_) | Self::Io(_) => messages::RESOURCE,
            Self::SchemaVersion(_) => messages::SCHEMA_VERSION,
            Self::SchemaDefinition(_) => messages::SCHEMA_DEFINITION,
            Self::Schema(_) => messages::UNHANDLED,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            Error::InvalidOptions("x".into()).status(),
            AuditStatus::INVALID_OPTIONS
        );
        assert_eq!(Error::SchemaVersion("x".into()).status(), AuditStatus::NOT_FOUND);
        assert_eq!(
            Error::SchemaDefinition("x".into()).status(),
            AuditStatus::XSD_SCHEMA_ERROR
        );
        assert_eq!(Error::SchemaVersion("x".into()).code(), messages::SCHEMA_VERSION);
    }
}
