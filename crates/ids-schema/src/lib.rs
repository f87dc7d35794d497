#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # ids-schema
//!
//! IFC schema metadata store, class hierarchy resolution and type-constraint algebra.
//!
//! Each supported IFC schema version ships a flat class table (classes, declared
//! attributes, predefined types, property sets, relations). Tables are loaded once,
//! linked into a navigable class tree and then only queried:
//! flat table → linked class tree → attribute index → cross-version shared queries.

pub mod constraint;
pub mod inheritance;
pub mod loader;
pub mod model;
pub mod registry;
pub mod shared;
pub mod version;

pub use constraint::{ConcreteClassCatalog, TypeConstraint};
pub use loader::SchemaLoader;
pub use model::{
    AssociationKind, AttributeIndex, ClassId, ClassInfo, ClassKind, ClassTree, FunctionalRole,
    PropertyDefinition, PropertySetInfo, RelationInfo, SchemaMetadata,
};
pub use registry::{SchemaRegistry, SchemaSet};
pub use version::{IfcSchemaVersion, IfcSchemaVersions};

use thiserror::Error;

/// Errors that can occur when loading schema tables
#[derive(Error, Debug)]
pub enum Error {
    #[error("Schema table not found: {0}")]
    NotFound(String),

    #[error("Invalid schema table format: {0}")]
    InvalidFormat(String),

    #[error("Unknown IFC schema version: {0}")]
    UnknownVersion(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
