//! Audit options
#![allow(clippy::must_use_candidate)]

use crate::{Error, Result};
use ids_schema::{SchemaLoader, SchemaRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// IDS namespace every document and schema definition must declare
pub const IDS_NAMESPACE: &str = "http://standards.buildingsmart.org/IDS";

/// Published IDS schema versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IdsVersion {
    #[serde(rename = "0.9.6")]
    V0_9_6,
    #[serde(rename = "0.9.7")]
    V0_9_7,
    #[serde(rename = "1.0")]
    V1_0,
}

impl IdsVersion {
    pub const ALL: [Self; 3] = [Self::V0_9_6, Self::V0_9_7, Self::V1_0];

    /// Parse a version as written in a schema location (`1.0`, `0.9.7`, ...)
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "0.9.6" => Some(Self::V0_9_6),
            "0.9.7" => Some(Self::V0_9_7),
            "1.0" | "1.0.0" => Some(Self::V1_0),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V0_9_6 => "0.9.6",
            Self::V0_9_7 => "0.9.7",
            Self::V1_0 => "1.0",
        }
    }

    /// Published location of the version's XSD
    pub fn schema_location(self) -> String {
        format!("{IDS_NAMESPACE}/{}/ids.xsd", self.as_str())
    }

    /// Versions before 1.0 express facet cardinality with `minOccurs`/`maxOccurs`
    pub fn uses_occurs(self) -> bool {
        self != Self::V1_0
    }
}

impl fmt::Display for IdsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the structural schema version is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSelection {
    /// Always use the given version
    Fixed(IdsVersion),
    /// Read the version from the document's `xsi:schemaLocation`
    #[default]
    Sniff,
}

/// How structural warnings affect the status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningBehavior {
    /// Reported, no status flag
    Info,
    /// Flags `STRUCTURE_WARNING`
    #[default]
    Warning,
    /// Flags `STRUCTURE_ERROR`
    Error,
}

/// Options of one audit run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditOptions {
    pub schema: SchemaSelection,
    pub warning_behavior: WarningBehavior,
    /// Check elements, attributes and nesting against the structural rules
    pub structure: bool,
    /// Run the semantic facet audits
    pub content: bool,
    /// XSD files that must pass the schema definition check before auditing
    pub schema_files: Vec<PathBuf>,
    /// Directories searched for IFC schema tables (`ifc4.json`, `ifc2x3.yaml`, ...)
    /// that replace the embedded ones
    pub schema_tables: Vec<PathBuf>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            schema: SchemaSelection::Sniff,
            warning_behavior: WarningBehavior::Warning,
            structure: true,
            content: true,
            schema_files: Vec::new(),
            schema_tables: Vec::new(),
        }
    }
}

impl AuditOptions {
    pub fn with_schema(mut self, schema: SchemaSelection) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_warning_behavior(mut self, behavior: WarningBehavior) -> Self {
        self.warning_behavior = behavior;
        self
    }

    pub fn with_content(mut self, content: bool) -> Self {
        self.content = content;
        self
    }

    pub fn with_structure(mut self, structure: bool) -> Self {
        self.structure = structure;
        self
    }

    pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_files.push(path.into());
        self
    }

    pub fn with_schema_tables(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_tables.push(dir.into());
        self
    }

    /// Schema registry reading the configured table directories first
    pub fn schema_registry(&self) -> SchemaRegistry {
        SchemaRegistry::new(SchemaLoader::new(self.schema_tables.clone()))
    }

    /// Validate the option set before any document is read
    pub fn check(&self) -> Result<()> {
        if !self.structure && !self.content {
            return Err(Error::InvalidOptions(
                "no audit selected, enable structure or content checks".to_string(),
            ));
        }
        if let Some(missing) = self.schema_files.iter().find(|p| !p.is_file()) {
            return Err(Error::NotFound(missing.display().to_string()));
        }
        if let Some(missing) = self.schema_tables.iter().find(|p| !p.is_dir()) {
            return Err(Error::NotFound(format!("schema table directory {}", missing.display())));
        }
        Ok(())
    }
}
