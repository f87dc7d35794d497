//! Schema table loader
//!
//! Tables ship embedded in the crate and can be overridden by JSON or YAML files
//! found in the loader's search paths.

use crate::inheritance::{build_attribute_index, link_tree, propagate_type_relation, set_functional_role};
use crate::model::{
    AssociationKind, ClassInfo, ClassKind, ClassTree, FunctionalRole, PropertySetInfo, RelationInfo,
    SchemaMetadata,
};
use crate::version::IfcSchemaVersion;
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

const EMBEDDED_IFC2X3: &str = include_str!("../data/ifc2x3.json");
const EMBEDDED_IFC4: &str = include_str!("../data/ifc4.json");
const EMBEDDED_IFC4X3: &str = include_str!("../data/ifc4x3.json");

/// Serializable schema table format
#[derive(Debug, Deserialize)]
struct SchemaTableFile {
    version: String,
    #[serde(default)]
    type_root: Option<String>,
    #[serde(default)]
    classes: Vec<ClassFile>,
    #[serde(default)]
    type_relations: Vec<TypeRelationFile>,
    #[serde(default)]
    relations: Vec<RelationInfo>,
    #[serde(default)]
    associations: BTreeMap<AssociationKind, Vec<String>>,
    #[serde(default)]
    data_types: Vec<String>,
    #[serde(default)]
    property_sets: Vec<PropertySetInfo>,
}

#[derive(Debug, Deserialize)]
struct ClassFile {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default = "default_kind")]
    kind: ClassKind,
    #[serde(default)]
    attributes: Vec<String>,
    #[serde(default)]
    predefined_types: Vec<String>,
}

fn default_kind() -> ClassKind {
    ClassKind::Concrete
}

#[derive(Debug, Deserialize)]
struct TypeRelationFile {
    object: String,
    #[serde(default)]
    types: Vec<String>,
}

/// Loads per-version schema tables and builds [`SchemaMetadata`]
#[derive(Debug, Clone, Default)]
pub struct SchemaLoader {
    search_paths: Vec<PathBuf>,
}

impl SchemaLoader {
    /// Create a loader that looks in `search_paths` before falling back to the
    /// embedded tables
    #[must_use]
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    /// Add a search path for table files
    pub fn add_path(&mut self, path: PathBuf) {
        self.search_paths.push(path);
    }

    #[must_use]
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Load the table for `version`.
    ///
    /// Files named `ifc4.json`, `ifc4.yaml` or `ifc4.yml` (for IFC4) in a search path
    /// take precedence over the embedded table.
    pub fn load_version(&self, version: IfcSchemaVersion) -> Result<SchemaMetadata> {
        let stem = version.as_str().to_ascii_lowercase();
        for dir in &self.search_paths {
            for ext in ["json", "yaml", "yml"] {
                let path = dir.join(format!("{stem}.{ext}"));
                if path.exists() {
                    trace!(?path, "found schema table file");
                    let metadata = self.load_from_file(&path)?;
                    if metadata.version != version {
                        return Err(Error::InvalidFormat(format!(
                            "{} declares {} instead of {version}",
                            path.display(),
                            metadata.version
                        )));
                    }
                    return Ok(metadata);
                }
            }
        }
        self.load_embedded(version)
    }

    /// Load the table compiled into the crate
    pub fn load_embedded(&self, version: IfcSchemaVersion) -> Result<SchemaMetadata> {
        debug!(%version, "loading embedded schema table");
        let json = match version {
            IfcSchemaVersion::Ifc2x3 => EMBEDDED_IFC2X3,
            IfcSchemaVersion::Ifc4 => EMBEDDED_IFC4,
            IfcSchemaVersion::Ifc4x3 => EMBEDDED_IFC4X3,
        };
        self.load_from_json(json)
    }

    /// Load a table from a specific file path, by extension
    pub fn load_from_file(&self, path: &Path) -> Result<SchemaMetadata> {
        trace!("Loading schema table from file: {:?}", path);
        if !path.exists() {
            return Err(Error::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;

        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            self.load_from_yaml(&content)
        } else {
            self.load_from_json(&content)
        }
    }

    /// Load a table from a JSON string
    pub fn load_from_json(&self, json: &str) -> Result<SchemaMetadata> {
        let table: SchemaTableFile = serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))?;
        Self::convert_table(table)
    }

    /// Load a table from a YAML string
    pub fn load_from_yaml(&self, yaml: &str) -> Result<SchemaMetadata> {
        let table: SchemaTableFile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))?;
        Self::convert_table(table)
    }

    /// Link the flat table and derive roles and indices
    fn convert_table(table: SchemaTableFile) -> Result<SchemaMetadata> {
        let version = IfcSchemaVersion::parse(&table.version)
            .ok_or_else(|| Error::UnknownVersion(table.version.clone()))?;

        let classes = table
            .classes
            .into_iter()
            .map(|c| {
                let mut info = ClassInfo::new(c.name, c.parent, c.kind);
                info.direct_attributes = c.attributes;
                info.predefined_types = c.predefined_types;
                info
            })
            .collect();

        let mut tree = ClassTree::from_classes(classes);
        link_tree(&mut tree);

        if let Some(root) = &table.type_root {
            if !set_functional_role(&mut tree, root, FunctionalRole::TypeOfElement) {
                debug!(%version, root = %root, "type root not present in class table");
            }
        }
        for relation in &table.type_relations {
            propagate_type_relation(&mut tree, &relation.object, &relation.types);
        }

        let attributes = build_attribute_index(&tree);

        info!(
            %version,
            classes = tree.len(),
            property_sets = table.property_sets.len(),
            relations = table.relations.len(),
            "schema table loaded"
        );

        Ok(SchemaMetadata {
            version,
            classes: tree,
            attributes,
            property_sets: table.property_sets,
            relations: table.relations,
            associations: table.associations,
            data_types: table.data_types,
        })
    }
}
