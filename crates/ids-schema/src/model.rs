//! Schema metadata model definitions

use crate::version::IfcSchemaVersion;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Handle to a class in a [`ClassTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) usize);

/// Instantiability of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Abstract,
    Concrete,
    Enumeration,
}

/// Role a class plays in the object/type pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FunctionalRole {
    #[default]
    Other,
    /// An occurrence class that can be typed by a type object
    ElementWithType,
    /// A type object class
    TypeOfElement,
}

/// A class of one schema version
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub parent_name: Option<String>,
    pub kind: ClassKind,
    pub predefined_types: Vec<String>,
    pub role: FunctionalRole,
    pub direct_attributes: Vec<String>,
    pub parent: Option<ClassId>,
    pub children: Vec<ClassId>,
}

impl ClassInfo {
    #[must_use]
    pub fn new(name: impl Into<String>, parent_name: Option<String>, kind: ClassKind) -> Self {
        Self {
            name: name.into(),
            parent_name,
            kind,
            predefined_types: Vec::new(),
            role: FunctionalRole::Other,
            direct_attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.kind == ClassKind::Concrete
    }

    /// Upper-case name used for case-insensitive comparisons
    #[must_use]
    pub fn upper_name(&self) -> String {
        self.name.to_ascii_uppercase()
    }
}

/// Class arena with case-insensitive name lookup
#[derive(Debug, Clone, Default)]
pub struct ClassTree {
    classes: Vec<ClassInfo>,
    by_name: HashMap<String, ClassId>,
}

impl ClassTree {
    /// Build an unlinked tree from a flat class list; a later duplicate name wins the lookup
    #[must_use]
    pub fn from_classes(classes: Vec<ClassInfo>) -> Self {
        let by_name = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.upper_name(), ClassId(i)))
            .collect();
        Self { classes, by_name }
    }

    #[must_use]
    pub fn get(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: ClassId) -> &mut ClassInfo {
        &mut self.classes[id.0]
    }

    /// Look up a class id by name, ignoring case
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(&name.to_ascii_uppercase()).copied()
    }

    /// Look up a class by name, ignoring case
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ClassInfo> {
        self.id_of(name).map(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len()).map(ClassId)
    }

    /// Classes without a resolved parent
    pub fn roots(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter().filter(|c| c.parent.is_none())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// A property declared by a property set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub enumeration: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A standard property set and the classes it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySetInfo {
    pub name: String,
    #[serde(default)]
    pub applicable_classes: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDefinition>,
}

impl PropertySetInfo {
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }
}

/// A one-to-many objectified relation usable in a partOf facet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInfo {
    pub name: String,
    /// Type of the single relating object
    pub one_side: String,
    /// Type of the related objects
    pub many_side: String,
}

/// Association relations whose targets a facet can require
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssociationKind {
    Classification,
    Material,
}

impl AssociationKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Material => "material",
        }
    }
}

/// Attribute name to owning classes, in full and minimal form
#[derive(Debug, Clone, Default)]
pub struct AttributeIndex {
    /// Every class carrying the attribute, declared or inherited
    pub(crate) full: BTreeMap<String, BTreeSet<String>>,
    /// Declaring classes with subclasses of other declarers removed
    pub(crate) top: BTreeMap<String, BTreeSet<String>>,
}

impl AttributeIndex {
    /// Upper-case names of every class carrying `attribute`
    #[must_use]
    pub fn classes_with(&self, attribute: &str) -> Option<&BTreeSet<String>> {
        self.full.get(attribute)
    }

    /// Upper-case names of the topmost classes declaring `attribute`
    #[must_use]
    pub fn top_classes(&self, attribute: &str) -> Option<&BTreeSet<String>> {
        self.top.get(attribute)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.full.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, attribute: &str) -> bool {
        self.full.contains_key(attribute)
    }
}

/// Complete metadata for one IFC schema version
#[derive(Debug, Clone)]
pub struct SchemaMetadata {
    pub version: IfcSchemaVersion,
    pub classes: ClassTree,
    pub attributes: AttributeIndex,
    pub property_sets: Vec<PropertySetInfo>,
    pub relations: Vec<RelationInfo>,
    pub associations: BTreeMap<AssociationKind, Vec<String>>,
    pub data_types: Vec<String>,
}

impl SchemaMetadata {
    /// Look up a class by name, ignoring case
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.find(name)
    }

    /// Upper-case names of all classes
    #[must_use]
    pub fn class_names(&self) -> BTreeSet<String> {
        self.classes.iter().map(ClassInfo::upper_name).collect()
    }

    /// Upper-case names of the concrete closure of `name` (itself if concrete, plus
    /// every concrete descendant); `None` when the class is unknown
    #[must_use]
    pub fn concrete_classes_under(&self, name: &str) -> Option<BTreeSet<String>> {
        let id = self.classes.id_of(name)?;
        Some(
            crate::inheritance::matching_concrete_classes(&self.classes, id)
                .into_iter()
                .map(ClassInfo::upper_name)
                .collect(),
        )
    }

    /// Property set by exact name
    #[must_use]
    pub fn property_set(&self, name: &str) -> Option<&PropertySetInfo> {
        self.property_sets.iter().find(|p| p.name == name)
    }

    /// Relation by name, ignoring case
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationInfo> {
        self.relations
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Root classes reachable by the given association
    #[must_use]
    pub fn association_roots(&self, kind: AssociationKind) -> &[String] {
        self.associations.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Whether `name` is a known data type, ignoring case
    #[must_use]
    pub fn has_data_type(&self, name: &str) -> bool {
        self.data_types.iter().any(|d| d.eq_ignore_ascii_case(name))
    }
}
