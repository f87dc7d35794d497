//! Cross-version queries
//!
//! Nothing is stored per version pair: every answer is the intersection of the
//! per-version answers for the versions the caller asks about. An empty version
//! set, or a version missing from the [`SchemaSet`], yields an empty answer.

use crate::model::SchemaMetadata;
use crate::registry::SchemaSet;
use crate::version::IfcSchemaVersions;
use std::collections::BTreeSet;

/// Intersect a sequence of sets; no sets at all gives the empty set
pub fn intersect_sets<I>(sets: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = BTreeSet<String>>,
{
    let mut iter = sets.into_iter();
    let Some(mut acc) = iter.next() else {
        return BTreeSet::new();
    };
    for set in iter {
        if acc.is_empty() {
            break;
        }
        acc.retain(|name| set.contains(name));
    }
    acc
}

impl SchemaSet {
    fn per_version<F>(&self, versions: IfcSchemaVersions, query: F) -> BTreeSet<String>
    where
        F: Fn(&SchemaMetadata) -> BTreeSet<String>,
    {
        if versions.iter().any(|v| self.get(v).is_none()) {
            return BTreeSet::new();
        }
        intersect_sets(self.iter_versions(versions).map(query))
    }

    /// Upper-case class names present in every version
    #[must_use]
    pub fn shared_class_names(&self, versions: IfcSchemaVersions) -> BTreeSet<String> {
        self.per_version(versions, SchemaMetadata::class_names)
    }

    /// Attribute names present in every version
    #[must_use]
    pub fn shared_attribute_names(&self, versions: IfcSchemaVersions) -> BTreeSet<String> {
        self.per_version(versions, |m| m.attributes.names().map(str::to_string).collect())
    }

    /// Upper-case names of classes carrying `attribute` in every version
    #[must_use]
    pub fn shared_attribute_classes(&self, attribute: &str, versions: IfcSchemaVersions) -> BTreeSet<String> {
        self.per_version(versions, |m| {
            m.attributes.classes_with(attribute).cloned().unwrap_or_default()
        })
    }

    /// Property set names present in every version
    #[must_use]
    pub fn shared_property_set_names(&self, versions: IfcSchemaVersions) -> BTreeSet<String> {
        self.per_version(versions, |m| {
            m.property_sets.iter().map(|p| p.name.clone()).collect()
        })
    }

    /// Names of the properties `property_set` declares in every version
    #[must_use]
    pub fn shared_property_names(&self, property_set: &str, versions: IfcSchemaVersions) -> BTreeSet<String> {
        self.per_version(versions, |m| {
            m.property_set(property_set)
                .map(|p| p.property_names().map(str::to_string).collect())
                .unwrap_or_default()
        })
    }

    /// Upper-case names of the classes `property_set` applies to in every version,
    /// expanded to their concrete closures
    #[must_use]
    pub fn shared_property_set_classes(&self, property_set: &str, versions: IfcSchemaVersions) -> BTreeSet<String> {
        self.per_version(versions, |m| {
            m.property_set(property_set)
                .map(|p| {
                    p.applicable_classes
                        .iter()
                        .filter_map(|c| m.concrete_classes_under(c))
                        .flatten()
                        .collect()
                })
                .unwrap_or_default()
        })
    }

    /// Relation names present in every version
    #[must_use]
    pub fn shared_relation_names(&self, versions: IfcSchemaVersions) -> BTreeSet<String> {
        self.per_version(versions, |m| m.relations.iter().map(|r| r.name.clone()).collect())
    }

    /// Data type names present in every version
    #[must_use]
    pub fn shared_data_types(&self, versions: IfcSchemaVersions) -> BTreeSet<String> {
        self.per_version(versions, |m| m.data_types.iter().cloned().collect())
    }
}
