//! Build-once schema store

use crate::constraint::ConcreteClassCatalog;
use crate::loader::SchemaLoader;
use crate::model::SchemaMetadata;
use crate::version::{IfcSchemaVersion, IfcSchemaVersions};
use crate::Result;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Process-wide store of schema metadata, built at most once per version.
///
/// Concurrent first requests for the same version are serialized on the map entry,
/// so each table is loaded and linked exactly once. After that every read is lock-free
/// apart from the shard read guard.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    loader: SchemaLoader,
    schemas: DashMap<IfcSchemaVersion, Arc<SchemaMetadata>>,
}

impl SchemaRegistry {
    /// Registry backed by `loader`
    #[must_use]
    pub fn new(loader: SchemaLoader) -> Self {
        Self {
            loader,
            schemas: DashMap::new(),
        }
    }

    /// Registry using only the embedded tables
    #[must_use]
    pub fn embedded() -> Self {
        Self::default()
    }

    /// Metadata for `version`, loading it on first use
    pub fn get(&self, version: IfcSchemaVersion) -> Result<Arc<SchemaMetadata>> {
        if let Some(cached) = self.schemas.get(&version) {
            return Ok(Arc::clone(cached.value()));
        }

        let entry = self
            .schemas
            .entry(version)
            .or_try_insert_with(|| self.loader.load_version(version).map(Arc::new))?;
        debug!(%version, "schema metadata ready");
        Ok(Arc::clone(entry.value()))
    }

    /// Whether `version` has already been built
    #[must_use]
    pub fn is_loaded(&self, version: IfcSchemaVersion) -> bool {
        self.schemas.contains_key(&version)
    }

    /// Metadata for every version in `versions`
    pub fn schema_set(&self, versions: IfcSchemaVersions) -> Result<SchemaSet> {
        versions
            .iter()
            .map(|v| self.get(v).map(|m| (v, m)))
            .collect::<Result<BTreeMap<_, _>>>()
            .map(SchemaSet::from_map)
    }

    /// Metadata for every supported version
    pub fn all(&self) -> Result<SchemaSet> {
        self.schema_set(IfcSchemaVersions::all())
    }
}

/// Read-only view over the metadata of several schema versions
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemas: BTreeMap<IfcSchemaVersion, Arc<SchemaMetadata>>,
}

impl SchemaSet {
    fn from_map(schemas: BTreeMap<IfcSchemaVersion, Arc<SchemaMetadata>>) -> Self {
        Self { schemas }
    }

    /// Build a set from already loaded metadata
    pub fn from_metadata(schemas: impl IntoIterator<Item = SchemaMetadata>) -> Self {
        Self::from_map(schemas.into_iter().map(|m| (m.version, Arc::new(m))).collect())
    }

    #[must_use]
    pub fn get(&self, version: IfcSchemaVersion) -> Option<&SchemaMetadata> {
        self.schemas.get(&version).map(AsRef::as_ref)
    }

    /// Versions available in the set
    #[must_use]
    pub fn versions(&self) -> IfcSchemaVersions {
        self.schemas.keys().copied().collect()
    }

    /// Metadata for each of `versions`, skipping versions not in the set
    pub fn iter_versions(
        &self,
        versions: IfcSchemaVersions,
    ) -> impl Iterator<Item = &SchemaMetadata> + '_ {
        versions.iter().filter_map(|v| self.get(v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl ConcreteClassCatalog for SchemaSet {
    fn concrete_classes(&self, version: IfcSchemaVersion, class: &str) -> Option<BTreeSet<String>> {
        self.get(version)?.concrete_classes_under(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_registry_builds_once() {
        let registry = SchemaRegistry::embedded();
        assert!(!registry.is_loaded(IfcSchemaVersion::Ifc4));

        let first = registry.get(IfcSchemaVersion::Ifc4).unwrap();
        let second = registry.get(IfcSchemaVersion::Ifc4).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.is_loaded(IfcSchemaVersion::Ifc4));
        assert!(!registry.is_loaded(IfcSchemaVersion::Ifc2x3));
    }

    #[test]
    fn test_concurrent_first_access() {
        let registry = Arc::new(SchemaRegistry::embedded());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.get(IfcSchemaVersion::Ifc4x3).unwrap())
            })
            .collect();

        let loaded: Vec<Arc<SchemaMetadata>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(loaded.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_schema_set_versions() {
        let registry = SchemaRegistry::embedded();
        let versions: IfcSchemaVersions =
            [IfcSchemaVersion::Ifc2x3, IfcSchemaVersion::Ifc4].into_iter().collect();
        let set = registry.schema_set(versions).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.versions(), versions);
        assert!(set.get(IfcSchemaVersion::Ifc4x3).is_none());
        assert!(set.concrete_classes(IfcSchemaVersion::Ifc4, "IfcWall").unwrap().contains("IFCWALL"));
        assert!(set.concrete_classes(IfcSchemaVersion::Ifc4x3, "IfcWall").is_none());
    }
}
