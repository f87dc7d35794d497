use ids_schema::{
    AssociationKind, FunctionalRole, IfcSchemaVersion, IfcSchemaVersions, SchemaRegistry, TypeConstraint,
};

fn versions(list: &[IfcSchemaVersion]) -> IfcSchemaVersions {
    list.iter().copied().collect()
}

#[test]
fn test_every_embedded_table_loads() -> anyhow::Result<()> {
    let registry = SchemaRegistry::embedded();
    for version in IfcSchemaVersion::ALL {
        let metadata = registry.get(version)?;
        assert_eq!(metadata.version, version);
        assert!(metadata.class("IfcWall").is_some(), "{version} lacks IfcWall");
        assert!(metadata.class("IfcRoot").unwrap().parent.is_none());
        assert!(!metadata.property_sets.is_empty());
        assert!(!metadata.association_roots(AssociationKind::Material).is_empty());
    }
    Ok(())
}

#[test]
fn test_wall_and_name_shared_by_all_versions() -> anyhow::Result<()> {
    let set = SchemaRegistry::embedded().all()?;
    let all = IfcSchemaVersions::all();

    assert!(set.shared_class_names(all).contains("IFCWALL"));
    assert!(set.shared_attribute_names(all).contains("Name"));
    assert!(set.shared_attribute_classes("Name", all).contains("IFCWALL"));
    assert!(set.shared_relation_names(all).contains("IfcRelContainedInSpatialStructure"));
    Ok(())
}

#[test]
fn test_version_specific_classes() -> anyhow::Result<()> {
    let set = SchemaRegistry::embedded().all()?;

    let old_and_new = versions(&[IfcSchemaVersion::Ifc2x3, IfcSchemaVersion::Ifc4]);
    assert!(set.shared_class_names(old_and_new).contains("IFCWALLSTANDARDCASE"));
    assert!(!set.shared_class_names(IfcSchemaVersions::all()).contains("IFCWALLSTANDARDCASE"));
    assert!(!set.shared_class_names(old_and_new).contains("IFCPROJECTLIBRARY"));
    Ok(())
}

#[test]
fn test_type_roles_from_tables() -> anyhow::Result<()> {
    let registry = SchemaRegistry::embedded();
    let ifc4 = registry.get(IfcSchemaVersion::Ifc4)?;

    assert_eq!(ifc4.class("IfcWallType").unwrap().role, FunctionalRole::TypeOfElement);
    assert_eq!(ifc4.class("IfcWall").unwrap().role, FunctionalRole::ElementWithType);
    assert_eq!(ifc4.class("IfcWallStandardCase").unwrap().role, FunctionalRole::ElementWithType);
    Ok(())
}

#[test]
fn test_rooted_object_constraint_excludes_types() -> anyhow::Result<()> {
    let set = SchemaRegistry::embedded().all()?;
    let objects = TypeConstraint::rooted("IfcObject", IfcSchemaVersions::all()).resolve(&set);

    assert!(objects.contains("IFCWALL"));
    assert!(objects.contains("IFCSLAB"));
    assert!(!objects.contains("IFCWALLTYPE"));
    assert!(!objects.contains("IFCWALLTYPEENUM"));
    Ok(())
}

#[test]
fn test_wall_and_slab_are_disjoint() -> anyhow::Result<()> {
    let set = SchemaRegistry::embedded().all()?;
    let wall = TypeConstraint::explicit(["IfcWall"]);
    let slab = TypeConstraint::explicit(["IfcSlab"]);
    assert!(wall.intersect_with(&slab, &set).is_empty());
    Ok(())
}

#[test]
fn test_property_set_catalog() -> anyhow::Result<()> {
    let set = SchemaRegistry::embedded().all()?;
    let all = IfcSchemaVersions::all();

    let names = set.shared_property_names("Pset_WallCommon", all);
    assert!(names.contains("IsExternal"));
    assert!(names.contains("LoadBearing"));

    let classes = set.shared_property_set_classes("Pset_WallCommon", all);
    assert!(classes.contains("IFCWALL"));
    assert!(classes.contains("IFCWALLTYPE"));
    assert!(!classes.contains("IFCSLAB"));
    Ok(())
}
