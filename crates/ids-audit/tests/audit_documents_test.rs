use ids_audit::{
    AuditEngine, AuditOptions, AuditStatus, CollectingSink, IdsVersion, SchemaSelection, WarningBehavior, messages,
};
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn audit_fixture(name: &str) -> (AuditStatus, CollectingSink) {
    let engine = AuditEngine::new(AuditOptions::default());
    let mut sink = CollectingSink::new();
    let status = engine.audit_file(fixture(name), &mut sink);
    (status, sink)
}

fn audit_text(options: AuditOptions, text: &str) -> (AuditStatus, CollectingSink) {
    let engine = AuditEngine::new(options);
    let mut sink = CollectingSink::new();
    let status = engine.audit(Cursor::new(text.as_bytes().to_vec()), &mut sink);
    (status, sink)
}

/// A 1.0 document with one specification wrapping `body`
fn document(ifc_version: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ids xmlns="http://standards.buildingsmart.org/IDS" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://standards.buildingsmart.org/IDS http://standards.buildingsmart.org/IDS/1.0/ids.xsd">
  <info><title>Inline</title></info>
  <specifications>
    <specification name="Inline" ifcVersion="{ifc_version}">
{body}
    </specification>
  </specifications>
</ids>"#
    )
}

const WALL_APPLICABILITY: &str = "<applicability><entity><name><simpleValue>IFCWALL</simpleValue></name></entity></applicability>";

#[test]
fn test_valid_document_passes() {
    let (status, sink) = audit_fixture("walls_named.ids");
    assert_eq!(status, AuditStatus::OK, "{:?}", sink.diagnostics);
    assert!(sink.is_empty());
}

#[test]
fn test_restrictions_pass() {
    let (status, sink) = audit_fixture("restrictions.ids");
    assert_eq!(status, AuditStatus::OK, "{:?}", sink.diagnostics);
}

#[test]
fn test_legacy_document_is_sniffed() {
    let (status, sink) = audit_fixture("legacy_0_9_7.ids");
    assert_eq!(status, AuditStatus::OK, "{:?}", sink.diagnostics);
}

#[test]
fn test_legacy_document_against_fixed_1_0_rules() {
    let engine = AuditEngine::new(
        AuditOptions::default()
            .with_schema(SchemaSelection::Fixed(IdsVersion::V1_0))
            .with_content(false),
    );
    let mut sink = CollectingSink::new();
    let status = engine.audit_file(fixture("legacy_0_9_7.ids"), &mut sink);

    assert!(status.contains(AuditStatus::STRUCTURE_ERROR));
    assert!(
        sink.diagnostics
            .iter()
            .any(|d| d.message.contains("'minOccurs' attribute is not declared on 'specification'"))
    );
}

#[test]
fn test_incompatible_clauses() {
    let (status, sink) = audit_fixture("incompatible_clauses.ids");
    assert_eq!(status, AuditStatus::CONTENT_ERROR);
    assert_eq!(sink.codes(), vec![messages::INCOMPATIBLE_CLAUSES]);

    let location = sink.diagnostics[0].location.as_ref().unwrap();
    assert_eq!(location.path, "/ids1/specifications1/specification1");
    assert_eq!(location.kind, "specification");
}

#[test]
fn test_optional_facet_without_value() {
    let (status, sink) = audit_fixture("optional_without_value.ids");
    assert_eq!(status, AuditStatus::CONTENT_ERROR);
    assert!(sink.has_code(messages::OPTIONAL_WITHOUT_VALUE));
}

#[test]
fn test_class_missing_from_one_version() {
    let (status, sink) = audit_fixture("unshared_class.ids");
    assert!(status.contains(AuditStatus::CONTENT_ERROR));

    let diagnostic = sink
        .diagnostics
        .iter()
        .find(|d| d.code == messages::NO_MATCH)
        .expect("no match reported");
    let location = diagnostic.location.as_ref().unwrap();
    assert_eq!(location.path, "/ids1/specifications1/specification1/applicability1/entity1");
    assert_eq!(location.line, 9);
}

#[test]
fn test_invalid_container() {
    let (status, sink) = audit_fixture("invalid_container.ids");
    assert_eq!(status, AuditStatus::CONTENT_ERROR);

    let diagnostic = sink
        .diagnostics
        .iter()
        .find(|d| d.code == messages::INVALID_CONTAINER)
        .expect("container reported");
    assert_eq!(
        diagnostic.location.as_ref().unwrap().path,
        "/ids1/specifications1/specification1/requirements1/partOf1/entity1"
    );
}

#[test]
fn test_reserved_prefix() {
    let (status, sink) = audit_fixture("reserved_prefix.ids");
    assert_eq!(status, AuditStatus::CONTENT_ERROR);
    assert!(sink.has_code(messages::RESERVED_PREFIX));
}

#[test]
fn test_not_well_formed() {
    let (status, sink) = audit_fixture("not_well_formed.ids");
    assert!(status.contains(AuditStatus::STRUCTURE_ERROR));
    assert!(sink.has_code(messages::NOT_WELL_FORMED));
}

#[test]
fn test_missing_file() {
    let (status, sink) = audit_fixture("no_such_file.ids");
    assert_eq!(status, AuditStatus::NOT_FOUND);
    assert_eq!(sink.codes(), vec![messages::RESOURCE]);
    assert!(sink.diagnostics[0].location.is_none());
}

#[test]
fn test_schema_file_check() {
    let options = AuditOptions::default().with_schema_file(fixture("ids.xsd"));
    let engine = AuditEngine::new(options);
    let mut sink = CollectingSink::new();
    assert_eq!(engine.check_schema_files(&mut sink), AuditStatus::OK);

    let options = AuditOptions::default().with_schema_file(fixture("walls_named.ids"));
    let engine = AuditEngine::new(options);
    let mut sink = CollectingSink::new();
    assert_eq!(engine.check_schema_files(&mut sink), AuditStatus::XSD_SCHEMA_ERROR);
    assert_eq!(sink.codes(), vec![messages::SCHEMA_DEFINITION]);
}

#[test]
fn test_audit_stops_on_bad_schema_file() {
    let options = AuditOptions::default().with_schema_file(fixture("walls_named.ids"));
    let engine = AuditEngine::new(options);
    let mut sink = CollectingSink::new();
    let status = engine.audit_file(fixture("walls_named.ids"), &mut sink);
    assert_eq!(status, AuditStatus::XSD_SCHEMA_ERROR);
}

#[test]
fn test_unknown_schema_location() {
    let text = r#"<ids xmlns="http://standards.buildingsmart.org/IDS"><info><title>x</title></info></ids>"#;
    let (status, sink) = audit_text(AuditOptions::default(), text);
    assert_eq!(status, AuditStatus::NOT_FOUND);
    assert_eq!(sink.codes(), vec![messages::SCHEMA_VERSION]);
}

#[test]
fn test_occurrence_attributes_on_attribute_facet_are_tolerated() {
    let body = format!(
        "{WALL_APPLICABILITY}<requirements><attribute minOccurs=\"1\" maxOccurs=\"unbounded\"><name><simpleValue>Name</simpleValue></name></attribute></requirements>"
    );
    let (status, sink) = audit_text(AuditOptions::default(), &document("IFC4", &body));
    assert_eq!(status, AuditStatus::OK, "{:?}", sink.diagnostics);
}

#[test]
fn test_occurrence_attributes_on_entity_facet_are_reported() {
    let body = format!(
        "{WALL_APPLICABILITY}<requirements><entity minOccurs=\"1\"><name><simpleValue>IFCWALL</simpleValue></name></entity></requirements>"
    );
    let (status, sink) = audit_text(AuditOptions::default(), &document("IFC4", &body));
    assert!(status.contains(AuditStatus::STRUCTURE_ERROR));
    assert!(sink.has_code(messages::STRUCTURE_ERROR));
}

#[test]
fn test_unknown_namespace_attribute_follows_warning_behavior() {
    let body = format!(
        "{WALL_APPLICABILITY}<requirements><attribute xmlns:ext=\"urn:ext\" ext:note=\"x\"><name><simpleValue>Name</simpleValue></name></attribute></requirements>"
    );
    let text = document("IFC4", &body);

    let (status, _) = audit_text(AuditOptions::default(), &text);
    assert_eq!(status, AuditStatus::STRUCTURE_WARNING);

    let (status, sink) = audit_text(
        AuditOptions::default().with_warning_behavior(WarningBehavior::Info),
        &text,
    );
    assert_eq!(status, AuditStatus::OK);
    assert!(sink.has_code(messages::STRUCTURE_WARNING));

    let (status, _) = audit_text(
        AuditOptions::default().with_warning_behavior(WarningBehavior::Error),
        &text,
    );
    assert_eq!(status, AuditStatus::STRUCTURE_ERROR);
}

#[test]
fn test_content_audit_can_be_skipped() {
    let body = "<applicability><entity><name><simpleValue>IFCNOTACLASS</simpleValue></name></entity></applicability>";
    let text = document("IFC4", body);

    let (status, sink) = audit_text(AuditOptions::default(), &text);
    assert_eq!(status, AuditStatus::CONTENT_ERROR);
    assert!(sink.has_code(messages::NO_MATCH));

    let (status, sink) = audit_text(AuditOptions::default().with_content(false), &text);
    assert_eq!(status, AuditStatus::OK);
    assert!(sink.is_empty());
}

#[test]
fn test_unsupported_ifc_version_token() {
    let text = document("IFC5", WALL_APPLICABILITY);

    let (status, sink) = audit_text(AuditOptions::default().with_structure(false), &text);
    assert!(status.contains(AuditStatus::CONTENT_ERROR));
    assert!(sink.has_code(messages::IFC_VERSION));

    let (status, _) = audit_text(AuditOptions::default(), &text);
    assert!(status.contains(AuditStatus::STRUCTURE_ERROR));
}

#[test]
fn test_cardinality_grid() {
    let cases = [
        ("required", AuditStatus::OK),
        ("prohibited", AuditStatus::OK),
        ("mandatory", AuditStatus::STRUCTURE_ERROR | AuditStatus::CONTENT_ERROR),
    ];
    for (cardinality, expected) in cases {
        let body = format!(
            "{WALL_APPLICABILITY}<requirements><attribute cardinality=\"{cardinality}\"><name><simpleValue>Name</simpleValue></name></attribute></requirements>"
        );
        let (status, sink) = audit_text(AuditOptions::default(), &document("IFC4", &body));
        assert_eq!(status, expected, "{cardinality}: {:?}", sink.diagnostics);
    }
}

#[test]
fn test_predefined_type_mismatch() {
    let body = "<applicability><entity><name><simpleValue>IFCWALL</simpleValue></name>\
                <predefinedType><simpleValue>FLOOR</simpleValue></predefinedType></entity></applicability>";
    let (status, sink) = audit_text(AuditOptions::default(), &document("IFC4", body));
    assert_eq!(status, AuditStatus::CONTENT_ERROR);
    assert!(sink.has_code(messages::PREDEFINED_TYPE));

    let body = "<applicability><entity><name><simpleValue>IFCWALL</simpleValue></name>\
                <predefinedType><simpleValue>SOLIDWALL</simpleValue></predefinedType></entity></applicability>";
    let (status, sink) = audit_text(AuditOptions::default(), &document("IFC4", body));
    assert_eq!(status, AuditStatus::OK, "{:?}", sink.diagnostics);
}

#[test]
fn test_walls_named_in_every_version() {
    let body = format!(
        "{WALL_APPLICABILITY}<requirements><attribute cardinality=\"required\"><name><simpleValue>Name</simpleValue></name></attribute></requirements>"
    );
    let (status, sink) = audit_text(AuditOptions::default(), &document("IFC2X3 IFC4 IFC4X3_ADD2", &body));
    assert_eq!(status, AuditStatus::OK, "{:?}", sink.diagnostics);
    assert!(sink.is_empty());
}

#[test]
fn test_impossible_applicability() {
    let body = "<applicability><entity><name><simpleValue>IFCWALL</simpleValue></name></entity>\
                <attribute><name><simpleValue>LongName</simpleValue></name></attribute></applicability>";
    let (status, sink) = audit_text(AuditOptions::default(), &document("IFC4", body));
    assert_eq!(status, AuditStatus::CONTENT_ERROR);

    let diagnostic = sink
        .diagnostics
        .iter()
        .find(|d| d.code == messages::IMPOSSIBLE_SET)
        .expect("impossible set reported");
    assert!(diagnostic.message.contains("'applicability'"));
    assert_eq!(
        diagnostic.location.as_ref().unwrap().path,
        "/ids1/specifications1/specification1/applicability1"
    );
}

#[test]
fn test_specification_ordinals_skip_other_siblings() {
    let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<ids xmlns="http://standards.buildingsmart.org/IDS">
  <info><title>Two</title></info>
  <specifications>
    <specification name="Walls" ifcVersion="IFC4">
      <applicability><entity><name><simpleValue>IFCWALL</simpleValue></name></entity></applicability>
    </specification>
    <annotation>between</annotation>
    <specification name="Walls are slabs" ifcVersion="IFC4">
      <applicability><entity><name><simpleValue>IFCWALL</simpleValue></name></entity></applicability>
      <requirements><entity><name><simpleValue>IFCSLAB</simpleValue></name></entity></requirements>
    </specification>
  </specifications>
</ids>"#;
    let (status, sink) = audit_text(AuditOptions::default().with_structure(false), text);
    assert_eq!(status, AuditStatus::CONTENT_ERROR);
    assert_eq!(sink.codes(), vec![messages::INCOMPATIBLE_CLAUSES]);
    assert_eq!(
        sink.diagnostics[0].location.as_ref().unwrap().path,
        "/ids1/specifications1/specification2"
    );
}

#[test]
fn test_duplicate_applicability_is_a_structure_error() {
    let body = format!("{WALL_APPLICABILITY}{WALL_APPLICABILITY}");
    let (status, sink) = audit_text(AuditOptions::default().with_content(false), &document("IFC4", &body));
    assert_eq!(status, AuditStatus::STRUCTURE_ERROR);

    assert_eq!(sink.len(), 1);
    let diagnostic = &sink.diagnostics[0];
    assert!(diagnostic.message.contains("invalid child element 'applicability'"));
    assert_eq!(
        diagnostic.location.as_ref().unwrap().path,
        "/ids1/specifications1/specification1/applicability2"
    );
}

#[test]
fn test_requirements_before_applicability_is_a_structure_error() {
    let body = format!(
        "<requirements><attribute><name><simpleValue>Name</simpleValue></name></attribute></requirements>{WALL_APPLICABILITY}"
    );
    let (status, sink) = audit_text(AuditOptions::default().with_content(false), &document("IFC4", &body));
    assert_eq!(status, AuditStatus::STRUCTURE_ERROR);

    assert_eq!(sink.len(), 1);
    let diagnostic = &sink.diagnostics[0];
    assert!(diagnostic.message.contains("expected: 'applicability'"));
    assert_eq!(
        diagnostic.location.as_ref().unwrap().path,
        "/ids1/specifications1/specification1/requirements1"
    );
}

#[test]
fn test_proxy_and_assembly_classes() {
    let body = "<applicability><entity><name><simpleValue>IFCBUILDINGELEMENTPROXY</simpleValue></name></entity></applicability>\
                <requirements>\
                <partOf relation=\"IFCRELAGGREGATES\"><entity><name><simpleValue>IFCELEMENTASSEMBLY</simpleValue></name></entity></partOf>\
                <property dataType=\"IFCBOOLEAN\"><propertySet><simpleValue>Pset_BuildingElementProxyCommon</simpleValue></propertySet>\
                <baseName><simpleValue>IsExternal</simpleValue></baseName></property>\
                </requirements>";
    let (status, sink) = audit_text(AuditOptions::default(), &document("IFC2X3 IFC4 IFC4X3_ADD2", body));
    assert_eq!(status, AuditStatus::OK, "{:?}", sink.diagnostics);
}

const CHIMNEY_TABLE: &str = r#"{
    "version": "IFC4",
    "classes": [
        {"name": "IfcRoot", "kind": "abstract", "attributes": ["Name"]},
        {"name": "IfcObjectDefinition", "parent": "IfcRoot", "kind": "abstract"},
        {"name": "IfcObject", "parent": "IfcObjectDefinition", "kind": "abstract"},
        {"name": "IfcChimney", "parent": "IfcObject"}
    ],
    "data_types": ["IfcLabel"]
}"#;

#[test]
fn test_schema_tables_replace_embedded_ones() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("ifc4.json"), CHIMNEY_TABLE)?;
    let body = "<applicability><entity><name><simpleValue>IFCCHIMNEY</simpleValue></name></entity></applicability>";
    let text = document("IFC4", body);

    let (status, sink) = audit_text(AuditOptions::default(), &text);
    assert_eq!(status, AuditStatus::CONTENT_ERROR);
    assert!(sink.has_code(messages::NO_MATCH));

    let (status, sink) = audit_text(AuditOptions::default().with_schema_tables(dir.path()), &text);
    assert_eq!(status, AuditStatus::OK, "{:?}", sink.diagnostics);
    Ok(())
}

#[test]
fn test_missing_schema_table_directory() {
    let options = AuditOptions::default().with_schema_tables(fixture("no_such_tables"));
    let (status, sink) = audit_text(options, &document("IFC4", WALL_APPLICABILITY));
    assert_eq!(status, AuditStatus::NOT_FOUND);
    assert_eq!(sink.codes(), vec![messages::RESOURCE]);
}
