//! Message codes and texts
//!
//! Codes are grouped by hundreds: 1xx content rules, 2xx constraint conflicts,
//! 3xx structure, 4xx options, 5xx schema definitions.

use ids_schema::IfcSchemaVersions;
use std::fmt::Display;

pub const NOT_IMPLEMENTED: u32 = 101;
pub const NO_MATCH: u32 = 102;
pub const EMPTY_VALUE: u32 = 103;
pub const PREDEFINED_TYPE: u32 = 104;
pub const INVALID_NUMBER: u32 = 105;
pub const INVALID_PATTERN: u32 = 106;
pub const INVALID_CARDINALITY: u32 = 107;
pub const IFC_VERSION: u32 = 108;
pub const OPTIONAL_WITHOUT_VALUE: u32 = 109;
pub const RESERVED_PREFIX: u32 = 110;
pub const DATA_TYPE: u32 = 111;
pub const RESTRICTION_BASE: u32 = 112;
pub const TOTAL_DIGITS: u32 = 113;
pub const MISSING_CHILD: u32 = 114;

pub const IMPOSSIBLE_SET: u32 = 201;
pub const INCOMPATIBLE_CLAUSES: u32 = 202;
pub const INVALID_CONTAINER: u32 = 203;

pub const STRUCTURE_ERROR: u32 = 301;
pub const STRUCTURE_WARNING: u32 = 302;
pub const SCHEMA_VERSION: u32 = 303;
pub const NOT_WELL_FORMED: u32 = 304;
pub const RESOURCE: u32 = 305;
pub const UNHANDLED: u32 = 306;

pub const OPTIONS: u32 = 401;

pub const SCHEMA_DEFINITION: u32 = 501;

/// A coded message awaiting a location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub code: u32,
    pub text: String,
}

impl Message {
    pub fn new(code: u32, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

pub fn outside_specification(kind: &str) -> Message {
    Message::new(
        NOT_IMPLEMENTED,
        format!("Element '{kind}' was found outside of a specification"),
    )
}

pub fn no_match(what: &str, versions: IfcSchemaVersions) -> Message {
    Message::new(NO_MATCH, format!("No valid match for {what} in {versions}"))
}

pub fn empty_value(kind: &str) -> Message {
    Message::new(EMPTY_VALUE, format!("Empty value in '{kind}'"))
}

pub fn missing_child(kind: &str, child: &str) -> Message {
    Message::new(MISSING_CHILD, format!("'{kind}' requires a '{child}' element"))
}

pub fn unknown_class(class: &str, version: impl Display) -> Message {
    Message::new(
        PREDEFINED_TYPE,
        format!("Class {class} has no metadata in {version}"),
    )
}

pub fn no_predefined_types(classes: &str, versions: IfcSchemaVersions) -> Message {
    Message::new(
        PREDEFINED_TYPE,
        format!("No predefined type is shared by {classes} in {versions}"),
    )
}

pub fn predefined_type_mismatch(classes: &str, versions: IfcSchemaVersions) -> Message {
    Message::new(
        PREDEFINED_TYPE,
        format!("No valid predefined type match for {classes} in {versions}"),
    )
}

pub fn invalid_number(kind: &str, value: &str) -> Message {
    Message::new(
        INVALID_NUMBER,
        format!("'{value}' is not a valid non-negative integer for '{kind}'"),
    )
}

pub fn invalid_pattern(pattern: &str, error: impl Display) -> Message {
    Message::new(
        INVALID_PATTERN,
        format!("Invalid regex pattern '{pattern}': {error}"),
    )
}

pub fn invalid_cardinality(detail: impl Display) -> Message {
    Message::new(INVALID_CARDINALITY, format!("Invalid cardinality: {detail}"))
}

pub fn missing_ifc_version() -> Message {
    Message::new(IFC_VERSION, "Specification declares no valid ifcVersion")
}

pub fn unsupported_ifc_version(token: &str) -> Message {
    Message::new(IFC_VERSION, format!("Unsupported ifcVersion '{token}'"))
}

pub fn optional_without_value(kind: &str) -> Message {
    Message::new(
        OPTIONAL_WITHOUT_VALUE,
        format!("Invalid cardinality context: optional '{kind}' must specify a value"),
    )
}

pub fn reserved_prefix(name: &str, versions: IfcSchemaVersions) -> Message {
    Message::new(
        RESERVED_PREFIX,
        format!(
            "Property set '{name}' uses the reserved 'Pset_' prefix but is not a standard property set in {versions}"
        ),
    )
}

pub fn unknown_data_type(data_type: &str, versions: IfcSchemaVersions) -> Message {
    Message::new(
        DATA_TYPE,
        format!("Invalid dataType '{data_type}' for {versions}"),
    )
}

pub fn data_type_mismatch(data_type: &str, expected: &str) -> Message {
    Message::new(
        DATA_TYPE,
        format!("dataType '{data_type}' does not match the standard property type '{expected}'"),
    )
}

pub fn no_shared_data_type(data_type: &str) -> Message {
    Message::new(
        DATA_TYPE,
        format!("dataType '{data_type}' cannot be checked, matching properties do not share one type"),
    )
}

pub fn restriction_base(base: &str, context: &str) -> Message {
    Message::new(
        RESTRICTION_BASE,
        format!("Restriction base '{base}' is not valid in '{context}'"),
    )
}

pub fn total_digits_on_string() -> Message {
    Message::new(
        TOTAL_DIGITS,
        "totalDigits is not valid for string values, use 'length' instead",
    )
}

pub fn impossible_set(kind: &str, version: impl Display) -> Message {
    Message::new(
        IMPOSSIBLE_SET,
        format!("Impossible match of constraints in set '{kind}' for {version}"),
    )
}

pub fn incompatible_clauses(version: impl Display) -> Message {
    Message::new(
        INCOMPATIBLE_CLAUSES,
        format!("Incompatible clauses: applicability and requirements cannot be satisfied together in {version}"),
    )
}

pub fn invalid_relation(relation: &str, versions: IfcSchemaVersions) -> Message {
    Message::new(
        INVALID_CONTAINER,
        format!("Relation '{relation}' is not a valid partOf relation in {versions}"),
    )
}

pub fn invalid_container(relation: &str, version: impl Display) -> Message {
    Message::new(
        INVALID_CONTAINER,
        format!("Entity cannot be the container of relation '{relation}' in {version}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ids_schema::IfcSchemaVersion;

    #[test]
    fn test_message_texts() {
        let versions = IfcSchemaVersions::single(IfcSchemaVersion::Ifc4);
        let m = no_match("entity name", versions);
        assert_eq!(m.code, NO_MATCH);
        assert_eq!(m.text, "No valid match for entity name in IFC4");

        let m = reserved_prefix("Pset_Nope", versions);
        assert!(m.text.contains("reserved 'Pset_' prefix"));

        let m = optional_without_value("property");
        assert!(m.text.starts_with("Invalid cardinality context"));
    }
}
