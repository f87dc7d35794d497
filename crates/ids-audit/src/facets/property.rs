//! Property facet: property set, property name and data type
//!
//! The default constraint is the left side of the property relation, which is
//! `IfcObject` in IFC2X3 and `IfcObjectDefinition` from IFC4 on. A required
//! facet naming a standard property set narrows it to the classes the set
//! applies to.

use super::{AuditContext, FacetState};
use crate::messages;
use crate::status::AuditStatus;
use ids_ir::{Attributes, NodeId};
use ids_schema::{IfcSchemaVersion, IfcSchemaVersions, TypeConstraint};
use std::collections::BTreeSet;

/// Prefix reserved for standard property sets
const RESERVED_PREFIX: &str = "Pset_";

#[derive(Debug, Clone)]
pub struct PropertyFacet {
    pub(super) state: FacetState,
    data_type: Option<String>,
}

fn object_root(version: IfcSchemaVersion) -> &'static str {
    if version.is_pre_ifc4() {
        "IfcObject"
    } else {
        "IfcObjectDefinition"
    }
}

impl PropertyFacet {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        Self {
            state: FacetState::new(attributes),
            data_type: attributes.get("dataType").map(str::to_string),
        }
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let versions = match ctx.require_versions(id) {
            Ok(versions) => versions,
            Err(status) => return self.state.finish(status),
        };
        let Some(property_set) = ctx.tree.first_child_of_kind(id, "propertySet") else {
            return self.state.finish(ctx.error(id, messages::missing_child("property", "propertySet")));
        };
        let Some(name) = ctx
            .tree
            .first_child_of_kind(id, "baseName")
            .or_else(|| ctx.tree.first_child_of_kind(id, "name"))
        else {
            return self.state.finish(ctx.error(id, messages::missing_child("property", "baseName")));
        };

        let mut status = self.state.audit_optional_value(id, ctx);
        status |= self.audit_data_type(id, versions, ctx);

        let known_sets = ctx.schemas.shared_property_set_names(versions);
        for literal in ctx.literal_values(property_set) {
            if literal.starts_with(RESERVED_PREFIX) && !known_sets.contains(&literal) {
                status |= ctx.error(property_set, messages::reserved_prefix(&literal, versions));
            }
        }

        for version in versions.iter() {
            self.state
                .constraints
                .insert(version, TypeConstraint::rooted(object_root(version), IfcSchemaVersions::single(version)));
        }

        if self.state.is_required() {
            let matched_sets = ctx.match_values(property_set, &known_sets, true);
            if !matched_sets.is_empty() {
                status |= self.narrow_to_standard_sets(id, name, &matched_sets, versions, ctx);
            }
        }
        self.state.finish(status)
    }

    fn audit_data_type(&self, id: NodeId, versions: IfcSchemaVersions, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let Some(data_type) = &self.data_type else {
            return AuditStatus::OK;
        };
        let known = ctx.schemas.shared_data_types(versions);
        if known.iter().any(|d| d.eq_ignore_ascii_case(data_type)) {
            AuditStatus::OK
        } else {
            ctx.error(id, messages::unknown_data_type(data_type, versions))
        }
    }

    /// Narrow to the declared properties, their shared data type and applicable classes
    fn narrow_to_standard_sets(
        &mut self,
        id: NodeId,
        name: NodeId,
        sets: &BTreeSet<String>,
        versions: IfcSchemaVersions,
        ctx: &mut AuditContext<'_>,
    ) -> AuditStatus {
        let mut status = AuditStatus::OK;
        let declared: BTreeSet<String> = sets
            .iter()
            .flat_map(|set| ctx.schemas.shared_property_names(set, versions))
            .collect();
        let properties = ctx.match_values(name, &declared, true);
        if properties.is_empty() {
            status |= ctx.error(id, messages::no_match("property name", versions));
        } else if let Some(data_type) = &self.data_type {
            let types: BTreeSet<String> = ctx
                .schemas
                .iter_versions(versions)
                .flat_map(|m| {
                    sets.iter()
                        .filter_map(|set| m.property_set(set))
                        .flat_map(|set| properties.iter().filter_map(|p| set.property(p)))
                        .filter_map(|p| p.data_type.clone())
                        .collect::<Vec<_>>()
                })
                .collect();
            let mut iter = types.iter();
            match (iter.next(), iter.next()) {
                (Some(expected), None) if !expected.eq_ignore_ascii_case(data_type) => {
                    status |= ctx.error(id, messages::data_type_mismatch(data_type, expected));
                }
                (Some(_), None) => {}
                _ => status |= ctx.error(id, messages::no_shared_data_type(data_type)),
            }
        }

        let classes: BTreeSet<String> = sets
            .iter()
            .flat_map(|set| ctx.schemas.shared_property_set_classes(set, versions))
            .collect();
        for version in versions.iter() {
            self.state
                .constraints
                .insert(version, TypeConstraint::explicit(&classes));
        }
        status
    }
}
