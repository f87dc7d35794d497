//! Specification: version list, occurrence and clause compatibility

use super::{AuditContext, Cardinality, ValidityMarker};
use crate::messages;
use crate::status::AuditStatus;
use ids_ir::{Attributes, NodeId};
use ids_schema::{IfcSchemaVersions, TypeConstraint};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SpecificationFacet {
    valid: bool,
    name: String,
    versions: IfcSchemaVersions,
    unknown_versions: Vec<String>,
    /// Occurrence written on the specification itself (IDS 0.9)
    occurrence: Option<Result<Cardinality, String>>,
}

impl SpecificationFacet {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        let (versions, unknown_versions) =
            IfcSchemaVersions::parse_list(attributes.get("ifcVersion").unwrap_or_default());
        Self {
            valid: true,
            name: attributes.get("name").unwrap_or_default().to_string(),
            versions,
            unknown_versions,
            occurrence: has_occurs(attributes).then(|| Cardinality::from_occurs(attributes)),
        }
    }

    /// IFC versions every facet of the specification must hold in
    #[must_use]
    pub fn versions(&self) -> IfcSchemaVersions {
        self.versions
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn audit_versions(&self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let mut status = AuditStatus::OK;
        if self.versions.is_empty() && self.unknown_versions.is_empty() {
            status |= ctx.error(id, messages::missing_ifc_version());
        }
        for token in &self.unknown_versions {
            status |= ctx.error(id, messages::unsupported_ifc_version(token));
        }
        status
    }

    /// Occurrence from the specification (IDS 0.9) or its applicability (IDS 1.0)
    fn audit_occurrence(&self, id: NodeId, applicability: Option<NodeId>, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let occurrence = self.occurrence.clone().or_else(|| {
            let attributes = &ctx.node(applicability?).attributes;
            has_occurs(attributes).then(|| Cardinality::from_occurs(attributes))
        });
        match occurrence {
            Some(Err(detail)) => ctx.error(id, messages::invalid_cardinality(detail)),
            Some(Ok(c)) if !c.is_consistent() => {
                ctx.error(id, messages::invalid_cardinality(format!("maximum below minimum in {c}")))
            }
            _ => AuditStatus::OK,
        }
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let applicability = ctx.tree.first_child_of_kind(id, "applicability");
        let requirements = ctx.tree.first_child_of_kind(id, "requirements");

        let mut status = self.audit_versions(id, ctx);
        status |= self.audit_occurrence(id, applicability, ctx);

        match applicability {
            None => status |= ctx.error(id, messages::missing_child("specification", "applicability")),
            Some(app) if ctx.node(app).children.is_empty() => {
                status |= ctx.error(app, messages::missing_child("applicability", "facet"));
            }
            Some(app) => {
                if let Some(req) = requirements {
                    status |= self.audit_compatibility(id, app, req, ctx);
                }
            }
        }

        debug!(name = %self.name, versions = %self.versions, %status, "audited specification");
        self.valid = status.is_ok();
        status
    }

    /// Applicability and requirements must leave at least one class in every version
    fn audit_compatibility(&self, id: NodeId, app: NodeId, req: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let mut status = AuditStatus::OK;
        for version in self.versions.iter() {
            let (Some(left), Some(right)) = (
                ctx.node(app).payload.type_constraint(version),
                ctx.node(req).payload.type_constraint(version),
            ) else {
                continue;
            };
            let left = left.resolve(ctx.schemas);
            let right = right.resolve(ctx.schemas);
            if left.is_empty() || right.is_empty() {
                continue;
            }
            let combined = TypeConstraint::Explicit(left).intersect_with(&TypeConstraint::Explicit(right), ctx.schemas);
            if combined.is_empty() {
                status |= ctx.error(id, messages::incompatible_clauses(version));
            }
        }
        status
    }
}

fn has_occurs(attributes: &Attributes) -> bool {
    attributes.contains("minOccurs") || attributes.contains("maxOccurs")
}

impl ValidityMarker for SpecificationFacet {
    fn is_valid(&self) -> bool {
        self.valid
    }
}
