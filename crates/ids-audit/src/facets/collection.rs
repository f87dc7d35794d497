//! Applicability and requirements groups

use super::{AuditContext, TypeConstraintProvider, ValidityMarker};
use crate::messages;
use crate::status::AuditStatus;
use ids_ir::NodeId;
use ids_schema::constraint::intersect_all;
use ids_schema::{IfcSchemaVersion, TypeConstraint};
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Applicability,
    Requirements,
}

impl CollectionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applicability => "applicability",
            Self::Requirements => "requirements",
        }
    }
}

/// Aggregates the constraints of its required children
#[derive(Debug, Clone)]
pub struct CollectionFacet {
    valid: bool,
    kind: CollectionKind,
    constraints: BTreeMap<IfcSchemaVersion, TypeConstraint>,
}

impl CollectionFacet {
    fn new(kind: CollectionKind) -> Self {
        Self {
            valid: true,
            kind,
            constraints: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn applicability() -> Self {
        Self::new(CollectionKind::Applicability)
    }

    #[must_use]
    pub fn requirements() -> Self {
        Self::new(CollectionKind::Requirements)
    }

    #[must_use]
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let versions = match ctx.require_versions(id) {
            Ok(versions) => versions,
            Err(status) => {
                self.valid = false;
                return status;
            }
        };
        let tree = ctx.tree;
        let children = &tree[id].children;
        let mut status = AuditStatus::OK;

        if self.kind == CollectionKind::Requirements {
            for child in children {
                if let Some(facet) = tree[*child].payload.as_cardinality() {
                    status |= facet.audit_cardinality(*child, ctx);
                }
            }
        }

        let all_valid = children.iter().all(|c| tree[*c].payload.is_valid());
        for version in versions.iter() {
            let aggregate = intersect_all(
                children.iter().map(|c| tree[*c].payload.type_constraint(version)),
                ctx.schemas,
            );
            let Some(aggregate) = aggregate else {
                continue;
            };
            if all_valid && aggregate.resolve(ctx.schemas).is_empty() {
                status |= ctx.error(id, messages::impossible_set(self.kind.as_str(), version));
            }
            trace!(kind = self.kind.as_str(), %version, constraint = %aggregate, "aggregated constraint");
            self.constraints.insert(version, aggregate);
        }

        self.valid = status.is_ok();
        status
    }
}

impl ValidityMarker for CollectionFacet {
    fn is_valid(&self) -> bool {
        self.valid
    }
}

impl TypeConstraintProvider for CollectionFacet {
    fn type_constraint(&self, version: IfcSchemaVersion) -> Option<&TypeConstraint> {
        self.constraints.get(&version)
    }
}
