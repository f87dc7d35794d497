//! Classification and material facets

use super::{AuditContext, FacetState};
use crate::status::AuditStatus;
use ids_ir::{Attributes, NodeId};
use ids_schema::{AssociationKind, TypeConstraint};
use std::collections::BTreeSet;

/// A facet satisfied through an association relation
#[derive(Debug, Clone)]
pub struct AssociationFacet {
    pub(super) state: FacetState,
    kind: AssociationKind,
}

impl AssociationFacet {
    #[must_use]
    pub fn new(kind: AssociationKind, attributes: &Attributes) -> Self {
        Self {
            state: FacetState::new(attributes),
            kind,
        }
    }

    #[must_use]
    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let versions = match ctx.require_versions(id) {
            Ok(versions) => versions,
            Err(status) => return self.state.finish(status),
        };
        let status = self.state.audit_optional_value(id, ctx);

        for metadata in ctx.schemas.iter_versions(versions) {
            let classes: BTreeSet<String> = metadata
                .association_roots(self.kind)
                .iter()
                .filter_map(|root| metadata.concrete_classes_under(root))
                .flatten()
                .collect();
            self.state
                .constraints
                .insert(metadata.version, TypeConstraint::Explicit(classes));
        }
        self.state.finish(status)
    }
}
