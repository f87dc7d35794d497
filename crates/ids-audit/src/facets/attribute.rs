//! Attribute facet

use super::{AuditContext, FacetState, concrete_in_all};
use crate::messages;
use crate::status::AuditStatus;
use ids_ir::{Attributes, NodeId};
use ids_schema::TypeConstraint;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct AttributeFacet {
    pub(super) state: FacetState,
}

impl AttributeFacet {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        Self {
            state: FacetState::new(attributes),
        }
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let versions = match ctx.require_versions(id) {
            Ok(versions) => versions,
            Err(status) => return self.state.finish(status),
        };
        let Some(name) = ctx.tree.first_child_of_kind(id, "name") else {
            return self.state.finish(ctx.error(id, messages::missing_child("attribute", "name")));
        };

        let mut status = self.state.audit_optional_value(id, ctx);

        let candidates = ctx.schemas.shared_attribute_names(versions);
        let matched = ctx.match_values(name, &candidates, true);
        if matched.is_empty() {
            status |= ctx.error(id, messages::no_match("attribute name", versions));
            return self.state.finish(status);
        }

        let carriers: BTreeSet<String> = matched
            .iter()
            .flat_map(|attribute| ctx.schemas.shared_attribute_classes(attribute, versions))
            .collect();
        let classes = concrete_in_all(ctx.schemas, versions, carriers);
        for version in versions.iter() {
            self.state
                .constraints
                .insert(version, TypeConstraint::explicit(&classes));
        }
        self.state.finish(status)
    }
}
