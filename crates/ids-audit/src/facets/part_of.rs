//! PartOf facet: containment through a one-to-many relation
//!
//! The facet's own constraint is the relation's many side. The nested entity
//! names the container and has to fit the relation's one side.

use super::{AuditContext, FacetState};
use crate::messages;
use crate::status::AuditStatus;
use ids_ir::{Attributes, NodeId};
use ids_schema::constraint::intersect;
use ids_schema::{IfcSchemaVersions, TypeConstraint};

#[derive(Debug, Clone)]
pub struct PartOfFacet {
    pub(super) state: FacetState,
    relation: Option<String>,
}

impl PartOfFacet {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        Self {
            state: FacetState::new(attributes),
            relation: attributes.get("relation").map(str::to_string),
        }
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let versions = match ctx.require_versions(id) {
            Ok(versions) => versions,
            Err(status) => return self.state.finish(status),
        };
        let relation = self.relation.as_deref().unwrap_or_default().trim();
        let known = ctx.schemas.shared_relation_names(versions);
        let matched: Vec<&String> = known.iter().filter(|r| r.eq_ignore_ascii_case(relation)).collect();
        let [relation] = matched.as_slice() else {
            return self.state.finish(ctx.error(id, messages::invalid_relation(relation, versions)));
        };
        let relation = (*relation).clone();

        let status = self.audit_container(id, &relation, versions, ctx);
        self.state.finish(status)
    }

    fn audit_container(
        &mut self,
        id: NodeId,
        relation: &str,
        versions: IfcSchemaVersions,
        ctx: &mut AuditContext<'_>,
    ) -> AuditStatus {
        let (tree, schemas) = (ctx.tree, ctx.schemas);
        let entity = tree.first_child_of_kind(id, "entity");
        let mut status = AuditStatus::OK;

        for version in versions.iter() {
            let Some(info) = schemas.get(version).and_then(|m| m.relation(relation)) else {
                continue;
            };
            let single = IfcSchemaVersions::single(version);
            self.state
                .constraints
                .insert(version, TypeConstraint::rooted(info.many_side.clone(), single));

            let Some(entity) = entity else {
                continue;
            };
            let one_side = TypeConstraint::rooted(info.one_side.clone(), single);
            let container = intersect(Some(&one_side), tree[entity].payload.type_constraint(version), schemas);
            if container.is_some_and(|c| c.resolve(schemas).is_empty()) {
                status |= ctx.error(entity, messages::invalid_container(relation, version));
            }
        }
        status
    }
}
