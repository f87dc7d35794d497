//! Entity facet: IFC class name and predefined type

use super::{AuditContext, FacetState};
use crate::messages;
use crate::status::AuditStatus;
use ids_ir::{Attributes, NodeId};
use ids_schema::{IfcSchemaVersions, TypeConstraint};
use std::collections::BTreeSet;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct EntityFacet {
    pub(super) state: FacetState,
    matched: BTreeSet<String>,
}

impl EntityFacet {
    #[must_use]
    pub fn new(attributes: &Attributes) -> Self {
        Self {
            state: FacetState::new(attributes),
            matched: BTreeSet::new(),
        }
    }

    /// Upper-case class names the facet matched in every required version
    #[must_use]
    pub fn matched_classes(&self) -> &BTreeSet<String> {
        &self.matched
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let versions = match ctx.require_versions(id) {
            Ok(versions) => versions,
            Err(status) => return self.state.finish(status),
        };
        let Some(name) = ctx.tree.first_child_of_kind(id, "name") else {
            return self.state.finish(ctx.error(id, messages::missing_child("entity", "name")));
        };

        let candidates = ctx.schemas.shared_class_names(versions);
        let matched = ctx.match_values(name, &candidates, false);
        if matched.is_empty() {
            return self.state.finish(ctx.error(id, messages::no_match("entity name", versions)));
        }
        trace!(matched = matched.len(), %versions, "entity classes");

        let mut status = AuditStatus::OK;
        if let Some(predefined) = ctx.tree.first_child_of_kind(id, "predefinedType") {
            status |= audit_predefined_type(predefined, &matched, versions, ctx);
        }

        for version in versions.iter() {
            self.state
                .constraints
                .insert(version, TypeConstraint::explicit(&matched));
        }
        self.matched = matched;
        self.state.finish(status)
    }
}

/// The predefined-type matcher must accept a value shared by every matched class
/// in every required version
fn audit_predefined_type(
    predefined: NodeId,
    classes: &BTreeSet<String>,
    versions: IfcSchemaVersions,
    ctx: &mut AuditContext<'_>,
) -> AuditStatus {
    let mut shared: Option<BTreeSet<String>> = None;
    for version in versions.iter() {
        for class in classes {
            let Some(info) = ctx.schemas.get(version).and_then(|m| m.class(class)) else {
                return ctx.error(predefined, messages::unknown_class(class, version));
            };
            let values: BTreeSet<String> = info.predefined_types.iter().cloned().collect();
            shared = Some(match shared {
                None => values,
                Some(acc) => acc.intersection(&values).cloned().collect(),
            });
        }
    }

    let shared = shared.unwrap_or_default();
    let class_list = classes.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
    if shared.is_empty() {
        return ctx.error(predefined, messages::no_predefined_types(&class_list, versions));
    }
    if ctx.match_values(predefined, &shared, true).is_empty() {
        return ctx.error(predefined, messages::predefined_type_mismatch(&class_list, versions));
    }
    AuditStatus::OK
}
