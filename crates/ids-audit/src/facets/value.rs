//! Value holders and simple values
//!
//! `name`, `predefinedType`, `value`, `propertySet`, `baseName` and `system`
//! hold exactly one `simpleValue` or `restriction` and delegate matching to it.

use super::{AuditContext, Facet, StringListMatcher, ValidityMarker};
use crate::messages;
use crate::status::AuditStatus;
use ids_ir::{NodeId, Tree};
use std::collections::BTreeSet;

/// Holder of a simple value or restriction
#[derive(Debug, Clone)]
pub struct ValueFacet {
    valid: bool,
}

impl Default for ValueFacet {
    fn default() -> Self {
        Self { valid: true }
    }
}

impl ValueFacet {
    /// The `simpleValue` or `restriction` child, whichever comes first
    fn content(tree: &Tree<Facet>, id: NodeId) -> Option<NodeId> {
        tree[id]
            .children
            .iter()
            .copied()
            .find(|c| matches!(tree[*c].kind.as_str(), "simpleValue" | "restriction"))
    }

    pub fn audit(&mut self, id: NodeId, ctx: &mut AuditContext<'_>) -> AuditStatus {
        let status = match Self::content(ctx.tree, id) {
            None => {
                let kind = ctx.node(id).kind.clone();
                ctx.error(id, messages::missing_child(&kind, "simpleValue"))
            }
            Some(child) if ctx.node(child).kind == "simpleValue" && ctx.node(child).text().is_empty() => {
                let kind = ctx.node(id).kind.clone();
                ctx.error(child, messages::empty_value(&kind))
            }
            Some(_) => AuditStatus::OK,
        };
        self.valid = status.is_ok();
        status
    }
}

impl ValidityMarker for ValueFacet {
    fn is_valid(&self) -> bool {
        self.valid
    }
}

impl StringListMatcher for ValueFacet {
    fn matches(
        &self,
        tree: &Tree<Facet>,
        id: NodeId,
        candidates: &BTreeSet<String>,
        case_sensitive: bool,
    ) -> BTreeSet<String> {
        let Some(child) = Self::content(tree, id) else {
            return BTreeSet::new();
        };
        tree[child]
            .payload
            .as_matcher()
            .map(|m| m.matches(tree, child, candidates, case_sensitive))
            .unwrap_or_default()
    }

    fn literal_values(&self, tree: &Tree<Facet>, id: NodeId) -> Vec<String> {
        let Some(child) = Self::content(tree, id) else {
            return Vec::new();
        };
        tree[child]
            .payload
            .as_matcher()
            .map(|m| m.literal_values(tree, child))
            .unwrap_or_default()
    }
}

/// A literal value; the text is read from the node
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleValueFacet;

/// Candidates equal to `value`
pub(crate) fn equal_candidates(value: &str, candidates: &BTreeSet<String>, case_sensitive: bool) -> BTreeSet<String> {
    candidates
        .iter()
        .filter(|c| {
            if case_sensitive {
                c.as_str() == value
            } else {
                c.eq_ignore_ascii_case(value)
            }
        })
        .cloned()
        .collect()
}

impl StringListMatcher for SimpleValueFacet {
    fn matches(
        &self,
        tree: &Tree<Facet>,
        id: NodeId,
        candidates: &BTreeSet<String>,
        case_sensitive: bool,
    ) -> BTreeSet<String> {
        equal_candidates(tree[id].text(), candidates, case_sensitive)
    }

    fn literal_values(&self, tree: &Tree<Facet>, id: NodeId) -> Vec<String> {
        let text = tree[id].text();
        if text.is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        }
    }
}
