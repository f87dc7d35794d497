//! Class hierarchy linking and resolution
//!
//! Class tables are flat: every class names its parent. Linking turns the table
//! into a navigable tree; the remaining functions answer questions about subtrees
//! of the linked tree.

use crate::model::{AttributeIndex, ClassId, ClassInfo, ClassTree, FunctionalRole};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, trace};

/// Resolve every class's parent handle and fill the children lists.
///
/// A class whose parent name is unknown (or names the class itself) becomes a root.
/// Returns the number of such unresolved parents.
pub fn link_tree(tree: &mut ClassTree) -> usize {
    let mut unresolved = 0;
    let ids: Vec<ClassId> = tree.ids().collect();

    for id in ids {
        let Some(parent_name) = tree.get(id).parent_name.clone() else {
            continue;
        };
        match tree.id_of(&parent_name) {
            Some(parent) if parent != id => {
                tree.get_mut(id).parent = Some(parent);
                tree.get_mut(parent).children.push(id);
            }
            _ => {
                trace!(class = %tree.get(id).name, parent = %parent_name, "unresolved parent, class becomes a root");
                unresolved += 1;
            }
        }
    }

    debug!(classes = tree.len(), unresolved, "linked class tree");
    unresolved
}

/// `id` followed by all of its descendants, depth first in child order.
///
/// Each class is visited once even if the table is cyclic.
pub fn subtree(tree: &ClassTree, id: ClassId) -> Vec<ClassId> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![id];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        order.push(current);
        stack.extend(tree.get(current).children.iter().rev().copied());
    }
    order
}

/// The concrete closure of a subtree: `id` itself when concrete, then every
/// concrete descendant.
pub fn matching_concrete_classes(tree: &ClassTree, id: ClassId) -> Vec<&ClassInfo> {
    subtree(tree, id)
        .into_iter()
        .map(|c| tree.get(c))
        .filter(|c| c.is_concrete())
        .collect()
}

/// Mark `root_name` and every class under it with `role`.
///
/// Returns `false` when the root class is unknown.
pub fn set_functional_role(tree: &mut ClassTree, root_name: &str, role: FunctionalRole) -> bool {
    let Some(root) = tree.id_of(root_name) else {
        return false;
    };
    for id in subtree(tree, root) {
        tree.get_mut(id).role = role;
    }
    true
}

/// Record that `object` (and its subclasses) can be typed by `types`.
///
/// Unknown names are skipped.
pub fn propagate_type_relation(tree: &mut ClassTree, object: &str, types: &[String]) {
    if let Some(root) = tree.id_of(object) {
        for id in subtree(tree, root) {
            tree.get_mut(id).role = FunctionalRole::ElementWithType;
        }
    }
    for type_name in types {
        if let Some(id) = tree.id_of(type_name) {
            tree.get_mut(id).role = FunctionalRole::TypeOfElement;
        }
    }
}

/// Build the attribute index of a linked tree.
///
/// The full set holds every class carrying the attribute through inheritance; the
/// top set keeps only declaring classes that have no declaring ancestor.
pub fn build_attribute_index(tree: &ClassTree) -> AttributeIndex {
    let mut declarers: BTreeMap<&str, Vec<ClassId>> = BTreeMap::new();
    for id in tree.ids() {
        for attribute in &tree.get(id).direct_attributes {
            declarers.entry(attribute.as_str()).or_default().push(id);
        }
    }

    let mut index = AttributeIndex::default();
    for (attribute, owners) in declarers {
        let owner_set: HashSet<ClassId> = owners.iter().copied().collect();

        let full: BTreeSet<String> = owners
            .iter()
            .flat_map(|owner| subtree(tree, *owner))
            .map(|c| tree.get(c).upper_name())
            .collect();

        let top: BTreeSet<String> = owners
            .iter()
            .filter(|owner| !ancestors(tree, **owner).any(|a| owner_set.contains(&a)))
            .map(|owner| tree.get(*owner).upper_name())
            .collect();

        index.full.insert(attribute.to_string(), full);
        index.top.insert(attribute.to_string(), top);
    }
    index
}

/// Ancestors of `id`, nearest first; stops if the chain loops
fn ancestors(tree: &ClassTree, id: ClassId) -> impl Iterator<Item = ClassId> + '_ {
    let mut seen = HashSet::from([id]);
    std::iter::successors(tree.get(id).parent, move |current| {
        tree.get(*current).parent.filter(|p| seen.insert(*p))
    })
}
