//! Upward traversal and positional paths

use crate::tree::{NodeId, Tree};

/// Iterator over the ancestors of a node, nearest first
pub struct Ancestors<'a, T> {
    tree: &'a Tree<T>,
    next: Option<NodeId>,
}

impl<T> Iterator for Ancestors<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree[current].parent;
        Some(current)
    }
}

impl<T> Tree<T> {
    /// Ancestors of `id`, starting with its parent
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, T> {
        Ancestors {
            tree: self,
            next: self[id].parent,
        }
    }

    /// Nearest ancestor whose kind is `kind`
    pub fn find_nearest_ancestor_of_kind(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        self.ancestors(id).find(|a| self[*a].kind == kind)
    }

    /// Deterministic positional path, e.g. `/ids1/specifications1/specification2`
    pub fn positional_path(&self, id: NodeId) -> String {
        let mut segments: Vec<String> = self.ancestors(id).map(|a| self[a].segment()).collect();
        segments.reverse();
        segments.push(self[id].segment());

        let mut path = String::new();
        for segment in segments {
            path.push('/');
            path.push_str(&segment);
        }
        path
    }
}
