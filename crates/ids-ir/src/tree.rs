//! Arena tree for the streamed document
#![allow(clippy::must_use_candidate)] // Accessors are clear at call sites without #[must_use].

use crate::metadata::{Attributes, Position};
use std::ops::{Index, IndexMut};
use tracing::trace;

/// Handle to a node stored in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena (creation order)
    pub fn index(self) -> usize {
        self.0
    }
}

/// A document element occurrence
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// Element local name (e.g. `specification`, `entity`)
    pub kind: String,

    /// Start position of the opening tag
    pub position: Position,

    /// 1-based ordinal among same-kind siblings
    pub ordinal: usize,

    /// Non-owning parent handle
    pub parent: Option<NodeId>,

    /// Owned child handles in document order
    pub children: Vec<NodeId>,

    /// Accumulated text content
    pub content: String,

    /// XML attributes of the element
    pub attributes: Attributes,

    /// Typed payload attached by the consumer
    pub payload: T,
}

impl<T> Node<T> {
    /// Text content with surrounding whitespace removed
    pub fn text(&self) -> &str {
        self.content.trim()
    }

    /// Path segment for this node, e.g. `specification2`
    pub fn segment(&self) -> String {
        format!("{}{}", self.kind, self.ordinal)
    }
}

/// Arena holding every node of one document
#[derive(Debug, Clone)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Tree<T> {
    /// Create an empty tree
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Attach a new node under `parent` (or as a root) and return its handle.
    ///
    /// The ordinal is the number of same-kind siblings already attached to the
    /// same parent, plus one.
    pub fn insert(
        &mut self,
        parent: Option<NodeId>,
        kind: impl Into<String>,
        position: Position,
        attributes: Attributes,
        payload: T,
    ) -> NodeId {
        let kind = kind.into();
        let ordinal = match parent {
            Some(p) => self.children_of_kind(p, &kind).count() + 1,
            None => self.roots().filter(|r| self.nodes[r.0].kind == kind).count() + 1,
        };

        let id = NodeId(self.nodes.len());
        trace!(kind = %kind, ordinal, line = position.line, "attach node");
        self.nodes.push(Node {
            kind,
            position,
            ordinal,
            parent,
            children: Vec::new(),
            content: String::new(),
            attributes,
            payload,
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
        id
    }

    /// Append text to a node's content buffer
    pub fn append_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].content.push_str(text);
    }

    /// Get a node if the handle belongs to this tree
    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0)
    }

    /// Get a mutable node if the handle belongs to this tree
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(id.0)
    }

    /// First root node (the document element)
    pub fn root(&self) -> Option<NodeId> {
        self.roots().next()
    }

    /// All parentless nodes in creation order
    pub fn roots(&self) -> impl Iterator<Item = NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| NodeId(i))
    }

    /// Children of `id` with the given kind, in document order
    pub fn children_of_kind<'a>(
        &'a self,
        id: NodeId,
        kind: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(move |c| self.nodes[c.0].kind == kind)
    }

    /// First child of `id` with the given kind
    pub fn first_child_of_kind(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        self.children_of_kind(id, kind).next()
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<NodeId> for Tree<T> {
    type Output = Node<T>;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl<T> IndexMut<NodeId> for Tree<T> {
    fn index_mut(&mut self, id: NodeId) -> &mut Self::Output {
        &mut self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attach(tree: &mut Tree<()>, parent: Option<NodeId>, kind: &str) -> NodeId {
        tree.insert(parent, kind, Position::new(1, 1), Attributes::new(), ())
    }

    #[test]
    fn test_ordinals_count_same_kind_siblings() {
        let mut tree = Tree::new();
        let root = attach(&mut tree, None, "ids");
        let info = attach(&mut tree, Some(root), "info");
        let specs = attach(&mut tree, Some(root), "specifications");
        let first = attach(&mut tree, Some(specs), "specification");
        let second = attach(&mut tree, Some(specs), "specification");

        assert_eq!(tree[root].ordinal, 1);
        assert_eq!(tree[info].ordinal, 1);
        assert_eq!(tree[specs].ordinal, 1);
        assert_eq!(tree[first].ordinal, 1);
        assert_eq!(tree[second].ordinal, 2);
        assert_eq!(tree[second].segment(), "specification2");
    }

    #[test]
    fn test_children_are_linked() {
        let mut tree = Tree::new();
        let root = attach(&mut tree, None, "ids");
        let a = attach(&mut tree, Some(root), "a");
        let b = attach(&mut tree, Some(root), "b");

        assert_eq!(tree[root].children, vec![a, b]);
        assert_eq!(tree[a].parent, Some(root));
        assert_eq!(tree.first_child_of_kind(root, "b"), Some(b));
        assert!(tree.first_child_of_kind(root, "c").is_none());
        assert_eq!(tree.root(), Some(root));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_text_accumulates() {
        let mut tree = Tree::new();
        let root = attach(&mut tree, None, "simpleValue");
        tree.append_text(root, "  IFC");
        tree.append_text(root, "WALL \n");

        assert_eq!(tree[root].text(), "IFCWALL");
    }
}
