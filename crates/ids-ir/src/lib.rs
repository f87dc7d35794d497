#![deny(warnings)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # ids-ir
//!
//! Arena node tree and traversal APIs for streamed IDS documents.
//!
//! The tree is built incrementally while an XML document is read: every element
//! becomes a [`Node`] owned by a [`Tree`], children are referenced through
//! [`NodeId`] handles and each node keeps a non-owning handle to its parent for
//! upward lookups.

/// Source positions and element attributes.
pub mod metadata;
/// Ancestor walks and positional paths.
pub mod traversal;
/// Arena tree and node primitives.
pub mod tree;

/// Position and attribute metadata carried by every node.
pub use metadata::{Attributes, Position};
/// Traversal entry points.
pub use traversal::Ancestors;
/// Tree primitives.
pub use tree::{Node, NodeId, Tree};
