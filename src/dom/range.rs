//! Boundary points and tree ranges
//!
//! A boundary point is `(node, offset)` where the offset counts characters
//! inside text nodes and children inside elements, as in the DOM.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::node::{Document, NodeId};

/// A position in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// An ordered pair of boundary points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeRange {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl TreeRange {
    pub fn new(start: BoundaryPoint, end: BoundaryPoint) -> Self {
        Self { start, end }
    }

    /// Range spanning `[start, end)` of a single text node
    pub fn within(node: NodeId, start: usize, end: usize) -> Self {
        Self::new(BoundaryPoint::new(node, start), BoundaryPoint::new(node, end))
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Both points exist, are in one tree, and start does not follow end
    pub fn is_valid(&self, doc: &Document) -> bool {
        self.start.offset <= doc.node_length(self.start.node)
            && self.end.offset <= doc.node_length(self.end.node)
            && matches!(
                compare_points(doc, &self.start, &self.end),
                Some(Ordering::Less) | Some(Ordering::Equal)
            )
    }

    /// Deepest node containing both boundary points
    pub fn common_ancestor(&self, doc: &Document) -> Option<NodeId> {
        let mut candidate = Some(self.start.node);
        while let Some(node) = candidate {
            if doc.is_inclusive_ancestor(node, self.end.node) {
                return Some(node);
            }
            candidate = doc.parent(node);
        }
        None
    }
}

/// Order two boundary points; `None` when they are in different trees
pub fn compare_points(doc: &Document, a: &BoundaryPoint, b: &BoundaryPoint) -> Option<Ordering> {
    if a.node == b.node {
        return Some(a.offset.cmp(&b.offset));
    }

    let (top_a, path_a) = doc.index_path(a.node)?;
    let (top_b, path_b) = doc.index_path(b.node)?;
    if top_a != top_b {
        return None;
    }

    // a.node is an ancestor of b.node
    if path_b.starts_with(&path_a) {
        let child_index = path_b[path_a.len()];
        return Some(if a.offset <= child_index {
            Ordering::Less
        } else {
            Ordering::Greater
        });
    }

    // b.node is an ancestor of a.node
    if path_a.starts_with(&path_b) {
        let child_index = path_a[path_b.len()];
        return Some(if b.offset <= child_index {
            Ordering::Greater
        } else {
            Ordering::Less
        });
    }

    Some(path_a.cmp(&path_b))
}

/// Position just before `node` inside its parent
pub fn point_before(doc: &Document, node: NodeId) -> Option<BoundaryPoint> {
    Some(BoundaryPoint::new(doc.parent(node)?, doc.index_in_parent(node)?))
}

/// Position just after `node` inside its parent
pub fn point_after(doc: &Document, node: NodeId) -> Option<BoundaryPoint> {
    Some(BoundaryPoint::new(doc.parent(node)?, doc.index_in_parent(node)? + 1))
}
