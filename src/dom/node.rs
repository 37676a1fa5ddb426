//! Arena-backed document tree
//!
//! Nodes are addressed by compact `NodeId` indices into a single arena.
//! Detached nodes stay in the arena but are unreachable from the root.
//! Every structural or content mutation bumps the document version so that
//! derived text snapshots can detect that they are stale.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::DomError;

/// Compact node identifier (index into the arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Arena index of this node
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type and payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root
    Document,
    /// Element with lowercase tag name and ordered attributes
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    /// Text content
    Text(String),
    /// Comment (never rendered)
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable document tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    version: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the document root
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            version: 0,
        }
    }

    /// Parse an XHTML (well-formed XML) document
    pub fn parse(input: &str) -> Result<Self, DomError> {
        super::parse::parse_xhtml(input)
    }

    /// The document root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Mutation counter; changes after every tree mutation
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of nodes in the arena (attached or not)
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn reset_version(&mut self) {
        self.version = 0;
    }

    fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())
    }

    fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes
            .get_mut(id.index())
            .ok_or(DomError::UnknownNode(id))
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    // ============================================
    // Inspection
    // ============================================

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.data(id).map(|d| &d.kind)
    }

    /// Tag name if this is an element
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    /// Text payload if this is a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element { .. }))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match self.kind(id) {
            Some(NodeKind::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    /// Whether the element's `class` attribute contains `token`
    pub fn has_class(&self, id: NodeId, token: &str) -> bool {
        self.attribute(id, "class")
            .map(|class| class.split_whitespace().any(|t| t == token))
            .unwrap_or(false)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id)?.parent
    }

    /// Children of a node (empty for unknown ids and leaves)
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Boundary-point length: characters for text/comments, children otherwise
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.kind(id) {
            Some(NodeKind::Text(text)) | Some(NodeKind::Comment(text)) => text.chars().count(),
            Some(_) => self.children(id).len(),
            None => 0,
        }
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether the node is reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        self.contains(id) && self.is_inclusive_ancestor(self.root, id)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// All nodes of the subtree rooted at `id`, in document order (inclusive)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        out
    }

    /// Attached elements with the given tag, in document order
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| self.tag(n) == Some(tag))
            .collect()
    }

    pub fn first_element_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.tag(n) == Some(tag))
    }

    /// Child-index path from the top-most ancestor down to `id`
    pub(crate) fn index_path(&self, id: NodeId) -> Option<(NodeId, Vec<usize>)> {
        if !self.contains(id) {
            return None;
        }
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            path.push(self.index_in_parent(current)?);
            current = parent;
        }
        path.reverse();
        Some((current, path))
    }

    /// Tree order of two nodes; `None` when they live in different trees
    pub fn compare_order(&self, a: NodeId, b: NodeId) -> Option<Ordering> {
        if a == b {
            return Some(Ordering::Equal);
        }
        let (top_a, path_a) = self.index_path(a)?;
        let (top_b, path_b) = self.index_path(b)?;
        if top_a != top_b {
            return None;
        }
        Some(path_a.cmp(&path_b))
    }

    // ============================================
    // Construction & mutation
    // ============================================

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push_node(NodeKind::Comment(text.to_string()))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => {
                match attributes.iter_mut().find(|(key, _)| key == name) {
                    Some(entry) => entry.1 = value.to_string(),
                    None => attributes.push((name.to_string(), value.to_string())),
                }
            }
            _ => return Err(DomError::NotAnElement(id)),
        }
        self.touch();
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let removed = match &mut self.nodes.get_mut(id.index())?.kind {
            NodeKind::Element { attributes, .. } => {
                let pos = attributes.iter().position(|(key, _)| key == name)?;
                Some(attributes.remove(pos).1)
            }
            _ => None,
        };
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    /// Replace the payload of a text node
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        match &mut self.data_mut(id)?.kind {
            NodeKind::Text(existing) => *existing = text.to_string(),
            _ => return Err(DomError::NotAText(id)),
        }
        self.touch();
        Ok(())
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        match self.kind(parent) {
            None => return Err(DomError::UnknownNode(parent)),
            Some(NodeKind::Text(_)) | Some(NodeKind::Comment(_)) => {
                return Err(DomError::InvalidHierarchy {
                    parent,
                    child,
                    reason: "leaf nodes cannot have children",
                })
            }
            Some(_) => {}
        }
        if !self.contains(child) {
            return Err(DomError::UnknownNode(child));
        }
        if child == self.root || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::InvalidHierarchy {
                parent,
                child,
                reason: "insertion would create a cycle",
            });
        }
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(data) = self.nodes.get_mut(parent.index()) {
                data.children.retain(|&c| c != id);
            }
        }
        if let Some(data) = self.nodes.get_mut(id.index()) {
            data.parent = None;
        }
    }

    /// Insert `child` into `parent` at `index` (clamped), detaching it first
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        self.unlink(child);
        let data = self.data_mut(parent)?;
        let index = index.min(data.children.len());
        data.children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);
        self.touch();
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let index = self.children(parent).len();
        self.insert_child(parent, index, child)
    }

    /// Detach a node (and its subtree) from its parent
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if !self.contains(id) {
            return Err(DomError::UnknownNode(id));
        }
        if self.parent(id).is_some() {
            self.unlink(id);
            self.touch();
        }
        Ok(())
    }

    /// Replace `old` in its parent with `replacements`, in order
    pub fn replace_with(&mut self, old: NodeId, replacements: &[NodeId]) -> Result<(), DomError> {
        let parent = self.parent(old).ok_or(DomError::Detached(old))?;
        let index = self.index_in_parent(old).ok_or(DomError::Detached(old))?;
        for &node in replacements {
            self.check_insertable(parent, node)?;
        }
        self.unlink(old);
        for (offset, &node) in replacements.iter().enumerate() {
            self.insert_child(parent, index + offset, node)?;
        }
        self.touch();
        Ok(())
    }

    /// Merge adjacent text children and drop empty text children
    pub fn normalize_text(&mut self, parent: NodeId) -> Result<(), DomError> {
        let children = self.children(parent).to_vec();
        let mut merged: Vec<NodeId> = Vec::with_capacity(children.len());
        let mut changed = false;

        for child in children {
            let text = match self.text(child) {
                Some(text) => text.to_string(),
                None => {
                    merged.push(child);
                    continue;
                }
            };
            if text.is_empty() {
                self.unlink(child);
                changed = true;
                continue;
            }
            let previous = merged.last().copied().filter(|&prev| self.is_text(prev));
            match previous {
                Some(prev) => {
                    if let NodeKind::Text(existing) = &mut self.data_mut(prev)?.kind {
                        existing.push_str(&text);
                    }
                    self.unlink(child);
                    changed = true;
                }
                None => merged.push(child),
            }
        }

        if changed {
            self.touch();
        }
        Ok(())
    }
}
