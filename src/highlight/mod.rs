//! Structure-preserving highlight marking
//!
//! Marks a resolved range without wrapping structural containers:
//! - Text runs are split and the selected slice wrapped in a marker element
//! - Fully enclosed elements are tagged in place (class + id attribute)
//! - Whitespace-only slices are never marked
//!
//! Marking mutates the tree, so any snapshot taken before it is stale.

mod clear;
mod marker;

use thiserror::Error;

use crate::dom::{Document, DomError, NodeId};

pub use clear::{clear, clear_annotation};
pub use marker::mark;

/// Configuration for highlight marking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightConfig {
    /// Tag of the wrapper element around marked text
    pub tag: String,
    /// CSS class prefix for highlights
    pub class_prefix: String,
    /// Data attribute for annotation ID
    pub id_attribute: String,
    /// Data attribute for annotation type
    pub type_attribute: String,
    /// Whether to include inline styles on wrappers
    pub include_inline_styles: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            tag: "span".to_string(),
            class_prefix: "amnesia-highlight".to_string(),
            id_attribute: "data-annotation-id".to_string(),
            type_attribute: "data-annotation-type".to_string(),
            include_inline_styles: true,
        }
    }
}

impl HighlightConfig {
    /// Extra class carried by containers tagged in place
    pub fn block_class(&self) -> String {
        format!("{}-block", self.class_prefix)
    }

    fn kind_class(&self, kind: &str) -> String {
        format!("{}-{}", self.class_prefix, kind)
    }

    /// Whether a class token was added by marking
    fn is_marker_class(&self, token: &str) -> bool {
        token == self.class_prefix
            || token
                .strip_prefix(self.class_prefix.as_str())
                .is_some_and(|rest| rest.starts_with('-'))
    }
}

/// What a mark is labelled with
#[derive(Debug, Clone, PartialEq)]
pub struct MarkLabel {
    /// Annotation id written to the id attribute
    pub id: String,
    /// Annotation kind, e.g. `highlight`
    pub kind: String,
    pub color: Option<String>,
    pub opacity: Option<f32>,
}

impl MarkLabel {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            color: None,
            opacity: None,
        }
    }

    pub fn with_color(mut self, color: &str, opacity: Option<f32>) -> Self {
        self.color = Some(color.to_string());
        self.opacity = opacity;
        self
    }

    /// Inline style for wrappers, if a color is set
    fn inline_style(&self) -> Option<String> {
        self.color.as_ref().map(|color| {
            format!(
                "background-color: {}; opacity: {};",
                color,
                self.opacity.unwrap_or(0.3)
            )
        })
    }
}

/// Result of marking one range
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
    /// At least one slice or container was marked
    Marked {
        /// New wrapper elements, in document order
        wrappers: Vec<NodeId>,
        /// Containers tagged in place, in document order
        tagged: Vec<NodeId>,
    },
    /// The range held only whitespace (or nothing)
    NothingMarkable,
}

impl MarkOutcome {
    pub fn is_marked(&self) -> bool {
        matches!(self, MarkOutcome::Marked { .. })
    }

    /// Total number of marked nodes
    pub fn mark_count(&self) -> usize {
        match self {
            MarkOutcome::Marked { wrappers, tagged } => wrappers.len() + tagged.len(),
            MarkOutcome::NothingMarkable => 0,
        }
    }
}

/// Errors during marking
#[derive(Debug, Error)]
pub enum MarkError {
    #[error("Range is not valid in this document")]
    InvalidRange,

    #[error("Tree mutation failed: {0}")]
    Dom(#[from] DomError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkRole {
    Wrapper,
    Tagged,
}

/// How an element was marked, if it was
fn role_of(doc: &Document, node: NodeId, config: &HighlightConfig) -> Option<MarkRole> {
    doc.attribute(node, &config.id_attribute)?;
    if !doc.has_class(node, &config.class_prefix) {
        return None;
    }
    if doc.has_class(node, &config.block_class()) {
        Some(MarkRole::Tagged)
    } else if doc.tag(node) == Some(config.tag.as_str()) {
        Some(MarkRole::Wrapper)
    } else {
        None
    }
}

/// Attached elements carrying the given annotation id
pub fn marks_for(doc: &Document, id: &str, config: &HighlightConfig) -> Vec<NodeId> {
    doc.descendants(doc.root())
        .into_iter()
        .filter(|&node| doc.attribute(node, &config.id_attribute) == Some(id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_class_detection() {
        let config = HighlightConfig::default();
        assert!(config.is_marker_class("amnesia-highlight"));
        assert!(config.is_marker_class("amnesia-highlight-block"));
        assert!(!config.is_marker_class("amnesia-highlighter"));
        assert!(!config.is_marker_class("chapter"));
    }

    #[test]
    fn test_inline_style() {
        let label = MarkLabel::new("a1", "highlight").with_color("#ffeb3b", None);
        assert_eq!(
            label.inline_style().as_deref(),
            Some("background-color: #ffeb3b; opacity: 0.3;")
        );
        assert_eq!(MarkLabel::new("a1", "note").inline_style(), None);
    }
}
