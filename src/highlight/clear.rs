//! Un-marking
//!
//! Wrappers are replaced by their own children and the surrounding text is
//! merged back together; tagged containers lose the marker classes and
//! attributes but otherwise stay untouched.

use crate::dom::{Document, NodeId};

use super::{role_of, HighlightConfig, MarkError, MarkRole};

fn unwrap(doc: &mut Document, wrapper: NodeId) -> Result<(), MarkError> {
    let Some(parent) = doc.parent(wrapper) else {
        return Ok(());
    };
    let children = doc.children(wrapper).to_vec();
    doc.replace_with(wrapper, &children)?;
    doc.normalize_text(parent)?;
    Ok(())
}

fn untag(doc: &mut Document, node: NodeId, config: &HighlightConfig) -> Result<(), MarkError> {
    let remaining: Vec<String> = doc
        .attribute(node, "class")
        .unwrap_or_default()
        .split_whitespace()
        .filter(|token| !config.is_marker_class(token))
        .map(str::to_string)
        .collect();
    if remaining.is_empty() {
        doc.remove_attribute(node, "class");
    } else {
        doc.set_attribute(node, "class", &remaining.join(" "))?;
    }
    doc.remove_attribute(node, &config.id_attribute);
    doc.remove_attribute(node, &config.type_attribute);
    Ok(())
}

fn clear_matching(doc: &mut Document, config: &HighlightConfig, id: Option<&str>) -> Result<usize, MarkError> {
    let marks: Vec<(NodeId, MarkRole)> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&node| id.is_none() || doc.attribute(node, &config.id_attribute) == id)
        .filter_map(|node| role_of(doc, node, config).map(|role| (node, role)))
        .collect();

    // Innermost first so nested wrappers unwrap cleanly
    for &(node, role) in marks.iter().rev() {
        match role {
            MarkRole::Wrapper => unwrap(doc, node)?,
            MarkRole::Tagged => untag(doc, node, config)?,
        }
    }
    Ok(marks.len())
}

/// Remove every mark from the document; returns the number of marks removed
pub fn clear(doc: &mut Document, config: &HighlightConfig) -> Result<usize, MarkError> {
    let removed = clear_matching(doc, config, None)?;
    if removed > 0 {
        tracing::debug!("Cleared {} marks", removed);
    }
    Ok(removed)
}

/// Remove the marks of one annotation
pub fn clear_annotation(doc: &mut Document, id: &str, config: &HighlightConfig) -> Result<usize, MarkError> {
    let removed = clear_matching(doc, config, Some(id))?;
    tracing::debug!("Cleared {} marks of annotation {}", removed, id);
    Ok(removed)
}
