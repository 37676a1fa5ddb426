//! Range marking
//!
//! Planning walks the common ancestor's subtree and only visits nodes that
//! intersect the range. Elements whose rendered content lies entirely
//! inside the range are tagged in place and not descended into; text nodes
//! contribute the slice of their text inside the range. Slices are then
//! wrapped in reverse document order.
//!
//! Marks left by other annotations keep their labels: existing wrappers and
//! foreign-tagged containers are descended into, so overlapping marks nest.

use std::cmp::Ordering;

use crate::dom::{compare_points, point_after, point_before, BoundaryPoint, Document, NodeId, NodeKind, TreeRange};
use crate::text::is_non_rendering;

use super::{role_of, HighlightConfig, MarkError, MarkLabel, MarkOutcome, MarkRole};

/// A text slice to wrap, in chars
#[derive(Debug, Clone, Copy)]
struct Slice {
    node: NodeId,
    start: usize,
    end: usize,
}

#[derive(Debug, Default)]
struct Plan {
    containers: Vec<NodeId>,
    slices: Vec<Slice>,
}

fn is_before(doc: &Document, a: &BoundaryPoint, b: &BoundaryPoint) -> bool {
    compare_points(doc, a, b) == Some(Ordering::Less)
}

fn is_at_or_before(doc: &Document, a: &BoundaryPoint, b: &BoundaryPoint) -> bool {
    matches!(compare_points(doc, a, b), Some(Ordering::Less | Ordering::Equal))
}

/// Whether any part of `node` lies inside the range
fn intersects(doc: &Document, node: NodeId, range: &TreeRange) -> bool {
    match (point_before(doc, node), point_after(doc, node)) {
        (Some(before), Some(after)) => is_before(doc, &before, &range.end) && is_before(doc, &range.start, &after),
        _ => true,
    }
}

/// First and last non-whitespace positions of an element's rendered text
fn content_bounds(doc: &Document, element: NodeId) -> Option<(BoundaryPoint, BoundaryPoint)> {
    let mut first = None;
    let mut last = None;
    let mut stack = vec![element];

    while let Some(node) = stack.pop() {
        match doc.kind(node) {
            Some(NodeKind::Text(text)) => {
                let mut content = text.char_indices().filter(|(_, c)| !c.is_whitespace());
                if let Some((byte, _)) = content.next() {
                    let lead = text[..byte].chars().count();
                    let trail = text.trim_end().chars().count();
                    if first.is_none() {
                        first = Some(BoundaryPoint::new(node, lead));
                    }
                    last = Some(BoundaryPoint::new(node, trail));
                }
            }
            Some(NodeKind::Element { tag, .. }) if node != element && is_non_rendering(tag) => {}
            Some(NodeKind::Element { .. }) | Some(NodeKind::Document) => {
                stack.extend(doc.children(node).iter().rev());
            }
            _ => {}
        }
    }

    Some((first?, last?))
}

fn fully_contained(doc: &Document, element: NodeId, range: &TreeRange) -> bool {
    match content_bounds(doc, element) {
        Some((first, last)) => is_at_or_before(doc, &range.start, &first) && is_at_or_before(doc, &last, &range.end),
        None => false,
    }
}

/// Collects what to mark for one label
struct Planner<'a> {
    doc: &'a Document,
    range: &'a TreeRange,
    label: &'a MarkLabel,
    config: &'a HighlightConfig,
    plan: Plan,
}

impl Planner<'_> {
    /// Earlier marks are never re-labelled: wrappers and containers tagged
    /// by another annotation are descended into instead
    fn taggable(&self, node: NodeId) -> bool {
        match role_of(self.doc, node, self.config) {
            Some(MarkRole::Wrapper) => false,
            Some(MarkRole::Tagged) => {
                self.doc.attribute(node, &self.config.id_attribute) == Some(self.label.id.as_str())
            }
            None => true,
        }
    }

    fn visit(&mut self, node: NodeId, is_ancestor: bool) {
        let doc = self.doc;
        let range = self.range;
        match doc.kind(node) {
            Some(NodeKind::Text(text)) => {
                let len = text.chars().count();
                let start = if node == range.start.node { range.start.offset.min(len) } else { 0 };
                let end = if node == range.end.node { range.end.offset.min(len) } else { len };
                if start >= end {
                    return;
                }
                let slice: String = text.chars().skip(start).take(end - start).collect();
                if slice.trim().is_empty() {
                    return;
                }
                self.plan.slices.push(Slice { node, start, end });
            }
            Some(NodeKind::Element { tag, .. }) => {
                if is_non_rendering(tag) {
                    return;
                }
                if !is_ancestor && self.taggable(node) && fully_contained(doc, node, range) {
                    self.plan.containers.push(node);
                    return;
                }
                self.descend(node);
            }
            Some(NodeKind::Document) => self.descend(node),
            Some(NodeKind::Comment(_)) | None => {}
        }
    }

    fn descend(&mut self, node: NodeId) {
        let doc = self.doc;
        for &child in doc.children(node) {
            if intersects(doc, child, self.range) {
                self.visit(child, false);
            }
        }
    }
}

fn tag_container(doc: &mut Document, node: NodeId, label: &MarkLabel, config: &HighlightConfig) -> Result<(), MarkError> {
    let added = [config.class_prefix.clone(), config.block_class(), config.kind_class(&label.kind)];
    let mut tokens: Vec<String> = doc
        .attribute(node, "class")
        .map(|class| class.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    for token in added {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    doc.set_attribute(node, "class", &tokens.join(" "))?;
    doc.set_attribute(node, &config.id_attribute, &label.id)?;
    doc.set_attribute(node, &config.type_attribute, &label.kind)?;
    Ok(())
}

fn wrap_slice(doc: &mut Document, slice: Slice, label: &MarkLabel, config: &HighlightConfig) -> Result<NodeId, MarkError> {
    let text = doc.text(slice.node).unwrap_or_default().to_string();
    let before: String = text.chars().take(slice.start).collect();
    let marked: String = text.chars().skip(slice.start).take(slice.end - slice.start).collect();
    let after: String = text.chars().skip(slice.end).collect();

    let wrapper = doc.create_element(&config.tag);
    doc.set_attribute(
        wrapper,
        "class",
        &format!("{} {}", config.class_prefix, config.kind_class(&label.kind)),
    )?;
    doc.set_attribute(wrapper, &config.id_attribute, &label.id)?;
    doc.set_attribute(wrapper, &config.type_attribute, &label.kind)?;
    if config.include_inline_styles {
        if let Some(style) = label.inline_style() {
            doc.set_attribute(wrapper, "style", &style)?;
        }
    }
    let inner = doc.create_text(&marked);
    doc.append_child(wrapper, inner)?;

    let mut replacements = Vec::with_capacity(3);
    if !before.is_empty() {
        replacements.push(doc.create_text(&before));
    }
    replacements.push(wrapper);
    if !after.is_empty() {
        replacements.push(doc.create_text(&after));
    }
    doc.replace_with(slice.node, &replacements)?;
    Ok(wrapper)
}

/// Mark `range`, labelling every mark with `label`
pub fn mark(
    doc: &mut Document,
    range: &TreeRange,
    label: &MarkLabel,
    config: &HighlightConfig,
) -> Result<MarkOutcome, MarkError> {
    if !range.is_valid(doc) {
        return Err(MarkError::InvalidRange);
    }
    if range.is_collapsed() {
        return Ok(MarkOutcome::NothingMarkable);
    }
    let ancestor = range.common_ancestor(doc).ok_or(MarkError::InvalidRange)?;

    let mut planner = Planner {
        doc,
        range,
        label,
        config,
        plan: Plan::default(),
    };
    planner.visit(ancestor, true);
    let plan = planner.plan;

    if plan.containers.is_empty() && plan.slices.is_empty() {
        tracing::debug!("Nothing markable for annotation {}", label.id);
        return Ok(MarkOutcome::NothingMarkable);
    }

    for &container in &plan.containers {
        tag_container(doc, container, label, config)?;
    }

    let mut wrappers = Vec::with_capacity(plan.slices.len());
    for &slice in plan.slices.iter().rev() {
        wrappers.push(wrap_slice(doc, slice, label, config)?);
    }
    wrappers.reverse();

    tracing::debug!(
        "Marked annotation {}: {} wrappers, {} tagged containers",
        label.id,
        wrappers.len(),
        plan.containers.len()
    );
    Ok(MarkOutcome::Marked {
        wrappers,
        tagged: plan.containers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::marks_for;
    use crate::text::DocumentSnapshot;

    fn label() -> MarkLabel {
        MarkLabel::new("a1", "highlight")
    }

    #[test]
    fn test_wraps_slice_inside_text() {
        let mut doc = Document::parse("<p>The quick brown fox</p>").unwrap();
        let snap = DocumentSnapshot::build(&doc, doc.root());
        let range = snap.offsets_to_tree_range(10, 15).unwrap();

        let outcome = mark(&mut doc, &range, &label(), &HighlightConfig::default()).unwrap();
        assert_eq!(outcome.mark_count(), 1);
        assert_eq!(
            doc.to_markup(),
            "<p>The quick <span class=\"amnesia-highlight amnesia-highlight-highlight\" \
             data-annotation-id=\"a1\" data-annotation-type=\"highlight\">brown</span> fox</p>"
        );
    }

    #[test]
    fn test_spanning_inline_elements() {
        let mut doc = Document::parse("<p>one <b>two</b> three</p>").unwrap();
        let snap = DocumentSnapshot::build(&doc, doc.root());
        let range = snap.offsets_to_tree_range(2, 10).unwrap();

        let outcome = mark(&mut doc, &range, &label(), &HighlightConfig::default()).unwrap();
        let MarkOutcome::Marked { wrappers, tagged } = outcome else {
            panic!("expected marks");
        };
        // "e " wrapped, <b> tagged in place, " th" wrapped
        assert_eq!(wrappers.len(), 2);
        assert_eq!(tagged.len(), 1);
        assert_eq!(doc.tag(tagged[0]), Some("b"));
        assert!(doc.has_class(tagged[0], "amnesia-highlight-block"));
        assert_eq!(DocumentSnapshot::build(&doc, doc.root()).text(), "one two three");
    }

    #[test]
    fn test_whitespace_only_range() {
        let mut doc = Document::parse("<div><p>a</p>   <p>b</p></div>").unwrap();
        let div = doc.first_element_by_tag("div").unwrap();
        let gap = doc.children(div)[1];
        let range = TreeRange::within(gap, 0, 3);
        let before = doc.to_markup();

        let outcome = mark(&mut doc, &range, &label(), &HighlightConfig::default()).unwrap();
        assert_eq!(outcome, MarkOutcome::NothingMarkable);
        assert_eq!(doc.to_markup(), before);
    }

    #[test]
    fn test_inline_style_applied() {
        let mut doc = Document::parse("<p>color me</p>").unwrap();
        let text = doc.children(doc.first_element_by_tag("p").unwrap())[0];
        let label = MarkLabel::new("a2", "highlight").with_color("yellow", Some(0.5));

        mark(&mut doc, &TreeRange::within(text, 0, 5), &label, &HighlightConfig::default()).unwrap();
        assert!(doc
            .to_markup()
            .contains("style=\"background-color: yellow; opacity: 0.5;\""));
    }

    #[test]
    fn test_covering_mark_nests_inside_earlier_wrapper() {
        let mut doc = Document::parse("<p>abcdef</p>").unwrap();
        let config = HighlightConfig::default();
        let inner = DocumentSnapshot::build(&doc, doc.root()).offsets_to_tree_range(1, 5).unwrap();
        mark(&mut doc, &inner, &MarkLabel::new("a1", "highlight"), &config).unwrap();

        let outer = DocumentSnapshot::build(&doc, doc.root()).offsets_to_tree_range(0, 6).unwrap();
        let outcome = mark(&mut doc, &outer, &MarkLabel::new("a2", "highlight"), &config).unwrap();

        // "a", "bcde" inside the a1 wrapper, "f"
        assert_eq!(outcome.mark_count(), 3);
        let first = marks_for(&doc, "a1", &config);
        assert_eq!(first.len(), 1);
        assert!(!doc.has_class(first[0], "amnesia-highlight-block"));
        assert_eq!(marks_for(&doc, "a2", &config).len(), 3);
        assert_eq!(DocumentSnapshot::build(&doc, doc.root()).text(), "abcdef");
    }

    #[test]
    fn test_foreign_tagged_container_is_not_relabelled() {
        let mut doc = Document::parse("<p>x <b>two</b> y</p>").unwrap();
        let config = HighlightConfig::default();
        let p = doc.first_element_by_tag("p").unwrap();
        let b = doc.first_element_by_tag("b").unwrap();
        let around_b = TreeRange::new(BoundaryPoint::new(p, 1), BoundaryPoint::new(p, 2));
        mark(&mut doc, &around_b, &MarkLabel::new("a1", "highlight"), &config).unwrap();
        let tagged_once = doc.to_markup();

        let whole = DocumentSnapshot::build(&doc, doc.root()).offsets_to_tree_range(0, 7).unwrap();
        let outcome = mark(&mut doc, &whole, &MarkLabel::new("a2", "highlight"), &config).unwrap();

        assert_eq!(outcome.mark_count(), 3);
        assert_eq!(doc.attribute(b, "data-annotation-id"), Some("a1"));
        crate::highlight::clear_annotation(&mut doc, "a2", &config).unwrap();
        assert_eq!(doc.to_markup(), tagged_once);
    }

    #[test]
    fn test_invalid_range_is_error() {
        let mut doc = Document::parse("<p>abc</p>").unwrap();
        let text = doc.children(doc.first_element_by_tag("p").unwrap())[0];
        let range = TreeRange::within(text, 2, 1);
        assert!(matches!(
            mark(&mut doc, &range, &label(), &HighlightConfig::default()),
            Err(MarkError::InvalidRange)
        ));
    }
}
