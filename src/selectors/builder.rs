//! Selector builder
//!
//! Describes a freshly selected tree range three independent ways:
//! structural paths, global text position, and quote with context.
//! Targets are built once, at annotation creation time, and never
//! recomputed against later tree state.

use thiserror::Error;

use crate::dom::{BoundaryPoint, Document, NodeId, TreeRange};
use crate::text::DocumentSnapshot;

use super::path::NodePath;
use super::types::{QuoteSelector, Selector, StructuralSelector, Target};

/// Default number of context chars captured before the selection
pub const DEFAULT_PREFIX_LEN: usize = 32;
/// Default number of context chars captured after the selection
pub const DEFAULT_SUFFIX_LEN: usize = 32;

/// Configuration for selector building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorConfig {
    /// Maximum prefix length in chars
    pub prefix_len: usize,
    /// Maximum suffix length in chars
    pub suffix_len: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_PREFIX_LEN,
            suffix_len: DEFAULT_SUFFIX_LEN,
        }
    }
}

/// Errors while describing a selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorBuildError {
    #[error("Snapshot is stale (snapshot v{snapshot}, document v{document})")]
    StaleSnapshot { snapshot: u64, document: u64 },

    #[error("Range {0} boundary is not under root {1}")]
    NotRooted(&'static str, NodeId),

    #[error("Range boundaries do not form a valid range")]
    InvalidRange,

    #[error("Range cannot be mapped to text offsets")]
    Unmappable,

    #[error("Selection contains no text")]
    EmptySelection,
}

/// Local offset of a boundary within its container's own text
fn local_offset(snapshot: &DocumentSnapshot, doc: &Document, point: &BoundaryPoint, global: usize) -> usize {
    if doc.is_text(point.node) {
        return point.offset;
    }
    snapshot
        .node_text_span(point.node)
        .map(|(start, _)| global.saturating_sub(start))
        .unwrap_or(0)
}

/// Path to a boundary container; comments have no path step
fn container_path(doc: &Document, root: NodeId, node: NodeId, side: &'static str) -> Result<NodePath, SelectorBuildError> {
    if !doc.is_inclusive_ancestor(root, node) {
        return Err(SelectorBuildError::NotRooted(side, root));
    }
    NodePath::from_node(doc, root, node).ok_or(SelectorBuildError::Unmappable)
}

/// Build the structural, position and quote selectors for `range`
pub fn build_selectors(
    doc: &Document,
    snapshot: &DocumentSnapshot,
    range: &TreeRange,
    source: &str,
    config: &SelectorConfig,
) -> Result<Target, SelectorBuildError> {
    if !snapshot.is_current(doc) {
        return Err(SelectorBuildError::StaleSnapshot {
            snapshot: snapshot.version(),
            document: doc.version(),
        });
    }
    let root = snapshot.root();

    let start_container = container_path(doc, root, range.start.node, "start")?;
    let end_container = container_path(doc, root, range.end.node, "end")?;

    if !range.is_valid(doc) {
        return Err(SelectorBuildError::InvalidRange);
    }

    let (start, end) = snapshot
        .tree_range_to_offsets(doc, range)
        .ok_or(SelectorBuildError::Unmappable)?;
    if start == end {
        return Err(SelectorBuildError::EmptySelection);
    }

    let exact = snapshot.slice(start, end).ok_or(SelectorBuildError::Unmappable)?;
    let prefix = snapshot.before(start, config.prefix_len);
    let suffix = snapshot.after(end, config.suffix_len);

    let structural = StructuralSelector {
        start_container,
        start_offset: local_offset(snapshot, doc, &range.start, start),
        end_container,
        end_offset: local_offset(snapshot, doc, &range.end, end),
    };

    tracing::debug!(
        "Built selectors for {}: [{}, {}) {:?}",
        source,
        start,
        end,
        exact
    );

    let mut target = Target::empty(source);
    target.add_range(structural);
    target.add_text_position(start, end);
    target
        .selectors
        .push(Selector::TextQuote(QuoteSelector::new(exact, Some(prefix), Some(suffix))));
    Ok(target)
}
