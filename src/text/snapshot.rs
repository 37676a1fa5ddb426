//! Document snapshot: flattened text plus the segment table
//!
//! A snapshot is tied to one `(root, version)` pair. Any tree mutation,
//! including marks applied by this crate, makes it stale; stale snapshots
//! refuse to map and return `None`.
//!
//! Offsets are counted in Unicode scalar values (`char`s).

use serde::Serialize;

use crate::dom::{BoundaryPoint, Document, NodeId, NodeKind, TreeRange};

/// Subtrees whose text is never rendered
pub const NON_RENDERING_TAGS: &[&str] = &["script", "style", "noscript", "template"];

pub fn is_non_rendering(tag: &str) -> bool {
    NON_RENDERING_TAGS.contains(&tag)
}

/// A maximal run of document text owned by one text node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    /// Global start offset (inclusive)
    pub start: usize,
    /// Global end offset (exclusive)
    pub end: usize,
    /// Owning text node
    pub node: NodeId,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Which neighbouring segment owns an offset that falls on a segment seam
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// Prefer the segment that starts at the offset
    Forward,
    /// Prefer the segment that ends at the offset
    Backward,
}

/// Byte position of every char boundary in a string
#[derive(Debug, Clone, Default)]
pub(crate) struct CharOffsets {
    bytes: Vec<usize>,
}

impl CharOffsets {
    pub(crate) fn new(text: &str) -> Self {
        let bytes = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();
        Self { bytes }
    }

    /// Number of chars
    pub(crate) fn len(&self) -> usize {
        self.bytes.len().saturating_sub(1)
    }

    pub(crate) fn to_byte(&self, char_offset: usize) -> Option<usize> {
        self.bytes.get(char_offset).copied()
    }

    /// Char index of a byte offset that lies on a char boundary
    pub(crate) fn to_char(&self, byte_offset: usize) -> Option<usize> {
        self.bytes.binary_search(&byte_offset).ok()
    }
}

/// Preorder walk results shared by snapshot construction paths
struct Walk {
    /// `(preorder, last preorder in subtree)` per arena index, for nodes under root
    order: Vec<Option<(u32, u32)>>,
    /// Visible, non-empty text nodes with their preorder index
    leaves: Vec<(NodeId, u32)>,
}

enum Visit {
    Enter(NodeId, bool),
    Exit(NodeId),
}

fn walk(doc: &Document, root: NodeId) -> Walk {
    let mut order = vec![None; doc.node_count()];
    let mut leaves = Vec::new();
    let mut counter: u32 = 0;
    let mut stack = vec![Visit::Enter(root, false)];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(node, hidden) => {
                let pre = counter;
                counter += 1;
                if let Some(slot) = order.get_mut(node.index()) {
                    *slot = Some((pre, pre));
                }

                let mut hidden = hidden;
                match doc.kind(node) {
                    Some(NodeKind::Text(text)) if !hidden && !text.is_empty() => {
                        leaves.push((node, pre));
                    }
                    Some(NodeKind::Element { tag, .. }) if is_non_rendering(tag) => hidden = true,
                    Some(NodeKind::Comment(_)) => hidden = true,
                    _ => {}
                }

                stack.push(Visit::Exit(node));
                for &child in doc.children(node).iter().rev() {
                    stack.push(Visit::Enter(child, hidden));
                }
            }
            Visit::Exit(node) => {
                let last = counter.saturating_sub(1);
                if let Some(Some(entry)) = order.get_mut(node.index()) {
                    entry.1 = last;
                }
            }
        }
    }

    Walk { order, leaves }
}

/// Count the segments a fresh live walk would produce
pub(crate) fn live_segment_count(doc: &Document, root: NodeId) -> usize {
    walk(doc, root).leaves.len()
}

/// Flattened text of a subtree with bidirectional offset mapping
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    root: NodeId,
    version: u64,
    text: String,
    chars: CharOffsets,
    segments: Vec<Segment>,
    /// Preorder index of each segment's node (parallel to `segments`)
    segment_order: Vec<u32>,
    order: Vec<Option<(u32, u32)>>,
}

impl DocumentSnapshot {
    /// Extract the text under `root` by walking the live tree
    pub fn build(doc: &Document, root: NodeId) -> Self {
        let walk = walk(doc, root);
        let runs: Vec<&str> = walk
            .leaves
            .iter()
            .map(|&(node, _)| doc.text(node).unwrap_or_default())
            .collect();
        Self::assemble(doc, root, &walk, &runs)
    }

    /// Build from a previously extracted list of text runs (one per text
    /// leaf, in document order)
    ///
    /// If the run count disagrees with a fresh walk of the live tree, the
    /// extraction is discarded and the snapshot is rebuilt from the walk.
    pub fn from_extraction<S: AsRef<str>>(doc: &Document, root: NodeId, runs: &[S]) -> Self {
        let walk = walk(doc, root);
        if runs.len() != walk.leaves.len() {
            tracing::warn!(
                "Extraction has {} segments but live tree has {}, rebuilding from live walk",
                runs.len(),
                walk.leaves.len()
            );
            return Self::build(doc, root);
        }
        let runs: Vec<&str> = runs.iter().map(|r| r.as_ref()).collect();
        Self::assemble(doc, root, &walk, &runs)
    }

    fn assemble(doc: &Document, root: NodeId, walk: &Walk, runs: &[&str]) -> Self {
        let mut text = String::new();
        let mut segments = Vec::with_capacity(walk.leaves.len());
        let mut segment_order = Vec::with_capacity(walk.leaves.len());
        let mut cursor = 0;

        for (&(node, pre), run) in walk.leaves.iter().zip(runs) {
            let len = run.chars().count();
            if len == 0 {
                continue;
            }
            text.push_str(run);
            segments.push(Segment {
                start: cursor,
                end: cursor + len,
                node,
            });
            segment_order.push(pre);
            cursor += len;
        }

        let chars = CharOffsets::new(&text);
        Self {
            root,
            version: doc.version(),
            text,
            chars,
            segments,
            segment_order,
            order: walk.order.clone(),
        }
    }

    // ============================================
    // Accessors
    // ============================================

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Document version this snapshot was taken at
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether the document has not been mutated since this snapshot
    pub fn is_current(&self, doc: &Document) -> bool {
        self.version == doc.version()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in chars
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Text between two char offsets
    pub fn slice(&self, start: usize, end: usize) -> Option<&str> {
        if start > end {
            return None;
        }
        let from = self.chars.to_byte(start)?;
        let to = self.chars.to_byte(end)?;
        self.text.get(from..to)
    }

    /// Up to `len` chars ending at `offset`
    pub fn before(&self, offset: usize, len: usize) -> &str {
        self.slice(offset.saturating_sub(len), offset).unwrap_or_default()
    }

    /// Up to `len` chars starting at `offset`
    pub fn after(&self, offset: usize, len: usize) -> &str {
        let end = offset.saturating_add(len).min(self.len());
        self.slice(offset, end).unwrap_or_default()
    }

    /// Whether the node lies under this snapshot's root
    pub fn covers(&self, node: NodeId) -> bool {
        self.node_order(node).is_some()
    }

    fn node_order(&self, node: NodeId) -> Option<(u32, u32)> {
        self.order.get(node.index()).copied().flatten()
    }

    /// Segment owned by a text node, if it contributes text
    pub fn segment_of(&self, node: NodeId) -> Option<&Segment> {
        let (pre, _) = self.node_order(node)?;
        let idx = self.segment_order.binary_search(&pre).ok()?;
        self.segments.get(idx)
    }

    /// Global `[start, end)` of the text rendered inside `node`'s subtree
    ///
    /// Nodes without visible text yield a collapsed span at the next text
    /// position.
    pub fn node_text_span(&self, node: NodeId) -> Option<(usize, usize)> {
        let (pre, last) = self.node_order(node)?;
        let lo = self.segment_order.partition_point(|&o| o < pre);
        let hi = self.segment_order.partition_point(|&o| o <= last);
        if lo < hi {
            Some((self.segments[lo].start, self.segments[hi - 1].end))
        } else {
            let at = self.segments.get(lo).map(|s| s.start).unwrap_or(self.len());
            Some((at, at))
        }
    }

    // ============================================
    // Tree -> offsets
    // ============================================

    /// Map a tree range to global `(start, end)` offsets
    ///
    /// Returns `None` if the snapshot is stale or a boundary is not under
    /// the root.
    pub fn tree_range_to_offsets(&self, doc: &Document, range: &TreeRange) -> Option<(usize, usize)> {
        if !self.is_current(doc) {
            return None;
        }
        let start = self.point_to_offset(doc, &range.start, Affinity::Forward)?;
        let end = self.point_to_offset(doc, &range.end, Affinity::Backward)?;
        Some((start, end.max(start)))
    }

    /// Map one boundary point to a global offset
    ///
    /// Points between children resolve to the first text position at or
    /// after them (`Forward`) or the last one at or before them (`Backward`).
    pub fn point_to_offset(&self, doc: &Document, point: &BoundaryPoint, affinity: Affinity) -> Option<usize> {
        if let Some(segment) = self.segment_of(point.node) {
            return Some(segment.start + point.offset.min(segment.len()));
        }

        let (pre, last) = self.node_order(point.node)?;
        let cut = match doc.kind(point.node)? {
            NodeKind::Text(_) | NodeKind::Comment(_) => pre,
            NodeKind::Element { .. } | NodeKind::Document => {
                match doc.children(point.node).get(point.offset) {
                    Some(&child) => self.node_order(child)?.0,
                    None => last + 1,
                }
            }
        };

        let idx = self.segment_order.partition_point(|&o| o < cut);
        Some(match affinity {
            Affinity::Forward => self.segments.get(idx).map(|s| s.start).unwrap_or(self.len()),
            Affinity::Backward => idx
                .checked_sub(1)
                .and_then(|i| self.segments.get(i))
                .map(|s| s.end)
                .unwrap_or(0),
        })
    }

    // ============================================
    // Offsets -> tree
    // ============================================

    /// Place a global offset inside its owning segment
    pub fn offset_to_point(&self, offset: usize, affinity: Affinity) -> Option<BoundaryPoint> {
        if offset > self.len() {
            return None;
        }
        let idx = match affinity {
            Affinity::Forward => self.segments.partition_point(|s| s.end <= offset),
            Affinity::Backward => self.segments.partition_point(|s| s.end < offset),
        };
        let segment = self.segments.get(idx).or_else(|| self.segments.last())?;
        let local = offset.saturating_sub(segment.start).min(segment.len());
        Some(BoundaryPoint::new(segment.node, local))
    }

    /// Map global offsets back to a tree range
    ///
    /// Returns `None` for out-of-bounds or inverted offsets.
    pub fn offsets_to_tree_range(&self, start: usize, end: usize) -> Option<TreeRange> {
        if start > end || end > self.len() {
            return None;
        }
        let start_point = self.offset_to_point(start, Affinity::Forward)?;
        if start == end {
            return Some(TreeRange::new(start_point, start_point));
        }
        let end_point = self.offset_to_point(end, Affinity::Backward)?;
        Some(TreeRange::new(start_point, end_point))
    }

    /// Text covered by a tree range
    pub fn range_text(&self, doc: &Document, range: &TreeRange) -> Option<&str> {
        let (start, end) = self.tree_range_to_offsets(doc, range)?;
        self.slice(start, end)
    }
}
