//! Four-strategy anchoring resolver
//!
//! Strategies run in a fixed order and the first one producing a valid,
//! non-collapsed range wins:
//!
//! 1. Structural: follow the stored node paths, validated against the quote
//! 2. Position: map stored global offsets, validated against the quote
//! 3. Context quote: search `prefix + exact + suffix`
//! 4. Quote: search the bare exact text with context as soft signals
//!
//! A validated structural or position match is final and is not
//! re-disambiguated.

use crate::dom::{BoundaryPoint, Document, NodeId, TreeRange};
use crate::selectors::{NodePath, QuoteSelector, Target};
use crate::text::{Affinity, DocumentSnapshot};

use super::scoring::disambiguate;
use super::search::locate;
use super::trace::{ResolutionTrace, StepOutcome, TraceStep};
use super::types::{Anchor, AnchorError, ResolverConfig, Strategy};

/// Result of a single strategy
enum Attempt {
    Found {
        start: usize,
        end: usize,
        range: TreeRange,
        candidates: usize,
        normalized: bool,
    },
    Skipped(String),
    Rejected {
        reason: String,
        candidates: usize,
        normalized: bool,
    },
}

impl Attempt {
    fn rejected(reason: impl Into<String>) -> Self {
        Attempt::Rejected {
            reason: reason.into(),
            candidates: 0,
            normalized: false,
        }
    }

    fn skipped(reason: impl Into<String>) -> Self {
        Attempt::Skipped(reason.into())
    }
}

/// Re-locates stored targets in a live document
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve `target` against a snapshot of the current tree
    ///
    /// When `trace` is given, one step per attempted strategy is appended.
    pub fn resolve(
        &self,
        doc: &Document,
        snapshot: &DocumentSnapshot,
        target: &Target,
        trace: Option<&mut ResolutionTrace>,
    ) -> Result<Anchor, AnchorError> {
        if !snapshot.is_current(doc) {
            return Err(AnchorError::StaleSnapshot {
                snapshot: snapshot.version(),
                document: doc.version(),
            });
        }
        if !target.is_anchorable() {
            return Err(AnchorError::EmptyTarget);
        }

        let mut local = ResolutionTrace::new();
        let mut anchored = None;

        for strategy in Strategy::ALL {
            let attempt = match strategy {
                Strategy::Structural => self.try_structural(doc, snapshot, target),
                Strategy::Position => self.try_position(doc, snapshot, target),
                Strategy::ContextQuote => self.try_context_quote(snapshot, target),
                Strategy::Quote => self.try_quote(snapshot, target),
            };

            let (outcome, candidates, normalized) = match attempt {
                Attempt::Found {
                    start,
                    end,
                    range,
                    candidates,
                    normalized,
                } => {
                    anchored = Some(Anchor {
                        range,
                        strategy,
                        start,
                        end,
                    });
                    (StepOutcome::Anchored { start, end }, candidates, normalized)
                }
                Attempt::Skipped(reason) => (StepOutcome::Skipped { reason }, 0, false),
                Attempt::Rejected {
                    reason,
                    candidates,
                    normalized,
                } => (StepOutcome::Rejected { reason }, candidates, normalized),
            };

            tracing::debug!("{} strategy for {}: {:?}", strategy, target.source, outcome);
            local.record(TraceStep {
                strategy,
                outcome,
                candidates,
                normalized,
            });

            if anchored.is_some() {
                break;
            }
        }

        let attempted = local.attempted();
        if let Some(out) = trace {
            out.steps.extend(local.steps);
        }

        match anchored {
            Some(anchor) => Ok(anchor),
            None => {
                tracing::debug!("No strategy anchored {}", target.source);
                Err(AnchorError::Exhausted { attempted })
            }
        }
    }

    // ============================================
    // Strategy 1: structural paths
    // ============================================

    fn try_structural(&self, doc: &Document, snapshot: &DocumentSnapshot, target: &Target) -> Attempt {
        let Some(selector) = target.structural() else {
            return Attempt::skipped("no structural selector");
        };
        let root = snapshot.root();

        let start_path = &selector.start_container;
        let start = match boundary(doc, snapshot, root, start_path, selector.start_offset, Affinity::Forward) {
            Ok(point) => point,
            Err(reason) => return Attempt::rejected(format!("start: {}", reason)),
        };
        let end_path = &selector.end_container;
        let end = match boundary(doc, snapshot, root, end_path, selector.end_offset, Affinity::Backward) {
            Ok(point) => point,
            Err(reason) => return Attempt::rejected(format!("end: {}", reason)),
        };

        let range = TreeRange::new(start, end);
        if !range.is_valid(doc) {
            return Attempt::rejected("boundaries are out of order");
        }
        self.validated(snapshot.tree_range_to_offsets(doc, &range), range, snapshot, target.quote())
    }

    // ============================================
    // Strategy 2: global position
    // ============================================

    fn try_position(&self, doc: &Document, snapshot: &DocumentSnapshot, target: &Target) -> Attempt {
        let Some(position) = target.position() else {
            return Attempt::skipped("no position selector");
        };
        if position.start >= position.end {
            return Attempt::rejected("position selector is collapsed");
        }
        let Some(range) = snapshot.offsets_to_tree_range(position.start, position.end) else {
            return Attempt::rejected(format!(
                "[{}, {}) is outside the text (length {})",
                position.start,
                position.end,
                snapshot.len()
            ));
        };
        self.validated(snapshot.tree_range_to_offsets(doc, &range), range, snapshot, target.quote())
    }

    /// Accept a structural/position range only if it is non-collapsed and
    /// agrees with the quote, when one is present
    fn validated(
        &self,
        offsets: Option<(usize, usize)>,
        range: TreeRange,
        snapshot: &DocumentSnapshot,
        quote: Option<&QuoteSelector>,
    ) -> Attempt {
        let Some((start, end)) = offsets else {
            return Attempt::rejected("range does not map to text");
        };
        if start >= end {
            return Attempt::rejected("range is collapsed");
        }
        if let Some(quote) = quote {
            let found = snapshot.slice(start, end).unwrap_or_default();
            if found.trim() != quote.exact.trim() {
                return Attempt::rejected(format!("text {:?} does not match quote {:?}", found, quote.exact));
            }
        }
        Attempt::Found {
            start,
            end,
            range,
            candidates: 1,
            normalized: false,
        }
    }

    // ============================================
    // Strategies 3 and 4: text search
    // ============================================

    fn try_context_quote(&self, snapshot: &DocumentSnapshot, target: &Target) -> Attempt {
        let Some(quote) = target.quote() else {
            return Attempt::skipped("no quote selector");
        };
        if !quote.has_context() {
            return Attempt::skipped("quote has no prefix or suffix");
        }
        self.search(snapshot, quote, quote.prefix(), quote.suffix(), hint(target))
    }

    fn try_quote(&self, snapshot: &DocumentSnapshot, target: &Target) -> Attempt {
        let Some(quote) = target.quote() else {
            return Attempt::skipped("no quote selector");
        };
        self.search(snapshot, quote, "", "", hint(target))
    }

    fn search(
        &self,
        snapshot: &DocumentSnapshot,
        quote: &QuoteSelector,
        prefix: &str,
        suffix: &str,
        hint: Option<usize>,
    ) -> Attempt {
        if quote.exact.trim().is_empty() {
            return Attempt::skipped("quote is empty");
        }
        let located = locate(snapshot.text(), prefix, &quote.exact, suffix);
        let candidates = located.spans.len();
        let normalized = located.normalized;

        let Some((start, end)) = disambiguate(snapshot, &located.spans, quote, hint, &self.config) else {
            return Attempt::Rejected {
                reason: "no match".to_string(),
                candidates,
                normalized,
            };
        };
        if start >= end {
            return Attempt::Rejected {
                reason: "match is collapsed".to_string(),
                candidates,
                normalized,
            };
        }
        match snapshot.offsets_to_tree_range(start, end) {
            Some(range) => Attempt::Found {
                start,
                end,
                range,
                candidates,
                normalized,
            },
            None => Attempt::Rejected {
                reason: format!("match [{}, {}) does not map to the tree", start, end),
                candidates,
                normalized,
            },
        }
    }
}

/// Position hint: the stored global start, if any
fn hint(target: &Target) -> Option<usize> {
    target.position().map(|p| p.start)
}

/// Resolve one structural boundary to a live tree position
fn boundary(
    doc: &Document,
    snapshot: &DocumentSnapshot,
    root: NodeId,
    path: &NodePath,
    offset: usize,
    affinity: Affinity,
) -> Result<BoundaryPoint, String> {
    let node = path
        .resolve(doc, root)
        .ok_or_else(|| format!("path {} not found", path))?;

    if doc.is_text(node) {
        if offset > doc.node_length(node) {
            return Err(format!("offset {} beyond text node {}", offset, path));
        }
        return Ok(BoundaryPoint::new(node, offset));
    }

    let (span_start, span_end) = snapshot
        .node_text_span(node)
        .ok_or_else(|| format!("{} is outside the snapshot", path))?;
    let global = span_start + offset;
    if global > span_end {
        return Err(format!("offset {} beyond text of {}", offset, path));
    }
    snapshot
        .offset_to_point(global, affinity)
        .ok_or_else(|| format!("offset {} of {} does not map", offset, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selectors::{build_selectors, Selector, SelectorConfig, StructuralSelector};

    fn resolve(doc: &Document, target: &Target) -> (Result<Anchor, AnchorError>, ResolutionTrace) {
        let snapshot = DocumentSnapshot::build(doc, doc.root());
        let mut trace = ResolutionTrace::new();
        let result = Resolver::default().resolve(doc, &snapshot, target, Some(&mut trace));
        (result, trace)
    }

    fn target_for(doc: &Document, start: usize, end: usize) -> Target {
        let snapshot = DocumentSnapshot::build(doc, doc.root());
        let range = snapshot.offsets_to_tree_range(start, end).unwrap();
        build_selectors(doc, &snapshot, &range, "test", &SelectorConfig::default()).unwrap()
    }

    #[test]
    fn test_structural_wins_when_all_agree() {
        let doc = Document::parse("<body><p>alpha beta</p><p>gamma beta</p></body>").unwrap();
        let target = target_for(&doc, 16, 20);

        let (result, trace) = resolve(&doc, &target);
        let anchor = result.unwrap();
        assert_eq!(anchor.strategy, Strategy::Structural);
        assert_eq!((anchor.start, anchor.end), (16, 20));
        assert_eq!(trace.steps.len(), 1);
    }

    #[test]
    fn test_structural_rejected_on_quote_mismatch() {
        let doc = Document::parse("<p>one two three</p>").unwrap();
        let mut target = target_for(&doc, 4, 7);
        for selector in &mut target.selectors {
            if let Selector::TextQuote(q) = selector {
                q.exact = "three".to_string();
            }
        }

        let (result, trace) = resolve(&doc, &target);
        let anchor = result.unwrap();
        assert!(matches!(
            trace.step(Strategy::Structural).unwrap().outcome,
            StepOutcome::Rejected { .. }
        ));
        assert!(matches!(
            trace.step(Strategy::Position).unwrap().outcome,
            StepOutcome::Rejected { .. }
        ));
        assert_eq!(anchor.strategy, Strategy::Quote);
        assert_eq!((anchor.start, anchor.end), (8, 13));
    }

    #[test]
    fn test_element_container_offsets() {
        let doc = Document::parse("<div><p>ab</p><p>cd</p></div>").unwrap();
        let mut target = Target::empty("s");
        target.add_range(StructuralSelector {
            start_container: "/div[1]".parse().unwrap(),
            start_offset: 1,
            end_container: "/div[1]".parse().unwrap(),
            end_offset: 3,
        });

        let (result, _) = resolve(&doc, &target);
        let anchor = result.unwrap();
        assert_eq!(anchor.strategy, Strategy::Structural);
        assert_eq!((anchor.start, anchor.end), (1, 3));
    }

    #[test]
    fn test_missing_path_falls_through() {
        let doc = Document::parse("<p>hello world</p>").unwrap();
        let mut target = Target::empty("s");
        target.add_range(StructuralSelector {
            start_container: "/div[1]/text()[1]".parse().unwrap(),
            start_offset: 0,
            end_container: "/div[1]/text()[1]".parse().unwrap(),
            end_offset: 5,
        });
        target.add_text_position(6, 11);

        let (result, _) = resolve(&doc, &target);
        assert_eq!(result.unwrap().strategy, Strategy::Position);
    }

    #[test]
    fn test_empty_target_is_refused() {
        let doc = Document::parse("<p>hello</p>").unwrap();
        let (result, trace) = resolve(&doc, &Target::empty("s"));
        assert_eq!(result, Err(AnchorError::EmptyTarget));
        assert!(trace.steps.is_empty());
    }

    #[test]
    fn test_collapsed_position_never_succeeds() {
        let doc = Document::parse("<p>hello</p>").unwrap();
        let mut target = Target::empty("s");
        target.add_text_position(2, 2);
        let (result, _) = resolve(&doc, &target);
        assert!(matches!(result, Err(AnchorError::Exhausted { .. })));
    }

    #[test]
    fn test_stale_snapshot_is_refused() {
        let mut doc = Document::parse("<p>hello</p>").unwrap();
        let snapshot = DocumentSnapshot::build(&doc, doc.root());
        let p = doc.first_element_by_tag("p").unwrap();
        doc.set_attribute(p, "id", "x").unwrap();

        let mut target = Target::empty("s");
        target.add_text_position(0, 5);
        let result = Resolver::default().resolve(&doc, &snapshot, &target, None);
        assert!(matches!(result, Err(AnchorError::StaleSnapshot { .. })));
    }

    #[test]
    fn test_context_quote_skipped_without_context() {
        let doc = Document::parse("<p>hello</p>").unwrap();
        let mut target = Target::empty("s");
        target.add_text_quote("hello", None, None);

        let (result, trace) = resolve(&doc, &target);
        assert_eq!(result.unwrap().strategy, Strategy::Quote);
        assert!(matches!(
            trace.step(Strategy::ContextQuote).unwrap().outcome,
            StepOutcome::Skipped { .. }
        ));
    }
}
