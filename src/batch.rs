//! Batch highlighting
//!
//! Loads a set of stored annotations into one document:
//!
//! 1. Clear existing marks
//! 2. For each annotation: snapshot (rebuilt if stale) -> resolve -> mark
//!
//! Marking mutates the tree, so the snapshot is rebuilt before every
//! resolution. One annotation failing never aborts the batch.

use serde::Serialize;

use crate::anchor::{Anchor, AnchorError, ResolutionTrace, Resolver, Strategy};
use crate::annotations::Annotation;
use crate::config::AnchorConfig;
use crate::dom::{Document, NodeId, TreeRange};
use crate::highlight::{clear, clear_annotation, mark, MarkError, MarkOutcome};
use crate::selectors::{build_selectors, SelectorBuildError, Target};
use crate::text::SnapshotCache;

/// What happened to one annotation in a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum AnnotationOutcome {
    /// Anchored and visibly marked
    Marked { strategy: Strategy, marks: usize },
    /// Anchored, but the range held nothing markable
    Unmarkable { strategy: Strategy },
    /// No strategy could anchor the target
    Unanchored { reason: String },
    /// Anchored, but the tree rejected the mark
    Failed { reason: String },
}

impl AnnotationOutcome {
    pub fn is_shown(&self) -> bool {
        matches!(self, AnnotationOutcome::Marked { .. })
    }
}

/// Per-annotation entry of a batch report
#[derive(Debug, Clone, Serialize)]
pub struct AnnotationReport {
    pub id: String,
    pub outcome: AnnotationOutcome,
    pub trace: ResolutionTrace,
}

/// Result of highlighting a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub annotations: Vec<AnnotationReport>,
    /// Marks removed before the batch started
    pub cleared: usize,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.annotations.len()
    }

    /// Number of annotations that ended up marked
    pub fn shown(&self) -> usize {
        self.annotations.iter().filter(|r| r.outcome.is_shown()).count()
    }

    pub fn unanchored(&self) -> impl Iterator<Item = &AnnotationReport> {
        self.annotations
            .iter()
            .filter(|r| matches!(r.outcome, AnnotationOutcome::Unanchored { .. }))
    }

    pub fn outcome(&self, id: &str) -> Option<&AnnotationOutcome> {
        self.annotations.iter().find(|r| r.id == id).map(|r| &r.outcome)
    }

    /// e.g. `3 of 4 shown`
    pub fn summary(&self) -> String {
        format!("{} of {} shown", self.shown(), self.total())
    }
}

/// Creates targets and highlights stored annotations in a document
#[derive(Debug, Default)]
pub struct Highlighter {
    config: AnchorConfig,
    resolver: Resolver,
    cache: SnapshotCache,
}

impl Highlighter {
    pub fn new(config: AnchorConfig) -> Self {
        let resolver = Resolver::new(config.resolver.clone());
        Self {
            config,
            resolver,
            cache: SnapshotCache::new(),
        }
    }

    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }

    /// Number of snapshots built so far
    pub fn snapshot_builds(&self) -> usize {
        self.cache.rebuilds()
    }

    /// Describe a fresh selection under `root`
    pub fn create_target(
        &mut self,
        doc: &Document,
        root: NodeId,
        range: &TreeRange,
        source: &str,
    ) -> Result<Target, SelectorBuildError> {
        let snapshot = self.cache.snapshot(doc, root);
        build_selectors(doc, snapshot, range, source, &self.config.selectors)
    }

    /// Describe the text between two global offsets under `root`
    pub fn create_target_from_offsets(
        &mut self,
        doc: &Document,
        root: NodeId,
        start: usize,
        end: usize,
        source: &str,
    ) -> Result<Target, SelectorBuildError> {
        let snapshot = self.cache.snapshot(doc, root);
        let range = snapshot
            .offsets_to_tree_range(start, end)
            .ok_or(SelectorBuildError::Unmappable)?;
        build_selectors(doc, snapshot, &range, source, &self.config.selectors)
    }

    /// Resolve one target against the current tree
    pub fn resolve(
        &mut self,
        doc: &Document,
        root: NodeId,
        target: &Target,
        trace: Option<&mut ResolutionTrace>,
    ) -> Result<Anchor, AnchorError> {
        let snapshot = self.cache.snapshot(doc, root);
        self.resolver.resolve(doc, snapshot, target, trace)
    }

    /// Clear all marks, then resolve and mark each annotation in turn
    pub fn apply(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        annotations: &[Annotation],
    ) -> Result<BatchReport, MarkError> {
        let cleared = clear(doc, &self.config.highlight)?;
        let mut report = BatchReport {
            annotations: Vec::with_capacity(annotations.len()),
            cleared,
        };

        for annotation in annotations {
            let mut trace = ResolutionTrace::new();
            let snapshot = self.cache.snapshot(doc, root);
            let resolved = self
                .resolver
                .resolve(doc, snapshot, &annotation.target, Some(&mut trace));

            let outcome = match resolved {
                Ok(anchor) => {
                    let marked = mark(doc, &anchor.range, &annotation.mark_label(), &self.config.highlight);
                    self.cache.invalidate();
                    match marked {
                        Ok(MarkOutcome::NothingMarkable) => AnnotationOutcome::Unmarkable {
                            strategy: anchor.strategy,
                        },
                        Ok(outcome) => AnnotationOutcome::Marked {
                            strategy: anchor.strategy,
                            marks: outcome.mark_count(),
                        },
                        Err(e) => {
                            tracing::warn!("Failed to mark annotation {}: {}", annotation.id, e);
                            AnnotationOutcome::Failed { reason: e.to_string() }
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!("Annotation {} not anchored: {}", annotation.id, e);
                    AnnotationOutcome::Unanchored { reason: e.to_string() }
                }
            };

            report.annotations.push(AnnotationReport {
                id: annotation.id.clone(),
                outcome,
                trace,
            });
        }

        tracing::info!("Highlighted annotations: {}", report.summary());
        Ok(report)
    }

    /// Remove the marks of one annotation, e.g. after deleting it from a store
    pub fn remove(&mut self, doc: &mut Document, id: &str) -> Result<usize, MarkError> {
        let removed = clear_annotation(doc, id, &self.config.highlight)?;
        self.cache.invalidate();
        Ok(removed)
    }
}
