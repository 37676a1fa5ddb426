//! Versioned snapshot cache
//!
//! Holds at most one snapshot. A cached snapshot is reused only while its
//! root and version match the document and its segment count still agrees
//! with a fresh walk of the live tree.

use crate::dom::{Document, NodeId};

use super::snapshot::{live_segment_count, DocumentSnapshot};

#[derive(Debug, Default)]
pub struct SnapshotCache {
    cached: Option<DocumentSnapshot>,
    rebuilds: usize,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot for `root`, rebuilding it when stale
    pub fn snapshot(&mut self, doc: &Document, root: NodeId) -> &DocumentSnapshot {
        let reusable = match &self.cached {
            Some(snap) if snap.root() == root && snap.is_current(doc) => {
                let live = live_segment_count(doc, root);
                if live == snap.segments().len() {
                    true
                } else {
                    tracing::warn!(
                        "Cached snapshot has {} segments but live tree has {}, rebuilding",
                        snap.segments().len(),
                        live
                    );
                    false
                }
            }
            _ => false,
        };

        if !reusable {
            self.cached = None;
            self.rebuilds += 1;
        }
        self.cached
            .get_or_insert_with(|| DocumentSnapshot::build(doc, root))
    }

    /// Seed the cache with an externally produced snapshot
    pub fn insert(&mut self, snapshot: DocumentSnapshot) {
        self.cached = Some(snapshot);
    }

    /// Drop the cached snapshot
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Number of snapshots built so far
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }
}
