//! Text extraction and position mapping
//!
//! Flattens a tree into one string and keeps a segment table for
//! translating between global text offsets and tree boundary points.

mod cache;
mod snapshot;

pub use cache::SnapshotCache;
pub use snapshot::{is_non_rendering, Affinity, DocumentSnapshot, Segment, NON_RENDERING_TAGS};

pub(crate) use snapshot::CharOffsets;
