//! Amnesia Anchor Library
//!
//! Durable text anchoring and structure-preserving highlighting for
//! EPUB/XHTML content documents. A selection is described by three
//! redundant selectors when it is created, and re-located later even after
//! the document's structure has changed.
//!
//! # Modules
//!
//! - `dom`: Minimal mutable document tree, ranges, XHTML import/export
//! - `text`: Flattened document text and offset <-> tree mapping
//! - `selectors`: Structural, position and quote selectors
//! - `anchor`: Four-strategy resolver with disambiguation
//! - `highlight`: Marking and un-marking resolved ranges
//! - `annotations`: Annotation records and stores
//! - `batch`: Load-time highlighting of many annotations
//! - `config`: Environment-driven configuration

pub mod anchor;
pub mod annotations;
pub mod batch;
pub mod config;
pub mod dom;
pub mod highlight;
pub mod selectors;
pub mod text;

pub use anchor::{Anchor, AnchorError, ResolutionTrace, Resolver, Strategy};
pub use annotations::{Annotation, AnnotationStore};
pub use batch::{BatchReport, Highlighter};
pub use config::AnchorConfig;
pub use dom::{Document, NodeId, TreeRange};
pub use selectors::{build_selectors, Target};
pub use text::DocumentSnapshot;
