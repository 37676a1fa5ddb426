//! Document tree module
//!
//! A minimal mutable tree (elements, text, comments) standing in for a
//! browser DOM, plus boundary points and ranges over it:
//! - Arena storage with `NodeId` handles
//! - XHTML import via roxmltree
//! - Markup serialization
//! - DOM-style boundary point ordering

mod error;
mod node;
mod parse;
mod range;
mod serialize;

pub use error::DomError;
pub use node::{Document, NodeId, NodeKind};
pub use parse::parse_xhtml;
pub use range::{compare_points, point_after, point_before, BoundaryPoint, TreeRange};
