//! Annotation module
//!
//! Annotation records following the W3C Web Annotation format, each
//! carrying a multi-selector target for robust anchoring.
//!
//! # Features
//!
//! - Annotation types: highlights, notes, underlines
//! - Pluggable persistence through `AnnotationStore`:
//!   - `MemoryStore` for tests and embedding
//!   - `JsonFileStore` for a single JSON file on disk

mod store;
mod types;

pub use store::{AnnotationQuery, AnnotationStore, JsonFileStore, MemoryStore, StoreError};
pub use types::{Annotation, AnnotationBody, AnnotationStyle, AnnotationType, BodyType};
