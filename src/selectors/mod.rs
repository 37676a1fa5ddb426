//! Selectors module
//!
//! Redundant, serializable descriptions of a selected span:
//! - `RangeSelector`: structural node paths + local offsets
//! - `TextPositionSelector`: global text offsets
//! - `TextQuoteSelector`: exact text with prefix/suffix context

mod builder;
mod path;
mod types;

pub use builder::{build_selectors, SelectorBuildError, SelectorConfig, DEFAULT_PREFIX_LEN, DEFAULT_SUFFIX_LEN};
pub use path::{NodePath, PathParseError, PathStep, TEXT_STEP};
pub use types::{PositionSelector, QuoteSelector, Selector, StructuralSelector, Target};
