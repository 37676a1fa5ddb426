//! Anchoring module
//!
//! Re-locates stored targets in the current tree:
//! - Ordered strategies: structural, position, context quote, quote
//! - Literal and whitespace-normalized search
//! - Score-based disambiguation of repeated quotes
//! - Optional structured trace per call

mod resolver;
mod scoring;
mod search;
mod trace;
mod types;

pub use resolver::Resolver;
pub use scoring::{disambiguate, score_candidates, ScoredCandidate};
pub use search::{find_all, locate, Located, NormalizedText};
pub use trace::{ResolutionTrace, StepOutcome, TraceStep};
pub use types::{
    Anchor, AnchorError, ResolverConfig, Strategy, DEFAULT_HINT_SCALE, DEFAULT_HINT_WEIGHT,
    DEFAULT_PREFIX_BONUS, DEFAULT_SUFFIX_BONUS,
};
