//! Anchoring result and configuration types

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::TreeRange;

/// Resolution strategies, in the order they are attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Re-derive boundary nodes from structural paths
    Structural,
    /// Map stored global offsets against the current text
    Position,
    /// Search for `prefix + exact + suffix`
    ContextQuote,
    /// Search for the bare exact text
    Quote,
}

impl Strategy {
    /// Every strategy, in attempt order
    pub const ALL: [Strategy; 4] = [
        Strategy::Structural,
        Strategy::Position,
        Strategy::ContextQuote,
        Strategy::Quote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Structural => "structural",
            Strategy::Position => "position",
            Strategy::ContextQuote => "context-quote",
            Strategy::Quote => "quote",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully re-located span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Range in the live tree
    pub range: TreeRange,
    /// Strategy that produced the range
    pub strategy: Strategy,
    /// Global start offset in the snapshot the anchor was resolved against
    pub start: usize,
    /// Global end offset (exclusive)
    pub end: usize,
}

fn join(strategies: &[Strategy]) -> String {
    strategies
        .iter()
        .map(Strategy::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Anchoring errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("Snapshot is stale (snapshot v{snapshot}, document v{document})")]
    StaleSnapshot { snapshot: u64, document: u64 },

    #[error("Target has no selectors")]
    EmptyTarget,

    #[error("Target could not be anchored (attempted: {})", join(.attempted))]
    Exhausted { attempted: Vec<Strategy> },
}

/// Default bonus for a matching prefix
pub const DEFAULT_PREFIX_BONUS: f64 = 2.0;
/// Default bonus for a matching suffix
pub const DEFAULT_SUFFIX_BONUS: f64 = 2.0;
/// Default maximum bonus for proximity to the position hint
pub const DEFAULT_HINT_WEIGHT: f64 = 1.0;
/// Default distance (chars) beyond which the position hint adds nothing
pub const DEFAULT_HINT_SCALE: f64 = 500.0;

/// Disambiguation scoring weights
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub prefix_bonus: f64,
    pub suffix_bonus: f64,
    pub hint_weight: f64,
    pub hint_scale: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            prefix_bonus: DEFAULT_PREFIX_BONUS,
            suffix_bonus: DEFAULT_SUFFIX_BONUS,
            hint_weight: DEFAULT_HINT_WEIGHT,
            hint_scale: DEFAULT_HINT_SCALE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_names_every_strategy() {
        let err = AnchorError::Exhausted {
            attempted: Strategy::ALL.to_vec(),
        };
        assert_eq!(
            err.to_string(),
            "Target could not be anchored (attempted: structural, position, context-quote, quote)"
        );
    }

    #[test]
    fn test_strategy_serde() {
        let json = serde_json::to_string(&Strategy::ContextQuote).unwrap();
        assert_eq!(json, "\"context-quote\"");
    }
}
