//! Disambiguation of multiple candidate spans
//!
//! Each candidate earns a bonus when the text just before it matches the
//! stored prefix, another when the text just after it matches the stored
//! suffix, and a proximity bonus that decays linearly with distance from
//! the position hint. Candidates matching both sides shadow all others.

use crate::selectors::QuoteSelector;
use crate::text::DocumentSnapshot;

use super::types::ResolverConfig;

/// A scored candidate span
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub start: usize,
    pub end: usize,
    pub prefix_match: bool,
    pub suffix_match: bool,
    pub score: f64,
}

impl ScoredCandidate {
    fn midpoint(&self) -> f64 {
        (self.start + self.end) as f64 / 2.0
    }

    fn distance_to(&self, hint: Option<usize>) -> f64 {
        hint.map(|h| (self.midpoint() - h as f64).abs()).unwrap_or(0.0)
    }
}

/// Whether `context` trim-equals `stored`; an empty stored side never matches
fn side_matches(context: &str, stored: &str) -> bool {
    let stored = stored.trim();
    !stored.is_empty() && context.trim() == stored
}

/// Score every candidate against the quote's context and the hint
pub fn score_candidates(
    snapshot: &DocumentSnapshot,
    spans: &[(usize, usize)],
    quote: &QuoteSelector,
    hint: Option<usize>,
    config: &ResolverConfig,
) -> Vec<ScoredCandidate> {
    let prefix_len = quote.prefix().chars().count();
    let suffix_len = quote.suffix().chars().count();

    spans
        .iter()
        .map(|&(start, end)| {
            let prefix_match = side_matches(snapshot.before(start, prefix_len), quote.prefix());
            let suffix_match = side_matches(snapshot.after(end, suffix_len), quote.suffix());

            let mut candidate = ScoredCandidate {
                start,
                end,
                prefix_match,
                suffix_match,
                score: 0.0,
            };
            if prefix_match {
                candidate.score += config.prefix_bonus;
            }
            if suffix_match {
                candidate.score += config.suffix_bonus;
            }
            if hint.is_some() && config.hint_scale > 0.0 {
                let distance = candidate.distance_to(hint);
                if distance < config.hint_scale {
                    candidate.score += config.hint_weight * (1.0 - distance / config.hint_scale);
                }
            }
            candidate
        })
        .collect()
}

/// Pick the best span among `spans` (in document order)
pub fn disambiguate(
    snapshot: &DocumentSnapshot,
    spans: &[(usize, usize)],
    quote: &QuoteSelector,
    hint: Option<usize>,
    config: &ResolverConfig,
) -> Option<(usize, usize)> {
    match spans {
        [] => return None,
        [only] => return Some(*only),
        _ => {}
    }

    let scored = score_candidates(snapshot, spans, quote, hint, config);
    let both: Vec<ScoredCandidate> = scored
        .iter()
        .copied()
        .filter(|c| c.prefix_match && c.suffix_match)
        .collect();
    let pool = if both.is_empty() { scored } else { both };

    let best = pool.iter().map(|c| c.score).fold(f64::NEG_INFINITY, f64::max);
    let winner = pool
        .iter()
        .filter(|c| (c.score - best).abs() < f64::EPSILON)
        .min_by(|a, b| {
            a.distance_to(hint)
                .total_cmp(&b.distance_to(hint))
                .then(a.start.cmp(&b.start))
        })?;

    tracing::debug!(
        "Disambiguated {} candidates: picked [{}, {}) with score {:.3}",
        spans.len(),
        winner.start,
        winner.end,
        winner.score
    );
    Some((winner.start, winner.end))
}
