//! Literal and whitespace-normalized text search
//!
//! All results are char offsets into the searched text. Whitespace
//! normalization collapses every whitespace run to a single space and keeps
//! a map from each normalized char back to the original char range it
//! stands for, so matches can be reported in original offsets.

use crate::text::CharOffsets;

/// Char offsets of every occurrence of `needle`, overlapping ones included
pub fn find_all(haystack: &str, needle: &str) -> Vec<usize> {
    let mut hits = Vec::new();
    if needle.is_empty() {
        return hits;
    }
    let chars = CharOffsets::new(haystack);
    let mut from = 0;

    while let Some(pos) = haystack.get(from..).and_then(|rest| rest.find(needle)) {
        let at = from + pos;
        if let Some(offset) = chars.to_char(at) {
            hits.push(offset);
        }
        let step = haystack[at..].chars().next().map(char::len_utf8).unwrap_or(1);
        from = at + step;
    }
    hits
}

/// Text with whitespace runs collapsed to one space
#[derive(Debug, Clone, Default)]
pub struct NormalizedText {
    pub text: String,
    /// Original `[start, end)` char range per normalized char
    origin: Vec<(usize, usize)>,
}

impl NormalizedText {
    pub fn new(text: &str) -> Self {
        let mut out = String::with_capacity(text.len());
        let mut origin: Vec<(usize, usize)> = Vec::with_capacity(text.len());
        let mut in_run = false;

        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                if in_run {
                    if let Some(last) = origin.last_mut() {
                        last.1 = i + 1;
                    }
                    continue;
                }
                out.push(' ');
                in_run = true;
            } else {
                out.push(ch);
                in_run = false;
            }
            origin.push((i, i + 1));
        }

        Self { text: out, origin }
    }

    /// Length in chars
    pub fn len(&self) -> usize {
        self.origin.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origin.is_empty()
    }

    /// Original char range covered by normalized `[start, end)`
    pub fn to_original(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        if start >= end {
            return None;
        }
        Some((self.origin.get(start)?.0, self.origin.get(end - 1)?.1))
    }

    /// Normalized range overlapping original `[start, end)`
    pub fn to_normalized(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        let first = self.origin.iter().position(|&(_, e)| e > start)?;
        let last = self.origin.iter().rposition(|&(s, _)| s < end)?;
        (first <= last).then_some((first, last + 1))
    }
}

/// Candidate spans of the exact part of a context search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Located {
    /// `[start, end)` of the exact text for each hit, in document order
    pub spans: Vec<(usize, usize)>,
    /// Whether hits came from the whitespace-normalized pass
    pub normalized: bool,
}

/// Find `prefix + exact + suffix` in `text`, returning spans of `exact` only
///
/// Tries a literal search first, then retries with whitespace normalized in
/// both the text and the needle.
pub fn locate(text: &str, prefix: &str, exact: &str, suffix: &str) -> Located {
    if exact.is_empty() {
        return Located::default();
    }
    let needle = format!("{}{}{}", prefix, exact, suffix);
    let prefix_len = prefix.chars().count();
    let exact_len = exact.chars().count();

    let spans: Vec<(usize, usize)> = find_all(text, &needle)
        .into_iter()
        .map(|hit| (hit + prefix_len, hit + prefix_len + exact_len))
        .collect();
    if !spans.is_empty() {
        return Located {
            spans,
            normalized: false,
        };
    }

    let haystack = NormalizedText::new(text);
    let pattern = NormalizedText::new(&needle);
    let Some((exact_start, exact_end)) = pattern.to_normalized(prefix_len, prefix_len + exact_len) else {
        return Located::default();
    };

    let spans = find_all(&haystack.text, &pattern.text)
        .into_iter()
        .filter_map(|hit| haystack.to_original(hit + exact_start, hit + exact_end))
        .collect();
    Located {
        spans,
        normalized: true,
    }
}
