//! Selector types following the W3C Web Annotation selector vocabulary
//!
//! A target carries up to three redundant descriptors of the same span so
//! that anchoring can fall back from one to the next.
//!
//! Reference: <https://www.w3.org/TR/annotation-model/#selectors>

use serde::{Deserialize, Serialize};

use super::path::NodePath;

/// Start/end node paths plus local character offsets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralSelector {
    pub start_container: NodePath,
    pub start_offset: usize,
    pub end_container: NodePath,
    pub end_offset: usize,
}

/// Global character offsets into the document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSelector {
    pub start: usize,
    pub end: usize,
}

/// Exact text with surrounding context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSelector {
    /// The exact text that was selected
    pub exact: String,
    /// Text before the selection (for context)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    /// Text after the selection (for context)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl QuoteSelector {
    pub fn new(exact: &str, prefix: Option<&str>, suffix: Option<&str>) -> Self {
        Self {
            exact: exact.to_string(),
            prefix: prefix.filter(|p| !p.is_empty()).map(str::to_string),
            suffix: suffix.filter(|s| !s.is_empty()).map(str::to_string),
        }
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or_default()
    }

    pub fn suffix(&self) -> &str {
        self.suffix.as_deref().unwrap_or_default()
    }

    /// Whether there is any context around the exact text
    pub fn has_context(&self) -> bool {
        !self.prefix().is_empty() || !self.suffix().is_empty()
    }
}

/// A single selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Selector {
    /// Structural path range
    #[serde(rename = "RangeSelector")]
    Range(StructuralSelector),
    /// Character position within the document text
    #[serde(rename = "TextPositionSelector")]
    TextPosition(PositionSelector),
    /// Text quote with context
    #[serde(rename = "TextQuoteSelector")]
    TextQuote(QuoteSelector),
}

/// What an annotation points at: a source document plus its selectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Source document or content block the selectors are scoped to
    pub source: String,
    /// Multiple selectors for robust anchoring
    pub selectors: Vec<Selector>,
}

impl Target {
    /// Target with no selectors yet
    pub fn empty(source: &str) -> Self {
        Self {
            source: source.to_string(),
            selectors: Vec::new(),
        }
    }

    pub fn with_selectors(source: &str, selectors: Vec<Selector>) -> Self {
        Self {
            source: source.to_string(),
            selectors,
        }
    }

    /// A target needs at least one selector to be anchorable
    pub fn is_anchorable(&self) -> bool {
        !self.selectors.is_empty()
    }

    pub fn structural(&self) -> Option<&StructuralSelector> {
        self.selectors.iter().find_map(|s| match s {
            Selector::Range(range) => Some(range),
            _ => None,
        })
    }

    pub fn position(&self) -> Option<&PositionSelector> {
        self.selectors.iter().find_map(|s| match s {
            Selector::TextPosition(position) => Some(position),
            _ => None,
        })
    }

    pub fn quote(&self) -> Option<&QuoteSelector> {
        self.selectors.iter().find_map(|s| match s {
            Selector::TextQuote(quote) => Some(quote),
            _ => None,
        })
    }

    /// The exact quoted text, if any
    pub fn text_quote(&self) -> Option<&str> {
        self.quote().map(|q| q.exact.as_str())
    }

    /// Add a structural range selector
    pub fn add_range(&mut self, selector: StructuralSelector) {
        self.selectors.push(Selector::Range(selector));
    }

    /// Add a text position selector
    pub fn add_text_position(&mut self, start: usize, end: usize) {
        self.selectors
            .push(Selector::TextPosition(PositionSelector { start, end }));
    }

    /// Add a text quote selector
    pub fn add_text_quote(&mut self, exact: &str, prefix: Option<&str>, suffix: Option<&str>) {
        self.selectors
            .push(Selector::TextQuote(QuoteSelector::new(exact, prefix, suffix)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_selector_target() {
        let mut target = Target::empty("chapter1.xhtml");
        assert!(!target.is_anchorable());

        target.add_text_position(10, 19);
        target.add_text_quote("brown fox", Some("The quick "), Some(""));

        assert!(target.is_anchorable());
        assert_eq!(target.selectors.len(), 2);
        assert!(target.structural().is_none());
        assert_eq!(target.position(), Some(&PositionSelector { start: 10, end: 19 }));
        let quote = target.quote().unwrap();
        assert_eq!(quote.prefix(), "The quick ");
        assert_eq!(quote.suffix, None);
    }

    #[test]
    fn test_serialization() {
        let mut target = Target::empty("chapter1.xhtml");
        target.add_range(StructuralSelector {
            start_container: "/p[1]/text()[1]".parse().unwrap(),
            start_offset: 4,
            end_container: "/p[1]/text()[1]".parse().unwrap(),
            end_offset: 9,
        });
        target.add_text_quote("hello", Some("say "), None);

        let json = serde_json::to_string_pretty(&target).unwrap();
        assert!(json.contains("\"type\": \"RangeSelector\""));
        assert!(json.contains("\"startContainer\": \"/p[1]/text()[1]\""));
        assert!(json.contains("TextQuoteSelector"));
        assert!(!json.contains("suffix"));

        let parsed: Target = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, target);
    }

    #[test]
    fn test_invalid_path_rejected_on_deserialize() {
        let json = r#"{"source":"a","selectors":[{"type":"RangeSelector","startContainer":"p","startOffset":0,"endContainer":"/p[1]","endOffset":1}]}"#;
        assert!(serde_json::from_str::<Target>(json).is_err());
    }
}
