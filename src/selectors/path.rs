//! Structural node paths
//!
//! A path is a sequence of `(tag, index)` steps from a root, where the index
//! is 1-based among siblings with the same tag. Text nodes use the step name
//! `text()`. Paths serialize in an XPath-like form:
//!
//! ```text
//! /body[1]/div[2]/p[3]/text()[1]
//!  │       │      │    └── first text child of that paragraph
//!  │       │      └─────── third <p> among its <p> siblings
//!  │       └────────────── second <div>
//!  └────────────────────── first <body> under the root
//! ```
//!
//! The root itself is the empty path, written `/`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dom::{Document, NodeId, NodeKind};

/// Step name used for text nodes
pub const TEXT_STEP: &str = "text()";

/// Path parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("Empty path")]
    Empty,

    #[error("Path must start with '/'")]
    MissingLeadingSlash,

    #[error("Empty step name at position {0}")]
    EmptyName(usize),

    #[error("Expected '[' at position {0}")]
    ExpectedBracket(usize),

    #[error("Expected number at position {0}")]
    ExpectedNumber(usize),

    #[error("Step index must be at least 1 at position {0}")]
    ZeroIndex(usize),

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

/// One step of a node path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathStep {
    /// Element tag or `text()`
    pub name: String,
    /// 1-based index among same-name siblings
    pub index: usize,
}

impl PathStep {
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// Path from a root to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath {
    pub steps: Vec<PathStep>,
}

/// Step name of a node, if it can appear in a path
fn step_name(doc: &Document, node: NodeId) -> Option<&str> {
    match doc.kind(node)? {
        NodeKind::Element { tag, .. } => Some(tag.as_str()),
        NodeKind::Text(_) => Some(TEXT_STEP),
        NodeKind::Comment(_) | NodeKind::Document => None,
    }
}

impl NodePath {
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Path from `root` to `node`; `None` if `node` is not under `root`
    pub fn from_node(doc: &Document, root: NodeId, node: NodeId) -> Option<Self> {
        let mut steps = Vec::new();
        let mut current = node;

        while current != root {
            let parent = doc.parent(current)?;
            let name = step_name(doc, current)?;
            let index = 1 + doc
                .children(parent)
                .iter()
                .take_while(|&&sibling| sibling != current)
                .filter(|&&sibling| step_name(doc, sibling) == Some(name))
                .count();
            steps.push(PathStep::new(name, index));
            current = parent;
        }

        steps.reverse();
        Some(Self { steps })
    }

    /// Follow the path from `root`; `None` if any step is missing
    pub fn resolve(&self, doc: &Document, root: NodeId) -> Option<NodeId> {
        let mut current = root;
        for step in &self.steps {
            if step.index == 0 {
                return None;
            }
            current = doc
                .children(current)
                .iter()
                .copied()
                .filter(|&child| step_name(doc, child) == Some(step.name.as_str()))
                .nth(step.index - 1)?;
        }
        Some(current)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "/");
        }
        for step in &self.steps {
            write!(f, "/{}[{}]", step.name, step.index)?;
        }
        Ok(())
    }
}

/// Parser state
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn parse_name(&mut self) -> Result<String, PathParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '[' || ch == '/' {
                break;
            }
            self.advance();
        }
        if self.pos == start {
            return Err(PathParseError::EmptyName(start));
        }
        Ok(self.input[start..self.pos].to_ascii_lowercase())
    }

    fn parse_index(&mut self) -> Result<usize, PathParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        let index: usize = self.input[start..self.pos]
            .parse()
            .map_err(|_| PathParseError::ExpectedNumber(start))?;
        if index == 0 {
            return Err(PathParseError::ZeroIndex(start));
        }
        Ok(index)
    }

    fn parse_step(&mut self) -> Result<PathStep, PathParseError> {
        let name = self.parse_name()?;
        if !self.skip_if('[') {
            return Err(PathParseError::ExpectedBracket(self.pos));
        }
        let index = self.parse_index()?;
        if !self.skip_if(']') {
            return Err(PathParseError::UnexpectedChar(
                self.peek().unwrap_or('\0'),
                self.pos,
            ));
        }
        Ok(PathStep { name, index })
    }

    fn parse_path(&mut self) -> Result<NodePath, PathParseError> {
        if !self.skip_if('/') {
            return Err(PathParseError::MissingLeadingSlash);
        }
        let mut steps = Vec::new();
        if self.at_end() {
            return Ok(NodePath { steps });
        }
        loop {
            steps.push(self.parse_step()?);
            if self.at_end() {
                break;
            }
            if !self.skip_if('/') {
                return Err(PathParseError::UnexpectedChar(
                    self.peek().unwrap_or('\0'),
                    self.pos,
                ));
            }
        }
        Ok(NodePath { steps })
    }
}

impl FromStr for NodePath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(PathParseError::Empty);
        }
        Parser::new(input).parse_path()
    }
}

impl TryFrom<String> for NodePath {
    type Error = PathParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::parse("<body><p>a</p><div><p>b</p><p>c<i>d</i>e</p></div></body>").unwrap()
    }

    #[test]
    fn test_path_from_node() {
        let doc = doc();
        let i = doc.first_element_by_tag("i").unwrap();
        let e = doc.children(doc.parent(i).unwrap())[2];

        let path = NodePath::from_node(&doc, doc.root(), e).unwrap();
        assert_eq!(path.to_string(), "/body[1]/div[1]/p[2]/text()[2]");
        assert_eq!(path.resolve(&doc, doc.root()), Some(e));
    }

    #[test]
    fn test_path_relative_to_subtree_root() {
        let doc = doc();
        let div = doc.first_element_by_tag("div").unwrap();
        let first_p = doc.elements_by_tag("p")[0];

        assert!(NodePath::from_node(&doc, div, first_p).is_none());
        let root_path = NodePath::from_node(&doc, div, div).unwrap();
        assert!(root_path.is_empty());
        assert_eq!(root_path.to_string(), "/");
    }

    #[test]
    fn test_missing_step_fails() {
        let doc = doc();
        let path: NodePath = "/body[1]/div[1]/p[5]".parse().unwrap();
        assert_eq!(path.resolve(&doc, doc.root()), None);
    }

    #[test]
    fn test_parse_roundtrip() {
        let original = "/body[1]/div[2]/p[3]/text()[1]";
        let path: NodePath = original.parse().unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.steps[3], PathStep::new(TEXT_STEP, 1));
        assert_eq!(path.to_string(), original);
        assert_eq!("/".parse::<NodePath>().unwrap(), NodePath::default());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<NodePath>(), Err(PathParseError::Empty));
        assert_eq!("p[1]".parse::<NodePath>(), Err(PathParseError::MissingLeadingSlash));
        assert_eq!("/p".parse::<NodePath>(), Err(PathParseError::ExpectedBracket(2)));
        assert_eq!("/p[0]".parse::<NodePath>(), Err(PathParseError::ZeroIndex(3)));
        assert_eq!("/p[x]".parse::<NodePath>(), Err(PathParseError::ExpectedNumber(3)));
    }

    #[test]
    fn test_serde_as_string() {
        let path: NodePath = "/p[2]".parse().unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/p[2]\"");
        let parsed: NodePath = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }
}
