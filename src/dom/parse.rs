//! XHTML import
//!
//! EPUB content documents are XHTML, so they are parsed with roxmltree and
//! copied into the mutable arena. Processing instructions are dropped;
//! whitespace-only text is preserved because it contributes to the
//! document text.

use roxmltree::NodeType;

use super::error::DomError;
use super::node::{Document, NodeId};

/// Parse a well-formed XHTML string into a `Document`
pub fn parse_xhtml(input: &str) -> Result<Document, DomError> {
    let xml = roxmltree::Document::parse(input).map_err(|e| DomError::Parse(e.to_string()))?;

    let mut doc = Document::new();
    let root = doc.root();
    for child in xml.root().children() {
        import_node(&mut doc, root, child)?;
    }

    // Import is construction, not mutation
    doc.reset_version();
    Ok(doc)
}

/// Qualified element name, unprefixed when in the default namespace
fn element_name(node: roxmltree::Node) -> String {
    let tag = node.tag_name();
    match tag.namespace() {
        Some(uri) if node.default_namespace() != Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) => format!("{}:{}", prefix, tag.name()),
            None => tag.name().to_string(),
        },
        _ => tag.name().to_string(),
    }
}

/// Qualified attribute name; attributes never use the default namespace
fn attribute_name(node: roxmltree::Node, attr: &roxmltree::Attribute) -> String {
    let Some(uri) = attr.namespace() else {
        return attr.name().to_string();
    };
    let prefix = if uri == roxmltree::NS_XML_URI {
        Some("xml")
    } else {
        node.namespaces()
            .find(|ns| ns.uri() == uri && ns.name().is_some())
            .and_then(|ns| ns.name())
    };
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, attr.name()),
        None => attr.name().to_string(),
    }
}

/// `xmlns` declarations introduced on this element (not inherited)
fn declared_namespaces<'a>(node: roxmltree::Node<'a, '_>) -> Vec<(String, &'a str)> {
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();

    node.namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .filter(|ns| !inherited.contains(&(ns.name(), ns.uri())))
        .map(|ns| {
            let name = match ns.name() {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            (name, ns.uri())
        })
        .collect()
}

fn import_node(doc: &mut Document, parent: NodeId, node: roxmltree::Node) -> Result<(), DomError> {
    match node.node_type() {
        NodeType::Element => {
            let element = doc.create_element(&element_name(node));
            for (name, uri) in declared_namespaces(node) {
                doc.set_attribute(element, &name, uri)?;
            }
            for attr in node.attributes() {
                doc.set_attribute(element, &attribute_name(node, &attr), attr.value())?;
            }
            doc.append_child(parent, element)?;
            for child in node.children() {
                import_node(doc, element, child)?;
            }
        }
        NodeType::Text => {
            if let Some(text) = node.text() {
                let text_node = doc.create_text(text);
                doc.append_child(parent, text_node)?;
            }
        }
        NodeType::Comment => {
            if let Some(text) = node.text() {
                let comment = doc.create_comment(text);
                doc.append_child(parent, comment)?;
            }
        }
        NodeType::Root | NodeType::PI => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;

    #[test]
    fn test_parse_simple_document() {
        let doc = parse_xhtml(
            r#"<html xmlns="http://www.w3.org/1999/xhtml"><body><p class="a">Hello <em>there</em></p></body></html>"#,
        )
        .unwrap();

        let p = doc.first_element_by_tag("p").unwrap();
        assert_eq!(doc.attribute(p, "class"), Some("a"));
        assert_eq!(doc.text_content(p), "Hello there");
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_parse_keeps_comments_and_whitespace() {
        let doc = parse_xhtml("<div>\n  <!-- note -->\n  <p>x</p>\n</div>").unwrap();
        let div = doc.first_element_by_tag("div").unwrap();
        let kinds: Vec<_> = doc
            .children(div)
            .iter()
            .map(|&c| doc.kind(c).cloned())
            .collect();
        assert_eq!(kinds.len(), 5);
        assert!(matches!(kinds[1], Some(NodeKind::Comment(_))));
    }

    #[test]
    fn test_namespaces_survive_roundtrip() {
        let input = r#"<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops"><body><section epub:type="chapter" xml:lang="en"><p>x</p></section></body></html>"#;
        let doc = parse_xhtml(input).unwrap();

        let section = doc.first_element_by_tag("section").unwrap();
        assert_eq!(doc.attribute(section, "epub:type"), Some("chapter"));
        assert_eq!(doc.attribute(section, "xml:lang"), Some("en"));
        assert_eq!(doc.to_markup(), input);
    }

    #[test]
    fn test_prefixed_elements_keep_prefix() {
        let input = r#"<div xmlns:m="http://www.w3.org/1998/Math/MathML"><m:math><m:mi>x</m:mi></m:math></div>"#;
        let doc = parse_xhtml(input).unwrap();
        assert!(doc.first_element_by_tag("m:math").is_some());
        assert_eq!(doc.to_markup(), input);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_xhtml("<p>unclosed"), Err(DomError::Parse(_))));
    }
}
