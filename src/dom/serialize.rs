//! Markup serialization

use super::node::{Document, NodeId, NodeKind};

impl Document {
    /// Serialize the whole document
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.root()) {
            write_node(self, child, &mut out);
        }
        out
    }

    /// Serialize a single node and its subtree
    pub fn node_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        write_node(self, id, &mut out);
        out
    }
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.kind(id) {
        Some(NodeKind::Document) => {
            for &child in doc.children(id) {
                write_node(doc, child, out);
            }
        }
        Some(NodeKind::Element { tag, attributes }) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(value));
                out.push('"');
            }
            let children = doc.children(id);
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for &child in children {
                write_node(doc, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        Some(NodeKind::Text(text)) => out.push_str(&html_escape::encode_text(text)),
        Some(NodeKind::Comment(text)) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        None => {}
    }
}
