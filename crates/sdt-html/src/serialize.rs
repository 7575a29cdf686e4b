//! Markup serialization used by the parser tests.

use crate::tokenizer::is_void;
use sdt_dom::Document;
use sdt_dom::NodeData;
use sdt_dom::NodeId;

/// Serializes the node and its subtree.
pub(crate) fn outer_html(document: &Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(document, node, &mut out);
    out
}

/// Serializes only the children of the node.
pub(crate) fn inner_html(document: &Document, node: NodeId) -> String {
    let mut out = String::new();
    for child in document.children(node) {
        write_node(document, *child, &mut out);
    }
    out
}

fn write_node(document: &Document, node: NodeId, out: &mut String) {
    match document.data(node) {
        None => {}
        Some(NodeData::Document) => {
            for child in document.children(node) {
                write_node(document, *child, out);
            }
        }
        Some(NodeData::Text(text)) => {
            let raw = document
                .parent(node)
                .and_then(|parent| document.tag_name(parent))
                .is_some_and(|tag| matches!(tag, "script" | "style"));
            if raw {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        Some(NodeData::Element(element)) => {
            out.push('<');
            out.push_str(&element.tag);
            for (name, value) in &element.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attribute(value));
                out.push('"');
            }
            out.push('>');
            if is_void(&element.tag) {
                return;
            }
            for child in document.children(node) {
                write_node(document, *child, out);
            }
            out.push_str("</");
            out.push_str(&element.tag);
            out.push('>');
        }
    }
}

fn escape_text(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(input: &str) -> String {
    input.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::outer_html;
    use crate::HtmlParser;

    #[test]
    fn void_elements_have_no_end_tag() {
        let parser = HtmlParser;
        let doc = parser.parse("<body><img src=\"logo.png\" alt=\"a&quot;b\"><br/></body>");
        let body = doc.body().unwrap_or_default();
        assert_eq!(
            outer_html(&doc, body),
            "<body><img src=\"logo.png\" alt=\"a&quot;b\"><br></body>"
        );
    }

    #[test]
    fn text_is_escaped() {
        let parser = HtmlParser;
        let doc = parser.parse("<p>1 &lt; 2</p>");
        let paragraph = doc.first_element_by_tag(doc.root(), "p").unwrap_or_default();
        assert_eq!(outer_html(&doc, paragraph), "<p>1 &lt; 2</p>");
    }
}
