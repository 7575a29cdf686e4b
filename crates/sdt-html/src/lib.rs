//! HTML tokenization and tree building for the shell document model.

mod charset;
#[cfg(test)]
mod serialize;
mod tokenizer;

use sdt_dom::Document;
use sdt_dom::ElementData;
use sdt_dom::NodeId;
use tokenizer::Token;

pub use charset::decode_text_response;
pub use charset::parse_charset_from_content_type;
pub use charset::parse_charset_from_html_prefix;

/// Parses raw HTML into a DOM document.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Parses a full page. The result always has an `html > head + body` skeleton.
    pub fn parse(&self, input: &str) -> Document {
        let mut document = Document::empty();
        let root = document.root();
        build_into(&mut document, root, tokenizer::tokenize(input));
        document.ensure_page_skeleton();
        document
    }

    /// Parses a fragment into detached nodes owned by `document`, in source order.
    pub fn parse_fragment(&self, document: &mut Document, markup: &str) -> Vec<NodeId> {
        let container = document.create_element("template");
        build_into(document, container, tokenizer::tokenize(markup));
        let nodes = document.children(container).to_vec();
        document.clear_children(container);
        nodes
    }
}

fn build_into(document: &mut Document, container: NodeId, tokens: Vec<Token>) {
    let mut stack = vec![container];

    for token in tokens {
        let current = stack.last().copied().unwrap_or(container);
        match token {
            Token::Text(text) => {
                let raw = document.is_element(current, "script") || document.is_element(current, "style");
                let value = if raw {
                    text
                } else {
                    tokenizer::decode_entities(&text)
                };
                let node = document.create_text(&value);
                // `current` is always an element or the container; insertion cannot fail.
                let _ = document.append_child(current, node);
            }
            Token::Start {
                name,
                attrs,
                self_closing,
            } => {
                let node = document.create_element_from(ElementData {
                    tag: name.clone(),
                    attrs,
                });
                let _ = document.append_child(current, node);
                if !self_closing && !tokenizer::is_void(&name) {
                    stack.push(node);
                }
            }
            Token::End { name } => {
                // Stray end tags that match nothing open are dropped.
                let Some(position) = stack
                    .iter()
                    .skip(1)
                    .rposition(|open| document.is_element(*open, &name))
                else {
                    continue;
                };
                stack.truncate(position + 1);
            }
        }
    }
}
