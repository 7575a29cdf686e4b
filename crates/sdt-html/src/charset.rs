//! Charset detection and decoding of fetched markup.

use crate::tokenizer::Token;
use crate::tokenizer::tokenize;
use encoding_rs::Encoding;
use encoding_rs::UTF_8;

/// Only the start of a document is searched for a `<meta>` declaration.
const META_SNIFF_BYTES: usize = 1024;

/// Decodes a response body. A byte-order mark wins, then a `<meta>`
/// declaration (HTML only), then the `Content-Type` charset, then UTF-8.
pub fn decode_text_response(body: &[u8], content_type: &str) -> String {
    let (text, _, _) = sniff_encoding(body, content_type).decode(body);
    text.into_owned()
}

fn sniff_encoding(body: &[u8], content_type: &str) -> &'static Encoding {
    let media_type = content_type.split(';').next().unwrap_or_default().trim();
    let is_html = media_type.eq_ignore_ascii_case("text/html")
        || media_type.eq_ignore_ascii_case("application/xhtml+xml");

    is_html
        .then(|| parse_charset_from_html_prefix(body))
        .flatten()
        .or_else(|| parse_charset_from_content_type(content_type))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8)
}

pub fn parse_charset_from_content_type(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches(['"', '\'']).to_owned())
        .filter(|label| !label.is_empty())
}

/// Finds `<meta charset>` or a `Content-Type` pragma near the top of a page.
pub fn parse_charset_from_html_prefix(body: &[u8]) -> Option<String> {
    let prefix = String::from_utf8_lossy(&body[..body.len().min(META_SNIFF_BYTES)]);
    tokenize(&prefix).into_iter().find_map(|token| match token {
        Token::Start { name, attrs, .. } if name == "meta" => meta_charset(&attrs),
        _ => None,
    })
}

fn meta_charset(attrs: &[(String, String)]) -> Option<String> {
    let attr = |key: &str| {
        attrs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.trim())
    };

    if let Some(label) = attr("charset").filter(|label| !label.is_empty()) {
        return Some(label.to_owned());
    }
    let is_pragma = attr("http-equiv").is_some_and(|value| value.eq_ignore_ascii_case("content-type"));
    if !is_pragma {
        return None;
    }
    attr("content").and_then(parse_charset_from_content_type)
}
