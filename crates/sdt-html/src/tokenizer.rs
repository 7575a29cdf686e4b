//! Markup tokenizer over a string cursor.
//!
//! Lenient in the way the site's own pages need: comments, doctypes and
//! processing instructions are dropped, a `<` that opens nothing is text, and
//! the bodies of raw-text elements come back as a single text token.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Start {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text(String),
}

const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '\u{a9}'),
    ("middot", '\u{b7}'),
    ("times", '\u{d7}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("hellip", '\u{2026}'),
    ("rsaquo", '\u{203a}'),
    ("larr", '\u{2190}'),
    ("uarr", '\u{2191}'),
    ("rarr", '\u{2192}'),
    ("darr", '\u{2193}'),
    ("crarr", '\u{21b5}'),
];

pub(crate) fn tokenize(source: &str) -> Vec<Token> {
    let mut scanner = Scanner { source, pos: 0 };
    let mut tokens = Vec::new();
    while !scanner.at_end() {
        scanner.next_token(&mut tokens);
    }
    tokens
}

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// Replaces the named and numeric character references the site uses.
/// Anything unrecognised is kept literally.
pub(crate) fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest[1..]
            .find(';')
            .and_then(|semi| Some((entity_char(&rest[1..=semi])?, semi + 2)));
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity_char(name: &str) -> Option<char> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => code.parse().ok()?,
        };
        return char::from_u32(value);
    }
    NAMED_ENTITIES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|(_, ch)| *ch)
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':')
}

// Attribute names carry framework punctuation such as `@click` or `x-on:input.debounce`.
fn is_attr_name_char(ch: char) -> bool {
    is_name_char(ch) || matches!(ch, '@' | '.')
}

struct Scanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.source.len());
    }

    fn skip_past(&mut self, terminator: &str) {
        match self.rest().find(terminator) {
            Some(offset) => self.bump(offset + terminator.len()),
            None => self.pos = self.source.len(),
        }
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.source.len() - trimmed.len();
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let end = rest.find(|ch: char| !accept(ch)).unwrap_or(rest.len());
        self.pos += end;
        &rest[..end]
    }

    fn next_token(&mut self, tokens: &mut Vec<Token>) {
        let rest = self.rest();
        if rest.starts_with("<!--") {
            self.skip_past("-->");
            return;
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            self.skip_past(">");
            return;
        }

        let mark = self.pos;
        if rest.starts_with("</") {
            if let Some(name) = self.end_tag() {
                tokens.push(Token::End { name });
                return;
            }
        } else if rest.starts_with('<') {
            if let Some(token) = self.start_tag() {
                let raw_text = match &token {
                    Token::Start {
                        name,
                        self_closing: false,
                        ..
                    } if RAW_TEXT_TAGS.contains(&name.as_str()) => Some(name.clone()),
                    _ => None,
                };
                tokens.push(token);
                if let Some(tag) = raw_text {
                    self.raw_text(&tag, tokens);
                }
                return;
            }
        }
        self.pos = mark;
        self.text(tokens);
    }

    /// Text up to the next `<`. A leading `<` that opened nothing is part of it.
    fn text(&mut self, tokens: &mut Vec<Token>) {
        let rest = self.rest();
        let skip = usize::from(rest.starts_with('<'));
        let end = rest[skip..].find('<').map_or(rest.len(), |offset| offset + skip);
        self.bump(end);
        if end > 0 {
            tokens.push(Token::Text(rest[..end].to_owned()));
        }
    }

    fn end_tag(&mut self) -> Option<String> {
        self.bump(2);
        self.skip_whitespace();
        let name = self.take_while(is_name_char);
        if name.is_empty() {
            return None;
        }
        let name = name.to_ascii_lowercase();
        let close = self.rest().find('>')?;
        self.bump(close + 1);
        Some(name)
    }

    fn start_tag(&mut self) -> Option<Token> {
        self.bump(1);
        let name = self.take_while(is_name_char);
        if name.is_empty() {
            return None;
        }
        let name = name.to_ascii_lowercase();
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.peek()? {
                '>' => {
                    self.bump(1);
                    break;
                }
                '/' => {
                    self_closing = true;
                    self.bump(1);
                    continue;
                }
                _ => {}
            }

            let attr_name = self.take_while(is_attr_name_char);
            if attr_name.is_empty() {
                self.skip_past(">");
                break;
            }
            let attr_name = attr_name.to_ascii_lowercase();
            self.skip_whitespace();
            let value = if self.peek() == Some('=') {
                self.bump(1);
                self.skip_whitespace();
                self.attr_value()
            } else {
                ""
            };
            attrs.push((attr_name, decode_entities(value)));
        }

        Some(Token::Start {
            name,
            attrs,
            self_closing,
        })
    }

    fn attr_value(&mut self) -> &'a str {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump(1);
                let rest = self.rest();
                let end = rest.find(quote).unwrap_or(rest.len());
                self.bump(end + 1);
                &rest[..end]
            }
            _ => self.take_while(|ch| !ch.is_ascii_whitespace() && ch != '>'),
        }
    }

    /// Everything up to the matching end tag is one text token; an unclosed
    /// raw-text element runs to the end of input.
    fn raw_text(&mut self, tag: &str, tokens: &mut Vec<Token>) {
        let rest = self.rest();
        let (body, consumed) = match find_closing_tag(rest, tag) {
            Some((start, end)) => (&rest[..start], end),
            None => (rest, rest.len()),
        };
        if !body.is_empty() {
            tokens.push(Token::Text(body.to_owned()));
        }
        tokens.push(Token::End { name: tag.to_owned() });
        self.bump(consumed);
    }
}

/// Byte range of the first `</tag>` in `haystack`, matching the name in any case.
fn find_closing_tag(haystack: &str, tag: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(offset) = haystack[from..].find("</") {
        let start = from + offset;
        let after = &haystack[start + 2..];
        let named = after
            .get(..tag.len())
            .is_some_and(|name| name.eq_ignore_ascii_case(tag));
        if named {
            let tail = after[tag.len()..].trim_start();
            if tail.starts_with('>') {
                return Some((start, haystack.len() - tail.len() + 1));
            }
        }
        from = start + 2;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::Token;
    use super::decode_entities;
    use super::tokenize;

    fn text_of(tokens: &[Token]) -> String {
        tokens
            .iter()
            .filter_map(|token| match token {
                Token::Text(value) => Some(value.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn script_body_is_single_text_token() {
        let tokens = tokenize("<script>if (a < b) { x(); }</SCRIPT >");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], Token::Text("if (a < b) { x(); }".to_owned()));
        assert_eq!(tokens[2], Token::End { name: "script".to_owned() });
    }

    #[test]
    fn unclosed_raw_text_runs_to_the_end() {
        let tokens = tokenize("<style>body { color: red }");
        assert_eq!(tokens.len(), 3);
        assert_eq!(text_of(&tokens), "body { color: red }");
    }

    #[test]
    fn attributes_keep_order_and_decode_entities() {
        let tokens = tokenize("<a href=\"/x?a=1&amp;b=2\" class=nav data-x @click='go()'>");
        let Some(Token::Start { name, attrs, .. }) = tokens.first() else {
            panic!("expected start tag");
        };
        assert_eq!(name, "a");
        assert_eq!(
            attrs,
            &vec![
                ("href".to_owned(), "/x?a=1&b=2".to_owned()),
                ("class".to_owned(), "nav".to_owned()),
                ("data-x".to_owned(), String::new()),
                ("@click".to_owned(), "go()".to_owned()),
            ]
        );
    }

    #[test]
    fn self_closing_marker_is_recorded() {
        let tokens = tokenize("<i data-lucide=\"sun\" />");
        assert!(matches!(
            tokens.first(),
            Some(Token::Start {
                self_closing: true,
                ..
            })
        ));
    }

    #[test]
    fn comments_and_doctype_are_skipped() {
        let tokens = tokenize("<!DOCTYPE html><!-- <p>not</p> --><p>hi</p>");
        assert_eq!(tokens.len(), 3);
        assert_eq!(text_of(&tokens), "hi");
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        assert_eq!(text_of(&tokenize("a < b")), "a < b");
        assert_eq!(text_of(&tokenize("1 </ 2")), "1 </ 2");
    }

    #[test]
    fn named_and_numeric_entities_decode() {
        assert_eq!(
            decode_entities("&#169; &#x2192; &rsaquo; &bogus; a & b"),
            "\u{a9} \u{2192} \u{203a} &bogus; a & b"
        );
    }
}
