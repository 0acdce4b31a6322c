//! `<img ...>` span tokenizer and serializer
//!
//! Deliberately not an HTML parser: host documents are frequently
//! non-well-formed and a DOM round-trip cannot be trusted to leave
//! unrelated markup byte-for-byte intact. This tokenizer only ever
//! looks at the span between `<img` and its closing `>`, honoring
//! quoted attribute values so a `>` inside `alt="a > b"` does not end
//! the tag.
//!
//! Attribute order, quote style, boolean attributes and a self-closing
//! slash survive re-serialization; values set by the rewriter are
//! escaped and double-quoted.

/// Quote style an attribute value was written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueForm {
    /// `name="value"`
    Double,
    /// `name='value'`
    Single,
    /// `name=value`
    Bare,
    /// `name` with no value (boolean attribute)
    Empty,
}

#[derive(Debug, Clone)]
struct Attribute {
    /// Original-case name; lookups are case-insensitive
    name: String,
    /// Raw value text as it appeared in the source (entities untouched),
    /// or pre-escaped text for values set by the rewriter
    value: String,
    form: ValueForm,
}

/// One parsed `<img>` tag: ordered attributes plus tag-level syntax
#[derive(Debug, Clone)]
pub struct ImgTag {
    attrs: Vec<Attribute>,
    self_closing: bool,
}

/// Find the next `<img` tag opener at or after `from`
///
/// Matches case-insensitively and requires the name to end there
/// (whitespace, `/` or `>` follows), so `<imgx>` is not a hit.
pub fn find_img_start(html: &str, from: usize) -> Option<usize> {
    let bytes = html.as_bytes();
    let mut pos = from;

    while pos + 4 <= bytes.len() {
        if bytes[pos] == b'<' && bytes[pos + 1..pos + 4].eq_ignore_ascii_case(b"img") {
            let boundary = bytes.get(pos + 4);
            match boundary {
                None => return Some(pos),
                Some(b) if b.is_ascii_whitespace() || *b == b'/' || *b == b'>' => {
                    return Some(pos);
                }
                _ => {}
            }
        }
        pos += 1;
    }

    None
}

impl ImgTag {
    /// Tokenize the tag starting at `start` (which must point at a
    /// `<img` opener found by [`find_img_start`])
    ///
    /// Returns the parsed tag and the offset one past the closing `>`.
    /// `None` means the span is malformed (unclosed quote or missing
    /// `>`); the caller leaves the original text untouched.
    pub fn parse_at(html: &str, start: usize) -> Option<(ImgTag, usize)> {
        let bytes = html.as_bytes();
        let mut pos = start + 4; // past "<img"
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos >= bytes.len() {
                return None; // ran off the document without a '>'
            }

            match bytes[pos] {
                b'>' => {
                    pos += 1;
                    break;
                }
                b'/' if bytes.get(pos + 1) == Some(&b'>') => {
                    self_closing = true;
                    pos += 2;
                    break;
                }
                // Stray '/' or '=' between attributes: skip to keep scanning
                b'/' | b'=' => {
                    pos += 1;
                    continue;
                }
                _ => {}
            }

            // Attribute name
            let name_start = pos;
            while pos < bytes.len() {
                let b = bytes[pos];
                if b.is_ascii_whitespace() || b == b'=' || b == b'>' || b == b'/' {
                    break;
                }
                pos += 1;
            }
            let name = html[name_start..pos].to_string();

            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            if pos < bytes.len() && bytes[pos] == b'=' {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                    pos += 1;
                }
                if pos >= bytes.len() {
                    return None;
                }

                let (value, form) = match bytes[pos] {
                    quote @ (b'"' | b'\'') => {
                        let value_start = pos + 1;
                        let mut end = value_start;
                        while end < bytes.len() && bytes[end] != quote {
                            end += 1;
                        }
                        if end >= bytes.len() {
                            return None; // unclosed quote
                        }
                        pos = end + 1;
                        let form = if quote == b'"' {
                            ValueForm::Double
                        } else {
                            ValueForm::Single
                        };
                        (html[value_start..end].to_string(), form)
                    }
                    _ => {
                        let value_start = pos;
                        while pos < bytes.len()
                            && !bytes[pos].is_ascii_whitespace()
                            && bytes[pos] != b'>'
                        {
                            pos += 1;
                        }
                        (html[value_start..pos].to_string(), ValueForm::Bare)
                    }
                };

                attrs.push(Attribute { name, value, form });
            } else {
                attrs.push(Attribute {
                    name,
                    value: String::new(),
                    form: ValueForm::Empty,
                });
            }
        }

        Some((ImgTag { attrs, self_closing }, pos))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.attrs
            .iter()
            .position(|attr| attr.name.eq_ignore_ascii_case(name))
    }

    /// Raw value of an attribute (empty string for boolean attributes)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.attrs[idx].value.as_str())
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set an attribute value, escaping it for HTML embedding
    ///
    /// An existing attribute keeps its position; a new one is appended.
    /// Either way the value is re-emitted double-quoted.
    pub fn set(&mut self, name: &str, value: &str) {
        let escaped = escape_attribute(value);
        match self.position(name) {
            Some(idx) => {
                self.attrs[idx].value = escaped;
                self.attrs[idx].form = ValueForm::Double;
            }
            None => self.attrs.push(Attribute {
                name: name.to_string(),
                value: escaped,
                form: ValueForm::Double,
            }),
        }
    }

    /// Serialize back to markup, preserving attribute order
    pub fn to_html(&self) -> String {
        let mut out = String::from("<img");

        for attr in &self.attrs {
            out.push(' ');
            out.push_str(&attr.name);
            match attr.form {
                ValueForm::Empty => {}
                ValueForm::Double => {
                    out.push_str("=\"");
                    out.push_str(&attr.value);
                    out.push('"');
                }
                ValueForm::Single => {
                    out.push_str("='");
                    out.push_str(&attr.value);
                    out.push('\'');
                }
                ValueForm::Bare => {
                    if attr.value.is_empty() {
                        out.push_str("=\"\"");
                    } else {
                        out.push('=');
                        out.push_str(&attr.value);
                    }
                }
            }
        }

        if self.self_closing {
            out.push_str(" />");
        } else {
            out.push('>');
        }

        out
    }
}

/// Escape a string for embedding in a double-quoted HTML attribute
pub(crate) fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> (ImgTag, usize) {
        let start = find_img_start(html, 0).expect("no <img found");
        ImgTag::parse_at(html, start).expect("tag did not parse")
    }

    #[test]
    fn test_find_img_start_case_insensitive() {
        assert_eq!(find_img_start("<p><IMG src=a>", 0), Some(3));
        assert_eq!(find_img_start("<imgx>", 0), None);
        assert_eq!(find_img_start("no images here", 0), None);
    }

    #[test]
    fn test_find_img_start_respects_from_offset() {
        let html = "<img src=a> <img src=b>";
        assert_eq!(find_img_start(html, 1), Some(12));
    }

    #[test]
    fn test_parse_three_value_forms() {
        let (tag, _) = parse(r#"<img src="a.jpg" alt='an image' width=400>"#);
        assert_eq!(tag.get("src"), Some("a.jpg"));
        assert_eq!(tag.get("alt"), Some("an image"));
        assert_eq!(tag.get("width"), Some("400"));
    }

    #[test]
    fn test_parse_boolean_attribute() {
        let (tag, _) = parse("<img src=\"a.jpg\" ismap>");
        assert!(tag.has("ismap"));
        assert_eq!(tag.get("ismap"), Some(""));
    }

    #[test]
    fn test_parse_tolerates_gt_inside_quotes() {
        let html = r#"<img alt="a > b" src="x.png"> tail"#;
        let (tag, end) = parse(html);
        assert_eq!(tag.get("alt"), Some("a > b"));
        assert_eq!(&html[end..], " tail");
    }

    #[test]
    fn test_parse_self_closing() {
        let (tag, end) = parse("<img src=\"a.jpg\"/>");
        assert!(tag.get("src").is_some());
        assert_eq!(end, 18);
        assert!(tag.to_html().ends_with("/>"));
    }

    #[test]
    fn test_parse_unclosed_tag_is_rejected() {
        let html = "<img src=\"a.jpg\"";
        let start = find_img_start(html, 0).unwrap();
        assert!(ImgTag::parse_at(html, start).is_none());
    }

    #[test]
    fn test_parse_unclosed_quote_is_rejected() {
        let html = "<img src=\"a.jpg>";
        let start = find_img_start(html, 0).unwrap();
        assert!(ImgTag::parse_at(html, start).is_none());
    }

    #[test]
    fn test_case_insensitive_lookup_preserves_original_case() {
        let (mut tag, _) = parse("<img SRC=\"a.jpg\">");
        assert_eq!(tag.get("src"), Some("a.jpg"));
        tag.set("src", "b.jpg");
        assert_eq!(tag.to_html(), "<img SRC=\"b.jpg\">");
    }

    #[test]
    fn test_serialize_preserves_order_and_quote_styles() {
        let input = r#"<img data-foo="bar" src='a.jpg' width=400 hidden>"#;
        let (tag, _) = parse(input);
        assert_eq!(
            tag.to_html(),
            r#"<img data-foo="bar" src='a.jpg' width=400 hidden>"#
        );
    }

    #[test]
    fn test_serialize_keeps_raw_entities_untouched() {
        let (tag, _) = parse(r#"<img src="/a.jpg?x=1&amp;y=2">"#);
        assert_eq!(tag.to_html(), r#"<img src="/a.jpg?x=1&amp;y=2">"#);
    }

    #[test]
    fn test_set_appends_new_attributes_in_call_order() {
        let (mut tag, _) = parse("<img src=\"a.jpg\">");
        tag.set("srcset", "u 320w");
        tag.set("loading", "lazy");
        assert_eq!(
            tag.to_html(),
            "<img src=\"a.jpg\" srcset=\"u 320w\" loading=\"lazy\">"
        );
    }

    #[test]
    fn test_set_escapes_value() {
        let (mut tag, _) = parse("<img src=\"a.jpg\">");
        tag.set("src", "https://p.test/x?a=1&b=\"2\"");
        assert_eq!(
            tag.to_html(),
            "<img src=\"https://p.test/x?a=1&amp;b=&quot;2&quot;\">"
        );
    }

    #[test]
    fn test_parse_stray_slash_between_attributes() {
        let (tag, _) = parse("<img src=a.jpg / width=10>");
        assert_eq!(tag.get("src"), Some("a.jpg"));
        assert_eq!(tag.get("width"), Some("10"));
    }

    #[test]
    fn test_escape_attribute() {
        assert_eq!(escape_attribute("a&b<c>\"d\""), "a&amp;b&lt;c&gt;&quot;d&quot;");
        assert_eq!(escape_attribute("plain"), "plain");
    }
}
