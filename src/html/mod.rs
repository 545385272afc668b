//! HTML post-processing of composed pages: tokenizing, navigation state, bundle reference
//! rewriting and pretty printing.

pub mod nav;
pub mod pretty;
pub mod replace;
pub mod tokenizer;

use std::ops::Range;

pub use tokenizer::{tokenize, Attr, Token, TokenKind};

pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Serialize a start tag, keeping each attribute's original quoting.
pub fn render_start_tag(name: &str, attrs: &[Attr], self_closing: bool) -> String {
    let mut out = format!("<{name}");
    for attr in attrs {
        out.push(' ');
        out.push_str(&attr.name);
        if let Some(value) = &attr.value {
            match attr.quote {
                Some(q) => {
                    out.push('=');
                    out.push(q);
                    out.push_str(value);
                    out.push(q);
                }
                None => {
                    out.push('=');
                    out.push_str(value);
                }
            }
        }
    }
    out.push_str(if self_closing { " />" } else { ">" });
    out
}

/// Rewrite the class list of a start tag. Returns `None` for anything else.
pub fn edit_classes(token: &Token, edit: impl FnOnce(&mut Vec<String>)) -> Option<String> {
    let TokenKind::StartTag {
        name,
        attrs,
        self_closing,
    } = &token.kind
    else {
        return None;
    };
    let mut attrs = attrs.clone();
    let index = match attrs.iter().position(|a| a.name.eq_ignore_ascii_case("class")) {
        Some(index) => index,
        None => {
            attrs.push(Attr {
                name: "class".into(),
                value: Some(String::new()),
                quote: Some('"'),
            });
            attrs.len() - 1
        }
    };
    let mut classes: Vec<String> = attrs[index]
        .value
        .as_deref()
        .unwrap_or("")
        .split_whitespace()
        .map(String::from)
        .collect();
    edit(&mut classes);
    if classes.is_empty() {
        attrs.remove(index);
    } else {
        let attr = &mut attrs[index];
        attr.value = Some(classes.join(" "));
        attr.quote.get_or_insert('"');
    }
    Some(render_start_tag(name, &attrs, *self_closing))
}

/// Apply non-overlapping replacements to `src`.
pub fn splice(src: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(span, _)| span.start);
    let mut out = String::with_capacity(src.len());
    let mut at = 0;
    for (span, text) in edits {
        if span.start < at {
            continue;
        }
        out.push_str(&src[at..span.start]);
        out.push_str(&text);
        at = span.end;
    }
    out.push_str(&src[at..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_classes_adds_and_removes() {
        let src = "<a href=\"/\" class='nav-link'>Home</a>";
        let token = &tokenize(src)[0];
        let added = edit_classes(token, |c| c.push("active".into())).unwrap();
        assert_eq!(added, "<a href=\"/\" class='nav-link active'>");

        let bare = &tokenize("<li></li>")[0];
        assert_eq!(
            edit_classes(bare, |c| c.push("active".into())).unwrap(),
            "<li class=\"active\">"
        );
        let only = &tokenize("<li class=\"active\"></li>")[0];
        assert_eq!(edit_classes(only, |c| c.clear()).unwrap(), "<li>");
    }

    #[test]
    fn splice_applies_in_order() {
        let out = splice(
            "0123456789",
            vec![(6..8, "b".into()), (1..3, "a".into())],
        );
        assert_eq!(out, "0a345b89");
    }

    #[test]
    fn void_lookup_ignores_case() {
        assert!(is_void("BR"));
        assert!(!is_void("div"));
    }
}
