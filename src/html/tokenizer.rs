//! HTML as a flat token stream over the untouched source.
//!
//! `tl` parses the element tree; every element is turned back into its start tag, content
//! and end tag by byte offset, and whatever lies between elements (text, comments, the
//! doctype, stray end tags) fills the gaps. Tokenizing never fails: markup the parser
//! does not recognise as an element degrades into text. Every token keeps the byte span it
//! came from so callers can splice edits back into the source.

use std::{ops::Range, sync::OnceLock};

use regex::{Captures, Regex};

/// elements whose content is not markup
const RAW_TEXT: [&str; 3] = ["script", "style", "textarea"];

const ATTR: &str = r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+)))?"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    /// as written in the source
    pub name: String,
    pub value: Option<String>,
    /// `"` or `'` for quoted values
    pub quote: Option<char>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Doctype,
    Comment,
    Text,
    StartTag {
        /// as written in the source
        name: String,
        attrs: Vec<Attr>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
    /// 1-based line of the first byte
    pub line: usize,
}

impl Token {
    pub fn raw<'a>(&self, src: &'a str) -> &'a str {
        &src[self.span.clone()]
    }

    /// lowercase tag name for start and end tags
    pub fn tag(&self) -> Option<String> {
        match &self.kind {
            TokenKind::StartTag { name, .. } | TokenKind::EndTag { name } => {
                Some(name.to_ascii_lowercase())
            }
            _ => None,
        }
    }

    pub fn is_start(&self, tag: &str) -> bool {
        matches!(&self.kind, TokenKind::StartTag { name, .. } if name.eq_ignore_ascii_case(tag))
    }

    pub fn is_end(&self, tag: &str) -> bool {
        matches!(&self.kind, TokenKind::EndTag { name } if name.eq_ignore_ascii_case(tag))
    }

    pub fn attrs(&self) -> &[Attr] {
        match &self.kind {
            TokenKind::StartTag { attrs, .. } => attrs,
            _ => &[],
        }
    }

    /// value of the first attribute with this name, `Some("")` for a bare attribute
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs()
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }
}

fn start_tag_pattern() -> &'static Regex {
    static START: OnceLock<Regex> = OnceLock::new();
    START.get_or_init(|| {
        Regex::new(&format!(
            r"^<(?P<name>[A-Za-z][^\s/>]*)(?P<attrs>(?:\s*(?:{ATTR}|/))*?)\s*(?P<close>/?)>"
        ))
        .expect("start tag pattern is valid")
    })
}

fn attr_pattern() -> &'static Regex {
    static ATTRS: OnceLock<Regex> = OnceLock::new();
    ATTRS.get_or_init(|| Regex::new(ATTR).expect("attribute pattern is valid"))
}

fn end_tag_pattern() -> &'static Regex {
    static END: OnceLock<Regex> = OnceLock::new();
    END.get_or_init(|| {
        Regex::new(r"^</([A-Za-z][^\s/>]*)\s*>$").expect("end tag pattern is valid")
    })
}

/// markup that can sit between elements
fn gap_pattern() -> &'static Regex {
    static GAP: OnceLock<Regex> = OnceLock::new();
    GAP.get_or_init(|| {
        Regex::new(r"(?s)(<!--.*?(?:-->|\z))|(<[!?][^>]*>?)|</([A-Za-z][^\s/>]*)[^>]*>?")
            .expect("gap pattern is valid")
    })
}

pub fn tokenize(src: &str) -> Vec<Token> {
    let mut stream = Stream::new(src);
    match tl::parse(src, tl::ParserOptions::default()) {
        Ok(dom) => {
            let parser = dom.parser();
            for handle in dom.children() {
                stream.node(*handle, parser);
            }
        }
        Err(err) => log::debug!("Markup did not parse ({err:?}), reading it as text"),
    }
    stream.gap(src.len());
    stream.tokens
}

/// byte offset of a slice borrowed from `src`
fn offset_in(src: &str, part: &[u8]) -> Option<usize> {
    let start = (part.as_ptr() as usize).checked_sub(src.as_ptr() as usize)?;
    (start + part.len() <= src.len() && src.is_char_boundary(start)).then_some(start)
}

struct Stream<'s> {
    src: &'s str,
    /// offsets of every `\n`
    newlines: Vec<usize>,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'s> Stream<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            newlines: src.match_indices('\n').map(|(at, _)| at).collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn push(&mut self, kind: TokenKind, span: Range<usize>) {
        let line = self.newlines.partition_point(|&nl| nl < span.start) + 1;
        self.pos = span.end;
        self.tokens.push(Token { kind, span, line });
    }

    fn node(&mut self, handle: tl::NodeHandle, parser: &tl::Parser) {
        // text and comment nodes are picked up by `gap`
        let Some(tl::Node::Tag(tag)) = handle.get(parser) else {
            return;
        };
        let src = self.src;
        let outer = tag.raw().as_bytes();
        let Some(start) = offset_in(src, outer) else {
            return;
        };
        if start < self.pos {
            return;
        }
        let end = start + outer.len();
        let Some(open) = start_tag_pattern().captures(&src[start..end]) else {
            return;
        };
        self.gap(start);
        let open_end = start + open[0].len();
        let kind = start_tag(&open);
        let raw_text = match &kind {
            TokenKind::StartTag {
                name,
                self_closing: false,
                ..
            } => RAW_TEXT.iter().any(|t| t.eq_ignore_ascii_case(name)),
            _ => false,
        };
        let name = open["name"].to_string();
        self.push(kind, start..open_end);

        let close = self.closing_tag(&name, open_end, end);
        let content_end = close.as_ref().map_or(end, |c| c.start);
        if raw_text {
            if open_end < content_end {
                self.push(TokenKind::Text, open_end..content_end);
            }
        } else {
            for child in tag.children().top().iter() {
                self.node(*child, parser);
            }
            self.gap(content_end);
        }
        if let Some(close) = close.filter(|c| c.start >= self.pos) {
            let name = src[close.start + 2..close.end]
                .trim_end_matches(|c: char| c == '>' || c.is_ascii_whitespace())
                .to_string();
            self.push(TokenKind::EndTag { name }, close);
        }
    }

    /// span of the end tag closing an element that ends at `end`
    fn closing_tag(&self, name: &str, from: usize, end: usize) -> Option<Range<usize>> {
        let tail = &self.src[from..end];
        let at = tail.rfind("</")?;
        let caps = end_tag_pattern().captures(&tail[at..])?;
        caps[1]
            .eq_ignore_ascii_case(name)
            .then_some(from + at..end)
    }

    /// tokens for source not covered by an element, up to `until`
    fn gap(&mut self, until: usize) {
        if until <= self.pos {
            return;
        }
        let (src, from) = (self.src, self.pos);
        for caps in gap_pattern().captures_iter(&src[from..until]) {
            let Some(whole) = caps.get(0) else { continue };
            let span = from + whole.start()..from + whole.end();
            if self.pos < span.start {
                self.push(TokenKind::Text, self.pos..span.start);
            }
            let kind = if caps.get(1).is_some() {
                TokenKind::Comment
            } else if caps.get(2).is_some() {
                TokenKind::Doctype
            } else {
                TokenKind::EndTag {
                    name: caps[3].to_string(),
                }
            };
            self.push(kind, span);
        }
        if self.pos < until {
            self.push(TokenKind::Text, self.pos..until);
        }
    }
}

fn start_tag(open: &Captures) -> TokenKind {
    let attrs = attr_pattern()
        .captures_iter(&open["attrs"])
        .map(|caps| {
            let (value, quote) = match (caps.get(2), caps.get(3), caps.get(4)) {
                (Some(v), ..) => (Some(v.as_str()), Some('"')),
                (_, Some(v), _) => (Some(v.as_str()), Some('\'')),
                (.., Some(v)) => (Some(v.as_str()), None),
                _ => (None, None),
            };
            Attr {
                name: caps[1].to_string(),
                value: value.map(String::from),
                quote,
            }
        })
        .collect();
    TokenKind::StartTag {
        name: open["name"].to_string(),
        attrs,
        self_closing: !open["close"].is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tags_text_and_comments() {
        let src = "<!DOCTYPE html>\n<p class=\"a b\" hidden>Hi <!-- note --></p>";
        let tokens = tokenize(src);
        assert_eq!(tokens[0].kind, TokenKind::Doctype);
        assert!(tokens[2].is_start("p"));
        assert_eq!(tokens[2].line, 2);
        assert_eq!(tokens[2].attr("class"), Some("a b"));
        assert_eq!(tokens[2].attr("hidden"), Some(""));
        assert!(tokens[2].has_class("b"));
        assert_eq!(tokens[3].raw(src), "Hi ");
        assert_eq!(tokens[4].kind, TokenKind::Comment);
        assert!(tokens[5].is_end("p"));
    }

    #[test]
    fn quotes_and_unquoted_values() {
        let tokens = tokenize("<a href='/x?a>b' data-n=3 title=\"t\"></a>");
        let attrs = tokens[0].attrs();
        assert_eq!(attrs[0].value.as_deref(), Some("/x?a>b"));
        assert_eq!(attrs[0].quote, Some('\''));
        assert_eq!(attrs[1].value.as_deref(), Some("3"));
        assert_eq!(attrs[1].quote, None);
        assert_eq!(attrs[2].quote, Some('"'));
    }

    #[test]
    fn duplicate_attributes_are_kept_in_order() {
        let tokens = tokenize(r#"<div id="a" class="x" id="b"></div>"#);
        let names: Vec<_> = tokens[0].attrs().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "class", "id"]);
        assert_eq!(tokens[0].attr("id"), Some("a"));
    }

    #[test]
    fn script_content_is_raw_text() {
        let src = "<script>if (a < b) { x = 1; }</script><br/>";
        let tokens = tokenize(src);
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[1].kind, TokenKind::Text);
        assert_eq!(tokens[1].raw(src), "if (a < b) { x = 1; }");
        assert!(tokens[2].is_end("script"));
        assert!(matches!(
            tokens[3].kind,
            TokenKind::StartTag {
                self_closing: true,
                ..
            }
        ));
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        assert_eq!(kinds("a < b"), vec![TokenKind::Text]);
    }

    #[test]
    fn spans_cover_source() {
        let src = "<!DOCTYPE html>\n<div>\n  <span>é</span><img src=x>\n<!-- c --></div>\n";
        let tokens = tokenize(src);
        let rebuilt: String = tokens.iter().map(|t| t.raw(src)).collect();
        assert_eq!(rebuilt, src);
        assert!(tokens.windows(2).all(|w| w[0].span.end == w[1].span.start));
        let img = tokens.iter().find(|t| t.is_start("img")).unwrap();
        assert_eq!(img.line, 3);
    }
}
