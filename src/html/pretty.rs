//! Re-indents generated pages.
//!
//! Block elements get a line per tag and one indent step per nesting level. Inline
//! content flows on a single line, and a block whose content is all inline stays on one
//! line. Elements listed as unformatted are copied byte for byte, as are `pre`, `script`,
//! `style` and `textarea`.

use super::{is_void, tokenize, Token, TokenKind};
use crate::config::ConfigHtml;

const INLINE: [&str; 30] = [
    "a", "abbr", "acronym", "b", "bdi", "bdo", "big", "br", "button", "cite", "code", "data",
    "del", "dfn", "em", "i", "img", "input", "ins", "kbd", "label", "mark", "q", "s", "small",
    "span", "strong", "sub", "sup", "time",
];

const VERBATIM: [&str; 4] = ["pre", "script", "style", "textarea"];

#[derive(Debug, Clone)]
pub struct PrettyOptions {
    pub indent: usize,
    pub unformatted: Vec<String>,
}

impl From<&ConfigHtml> for PrettyOptions {
    fn from(value: &ConfigHtml) -> Self {
        Self {
            indent: value.indent_size,
            unformatted: value.unformatted.clone(),
        }
    }
}

impl Default for PrettyOptions {
    fn default() -> Self {
        (&ConfigHtml::default()).into()
    }
}

fn is_inline(tag: &str) -> bool {
    INLINE.contains(&tag)
}

struct Printer {
    unit: String,
    lines: Vec<String>,
    depth: usize,
    /// start tag of a block whose content has only been inline so far
    open: Option<String>,
    line: String,
}

impl Printer {
    fn indent(&self, depth: usize) -> String {
        self.unit.repeat(depth)
    }

    fn push(&mut self, depth: usize, text: &str) {
        let indent = self.indent(depth);
        self.lines.push(format!("{indent}{text}"));
    }

    fn inline(&mut self, text: &str) {
        self.line.push_str(text);
    }

    fn text(&mut self, text: &str) {
        let mut last_space = self.line.ends_with(' ');
        for c in text.chars() {
            if c.is_whitespace() {
                if !last_space {
                    self.line.push(' ');
                    last_space = true;
                }
            } else {
                self.line.push(c);
                last_space = false;
            }
        }
    }

    /// write out a pending open tag and any inline content
    fn settle(&mut self) {
        if let Some(open) = self.open.take() {
            self.push(self.depth.saturating_sub(1), &open);
        }
        let line = std::mem::take(&mut self.line);
        let line = line.trim();
        if !line.is_empty() {
            self.push(self.depth, line);
        }
    }

    fn open_block(&mut self, raw: &str) {
        self.settle();
        self.open = Some(raw.to_string());
        self.depth += 1;
    }

    fn close_block(&mut self, raw: &str) {
        match self.open.take() {
            Some(open) => {
                self.depth = self.depth.saturating_sub(1);
                let line = std::mem::take(&mut self.line);
                let joined = format!("{open}{}{raw}", line.trim());
                self.push(self.depth, &joined);
            }
            None => {
                self.settle();
                self.depth = self.depth.saturating_sub(1);
                self.push(self.depth, raw);
            }
        }
    }

    fn standalone(&mut self, raw: &str) {
        self.settle();
        let mut lines = raw.lines();
        if let Some(first) = lines.next() {
            self.push(self.depth, first.trim_start());
        }
        // continuation lines are content, keep them as they are
        for rest in lines {
            self.lines.push(rest.to_string());
        }
    }
}

/// index of the token closing the element opened at `start`
fn matching_end(tokens: &[Token], start: usize, tag: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (index, token) in tokens.iter().enumerate().skip(start) {
        match &token.kind {
            TokenKind::StartTag { self_closing, .. } if token.is_start(tag) => {
                if !self_closing {
                    depth += 1;
                }
            }
            TokenKind::EndTag { .. } if token.is_end(tag) => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn prettify(html: &str, options: &PrettyOptions) -> String {
    let tokens = tokenize(html);
    let unformatted = |tag: &str| {
        VERBATIM.contains(&tag) || options.unformatted.iter().any(|u| u.eq_ignore_ascii_case(tag))
    };
    let mut printer = Printer {
        unit: " ".repeat(options.indent),
        lines: Vec::new(),
        depth: 0,
        open: None,
        line: String::new(),
    };

    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        let raw = token.raw(html);
        match &token.kind {
            TokenKind::Doctype | TokenKind::Comment => printer.standalone(raw),
            TokenKind::Text => printer.text(raw),
            TokenKind::StartTag { self_closing, .. } => {
                let tag = token.tag().unwrap_or_default();
                let void = *self_closing || is_void(&tag);
                if unformatted(&tag) {
                    let end = if void {
                        index
                    } else {
                        matching_end(&tokens, index, &tag).unwrap_or(index)
                    };
                    let element = &html[token.span.start..tokens[end].span.end];
                    if is_inline(&tag) {
                        printer.inline(element);
                    } else {
                        printer.standalone(element);
                    }
                    index = end + 1;
                    continue;
                }
                if is_inline(&tag) {
                    printer.inline(raw);
                } else if void {
                    printer.standalone(raw);
                } else {
                    printer.open_block(raw);
                }
            }
            TokenKind::EndTag { .. } => {
                let tag = token.tag().unwrap_or_default();
                if is_inline(&tag) {
                    printer.inline(raw);
                } else {
                    printer.close_block(raw);
                }
            }
        }
        index += 1;
    }
    printer.settle();

    let mut out = printer.lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn indents_blocks_and_keeps_inline_runs() {
        let html = "<!DOCTYPE html><html><head><title>Demo</title><meta charset=\"utf-8\"></head>\
                    <body><div class=\"row\"><p>Hello   <a href=\"/\">home</a>\n now</p></div></body></html>";
        let expected = "\
<!DOCTYPE html>
<html>
    <head>
        <title>Demo</title>
        <meta charset=\"utf-8\">
    </head>
    <body>
        <div class=\"row\">
            <p>Hello <a href=\"/\">home</a> now</p>
        </div>
    </body>
</html>
";
        assert_eq!(prettify(html, &PrettyOptions::default()), expected);
    }

    #[test]
    fn unformatted_elements_are_verbatim() {
        let html = "<div><p>Use <code>a  =  b</code> and <strong> keep </strong></p>\
                    <pre>\n  line one\n    line two\n</pre></div>";
        let expected = "\
<div>
    <p>Use <code>a  =  b</code> and <strong> keep </strong></p>
    <pre>
  line one
    line two
</pre>
</div>
";
        assert_eq!(prettify(html, &PrettyOptions::default()), expected);
    }

    #[test]
    fn mixed_content_splits_lines() {
        let html = "<section>Intro<div>inner</div></section>";
        let expected = "<section>\n    Intro\n    <div>inner</div>\n</section>\n";
        assert_eq!(prettify(html, &PrettyOptions::default()), expected);
    }

    #[test]
    fn prettify_is_idempotent() {
        let html = "<html><body><ul class=\"navbar-nav\"><li><a href=\"/\">Home</a></li>\
                    <li><em>x</em> <span>y</span></li></ul><script>\nvar a = 1;\n</script>\
                    <!-- trailing --></body></html>";
        let options = PrettyOptions {
            indent: 2,
            ..PrettyOptions::default()
        };
        let once = prettify(html, &options);
        assert_eq!(prettify(&once, &options), once);
    }
}
