//! Checks over the stylesheet sources.

use std::{fs, path::Path, sync::OnceLock};

use regex::Regex;
use serde::Deserialize;

use super::Finding;
use crate::error::Result;

pub const LINTER: &str = "scss-lint";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Toggle {
    pub enabled: bool,
}

impl Default for Toggle {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Indentation {
    pub enabled: bool,
    pub width: usize,
}

impl Default for Indentation {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 2,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ScssLinters {
    pub indentation: Indentation,
    pub trailing_whitespace: Toggle,
    pub important_rule: Toggle,
    pub hex_notation: Toggle,
    pub hex_length: Toggle,
    pub zero_unit: Toggle,
    pub empty_rule: Toggle,
    pub trailing_semicolon: Toggle,
}

/// `.scss-lint.yml`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScssRules {
    pub linters: ScssLinters,
}

fn hex_color() -> &'static Regex {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| Regex::new(r"#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})\b").expect("hex pattern is valid"))
}

fn zero_unit() -> &'static Regex {
    static ZERO: OnceLock<Regex> = OnceLock::new();
    ZERO.get_or_init(|| {
        Regex::new(r"(?:^|[\s:(,])(0(?:px|em|rem|pt|pc|ex|ch|vh|vw|vmin|vmax|cm|mm|in))\b")
            .expect("zero unit pattern is valid")
    })
}

/// Blank out comments, keeping every newline so line numbers survive.
fn strip_comments(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    let mut chars = src.chars().peekable();
    let mut prev = '\n';
    let mut quote: Option<char> = None;
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            prev = c;
            continue;
        }
        match (c, chars.peek()) {
            ('"' | '\'', _) => {
                quote = Some(c);
                out.push(c);
            }
            // `url(http://...)`
            ('/', Some('/')) if prev != ':' => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
                out.push(' ');
            }
            ('/', Some('*')) => {
                chars.next();
                out.push_str("  ");
                let mut last = ' ';
                for next in chars.by_ref() {
                    out.push(if next == '\n' { '\n' } else { ' ' });
                    if last == '*' && next == '/' {
                        break;
                    }
                    last = next;
                }
            }
            _ => out.push(c),
        }
        prev = c;
    }
    out
}

fn is_declaration(code: &str) -> bool {
    code.contains(':') && !code.contains('{') && !code.contains('}') && !code.starts_with('@')
        || code.starts_with('$')
}

/// short form of a six digit color, when one exists
fn short_hex(hex: &str) -> Option<String> {
    let b = hex.as_bytes();
    (b.len() == 6 && b[0] == b[1] && b[2] == b[3] && b[4] == b[5])
        .then(|| format!("{}{}{}", b[0] as char, b[2] as char, b[4] as char))
}

pub fn lint_source(file: &Path, src: &str, rules: &ScssRules) -> Vec<Finding> {
    let linters = &rules.linters;
    let code = strip_comments(src);
    let mut findings = Vec::new();
    let mut push = |line: usize, code: &str, message: String| {
        findings.push(Finding {
            linter: LINTER,
            file: file.to_path_buf(),
            line,
            code: code.to_string(),
            message,
        })
    };

    let mut depth = 0usize;
    let mut parens = 0usize;
    // line of a `{` still waiting for content
    let mut open_brace: Option<usize> = None;
    let mut last_declaration: Option<(usize, String)> = None;

    for (index, (raw, line)) in src.lines().zip(code.lines()).enumerate() {
        let number = index + 1;
        let trimmed = line.trim();

        if linters.trailing_whitespace.enabled && raw != raw.trim_end() {
            push(number, "TrailingWhitespace", "Line contains trailing whitespace".into());
        }
        if trimmed.is_empty() {
            continue;
        }

        if linters.indentation.enabled && parens == 0 {
            let closers = trimmed.chars().take_while(|c| *c == '}').count();
            let expected = depth.saturating_sub(closers) * linters.indentation.width;
            let leading = &raw[..raw.len() - raw.trim_start().len()];
            if leading.contains('\t') {
                push(number, "Indentation", "Line should be indented with spaces, not tabs".into());
            } else if leading.len() != expected {
                push(
                    number,
                    "Indentation",
                    format!(
                        "Line should be indented {expected} spaces, but was indented {} spaces",
                        leading.len()
                    ),
                );
            }
        }

        if linters.important_rule.enabled && trimmed.contains("!important") {
            push(number, "ImportantRule", "!important should not be used".into());
        }

        if is_declaration(trimmed) || parens > 0 {
            let value = trimmed.split_once(':').map_or(trimmed, |(_, v)| v);
            for hex in hex_color().captures_iter(value).filter_map(|c| c.get(1)) {
                let hex = hex.as_str();
                if linters.hex_notation.enabled && hex != hex.to_ascii_lowercase() {
                    push(
                        number,
                        "HexNotation",
                        format!("Color `#{hex}` should be written as `#{}`", hex.to_ascii_lowercase()),
                    );
                }
                if linters.hex_length.enabled {
                    if let Some(short) = short_hex(hex) {
                        push(
                            number,
                            "HexLength",
                            format!("Color `#{hex}` should be written as `#{short}`"),
                        );
                    }
                }
            }
            if linters.zero_unit.enabled {
                for zero in zero_unit().captures_iter(value).filter_map(|c| c.get(1)) {
                    push(
                        number,
                        "ZeroUnit",
                        format!("`{}` should be written without units as `0`", zero.as_str()),
                    );
                }
            }
        }

        for c in trimmed.chars() {
            match c {
                '{' => {
                    depth += 1;
                    open_brace = Some(number);
                    last_declaration = None;
                }
                '}' => {
                    if let (true, Some(at)) = (linters.empty_rule.enabled, open_brace.take()) {
                        push(at, "EmptyRule", "Empty rule".into());
                    }
                    if let Some((at, text)) = last_declaration.take() {
                        if linters.trailing_semicolon.enabled {
                            push(
                                at,
                                "TrailingSemicolon",
                                format!("Declaration `{text}` should be terminated by a semicolon"),
                            );
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                '(' => parens += 1,
                ')' => parens = parens.saturating_sub(1),
                c if !c.is_whitespace() => open_brace = None,
                _ => {}
            }
        }

        if parens == 0 && is_declaration(trimmed) && !trimmed.contains('(') {
            last_declaration = (!trimmed.ends_with(';') && !trimmed.ends_with(','))
                .then(|| (number, trimmed.to_string()));
        } else if parens == 0 && !trimmed.ends_with(',') {
            last_declaration = None;
        }
    }
    findings.sort_by_key(|f| f.line);
    findings
}

pub fn lint_file(file: &Path, rules: &ScssRules) -> Result<Vec<Finding>> {
    let src = fs::read_to_string(file)?;
    Ok(lint_source(file, &src, rules))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(src: &str, rules: &ScssRules) -> Vec<(usize, String)> {
        lint_source(Path::new("main.scss"), src, rules)
            .into_iter()
            .map(|f| (f.line, f.code))
            .collect()
    }

    #[test]
    fn clean_stylesheet() {
        let src = "// colors\n$brand: #336;\n\n.nav {\n  color: $brand;\n  a:hover {\n    margin: 0 auto;\n  }\n}\n";
        assert!(codes(src, &ScssRules::default()).is_empty());
    }

    #[test]
    fn flags_each_rule() {
        let src = ".a {\n    color: #FFFFFF !important;\n  margin: 0px; \n}\n.b {}\n.c {\n  padding: 1px\n}\n";
        let found = codes(src, &ScssRules::default());
        let expected: Vec<(usize, String)> = vec![
            (2, "Indentation"),
            (2, "ImportantRule"),
            (2, "HexNotation"),
            (2, "HexLength"),
            (3, "TrailingWhitespace"),
            (3, "ZeroUnit"),
            (5, "EmptyRule"),
            (7, "TrailingSemicolon"),
        ]
        .into_iter()
        .map(|(l, c)| (l, c.to_string()))
        .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn comments_and_selectors_are_not_values() {
        let src = "#MAIN {\n  /* color: #FFF; */\n  background: url(http://x.io/a.png);\n}\n";
        assert!(codes(src, &ScssRules::default()).is_empty());
    }

    #[test]
    fn yaml_rules_toggle_linters() {
        let rules: ScssRules = serde_yml::from_str(
            "linters:\n  Indentation:\n    width: 4\n  ImportantRule:\n    enabled: false\n",
        )
        .unwrap();
        assert_eq!(rules.linters.indentation.width, 4);
        assert!(rules.linters.indentation.enabled);
        let found = codes(".a {\n    color: red !important;\n}\n", &rules);
        assert!(found.is_empty());
    }
}
