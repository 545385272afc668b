//! Checks over the generated pages.

use std::{collections::HashSet, fs, path::Path};

use serde::Deserialize;

use super::{line_checks, Finding};
use crate::{
    error::Result,
    html::{tokenize, Token, TokenKind},
};

pub const LINTER: &str = "htmllint";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HtmlRules {
    pub doctype_first: bool,
    pub tag_name_lowercase: bool,
    /// `dash` or `lowercase`, absent to disable
    pub attr_name_style: Option<String>,
    /// `double` or `single`, absent to disable
    pub attr_quote_style: Option<String>,
    pub attr_no_dup: bool,
    pub id_no_dup: bool,
    pub img_req_alt: bool,
    pub html_req_lang: bool,
    pub attr_bans: Vec<String>,
    pub line_max_len: Option<usize>,
}

impl Default for HtmlRules {
    fn default() -> Self {
        Self {
            doctype_first: true,
            tag_name_lowercase: true,
            attr_name_style: Some("dash".into()),
            attr_quote_style: Some("double".into()),
            attr_no_dup: true,
            id_no_dup: true,
            img_req_alt: true,
            html_req_lang: true,
            attr_bans: [
                "align",
                "background",
                "bgcolor",
                "border",
                "frameborder",
                "marginwidth",
                "marginheight",
                "scrolling",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            line_max_len: None,
        }
    }
}

fn dash_case(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--")
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

struct Checker<'a> {
    rules: &'a HtmlRules,
    file: &'a Path,
    findings: Vec<Finding>,
}

impl Checker<'_> {
    fn push(&mut self, token: &Token, code: &str, message: String) {
        self.findings.push(Finding {
            linter: LINTER,
            file: self.file.to_path_buf(),
            line: token.line,
            code: code.to_string(),
            message,
        });
    }

    fn start_tag(&mut self, token: &Token, name: &str, ids: &mut HashSet<String>) {
        let rules = self.rules;
        if rules.tag_name_lowercase && name != name.to_ascii_lowercase() {
            self.push(token, "tag-name-lowercase", format!("Tag name `{name}` must be lowercase"));
        }

        let mut seen = HashSet::new();
        for attr in token.attrs() {
            let lower = attr.name.to_ascii_lowercase();
            if rules.attr_no_dup && !seen.insert(lower.clone()) {
                self.push(token, "attr-no-dup", format!("Duplicate attribute `{}`", attr.name));
            }
            match rules.attr_name_style.as_deref() {
                Some("dash") if !dash_case(&attr.name) => self.push(
                    token,
                    "attr-name-style",
                    format!("Attribute name `{}` must be dash-case", attr.name),
                ),
                Some("lowercase") if attr.name != lower => self.push(
                    token,
                    "attr-name-style",
                    format!("Attribute name `{}` must be lowercase", attr.name),
                ),
                _ => {}
            }
            let wanted = match rules.attr_quote_style.as_deref() {
                Some("double") => Some('"'),
                Some("single") => Some('\''),
                _ => None,
            };
            if let (Some(wanted), Some(_)) = (wanted, &attr.value) {
                if attr.quote != Some(wanted) {
                    self.push(
                        token,
                        "attr-quote-style",
                        format!("Value of `{}` must be quoted with {wanted}", attr.name),
                    );
                }
            }
            if rules.attr_bans.iter().any(|ban| ban.eq_ignore_ascii_case(&attr.name)) {
                self.push(token, "attr-bans", format!("Attribute `{}` is banned", attr.name));
            }
        }

        if rules.id_no_dup {
            if let Some(id) = token.attr("id").filter(|id| !id.is_empty()) {
                if !ids.insert(id.to_string()) {
                    self.push(token, "id-no-dup", format!("Duplicate id `{id}`"));
                }
            }
        }
        if rules.img_req_alt && token.is_start("img") && token.attr("alt").is_none() {
            self.push(token, "img-req-alt", "Img tag must have an alt attribute".into());
        }
        if rules.html_req_lang
            && token.is_start("html")
            && token.attr("lang").map_or(true, str::is_empty)
        {
            self.push(token, "html-req-lang", "Html tag must have a lang attribute".into());
        }
    }
}

pub fn lint_source(file: &Path, src: &str, rules: &HtmlRules) -> Vec<Finding> {
    let tokens = tokenize(src);
    let mut checker = Checker {
        rules,
        file,
        findings: Vec::new(),
    };

    if rules.doctype_first {
        let first = tokens
            .iter()
            .find(|t| !(t.kind == TokenKind::Text && t.raw(src).trim().is_empty()));
        if let Some(first) = first.filter(|t| t.kind != TokenKind::Doctype) {
            checker.push(first, "doctype-first", "Doctype must be the first element".into());
        }
    }

    let mut ids = HashSet::new();
    for token in &tokens {
        if let TokenKind::StartTag { name, .. } = &token.kind {
            checker.start_tag(token, name, &mut ids);
        }
    }

    let mut findings = checker.findings;
    findings.extend(line_checks(
        LINTER,
        file,
        src,
        rules.line_max_len,
        None,
        "line-max-len",
    ));
    findings.sort_by_key(|f| f.line);
    findings
}

pub fn lint_file(file: &Path, rules: &HtmlRules) -> Result<Vec<Finding>> {
    let src = fs::read_to_string(file)?;
    Ok(lint_source(file, &src, rules))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(src: &str, rules: &HtmlRules) -> Vec<(usize, String)> {
        lint_source(Path::new("index.html"), src, rules)
            .into_iter()
            .map(|f| (f.line, f.code))
            .collect()
    }

    #[test]
    fn clean_page_has_no_findings() {
        let src = "<!DOCTYPE html>\n<html lang=\"en\">\n<body><img src=\"a.png\" alt=\"\"></body>\n</html>\n";
        assert!(codes(src, &HtmlRules::default()).is_empty());
    }

    #[test]
    fn reports_each_rule_with_its_line() {
        let src = "<html>\n<DIV id=\"a\" id=\"b\"></DIV>\n<p id='a' align=\"left\"><img src=\"x\"></p>\n<span dataFoo=\"1\" id=\"a\"></span>";
        let found = codes(src, &HtmlRules::default());
        let expected: Vec<(usize, String)> = vec![
            (1, "doctype-first"),
            (1, "html-req-lang"),
            (2, "tag-name-lowercase"),
            (2, "attr-no-dup"),
            (3, "attr-quote-style"),
            (3, "attr-bans"),
            (3, "id-no-dup"),
            (3, "img-req-alt"),
            (4, "attr-name-style"),
            (4, "id-no-dup"),
        ]
        .into_iter()
        .map(|(l, c)| (l, c.to_string()))
        .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn rules_can_be_switched_off() {
        let rules: HtmlRules = serde_json::from_str(
            r#"{ "doctype-first": false, "html-req-lang": false, "line-max-len": 10 }"#,
        )
        .unwrap();
        assert!(rules.img_req_alt);
        assert_eq!(
            codes("<html>\n<p>this line is long</p>", &rules),
            vec![(2, "line-max-len".to_string())]
        );
    }
}
