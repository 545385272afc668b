//! Accessibility scan of the generated pages, one text report per page.

use std::{
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::{
    error::Result,
    files::{self, Select},
    html::{tokenize, Token, TokenKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => f.write_str("Error"),
            Level::Warning => f.write_str("Warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub level: Level,
    pub code: &'static str,
    pub line: usize,
    pub message: String,
    /// the offending tag as written
    pub context: String,
}

const IMG_ALT: &str = "WCAG2AA.Principle1.Guideline1_1.1_1_1.H37";
const HTML_LANG: &str = "WCAG2AA.Principle3.Guideline3_1.3_1_1.H57.2";
const NO_TITLE: &str = "WCAG2AA.Principle2.Guideline2_4.2_4_2.H25.1.NoTitleEl";
const EMPTY_TITLE: &str = "WCAG2AA.Principle2.Guideline2_4.2_4_2.H25.1.EmptyTitle";
const EMPTY_LINK: &str = "WCAG2AA.Principle4.Guideline4_1.4_1_2.H91.A.NoContent";
const NO_LABEL: &str = "WCAG2AA.Principle1.Guideline1_3.1_3_1.F68";
const IFRAME_TITLE: &str = "WCAG2AA.Principle4.Guideline4_1.4_1_2.H64.1";
const DUPLICATE_ID: &str = "WCAG2AA.Principle4.Guideline4_1.4_1_1.F77";
const HEADING_ORDER: &str = "WCAG2AA.Principle1.Guideline1_3.1_3_1_A.G141";

const CONTEXT_LEN: usize = 120;

/// input types that need no label
const UNLABELLED_INPUTS: [&str; 5] = ["hidden", "submit", "button", "image", "reset"];

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

fn heading_level(token: &Token) -> Option<u8> {
    let tag = token.tag()?;
    match tag.as_bytes() {
        [b'h', n @ b'1'..=b'6'] => Some(n - b'0'),
        _ => None,
    }
}

struct Scan<'a> {
    src: &'a str,
    issues: Vec<Issue>,
}

impl Scan<'_> {
    fn push(&mut self, level: Level, code: &'static str, token: &Token, message: impl Into<String>) {
        let raw = token.raw(self.src);
        let context = match raw.char_indices().nth(CONTEXT_LEN) {
            Some((at, _)) => format!("{}...", &raw[..at]),
            None => raw.to_string(),
        };
        self.issues.push(Issue {
            level,
            code,
            line: token.line,
            message: message.into(),
            context,
        });
    }
}

/// Every issue found in one page, in document order.
pub fn check(src: &str) -> Vec<Issue> {
    let tokens = tokenize(src);
    let labelled: HashSet<&str> = tokens
        .iter()
        .filter(|t| t.is_start("label"))
        .filter_map(|t| t.attr("for"))
        .collect();

    let mut scan = Scan {
        src,
        issues: Vec::new(),
    };
    let mut ids = HashSet::new();
    let mut label_depth = 0usize;
    let mut last_heading: Option<u8> = None;
    // open link and whether it has content yet
    let mut link: Option<(&Token, bool)> = None;
    let mut title: Option<(&Token, String)> = None;
    let mut in_title = false;
    let mut saw_title = false;

    for token in &tokens {
        match &token.kind {
            TokenKind::Text => {
                let text = token.raw(src);
                if in_title {
                    if let Some((_, content)) = title.as_mut() {
                        content.push_str(text);
                    }
                }
                if let Some((_, content)) = link.as_mut() {
                    *content |= !text.trim().is_empty();
                }
            }
            TokenKind::StartTag { .. } => {
                if let Some(id) = token.attr("id").filter(|id| !id.is_empty()) {
                    if !ids.insert(id) {
                        scan.push(
                            Level::Error,
                            DUPLICATE_ID,
                            token,
                            format!("Duplicate id attribute value \"{id}\" found on the web page."),
                        );
                    }
                }
                let tag = token.tag().unwrap_or_default();
                match tag.as_str() {
                    "html" if !non_empty(token.attr("lang")) => scan.push(
                        Level::Error,
                        HTML_LANG,
                        token,
                        "The html element should have a lang attribute which describes the \
                         language of the document.",
                    ),
                    "title" => {
                        saw_title = true;
                        in_title = true;
                        title = Some((token, String::new()));
                    }
                    "img" => {
                        if token.attr("alt").is_none() {
                            scan.push(
                                Level::Error,
                                IMG_ALT,
                                token,
                                "Img element missing an alt attribute. Use the alt attribute to \
                                 specify a short text alternative.",
                            );
                        }
                        if let Some((_, content)) = link.as_mut() {
                            *content |= non_empty(token.attr("alt"));
                        }
                    }
                    "a" if token.attr("href").is_some() => {
                        let labelled =
                            non_empty(token.attr("aria-label")) || non_empty(token.attr("title"));
                        link = Some((token, labelled));
                    }
                    "label" => label_depth += 1,
                    "iframe" if !non_empty(token.attr("title")) => scan.push(
                        Level::Error,
                        IFRAME_TITLE,
                        token,
                        "Iframe element requires a non-empty title attribute that identifies \
                         the frame.",
                    ),
                    "input" | "select" | "textarea" => {
                        let kind = token.attr("type").unwrap_or("text").to_ascii_lowercase();
                        let exempt = tag == "input" && UNLABELLED_INPUTS.contains(&kind.as_str());
                        let has_label = label_depth > 0
                            || token.attr("id").is_some_and(|id| labelled.contains(id))
                            || non_empty(token.attr("aria-label"))
                            || non_empty(token.attr("aria-labelledby"))
                            || non_empty(token.attr("title"));
                        if !exempt && !has_label {
                            scan.push(
                                Level::Error,
                                NO_LABEL,
                                token,
                                "This form field should be labelled in some way. Use the label \
                                 element or an aria-label attribute.",
                            );
                        }
                    }
                    _ => {}
                }
                if let Some(level) = heading_level(token) {
                    if let Some(last) = last_heading.filter(|last| level > last + 1) {
                        scan.push(
                            Level::Warning,
                            HEADING_ORDER,
                            token,
                            format!(
                                "The heading structure is not logically nested. This h{level} \
                                 element follows an h{last} element."
                            ),
                        );
                    }
                    last_heading = Some(level);
                }
            }
            TokenKind::EndTag { name } => match name.to_ascii_lowercase().as_str() {
                "title" => {
                    in_title = false;
                    if let Some((token, content)) = title.take() {
                        if content.trim().is_empty() {
                            scan.push(
                                Level::Error,
                                EMPTY_TITLE,
                                token,
                                "The title element in the head section should be non-empty.",
                            );
                        }
                    }
                }
                "a" => {
                    if let Some((token, false)) = link.take() {
                        scan.push(
                            Level::Error,
                            EMPTY_LINK,
                            token,
                            "Anchor element found with a valid href attribute, but no link \
                             content has been supplied.",
                        );
                    }
                }
                "label" => label_depth = label_depth.saturating_sub(1),
                _ => {}
            },
            _ => {}
        }
    }

    if !saw_title {
        let at = tokens
            .iter()
            .find(|t| t.is_start("head"))
            .or_else(|| tokens.iter().find(|t| t.is_start("html")))
            .or(tokens.first());
        if let Some(token) = at {
            scan.push(
                Level::Error,
                NO_TITLE,
                token,
                "A title should be provided for the document, using a non-empty title element \
                 in the head section.",
            );
        }
    }
    scan.issues.sort_by_key(|i| i.line);
    scan.issues
}

pub fn render_report(page: &str, issues: &[Issue]) -> String {
    let errors = issues.iter().filter(|i| i.level == Level::Error).count();
    let warnings = issues.len() - errors;
    let mut out = format!("Accessibility report for {page}\n\n");
    if issues.is_empty() {
        out.push_str("No issues found!\n");
        return out;
    }
    out.push_str(&format!("{errors} errors, {warnings} warnings\n"));
    for issue in issues {
        out.push_str(&format!(
            "\n[{}] {} (line {})\n{}\n{}\n",
            issue.level, issue.code, issue.line, issue.message, issue.context
        ));
    }
    out
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub pages: usize,
    pub errors: usize,
    pub warnings: usize,
    /// pages that could not be scanned or reported
    pub failed: Vec<PathBuf>,
}

/// Where the report for `page` goes: the page's path below `output`, under `reports`, as
/// `.txt`.
pub fn report_path(output: &Path, reports: &Path, page: &Path) -> PathBuf {
    let relative = page.strip_prefix(output).unwrap_or(page);
    reports.join(relative).with_extension("txt")
}

fn scan_page(output: &Path, reports: &Path, page: &Path) -> Result<Vec<Issue>> {
    let src = fs::read_to_string(page)?;
    let issues = check(&src);
    let name = page
        .strip_prefix(output)
        .unwrap_or(page)
        .to_string_lossy()
        .replace('\\', "/");
    files::write(report_path(output, reports, page), render_report(&name, &issues))?;
    Ok(issues)
}

/// Scan every page below `output`. A page that fails is logged and skipped.
pub fn run(output: &Path, reports: &Path) -> Result<Summary> {
    let mut summary = Summary::default();
    for page in files::collect(output, Select::Extensions(&["html"]))? {
        match scan_page(output, reports, &page) {
            Ok(issues) => {
                let errors = issues.iter().filter(|i| i.level == Level::Error).count();
                summary.pages += 1;
                summary.errors += errors;
                summary.warnings += issues.len() - errors;
                log::info!(
                    "`{}`: {} errors, {} warnings",
                    page.display(),
                    errors,
                    issues.len() - errors
                );
            }
            Err(err) => {
                log::error!("Accessibility scan of `{}` failed: {err}", page.display());
                summary.failed.push(page);
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const CLEAN: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head><title>Home</title></head>\n<body>\n<h1>Hi</h1><h2>Sub</h2>\n<a href=\"/\"><img src=\"logo.png\" alt=\"Home\"></a>\n<label>Name <input name=\"n\"></label>\n<label for=\"e\">Email</label><input id=\"e\" type=\"email\">\n<input type=\"hidden\" name=\"t\">\n</body>\n</html>\n";

    fn codes(src: &str) -> Vec<(usize, &'static str)> {
        check(src).into_iter().map(|i| (i.line, i.code)).collect()
    }

    #[test]
    fn clean_page() {
        assert_eq!(codes(CLEAN), vec![]);
    }

    #[test]
    fn finds_every_rule() {
        let src = "<html>\n<head><title> </title></head>\n<h1 id=\"x\">A</h1>\n<h3 id=\"x\">B</h3>\n<img src=\"a.png\">\n<a href=\"#\"></a>\n<input type=\"text\">\n<iframe src=\"x.html\"></iframe>\n</html>";
        assert_eq!(
            codes(src),
            vec![
                (1, HTML_LANG),
                (2, EMPTY_TITLE),
                (4, DUPLICATE_ID),
                (4, HEADING_ORDER),
                (5, IMG_ALT),
                (6, EMPTY_LINK),
                (7, NO_LABEL),
                (8, IFRAME_TITLE),
            ]
        );
    }

    #[test]
    fn missing_title_is_reported_on_head() {
        let issues = check("<html lang=\"en\">\n<head></head><body></body></html>");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, NO_TITLE);
        assert_eq!(issues[0].line, 2);
        assert_eq!(issues[0].context, "<head>");
    }

    #[test]
    fn report_layout() {
        let issues = check("<html lang=\"en\"><title>t</title><img src=\"a.png\"></html>");
        let report = render_report("index.html", &issues);
        assert_eq!(
            report,
            format!(
                "Accessibility report for index.html\n\n1 errors, 0 warnings\n\n[Error] {IMG_ALT} (line 1)\n{}\n<img src=\"a.png\">\n",
                issues[0].message
            )
        );
        assert_eq!(
            render_report("a.html", &[]),
            "Accessibility report for a.html\n\nNo issues found!\n"
        );
    }

    #[test]
    fn writes_one_report_per_page_and_keeps_going() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("dist");
        let reports = tmp.path().join("reports");
        files::write(output.join("index.html"), CLEAN).unwrap();
        files::write(output.join("blog/post.html"), "<html><img src=\"a\"></html>").unwrap();
        // not utf-8, fails to read
        fs::write(output.join("broken.html"), [0xff, 0xfe, 0x00]).unwrap();

        let summary = run(&output, &reports).unwrap();
        assert_eq!(summary.pages, 2);
        assert_eq!(summary.failed, vec![output.join("broken.html")]);
        assert!(summary.errors >= 3);
        let post = fs::read_to_string(reports.join("blog/post.txt")).unwrap();
        assert!(post.starts_with("Accessibility report for blog/post.html"));
        assert!(reports.join("index.txt").is_file());
    }
}
