//! Style and correctness checks for stylesheets, generated pages and scripts.
//!
//! Linters never fail on findings: they collect them, report them and leave it to the
//! caller to turn "any findings" into a non-zero exit status.

pub mod html;
pub mod js;
pub mod scss;

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub linter: &'static str,
    pub file: PathBuf,
    pub line: usize,
    pub code: String,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} [{}]: ({}) {}",
            self.linter,
            self.file.display(),
            self.line,
            self.code,
            self.message
        )
    }
}

/// Load a rule file, falling back to the defaults when it does not exist.
pub fn load_rules<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.is_file() {
        log::debug!("No rule file at `{}`, using defaults", path.display());
        return Ok(T::default());
    }
    let text = fs::read_to_string(path)?;
    // `.htmllintrc` and `.jshintrc` are json, `.scss-lint.yml` is yaml
    let yaml = path.extension().is_some_and(|e| e == "yml" || e == "yaml");
    if yaml {
        Ok(serde_yml::from_str(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

/// Log every finding, or a clean bill of health.
pub fn report(linter: &str, findings: &[Finding]) {
    if findings.is_empty() {
        log::info!("[{linter}] no issues");
        return;
    }
    for finding in findings {
        log::warn!("{finding}");
    }
    log::warn!("[{linter}] {} issue(s)", findings.len());
}

/// trailing whitespace and overlong lines are shared by every linter
pub(crate) fn line_checks(
    linter: &'static str,
    file: &Path,
    text: &str,
    max_len: Option<usize>,
    trailing_code: Option<&str>,
    long_code: &str,
) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let finding = |code: &str, message: String| Finding {
            linter,
            file: file.to_path_buf(),
            line: index + 1,
            code: code.to_string(),
            message,
        };
        if let Some(code) = trailing_code {
            if line != line.trim_end() {
                findings.push(finding(code, "Trailing whitespace".into()));
            }
        }
        if let Some(max) = max_len {
            let len = line.chars().count();
            if len > max {
                findings.push(finding(
                    long_code,
                    format!("Line is too long ({len} > {max} characters)"),
                ));
            }
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finding_format() {
        let finding = Finding {
            linter: "htmllint",
            file: "dist/index.html".into(),
            line: 3,
            code: "img-req-alt".into(),
            message: "Img tag must have an alt attribute".into(),
        };
        assert_eq!(
            finding.to_string(),
            "[htmllint] dist/index.html [3]: (img-req-alt) Img tag must have an alt attribute"
        );
    }

    #[test]
    fn line_checks_flag_trailing_and_long_lines() {
        let findings = line_checks(
            "x",
            Path::new("a"),
            "ok\nbad  \n0123456789",
            Some(5),
            Some("T"),
            "L",
        );
        let codes: Vec<_> = findings.iter().map(|f| (f.line, f.code.as_str())).collect();
        assert_eq!(codes, vec![(2, "T"), (3, "L")]);
    }
}
