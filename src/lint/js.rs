//! Checks over the application scripts.

use std::{fs, path::Path};

use serde::Deserialize;

use super::{line_checks, Finding};
use crate::{error::Result, scripts::code_mask};

pub const LINTER: &str = "jshint";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum QuoteMark {
    /// `true` only asks for consistency, `false` disables the check
    Consistent(bool),
    /// `single` or `double`
    Style(String),
}

/// `.jshintrc`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JsRules {
    pub eqeqeq: bool,
    /// allow `debugger` statements
    pub debug: bool,
    pub quotmark: QuoteMark,
    pub maxlen: Option<usize>,
    pub strict: bool,
}

impl Default for JsRules {
    fn default() -> Self {
        Self {
            eqeqeq: true,
            debug: false,
            quotmark: QuoteMark::Style("single".into()),
            maxlen: None,
            strict: true,
        }
    }
}

fn line_of(starts: &[usize], at: usize) -> usize {
    starts.partition_point(|s| *s <= at)
}

fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

pub fn lint_source(file: &Path, src: &str, rules: &JsRules) -> Vec<Finding> {
    let bytes = src.as_bytes();
    let mask = code_mask(src);
    let starts: Vec<usize> = std::iter::once(0)
        .chain(src.match_indices('\n').map(|(i, _)| i + 1))
        .collect();
    let mut findings = Vec::new();
    let mut push = |at: usize, code: &str, message: String| {
        findings.push(Finding {
            linter: LINTER,
            file: file.to_path_buf(),
            line: line_of(&starts, at),
            code: code.to_string(),
            message,
        })
    };

    if rules.strict && !src.contains("'use strict'") && !src.contains("\"use strict\"") {
        push(0, "E007", "Missing \"use strict\" statement.".into());
    }

    let mut first_quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        if !mask[i] {
            i += 1;
            continue;
        }
        let b = bytes[i];
        match b {
            b'=' | b'!' if rules.eqeqeq && bytes.get(i + 1) == Some(&b'=') => {
                let prev = i.checked_sub(1).map(|p| bytes[p]);
                let strict = bytes.get(i + 2) == Some(&b'=');
                if !strict && !matches!(prev, Some(b'=' | b'!' | b'<' | b'>')) {
                    let (want, saw) = if b == b'=' { ("===", "==") } else { ("!==", "!=") };
                    push(i, "W116", format!("Expected '{want}' and instead saw '{saw}'."));
                }
                i += if strict { 3 } else { 2 };
                continue;
            }
            b'\'' | b'"' => match &rules.quotmark {
                QuoteMark::Style(style) => {
                    let wanted = if style == "double" { b'"' } else { b'\'' };
                    if b != wanted {
                        let name = if wanted == b'"' { "doublequote" } else { "singlequote" };
                        push(i, "W109", format!("Strings must use {name}."));
                    }
                }
                QuoteMark::Consistent(true) => {
                    if *first_quote.get_or_insert(b) != b {
                        push(i, "W110", "Mixed double and single quotes.".into());
                    }
                }
                QuoteMark::Consistent(false) => {}
            },
            b'd' if !rules.debug
                && src[i..].starts_with("debugger")
                && (i == 0 || !is_word(bytes[i - 1]))
                && !bytes.get(i + 8).copied().is_some_and(is_word) =>
            {
                push(i, "W087", "Forgotten 'debugger' statement?".into());
            }
            _ => {}
        }
        i += 1;
    }

    findings.extend(line_checks(LINTER, file, src, rules.maxlen, None, "W101"));
    findings.sort_by_key(|f| f.line);
    findings
}

pub fn lint_file(file: &Path, rules: &JsRules) -> Result<Vec<Finding>> {
    let src = fs::read_to_string(file)?;
    Ok(lint_source(file, &src, rules))
}
