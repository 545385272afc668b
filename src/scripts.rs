//! Application scripts: the development pass, bundling and production minification.

use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::OnceLock,
};

use oxc_allocator::Allocator;
use oxc_codegen::{CodeGenerator, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use regex::Regex;

use crate::{
    error::{Error, Result},
    files::{self, Select},
    sourcemap::{Concat, SourceMap},
};

/// console methods treated as debug logging
const DEBUG_CALLS: [&str; 6] = ["log", "debug", "info", "trace", "dir", "table"];

/// keywords after which `/` opens a regex literal rather than dividing
const REGEX_KEYWORDS: [&str; 7] = ["return", "typeof", "case", "in", "of", "void", "delete"];

/// Development pass over an application script. Sources already target the browsers the
/// site supports, so the syntax is kept as written; line endings are normalised and the
/// file always ends in a newline.
pub fn transpile(source: &str) -> String {
    let mut out = source.replace("\r\n", "\n");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Which bytes of a script are code, as opposed to string, template, regex or comment
/// contents.
pub fn code_mask(source: &str) -> Vec<bool> {
    let bytes = source.as_bytes();
    let mut mask = vec![true; bytes.len()];
    let mut i = 0;
    // last significant code byte and its position, decide whether `/` starts a regex
    let mut prev: Option<u8> = None;
    let mut prev_at = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();
        let start = i;
        match b {
            b'/' if next == Some(b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if next == Some(b'*') => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            b'\'' | b'"' | b'`' => {
                i += 1;
                while i < bytes.len() && bytes[i] != b {
                    if bytes[i] == b'\\' {
                        i += 1;
                    } else if bytes[i] == b'\n' && b != b'`' {
                        break;
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                prev = Some(b'"');
            }
            b'/' if regex_can_start(bytes, prev, prev_at) => {
                i += 1;
                let mut class = false;
                while i < bytes.len() && bytes[i] != b'\n' {
                    match bytes[i] {
                        b'\\' => i += 1,
                        b'[' => class = true,
                        b']' => class = false,
                        b'/' if !class => break,
                        _ => {}
                    }
                    i += 1;
                }
                i = (i + 1).min(bytes.len());
                prev = Some(b'/');
            }
            _ => {
                if !b.is_ascii_whitespace() {
                    prev = Some(b);
                    prev_at = i;
                }
                i += 1;
                continue;
            }
        }
        // the opening delimiter stays code
        let end = i.min(bytes.len());
        for slot in mask.iter_mut().take(end).skip(start + 1) {
            *slot = false;
        }
    }
    mask
}

fn regex_can_start(bytes: &[u8], prev: Option<u8>, prev_at: usize) -> bool {
    let Some(p) = prev else { return true };
    if b"(,=:[!&|?{};+-*%<>~^".contains(&p) {
        return true;
    }
    if !ident_byte(p) {
        return false;
    }
    let mut start = prev_at;
    while start > 0 && ident_byte(bytes[start - 1]) {
        start -= 1;
    }
    let member = start > 0 && bytes[start - 1] == b'.';
    !member && REGEX_KEYWORDS.iter().any(|k| k.as_bytes() == &bytes[start..=prev_at])
}

fn dev_block() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| {
        Regex::new(concat!(
            r"(?s)(?://\s*removeIf\(production\)|/\*\s*removeIf\(production\)\s*\*/)",
            r".*?",
            r"(?://\s*endRemoveIf\(production\)[^\n]*|/\*\s*endRemoveIf\(production\)\s*\*/)",
        ))
        .expect("dev block pattern is valid")
    })
}

fn source_map_comment() -> &'static Regex {
    static COMMENT: OnceLock<Regex> = OnceLock::new();
    COMMENT.get_or_init(|| {
        Regex::new(r"(?m)^//# sourceMappingURL=.*$\n?").expect("source map pattern is valid")
    })
}

/// Remove code fenced by `removeIf(production)` / `endRemoveIf(production)` markers.
pub fn strip_dev_blocks(source: &str) -> String {
    dev_block().replace_all(source, "").into_owned()
}

fn ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Neutralise debug logging calls. Each call expression becomes `void 0` and whatever
/// follows it stays in place, so a braceless `if`/`for`/`else` body keeps its statement.
pub fn strip_console(source: &str) -> String {
    let bytes = source.as_bytes();
    let mask = code_mask(source);
    let mut out = String::with_capacity(source.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(found) = source[search..].find("console") {
        let at = search + found;
        search = at + "console".len();
        if !mask[at] || (at > 0 && (ident_byte(bytes[at - 1]) || bytes[at - 1] == b'.')) {
            continue;
        }
        let mut i = search;
        let skip_ws = |mut i: usize| {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            i
        };
        i = skip_ws(i);
        if bytes.get(i) != Some(&b'.') {
            continue;
        }
        i = skip_ws(i + 1);
        let name_start = i;
        while i < bytes.len() && ident_byte(bytes[i]) {
            i += 1;
        }
        if !DEBUG_CALLS.contains(&&source[name_start..i]) {
            continue;
        }
        i = skip_ws(i);
        if bytes.get(i) != Some(&b'(') {
            continue;
        }
        let mut depth = 0usize;
        let mut end = None;
        while i < bytes.len() {
            if mask[i] {
                match bytes[i] {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            end = Some(i + 1);
                            break;
                        }
                    }
                    _ => {}
                }
            }
            i += 1;
        }
        let Some(end) = end else { break };
        out.push_str(&source[copied..at]);
        out.push_str("void 0");
        copied = end;
        search = end;
    }
    out.push_str(&source[copied..]);
    out
}

/// Everything a production script must not carry: dev blocks, debug logging and the
/// development source map reference.
pub fn prepare_production(source: &str) -> String {
    let stripped = strip_dev_blocks(source);
    let stripped = strip_console(&stripped);
    source_map_comment().replace_all(&stripped, "").into_owned()
}

/// Compress a classic (non-module) script. A panic inside the compressor is reported as
/// a [`Error::MinifyError`] like any parse failure.
pub fn minify(source: &str) -> Result<String> {
    panic::catch_unwind(AssertUnwindSafe(|| compress(source))).unwrap_or_else(|payload| {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "compressor panicked".to_string());
        Err(Error::MinifyError(reason))
    })
}

fn compress(source: &str) -> Result<String> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if let Some(err) = parsed.errors.first() {
        return Err(Error::MinifyError(err.to_string()));
    }
    if parsed.panicked {
        return Err(Error::MinifyError("unrecoverable syntax error".into()));
    }
    let mut program = parsed.program;
    let minified = Minifier::new(MinifierOptions::default()).build(&allocator, &mut program);
    let code = CodeGenerator::new()
        .with_options(CodegenOptions {
            minify: true,
            ..CodegenOptions::default()
        })
        .with_mangler(minified.mangler)
        .build(&program)
        .code;
    Ok(code)
}

/// The scripts that make up the bundle: the listed vendor scripts in the given order,
/// then every application script by name.
pub fn bundle_inputs(
    vendor_order: &[String],
    vendor_dir: &Path,
    app_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for name in vendor_order {
        let path = vendor_dir.join(name);
        if path.is_file() {
            inputs.push(path);
        } else {
            log::warn!("Vendor script `{}` is missing", path.display());
        }
    }
    for path in files::collect(app_dir, Select::Shallow(&["js"]))? {
        if !inputs.contains(&path) {
            inputs.push(path);
        }
    }
    Ok(inputs)
}

/// Concatenate `inputs` into `file`, mapping each line back to its source. Source names
/// are recorded relative to `relative_to` when possible.
pub fn concat(file: &str, inputs: &[PathBuf], relative_to: &Path) -> Result<(String, SourceMap)> {
    let mut concat = Concat::new(file, "\n");
    for input in inputs {
        let name = input
            .strip_prefix(relative_to)
            .unwrap_or(input)
            .to_string_lossy()
            .replace('\\', "/");
        concat.add(name, &fs::read_to_string(input)?);
    }
    Ok(concat.finish())
}
