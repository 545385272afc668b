//! Version 3 source maps for concatenated bundles.

use serde::Serialize;

use crate::error::Result;

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    pub file: String,
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub names: Vec<String>,
    pub mappings: String,
}

/// base64 vlq, as used by the `mappings` field
pub fn vlq(value: i64, out: &mut String) {
    let mut rest = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = rest & 0b11111;
        rest >>= 5;
        if rest > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit as usize] as char);
        if rest == 0 {
            break;
        }
    }
}

impl SourceMap {
    /// a map that only carries the sources, for outputs whose positions are unknown
    pub fn sources_only(file: impl Into<String>, sources: Vec<(String, String)>) -> Self {
        let (sources, sources_content) = sources.into_iter().unzip();
        Self {
            version: 3,
            file: file.into(),
            sources,
            sources_content,
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Concatenates sources line by line while recording where every output line came from.
#[derive(Debug)]
pub struct Concat {
    file: String,
    separator: String,
    code: String,
    sources: Vec<(String, String)>,
    mappings: String,
    // previous segment state, mappings fields are deltas
    last_source: i64,
    last_line: i64,
    started: bool,
}

impl Concat {
    pub fn new(file: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            separator: separator.into(),
            code: String::new(),
            sources: Vec::new(),
            mappings: String::new(),
            last_source: 0,
            last_line: 0,
            started: false,
        }
    }

    pub fn add(&mut self, name: impl Into<String>, content: &str) {
        if self.started {
            self.code.push_str(&self.separator);
            for _ in 0..self.separator.matches('\n').count() {
                self.mappings.push(';');
            }
        }
        self.started = true;

        let source = self.sources.len() as i64;
        self.sources.push((name.into(), content.to_string()));
        let mut lines = content.split('\n').peekable();
        let mut line_no = 0i64;
        while let Some(line) = lines.next() {
            if !line.is_empty() {
                // generated column 0, then source, line and column deltas
                vlq(0, &mut self.mappings);
                vlq(source - self.last_source, &mut self.mappings);
                vlq(line_no - self.last_line, &mut self.mappings);
                vlq(0, &mut self.mappings);
                self.last_source = source;
                self.last_line = line_no;
            }
            self.code.push_str(line);
            if lines.peek().is_some() {
                self.code.push('\n');
                self.mappings.push(';');
            }
            line_no += 1;
        }
    }

    pub fn finish(self) -> (String, SourceMap) {
        let (sources, sources_content) = self.sources.into_iter().unzip();
        let map = SourceMap {
            version: 3,
            file: self.file,
            sources,
            sources_content,
            names: Vec::new(),
            mappings: self.mappings,
        };
        (self.code, map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: i64) -> String {
        let mut out = String::new();
        vlq(value, &mut out);
        out
    }

    #[test]
    fn vlq_known_values() {
        assert_eq!(encoded(0), "A");
        assert_eq!(encoded(1), "C");
        assert_eq!(encoded(-1), "D");
        assert_eq!(encoded(15), "e");
        assert_eq!(encoded(16), "gB");
        assert_eq!(encoded(-17), "jB");
    }

    #[test]
    fn concat_maps_each_line_to_its_source() {
        let mut concat = Concat::new("main.js", "\n");
        concat.add("a.js", "var a;\nvar b;");
        concat.add("b.js", "go();");
        let (code, map) = concat.finish();
        assert_eq!(code, "var a;\nvar b;\ngo();");
        assert_eq!(map.sources, vec!["a.js", "b.js"]);
        // a.js:0, a.js:1, then b.js:0 (source +1, line -1)
        assert_eq!(map.mappings, "AAAA;AACA;ACDA");
        assert_eq!(map.sources_content[1], "go();");
    }

    #[test]
    fn blank_lines_have_no_segments() {
        let mut concat = Concat::new("x.js", "\n");
        concat.add("a.js", "a\n\nb");
        let (_, map) = concat.finish();
        assert_eq!(map.mappings, "AAAA;;AAEA");
    }

    #[test]
    fn json_uses_camel_case() {
        let map = SourceMap::sources_only("main.css", vec![("main.scss".into(), "a{}".into())]);
        let json = map.to_json().unwrap();
        assert!(json.contains("\"sourcesContent\":[\"a{}\"]"));
        assert!(json.contains("\"version\":3"));
    }
}
