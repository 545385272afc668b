use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

const FENCE: &str = "---";

/// the front matter associated with a page
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub layout: Option<String>,
    // everything else is handed to the templates untouched
    #[serde(flatten)]
    pub meta: BTreeMap<String, serde_yml::Value>,
}

impl Metadata {
    /// fill in anything unset from `other`, keys already present win
    pub fn merge(mut self, other: impl Into<Metadata>) -> Self {
        let other = other.into();
        self.title = self.title.or(other.title);
        self.layout = self.layout.or(other.layout);
        for (key, value) in other.meta {
            self.meta.entry(key).or_insert(value);
        }
        self
    }

    pub fn layout_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.layout.as_deref().unwrap_or(default)
    }
}

/// Split a page into its front matter and body. A page without a leading `---` fence
/// has empty metadata and is all body.
pub fn split(text: &str) -> Result<(Metadata, &str)> {
    let Some(rest) = text.strip_prefix(FENCE) else {
        return Ok((Metadata::default(), text));
    };
    let Some(rest) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return Ok((Metadata::default(), text));
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == FENCE {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            let meta = if yaml.trim().is_empty() {
                Metadata::default()
            } else {
                serde_yml::from_str(yaml)?
            };
            return Ok((meta, body));
        }
        offset += line.len();
    }
    // an unterminated fence is ordinary content
    Ok((Metadata::default(), text))
}
