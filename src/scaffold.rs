//! `sitepipe new`: a minimal project that builds and lints clean.

use std::{fs, io, path::Path};

use crate::{config::CONFIG_FILE, error::Result, files};

const CONFIG: &str = r#"[structure]
source = "src"
output = "dist"

[styles]
entry = "assets/scss/main.scss"
browsers = ["last 2 versions"]

[server]
port = 3000
"#;

const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<!-- build:css -->
<link rel="stylesheet" href="{{ root }}assets/css/main.css">
<!-- endbuild -->
</head>
<body>
{% include "nav" %}
<main>
{{ body }}
</main>
<!-- build:js -->
<script src="{{ root }}assets/js/custom.js"></script>
<!-- endbuild -->
</body>
</html>
"#;

const NAV: &str = r#"<nav>
<ul class="navbar-nav">
<li><a href="{{ root }}index.html">{{ site.name }}</a></li>
</ul>
</nav>
"#;

const INDEX: &str = r#"---
title: Home
---
<h1>{{ site.name }}</h1>
<p>Edit <code>src/pages/index.html</code> to get started.</p>
"#;

const SITE_DATA: &str = "name: My site\n";

const MAIN_SCSS: &str = r#"@use 'variables';

body {
  color: variables.$text;
  font-family: sans-serif;
}
"#;

const VARIABLES_SCSS: &str = "$text: #333;\n";

const SCRIPT: &str = r#"'use strict';

document.addEventListener('DOMContentLoaded', function () {
  //removeIf(production)
  console.log('document ready');
  //endRemoveIf(production)
});
"#;

const SCSS_LINT: &str = r#"linters:
  Indentation:
    width: 2
  ImportantRule:
    enabled: true
"#;

const HTML_LINT: &str = r#"{
  "attr-name-style": "dash",
  "attr-quote-style": "double",
  "line-max-len": 120
}
"#;

const JS_HINT: &str = r#"{
  "eqeqeq": true,
  "quotmark": "single",
  "strict": true,
  "maxlen": 120
}
"#;

/// Create a new project directory called `name`.
pub fn create_new(name: impl AsRef<Path>) -> Result<()> {
    let root = name.as_ref();
    if root.exists() && fs::read_dir(root)?.next().is_some() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("`{}` already exists and is not empty", root.display()),
        )
        .into());
    }

    let src = root.join("src");
    let contents = [
        (root.join(CONFIG_FILE), CONFIG),
        (root.join(".scss-lint.yml"), SCSS_LINT),
        (root.join(".htmllintrc"), HTML_LINT),
        (root.join(".jshintrc"), JS_HINT),
        (src.join("layouts/default.html"), LAYOUT),
        (src.join("partials/nav.html"), NAV),
        (src.join("pages/index.html"), INDEX),
        (src.join("data/site.yml"), SITE_DATA),
        (src.join("assets/scss/main.scss"), MAIN_SCSS),
        (src.join("assets/scss/_variables.scss"), VARIABLES_SCSS),
        (src.join("assets/js/custom.js"), SCRIPT),
    ];
    for (path, text) in contents {
        log::debug!("Creating `{}`", path.display());
        files::write(path, text)?;
    }
    for dir in ["images", "fonts", "vendor/js", "vendor/css"] {
        fs::create_dir_all(src.join("assets").join(dir))?;
    }
    log::info!("Created `{}`", root.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        lint::{self, html::HtmlRules, js::JsRules, scss::ScssRules},
    };
    use tempfile::TempDir;

    #[test]
    fn creates_a_loadable_project() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("site");
        create_new(&root).unwrap();

        assert!(root.join("src/pages/index.html").is_file());
        assert!(root.join("src/assets/vendor/js").is_dir());
        let config = Config::load(root.join(CONFIG_FILE)).unwrap();
        assert_eq!(config.structure.output, Path::new("dist"));

        let scss: ScssRules = lint::load_rules(&root.join(".scss-lint.yml")).unwrap();
        assert_eq!(scss.linters.indentation.width, 2);
        let html: HtmlRules = lint::load_rules(&root.join(".htmllintrc")).unwrap();
        assert_eq!(html.line_max_len, Some(120));
        let js: JsRules = lint::load_rules(&root.join(".jshintrc")).unwrap();
        assert_eq!(js.maxlen, Some(120));
    }

    #[test]
    fn refuses_non_empty_directory() {
        let tmp = TempDir::new().unwrap();
        files::write(tmp.path().join("keep.txt"), "x").unwrap();
        assert!(create_new(tmp.path()).is_err());
    }
}
