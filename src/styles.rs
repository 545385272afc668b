//! Stylesheets: Sass compilation, vendor prefixing and bundling.

use std::{
    fs,
    path::{Path, PathBuf},
};

use lightningcss::{
    stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet},
    targets::{Browsers, Targets},
};

use crate::{
    error::{Error, Result},
    files::{self, Select},
    sourcemap::SourceMap,
};

/// Turns a root stylesheet and its partials into browser-ready css.
#[derive(Debug, Clone)]
pub struct StyleCompiler {
    include_paths: Vec<PathBuf>,
    browsers: Vec<String>,
}

/// Output of one stylesheet entry.
#[derive(Debug)]
pub struct CompiledStyle {
    pub css: String,
    pub map: SourceMap,
}

impl StyleCompiler {
    pub fn new(include_paths: Vec<PathBuf>, browsers: Vec<String>) -> Self {
        Self {
            include_paths,
            browsers,
        }
    }

    fn targets(&self, path: &Path) -> Result<Targets> {
        let browsers = Browsers::from_browserslist(self.browsers.iter().map(String::as_str))
            .map_err(|err| Error::CssError {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        Ok(Targets {
            browsers,
            ..Targets::default()
        })
    }

    /// Sass to expanded css
    pub fn compile_sass(&self, entry: &Path) -> Result<String> {
        let options = grass::Options::default()
            .style(grass::OutputStyle::Expanded)
            .load_paths(&self.include_paths);
        grass::from_path(entry, &options).map_err(|err| Error::SassError {
            path: entry.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Add the vendor prefixes the browser targets need, optionally compressing.
    pub fn process(&self, css: &str, path: &Path, minify: bool) -> Result<String> {
        let css_error = |message: String| Error::CssError {
            path: path.to_path_buf(),
            message,
        };
        let targets = self.targets(path)?;
        let options = ParserOptions {
            filename: path.to_string_lossy().into_owned(),
            ..ParserOptions::default()
        };
        let mut sheet = StyleSheet::parse(css, options).map_err(|err| css_error(err.to_string()))?;
        sheet
            .minify(MinifyOptions {
                targets: targets.clone(),
                ..MinifyOptions::default()
            })
            .map_err(|err| css_error(err.to_string()))?;
        let printed = sheet
            .to_css(PrinterOptions {
                minify,
                targets,
                ..PrinterOptions::default()
            })
            .map_err(|err| css_error(err.to_string()))?;
        Ok(printed.code)
    }

    /// Compile one root stylesheet. The map lists the entry and every partial next to it;
    /// the Sass compiler does not report positions so it carries no mappings.
    pub fn compile(
        &self,
        entry: &Path,
        styles_dir: &Path,
        output_name: &str,
    ) -> Result<CompiledStyle> {
        let expanded = self.compile_sass(entry)?;
        let mut css = self.process(&expanded, entry, false)?;
        if !css.ends_with('\n') {
            css.push('\n');
        }
        css.push_str(&format!("/*# sourceMappingURL={output_name}.map */\n"));

        let mut sources = Vec::new();
        for file in files::collect(styles_dir, Select::Extensions(&["scss", "sass"]))? {
            let name = file
                .strip_prefix(styles_dir)
                .unwrap_or(&file)
                .to_string_lossy()
                .replace('\\', "/");
            sources.push((name, fs::read_to_string(&file)?));
        }
        Ok(CompiledStyle {
            css,
            map: SourceMap::sources_only(output_name, sources),
        })
    }

    /// Concatenate `inputs` in order and compress them into one stylesheet.
    pub fn bundle(&self, inputs: &[PathBuf], output: &Path) -> Result<String> {
        self.process(&concat(inputs)?, output, true)
    }
}

/// `inputs` joined in order, without their source map references
pub fn concat(inputs: &[PathBuf]) -> Result<String> {
    let mut joined = String::new();
    for input in inputs {
        let text = fs::read_to_string(input)?;
        joined.push_str(strip_map_comment(&text));
        if !joined.ends_with('\n') {
            joined.push('\n');
        }
    }
    Ok(joined)
}

fn strip_map_comment(css: &str) -> &str {
    match css.rfind("/*# sourceMappingURL=") {
        Some(at) => &css[..at],
        None => css,
    }
}
