use std::{
    fs,
    path::{Path, PathBuf},
};

use minijinja::{AutoEscape, Environment, Value};

use crate::{
    error::Result,
    files::{self, Select},
    layout::Layout,
};

const LAYOUT_PREFIX: &str = "layouts/";

/// The parsed layouts, partials and data files used to compose pages.
///
/// Nothing is reloaded behind the caller's back: an edited layout is only picked up after
/// [`TemplateCache::refresh`] (or after [`TemplateCache::invalidate`] and the next
/// [`TemplateCache::env`]).
#[derive(Debug)]
pub struct TemplateCache {
    env: Environment<'static>,
    layouts: PathBuf,
    partials: PathBuf,
    data: PathBuf,
    loaded: bool,
}

/// the name a layout is registered under
pub fn layout_name(layout: &str) -> String {
    format!("{LAYOUT_PREFIX}{layout}")
}

fn fresh_env() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.set_keep_trailing_newline(true);
    env
}

/// relative path without extension, always `/`-separated
fn template_name(root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

impl TemplateCache {
    pub fn new(layout: &Layout) -> Self {
        Self {
            env: fresh_env(),
            layouts: layout.layouts(),
            partials: layout.partials(),
            data: layout.data(),
            loaded: false,
        }
    }

    /// drop every parsed template, nothing is read until the next use
    pub fn invalidate(&mut self) {
        self.env = fresh_env();
        self.loaded = false;
    }

    /// drop every parsed template and reload layouts, partials and data from disk
    pub fn refresh(&mut self) -> Result<()> {
        self.invalidate();
        let mut env = fresh_env();

        for file in files::collect(&self.layouts, Select::Extensions(&["html"]))? {
            if let Some(name) = template_name(&self.layouts, &file) {
                log::debug!("Loading layout `{name}`");
                env.add_template_owned(layout_name(&name), fs::read_to_string(&file)?)?;
            }
        }
        for file in files::collect(&self.partials, Select::Extensions(&["html"]))? {
            if let Some(name) = template_name(&self.partials, &file) {
                log::debug!("Loading partial `{name}`");
                env.add_template_owned(name, fs::read_to_string(&file)?)?;
            }
        }
        for file in files::collect(&self.data, Select::Extensions(&["yml", "yaml", "json"]))? {
            let Some(name) = file.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let text = fs::read_to_string(&file)?;
            let value = if file.extension().is_some_and(|e| e == "json") {
                Value::from_serialize(serde_json::from_str::<serde_json::Value>(&text)?)
            } else {
                Value::from_serialize(serde_yml::from_str::<serde_yml::Value>(&text)?)
            };
            env.add_global(name, value);
        }

        self.env = env;
        self.loaded = true;
        Ok(())
    }

    /// the environment, loading it first if it was invalidated
    pub fn env(&mut self) -> Result<&Environment<'static>> {
        if !self.loaded {
            self.refresh()?;
        }
        Ok(&self.env)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn has_layout(&self, layout: &str) -> bool {
        self.env.get_template(&layout_name(layout)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use minijinja::context;
    use tempfile::TempDir;

    fn project() -> (TempDir, Layout) {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(&Config::default()).rooted(tmp.path());
        files::write(
            layout.layouts().join("default.html"),
            "<main>{% include \"nav\" %}{{ body }}</main>",
        )
        .unwrap();
        files::write(layout.partials().join("nav.html"), "<nav>{{ site.name }}</nav>").unwrap();
        files::write(layout.data().join("site.yml"), "name: Demo\n").unwrap();
        (tmp, layout)
    }

    #[test]
    fn loads_layouts_partials_and_data() {
        let (_tmp, layout) = project();
        let mut cache = TemplateCache::new(&layout);
        let env = cache.env().unwrap();
        let html = env
            .get_template(&layout_name("default"))
            .unwrap()
            .render(context! { body => "<p>x</p>" })
            .unwrap();
        assert_eq!(html, "<main><nav>Demo</nav><p>x</p></main>");
        assert!(cache.has_layout("default"));
        assert!(!cache.has_layout("missing"));
    }

    #[test]
    fn edits_are_invisible_until_refresh() {
        let (_tmp, layout) = project();
        let mut cache = TemplateCache::new(&layout);
        cache.refresh().unwrap();
        files::write(layout.partials().join("nav.html"), "<nav>changed</nav>").unwrap();

        let render = |cache: &mut TemplateCache| {
            cache
                .env()
                .unwrap()
                .get_template("nav")
                .unwrap()
                .render(context! { site => context! { name => "Demo" } })
                .unwrap()
        };
        assert_eq!(render(&mut cache), "<nav>Demo</nav>");
        cache.refresh().unwrap();
        assert_eq!(render(&mut cache), "<nav>changed</nav>");
    }

    #[test]
    fn invalidate_defers_reload() {
        let (_tmp, layout) = project();
        let mut cache = TemplateCache::new(&layout);
        cache.refresh().unwrap();
        cache.invalidate();
        assert!(!cache.is_loaded());
        cache.env().unwrap();
        assert!(cache.is_loaded());
    }

    #[test]
    fn nested_partials_use_slash_names() {
        assert_eq!(
            template_name(Path::new("p"), Path::new("p/blocks/card.html")).as_deref(),
            Some("blocks/card")
        );
    }
}
