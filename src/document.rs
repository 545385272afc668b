use minijinja::{context, Environment, Value};
use pulldown_cmark::{Options, Parser};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    html::nav::{self, NavClasses},
    layout::{self, Layout},
    metadata::{self, Metadata},
    templates::layout_name,
};

/// a page: its front matter, its body and where it ends up
#[derive(Debug)]
pub struct Document {
    pub source: PathBuf,
    pub output: PathBuf,
    pub metadata: Metadata,
    pub body: String,
    markdown: bool,
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

impl Document {
    pub fn load(layout: &Layout, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let output = layout
            .page_output(path)
            .ok_or_else(|| Error::PageError(path.to_path_buf()))?;
        let text = fs::read_to_string(path)?;
        let (metadata, body) = metadata::split(&text)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| Error::PageError(path.to_path_buf()))?;
        let metadata = metadata.merge(Metadata {
            title: Some(stem),
            ..Default::default()
        });
        Ok(Self {
            source: path.to_path_buf(),
            output,
            metadata,
            body: body.to_string(),
            markdown: path.extension().is_some_and(|e| e == "md"),
        })
    }

    pub fn name(&self) -> String {
        self.source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Compose the page: render its body, substitute it into its layout and mark the
    /// navigation link for this page.
    pub fn render(
        &self,
        env: &Environment<'_>,
        layout: &Layout,
        default_layout: &str,
        nav_classes: &NavClasses,
    ) -> Result<String> {
        let root = layout::root_prefix(&layout.output, &self.output);
        let url = layout::url_path(&layout.output, &self.output).unwrap_or_else(|| "/".into());
        let ctx = context! {
            page => self.name(),
            root => root,
            url => url,
            title => self.metadata.title.clone(),
            ..Value::from_serialize(&self.metadata.meta)
        };

        let mut body = env.render_str(&self.body, ctx.clone())?;
        if self.markdown {
            let mut html = String::new();
            pulldown_cmark::html::push_html(&mut html, Parser::new_ext(&body, markdown_options()));
            body = html;
        }

        let chosen = self.metadata.layout_or(default_layout);
        let template = env
            .get_template(&layout_name(chosen))
            .map_err(|_| Error::MissingLayout {
                page: self.source.clone(),
                layout: chosen.to_string(),
            })?;
        let composed = template.render(context! { body => body, ..ctx })?;
        Ok(nav::mark_active(&composed, &url, nav_classes))
    }

    pub fn create(
        &self,
        env: &Environment<'_>,
        layout: &Layout,
        default_layout: &str,
        nav_classes: &NavClasses,
    ) -> Result<()> {
        let contents = self.render(env, layout, default_layout, nav_classes)?;
        log::debug!("Creating `{}`", self.output.display());
        crate::files::write(&self.output, contents)?;
        Ok(())
    }
}
