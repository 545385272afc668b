//! The named build tasks and the state they share.
//!
//! Every task is a plain synchronous function over a [`Context`]. Recoverable failures
//! (a stylesheet that does not compile, a page that does not render, a script the minifier
//! chokes on) are logged and the task carries on; everything else is returned.

use std::{fmt, fs, path::Path};

use parking_lot::Mutex;

use crate::{
    a11y,
    config::Config,
    document::Document,
    error::Result,
    files::{self, Select},
    html::{
        nav::NavClasses,
        pretty::{self, PrettyOptions},
        replace,
    },
    images::{self, IMAGE_EXTENSIONS},
    layout::{self, Layout, SCRIPT_BUNDLE, SCRIPT_BUNDLE_MIN, STYLE_BUNDLE_MIN},
    lint::{self, html::HtmlRules, js::JsRules, scss::ScssRules, Finding},
    livereload::LiveReload,
    scripts,
    styles::{self, StyleCompiler},
    templates::TemplateCache,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskId {
    Clean,
    CopyFonts,
    CopyVendorScripts,
    CopyVendorStyles,
    CopyImages,
    CompileStyles,
    CompileHtml,
    CompileScripts,
    ResetTemplates,
    PrettifyHtml,
    ConcatScripts,
    MinifyScripts,
    MinifyStyles,
    RewriteReferences,
    PublishDocs,
    LintStyles,
    LintHtml,
    LintScripts,
    Accessibility,
}

impl TaskId {
    pub fn name(self) -> &'static str {
        match self {
            TaskId::Clean => "clean",
            TaskId::CopyFonts => "copy-fonts",
            TaskId::CopyVendorScripts => "copy-vendor-js",
            TaskId::CopyVendorStyles => "copy-vendor-css",
            TaskId::CopyImages => "copy-images",
            TaskId::CompileStyles => "compile-scss",
            TaskId::CompileHtml => "compile-html",
            TaskId::CompileScripts => "compile-js",
            TaskId::ResetTemplates => "reset-templates",
            TaskId::PrettifyHtml => "prettify-html",
            TaskId::ConcatScripts => "concat-js",
            TaskId::MinifyScripts => "minify-js",
            TaskId::MinifyStyles => "minify-css",
            TaskId::RewriteReferences => "rewrite-references",
            TaskId::PublishDocs => "docs",
            TaskId::LintStyles => "lint-scss",
            TaskId::LintHtml => "lint-html",
            TaskId::LintScripts => "lint-js",
            TaskId::Accessibility => "accessibility",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the tasks of one run share.
#[derive(Debug)]
pub struct Context {
    pub config: Config,
    pub layout: Layout,
    templates: Mutex<TemplateCache>,
    styles: StyleCompiler,
    reload: LiveReload,
    findings: Mutex<Vec<Finding>>,
}

impl Context {
    pub fn new(config: Config, layout: Layout) -> Self {
        let include_paths = config
            .styles
            .include_paths
            .iter()
            .map(|p| layout.root.join(p))
            .collect();
        Self {
            templates: Mutex::new(TemplateCache::new(&layout)),
            styles: StyleCompiler::new(include_paths, config.styles.browsers.clone()),
            reload: LiveReload::new(&layout.output),
            findings: Mutex::new(Vec::new()),
            config,
            layout,
        }
    }

    pub fn reload(&self) -> &LiveReload {
        &self.reload
    }

    /// lint findings recorded so far
    pub fn findings(&self) -> Vec<Finding> {
        self.findings.lock().clone()
    }

    pub fn templates_loaded(&self) -> bool {
        self.templates.lock().is_loaded()
    }

    fn notify_all(&self, paths: &[impl AsRef<Path>]) {
        for path in paths {
            self.reload.notify(path.as_ref());
        }
    }

    fn record(&self, linter: &str, findings: Vec<Finding>) {
        lint::report(linter, &findings);
        self.findings.lock().extend(findings);
    }
}

pub fn run(ctx: &Context, task: TaskId) -> Result<()> {
    match task {
        TaskId::Clean => clean(ctx),
        TaskId::CopyFonts => copy(ctx, &ctx.layout.fonts(), &ctx.layout.out_fonts()),
        TaskId::CopyVendorScripts => copy(
            ctx,
            &ctx.layout.vendor_scripts(),
            &ctx.layout.out_vendor_scripts(),
        ),
        TaskId::CopyVendorStyles => copy(
            ctx,
            &ctx.layout.vendor_styles(),
            &ctx.layout.out_vendor_styles(),
        ),
        TaskId::CopyImages => copy_images(ctx),
        TaskId::CompileStyles => compile_styles(ctx),
        TaskId::CompileHtml => compile_html(ctx),
        TaskId::CompileScripts => compile_scripts(ctx),
        TaskId::ResetTemplates => {
            ctx.templates.lock().invalidate();
            Ok(())
        }
        TaskId::PrettifyHtml => prettify_html(ctx),
        TaskId::ConcatScripts => concat_scripts(ctx),
        TaskId::MinifyScripts => minify_scripts(ctx),
        TaskId::MinifyStyles => minify_styles(ctx),
        TaskId::RewriteReferences => rewrite_references(ctx),
        TaskId::PublishDocs => publish_docs(ctx),
        TaskId::LintStyles => lint_styles(ctx),
        TaskId::LintHtml => lint_html(ctx),
        TaskId::LintScripts => lint_scripts(ctx),
        TaskId::Accessibility => accessibility(ctx),
    }
}

fn clean(ctx: &Context) -> Result<()> {
    log::info!("Removing `{}`", ctx.layout.output.display());
    files::remove_dir(&ctx.layout.output)?;
    Ok(())
}

fn copy(ctx: &Context, from: &Path, to: &Path) -> Result<()> {
    let written = files::copy_tree(from, to, Select::All, true)?;
    log::info!("Copied {} file(s) to `{}`", written.len(), to.display());
    ctx.notify_all(&written);
    Ok(())
}

fn copy_images(ctx: &Context) -> Result<()> {
    let to = ctx.layout.out_images();
    let written = files::copy_with(
        ctx.layout.images(),
        &to,
        Select::Extensions(&IMAGE_EXTENSIONS),
        true,
        |path, bytes| match images::optimize(path, bytes.clone()) {
            Ok(optimized) => Ok(optimized),
            Err(err) => {
                log::warn!("Copying `{}` unoptimized: {err}", path.display());
                Ok(bytes)
            }
        },
    )?;
    log::info!("Copied {} image(s) to `{}`", written.len(), to.display());
    ctx.notify_all(&written);
    Ok(())
}

fn compile_styles(ctx: &Context) -> Result<()> {
    let styles_dir = ctx.layout.styles();
    for entry in ctx.layout.style_entries() {
        let dest = ctx.layout.compiled_style(&entry);
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match ctx.styles.compile(&entry, &styles_dir, &name) {
            Ok(compiled) => {
                files::write(&dest, &compiled.css)?;
                files::write(dest.with_extension("css.map"), compiled.map.to_json()?)?;
                log::info!("Compiled `{}`", dest.display());
                ctx.reload.notify(&dest);
            }
            Err(err) => log::error!("{err}"),
        }
    }
    Ok(())
}

fn compile_html(ctx: &Context) -> Result<()> {
    let mut templates = ctx.templates.lock();
    templates.refresh()?;
    let env = templates.env()?;
    let nav = NavClasses::from(&ctx.config.html);
    let default_layout = &ctx.config.html.default_layout;

    let mut written = Vec::new();
    for page in files::collect(ctx.layout.pages(), Select::Extensions(&["html", "md"]))? {
        let composed = Document::load(&ctx.layout, &page)
            .and_then(|doc| doc.create(env, &ctx.layout, default_layout, &nav).map(|_| doc));
        match composed {
            Ok(doc) => written.push(doc.output),
            Err(err) => log::error!("Failed to compose `{}`: {err}", page.display()),
        }
    }
    log::info!("Composed {} page(s)", written.len());
    ctx.notify_all(&written);
    Ok(())
}

fn compile_scripts(ctx: &Context) -> Result<()> {
    let from = ctx.layout.scripts();
    let to = ctx.layout.out_js();
    let written = files::copy_with(&from, &to, Select::Shallow(&["js"]), false, |_, bytes| {
        Ok(scripts::transpile(&String::from_utf8_lossy(&bytes)).into_bytes())
    })?;
    log::info!("Transpiled {} script(s)", written.len());
    ctx.notify_all(&written);
    Ok(())
}

/// rewrite every generated page in place when `edit` changes it
fn edit_pages(ctx: &Context, mut edit: impl FnMut(&Path, &str) -> String) -> Result<usize> {
    let mut changed = 0;
    for page in files::collect(&ctx.layout.output, Select::Extensions(&["html"]))? {
        let html = fs::read_to_string(&page)?;
        let edited = edit(&page, &html);
        if edited != html {
            fs::write(&page, edited)?;
            changed += 1;
        }
    }
    Ok(changed)
}

fn prettify_html(ctx: &Context) -> Result<()> {
    let options = PrettyOptions::from(&ctx.config.html);
    let changed = edit_pages(ctx, |_, html| pretty::prettify(html, &options))?;
    log::info!("Prettified {changed} page(s)");
    Ok(())
}

fn rewrite_references(ctx: &Context) -> Result<()> {
    let output = &ctx.layout.output;
    let changed = edit_pages(ctx, |page, html| {
        replace::rewrite_references(html, &layout::root_prefix(output, page))
    })?;
    log::info!("Rewrote bundle references in {changed} page(s)");
    Ok(())
}

fn concat_scripts(ctx: &Context) -> Result<()> {
    let inputs = scripts::bundle_inputs(
        &ctx.config.scripts.vendor_order,
        &ctx.layout.vendor_scripts(),
        &ctx.layout.scripts(),
    )?;
    let (mut code, map) = scripts::concat(SCRIPT_BUNDLE, &inputs, &ctx.layout.source)?;
    if !code.ends_with('\n') {
        code.push('\n');
    }
    code.push_str(&format!("//# sourceMappingURL={SCRIPT_BUNDLE}.map\n"));

    let dest = ctx.layout.out_js().join(SCRIPT_BUNDLE);
    files::write(&dest, code)?;
    files::write(dest.with_extension("js.map"), map.to_json()?)?;
    log::info!("Concatenated {} script(s) into `{}`", inputs.len(), dest.display());
    Ok(())
}

fn minify_scripts(ctx: &Context) -> Result<()> {
    let bundle = ctx.layout.out_js().join(SCRIPT_BUNDLE);
    let prepared = scripts::prepare_production(&fs::read_to_string(&bundle)?);
    let minified = scripts::minify(&prepared).unwrap_or_else(|err| {
        log::error!("{err}, writing the script unminified");
        prepared
    });
    let dest = ctx.layout.out_js().join(SCRIPT_BUNDLE_MIN);
    files::write(&dest, minified)?;
    log::info!("Minified `{}`", dest.display());
    Ok(())
}

fn minify_styles(ctx: &Context) -> Result<()> {
    let vendor = files::collect(ctx.layout.vendor_styles(), Select::Extensions(&["css"]))?;
    for (index, entry) in ctx.layout.style_entries().iter().enumerate() {
        let compiled = ctx.layout.compiled_style(entry);
        if !compiled.is_file() {
            log::warn!("`{}` was not compiled, skipping", compiled.display());
            continue;
        }
        let dest = if index == 0 {
            ctx.layout.out_css().join(STYLE_BUNDLE_MIN)
        } else {
            compiled.with_extension("min.css")
        };
        let mut inputs = vendor.clone();
        inputs.push(compiled);
        let css = match ctx.styles.bundle(&inputs, &dest) {
            Ok(css) => css,
            Err(err) => {
                log::error!("{err}, writing the stylesheet unminified");
                styles::concat(&inputs)?
            }
        };
        files::write(&dest, css)?;
        log::info!("Minified `{}`", dest.display());
    }
    Ok(())
}

fn publish_docs(ctx: &Context) -> Result<()> {
    let docs = &ctx.layout.docs;
    files::remove_dir(docs)?;
    files::copy_dir(&ctx.layout.output, docs)?;
    log::info!("Copied `{}` to `{}`", ctx.layout.output.display(), docs.display());
    Ok(())
}

fn lint_styles(ctx: &Context) -> Result<()> {
    let rules: ScssRules = lint::load_rules(&ctx.layout.root.join(&ctx.config.lint.scss))?;
    let mut findings = Vec::new();
    for file in files::collect(ctx.layout.styles(), Select::Extensions(&["scss"]))? {
        findings.extend(lint::scss::lint_file(&file, &rules)?);
    }
    ctx.record(lint::scss::LINTER, findings);
    Ok(())
}

fn lint_html(ctx: &Context) -> Result<()> {
    let rules: HtmlRules = lint::load_rules(&ctx.layout.root.join(&ctx.config.lint.html))?;
    let mut findings = Vec::new();
    for file in files::collect(&ctx.layout.output, Select::Extensions(&["html"]))? {
        findings.extend(lint::html::lint_file(&file, &rules)?);
    }
    ctx.record(lint::html::LINTER, findings);
    Ok(())
}

fn lint_scripts(ctx: &Context) -> Result<()> {
    let rules: JsRules = lint::load_rules(&ctx.layout.root.join(&ctx.config.lint.js))?;
    let mut findings = Vec::new();
    for file in files::collect(ctx.layout.scripts(), Select::Shallow(&["js"]))? {
        findings.extend(lint::js::lint_file(&file, &rules)?);
    }
    ctx.record(lint::js::LINTER, findings);
    Ok(())
}

fn accessibility(ctx: &Context) -> Result<()> {
    let summary = a11y::run(&ctx.layout.output, &ctx.layout.reports)?;
    log::info!(
        "Scanned {} page(s): {} errors, {} warnings, reports in `{}`",
        summary.pages,
        summary.errors,
        summary.warnings,
        ctx.layout.reports.display()
    );
    if !summary.failed.is_empty() {
        log::warn!("{} page(s) could not be scanned", summary.failed.len());
    }
    Ok(())
}
