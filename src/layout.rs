use std::path::{Path, PathBuf};

use crate::config::Config;

/// Fixed bundle names written by the production sequence.
pub const SCRIPT_BUNDLE: &str = "main.js";
pub const SCRIPT_BUNDLE_MIN: &str = "main.min.js";
pub const STYLE_BUNDLE_MIN: &str = "main.min.css";

/// The filesystem contract shared by every task: where sources are read from and where
/// their outputs land. Everything hangs off the configured roots.
#[derive(Debug, Clone)]
pub struct Layout {
    /// project directory, where the config and lint rule files live
    pub root: PathBuf,
    pub source: PathBuf,
    pub output: PathBuf,
    pub reports: PathBuf,
    pub docs: PathBuf,
    style_entry: PathBuf,
    rtl_entry: Option<PathBuf>,
    scripts: PathBuf,
}

impl Layout {
    pub fn new(config: &Config) -> Self {
        let source = config.structure.source.clone();
        Self {
            root: PathBuf::new(),
            style_entry: source.join(&config.styles.entry),
            rtl_entry: config.styles.rtl_entry.as_ref().map(|p| source.join(p)),
            scripts: source.join(&config.scripts.dir),
            source,
            output: config.structure.output.clone(),
            reports: config.structure.reports.clone(),
            docs: config.structure.docs.clone(),
        }
    }

    /// resolve every root against a project directory
    pub fn rooted(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.root = root.to_path_buf();
        self.source = root.join(&self.source);
        self.output = root.join(&self.output);
        self.reports = root.join(&self.reports);
        self.docs = root.join(&self.docs);
        self.style_entry = root.join(&self.style_entry);
        self.rtl_entry = self.rtl_entry.map(|p| root.join(p));
        self.scripts = root.join(&self.scripts);
        self
    }

    // source side

    pub fn pages(&self) -> PathBuf {
        self.source.join("pages")
    }

    pub fn layouts(&self) -> PathBuf {
        self.source.join("layouts")
    }

    pub fn partials(&self) -> PathBuf {
        self.source.join("partials")
    }

    pub fn data(&self) -> PathBuf {
        self.source.join("data")
    }

    pub fn assets(&self) -> PathBuf {
        self.source.join("assets")
    }

    pub fn styles(&self) -> PathBuf {
        self.style_entry
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.assets().join("scss"))
    }

    /// the root stylesheet plus the rtl variant when present on disk
    pub fn style_entries(&self) -> Vec<PathBuf> {
        let mut entries = vec![self.style_entry.clone()];
        if let Some(rtl) = self.rtl_entry.as_ref().filter(|p| p.is_file()) {
            entries.push(rtl.clone());
        }
        entries
    }

    pub fn scripts(&self) -> PathBuf {
        self.scripts.clone()
    }

    /// `images/`, or `img/` when only that exists
    pub fn images(&self) -> PathBuf {
        self.asset_dir(&["images", "img"])
    }

    /// `fonts/`, or `font/` when only that exists
    pub fn fonts(&self) -> PathBuf {
        self.asset_dir(&["fonts", "font"])
    }

    fn asset_dir(&self, names: &[&str]) -> PathBuf {
        let assets = self.assets();
        names
            .iter()
            .map(|name| assets.join(name))
            .find(|dir| dir.is_dir())
            .unwrap_or_else(|| assets.join(names[0]))
    }

    pub fn vendor_scripts(&self) -> PathBuf {
        self.assets().join("vendor").join("js")
    }

    pub fn vendor_styles(&self) -> PathBuf {
        self.assets().join("vendor").join("css")
    }

    // output side

    pub fn out_assets(&self) -> PathBuf {
        self.output.join("assets")
    }

    pub fn out_css(&self) -> PathBuf {
        self.out_assets().join("css")
    }

    pub fn out_js(&self) -> PathBuf {
        self.out_assets().join("js")
    }

    pub fn out_images(&self) -> PathBuf {
        self.out_assets().join("images")
    }

    pub fn out_fonts(&self) -> PathBuf {
        self.out_assets().join("fonts")
    }

    pub fn out_vendor_scripts(&self) -> PathBuf {
        self.out_assets().join("vendor").join("js")
    }

    pub fn out_vendor_styles(&self) -> PathBuf {
        self.out_assets().join("vendor").join("css")
    }

    /// compiled css for a stylesheet entry, `main.scss` -> `dist/assets/css/main.css`
    pub fn compiled_style(&self, entry: &Path) -> PathBuf {
        let stem = entry.file_stem().unwrap_or_default();
        self.out_css().join(stem).with_extension("css")
    }

    /// where a page lands in the output tree, `pages/blog/post.md` -> `dist/blog/post.html`
    pub fn page_output(&self, page: &Path) -> Option<PathBuf> {
        let relative = page.strip_prefix(self.pages()).ok()?;
        Some(self.output.join(relative).with_extension("html"))
    }
}

/// The url path a generated file is served under, always `/`-separated.
pub fn url_path(output_root: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(output_root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!("/{}", parts.join("/")))
}

/// Relative prefix that climbs from a generated file back to the output root.
pub fn root_prefix(output_root: &Path, file: &Path) -> String {
    let depth = file
        .strip_prefix(output_root)
        .map(|p| p.components().count().saturating_sub(1))
        .unwrap_or(0);
    "../".repeat(depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Layout {
        Layout::new(&Config::default())
    }

    #[test]
    fn page_output_mirrors_source_tree() {
        let layout = layout();
        assert_eq!(
            layout.page_output(Path::new("src/pages/blog/post.md")),
            Some(PathBuf::from("dist/blog/post.html"))
        );
        assert_eq!(layout.page_output(Path::new("elsewhere/page.html")), None);
    }

    #[test]
    fn compiled_style_keeps_entry_stem() {
        let layout = layout();
        assert_eq!(
            layout.compiled_style(Path::new("src/assets/scss/main-rtl.scss")),
            PathBuf::from("dist/assets/css/main-rtl.css")
        );
    }

    #[test]
    fn url_and_root_prefix() {
        let out = Path::new("dist");
        assert_eq!(
            url_path(out, Path::new("dist/blog/post.html")).as_deref(),
            Some("/blog/post.html")
        );
        assert_eq!(root_prefix(out, Path::new("dist/index.html")), "");
        assert_eq!(root_prefix(out, Path::new("dist/blog/post.html")), "../");
    }

    #[test]
    fn short_asset_dir_names() {
        let tmp = tempfile::TempDir::new().unwrap();
        let layout = layout().rooted(tmp.path());
        assert_eq!(layout.images(), tmp.path().join("src/assets/images"));
        std::fs::create_dir_all(tmp.path().join("src/assets/img")).unwrap();
        assert_eq!(layout.images(), tmp.path().join("src/assets/img"));
        assert_eq!(layout.out_images(), tmp.path().join("dist/assets/images"));
        assert_eq!(layout.fonts(), tmp.path().join("src/assets/fonts"));
    }

    #[test]
    fn rtl_entry_only_when_present() {
        let layout = layout();
        assert_eq!(layout.style_entries().len(), 1);
        assert_eq!(layout.styles(), PathBuf::from("src/assets/scss"));
    }
}
