use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::{Error, Figment, Metadata, Provider};
use serde::{Deserialize, Serialize};

/// default directory values
pub const SRC_DIR: &str = "src";
pub const OUT_DIR: &str = "dist";
pub const REPORT_DIR: &str = "accessibility-reports";
pub const DOCS_DIR: &str = "docs";
pub const CONFIG_FILE: &str = "sitepipe.toml";
pub const ENV_PREFIX: &str = "SITEPIPE_";

/// config for managing the pipeline
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub structure: ConfigStructure,
    pub styles: ConfigStyles,
    pub scripts: ConfigScripts,
    pub html: ConfigHtml,
    pub lint: ConfigLint,
    pub server: ConfigServer,
    pub watch: ConfigWatch,
}

/// config for defining the layout of the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigStructure {
    /// the directory holding pages, layouts, partials and assets
    pub source: PathBuf,
    /// the publishable site, removed and regenerated on every build
    pub output: PathBuf,
    /// accessibility reports, one text file per page
    pub reports: PathBuf,
    /// publish-ready copy of the output tree
    pub docs: PathBuf,
}

/// stylesheet compilation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigStyles {
    /// root stylesheet, relative to the source directory
    pub entry: PathBuf,
    /// optional right-to-left variant, compiled when the file exists
    pub rtl_entry: Option<PathBuf>,
    /// extra import paths, eg a mixin library
    pub include_paths: Vec<PathBuf>,
    /// browserslist queries used for vendor prefixing
    pub browsers: Vec<String>,
}

/// script bundling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigScripts {
    /// application scripts, relative to the source directory
    pub dir: PathBuf,
    /// vendor scripts that must come first in the bundle, in runtime dependency order
    pub vendor_order: Vec<String>,
}

/// html composition and formatting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigHtml {
    /// the layout used when a page does not name one
    pub default_layout: String,
    pub indent_size: usize,
    /// inline elements kept verbatim by the prettifier
    pub unformatted: Vec<String>,
    pub active_class: String,
    pub nav_class: String,
    pub dropdown_class: String,
}

/// rule files for the linters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLint {
    pub scss: PathBuf,
    pub html: PathBuf,
    pub js: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigServer {
    pub host: [u8; 4],
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigWatch {
    pub debounce_ms: u64,
}

impl Default for ConfigStructure {
    fn default() -> Self {
        Self {
            source: SRC_DIR.into(),
            output: OUT_DIR.into(),
            reports: REPORT_DIR.into(),
            docs: DOCS_DIR.into(),
        }
    }
}

impl Default for ConfigStyles {
    fn default() -> Self {
        Self {
            entry: "assets/scss/main.scss".into(),
            rtl_entry: Some("assets/scss/main-rtl.scss".into()),
            include_paths: Vec::new(),
            browsers: vec!["last 2 versions".into()],
        }
    }
}

impl Default for ConfigScripts {
    fn default() -> Self {
        Self {
            dir: "assets/js".into(),
            vendor_order: ["jquery.js", "popper.js", "bootstrap.js", "slick.js"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl Default for ConfigHtml {
    fn default() -> Self {
        Self {
            default_layout: "default".into(),
            indent_size: 4,
            unformatted: ["code", "pre", "em", "strong", "span", "i", "b", "br"]
                .into_iter()
                .map(String::from)
                .collect(),
            active_class: "active".into(),
            nav_class: "navbar-nav".into(),
            dropdown_class: "dropdown-menu".into(),
        }
    }
}

impl Default for ConfigLint {
    fn default() -> Self {
        Self {
            scss: ".scss-lint.yml".into(),
            html: ".htmllintrc".into(),
            js: ".jshintrc".into(),
        }
    }
}

impl Default for ConfigServer {
    fn default() -> Self {
        Self {
            host: [127, 0, 0, 1],
            port: 3000,
        }
    }
}

impl Default for ConfigWatch {
    fn default() -> Self {
        Self { debounce_ms: 200 }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Self::default())
    }

    pub fn from<T: Provider>(provider: T) -> Result<Self, Error> {
        Figment::from(provider).extract()
    }

    /// defaults, then the toml file, then `SITEPIPE_` environment variables
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::figment()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

impl Provider for Config {
    fn metadata(&self) -> Metadata {
        Metadata::named("Sitepipe config")
    }
    fn data(&self) -> Result<figment::value::Map<figment::Profile, figment::value::Dict>, Error> {
        Serialized::defaults(self).data()
    }
}
