//! Swaps development asset references for the production bundles.
//!
//! Pages mark the references to swap with build blocks:
//!
//! ```html
//! <!-- build:css -->
//! <link rel="stylesheet" href="assets/css/main.css">
//! <!-- endbuild -->
//! ```
//!
//! `css` blocks become a single stylesheet link to `main.min.css`, `js` blocks a single
//! script tag for `main.min.js`. Blocks with any other name are left alone.

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::layout::{SCRIPT_BUNDLE_MIN, STYLE_BUNDLE_MIN};

fn block() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| {
        Regex::new(r"(?s)([ \t]*)<!--\s*build:(\w+)\s*-->.*?<!--\s*endbuild\s*-->")
            .expect("build block pattern is valid")
    })
}

/// Rewrite every build block in `html`. `root` is the relative prefix from the page to
/// the output root, so nested pages keep working.
pub fn rewrite_references(html: &str, root: &str) -> String {
    block()
        .replace_all(html, |caps: &Captures| {
            let indent = &caps[1];
            match &caps[2] {
                "css" => format!(
                    "{indent}<link rel=\"stylesheet\" href=\"{root}assets/css/{STYLE_BUNDLE_MIN}\">"
                ),
                "js" => format!(
                    "{indent}<script src=\"{root}assets/js/{SCRIPT_BUNDLE_MIN}\"></script>"
                ),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn swaps_css_and_js_blocks() {
        let html = "<head>\n    <!-- build:css -->\n    <link rel=\"stylesheet\" href=\"assets/vendor/css/slick.css\">\n    <link rel=\"stylesheet\" href=\"assets/css/main.css\">\n    <!-- endbuild -->\n</head>\n<body>\n  <!-- build:js -->\n  <script src=\"assets/vendor/js/jquery.js\"></script>\n  <script src=\"assets/js/custom.js\"></script>\n  <!-- endbuild -->\n</body>";
        let expected = "<head>\n    <link rel=\"stylesheet\" href=\"assets/css/main.min.css\">\n</head>\n<body>\n  <script src=\"assets/js/main.min.js\"></script>\n</body>";
        assert_eq!(rewrite_references(html, ""), expected);
    }

    #[test]
    fn nested_pages_climb_to_root() {
        let html = "<!-- build:js --><script src=\"x.js\"></script><!-- endbuild -->";
        assert_eq!(
            rewrite_references(html, "../"),
            "<script src=\"../assets/js/main.min.js\"></script>"
        );
    }

    #[test]
    fn unknown_blocks_and_plain_pages_untouched() {
        let html = "<!-- build:img --><img src=a.png><!-- endbuild --><p>x</p>";
        assert_eq!(rewrite_references(html, ""), html);
    }
}
