//! Navigation active state.
//!
//! Inside a navigation container the first link pointing at the page being built carries
//! the active class. A link living in a dropdown also activates the dropdown's toggle link.
//! Every other navigation link loses the class.

use super::{edit_classes, splice, tokenize, TokenKind};
use crate::config::ConfigHtml;

#[derive(Debug, Clone)]
pub struct NavClasses {
    pub active: String,
    pub nav: String,
    pub dropdown: String,
}

impl From<&ConfigHtml> for NavClasses {
    fn from(value: &ConfigHtml) -> Self {
        Self {
            active: value.active_class.clone(),
            nav: value.nav_class.clone(),
            dropdown: value.dropdown_class.clone(),
        }
    }
}

impl Default for NavClasses {
    fn default() -> Self {
        (&ConfigHtml::default()).into()
    }
}

struct Open {
    tag: String,
    nav: bool,
    dropdown: bool,
    first_anchor: Option<usize>,
}

struct NavLink {
    token: usize,
    href: Option<String>,
    toggle: Option<usize>,
}

/// Collapse `.`/`..` segments and the `index.html` suffix.
fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    if parts.last() == Some(&"index.html") {
        parts.pop();
    }
    let trailing = path.ends_with('/') || path.ends_with("/index.html");
    let mut out = format!("/{}", parts.join("/"));
    if trailing && out.len() > 1 {
        out.push('/');
    }
    out
}

/// The site path an href points at, relative hrefs resolved against the page's url.
/// External, fragment-only and scheme links resolve to nothing.
pub fn resolve_href(href: &str, page_url: &str) -> Option<String> {
    let href = href.split(['#', '?']).next().unwrap_or("").trim();
    if href.is_empty() || href.starts_with("//") || href.contains(':') {
        return None;
    }
    if href.starts_with('/') {
        return Some(normalize(href));
    }
    let dir = match page_url.rfind('/') {
        Some(at) => &page_url[..=at],
        None => "/",
    };
    Some(normalize(&format!("{dir}{href}")))
}

/// Mark the navigation link for `page_url` (eg `/about.html`) as active.
pub fn mark_active(html: &str, page_url: &str, classes: &NavClasses) -> String {
    let tokens = tokenize(html);
    let current = normalize(page_url);
    let mut stack: Vec<Open> = Vec::new();
    let mut links: Vec<NavLink> = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::StartTag { self_closing, .. } => {
                let Some(tag) = token.tag() else { continue };
                if tag == "li" && stack.last().is_some_and(|o| o.tag == "li") {
                    stack.pop();
                }
                if tag == "a" {
                    if let Some(li) = stack.iter_mut().rev().find(|o| o.tag == "li") {
                        li.first_anchor.get_or_insert(index);
                    }
                    if stack.iter().any(|o| o.nav) {
                        let toggle = stack
                            .iter()
                            .rposition(|o| o.dropdown)
                            .and_then(|d| stack[..d].iter().rev().find(|o| o.tag == "li"))
                            .and_then(|li| li.first_anchor);
                        links.push(NavLink {
                            token: index,
                            href: token.attr("href").and_then(|h| resolve_href(h, page_url)),
                            toggle,
                        });
                    }
                }
                if *self_closing || super::is_void(&tag) {
                    continue;
                }
                stack.push(Open {
                    nav: token.has_class(&classes.nav),
                    dropdown: token.has_class(&classes.dropdown),
                    tag,
                    first_anchor: None,
                });
            }
            TokenKind::EndTag { .. } => {
                let Some(tag) = token.tag() else { continue };
                if let Some(at) = stack.iter().rposition(|o| o.tag == tag) {
                    stack.truncate(at);
                }
            }
            _ => {}
        }
    }

    let hit = links
        .iter()
        .find(|l| l.href.as_deref() == Some(current.as_str()));
    let mut active: Vec<usize> = Vec::new();
    if let Some(hit) = hit {
        active.push(hit.token);
        active.extend(hit.toggle);
    }

    let mut edits = Vec::new();
    for link in &links {
        let token = &tokens[link.token];
        let want = active.contains(&link.token);
        if want == token.has_class(&classes.active) {
            continue;
        }
        let edited = edit_classes(token, |list| {
            list.retain(|c| c != &classes.active);
            if want {
                list.push(classes.active.clone());
            }
        });
        if let Some(edited) = edited {
            edits.push((token.span.clone(), edited));
        }
    }
    // a toggle link that sits outside every nav container still gets marked
    for toggle in active.iter().filter(|t| !links.iter().any(|l| l.token == **t)) {
        let token = &tokens[*toggle];
        if let Some(edited) = edit_classes(token, |list| list.push(classes.active.clone())) {
            edits.push((token.span.clone(), edited));
        }
    }
    splice(html, edits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MENU: &str = r##"<nav><a class="brand" href="/index.html">Brand</a>
<ul class="navbar-nav">
  <li class="nav-item"><a class="nav-link active" href="/index.html">Home</a></li>
  <li class="nav-item"><a class="nav-link" href="about.html">About</a></li>
  <li class="nav-item dropdown">
    <a class="nav-link dropdown-toggle" href="#">Services</a>
    <ul class="dropdown-menu">
      <li><a class="dropdown-item" href="/services/web.html">Web</a></li>
      <li><a class="dropdown-item" href="/services/print.html">Print</a></li>
    </ul>
  </li>
</ul></nav>"##;

    fn active_links(html: &str) -> Vec<String> {
        let tokens = tokenize(html);
        tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_start("a") && t.has_class("active"))
            .map(|(i, _)| tokens[i + 1].raw(html).to_string())
            .collect()
    }

    #[test]
    fn marks_exactly_the_matching_link() {
        let out = mark_active(MENU, "/about.html", &NavClasses::default());
        assert_eq!(active_links(&out), vec!["About"]);
    }

    #[test]
    fn dropdown_item_activates_its_toggle() {
        let out = mark_active(MENU, "/services/print.html", &NavClasses::default());
        assert_eq!(active_links(&out), vec!["Services", "Print"]);
    }

    #[test]
    fn index_matches_root_and_brand_is_ignored() {
        let out = mark_active(MENU, "/index.html", &NavClasses::default());
        assert_eq!(active_links(&out), vec!["Home"]);
        assert!(out.contains(r#"<a class="brand" href="/index.html">"#));
    }

    #[test]
    fn unknown_page_clears_stale_state() {
        let out = mark_active(MENU, "/contact.html", &NavClasses::default());
        assert!(active_links(&out).is_empty());
    }

    #[test]
    fn resolves_relative_hrefs() {
        assert_eq!(
            resolve_href("../about.html", "/blog/post.html").as_deref(),
            Some("/about.html")
        );
        assert_eq!(resolve_href("./", "/blog/post.html").as_deref(), Some("/blog/"));
        assert_eq!(resolve_href("https://x.org/", "/a.html"), None);
        assert_eq!(resolve_href("#top", "/a.html"), None);
    }
}
