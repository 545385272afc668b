//! Rebuilds on source changes: each changed file maps to the single task that owns it.

use std::{fs, path::Path, time::Duration};

use notify::{EventKind, RecursiveMode, Watcher};
use notify_debouncer_full::new_debouncer;

use crate::{error::Result, layout::Layout, tasks::TaskId};

/// The tasks to rerun, in order, after `path` changed. Empty when nothing depends on it.
pub fn tasks_for_change(layout: &Layout, path: &Path) -> &'static [TaskId] {
    let has_ext = |exts: &[&str]| {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
    };
    let template_dirs = [layout.pages(), layout.layouts(), layout.partials(), layout.data()];

    if template_dirs.iter().any(|dir| path.starts_with(dir)) {
        &[TaskId::CompileHtml, TaskId::PrettifyHtml]
    } else if path.starts_with(layout.styles()) && has_ext(&["scss", "sass", "css"]) {
        &[TaskId::CompileStyles]
    } else if path.starts_with(layout.vendor_scripts()) {
        &[TaskId::CopyVendorScripts]
    } else if path.starts_with(layout.vendor_styles()) {
        &[TaskId::CopyVendorStyles]
    } else if path.starts_with(layout.scripts()) && has_ext(&["js"]) {
        &[TaskId::CompileScripts]
    } else if path.starts_with(layout.images()) {
        &[TaskId::CopyImages]
    } else if path.starts_with(layout.fonts()) {
        &[TaskId::CopyFonts]
    } else {
        &[]
    }
}

/// Watch the source tree until the process ends, calling `rebuild` with the tasks each
/// batch of changes needs.
pub fn watch<F>(layout: &Layout, debounce: Duration, mut rebuild: F) -> Result<()>
where
    F: FnMut(&[TaskId]),
{
    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(debounce, None, tx)?;
    debouncer
        .watcher()
        .watch(&layout.source, RecursiveMode::Recursive)?;
    // events carry absolute paths
    let root = fs::canonicalize(&layout.source)?;
    log::info!("Watching `{}`", layout.source.display());

    for res in rx {
        match res {
            Ok(events) => {
                let mut tasks: Vec<TaskId> = Vec::new();
                let changed = events
                    .iter()
                    .filter(|e| !matches!(e.kind, EventKind::Access(_)))
                    .flat_map(|e| e.paths.iter());
                for path in changed {
                    let Ok(relative) = path.strip_prefix(&root) else {
                        continue;
                    };
                    let owned = tasks_for_change(layout, &layout.source.join(relative));
                    if !owned.is_empty() {
                        log::info!("Changed: `{}`", relative.display());
                    }
                    for task in owned {
                        if !tasks.contains(task) {
                            tasks.push(*task);
                        }
                    }
                }
                if !tasks.is_empty() {
                    rebuild(&tasks);
                }
            }
            Err(errors) => {
                for error in errors {
                    log::error!("Watch error: `{error:?}`");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn tasks(path: &str) -> &'static [TaskId] {
        tasks_for_change(&Layout::new(&Config::default()), Path::new(path))
    }

    #[test]
    fn stylesheet_partial_only_recompiles_styles() {
        assert_eq!(tasks("src/assets/scss/partials/_nav.scss"), &[TaskId::CompileStyles]);
    }

    #[test]
    fn templates_recompose_pages() {
        for path in [
            "src/pages/index.html",
            "src/layouts/default.html",
            "src/partials/nav.html",
            "src/data/site.yml",
        ] {
            assert_eq!(tasks(path), &[TaskId::CompileHtml, TaskId::PrettifyHtml]);
        }
    }

    #[test]
    fn assets_map_to_their_copy_task() {
        assert_eq!(tasks("src/assets/js/custom.js"), &[TaskId::CompileScripts]);
        assert_eq!(tasks("src/assets/vendor/js/jquery.js"), &[TaskId::CopyVendorScripts]);
        assert_eq!(tasks("src/assets/vendor/css/slick.css"), &[TaskId::CopyVendorStyles]);
        assert_eq!(tasks("src/assets/images/logo.png"), &[TaskId::CopyImages]);
        assert_eq!(tasks("src/assets/fonts/a.woff2"), &[TaskId::CopyFonts]);
    }

    #[test]
    fn unrelated_files_are_ignored() {
        assert!(tasks("src/assets/js/notes.txt").is_empty());
        assert!(tasks("README.md").is_empty());
    }
}
