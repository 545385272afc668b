use std::{
    fs, io,
    path::{Path, PathBuf},
};

use walkdir::WalkDir;

use crate::error::Result;

/// Which files under a root a task picks up.
#[derive(Debug, Clone, Copy)]
pub enum Select<'a> {
    /// every file at any depth
    All,
    /// every file at any depth with one of the extensions (case-insensitive)
    Extensions(&'a [&'a str]),
    /// only the direct children with one of the extensions
    Shallow(&'a [&'a str]),
}

impl Select<'_> {
    fn depth(&self) -> usize {
        match self {
            Select::Shallow(_) => 1,
            _ => usize::MAX,
        }
    }

    fn matches(&self, path: &Path) -> bool {
        let exts = match self {
            Select::All => return true,
            Select::Extensions(exts) | Select::Shallow(exts) => exts,
        };
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| exts.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// Files under `root` in a stable (name sorted) order. A missing root is an empty set,
/// the same way an unmatched glob produces no files.
pub fn collect(root: impl AsRef<Path>, select: Select) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .max_depth(select.depth())
        .sort_by_file_name()
    {
        let entry = entry?;
        if entry.file_type().is_file() && select.matches(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// write a file, creating its parent directories
pub fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}

/// remove a directory tree, a missing directory is already clean
pub fn remove_dir(path: impl AsRef<Path>) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// true when `dest` exists and was modified no earlier than `src`
pub fn is_newer(src: &Path, dest: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified());
    match (modified(src), modified(dest)) {
        (Ok(src), Ok(dest)) => dest >= src,
        _ => false,
    }
}

/// Copy the selected files from `from` into `to`, keeping their relative paths.
/// With `incremental` set, destinations already newer than their source are left alone.
/// Returns the destinations that were written.
pub fn copy_tree(
    from: impl AsRef<Path>,
    to: impl AsRef<Path>,
    select: Select,
    incremental: bool,
) -> Result<Vec<PathBuf>> {
    copy_with(from, to, select, incremental, |_, bytes| Ok(bytes))
}

/// Like [`copy_tree`] but passes every file's bytes through `transform` on the way.
pub fn copy_with<F>(
    from: impl AsRef<Path>,
    to: impl AsRef<Path>,
    select: Select,
    incremental: bool,
    mut transform: F,
) -> Result<Vec<PathBuf>>
where
    F: FnMut(&Path, Vec<u8>) -> Result<Vec<u8>>,
{
    let (from, to) = (from.as_ref(), to.as_ref());
    let mut written = Vec::new();
    for file in collect(from, select)? {
        let Ok(relative) = file.strip_prefix(from) else {
            continue;
        };
        let dest = to.join(relative);
        if incremental && is_newer(&file, &dest) {
            log::debug!("`{}` is up to date", dest.display());
            continue;
        }
        let bytes = transform(&file, fs::read(&file)?)?;
        write(&dest, bytes)?;
        written.push(dest);
    }
    Ok(written)
}

/// copy a whole directory verbatim, hidden files included
pub fn copy_dir(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(&to)?;
    copy_tree(from, to, Select::All, false)?;
    Ok(())
}
