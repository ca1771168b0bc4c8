//! Corpus file discovery: recursive walk with glob-style include/exclude.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

use linkforge_shared::{LinkForgeError, Result};

/// Collect content files under `root`, filtered by include/exclude
/// patterns matched against the path relative to `root` (forward-slash
/// separators). An empty include list selects all markdown files. Hidden
/// directories are skipped. Results are sorted for deterministic corpus
/// order.
pub fn collect_files(root: &Path, include: &[String], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let include: Vec<Regex> = include.iter().filter_map(|p| glob_to_regex(p)).collect();
    let exclude: Vec<Regex> = exclude.iter().filter_map(|p| glob_to_regex(p)).collect();

    let mut files = Vec::new();
    walk(root, root, &include, &exclude, &mut files)?;
    files.sort();

    debug!(root = %root.display(), count = files.len(), "collected content files");
    Ok(files)
}

fn walk(
    root: &Path,
    dir: &Path,
    include: &[Regex],
    exclude: &[Regex],
    out: &mut Vec<PathBuf>,
) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| LinkForgeError::io(dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| LinkForgeError::io(dir, e))?;
        let path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if path.is_dir() {
            if name.starts_with('.') {
                continue;
            }
            walk(root, &path, include, exclude, out)?;
            continue;
        }

        let rel = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .replace('\\', "/");

        if exclude.iter().any(|re| re.is_match(&rel)) {
            continue;
        }

        let selected = if include.is_empty() {
            path.extension().is_some_and(|ext| ext == "md")
        } else {
            include.iter().any(|re| re.is_match(&rel))
        };

        if selected {
            out.push(path);
        }
    }

    Ok(())
}

/// Convert a glob-like pattern to a regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*\*", ".*")
        .replace(r"\*", "[^/]*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{escaped}$")).ok()
}
