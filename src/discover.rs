use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::pipeline::InputFile;
use crate::resolve::TrackedFiles;

/// Directories never considered part of the tracked source tree.
const SKIP_DIRS: &[&str] = &[".git", "node_modules", "target"];

/// Expand report glob patterns under the work dir into `(name, bytes)`
/// pairs. Order is pattern order, then lexicographic within a pattern;
/// files matched by multiple patterns are read once.
pub fn collect_reports(work_dir: &Path, patterns: &[String]) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for pattern in patterns {
        let full = work_dir.join(pattern).to_string_lossy().to_string();
        let entries =
            glob::glob(&full).with_context(|| format!("invalid glob pattern '{pattern}'"))?;
        let mut matched: Vec<_> = entries.flatten().filter(|p| p.is_file()).collect();
        matched.sort();
        for path in matched {
            let name = relative_name(work_dir, &path);
            if !seen.insert(name.clone()) {
                continue;
            }
            let content =
                std::fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
            files.push(InputFile { name, content });
        }
    }
    Ok(files)
}

/// Walk the work dir and build the set of tracked source paths used for
/// annotation anchoring.
pub fn tracked_files(work_dir: &Path) -> Result<TrackedFiles> {
    let pattern = work_dir.join("**/*").to_string_lossy().to_string();
    let entries = glob::glob(&pattern).context("failed to walk work dir")?;
    let mut paths = Vec::new();
    for entry in entries.flatten() {
        if !entry.is_file() {
            continue;
        }
        let rel = relative_name(work_dir, &entry);
        if rel.split('/').any(|segment| SKIP_DIRS.contains(&segment)) {
            continue;
        }
        paths.push(rel);
    }
    Ok(TrackedFiles::new(paths))
}

fn relative_name(work_dir: &Path, path: &Path) -> String {
    path.strip_prefix(work_dir)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
