use std::collections::BTreeSet;

/// Extensions tried when a source hint looks like a dotted class or module
/// name rather than a literal path.
const SOURCE_EXTENSIONS: &[&str] = &[
    "cs", "fs", "vb", "java", "kt", "kts", "scala", "groovy", "js", "jsx", "ts", "tsx", "mjs",
    "cjs", "py", "rb", "go", "rs", "swift", "php",
];

/// Repository-relative paths known to exist in the checked-out tree,
/// supplied by the file-discovery collaborator. Paths are normalized to
/// `/` separators with no leading `./`.
#[derive(Debug, Clone, Default)]
pub struct TrackedFiles {
    paths: BTreeSet<String>,
}

impl TrackedFiles {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: paths.into_iter().map(|p| normalize(p.as_ref())).collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(&normalize(path))
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Resolve a format-reported source hint to a tracked path.
    ///
    /// Exact matches win. Otherwise the hint is matched as a path suffix,
    /// and dotted hints are additionally retried with dots as separators
    /// plus a conventional source extension. Anything other than exactly
    /// one candidate resolves to `None`; ambiguity is never guessed at.
    pub fn resolve(&self, hint: &str) -> Option<String> {
        let hint = normalize(hint);
        if hint.is_empty() {
            return None;
        }
        if self.paths.contains(&hint) {
            return Some(hint);
        }

        let mut candidates = self.suffix_matches(&hint);
        if candidates.is_empty() && !hint.contains('/') && hint.contains('.') {
            let base = hint.replace('.', "/");
            for ext in SOURCE_EXTENSIONS {
                candidates.extend(self.suffix_matches(&format!("{base}.{ext}")));
            }
        }

        match candidates.len() {
            1 => candidates.pop(),
            0 => None,
            n => {
                log::debug!("source hint '{hint}' matched {n} tracked files, leaving unresolved");
                None
            }
        }
    }

    /// Tracked paths ending in `suffix` on a segment boundary.
    fn suffix_matches(&self, suffix: &str) -> Vec<String> {
        let tail = format!("/{suffix}");
        self.paths
            .iter()
            .filter(|p| p.as_str() == suffix || p.ends_with(&tail))
            .cloned()
            .collect()
    }
}

fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").unwrap_or(&path).to_string()
}
