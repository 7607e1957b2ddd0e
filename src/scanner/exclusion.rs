//! User-specified paths pruned from traversal.

use std::path::{Component, Path, PathBuf};

/// Lexically clean a path.
///
/// Drops `.` components, resolves `..` against preceding components, removes
/// trailing separators and collapses repeated ones. `..` at the root is
/// dropped; leading `..` in a relative path is kept. An empty result is `.`.
/// The filesystem is never consulted, so symlinks are not resolved.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Insertion-ordered set of cleaned paths.
///
/// Membership is exact equality against a cleaned candidate; there is no
/// prefix or glob matching. Pruning a directory during the walk is what keeps
/// its descendants out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionPolicy {
    paths: Vec<PathBuf>,
}

impl ExclusionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path, stored in cleaned form. Duplicates are ignored.
    pub fn add(&mut self, path: impl AsRef<Path>) {
        let cleaned = clean_path(path.as_ref());
        if !self.paths.contains(&cleaned) {
            self.paths.push(cleaned);
        }
    }

    /// True if the cleaned form of `path` was excluded.
    pub fn contains(&self, path: &Path) -> bool {
        let cleaned = clean_path(path);
        self.paths.iter().any(|excluded| *excluded == cleaned)
    }

    /// True if `path` or any of its ancestors was excluded.
    pub fn covers(&self, path: &Path) -> bool {
        let cleaned = clean_path(path);
        cleaned.ancestors().any(|ancestor| self.paths.iter().any(|p| p == ancestor))
    }

    /// Excluded paths in insertion order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }
}

impl<P: AsRef<Path>> FromIterator<P> for ExclusionPolicy {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut policy = Self::new();
        for path in iter {
            policy.add(path);
        }
        policy
    }
}
