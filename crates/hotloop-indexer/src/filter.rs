//! Ignore rules shared by the walker and the watcher.

use crate::IndexerError;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path, PathBuf};

/// Directories and files that are never worth watching.
pub const DEFAULT_IGNORES: &[&str] = &[
    "node_modules",
    ".git",
    ".vscode",
    ".idea",
    "dist",
    "build",
    "*.log",
    ".DS_Store",
];

/// Gitignore-style matcher over a fixed set of patterns.
///
/// A path is ignored if any of its components (relative to the root)
/// matches, so `node_modules` excludes everything underneath it.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    root: PathBuf,
    globs: Gitignore,
}

impl IgnoreMatcher {
    /// Build a matcher rooted at `root`.
    pub fn new<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Self, IndexerError> {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in patterns {
            builder.add_line(None, pattern.as_ref())?;
        }

        Ok(Self {
            root: root.to_path_buf(),
            globs: builder.build()?,
        })
    }

    /// Matcher with [`DEFAULT_IGNORES`].
    pub fn with_defaults(root: &Path) -> Result<Self, IndexerError> {
        Self::new(root, DEFAULT_IGNORES)
    }

    /// Check whether `path` or any of its parents below the root is ignored.
    pub fn is_ignored(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let parts: Vec<_> = rel
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part),
                _ => None,
            })
            .collect();

        let mut current = PathBuf::new();
        for (i, part) in parts.iter().enumerate() {
            current.push(part);
            let is_dir = i + 1 < parts.len() || path.is_dir();
            if self.globs.matched(&current, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Root the matcher was built for.
    pub fn root(&self) -> &Path {
        &self.root
    }
}
