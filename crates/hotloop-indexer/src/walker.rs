//! Project walker honouring the ignore rules and `.gitignore`.

use crate::filter::IgnoreMatcher;
use crate::IndexerError;
use ignore::{WalkBuilder, WalkState};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use tracing::debug;

/// A discovered entry.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Absolute path
    pub path: PathBuf,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Whether this entry is a directory
    pub is_dir: bool,
}

/// Walks a subtree in parallel, skipping ignored paths.
pub struct Walker {
    root: PathBuf,
    matcher: Arc<IgnoreMatcher>,
}

impl Walker {
    /// Create a new walker for `root`.
    pub fn new(root: &Path, matcher: Arc<IgnoreMatcher>) -> Self {
        Self {
            root: root.to_path_buf(),
            matcher,
        }
    }

    /// Walk the tree and return every file and directory, sorted by path.
    pub fn walk(&self) -> Result<Vec<FileEntry>, IndexerError> {
        if !self.root.exists() {
            return Err(IndexerError::NotFound(self.root.clone()));
        }

        let (tx, rx) = mpsc::channel();
        let matcher = self.matcher.clone();

        let walker = WalkBuilder::new(&self.root)
            .follow_links(false)
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .ignore(true)
            .parents(true)
            .filter_entry(move |entry| !matcher.is_ignored(entry.path()))
            .build_parallel();

        walker.run(|| {
            let tx = tx.clone();
            Box::new(move |result| {
                match result {
                    Ok(entry) => {
                        let Some(file_type) = entry.file_type() else {
                            return WalkState::Continue;
                        };
                        if file_type.is_dir() || file_type.is_file() {
                            let size = if file_type.is_file() {
                                entry.metadata().map(|m| m.len()).unwrap_or(0)
                            } else {
                                0
                            };

                            let _ = tx.send(FileEntry {
                                path: entry.path().to_path_buf(),
                                size,
                                is_dir: file_type.is_dir(),
                            });
                        }
                    }
                    Err(e) => {
                        // Don't fail the entire walk for individual errors
                        debug!(error = %e, "Walk error");
                    }
                }
                WalkState::Continue
            })
        });

        // Drop the original sender so the receiver knows when we're done
        drop(tx);

        let mut entries: Vec<FileEntry> = rx.into_iter().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));

        Ok(entries)
    }

    /// Every non-ignored file under the root.
    pub fn files(&self) -> Result<Vec<PathBuf>, IndexerError> {
        Ok(self
            .walk()?
            .into_iter()
            .filter(|e| !e.is_dir)
            .map(|e| e.path)
            .collect())
    }

    /// Every non-ignored directory under the root, the root included.
    pub fn directories(&self) -> Result<Vec<PathBuf>, IndexerError> {
        Ok(self
            .walk()?
            .into_iter()
            .filter(|e| e.is_dir)
            .map(|e| e.path)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn walker_for(root: &Path) -> Walker {
        Walker::new(root, Arc::new(IgnoreMatcher::with_defaults(root).unwrap()))
    }

    #[test]
    fn test_walker_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let walker = walker_for(temp_dir.path());

        assert!(walker.files().unwrap().is_empty());
        // The root itself is reported as a directory
        assert_eq!(walker.directories().unwrap().len(), 1);
    }

    #[test]
    fn test_walker_with_files() {
        let temp_dir = tempdir().unwrap();

        File::create(temp_dir.path().join("file1.txt")).unwrap();
        File::create(temp_dir.path().join("file2.txt")).unwrap();

        let files = walker_for(temp_dir.path()).files().unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_walker_skips_ignored_directories() {
        let temp_dir = tempdir().unwrap();

        fs::create_dir_all(temp_dir.path().join("node_modules/react")).unwrap();
        File::create(temp_dir.path().join("node_modules/react/index.js")).unwrap();
        File::create(temp_dir.path().join("app.js")).unwrap();
        File::create(temp_dir.path().join("debug.log")).unwrap();

        let walker = walker_for(temp_dir.path());
        let names: Vec<_> = walker
            .files()
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        assert_eq!(names, vec!["app.js"]);

        let dirs = walker.directories().unwrap();
        assert!(!dirs.iter().any(|d| d.ends_with("node_modules")));
    }

    #[test]
    fn test_walker_keeps_hidden_files_not_in_ignore_list() {
        let temp_dir = tempdir().unwrap();

        File::create(temp_dir.path().join(".env")).unwrap();

        let files = walker_for(temp_dir.path()).files().unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_walker_handles_nested_directories() {
        let temp_dir = tempdir().unwrap();

        fs::create_dir_all(temp_dir.path().join("a/b/c")).unwrap();
        File::create(temp_dir.path().join("a/file1.txt")).unwrap();
        File::create(temp_dir.path().join("a/b/file2.txt")).unwrap();
        File::create(temp_dir.path().join("a/b/c/file3.txt")).unwrap();

        let walker = walker_for(temp_dir.path());
        assert_eq!(walker.files().unwrap().len(), 3);
        assert_eq!(walker.directories().unwrap().len(), 4);
    }

    #[test]
    fn test_walker_results_are_sorted() {
        let temp_dir = tempdir().unwrap();

        File::create(temp_dir.path().join("c.txt")).unwrap();
        File::create(temp_dir.path().join("a.txt")).unwrap();
        File::create(temp_dir.path().join("b.txt")).unwrap();

        let names: Vec<_> = walker_for(temp_dir.path())
            .files()
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    }

    #[test]
    fn test_walker_missing_root() {
        let temp_dir = tempdir().unwrap();
        let missing = temp_dir.path().join("missing");
        let walker = Walker::new(
            &missing,
            Arc::new(IgnoreMatcher::with_defaults(&missing).unwrap()),
        );
        assert!(matches!(walker.walk(), Err(IndexerError::NotFound(_))));
    }
}
