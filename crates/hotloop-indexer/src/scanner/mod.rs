//! Import scanning.
//!
//! The rebuild pipeline only needs one thing from a source file: the raw
//! dependency identifiers it declares. [`ImportScanner`] is that seam, and
//! [`RegexImportScanner`] is the default implementation.

mod imports;
mod language;

pub use imports::extract_imports;
pub use language::{detect_language, Language};

use crate::IndexerError;
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

/// Extracts dependency identifiers from a file.
#[async_trait]
pub trait ImportScanner: Send + Sync {
    /// Return the identifiers `path` declares, in first-seen order.
    ///
    /// Unsupported file types yield an empty list without reading the file.
    async fn extract(&self, path: &Path) -> Result<Vec<String>, IndexerError>;
}

/// Extension-keyed regex scanner for JS/TS, Python, Go and Rust sources.
#[derive(Debug, Clone)]
pub struct RegexImportScanner {
    max_file_size: u64,
}

impl RegexImportScanner {
    /// Create a scanner with the default size limit (10MB).
    pub fn new() -> Self {
        Self {
            max_file_size: 10 * 1024 * 1024,
        }
    }

    /// Files larger than this are treated as having no imports.
    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self { max_file_size }
    }
}

impl Default for RegexImportScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportScanner for RegexImportScanner {
    async fn extract(&self, path: &Path) -> Result<Vec<String>, IndexerError> {
        let language = match detect_language(path) {
            Some(lang) if lang.has_imports() => lang,
            _ => return Ok(Vec::new()),
        };

        let read_err = |source| IndexerError::Read {
            path: path.to_path_buf(),
            source,
        };

        let metadata = tokio::fs::metadata(path).await.map_err(read_err)?;
        if metadata.len() > self.max_file_size {
            debug!(path = ?path, size = metadata.len(), "Skipping large file");
            return Ok(Vec::new());
        }

        let bytes = tokio::fs::read(path).await.map_err(read_err)?;
        let content = String::from_utf8_lossy(&bytes);
        let deps = extract_imports(&content, language);

        debug!(path = ?path, language = language.name(), deps = deps.len(), "Extracted imports");

        Ok(deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_extract_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("main.js");
        std::fs::write(&path, "import { helper } from './util.js';\n").unwrap();

        let deps = RegexImportScanner::new().extract(&path).await.unwrap();
        assert_eq!(deps, vec!["./util.js"]);
    }

    #[tokio::test]
    async fn test_unsupported_extension_is_empty_without_reading() {
        // The file does not exist; an unsupported extension must not touch it.
        let deps = RegexImportScanner::new()
            .extract(Path::new("/definitely/missing/notes.txt"))
            .await
            .unwrap();
        assert!(deps.is_empty());
    }

    #[tokio::test]
    async fn test_missing_supported_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = RegexImportScanner::new()
            .extract(&dir.path().join("gone.py"))
            .await;
        assert!(matches!(result, Err(IndexerError::Read { .. })));
    }

    #[tokio::test]
    async fn test_large_file_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.py");
        std::fs::write(&path, "import os\n").unwrap();

        let deps = RegexImportScanner::with_max_file_size(4)
            .extract(&path)
            .await
            .unwrap();
        assert!(deps.is_empty());
    }
}
