//! Indexer error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while scanning or watching a project.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// I/O error during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A specific file could not be read for import extraction
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File watcher error
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Invalid ignore pattern
    #[error("Invalid ignore pattern: {0}")]
    Pattern(String),

    /// Path not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),
}

impl From<notify::Error> for IndexerError {
    fn from(e: notify::Error) -> Self {
        IndexerError::Watcher(e.to_string())
    }
}

impl From<ignore::Error> for IndexerError {
    fn from(e: ignore::Error) -> Self {
        IndexerError::Pattern(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = IndexerError::NotFound(PathBuf::from("/test/path"));
        assert!(err.to_string().contains("/test/path"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: IndexerError = io_err.into();
        assert!(matches!(err, IndexerError::Io(_)));
    }

    #[test]
    fn test_read_error_names_path() {
        let err = IndexerError::Read {
            path: PathBuf::from("src/util.js"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/util.js"));
        assert!(msg.contains("denied"));
    }
}
