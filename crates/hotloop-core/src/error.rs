//! Core error types for hotloop.

use hotloop_build::BuildError;
use hotloop_indexer::IndexerError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the rebuild pipeline and its setup.
#[derive(Debug, Error)]
pub enum CoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not stat or hash a file
    #[error("Fingerprint error for {path}: {source}")]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Import scanning or walking failed
    #[error("Analysis error: {0}")]
    Analysis(#[from] IndexerError),

    /// The backend ran and reported failure
    #[error("Build failed ({backend}):\n{output}")]
    BuildFailed { backend: String, output: String },

    /// The backend or supervisor could not run
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid watch root
    #[error("Invalid project path: {0}")]
    InvalidPath(String),
}
