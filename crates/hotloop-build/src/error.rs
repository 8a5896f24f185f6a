//! Build and supervision error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from running build tools or the supervised process.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The program could not be started at all
    #[error("Failed to run `{program}`: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Signal delivery failed
    #[error("Failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while waiting on a child
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Build requested with no backend activated
    #[error("No active build backend")]
    NoActiveBackend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_error_display() {
        let err = BuildError::Spawn {
            program: PathBuf::from("webpack"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("webpack"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: BuildError = io_err.into();
        assert!(matches!(err, BuildError::Io(_)));
    }
}
