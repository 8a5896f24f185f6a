//! hotloop indexer
//!
//! The file-facing half of hotloop:
//! - import extraction for JS/TS, Python, Go and Rust sources
//! - project walking with ignore patterns and `.gitignore` support
//! - debounced file watching with per-directory subscriptions

mod error;
pub mod filter;
pub mod scanner;
pub mod walker;
pub mod watcher;

pub use error::IndexerError;
pub use filter::{IgnoreMatcher, DEFAULT_IGNORES};
pub use scanner::{detect_language, extract_imports, ImportScanner, Language, RegexImportScanner};
pub use walker::{FileEntry, Walker};
pub use watcher::{ChangeEvent, ChangeKind, FileWatcher, WatchEvent, WatcherOptions};
