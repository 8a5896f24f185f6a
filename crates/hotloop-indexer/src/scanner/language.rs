//! Language detection for source files.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Languages the import scanner knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
    Json,
    Css,
}

impl Language {
    /// Get the display name for this language.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "Rust",
            Language::TypeScript => "TypeScript",
            Language::JavaScript => "JavaScript",
            Language::Python => "Python",
            Language::Go => "Go",
            Language::Json => "JSON",
            Language::Css => "CSS",
        }
    }

    /// Check if this language has an import syntax the scanner extracts.
    pub fn has_imports(&self) -> bool {
        matches!(
            self,
            Language::Rust
                | Language::TypeScript
                | Language::JavaScript
                | Language::Python
                | Language::Go
        )
    }
}

/// Detect the language of a file based on its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_lowercase();

    match ext.as_str() {
        "rs" => Some(Language::Rust),

        "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),

        "py" | "pyi" | "pyw" => Some(Language::Python),

        "go" => Some(Language::Go),

        // Tracked so they show up in the graph, but have no imports
        "json" => Some(Language::Json),
        "css" | "scss" | "sass" => Some(Language::Css),

        _ => None,
    }
}
