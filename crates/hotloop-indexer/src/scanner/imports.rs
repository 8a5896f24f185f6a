//! Regex-based import extraction.
//!
//! Identifiers are returned exactly as written in the source (relative
//! specifiers, package paths, module names). Nothing here resolves them
//! to files.

use super::Language;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\b(?:(?:import|export)\s+(?:[\w*{}\s,$]+?\s+from\s+)?|require\s*\(\s*|import\s*\(\s*)['"]([^'"\n]+)['"]"#,
    )
    .unwrap()
});

static PY_IMPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:from\s+([\w.]+)\s+import\b|import\s+([\w.]+(?:\s*,\s*[\w.]+)*))")
        .unwrap()
});

static GO_IMPORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*import\s+(?:[\w.]+\s+)?"([^"]+)""#).unwrap());

static GO_IMPORT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\bimport\s*\((.*?)\)").unwrap());

static GO_BLOCK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^\s*(?:[\w.]+\s+)?"([^"]+)""#).unwrap());

static RUST_MOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+(\w+)\s*;").unwrap()
});

/// Ordered, de-duplicated identifier list.
#[derive(Default)]
struct Collector {
    seen: HashSet<String>,
    out: Vec<String>,
}

impl Collector {
    fn push(&mut self, raw: &str) {
        let dep = raw.trim();
        if dep.is_empty() {
            return;
        }
        if self.seen.insert(dep.to_string()) {
            self.out.push(dep.to_string());
        }
    }
}

/// Extract raw dependency identifiers from source text.
pub fn extract_imports(content: &str, language: Language) -> Vec<String> {
    let mut collector = Collector::default();

    match language {
        Language::JavaScript | Language::TypeScript => {
            for caps in JS_IMPORT.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    collector.push(m.as_str());
                }
            }
        }
        Language::Python => {
            for caps in PY_IMPORT.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    collector.push(m.as_str());
                } else if let Some(m) = caps.get(2) {
                    // `import a, b.c`
                    for name in m.as_str().split(',') {
                        collector.push(name);
                    }
                }
            }
        }
        Language::Go => {
            for caps in GO_IMPORT.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    collector.push(m.as_str());
                }
            }
            for block in GO_IMPORT_BLOCK.captures_iter(content) {
                if let Some(body) = block.get(1) {
                    for caps in GO_BLOCK_LINE.captures_iter(body.as_str()) {
                        if let Some(m) = caps.get(1) {
                            collector.push(m.as_str());
                        }
                    }
                }
            }
        }
        Language::Rust => {
            for caps in RUST_MOD.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    collector.push(m.as_str());
                }
            }
        }
        Language::Json | Language::Css => {}
    }

    collector.out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_import_forms() {
        let src = r#"
import React from 'react';
import { helper, other } from "./util.js";
import * as ns from './ns';
import './side-effect.css';
const fs = require('fs');
const lazy = import('./lazy.js');
export { thing } from './reexport';
"#;
        let deps = extract_imports(src, Language::JavaScript);
        assert_eq!(
            deps,
            vec![
                "react",
                "./util.js",
                "./ns",
                "./side-effect.css",
                "fs",
                "./lazy.js",
                "./reexport"
            ]
        );
    }

    #[test]
    fn test_js_multiline_import() {
        let src = "import {\n  a,\n  b,\n} from './multi';\n";
        assert_eq!(extract_imports(src, Language::TypeScript), vec!["./multi"]);
    }

    #[test]
    fn test_js_ignores_non_imports() {
        let src = "export default function reimport() { return 'x'; }\nconst s = \"import\";\n";
        assert!(extract_imports(src, Language::JavaScript).is_empty());
    }

    #[test]
    fn test_js_deduplicates() {
        let src = "import a from './a';\nconst b = require('./a');\n";
        assert_eq!(extract_imports(src, Language::JavaScript), vec!["./a"]);
    }

    #[test]
    fn test_python_imports() {
        let src = "import os\nimport sys, json\nfrom .models import User\nfrom pkg.sub import thing\n";
        let deps = extract_imports(src, Language::Python);
        assert_eq!(deps, vec!["os", "sys", "json", ".models", "pkg.sub"]);
    }

    #[test]
    fn test_go_single_and_block_imports() {
        let src = r#"package main

import "fmt"

import (
    "os"
    log "github.com/sirupsen/logrus"
    _ "example.com/driver"
)
"#;
        let deps = extract_imports(src, Language::Go);
        assert_eq!(
            deps,
            vec![
                "fmt",
                "os",
                "github.com/sirupsen/logrus",
                "example.com/driver"
            ]
        );
    }

    #[test]
    fn test_go_alias_is_not_an_identifier() {
        let src = "import f \"fmt\"\n";
        assert_eq!(extract_imports(src, Language::Go), vec!["fmt"]);
    }

    #[test]
    fn test_rust_mod_declarations() {
        let src = "mod config;\npub mod graph;\npub(crate) mod stats;\nmod tests {\n}\n";
        assert_eq!(
            extract_imports(src, Language::Rust),
            vec!["config", "graph", "stats"]
        );
    }

    #[test]
    fn test_languages_without_imports() {
        assert!(extract_imports("{\"import\": \"x\"}", Language::Json).is_empty());
    }
}
