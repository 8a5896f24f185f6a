//! Dependency graph for import relationships.
//!
//! Edges are stored forward only (file -> import identifiers as written in
//! the source). Identifiers are not resolved to paths, so reverse lookups
//! scan every edge set and match identifiers against the changed path.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Forward import edges for every analyzed file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    edges: HashMap<PathBuf, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the import set of `path`. Duplicates are dropped, first
    /// occurrence order is kept.
    pub fn record_dependencies(&mut self, path: PathBuf, identifiers: Vec<String>) {
        let mut seen = HashSet::new();
        let identifiers = identifiers
            .into_iter()
            .filter(|id| seen.insert(id.clone()))
            .collect();
        self.edges.insert(path, identifiers);
    }

    /// Drop the edge set of `path`. Edges of other files pointing at it stay.
    pub fn remove(&mut self, path: &Path) -> bool {
        self.edges.remove(path).is_some()
    }

    /// Recorded import identifiers of `path`.
    pub fn dependencies(&self, path: &Path) -> Option<&[String]> {
        self.edges.get(path).map(|v| v.as_slice())
    }

    /// Files with at least one identifier matching `path`, sorted.
    pub fn affected_by(&self, path: &Path) -> Vec<PathBuf> {
        let mut dependents: Vec<PathBuf> = self
            .edges
            .iter()
            .filter(|(_, ids)| ids.iter().any(|id| identifier_matches(id, path)))
            .map(|(file, _)| file.clone())
            .collect();
        dependents.sort();
        dependents
    }

    /// `path` plus everything that depends on it, directly or not.
    ///
    /// Depth-first, each file at most once, starting with `path`. Cycles
    /// terminate because visited files are never expanded again.
    pub fn transitive_affected(&self, path: &Path) -> Vec<PathBuf> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![path.to_path_buf()];

        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }

            // Reversed so the smallest dependent is expanded first
            let mut dependents = self.affected_by(&current);
            dependents.retain(|d| !visited.contains(d));
            dependents.reverse();
            stack.extend(dependents);

            order.push(current);
        }

        order
    }

    /// Number of files with a recorded edge set.
    pub fn file_count(&self) -> usize {
        self.edges.len()
    }

    /// Total identifiers across all files.
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Snapshot of every (file, identifiers) pair.
    pub fn entries(&self) -> Vec<(PathBuf, Vec<String>)> {
        self.edges
            .iter()
            .map(|(path, ids)| (path.clone(), ids.clone()))
            .collect()
    }
}

/// Whether an import identifier may refer to `path`.
///
/// Matches the full path, the file name (`./lib/util.js` vs `util.js`) or,
/// for identifiers without an extension, the file stem (`./util` vs
/// `util.js`). This over-approximates: unrelated files sharing a base name
/// are also considered affected.
pub fn identifier_matches(identifier: &str, path: &Path) -> bool {
    if Path::new(identifier) == path {
        return true;
    }

    let Some(base) = path.file_name() else {
        return false;
    };

    // Python relative imports (`.models`) carry leading dots
    let trimmed = Path::new(identifier.trim_start_matches('.'));
    match trimmed.file_name() {
        Some(name) if name == base => true,
        Some(name) if trimmed.extension().is_none() => path.file_stem() == Some(name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identifier_matching() {
        let util = Path::new("/proj/src/util.js");
        assert!(identifier_matches("/proj/src/util.js", util));
        assert!(identifier_matches("./util.js", util));
        assert!(identifier_matches("../src/util.js", util));
        assert!(identifier_matches("./util", util));
        assert!(!identifier_matches("./util.ts", util));
        assert!(!identifier_matches("./utils", util));
        assert!(!identifier_matches("react", util));
        assert!(!identifier_matches("", util));
    }

    #[test]
    fn test_python_relative_import_matches() {
        assert!(identifier_matches(".models", Path::new("/proj/app/models.py")));
    }

    #[test]
    fn test_record_replaces_and_dedups() {
        let mut graph = DependencyGraph::new();
        let main = PathBuf::from("/proj/main.js");

        graph.record_dependencies(main.clone(), ids(&["./a", "./b", "./a"]));
        assert_eq!(graph.dependencies(&main).unwrap(), ["./a", "./b"]);

        graph.record_dependencies(main.clone(), ids(&["./c"]));
        assert_eq!(graph.dependencies(&main).unwrap(), ["./c"]);
        assert_eq!(graph.file_count(), 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_affected_by_direct_dependents() {
        let mut graph = DependencyGraph::new();
        graph.record_dependencies("/p/main.js".into(), ids(&["./util.js"]));
        graph.record_dependencies("/p/other.js".into(), ids(&["./util"]));
        graph.record_dependencies("/p/alone.js".into(), ids(&["lodash"]));

        let affected = graph.affected_by(Path::new("/p/util.js"));
        assert_eq!(
            affected,
            vec![PathBuf::from("/p/main.js"), PathBuf::from("/p/other.js")]
        );
    }

    #[test]
    fn test_transitive_includes_start_and_chain() {
        let mut graph = DependencyGraph::new();
        graph.record_dependencies("/p/b.js".into(), ids(&["./a.js"]));
        graph.record_dependencies("/p/c.js".into(), ids(&["./b.js"]));

        let affected = graph.transitive_affected(Path::new("/p/a.js"));
        assert_eq!(
            affected,
            vec![
                PathBuf::from("/p/a.js"),
                PathBuf::from("/p/b.js"),
                PathBuf::from("/p/c.js")
            ]
        );
    }

    #[test]
    fn test_transitive_terminates_on_cycle() {
        let mut graph = DependencyGraph::new();
        graph.record_dependencies("/p/a.js".into(), ids(&["./b.js"]));
        graph.record_dependencies("/p/b.js".into(), ids(&["./a.js"]));

        let affected = graph.transitive_affected(Path::new("/p/a.js"));
        assert_eq!(affected.len(), 2);
        assert_eq!(affected[0], PathBuf::from("/p/a.js"));
        assert!(affected.contains(&PathBuf::from("/p/b.js")));
    }

    #[test]
    fn test_transitive_self_import() {
        let mut graph = DependencyGraph::new();
        graph.record_dependencies("/p/a.js".into(), ids(&["./a.js"]));

        assert_eq!(
            graph.transitive_affected(Path::new("/p/a.js")),
            vec![PathBuf::from("/p/a.js")]
        );
    }

    #[test]
    fn test_transitive_diamond_visits_once() {
        let mut graph = DependencyGraph::new();
        graph.record_dependencies("/p/left.js".into(), ids(&["./base.js"]));
        graph.record_dependencies("/p/right.js".into(), ids(&["./base.js"]));
        graph.record_dependencies("/p/top.js".into(), ids(&["./left.js", "./right.js"]));

        let affected = graph.transitive_affected(Path::new("/p/base.js"));
        assert_eq!(affected.len(), 4);
        let unique: HashSet<_> = affected.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn test_unknown_file_affects_only_itself() {
        let graph = DependencyGraph::new();
        assert_eq!(
            graph.transitive_affected(Path::new("/p/new.js")),
            vec![PathBuf::from("/p/new.js")]
        );
    }

    #[test]
    fn test_remove_keeps_inbound_edges() {
        let mut graph = DependencyGraph::new();
        graph.record_dependencies("/p/main.js".into(), ids(&["./util.js"]));
        graph.record_dependencies("/p/util.js".into(), ids(&[]));

        assert!(graph.remove(Path::new("/p/util.js")));
        assert!(!graph.remove(Path::new("/p/util.js")));
        assert_eq!(graph.affected_by(Path::new("/p/util.js")).len(), 1);
    }
}
