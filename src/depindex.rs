//! C4 — Dependency Index: reverse map from element name to the set of source paths whose
//! elements declare a dependency on it (spec §4.C4). Edges are declared by the Structural
//! Analyzer (C9), never inferred from generated output.

use crate::store::StoreSnapshot;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    /// element_name -> paths of files with at least one element declaring a dependency on it.
    edges: HashMap<String, BTreeSet<PathBuf>>,
}

impl DependencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index from scratch off a store snapshot. Called once per build, before
    /// the index becomes immutable for the remainder of the invocation (spec §5).
    pub fn rebuild(store: &StoreSnapshot) -> Self {
        let mut index = Self::new();
        for (path, record) in store.iter() {
            for element in &record.elements {
                for dep in &element.declared_dependencies {
                    index.record_edge(path, dep);
                }
            }
        }
        index
    }

    pub fn record_edge(&mut self, path: &Path, element_name: &str) {
        self.edges.entry(element_name.to_string()).or_default().insert(path.to_path_buf());
    }

    /// Drops every edge pointing at `path`, used when a file is removed from the store.
    pub fn forget(&mut self, path: &Path) {
        for paths in self.edges.values_mut() {
            paths.remove(path);
        }
        self.edges.retain(|_, paths| !paths.is_empty());
    }

    pub fn dependents_of(&self, element_name: &str) -> Vec<PathBuf> {
        self.edges.get(element_name).map(|set| set.iter().cloned().collect()).unwrap_or_default()
    }

    /// Transitive closure of `changed` element names through dependents, up to depth
    /// `max_depth` (inclusive of the seed names themselves), resolved against `store` since
    /// the index alone only knows path-level reverse edges, not which element at that path
    /// declared the dependency. Cycles are broken with a visited set.
    pub fn transitive_impact(
        &self,
        changed: &[String],
        max_depth: u32,
        store: &StoreSnapshot,
    ) -> BTreeSet<String> {
        let mut visited: HashSet<String> = changed.iter().cloned().collect();
        let mut frontier: Vec<String> = changed.to_vec();

        for _ in 0..max_depth {
            let mut next = Vec::new();
            for name in &frontier {
                for dependent_path in self.dependents_of(name) {
                    let Some(record) = store.get(&dependent_path) else { continue };
                    for element in &record.elements {
                        if element.declared_dependencies.iter().any(|d| d == name)
                            && visited.insert(element.name.clone())
                        {
                            next.push(element.name.clone());
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        visited.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ElementKind, ElementRecord, FileRecord};
    use crate::store::ElementStore;

    fn el(name: &str, deps: &[&str]) -> ElementRecord {
        ElementRecord {
            name: name.into(),
            kind: ElementKind::Function,
            start_line: 1,
            end_line: 2,
            canonical_hash: "h".into(),
            declared_dependencies: deps.iter().map(|s| s.to_string()).collect(),
            exported: false,
        }
    }

    fn snapshot_with(files: Vec<(&str, Vec<ElementRecord>)>) -> StoreSnapshot {
        let mut store = ElementStore::at_path("/tmp/unused.json");
        for (path, elements) in files {
            store.put(
                PathBuf::from(path),
                FileRecord {
                    source_path: PathBuf::from(path),
                    file_hash: "h".into(),
                    elements,
                    output_paths: vec![],
                    language: "sunscript".into(),
                },
            );
        }
        store.snapshot()
    }

    #[test]
    fn dependents_of_returns_declaring_files() {
        let snapshot = snapshot_with(vec![("baz.sun", vec![el("baz", &["foo"])])]);
        let index = DependencyIndex::rebuild(&snapshot);
        assert_eq!(index.dependents_of("foo"), vec![PathBuf::from("baz.sun")]);
        assert!(index.dependents_of("nonexistent").is_empty());
    }

    #[test]
    fn transitive_impact_reaches_depth_2_not_3() {
        // a <- b <- c <- d (b depends on a, c depends on b, d depends on c)
        let snapshot = snapshot_with(vec![
            ("a.sun", vec![el("a", &[])]),
            ("b.sun", vec![el("b", &["a"])]),
            ("c.sun", vec![el("c", &["b"])]),
            ("d.sun", vec![el("d", &["c"])]),
        ]);
        let index = DependencyIndex::rebuild(&snapshot);
        let impact = index.transitive_impact(&["a".to_string()], 2, &snapshot);
        assert!(impact.contains("a"));
        assert!(impact.contains("b"));
        assert!(impact.contains("c"));
        assert!(!impact.contains("d"));
    }

    #[test]
    fn forget_removes_edges_for_a_path() {
        let snapshot = snapshot_with(vec![("baz.sun", vec![el("baz", &["foo"])])]);
        let mut index = DependencyIndex::rebuild(&snapshot);
        index.forget(Path::new("baz.sun"));
        assert!(index.dependents_of("foo").is_empty());
    }

    #[test]
    fn cycles_terminate_via_visited_set() {
        let snapshot = snapshot_with(vec![
            ("a.sun", vec![el("a", &["b"])]),
            ("b.sun", vec![el("b", &["a"])]),
        ]);
        let index = DependencyIndex::rebuild(&snapshot);
        let impact = index.transitive_impact(&["a".to_string()], 10, &snapshot);
        assert_eq!(impact.len(), 2);
    }
}
