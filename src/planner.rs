//! C5 — Build Planner: decide between incremental and full rebuild (spec §4.C5).

use crate::config::EngineConfig;
use crate::depindex::DependencyIndex;
use crate::model::{BuildMode, BuildPlan, ChangeKind, ChangeRecord};
use crate::store::StoreSnapshot;

/// Evaluates the spec §4.C5 rules in order and produces a [`BuildPlan`].
pub fn plan(
    changes: &[ChangeRecord],
    index: &DependencyIndex,
    store: &StoreSnapshot,
    is_cold: bool,
    total_files: usize,
    config: &EngineConfig,
) -> BuildPlan {
    if config.force_full || is_cold {
        return full_plan(changes, if is_cold { "cold cache" } else { "forced full rebuild" });
    }

    if changes.is_empty() {
        return BuildPlan {
            mode: BuildMode::NoOp,
            affected: Vec::new(),
            impact: Vec::new(),
            rationale: "no changes detected".into(),
        };
    }

    if total_files > 0 {
        let ratio = changes.len() as f64 / total_files as f64;
        if ratio > config.ratio_threshold {
            return full_plan(changes, "change ratio exceeded");
        }
    }

    let has_structural_change = changes.iter().any(|c| {
        matches!(c.kind, ChangeKind::Added | ChangeKind::Deleted)
            || c.element_changes.iter().any(|e| matches!(e.change, ChangeKind::Added | ChangeKind::Deleted))
    });
    if has_structural_change {
        return full_plan(changes, "structural change");
    }

    let changed_names: Vec<String> = changes
        .iter()
        .flat_map(|c| c.element_changes.iter().map(|e| e.name.clone()))
        .collect();
    let impact = index.transitive_impact(&changed_names, config.dependency_depth, store);

    BuildPlan {
        mode: BuildMode::Incremental,
        affected: changes.iter().map(|c| c.source_path.clone()).collect(),
        impact: impact.into_iter().collect(),
        rationale: "incremental: no structural change, ratio within threshold".into(),
    }
}

fn full_plan(changes: &[ChangeRecord], rationale: &str) -> BuildPlan {
    BuildPlan {
        mode: BuildMode::Full,
        affected: changes.iter().map(|c| c.source_path.clone()).collect(),
        impact: Vec::new(),
        rationale: rationale.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChangeKind, ElementChange, ElementKind, ElementRecord, FileRecord};
    use crate::store::ElementStore;
    use std::path::PathBuf;

    fn empty_store() -> StoreSnapshot {
        ElementStore::at_path("/tmp/unused.json").snapshot()
    }

    fn modified_record(path: &str, name: &str) -> ChangeRecord {
        ChangeRecord {
            source_path: PathBuf::from(path),
            kind: ChangeKind::Modified,
            element_changes: vec![ElementChange {
                name: name.into(),
                kind: ElementKind::Function,
                prev_hash: Some("h1".into()),
                new_hash: Some("h2".into()),
                change: ChangeKind::Modified,
            }],
        }
    }

    #[test]
    fn cold_cache_forces_full() {
        let plan = plan(&[], &DependencyIndex::new(), &empty_store(), true, 0, &EngineConfig::default());
        assert_eq!(plan.mode, BuildMode::Full);
    }

    #[test]
    fn no_changes_is_noop() {
        let plan = plan(&[], &DependencyIndex::new(), &empty_store(), false, 5, &EngineConfig::default());
        assert_eq!(plan.mode, BuildMode::NoOp);
    }

    #[test]
    fn ratio_gate_forces_full_regardless_of_change_kind() {
        let changes = vec![modified_record("a.sun", "foo"), modified_record("b.sun", "bar")];
        // 2 changed / 5 total = 0.4 > default 0.20 threshold.
        let result = plan(&changes, &DependencyIndex::new(), &empty_store(), false, 5, &EngineConfig::default());
        assert_eq!(result.mode, BuildMode::Full);
        assert_eq!(result.rationale, "change ratio exceeded");
    }

    #[test]
    fn structural_change_forces_full() {
        let mut change = modified_record("a.sun", "foo");
        change.kind = ChangeKind::Added;
        let result = plan(&[change], &DependencyIndex::new(), &empty_store(), false, 100, &EngineConfig::default());
        assert_eq!(result.mode, BuildMode::Full);
        assert_eq!(result.rationale, "structural change");
    }

    #[test]
    fn pure_edit_under_ratio_is_incremental_with_impact() {
        let mut store = ElementStore::at_path("/tmp/unused2.json");
        store.put(
            PathBuf::from("b.sun"),
            FileRecord {
                source_path: PathBuf::from("b.sun"),
                file_hash: "h".into(),
                elements: vec![ElementRecord {
                    name: "baz".into(),
                    kind: ElementKind::Function,
                    start_line: 1,
                    end_line: 2,
                    canonical_hash: "h".into(),
                    declared_dependencies: vec!["foo".into()],
                    exported: false,
                }],
                output_paths: vec![],
                language: "sunscript".into(),
            },
        );
        let snapshot = store.snapshot();
        let index = DependencyIndex::rebuild(&snapshot);

        let changes = vec![modified_record("a.sun", "foo")];
        let result = plan(&changes, &index, &snapshot, false, 100, &EngineConfig::default());
        assert_eq!(result.mode, BuildMode::Incremental);
        assert!(result.impact.contains(&"foo".to_string()));
        assert!(result.impact.contains(&"baz".to_string()));
    }
}
