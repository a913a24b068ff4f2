//! C3 — Change Detector: diff new element lists against the baseline, classify
//! per-element changes, emit file-level Change Records (spec §4.C3).

use crate::model::{ChangeKind, ChangeRecord, ElementChange, ElementRecord, FileRecord};
use crate::store::StoreSnapshot;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Diffs `current_files` against `baseline`, returning Change Records in stable
/// (lexicographic-by-path) order.
///
/// No rename heuristic: an element that kept its hash but changed name is reported as a
/// delete of the old name plus an add of the new one (spec §4.C3, §9 open question).
pub fn detect(current_files: &[FileRecord], baseline: &StoreSnapshot) -> Vec<ChangeRecord> {
    let current_by_path: BTreeMap<&Path, &FileRecord> =
        current_files.iter().map(|f| (f.source_path.as_path(), f)).collect();

    let all_paths: std::collections::BTreeSet<PathBuf> = current_by_path
        .keys()
        .map(|p| p.to_path_buf())
        .chain(baseline.iter().map(|(p, _)| p.clone()))
        .collect();
    // BTreeSet already yields lexicographic order; dedup handled by the set itself.
    let paths: Vec<PathBuf> = all_paths.into_iter().collect();

    let mut out = Vec::new();
    for path in paths {
        let current = current_by_path.get(path.as_path()).copied();
        let prior = baseline.get(&path);

        let record = match (current, prior) {
            (Some(cur), None) => Some(ChangeRecord {
                source_path: path,
                kind: ChangeKind::Added,
                element_changes: cur
                    .elements
                    .iter()
                    .map(|e| ElementChange {
                        name: e.name.clone(),
                        kind: e.kind,
                        prev_hash: None,
                        new_hash: Some(e.canonical_hash.clone()),
                        change: ChangeKind::Added,
                    })
                    .collect(),
            }),
            (None, Some(prev)) => Some(ChangeRecord {
                source_path: path,
                kind: ChangeKind::Deleted,
                element_changes: prev
                    .elements
                    .iter()
                    .map(|e| ElementChange {
                        name: e.name.clone(),
                        kind: e.kind,
                        prev_hash: Some(e.canonical_hash.clone()),
                        new_hash: None,
                        change: ChangeKind::Deleted,
                    })
                    .collect(),
            }),
            (Some(cur), Some(prev)) => {
                let element_changes = diff_elements(&prev.elements, &cur.elements);
                if element_changes.is_empty() {
                    None
                } else {
                    Some(ChangeRecord {
                        source_path: path,
                        kind: ChangeKind::Modified,
                        element_changes,
                    })
                }
            }
            (None, None) => unreachable!("path came from one of the two maps"),
        };

        if let Some(record) = record {
            out.push(record);
        }
    }

    out
}

fn diff_elements(prev: &[ElementRecord], cur: &[ElementRecord]) -> Vec<ElementChange> {
    let prev_by_key: BTreeMap<_, &ElementRecord> =
        prev.iter().map(|e| (e.span_key(), e)).collect();
    let cur_by_key: BTreeMap<_, &ElementRecord> = cur.iter().map(|e| (e.span_key(), e)).collect();

    let mut changes = Vec::new();

    for (key, cur_el) in &cur_by_key {
        match prev_by_key.get(key) {
            Some(prev_el) if prev_el.canonical_hash != cur_el.canonical_hash => {
                changes.push(ElementChange {
                    name: cur_el.name.clone(),
                    kind: cur_el.kind,
                    prev_hash: Some(prev_el.canonical_hash.clone()),
                    new_hash: Some(cur_el.canonical_hash.clone()),
                    change: ChangeKind::Modified,
                });
            }
            Some(_) => {}
            None => {
                changes.push(ElementChange {
                    name: cur_el.name.clone(),
                    kind: cur_el.kind,
                    prev_hash: None,
                    new_hash: Some(cur_el.canonical_hash.clone()),
                    change: ChangeKind::Added,
                });
            }
        }
    }

    for (key, prev_el) in &prev_by_key {
        if !cur_by_key.contains_key(key) {
            changes.push(ElementChange {
                name: prev_el.name.clone(),
                kind: prev_el.kind,
                prev_hash: Some(prev_el.canonical_hash.clone()),
                new_hash: None,
                change: ChangeKind::Deleted,
            });
        }
    }

    // Keep a deterministic order: by element name, then change kind.
    changes.sort_by(|a, b| a.name.cmp(&b.name).then(change_kind_order(a.change).cmp(&change_kind_order(b.change))));
    changes
}

fn change_kind_order(k: ChangeKind) -> u8 {
    match k {
        ChangeKind::Added => 0,
        ChangeKind::Modified => 1,
        ChangeKind::Deleted => 2,
    }
}
