//! Integration tests for the seeded end-to-end scenarios (spec §8).

use sunscript_engine::error::{EngineError, Result as EngineResult};
use sunscript_engine::model::{BuildMode, ElementKind, ElementRecord, FileRecord};
use sunscript_engine::oracle::{CodeOracle, DeterministicOracle, OracleRequest, OracleResponse};
use sunscript_engine::section::TargetLanguage;
use sunscript_engine::store::ElementStore;
use sunscript_engine::{BuildInvocation, EngineConfig};
use std::path::{Path, PathBuf};

fn file(dir: &Path, name: &str, elements: Vec<ElementRecord>) -> FileRecord {
    let source_path = PathBuf::from(name);
    FileRecord {
        source_path: source_path.clone(),
        file_hash: format!("hash-of-{name}"),
        elements,
        output_paths: vec![dir.join(name).with_extension("js")],
        language: "sunscript".into(),
    }
}

fn func(name: &str, hash: &str) -> ElementRecord {
    ElementRecord {
        name: name.into(),
        kind: ElementKind::Function,
        start_line: 1,
        end_line: 4,
        canonical_hash: hash.into(),
        declared_dependencies: vec![],
        exported: true,
    }
}

fn invocation<'a>(dir: &Path, oracle: &'a dyn CodeOracle) -> BuildInvocation<'a> {
    BuildInvocation::new(dir, oracle, TargetLanguage::JavaScript, "node18", EngineConfig::default())
}

/// Scenario 1: cold cache, one file with one function.
#[test]
fn cold_cache_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = DeterministicOracle;
    let mut build = invocation(dir.path(), &oracle);

    let outcome = build.run(vec![file(dir.path(), "a.sun", vec![func("foo", "h1")])]).unwrap();

    assert_eq!(outcome.mode, BuildMode::Full);
    let generation = outcome.generation.unwrap();
    assert_eq!(generation.added.len() + generation.modified.len(), 1);

    let mut store = ElementStore::at(dir.path());
    store.load();
    assert!(!store.is_cold());
    assert_eq!(store.len(), 1);
    let record = store.get(Path::new("a.sun")).unwrap();
    assert_eq!(record.elements.len(), 1);
    assert_eq!(record.elements[0].name, "foo");
    assert!(record.output_paths[0].exists());
}

/// Scenario 2: pure edit — only `foo`'s hash changes, plan must be incremental.
#[test]
fn pure_edit_is_incremental() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = DeterministicOracle;

    invocation(dir.path(), &oracle)
        .run(vec![file(dir.path(), "a.sun", vec![func("foo", "h1")])])
        .unwrap();

    let outcome = invocation(dir.path(), &oracle)
        .run(vec![file(dir.path(), "a.sun", vec![func("foo", "h2")])])
        .unwrap();

    assert_eq!(outcome.mode, BuildMode::Incremental);
    let generation = outcome.generation.unwrap();
    assert!(generation.affected_elements.contains(&"foo".to_string()));
}

/// Scenario 3: adding a function is a structural change, plan must escalate to full.
#[test]
fn adding_a_function_forces_full_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = DeterministicOracle;

    invocation(dir.path(), &oracle)
        .run(vec![file(dir.path(), "a.sun", vec![func("foo", "h1")])])
        .unwrap();

    let outcome = invocation(dir.path(), &oracle)
        .run(vec![file(dir.path(), "a.sun", vec![func("foo", "h1"), func("bar", "h2")])])
        .unwrap();

    assert_eq!(outcome.mode, BuildMode::Full);

    let mut store = ElementStore::at(dir.path());
    store.load();
    assert_eq!(store.get(Path::new("a.sun")).unwrap().elements.len(), 2);
}

/// Scenario 4: deleting a file forces a full rebuild and removes its output.
#[test]
fn deleting_a_file_removes_its_output() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = DeterministicOracle;

    invocation(dir.path(), &oracle)
        .run(vec![
            file(dir.path(), "a.sun", vec![func("foo", "h1")]),
            file(dir.path(), "b.sun", vec![func("baz", "h2")]),
        ])
        .unwrap();

    let b_output = dir.path().join("b.sun").with_extension("js");
    assert!(b_output.exists());

    let outcome = invocation(dir.path(), &oracle)
        .run(vec![file(dir.path(), "a.sun", vec![func("foo", "h1")])])
        .unwrap();

    assert_eq!(outcome.mode, BuildMode::Full);
    assert!(!b_output.exists());

    let mut store = ElementStore::at(dir.path());
    store.load();
    assert!(store.get(Path::new("b.sun")).is_none());
}

/// Scenario 5: dependent cascade — `baz` depends on `foo`; editing `foo` must also
/// regenerate `baz`'s section.
#[test]
fn dependent_cascade_regenerates_dependent_element() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = DeterministicOracle;

    let baz = ElementRecord {
        name: "baz".into(),
        kind: ElementKind::Function,
        start_line: 5,
        end_line: 8,
        canonical_hash: "hbaz".into(),
        declared_dependencies: vec!["foo".into()],
        exported: true,
    };
    invocation(dir.path(), &oracle)
        .run(vec![file(dir.path(), "a.sun", vec![func("foo", "h1"), baz.clone()])])
        .unwrap();

    let outcome = invocation(dir.path(), &oracle)
        .run(vec![file(dir.path(), "a.sun", vec![func("foo", "h2"), baz])])
        .unwrap();

    assert_eq!(outcome.mode, BuildMode::Incremental);
    let generation = outcome.generation.unwrap();
    assert!(generation.affected_elements.contains(&"foo".to_string()));
    assert!(generation.affected_elements.contains(&"baz".to_string()));
}

/// An oracle that fails fatally on a chosen element name, to exercise scenario 6.
struct FailingOracle {
    fails_on: &'static str,
}

impl CodeOracle for FailingOracle {
    fn generate(&self, request: &OracleRequest) -> EngineResult<OracleResponse> {
        if request.element_name == self.fails_on {
            return Err(EngineError::oracle("simulated fatal oracle failure", false));
        }
        DeterministicOracle.generate(request)
    }
}

/// Scenario 6: oracle failure mid-build leaves the cache untouched (spec §8 scenario 6,
/// "exit 5" — a fatal, non-retryable oracle error maps to exit code 5 "partial build
/// aborted" per `error.rs`'s exit-code table; a retryable failure that exhausts its retry
/// budget maps to 4 "oracle unavailable" instead).
#[test]
fn oracle_failure_mid_build_leaves_cache_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let stable_oracle = DeterministicOracle;

    invocation(dir.path(), &stable_oracle)
        .run(vec![file(dir.path(), "a.sun", vec![func("foo", "h1"), func("bar", "h2")])])
        .unwrap();

    let mut store_before = ElementStore::at(dir.path());
    store_before.load();
    let before = store_before.get(Path::new("a.sun")).cloned().unwrap();

    let failing_oracle = FailingOracle { fails_on: "bar" };
    let result = invocation(dir.path(), &failing_oracle).run(vec![file(
        dir.path(),
        "a.sun",
        vec![func("foo", "h3"), func("bar", "h4")],
    )]);

    let err = result.expect_err("oracle failure must propagate");
    assert_eq!(err.exit_code(), 5);

    let mut store_after = ElementStore::at(dir.path());
    store_after.load();
    let after = store_after.get(Path::new("a.sun")).cloned().unwrap();
    assert_eq!(before, after);
}

/// Deterministic full build: two full builds over the same unchanged source must
/// produce byte-identical output.
#[test]
fn full_build_is_deterministic() {
    let dir1 = tempfile::tempdir().unwrap();
    let dir2 = tempfile::tempdir().unwrap();
    let oracle = DeterministicOracle;

    invocation(dir1.path(), &oracle)
        .run(vec![file(dir1.path(), "a.sun", vec![func("foo", "h1"), func("bar", "h2")])])
        .unwrap();
    invocation(dir2.path(), &oracle)
        .run(vec![file(dir2.path(), "a.sun", vec![func("foo", "h1"), func("bar", "h2")])])
        .unwrap();

    let out1 = std::fs::read_to_string(dir1.path().join("a.js")).unwrap();
    let out2 = std::fs::read_to_string(dir2.path().join("a.js")).unwrap();
    assert_eq!(out1, out2);
}

/// Ratio gate: many changed files relative to the total forces a full rebuild even
/// though every change is a pure content edit.
#[test]
fn ratio_gate_forces_full_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = DeterministicOracle;

    let baseline: Vec<FileRecord> = (0..5)
        .map(|i| file(dir.path(), &format!("f{i}.sun"), vec![func("foo", "h1")]))
        .collect();
    invocation(dir.path(), &oracle).run(baseline).unwrap();

    // Edit every file's element hash: changed_files / total_files = 1.0 > default 0.20.
    let edited: Vec<FileRecord> = (0..5)
        .map(|i| file(dir.path(), &format!("f{i}.sun"), vec![func("foo", "h2")]))
        .collect();
    let outcome = invocation(dir.path(), &oracle).run(edited).unwrap();

    assert_eq!(outcome.mode, BuildMode::Full);
}
