//! CLI-level check that a genuinely corrupt (as opposed to merely absent) Element Store
//! is reported via spec §6 exit code 3, while the build still completes (spec §4.C2: a
//! `CacheError` is reported, the store is treated as cold, the build proceeds as full).

use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn sunc() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sunc"))
}

#[test]
fn corrupt_cache_file_is_reported_via_exit_code_3() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("a.sun");
    fs::write(&source, "function foo() {\n  return 1;\n}\n").unwrap();

    // First run: no cache yet, a plain cold-cache full build, exit 0.
    let first = sunc().args(["compile", "--input"]).arg(&source).output().unwrap();
    assert!(first.status.success(), "first build should succeed: {:?}", first);

    let cache_path: PathBuf = dir.path().join(".build-cache").join("elements.json");
    assert!(cache_path.exists(), "first build should have written a cache file");

    // Corrupt the cache in place, as opposed to deleting it (which would just be another
    // ordinary cold-cache first build, not the corruption case spec §7 calls out).
    fs::write(&cache_path, b"this is not json").unwrap();

    let second = sunc().args(["compile", "--input"]).arg(&source).output().unwrap();
    assert_eq!(second.status.code(), Some(3), "stderr: {}", String::from_utf8_lossy(&second.stderr));
    assert!(String::from_utf8_lossy(&second.stderr).contains("corrupt"));

    // The rebuild still completes: the cache is rewritten and is valid again.
    let reread = fs::read_to_string(&cache_path).unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&reread).is_ok());
}
