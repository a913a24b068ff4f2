//! Watch-mode serialization: ensures only one [`BuildInvocation`] runs at a time per
//! source root (spec §5 "Resource policy" — "Watch mode (§6) serializes build invocations
//! so only one is in flight per source root"). The filesystem watcher itself (detecting
//! that a `.sun` file changed on disk) is an external collaborator, out of scope per
//! spec's Non-goals; this module only owns the in-flight gate.
//!
//! Grounded on the teacher's single-writer discipline around its project compile lock
//! (one `Project::compile` in flight per workspace), generalized here into an explicit
//! per-root mutex rather than a process-wide lock file.

use crate::build::{BuildInvocation, BuildOutcome};
use crate::error::Result;
use crate::model::FileRecord;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Holds one lock per source root that has been built through this gate. Shared across
/// watch-mode iterations within a single process; not persisted.
#[derive(Default)]
pub struct WatchGate {
    roots: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl WatchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `invocation` for `current_files`, holding `project_root`'s lock for the
    /// duration of the run. A concurrent call for the same root blocks on that same lock
    /// until the first call's `invocation.run(...)` returns; a call for a different root
    /// proceeds immediately (spec: scoped "per source root").
    pub fn run_serialized(
        &self,
        project_root: &Path,
        invocation: &mut BuildInvocation,
        current_files: Vec<FileRecord>,
    ) -> Result<BuildOutcome> {
        let root_lock = self.root_lock(project_root);
        let _held = root_lock.lock().expect("watch gate root mutex poisoned");
        invocation.run(current_files)
    }

    /// Returns the `Arc<Mutex<()>>` for `project_root`, creating it on first use. The
    /// outer `roots` mutex is only held long enough to look up or insert that per-root
    /// lock, never across the build itself — the per-root lock returned here is what
    /// actually serializes concurrent builds of the same root.
    fn root_lock(&self, project_root: &Path) -> Arc<Mutex<()>> {
        let mut roots = self.roots.lock().expect("watch gate mutex poisoned");
        roots.entry(project_root.to_path_buf()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }
}
