//! Top-level `BuildInvocation`: the composition root that wires C1–C7 together and runs
//! the `Idle -> Detecting -> Planning -> (Incremental | Full | NoOp) -> Persisting -> Idle`
//! state machine for a single invocation (spec §4.C7 "State machine", §5, §9 redesign
//! notes — explicit constructor wiring, no DI container).

use crate::change;
use crate::config::EngineConfig;
use crate::depindex::DependencyIndex;
use crate::error::{EngineError, Result};
use crate::generator::{self, GenerationResult};
use crate::log::BuildLog;
use crate::model::{BuildMode, FileRecord};
use crate::oracle::CodeOracle;
use crate::planner;
use crate::section::TargetLanguage;
use crate::store::ElementStore;
use std::path::{Path, PathBuf};

/// Observable phase of a build invocation, mirrored 1:1 from spec §4.C7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    Detecting,
    Planning,
    Generating,
    Persisting,
}

/// Outcome of a full `BuildInvocation::run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub mode: BuildMode,
    pub rationale: String,
    pub generation: Option<GenerationResult>,
    /// Set when the Element Store's on-disk cache existed but failed to parse (spec §7
    /// `CacheError`). The build still proceeds as a full rebuild per spec §4.C2; this flag
    /// lets the caller report spec §6 exit code 3 instead of a plain success.
    pub cache_corrupt: bool,
}

/// One build over a project root. Owns the single writer handle to the Element Store for
/// its lifetime; does not survive past `run()` returning (a fresh invocation is built per
/// build, per the single-writer invariant in spec §4.C2/§5).
pub struct BuildInvocation<'a> {
    project_root: PathBuf,
    store: ElementStore,
    oracle: &'a dyn CodeOracle,
    target: TargetLanguage,
    target_name: String,
    config: EngineConfig,
    log: BuildLog,
}

impl<'a> BuildInvocation<'a> {
    pub fn new(
        project_root: impl Into<PathBuf>,
        oracle: &'a dyn CodeOracle,
        target: TargetLanguage,
        target_name: impl Into<String>,
        config: EngineConfig,
    ) -> Self {
        let project_root = project_root.into();
        let store = ElementStore::at(&project_root);
        let log = BuildLog::new(
            project_root.to_string_lossy().as_ref(),
            &format!("{:?}", std::time::SystemTime::now()),
        );
        Self { project_root, store, oracle, target, target_name: target_name.into(), config, log }
    }

    pub fn log(&self) -> &BuildLog {
        &self.log
    }

    /// Drops the persisted cache and marks the in-memory store cold, per the
    /// `--clear-cache` flag (spec §6 `genesis`/`run`). Implemented as a pre-step here
    /// rather than a planner rule, since it is an explicit user request, not a rule the
    /// planner should infer from change shape.
    pub fn clear_cache(&mut self) -> Result<()> {
        self.store.clear();
        self.store.save()
    }

    /// Runs one full invocation of the state machine over `current_files`, the fresh
    /// Structural Analyzer output for every source path under `project_root`.
    pub fn run(&mut self, current_files: Vec<FileRecord>) -> Result<BuildOutcome> {
        let span = self.log.span().clone();
        let _entered = span.enter();

        // Idle -> Detecting
        self.store.load();
        let is_cold = self.store.is_cold();
        let cache_corrupt = self.store.is_corrupt();
        let baseline = self.store.snapshot();
        tracing::debug!(phase = ?BuildPhase::Detecting, cold = is_cold, corrupt = cache_corrupt, "loaded element store");

        let changes = change::detect(&current_files, &baseline);
        tracing::info!(phase = ?BuildPhase::Detecting, changes = changes.len(), "change detection complete");

        // Detecting -> Planning
        let index = DependencyIndex::rebuild(&baseline);
        let total_files = current_files.len();
        let plan = planner::plan(&changes, &index, &baseline, is_cold, total_files, &self.config);
        tracing::info!(phase = ?BuildPhase::Planning, mode = ?plan.mode, rationale = %plan.rationale, "build plan selected");

        // (Incremental | Full | NoOp) -> Persisting
        let generation = match plan.mode {
            BuildMode::NoOp => None,
            BuildMode::Incremental => {
                let result = generator::generate(
                    &plan,
                    &mut self.store,
                    &current_files,
                    self.oracle,
                    self.target,
                    &self.target_name,
                    &self.config,
                )?;
                Some(result)
            }
            BuildMode::Full => {
                let result = self.run_full(&current_files)?;
                Some(result)
            }
        };

        // Persisting: remove records for paths no longer present, then save.
        if plan.mode != BuildMode::NoOp {
            self.persist_deletions(&changes);
            self.store.save()?;
            tracing::info!(phase = ?BuildPhase::Persisting, "element store saved");
        }

        Ok(BuildOutcome { mode: plan.mode, rationale: plan.rationale, generation, cache_corrupt })
    }

    /// A full rebuild regenerates whole output files for every current source path,
    /// replacing the store wholesale rather than element-by-element (spec §4.C5 rule 1/3/4
    /// all resolve to this path; §8 scenario 1 "Cold cache, one file").
    fn run_full(&mut self, current_files: &[FileRecord]) -> Result<GenerationResult> {
        let full_plan = crate::model::BuildPlan {
            mode: BuildMode::Full,
            affected: current_files.iter().map(|f| f.source_path.clone()).collect(),
            impact: Vec::new(),
            rationale: "full rebuild".into(),
        };
        generator::generate_full(&full_plan, &mut self.store, current_files, self.oracle, self.target, &self.target_name, &self.config)
    }

    /// Drops store entries for any source path the Change Detector reported as deleted
    /// (spec §8 scenario 4 "Delete a file" — output removal itself is the generator's job,
    /// here we only retire the store/index bookkeeping).
    fn persist_deletions(&mut self, changes: &[crate::model::ChangeRecord]) {
        for change in changes {
            if change.kind == crate::model::ChangeKind::Deleted {
                self.store.remove(&change.source_path);
            }
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

/// Cancellation token for a build invocation (spec §5 "Cancellation").
///
/// Cancellation before Persisting leaves the Element Store untouched; once Persisting has
/// begun, in-flight atomic renames are allowed to complete rather than being interrupted
/// mid-write.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(EngineError::internal("E_CANCELLED", "build invocation was cancelled"))
        } else {
            Ok(())
        }
    }
}
