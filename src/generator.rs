//! C7 — Incremental Generator: orchestrate per-element regeneration through the AI
//! oracle, splice new sections into the output Section Model, and rewrite output files
//! surgically (spec §4.C7).

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::fingerprint::{self, CommentStyle};
use crate::model::{BuildMode, BuildPlan, ElementKind, ElementRecord, FileRecord};
use crate::oracle::{self, CodeOracle, OracleRequest};
use crate::section::{self, TargetLanguage};
use crate::store::ElementStore;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Builds the bounded worker pool the spec requires for oracle dispatch (spec §5: "may
/// dispatch multiple AI-oracle requests in parallel bounded by a configurable concurrency
/// N"), clamped to the machine's actual core count the way the teacher sizes its own
/// parallel compile pool.
fn oracle_pool(config: &EngineConfig) -> Result<rayon::ThreadPool> {
    let threads = config.oracle_concurrency.max(1).min(num_cpus::get().max(1));
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| EngineError::internal("E_ORACLE_POOL", e.to_string()))
}

/// Outcome of one incremental generation pass (spec §3 "Build Plan... consumed by C7").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResult {
    pub modified: Vec<PathBuf>,
    pub added: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub affected_elements: Vec<String>,
    pub elapsed_ms: u64,
}

/// Runs the Incremental Generator over `plan` (must be [`BuildMode::Incremental`]).
///
/// `current_files` is the fresh Structural Analyzer output for every source path the
/// Change Detector saw this build — the authoritative post-edit `canonical_hash`es live
/// there, not in anything this generator computes from generated text. On success, the
/// store entry for each touched source path is replaced with its `current_files` record
/// (the Persisting step, spec §4.C7's state machine).
///
/// On any failure the Element Store is left untouched for the whole invocation and no
/// output files for it are written beyond ones already atomically renamed — a failure
/// partway through one source path aborts the entire build, per spec §4.C7 and §8
/// scenario 6 ("Oracle failure mid-build").
pub fn generate(
    plan: &BuildPlan,
    store: &mut ElementStore,
    current_files: &[FileRecord],
    oracle: &dyn CodeOracle,
    target: TargetLanguage,
    target_name: &str,
    config: &EngineConfig,
) -> Result<GenerationResult> {
    debug_assert_eq!(plan.mode, BuildMode::Incremental);
    let start = Instant::now();

    let snapshot = store.snapshot();
    let owners = owning_paths(&snapshot, &plan.impact);
    let fresh_by_path: BTreeMap<&Path, &FileRecord> =
        current_files.iter().map(|f| (f.source_path.as_path(), f)).collect();

    let mut result = GenerationResult::default();

    for (source_path, elements) in &owners {
        if start.elapsed() > config.build_timeout {
            return Err(EngineError::oracle("build wall-clock budget exceeded", true));
        }

        let Some(record) = snapshot.get(source_path) else { continue };
        // Use the fresh, post-edit File Record for regeneration context whenever the
        // Structural Analyzer already re-parsed this source this build; `record` (the
        // pre-edit snapshot) is only a fallback for bookkeeping when no fresh copy exists.
        let fresh = fresh_by_path.get(source_path.as_path()).copied();
        let context_record = fresh.unwrap_or(record);

        let Some(output_path) = record.output_paths.first().cloned() else {
            // No output file yet for this source: the whole file must be generated, still
            // scoped to this incremental invocation rather than a full rebuild.
            regenerate_whole_file(context_record, oracle, target, target_name, config)?;
            result.added.push(source_path.clone());
            if let Some(fresh) = fresh {
                store.put(source_path.clone(), fresh.clone());
            }
            continue;
        };

        let existing_text = fs::read_to_string(&output_path)
            .map_err(|e| EngineError::io(e, &output_path))?;
        let mut sections = section::split(&existing_text, target);

        let pool = oracle_pool(config)?;
        let responses: Vec<Result<crate::oracle::OracleResponse>> = pool.install(|| {
            elements
                .par_iter()
                .map(|element| request_regeneration(element, context_record, oracle, target_name, config))
                .collect()
        });

        // Dispatch is parallel, bounded by `oracle_concurrency`; splicing stays in the
        // elements' fixed order so replaying the same Build Plan with a deterministic
        // oracle yields byte-identical output (spec §5 ordering guarantee).
        for (element, response) in elements.iter().zip(responses) {
            let response = response?;
            let hash = fingerprint::hash(&response.code, target.comment_style());
            let new_section = crate::model::OutputSection {
                kind: section_kind_for(element.kind),
                element_name: Some(element.name.clone()),
                start_line: 0,
                end_line: 0,
                text: response.code,
                hash,
            };
            sections = section::splice(sections, new_section);
            result.affected_elements.push(element.name.clone());
        }

        let assembled = section::assemble(sections);
        write_atomically(&output_path, &assembled)?;
        result.modified.push(output_path);

        if let Some(fresh) = fresh {
            store.put(source_path.clone(), fresh.clone());
        }
    }

    result.elapsed_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

/// Runs a full rebuild (spec §4.C5 rules 1/3/4): every current source path has its whole
/// output file regenerated from scratch, and the store is replaced wholesale rather than
/// patched element-by-element. Source paths present in the old store but absent from
/// `current_files` have their output files removed (spec §8 scenario 4 "Delete a file").
pub fn generate_full(
    plan: &BuildPlan,
    store: &mut ElementStore,
    current_files: &[FileRecord],
    oracle: &dyn CodeOracle,
    target: TargetLanguage,
    target_name: &str,
    config: &EngineConfig,
) -> Result<GenerationResult> {
    debug_assert_eq!(plan.mode, BuildMode::Full);
    let start = Instant::now();

    let previous_paths: Vec<PathBuf> = store.iterate().map(|(path, _)| path.clone()).collect();
    let mut result = GenerationResult::default();

    let current_paths: std::collections::BTreeSet<&Path> =
        current_files.iter().map(|f| f.source_path.as_path()).collect();

    for path in &previous_paths {
        if current_paths.contains(path.as_path()) {
            continue;
        }
        if let Some(old_record) = store.remove(path) {
            for output_path in &old_record.output_paths {
                if output_path.exists() {
                    fs::remove_file(output_path).map_err(|e| EngineError::io(e, output_path))?;
                }
            }
            result.deleted.push(path.clone());
        }
    }

    for record in current_files {
        if start.elapsed() > config.build_timeout {
            return Err(EngineError::oracle("build wall-clock budget exceeded", true));
        }

        let is_new = store.get(&record.source_path).is_none();
        let mut record = record.clone();
        if record.output_paths.is_empty() {
            record.output_paths.push(default_output_path(&record.source_path, target));
        }
        regenerate_whole_file(&record, oracle, target, target_name, config)?;
        if is_new {
            result.added.push(record.source_path.clone());
        } else {
            result.modified.push(record.source_path.clone());
        }
        result.affected_elements.extend(record.elements.iter().map(|e| e.name.clone()));
        store.put(record.source_path.clone(), record);
    }

    result.elapsed_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

fn default_output_path(source_path: &Path, target: TargetLanguage) -> PathBuf {
    source_path.with_extension(target.extension())
}

fn section_kind_for(kind: ElementKind) -> crate::model::SectionKind {
    match kind {
        ElementKind::Function => crate::model::SectionKind::Function,
        ElementKind::Class => crate::model::SectionKind::Class,
        ElementKind::Interface => crate::model::SectionKind::Class,
        ElementKind::Type => crate::model::SectionKind::Other,
        ElementKind::Import => crate::model::SectionKind::Import,
        ElementKind::Export => crate::model::SectionKind::Export,
    }
}

fn request_regeneration(
    element: &ElementRecord,
    record: &FileRecord,
    oracle: &dyn CodeOracle,
    target_name: &str,
    config: &EngineConfig,
) -> Result<crate::oracle::OracleResponse> {
    let digest = fingerprint::hash(&record.file_hash, CommentStyle::None);
    let request = OracleRequest {
        prompt: format!("regenerate {} `{}`", element.kind.as_str(), element.name),
        element_kind: element.kind,
        element_name: element.name.clone(),
        target_language: target_name.to_string(),
        surrounding_context_digest: digest,
        max_tokens: 4096,
        temperature: 0.2,
        top_p: 1.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        timeout: config.oracle_timeout,
    };
    request.validate()?;
    oracle::with_retry(
        || oracle::call_with_timeout(oracle, &request),
        config.retry_budget,
        config.retry_backoff_base,
    )
}

fn regenerate_whole_file(
    record: &FileRecord,
    oracle: &dyn CodeOracle,
    target: TargetLanguage,
    target_name: &str,
    config: &EngineConfig,
) -> Result<()> {
    let output_path = record
        .output_paths
        .first()
        .ok_or_else(|| EngineError::internal("E_NO_OUTPUT_PATH", format!(
            "file record for {} has no output path",
            record.source_path.display()
        )))?;

    let pool = oracle_pool(config)?;
    let responses: Vec<Result<crate::oracle::OracleResponse>> = pool.install(|| {
        record
            .elements
            .par_iter()
            .map(|element| request_regeneration(element, record, oracle, target_name, config))
            .collect()
    });

    let mut sections = Vec::new();
    for (element, response) in record.elements.iter().zip(responses) {
        let response = response?;
        let hash = fingerprint::hash(&response.code, target.comment_style());
        sections.push(crate::model::OutputSection {
            kind: section_kind_for(element.kind),
            element_name: Some(element.name.clone()),
            start_line: 0,
            end_line: 0,
            text: response.code,
            hash,
        });
    }
    let assembled = section::assemble(sections);
    write_atomically(output_path, &assembled)
}

fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| EngineError::io(e, parent))?;
    }
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents).map_err(|e| EngineError::io(e, &tmp_path))?;
    fs::rename(&tmp_path, path).map_err(|e| EngineError::io(e, path))?;
    Ok(())
}

/// Groups impacted element names by the source path that declares them, per the current
/// store snapshot, preserving only elements actually present in `impact`.
fn owning_paths(
    snapshot: &crate::store::StoreSnapshot,
    impact: &[String],
) -> BTreeMap<PathBuf, Vec<ElementRecord>> {
    let wanted: std::collections::BTreeSet<&str> = impact.iter().map(|s| s.as_str()).collect();
    let mut out: BTreeMap<PathBuf, Vec<ElementRecord>> = BTreeMap::new();
    for (path, record) in snapshot.iter() {
        let matches: Vec<ElementRecord> =
            record.elements.iter().filter(|e| wanted.contains(e.name.as_str())).cloned().collect();
        if !matches.is_empty() {
            out.insert(path.clone(), matches);
        }
    }
    out
}

/// Maximum time a single generation pass is allowed to run before the per-build wall
/// clock budget check fires again; used by the watch loop to poll for cancellation.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
