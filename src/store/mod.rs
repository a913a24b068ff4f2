//! C2 — Element Store: persisted map (source path -> File Record) that serves as the
//! previous-build baseline (spec §3, §4.C2).

pub mod cache_file;

use crate::error::Result;
use crate::model::FileRecord;
use cache_file::CacheDocument;
use path_slash::PathExt as _;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Normalizes a path to forward-slash form before it becomes a cache key, so a store
/// written on one platform reads back identically on another (the teacher's `path-slash`
/// usage for cache-key portability, generalized from Solidity import paths to source
/// paths here).
fn normalize_key(path: &Path) -> PathBuf {
    PathBuf::from(path.to_slash_lossy().into_owned())
}

/// A read-only snapshot of the store, safe to share with concurrent readers while the
/// store itself is mutated only by the single writer that owns a `BuildInvocation`
/// (spec §5 single-writer invariant).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    files: BTreeMap<PathBuf, FileRecord>,
}

impl StoreSnapshot {
    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.files.get(&normalize_key(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &FileRecord)> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// The persisted element map. `load`/`save` go through [`cache_file::CacheDocument`].
pub struct ElementStore {
    path: PathBuf,
    doc: CacheDocument,
    /// Set when `load()` hit a missing/corrupt file; callers must treat the store as
    /// empty rather than erroring (spec §4.C2 "cold cache").
    cold: bool,
    /// Set when `load()` hit a file that exists but failed to parse — as opposed to a
    /// simply absent file (first build). Distinct from `cold`: every corrupt load is cold,
    /// but not every cold load is corrupt. Spec §7's `CacheError` is "reported, store is
    /// treated as cold, build proceeds as full" — the corrupt case still completes a full
    /// build, but the caller (`sunc`) surfaces it via exit code 3 rather than 0.
    corrupt: bool,
}

impl ElementStore {
    /// Opens the store at the well-known cache path under `project_root`, without
    /// touching disk yet. Call [`Self::load`] to populate it.
    pub fn at(project_root: impl AsRef<Path>) -> Self {
        Self { path: CacheDocument::path_for(project_root), doc: CacheDocument::default(), cold: true, corrupt: false }
    }

    /// Opens the store at an explicit cache file path (used by tests and by callers that
    /// don't want the well-known `.build-cache/elements.json` layout).
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), doc: CacheDocument::default(), cold: true, corrupt: false }
    }

    pub fn cache_path(&self) -> &Path {
        &self.path
    }

    /// Loads the cache document from disk. On failure the store becomes "cold" but this
    /// is not itself an error: callers should proceed with an empty store. Per spec §7 a
    /// `CacheError` must still be *reported*, not merely swallowed, so a genuinely corrupt
    /// (as opposed to simply absent, i.e. first-build) cache file is logged at `warn` and
    /// flagged via [`Self::is_corrupt`] for the caller to surface (spec §6 exit code 3).
    pub fn load(&mut self) -> &mut Self {
        match CacheDocument::read(&self.path) {
            Ok(doc) => {
                self.doc = doc;
                self.cold = false;
                self.corrupt = false;
            }
            Err(err) => {
                if self.path.exists() {
                    tracing::warn!(path = %self.path.display(), error = %err, "cache unreadable or corrupt, falling back to a cold cache");
                    self.corrupt = true;
                } else {
                    tracing::debug!(path = %self.path.display(), "no cache file found, starting cold");
                    self.corrupt = false;
                }
                self.doc = CacheDocument::default();
                self.cold = true;
            }
        }
        self
    }

    /// Whether the store is cold (absent/corrupt on disk, or never loaded / explicitly
    /// cleared). A cold store forces a full build (spec §4.C5 rule 1).
    pub fn is_cold(&self) -> bool {
        self.cold
    }

    /// Whether the most recent `load()` found an existing-but-unreadable cache file, as
    /// opposed to a simply missing one. Missing is the ordinary first-build case; corrupt
    /// is the spec §7 `CacheError` the CLI reports via exit code 3.
    pub fn is_corrupt(&self) -> bool {
        self.corrupt
    }

    pub fn save(&self) -> Result<()> {
        self.doc.write(&self.path)
    }

    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.doc.files.get(&normalize_key(path))
    }

    pub fn put(&mut self, path: PathBuf, record: FileRecord) {
        self.doc.files.insert(normalize_key(&path), record);
    }

    pub fn remove(&mut self, path: &Path) -> Option<FileRecord> {
        self.doc.files.remove(&normalize_key(path))
    }

    pub fn iterate(&self) -> impl Iterator<Item = (&PathBuf, &FileRecord)> {
        self.doc.files.iter()
    }

    pub fn len(&self) -> usize {
        self.doc.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.files.is_empty()
    }

    /// Resets the store to empty and marks it cold, without touching disk. A subsequent
    /// `save()` installs an empty store (used by `--clear-cache`).
    pub fn clear(&mut self) {
        self.doc = CacheDocument::default();
        self.cold = true;
        self.corrupt = false;
    }

    /// Takes an explicit, independent snapshot for readers that must not observe later
    /// mutations made by the single writer during the same build invocation.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot { files: self.doc.files.clone() }
    }
}
