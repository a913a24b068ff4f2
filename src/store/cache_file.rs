//! On-disk cache document: `<project-root>/.build-cache/elements.json`.
//!
//! Grounded on the teacher's `SolFilesCache`/`cache.rs`: a single self-describing JSON
//! document with a format tag, written via a temp-file-then-rename so a crash mid-write
//! never corrupts the previous store (spec §4.C2, §6, §8 "Store atomicity").

use crate::error::{EngineError, Result};
use crate::model::FileRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Format tag bumped whenever the on-disk shape changes incompatibly.
pub const CACHE_FORMAT_VERSION: i32 = 1;

pub const CACHE_FILE_NAME: &str = "elements.json";
pub const CACHE_DIR_NAME: &str = ".build-cache";

/// Abstract schema from spec §6: `{ version, files: { <path>: FileRecord } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheDocument {
    pub version: i32,
    pub files: BTreeMap<PathBuf, FileRecord>,
}

impl Default for CacheDocument {
    fn default() -> Self {
        Self { version: CACHE_FORMAT_VERSION, files: BTreeMap::new() }
    }
}

impl CacheDocument {
    /// Returns the well-known cache path for a project rooted at `root`.
    pub fn path_for(root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(CACHE_DIR_NAME).join(CACHE_FILE_NAME)
    }

    /// Reads and parses the cache document at `path`.
    ///
    /// Any I/O or parse failure is reported as [`EngineError::Cache`] — per spec §4.C2,
    /// the caller must treat this as a "cold cache" signal, not a hard error.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| EngineError::cache(format!(
            "could not read cache at {}: {e}",
            path.display()
        )))?;
        let doc: CacheDocument = serde_json::from_slice(&bytes).map_err(|e| {
            EngineError::cache(format!("corrupt cache at {}: {e}", path.display()))
        })?;
        if doc.version != CACHE_FORMAT_VERSION {
            return Err(EngineError::cache(format!(
                "cache at {} has format version {}, expected {CACHE_FORMAT_VERSION}",
                path.display(),
                doc.version
            )));
        }
        Ok(doc)
    }

    /// Writes the cache document atomically: serialize to `<path>.tmp`, then rename over
    /// `path`. Partial writes can never corrupt a previously-installed store because the
    /// rename is the only operation that makes the new content visible at `path`.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(e, parent))?;
        }
        let tmp_path = tmp_path_for(path);
        let bytes = serde_json::to_vec_pretty(self)
            .map_err(|e| EngineError::internal("E_CACHE_SERIALIZE", e.to_string()))?;
        fs::write(&tmp_path, &bytes).map_err(|e| EngineError::io(e, &tmp_path))?;
        fs::rename(&tmp_path, path).map_err(|e| EngineError::io(e, path))?;
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
