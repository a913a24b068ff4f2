//! Shared data model (spec §3): Element Record, File Record, Change Record, Output
//! Section, Build Plan. Kept in one module since these types are threaded through every
//! component rather than owned by any single one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// A top-level named construct extracted from source by the Structural Analyzer (C9).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    pub name: String,
    pub kind: ElementKind,
    pub start_line: u32,
    pub end_line: u32,
    pub canonical_hash: String,
    pub declared_dependencies: Vec<String>,
    pub exported: bool,
}

impl ElementRecord {
    pub fn span_key(&self) -> (ElementKind, &str) {
        (self.kind, self.name.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Function,
    Class,
    Interface,
    Type,
    Import,
    Export,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Type => "type",
            Self::Import => "import",
            Self::Export => "export",
        }
    }
}

/// One source file's worth of elements, as tracked by the Element Store.
///
/// Invariant: `elements` is ordered by `start_line`; names are unique within a file for
/// the same [`ElementKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub source_path: PathBuf,
    pub file_hash: String,
    pub elements: Vec<ElementRecord>,
    pub output_paths: Vec<PathBuf>,
    pub language: String,
}

impl FileRecord {
    /// Debug-asserts the ordering/uniqueness invariant; called after construction from
    /// untrusted (analyzer/deserialized) input.
    pub fn validate(&self) -> Result<(), String> {
        let mut last_line = 0u32;
        let mut seen = BTreeSet::new();
        for (i, el) in self.elements.iter().enumerate() {
            if i > 0 && el.start_line < last_line {
                return Err(format!(
                    "elements not ordered by start_line at index {i} ({} < {last_line})",
                    el.start_line
                ));
            }
            last_line = el.start_line;
            if !seen.insert((el.kind, el.name.clone())) {
                return Err(format!("duplicate element {} of kind {:?}", el.name, el.kind));
            }
        }
        Ok(())
    }
}

/// Per-element change classification, plus the file-level envelope, emitted by the Change
/// Detector (C3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementChange {
    pub name: String,
    pub kind: ElementKind,
    pub prev_hash: Option<String>,
    pub new_hash: Option<String>,
    pub change: ChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub source_path: PathBuf,
    pub kind: ChangeKind,
    pub element_changes: Vec<ElementChange>,
}

/// A contiguous, typed region of a generated output file (spec §3, §4.C6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSection {
    pub kind: SectionKind,
    pub element_name: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub text: String,
    pub hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Import,
    Function,
    Class,
    Export,
    Other,
}

/// Decision produced by the Build Planner (C5), consumed by the Incremental Generator (C7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub mode: BuildMode,
    pub affected: Vec<PathBuf>,
    pub impact: Vec<String>,
    pub rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Incremental,
    Full,
    NoOp,
}
