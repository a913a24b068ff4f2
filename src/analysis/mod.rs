//! Reverse-Compilation Analysis Pipeline: language detection (C8) -> structural extraction
//! (C9) -> quality/content analysis (C10) -> natural-language synthesis (C11), sharing C1
//! for element hashing so its artifacts participate in the same cache (spec §2).

pub mod language;
pub mod quality;
pub mod structural;
pub mod synth;

use crate::oracle::CodeOracle;
use serde::{Deserialize, Serialize};

/// `{ language, file, functions[], classes[], interfaces[], types[], imports[], exports[],
/// dependencies[], patterns[], complexity, maintainability, testability, documentation,
/// natural_language_description }` (spec §3 "Analysis Record").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub language: String,
    pub file: String,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub interfaces: Vec<String>,
    pub types: Vec<String>,
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub dependencies: Vec<String>,
    pub patterns: Vec<quality::PatternMatch>,
    pub complexity: u32,
    pub maintainability: u32,
    pub testability: u32,
    pub documentation: u32,
    pub natural_language_description: String,
}

/// Runs the full C8 -> C9 -> C10 -> C11 pipeline over one file's content. Never fails: a
/// detector/extractor error degrades to an empty section rather than aborting (spec §7
/// "Propagation policy" — the Structural Analyzer never throws on malformed source).
pub fn analyze_file(path: &str, content: &str, oracle: &dyn CodeOracle) -> AnalysisRecord {
    let detection = language::detect_file(path, content);
    let elements = structural::extract(detection.language.as_str(), content);

    let functions = structural::names_of(&elements, crate::model::ElementKind::Function);
    let classes = structural::names_of(&elements, crate::model::ElementKind::Class);
    let interfaces = structural::names_of(&elements, crate::model::ElementKind::Interface);
    let types = structural::names_of(&elements, crate::model::ElementKind::Type);
    let imports = structural::names_of(&elements, crate::model::ElementKind::Import);
    let exports = structural::names_of(&elements, crate::model::ElementKind::Export);
    let dependencies: Vec<String> = elements
        .iter()
        .flat_map(|e| e.declared_dependencies.iter().cloned())
        .collect();

    let metrics = quality::analyze(content, &elements, detection.language.as_str());

    let mut record = AnalysisRecord {
        language: detection.language,
        file: path.to_string(),
        functions,
        classes,
        interfaces,
        types,
        imports,
        exports,
        dependencies,
        patterns: metrics.patterns,
        complexity: metrics.cyclomatic_complexity,
        maintainability: metrics.maintainability_index,
        testability: metrics.testability,
        documentation: metrics.documentation,
        natural_language_description: String::new(),
    };

    record.natural_language_description = synth::synthesize(&record, oracle);
    record
}
