//! Genesis manifest parser/validator (spec §6 "Genesis manifest file format").
//!
//! Line-oriented format: `@directive value` pairs, `name { ... }` sections, `##` questions,
//! `#` comments. No teacher file implements a comparable directive grammar (the teacher
//! resolves remappings via an external crate's type, not a local parser); this is a novel
//! hand-written line scanner, written in the teacher's general style of preferring small
//! hand-rolled parsers over grammar crates (see `DESIGN.md`).

use crate::error::{EngineError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Parsed Genesis manifest (spec §6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenesisManifest {
    pub project: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub source: Option<String>,
    pub output: Option<String>,
    pub context: Option<String>,
    pub domain: Option<String>,
    pub sections: BTreeMap<String, Vec<String>>,
    pub questions: Vec<String>,
}

const PERMITTED_SECTIONS: &[&str] = &["imports", "config", "entrypoints", "build", "dependencies"];

/// Directive/value substrings that must never appear anywhere in the manifest (spec §6
/// "no `<script`, `javascript:`, or shell-substitution patterns anywhere").
const FORBIDDEN_PATTERNS: &[&str] = &["<script", "javascript:", "$(", "`"];

/// Parses `text` into a [`GenesisManifest`] without validating it; call [`validate`]
/// separately so parse errors (malformed section nesting) and validation errors (missing
/// `@project`, forbidden content) are reported distinctly (spec §7 "ValidationError").
pub fn parse(text: &str) -> Result<GenesisManifest> {
    let mut manifest = GenesisManifest::default();
    let mut current_section: Option<(String, Vec<String>)> = None;

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("##") {
            manifest.questions.push(line.trim_start_matches('#').trim().to_string());
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        if let Some((_name, lines)) = current_section.as_mut() {
            if line == "}" {
                let (name, lines) = current_section.take().unwrap();
                manifest.sections.insert(name, lines);
            } else {
                lines.push(line.to_string());
            }
            continue;
        }

        if let Some(name) = line.strip_suffix('{').map(|s| s.trim().to_string()) {
            if !PERMITTED_SECTIONS.contains(&name.as_str()) {
                return Err(EngineError::validation(format!(
                    "line {}: unknown section `{name}` (expected one of {PERMITTED_SECTIONS:?})",
                    lineno + 1
                )));
            }
            current_section = Some((name, Vec::new()));
            continue;
        }

        if let Some(rest) = line.strip_prefix('@') {
            let (directive, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let value = value.trim().to_string();
            match directive {
                "project" => manifest.project = Some(value),
                "version" => manifest.version = Some(value),
                "author" => manifest.author = Some(value),
                "source" => manifest.source = Some(value),
                "output" => manifest.output = Some(value),
                "context" => manifest.context = Some(value),
                "domain" => manifest.domain = Some(value),
                other => {
                    return Err(EngineError::validation(format!(
                        "line {}: unknown directive `@{other}`",
                        lineno + 1
                    )))
                }
            }
            continue;
        }

        return Err(EngineError::validation(format!("line {}: unrecognized line `{line}`", lineno + 1)));
    }

    if current_section.is_some() {
        return Err(EngineError::validation("unterminated section (missing closing `}`)".to_string()));
    }

    Ok(manifest)
}

/// Validates a parsed manifest per spec §6: `@project` is required; `@source` != `@output`;
/// no `..` path traversal; no script-injection patterns anywhere in the raw text.
pub fn validate(manifest: &GenesisManifest, raw_text: &str) -> Result<()> {
    if manifest.project.as_deref().map(str::is_empty).unwrap_or(true) {
        return Err(EngineError::validation("@project is required"));
    }

    if let (Some(source), Some(output)) = (&manifest.source, &manifest.output) {
        if source == output {
            return Err(EngineError::validation("@source and @output must differ"));
        }
    }

    for path in manifest.source.iter().chain(manifest.output.iter()) {
        if contains_traversal(path) {
            return Err(EngineError::validation(format!("path `{path}` must not contain `..`")));
        }
    }

    if let Some(version) = &manifest.version {
        semver::Version::parse(version)
            .map_err(|e| EngineError::validation(format!("@version `{version}` is not valid semver: {e}")))?;
    }

    let lowered = raw_text.to_lowercase();
    for pattern in FORBIDDEN_PATTERNS {
        if lowered.contains(&pattern.to_lowercase()) {
            return Err(EngineError::validation(format!("manifest contains forbidden pattern `{pattern}`")));
        }
    }

    Ok(())
}

fn contains_traversal(path: &str) -> bool {
    Path::new(path).components().any(|c| c.as_os_str() == "..")
}

/// Parses and validates in one call, the entry point `genesis`/`run` use (spec §6).
pub fn parse_and_validate(text: &str) -> Result<GenesisManifest> {
    let manifest = parse(text)?;
    validate(&manifest, text)?;
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directives_sections_and_questions() {
        let text = "\
@project demo
@version 1.0.0
# a comment
## should we support watch mode?
config {
  strict = true
}
";
        let manifest = parse(text).unwrap();
        assert_eq!(manifest.project.as_deref(), Some("demo"));
        assert_eq!(manifest.version.as_deref(), Some("1.0.0"));
        assert_eq!(manifest.questions, vec!["should we support watch mode?"]);
        assert_eq!(manifest.sections["config"], vec!["strict = true"]);
    }

    #[test]
    fn missing_project_fails_validation() {
        let text = "@version 1.0.0\n";
        let manifest = parse(text).unwrap();
        assert!(validate(&manifest, text).is_err());
    }

    #[test]
    fn identical_source_and_output_fails_validation() {
        let text = "@project demo\n@source ./src\n@output ./src\n";
        let manifest = parse(text).unwrap();
        assert!(validate(&manifest, text).is_err());
    }

    #[test]
    fn path_traversal_is_rejected() {
        let text = "@project demo\n@source ../etc\n@output ./out\n";
        let manifest = parse(text).unwrap();
        assert!(validate(&manifest, text).is_err());
    }

    #[test]
    fn script_injection_pattern_is_rejected() {
        let text = "@project demo\n@context <script>alert(1)</script>\n";
        let manifest = parse(text).unwrap();
        assert!(validate(&manifest, text).is_err());
    }

    #[test]
    fn unknown_section_is_a_parse_error() {
        let text = "@project demo\nbogus {\n  x = 1\n}\n";
        assert!(parse(text).is_err());
    }

    #[test]
    fn non_semver_version_fails_validation() {
        let text = "@project demo\n@version not-a-version\n";
        let manifest = parse(text).unwrap();
        assert!(validate(&manifest, text).is_err());
    }

    #[test]
    fn unterminated_section_is_a_parse_error() {
        let text = "@project demo\nconfig {\n  x = 1\n";
        assert!(parse(text).is_err());
    }
}
