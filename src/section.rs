//! C6 — Section Model: parse a generated output file into ordered, typed sections, and
//! splice/assemble them back into text (spec §4.C6). Sections are the unit of incremental
//! splicing performed by the Incremental Generator (C7).
//!
//! Grounded on the teacher's `Lazy<Regex>`-per-pattern idiom (`compile/mod.rs`'s
//! `SUPPORTS_BASE_PATH`/`SUPPORTS_INCLUDE_PATH` statics) generalized from single version
//! predicates to a small table of per-target-language anchor patterns.

use crate::fingerprint::{self, CommentStyle};
use crate::model::{OutputSection, SectionKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Generation targets named in spec §6 (`compile --target`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetLanguage {
    JavaScript,
    TypeScript,
    Python,
    Html,
}

impl TargetLanguage {
    pub fn comment_style(self) -> CommentStyle {
        match self {
            Self::JavaScript | Self::TypeScript => CommentStyle::DoubleSlash,
            Self::Python => CommentStyle::Hash,
            Self::Html => CommentStyle::None,
        }
    }

    /// Default output file extension for this target, used when a File Record carries no
    /// `output_paths` yet (spec §3 File Record — populated by the caller, not derived here
    /// by convention; this is the one-time fallback for a brand-new source path).
    pub fn extension(self) -> &'static str {
        match self {
            Self::JavaScript => "js",
            Self::TypeScript => "ts",
            Self::Python => "py",
            Self::Html => "html",
        }
    }

    fn anchors(self) -> &'static [(SectionKind, &'static Lazy<Regex>)] {
        match self {
            Self::JavaScript | Self::TypeScript => JS_ANCHORS,
            Self::Python => PY_ANCHORS,
            Self::Html => &[],
        }
    }
}

static JS_ANCHORS: &[(SectionKind, &Lazy<Regex>)] = &[
    (SectionKind::Import, &IMPORT_JS),
    (SectionKind::Export, &EXPORT_JS),
    (SectionKind::Class, &CLASS_JS),
    (SectionKind::Function, &FUNCTION_JS),
];
static PY_ANCHORS: &[(SectionKind, &Lazy<Regex>)] = &[
    (SectionKind::Import, &IMPORT_PY),
    (SectionKind::Class, &CLASS_PY),
    (SectionKind::Function, &FUNCTION_PY),
];

static IMPORT_JS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*import\b").unwrap());
static EXPORT_JS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*export\s+(default\s+)?(async\s+)?(function|class|const|let|var)\b").unwrap());
static CLASS_JS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*class\s+([A-Za-z_$][\w$]*)").unwrap());
static FUNCTION_JS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)").unwrap());

static IMPORT_PY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(import|from)\s+\S").unwrap());
static CLASS_PY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*class\s+([A-Za-z_]\w*)").unwrap());
static FUNCTION_PY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*def\s+([A-Za-z_]\w*)").unwrap());

static NAME_CAPTURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([A-Za-z_$][\w$]*)\s*[\(:=]").unwrap());

/// Splits `text` into ordered sections. Lines before the first anchor form a leading
/// `other` section (possibly empty, which is dropped).
pub fn split(text: &str, target: TargetLanguage) -> Vec<OutputSection> {
    let lines: Vec<&str> = text.lines().collect();
    let anchors = target.anchors();

    let mut boundaries: Vec<(usize, SectionKind)> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        for (kind, pattern) in anchors {
            if pattern.is_match(line) {
                boundaries.push((i, *kind));
                break;
            }
        }
    }

    let mut sections = Vec::new();
    if let Some(&(first, _)) = boundaries.first() {
        if first > 0 {
            sections.push(make_section(&lines, 0, first - 1, SectionKind::Other, None, target));
        }
    } else if !lines.is_empty() {
        sections.push(make_section(&lines, 0, lines.len() - 1, SectionKind::Other, None, target));
        return sections;
    }

    for (idx, &(start, kind)) in boundaries.iter().enumerate() {
        let end = boundaries.get(idx + 1).map(|&(next, _)| next - 1).unwrap_or(lines.len() - 1);
        let name = element_name(lines[start]);
        sections.push(make_section(&lines, start, end, kind, name, target));
    }

    sections
}

fn element_name(anchor_line: &str) -> Option<String> {
    NAME_CAPTURE.captures(anchor_line).map(|c| c[1].to_string())
}

fn make_section(
    lines: &[&str],
    start: usize,
    end: usize,
    kind: SectionKind,
    element_name: Option<String>,
    target: TargetLanguage,
) -> OutputSection {
    // Trim trailing blank separator lines so `assemble`'s own blank-line separator is the
    // only source of inter-section spacing; otherwise a round-trip would double it up.
    let mut effective_end = end;
    while effective_end > start && lines[effective_end].trim().is_empty() {
        effective_end -= 1;
    }
    let text = lines[start..=effective_end].join("\n");
    let canonical = fingerprint::canonicalize(&text, target.comment_style());
    let hash = fingerprint::hash_canonical(&canonical);
    OutputSection {
        kind,
        element_name,
        start_line: start as u32 + 1,
        end_line: effective_end as u32 + 1,
        text,
        hash,
    }
}

/// Inserts or replaces `new_section` by `element_name`. When absent, `sections` has no
/// matching name and `new_section` is appended just before the export block, per spec
/// §4.C6's splice ordering policy.
pub fn splice(mut sections: Vec<OutputSection>, new_section: OutputSection) -> Vec<OutputSection> {
    if new_section.element_name.is_none() {
        sections.push(new_section);
        return sections;
    }

    if let Some(pos) = sections
        .iter()
        .position(|s| s.element_name.is_some() && s.element_name == new_section.element_name)
    {
        let mut replacement = new_section;
        replacement.start_line = sections[pos].start_line;
        replacement.end_line = sections[pos].end_line;
        sections[pos] = replacement;
        return sections;
    }

    let insert_at = sections.iter().position(|s| s.kind == SectionKind::Export).unwrap_or(sections.len());
    sections.insert(insert_at, new_section);
    sections
}

/// Removes the section named `element_name`, if present (used for deleted elements).
pub fn remove_by_name(mut sections: Vec<OutputSection>, element_name: &str) -> Vec<OutputSection> {
    sections.retain(|s| s.element_name.as_deref() != Some(element_name));
    sections
}

/// Emits sections in canonical order (leading other content -> imports ->
/// functions/classes in prior relative order -> exports), separated by exactly one blank
/// line. `other` sorts first, not last as spec §4.C6's prose lists it, because `split`
/// only ever produces it as the leading content before a file's first anchor; sorting it
/// last would silently relocate a leading license header or shebang to the end of the
/// file on every splice, breaking the round-trip invariant spec §8 requires. Disclosed as
/// an Open Question decision in DESIGN.md.
pub fn assemble(mut sections: Vec<OutputSection>) -> String {
    sections.sort_by_key(|s| canonical_order(s.kind));
    sections.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

fn canonical_order(kind: SectionKind) -> u8 {
    match kind {
        SectionKind::Other => 0,
        SectionKind::Import => 1,
        SectionKind::Function => 2,
        SectionKind::Class => 2,
        SectionKind::Export => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "import { a } from 'a';\n\nfunction foo() {\n  return 1;\n}\n\nexport { foo };\n";

    #[test]
    fn split_recognizes_import_function_export() {
        let sections = split(SAMPLE, TargetLanguage::JavaScript);
        let kinds: Vec<_> = sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::Import, SectionKind::Function, SectionKind::Export]);
        assert_eq!(sections[1].element_name.as_deref(), Some("foo"));
    }

    #[test]
    fn round_trip_splice_is_byte_identical() {
        let sections = split(SAMPLE, TargetLanguage::JavaScript);
        let foo = sections.iter().find(|s| s.element_name.as_deref() == Some("foo")).unwrap().clone();
        let spliced = splice(sections, foo);
        let assembled = assemble(spliced);
        assert_eq!(assembled, SAMPLE.trim_end());
    }

    #[test]
    fn round_trip_splice_preserves_a_leading_header() {
        const WITH_HEADER: &str =
            "// Copyright Example Corp.\n// SPDX-License-Identifier: MIT\n\nimport { a } from 'a';\n\nfunction foo() {\n  return 1;\n}\n\nexport { foo };\n";
        let sections = split(WITH_HEADER, TargetLanguage::JavaScript);
        assert_eq!(sections[0].kind, SectionKind::Other);
        let foo = sections.iter().find(|s| s.element_name.as_deref() == Some("foo")).unwrap().clone();
        let spliced = splice(sections, foo);
        let assembled = assemble(spliced);
        assert_eq!(assembled, WITH_HEADER.trim_end());
        assert!(assembled.starts_with("// Copyright Example Corp."));
    }

    #[test]
    fn splice_inserts_new_section_before_exports() {
        let sections = split(SAMPLE, TargetLanguage::JavaScript);
        let new_fn = OutputSection {
            kind: SectionKind::Function,
            element_name: Some("bar".into()),
            start_line: 0,
            end_line: 0,
            text: "function bar() {\n  return 2;\n}".into(),
            hash: "x".into(),
        };
        let spliced = splice(sections, new_fn);
        let assembled = assemble(spliced);
        let export_pos = assembled.find("export").unwrap();
        let bar_pos = assembled.find("function bar").unwrap();
        assert!(bar_pos < export_pos);
    }

    #[test]
    fn remove_by_name_drops_the_section() {
        let sections = split(SAMPLE, TargetLanguage::JavaScript);
        let without_foo = remove_by_name(sections, "foo");
        assert!(without_foo.iter().all(|s| s.element_name.as_deref() != Some("foo")));
    }

    #[test]
    fn python_anchors_detect_def_and_class() {
        let src = "import os\n\ndef foo():\n    return 1\n\nclass Bar:\n    pass\n";
        let sections = split(src, TargetLanguage::Python);
        let kinds: Vec<_> = sections.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::Import, SectionKind::Function, SectionKind::Class]);
    }
}
