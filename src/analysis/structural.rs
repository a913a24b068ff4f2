//! C9 — Structural Analyzer: extract functions / classes / interfaces / types / imports /
//! exports from source text using language-specific regular grammars (spec §4.C9).
//!
//! Deterministic by construction: every recognizer is a pure function of its input text,
//! with no randomness or environment dependence, matching the teacher's `flatten.rs`-style
//! "derive everything from the parsed unit" discipline (generalized here from whole-AST
//! flattening to line/regex recognizers, since this crate consumes pre-parsed element
//! summaries rather than running its own parser — spec §1 non-goal).

use crate::fingerprint::{self, CommentStyle};
use crate::model::{ElementKind, ElementRecord};
use once_cell::sync::Lazy;
use regex::Regex;

/// Dispatches to the recognizer for `language` (as returned by [`super::language::detect_file`]).
/// An unrecognized language yields an empty list rather than an error (spec §7 "the
/// Structural Analyzer never throws on malformed source").
pub fn extract(language: &str, content: &str) -> Vec<ElementRecord> {
    match language {
        "javascript" | "typescript" => extract_js_like(content, language == "typescript"),
        "python" => extract_python(content),
        "java" => extract_braced(content, &JAVA_ANCHORS),
        "go" => extract_braced(content, &GO_ANCHORS),
        "rust" => extract_braced(content, &RUST_ANCHORS),
        _ => Vec::new(),
    }
}

pub fn names_of(elements: &[ElementRecord], kind: ElementKind) -> Vec<String> {
    elements.iter().filter(|e| e.kind == kind).map(|e| e.name.clone()).collect()
}

struct Anchor {
    kind: ElementKind,
    pattern: &'static Lazy<Regex>,
    /// Index of the capture group holding the element's name (0 is the whole match).
    name_group: usize,
}

static JS_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*import\s+.*?from\s+['"]([^'"]+)['"]"#).unwrap());
static JS_REQUIRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap());
static JS_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*export\s+(default\s+)?(async\s+)?(function|class|const|let|var)\s+([A-Za-z_$][\w$]*)").unwrap()
});
static JS_EXPORT_NAMED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*export\s*\{\s*([^}]+)\s*\}").unwrap());
static JS_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(export\s+)?(default\s+)?class\s+([A-Za-z_$][\w$]*)").unwrap());
static JS_FUNCTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(export\s+)?(default\s+)?(async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)").unwrap()
});
static TS_INTERFACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(export\s+)?interface\s+([A-Za-z_$][\w$]*)").unwrap());
static TS_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(export\s+)?type\s+([A-Za-z_$][\w$]*)\s*=").unwrap());

fn extract_js_like(content: &str, typescript: bool) -> Vec<ElementRecord> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = JS_IMPORT.captures(line).or_else(|| JS_REQUIRE.captures(line)) {
            let imported = caps[1].to_string();
            out.push(make_element(
                &lines,
                i,
                i,
                ElementKind::Import,
                imported.clone(),
                vec![imported],
                false,
                CommentStyle::DoubleSlash,
            ));
            continue;
        }
        if typescript {
            if let Some(caps) = TS_INTERFACE.captures(line) {
                let name = caps[2].to_string();
                let end = brace_match_end(&lines, i);
                let exported = caps.get(1).is_some();
                out.push(make_element(
                    &lines,
                    i,
                    end,
                    ElementKind::Interface,
                    name,
                    vec![],
                    exported,
                    CommentStyle::DoubleSlash,
                ));
                continue;
            }
            if let Some(caps) = TS_TYPE.captures(line) {
                let name = caps[2].to_string();
                let exported = caps.get(1).is_some();
                out.push(make_element(&lines, i, i, ElementKind::Type, name, vec![], exported, CommentStyle::DoubleSlash));
                continue;
            }
        }
        if let Some(caps) = JS_CLASS.captures(line) {
            let name = caps[3].to_string();
            let end = brace_match_end(&lines, i);
            let exported = caps.get(1).is_some();
            out.push(make_element(&lines, i, end, ElementKind::Class, name, vec![], exported, CommentStyle::DoubleSlash));
            continue;
        }
        if let Some(caps) = JS_FUNCTION.captures(line) {
            let name = caps[4].to_string();
            let end = brace_match_end(&lines, i);
            let exported = caps.get(1).is_some();
            out.push(make_element(&lines, i, end, ElementKind::Function, name, vec![], exported, CommentStyle::DoubleSlash));
            continue;
        }
        if let Some(caps) = JS_EXPORT.captures(line) {
            // Already handled above when it's simultaneously a class/function declaration;
            // this branch only fires for `export const`/`let`/`var` bindings.
            if &caps[3] != "function" && &caps[3] != "class" {
                let name = caps[4].to_string();
                out.push(make_element(
                    &lines,
                    i,
                    i,
                    ElementKind::Export,
                    name.clone(),
                    vec![name],
                    true,
                    CommentStyle::DoubleSlash,
                ));
            }
            continue;
        }
        if let Some(caps) = JS_EXPORT_NAMED.captures(line) {
            for raw in caps[1].split(',') {
                let name = raw.split("as").next().unwrap_or(raw).trim().to_string();
                if !name.is_empty() {
                    out.push(make_element(
                        &lines,
                        i,
                        i,
                        ElementKind::Export,
                        name.clone(),
                        vec![name],
                        true,
                        CommentStyle::DoubleSlash,
                    ));
                }
            }
        }
    }

    out
}

/// Finds the line of the matching closing `}` for an opening brace appearing on or after
/// `start`, by counting brace depth; falls back to `start` if no closing brace is found
/// (spec §4.C9 "closing delimiter included when determinable, otherwise best-effort").
fn brace_match_end(lines: &[&str], start: usize) -> usize {
    let mut depth = 0i32;
    let mut seen_open = false;
    for (i, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    depth += 1;
                    seen_open = true;
                }
                '}' => depth -= 1,
                _ => {}
            }
        }
        if seen_open && depth <= 0 {
            return i;
        }
    }
    start
}

static PY_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*import\s+([\w.]+)").unwrap());
static PY_FROM_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*from\s+([\w.]+)\s+import\s+(.+)").unwrap());
static PY_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)class\s+([A-Za-z_]\w*)").unwrap());
static PY_DEF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)def\s+([A-Za-z_]\w*)").unwrap());
static PY_ALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^__all__\s*=\s*\[(.*)\]").unwrap());

fn extract_python(content: &str) -> Vec<ElementRecord> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = PY_FROM_IMPORT.captures(line) {
            let module = caps[1].to_string();
            for raw in caps[2].split(',') {
                let name = raw.split("as").next().unwrap_or(raw).trim().trim_matches('(').trim_matches(')');
                if !name.is_empty() {
                    let full = format!("{module}.{name}");
                    out.push(make_element(
                        &lines,
                        i,
                        i,
                        ElementKind::Import,
                        full.clone(),
                        vec![full],
                        false,
                        CommentStyle::Hash,
                    ));
                }
            }
            continue;
        }
        if let Some(caps) = PY_IMPORT.captures(line) {
            let module = caps[1].to_string();
            out.push(make_element(
                &lines,
                i,
                i,
                ElementKind::Import,
                module.clone(),
                vec![module],
                false,
                CommentStyle::Hash,
            ));
            continue;
        }
        if let Some(caps) = PY_CLASS.captures(line) {
            let indent = caps[1].len();
            let name = caps[2].to_string();
            let end = indent_block_end(&lines, i, indent);
            out.push(make_element(&lines, i, end, ElementKind::Class, name, vec![], true, CommentStyle::Hash));
            continue;
        }
        if let Some(caps) = PY_DEF.captures(line) {
            let indent = caps[1].len();
            let name = caps[2].to_string();
            let end = indent_block_end(&lines, i, indent);
            let exported = indent == 0;
            out.push(make_element(&lines, i, end, ElementKind::Function, name, vec![], exported, CommentStyle::Hash));
            continue;
        }
        if let Some(caps) = PY_ALL.captures(line) {
            for raw in caps[1].split(',') {
                let name = raw.trim().trim_matches('\'').trim_matches('"').to_string();
                if !name.is_empty() {
                    out.push(make_element(
                        &lines,
                        i,
                        i,
                        ElementKind::Export,
                        name.clone(),
                        vec![name],
                        true,
                        CommentStyle::Hash,
                    ));
                }
            }
        }
    }

    out
}

/// Finds the last line belonging to a Python block opened at `start` with indentation
/// `indent`: the block ends just before the first subsequent non-blank line whose
/// indentation is <= `indent` (spec §4.C9 "indentation-level maximum for Python" applied
/// to span detection rather than nesting depth here).
fn indent_block_end(lines: &[&str], start: usize, indent: usize) -> usize {
    let mut end = start;
    for (i, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        let this_indent = line.len() - line.trim_start().len();
        if this_indent <= indent {
            break;
        }
        end = i;
    }
    end
}

static JAVA_ANCHORS: [Anchor; 3] = [
    Anchor { kind: ElementKind::Import, pattern: &JAVA_IMPORT, name_group: 2 },
    Anchor { kind: ElementKind::Interface, pattern: &JAVA_INTERFACE, name_group: 2 },
    Anchor { kind: ElementKind::Class, pattern: &JAVA_CLASS_DECL, name_group: 3 },
];
static JAVA_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*import\s+(static\s+)?([\w.]+)\s*;").unwrap());
static JAVA_INTERFACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(public|private|protected)?\s*interface\s+(\w+)").unwrap());
static JAVA_CLASS_DECL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(public|private|protected)?\s*(abstract\s+|final\s+)?class\s+(\w+)").unwrap());

static GO_ANCHORS: [Anchor; 3] = [
    Anchor { kind: ElementKind::Import, pattern: &GO_IMPORT, name_group: 1 },
    Anchor { kind: ElementKind::Type, pattern: &GO_TYPE, name_group: 1 },
    Anchor { kind: ElementKind::Function, pattern: &GO_FUNC, name_group: 2 },
];
static GO_IMPORT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*"([\w./-]+)"\s*$"#).unwrap());
static GO_TYPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*type\s+(\w+)\s+(struct|interface)\b").unwrap());
static GO_FUNC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*func\s+(\(\w+\s+\*?\w+\)\s*)?(\w+)\s*\(").unwrap());

static RUST_ANCHORS: [Anchor; 4] = [
    Anchor { kind: ElementKind::Import, pattern: &RUST_USE, name_group: 1 },
    Anchor { kind: ElementKind::Type, pattern: &RUST_STRUCT_ENUM, name_group: 2 },
    Anchor { kind: ElementKind::Interface, pattern: &RUST_TRAIT, name_group: 1 },
    Anchor { kind: ElementKind::Function, pattern: &RUST_FN, name_group: 2 },
];
static RUST_USE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*use\s+([\w:]+)").unwrap());
static RUST_STRUCT_ENUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*pub\s+(struct|enum)\s+(\w+)").unwrap());
static RUST_TRAIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*pub\s+trait\s+(\w+)").unwrap());
static RUST_FN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*pub\s+(async\s+)?fn\s+(\w+)").unwrap());

/// Generic brace-counted extractor shared by Java/Go/Rust: scans `anchors` in order per
/// line, extracts the name from each anchor's declared `name_group`, and closes the span
/// at the matching brace (or the anchor line itself for single-line imports/uses).
fn extract_braced(content: &str, anchors: &[Anchor]) -> Vec<ElementRecord> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        for anchor in anchors {
            let Some(caps) = anchor.pattern.captures(line) else { continue };
            let Some(name) = caps.get(anchor.name_group).map(|m| m.as_str().to_string()) else { continue };
            if name.is_empty() {
                continue;
            }
            match anchor.kind {
                ElementKind::Import => {
                    out.push(make_element(
                        &lines,
                        i,
                        i,
                        ElementKind::Import,
                        name.clone(),
                        vec![name],
                        false,
                        CommentStyle::DoubleSlash,
                    ));
                }
                _ if line.contains('{') => {
                    let end = brace_match_end(&lines, i);
                    out.push(make_element(&lines, i, end, anchor.kind, name, vec![], true, CommentStyle::DoubleSlash));
                }
                _ => {
                    out.push(make_element(&lines, i, i, anchor.kind, name, vec![], true, CommentStyle::DoubleSlash));
                }
            }
            break;
        }
    }

    out
}

fn make_element(
    lines: &[&str],
    start: usize,
    end: usize,
    kind: ElementKind,
    name: String,
    declared_dependencies: Vec<String>,
    exported: bool,
    comment_style: CommentStyle,
) -> ElementRecord {
    let end = end.max(start);
    let text = lines[start..=end].join("\n");
    let canonical_hash = fingerprint::hash(&text, comment_style);
    ElementRecord {
        name,
        kind,
        start_line: start as u32 + 1,
        end_line: end as u32 + 1,
        canonical_hash,
        declared_dependencies,
        exported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_javascript_function_and_import() {
        let src = "import { a } from 'a';\n\nfunction foo() {\n  return 1;\n}\n";
        let elements = extract("javascript", src);
        let kinds: Vec<_> = elements.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Import, ElementKind::Function]);
        assert_eq!(elements[0].declared_dependencies, vec!["a".to_string()]);
        assert_eq!(elements[1].name, "foo");
        assert_eq!(elements[1].end_line, 5);
    }

    #[test]
    fn extracts_python_def_with_indentation_span() {
        let src = "def foo():\n    x = 1\n    return x\n\ndef bar():\n    return 2\n";
        let elements = extract("python", src);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].name, "foo");
        assert_eq!(elements[0].start_line, 1);
        assert_eq!(elements[0].end_line, 3);
    }

    #[test]
    fn python_canonical_hash_ignores_comment_only_edits() {
        let original = "def foo():\n    x = 1\n    return x\n";
        let commented = "def foo():\n    # explain x\n    x = 1\n    return x\n";
        let a = extract("python", original);
        let b = extract("python", commented);
        assert_eq!(a[0].canonical_hash, b[0].canonical_hash);
    }

    #[test]
    fn extracts_rust_pub_fn_and_use() {
        let src = "use std::fmt;\n\npub fn greet() {\n    println!(\"hi\");\n}\n";
        let elements = extract("rust", src);
        let kinds: Vec<_> = elements.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ElementKind::Import, ElementKind::Function]);
        assert_eq!(elements[1].name, "greet");
    }

    #[test]
    fn deterministic_across_repeated_calls() {
        let src = "class Foo {\n  bar() {}\n}\n";
        let a = extract("javascript", src);
        let b = extract("javascript", src);
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_language_yields_empty_list() {
        assert!(extract("cobol", "IDENTIFICATION DIVISION.").is_empty());
    }
}
