//! C10 — Quality & Content Analyzer: pure functions over file text and its extracted
//! elements (spec §4.C10). Every score is clamped to 0..100 and rounded to the nearest
//! integer.

use crate::model::ElementRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `{name, confidence ∈ 0..100, evidence[]}` (spec §4.C10 "Patterns").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub name: String,
    pub confidence: u8,
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityMetrics {
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub nesting_depth: u32,
    pub maintainability_index: u32,
    pub testability: u32,
    pub documentation: u32,
    pub patterns: Vec<PatternMatch>,
}

static DECISION_KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(if|elif|else if|while|for|switch|case|catch)\b|&&|\|\||\?").unwrap());
static DOC_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^\s*(///|/\*\*|\*|#!|""")"#).unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(//|#)").unwrap());
static DI_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(inject|Injectable|@Autowired|new\s+\w+\(.*dep)").unwrap());
static GLOBAL_STATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(static\s+mut|global\s|lazy_static!|singleton)\b").unwrap());
static TEST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(#\[test\]|def test_|@Test|it\(|describe\()").unwrap());
static SIDE_EFFECT_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(println!|console\.log|print\(|System\.out|fs::write|fetch\(|fs\.write)").unwrap());

/// Runs every pure metric in spec §4.C10 over `content` and `elements`, and returns
/// detected architectural patterns.
pub fn analyze(content: &str, elements: &[ElementRecord], language: &str) -> QualityMetrics {
    let cyclomatic = cyclomatic_complexity(content);
    let nesting = nesting_depth(content, language);
    let cognitive = cognitive_complexity(content, nesting);
    let maintainability = maintainability_index(content, cyclomatic);
    let testability = testability(content, elements);
    let documentation = documentation(content);
    let patterns = detect_patterns(content, elements);

    QualityMetrics {
        cyclomatic_complexity: cyclomatic,
        cognitive_complexity: cognitive,
        nesting_depth: nesting,
        maintainability_index: maintainability,
        testability,
        documentation,
        patterns,
    }
}

/// `1 + count(if|elif|else-if|while|for|switch|case|catch|&&|\|\||?)` (spec §4.C10); the
/// trailing `?` counts the ternary operator as its own decision point.
pub fn cyclomatic_complexity(content: &str) -> u32 {
    1 + DECISION_KEYWORDS.find_iter(content).count() as u32
}

/// As cyclomatic, but each decision inside a nested block adds `nesting_depth` extra
/// points, and boolean-operator chains add one per extra operator (spec §4.C10).
pub fn cognitive_complexity(content: &str, nesting_depth: u32) -> u32 {
    let mut score = 0u32;
    for line in content.lines() {
        let hits = DECISION_KEYWORDS.find_iter(line).count() as u32;
        if hits == 0 {
            continue;
        }
        let indent = (line.len() - line.trim_start().len()) as u32 / 2;
        score += hits + indent.min(nesting_depth) * hits;
        let bool_ops = line.matches("&&").count() + line.matches("||").count();
        if bool_ops > 1 {
            score += bool_ops as u32 - 1;
        }
    }
    score
}

/// Maximum brace/paren nesting depth, or the maximum indentation level for Python
/// (spec §4.C10).
pub fn nesting_depth(content: &str, language: &str) -> u32 {
    if language == "python" {
        let mut max_indent = 0u32;
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let indent = (line.len() - line.trim_start().len()) as u32 / 4;
            max_indent = max_indent.max(indent);
        }
        return max_indent;
    }

    let mut depth = 0i32;
    let mut max_depth = 0i32;
    for ch in content.chars() {
        match ch {
            '{' | '(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            '}' | ')' => depth -= 1,
            _ => {}
        }
    }
    max_depth.max(0) as u32
}

/// `clamp_0_100(171 - 5.2*ln(halstead_volume) - 0.23*cyclomatic - 16.2*ln(LOC)) * 100 / 171`
/// (spec §4.C10). Halstead volume is approximated as `distinct_tokens * total_tokens` over
/// whitespace-split content, since no full lexer is in scope for this analyzer.
pub fn maintainability_index(content: &str, cyclomatic: u32) -> u32 {
    let loc = content.lines().filter(|l| !l.trim().is_empty()).count().max(1) as f64;
    let tokens: Vec<&str> = content.split_whitespace().collect();
    let total_tokens = tokens.len().max(1) as f64;
    let distinct_tokens = tokens.iter().collect::<std::collections::BTreeSet<_>>().len().max(1) as f64;
    let halstead_volume = (distinct_tokens * total_tokens).max(1.0);

    let raw = 171.0 - 5.2 * halstead_volume.ln() - 0.23 * cyclomatic as f64 - 16.2 * loc.ln();
    let scaled = raw * 100.0 / 171.0;
    clamp_0_100(scaled)
}

/// `50 + 30*(pure/total) + 15 if DI markers present - 15 if global state touched -
/// 5*count(complex fns) + 20 if tests are detected - 20*(side_effectful/total)`
/// (spec §4.C10). "Pure" functions are approximated as elements containing no detected
/// side-effect marker in their span.
pub fn testability(content: &str, elements: &[ElementRecord]) -> u32 {
    let functions: Vec<&ElementRecord> =
        elements.iter().filter(|e| e.kind == crate::model::ElementKind::Function).collect();
    let total = functions.len().max(1) as f64;

    let side_effectful = functions.iter().filter(|f| contains_side_effect(content, f)).count() as f64;
    let pure = total - side_effectful;
    let complex_fns = functions.iter().filter(|f| span_cyclomatic(content, f) > 10).count() as f64;

    let mut score = 50.0;
    score += 30.0 * (pure / total);
    if DI_MARKER.is_match(content) {
        score += 15.0;
    }
    if GLOBAL_STATE.is_match(content) {
        score -= 15.0;
    }
    score -= 5.0 * complex_fns;
    if TEST_MARKER.is_match(content) {
        score += 20.0;
    }
    score -= 20.0 * (side_effectful / total);

    clamp_0_100(score)
}

fn contains_side_effect(content: &str, element: &ElementRecord) -> bool {
    span_text(content, element).map(|t| SIDE_EFFECT_MARKER.is_match(&t)).unwrap_or(false)
}

fn span_cyclomatic(content: &str, element: &ElementRecord) -> u32 {
    span_text(content, element).map(|t| cyclomatic_complexity(&t)).unwrap_or(1)
}

fn span_text(content: &str, element: &ElementRecord) -> Option<String> {
    let lines: Vec<&str> = content.lines().collect();
    let start = element.start_line.saturating_sub(1) as usize;
    let end = (element.end_line as usize).min(lines.len());
    if start >= end {
        return None;
    }
    Some(lines[start..end].join("\n"))
}

/// `min(100, comment_lines / code_lines * 300)` with `+10` for doc-comment markers and
/// `+15` for `README` or parameter-tag mentions (spec §4.C10).
pub fn documentation(content: &str) -> u32 {
    let mut comment_lines = 0u32;
    let mut code_lines = 0u32;
    let mut has_doc_marker = false;
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if DOC_COMMENT.is_match(line) {
            has_doc_marker = true;
            comment_lines += 1;
        } else if LINE_COMMENT.is_match(line) {
            comment_lines += 1;
        } else {
            code_lines += 1;
        }
    }
    let code_lines = code_lines.max(1) as f64;
    let mut score = (comment_lines as f64 / code_lines * 300.0).min(100.0);
    if has_doc_marker {
        score += 10.0;
    }
    if content.contains("README") || content.contains("@param") || content.contains(":param") {
        score += 15.0;
    }
    clamp_0_100(score)
}

fn clamp_0_100(value: f64) -> u32 {
    value.max(0.0).min(100.0).round() as u32
}

static SINGLETON_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(getInstance|Singleton|lazy_static!)\b").unwrap());
static FACTORY_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(create[A-Z]\w*|make_\w+|\w*Factory)\b").unwrap());
static OBSERVER_HINT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(addEventListener|subscribe|on[A-Z]\w*|Observer)\b").unwrap());

/// Rule-based architectural pattern detectors (spec §4.C10 "Patterns"). Each returns a
/// confidence proportional to how many occurrences of its hint were found, capped at 100.
fn detect_patterns(content: &str, elements: &[ElementRecord]) -> Vec<PatternMatch> {
    let mut patterns = Vec::new();

    push_pattern(&mut patterns, content, &SINGLETON_HINT, "singleton");
    push_pattern(&mut patterns, content, &FACTORY_HINT, "factory");
    push_pattern(&mut patterns, content, &OBSERVER_HINT, "observer");

    if elements.iter().filter(|e| e.kind == crate::model::ElementKind::Class).count() > 3
        && elements.iter().any(|e| e.kind == crate::model::ElementKind::Interface)
    {
        patterns.push(PatternMatch {
            name: "layered-architecture".to_string(),
            confidence: 60,
            evidence: vec!["multiple classes alongside at least one interface".to_string()],
        });
    }

    patterns
}

fn push_pattern(patterns: &mut Vec<PatternMatch>, content: &str, hint: &Lazy<Regex>, name: &str) {
    let hits: Vec<String> = hint.find_iter(content).map(|m| m.as_str().to_string()).collect();
    if hits.is_empty() {
        return;
    }
    let confidence = (hits.len() as u32 * 25).min(100) as u8;
    patterns.push(PatternMatch { name: name.to_string(), confidence, evidence: hits });
}
