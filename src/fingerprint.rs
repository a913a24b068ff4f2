//! C1 — Fingerprinter: canonicalize element text and compute stable content hashes.
//!
//! Grounded on the teacher's `CacheEntry::content_hash` (a hash over canonicalized source
//! used to decide whether a cached artifact is still valid), generalized from "hash the
//! whole file" to "hash canonicalized text of any span" and from MD5 to SHA-256 per the
//! spec's explicit digest choice.

use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest, hex-encoded for storage/display.
pub type Hash = String;

/// Per-language comment-stripping rules used during canonicalization. Only line comments
/// are modeled; block comments are out of scope for the regex-based recognizers in C9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `//`-style line comments (JavaScript, TypeScript, Java, Go, Rust).
    DoubleSlash,
    /// `#`-style line comments (Python).
    Hash,
    /// No comment stripping.
    None,
}

/// Canonicalizes `text`: trims trailing whitespace per line, strips comment-only lines,
/// normalizes line endings to LF, and collapses runs of blank lines to one.
///
/// Property: whitespace-only edits never change [`hash`]'s output for the canonicalized
/// text, because those edits disappear during canonicalization.
pub fn canonicalize(text: &str, comments: CommentStyle) -> String {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut out = String::with_capacity(normalized.len());
    let mut prev_blank = false;
    for line in normalized.lines() {
        let trimmed = line.trim_end();
        if is_comment_only(trimmed, comments) {
            continue;
        }
        let blank = trimmed.is_empty();
        if blank && prev_blank {
            continue;
        }
        out.push_str(trimmed);
        out.push('\n');
        prev_blank = blank;
    }
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

fn is_comment_only(line: &str, style: CommentStyle) -> bool {
    let trimmed = line.trim_start();
    match style {
        CommentStyle::DoubleSlash => trimmed.starts_with("//"),
        CommentStyle::Hash => trimmed.starts_with('#'),
        CommentStyle::None => false,
    }
}

/// SHA-256 of the canonical form of `text`, hex-encoded.
///
/// Referentially transparent: equal canonical text always yields an equal digest, and the
/// digest depends on nothing but `text` and `comments`.
pub fn hash(text: &str, comments: CommentStyle) -> Hash {
    let canonical = canonicalize(text, comments);
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashes already-canonical text directly, skipping a redundant canonicalization pass.
/// Used by callers (e.g. the Section Model) that canonicalize once and hash multiple times.
pub fn hash_canonical(canonical: &str) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_whitespace_does_not_change_hash() {
        let a = "function foo() {\n    return 1;\n}\n";
        let b = "function foo() {   \n    return 1;    \n}   \n";
        assert_eq!(hash(a, CommentStyle::DoubleSlash), hash(b, CommentStyle::DoubleSlash));
    }

    #[test]
    fn line_ending_does_not_change_hash() {
        let lf = "a\nb\nc\n";
        let crlf = "a\r\nb\r\nc\r\n";
        assert_eq!(hash(lf, CommentStyle::None), hash(crlf, CommentStyle::None));
    }

    #[test]
    fn collapsed_blank_runs_do_not_change_hash() {
        let a = "a\n\nb\n";
        let b = "a\n\n\n\n\nb\n";
        assert_eq!(hash(a, CommentStyle::None), hash(b, CommentStyle::None));
    }

    #[test]
    fn comment_only_lines_are_stripped() {
        let a = "a\nb\n";
        let b = "a\n// a trailing remark\nb\n";
        assert_eq!(hash(a, CommentStyle::DoubleSlash), hash(b, CommentStyle::DoubleSlash));
    }

    #[test]
    fn real_edits_change_the_hash() {
        let a = "return 1;\n";
        let b = "return 2;\n";
        assert_ne!(hash(a, CommentStyle::None), hash(b, CommentStyle::None));
    }
}
