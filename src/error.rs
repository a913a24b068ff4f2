//! Error taxonomy for the incremental build engine.

use std::fmt;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, EngineError>;

/// Error taxonomy from the build invocation's point of view (see design notes on
/// error handling). Every variant states whether the Element Store is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed CLI args, manifest, or analysis input. Store untouched, exit 2.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unreadable/corrupt element store. Store is treated as cold, build proceeds as full.
    #[error("cache error: {0}")]
    Cache(String),

    /// AI oracle failure. `retryable` distinguishes a transient failure (backed off and
    /// retried up to the retry budget) from a fatal one (aborts the build, store untouched).
    #[error("oracle error: {message}")]
    Oracle { message: String, retryable: bool },

    /// Output write failure. Completed atomic renames stay; pending temp files are removed.
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },

    /// Invariant violation (e.g. a splice found duplicate element names). Fatal, store
    /// untouched, carries a stable diagnostic code for tooling.
    #[error("internal error [{code}]: {message}")]
    Internal { code: &'static str, message: String },
}

impl EngineError {
    pub fn io(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::Io { path: path.as_ref().to_path_buf(), source }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self::Internal { code, message: message.into() }
    }

    pub fn oracle(message: impl Into<String>, retryable: bool) -> Self {
        Self::Oracle { message: message.into(), retryable }
    }

    /// The process exit code this error maps to (spec §6 exit code table: `4` oracle
    /// unavailable, `5` partial build aborted). A retryable oracle error that exhausted its
    /// retry budget is "unavailable" (4); a fatal oracle error aborts the build partway
    /// through (5), same as an IO or internal error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Cache(_) => 3,
            Self::Oracle { retryable: true, .. } => 4,
            Self::Oracle { retryable: false, .. } => 5,
            Self::Io { .. } | Self::Internal { .. } => 5,
        }
    }

    /// Is this the kind of error that should leave the Element Store as cold-cache
    /// rather than aborting entirely?
    pub fn is_cold_cache(&self) -> bool {
        matches!(self, Self::Cache(_))
    }
}

const REDACTED_KEYS: &[&str] = &["apikey", "password", "token", "secret", "key"];

/// Scrubs sensitive field names out of free-form diagnostic text before it is logged or
/// surfaced to a user. `text` is expected to contain `key=value` or `"key": "value"`-style
/// fragments; any fragment whose key matches (case-insensitively) one of [`REDACTED_KEYS`]
/// has its value replaced with `[REDACTED]`.
pub fn redact(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        out.push_str(&redact_line(line));
    }
    out
}

fn redact_line(line: &str) -> String {
    let had_newline = line.ends_with('\n');
    let body = if had_newline { &line[..line.len() - 1] } else { line };
    for sep in ['=', ':'] {
        if let Some(idx) = body.find(sep) {
            let (key, _rest) = body.split_at(idx);
            let key_trim = key.trim().trim_matches('"').trim_matches('\'');
            if REDACTED_KEYS.iter().any(|k| key_trim.eq_ignore_ascii_case(k)) {
                let mut out = format!("{key}{sep}[REDACTED]", key = key, sep = sep);
                if had_newline {
                    out.push('\n');
                }
                return out;
            }
        }
    }
    line.to_string()
}

impl fmt::Debug for RedactedDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(self.0))
    }
}

/// Wraps borrowed text so it is redacted wherever it is displayed/debugged.
pub struct RedactedDisplay<'a>(pub &'a str);

impl fmt::Display for RedactedDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", redact(self.0))
    }
}
