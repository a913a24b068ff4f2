//! Scoped logging context for a build invocation.
//!
//! The source this engine replaces relied on an ambient global logger; per the
//! redesign notes, logging here is a value carried explicitly through a build
//! invocation rather than a module-global. [`BuildLog`] wraps a [`tracing::Span`]
//! and every component logs through the span it was handed, never `tracing`'s
//! default global dispatcher directly from library code.

use tracing::Span;

/// A scoped logging handle for one build invocation.
#[derive(Clone)]
pub struct BuildLog {
    span: Span,
}

impl BuildLog {
    /// Creates a new build-scoped log, tagging every event underneath it with
    /// `project` and a random-free, caller-supplied `invocation_id`.
    pub fn new(project: &str, invocation_id: &str) -> Self {
        let span = tracing::info_span!("build", project = %project, invocation = %invocation_id);
        Self { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

/// Installs the process-wide `tracing` subscriber, honoring `LOG_LEVEL` (spec §6) and an
/// optional verbose override. Safe to call more than once; subsequent calls are no-ops.
pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
