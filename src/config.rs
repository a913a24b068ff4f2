//! Explicit tunables for a build invocation.
//!
//! None of these are hard-coded magic constants inside the components that use them;
//! every component takes an [`EngineConfig`] (or a narrower slice of it) as a constructor
//! argument, following the teacher's `ProjectPathsConfig`-style explicit wiring.

use std::time::Duration;

/// Tunables threaded through a [`crate::build::BuildInvocation`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Dependency Index transitive-impact depth (spec §4.C4). Default 2.
    pub dependency_depth: u32,
    /// Build Planner full-vs-incremental ratio gate (spec §4.C5). Default 0.20.
    pub ratio_threshold: f64,
    /// Maximum number of AI oracle requests dispatched concurrently (spec §5). Default 4.
    pub oracle_concurrency: usize,
    /// Per-call oracle timeout (spec §5). Default 30s.
    pub oracle_timeout: Duration,
    /// Per-build wall-clock budget (spec §5). Default 10min.
    pub build_timeout: Duration,
    /// Maximum oracle retry attempts for a transient (retryable) failure.
    pub retry_budget: u32,
    /// Base backoff delay; doubles on each retry attempt up to `retry_budget`.
    pub retry_backoff_base: Duration,
    /// Force a full rebuild regardless of change shape.
    pub force_full: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dependency_depth: 2,
            ratio_threshold: 0.20,
            oracle_concurrency: 4,
            oracle_timeout: Duration::from_secs(30),
            build_timeout: Duration::from_secs(10 * 60),
            retry_budget: 5,
            retry_backoff_base: Duration::from_millis(250),
            force_full: false,
        }
    }
}

impl EngineConfig {
    pub fn with_force_full(mut self, force_full: bool) -> Self {
        self.force_full = force_full;
        self
    }

    pub fn with_dependency_depth(mut self, depth: u32) -> Self {
        self.dependency_depth = depth;
        self
    }

    pub fn with_ratio_threshold(mut self, ratio: f64) -> Self {
        self.ratio_threshold = ratio;
        self
    }
}
