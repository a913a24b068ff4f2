//! Incremental compilation engine and reverse-compilation analysis pipeline for the
//! SunScript toolchain: content-addressed change detection, section-level incremental
//! code generation against an AI oracle, and a structural/quality analysis pipeline for
//! turning generated output back into a natural-language description.
#![warn(rust_2018_idioms)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

#[macro_use]
extern crate tracing;

pub mod error;
pub use error::{EngineError, Result};

pub mod model;
pub use model::{
    BuildMode, BuildPlan, ChangeKind, ChangeRecord, ElementChange, ElementKind, ElementRecord,
    FileRecord, OutputSection, SectionKind,
};

pub mod config;
pub use config::EngineConfig;

pub mod fingerprint;
pub use fingerprint::{CommentStyle, Hash};

pub mod change;

pub mod depindex;
pub use depindex::DependencyIndex;

pub mod planner;

pub mod section;
pub use section::TargetLanguage;

pub mod oracle;
pub use oracle::{CodeOracle, OracleRequest, OracleResponse};

pub mod generator;
pub use generator::GenerationResult;

pub mod store;
pub use store::ElementStore;

pub mod build;
pub use build::{BuildInvocation, BuildOutcome, BuildPhase};

pub mod watch;
pub use watch::WatchGate;

pub mod manifest;
pub use manifest::GenesisManifest;

pub mod log;
pub use log::BuildLog;

pub mod analysis;
pub use analysis::AnalysisRecord;
