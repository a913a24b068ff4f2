//! C11 — Natural-Language Synthesizer: turn an Analysis Record into a language-neutral
//! spec artifact via the AI oracle, with a deterministic fallback template (spec §4.C11).
//!
//! Per the redesign notes (spec §9 "Dynamic JSON shapes returned by the AI oracle"), the
//! oracle's reply is parsed against a strict schema; anything that fails to parse — or any
//! oracle error at all — falls back to the deterministic template rather than propagating,
//! since this component "must never throw to the caller" (spec §4.C11).

use super::AnalysisRecord;
use crate::model::ElementKind;
use crate::oracle::{CodeOracle, OracleRequest};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    description: String,
}

/// Builds a prompt from `record`, invokes `oracle`, and returns its natural-language
/// description, or the deterministic fallback on any failure.
pub fn synthesize(record: &AnalysisRecord, oracle: &dyn CodeOracle) -> String {
    let request = build_request(record);
    match request.validate().and_then(|_| oracle.generate(&request)) {
        Ok(response) => parse_reply(&response.code).unwrap_or_else(|| fallback(record)),
        Err(_) => fallback(record),
    }
}

fn build_request(record: &AnalysisRecord) -> OracleRequest {
    let prompt = format!(
        "Describe this {} module at {} in one paragraph. Functions: {:?}. Classes: {:?}. \
         Dependencies: {:?}. Reply as JSON: {{\"description\": string}}.",
        record.language, record.file, record.functions, record.classes, record.dependencies
    );
    // The synthesizer describes a whole file rather than one element; it is tagged with a
    // placeholder element identity so it can reuse the single `CodeOracle` contract shared
    // with the Incremental Generator (spec §6's oracle interface is the same shape for
    // both use cases).
    OracleRequest {
        prompt,
        element_kind: ElementKind::Type,
        element_name: record.file.clone(),
        target_language: record.language.clone(),
        surrounding_context_digest: crate::fingerprint::hash(
            &record.functions.join(","),
            crate::fingerprint::CommentStyle::None,
        ),
        max_tokens: 512,
        temperature: 0.4,
        top_p: 1.0,
        frequency_penalty: 0.0,
        presence_penalty: 0.0,
        timeout: Duration::from_secs(30),
    }
}

fn parse_reply(raw: &str) -> Option<String> {
    let reply: SynthesisReply = serde_json::from_str(raw).ok()?;
    if reply.description.trim().is_empty() {
        None
    } else {
        Some(reply.description)
    }
}

/// `"This <language> module contains N function(s) and M class(es). It depends on K
/// external module(s)."` (spec §4.C11).
fn fallback(record: &AnalysisRecord) -> String {
    format!(
        "This {} module contains {} function(s) and {} class(es). It depends on {} external module(s).",
        record.language,
        record.functions.len(),
        record.classes.len(),
        record.dependencies.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleResponse;

    fn sample_record() -> AnalysisRecord {
        AnalysisRecord {
            language: "rust".into(),
            file: "src/lib.rs".into(),
            functions: vec!["run".into()],
            classes: vec![],
            interfaces: vec![],
            types: vec![],
            imports: vec![],
            exports: vec![],
            dependencies: vec!["serde".into(), "tokio".into()],
            patterns: vec![],
            complexity: 1,
            maintainability: 90,
            testability: 80,
            documentation: 50,
            natural_language_description: String::new(),
        }
    }

    struct JsonOracle;
    impl CodeOracle for JsonOracle {
        fn generate(&self, _request: &OracleRequest) -> crate::error::Result<OracleResponse> {
            Ok(OracleResponse {
                code: r#"{"description": "A small Rust utility module."}"#.into(),
                model: "test".into(),
                input_tokens: 10,
                output_tokens: 10,
            })
        }
    }

    struct BrokenOracle;
    impl CodeOracle for BrokenOracle {
        fn generate(&self, _request: &OracleRequest) -> crate::error::Result<OracleResponse> {
            Err(crate::error::EngineError::oracle("unavailable", false))
        }
    }

    struct GarbageOracle;
    impl CodeOracle for GarbageOracle {
        fn generate(&self, _request: &OracleRequest) -> crate::error::Result<OracleResponse> {
            Ok(OracleResponse { code: "not json".into(), model: "test".into(), input_tokens: 1, output_tokens: 1 })
        }
    }

    #[test]
    fn uses_oracle_reply_when_valid_json() {
        let description = synthesize(&sample_record(), &JsonOracle);
        assert_eq!(description, "A small Rust utility module.");
    }

    #[test]
    fn falls_back_on_oracle_error() {
        let description = synthesize(&sample_record(), &BrokenOracle);
        assert!(description.contains("1 function(s)"));
        assert!(description.contains("2 external module(s)"));
    }

    #[test]
    fn falls_back_on_unparseable_reply() {
        let description = synthesize(&sample_record(), &GarbageOracle);
        assert!(description.starts_with("This rust module"));
    }
}
