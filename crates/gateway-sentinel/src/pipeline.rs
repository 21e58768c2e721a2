//! The Sentinel input pipeline: sanitize -> pseudonymize -> threat-detect ->
//! optional compact-encode -> parallel model fan-out. Each
//! step is gated by its `RequestConfig` flag and records its own latency.
//! A block verdict at any point is terminal: no downstream stage mutates
//! `working_text` or issues model calls.

use std::time::Instant;

use gateway_adapters::model_client::ModelClient;
use gateway_core::toon;
use gateway_core::types::{RequestConfig, RequestState};
use tracing::{info, warn};

use crate::error::{Result, SentinelError};
use crate::fanout::{self, parallel_fanout};
use crate::pseudonymize::Pseudonymizer;
use crate::sanitize::Sanitizer;
use crate::threat_detect::{self, ThreatDetector};

pub struct Sentinel {
    sanitizer: Sanitizer,
    pseudonymizer: Pseudonymizer,
    threat_detector: ThreatDetector,
}

/// Everything Guardian needs once Sentinel's input pipeline has passed:
/// the generation result, original query, pii_map, and policy flags.
pub struct SentinelOutcome {
    pub state: RequestState,
    pub model_response: Option<String>,
}

impl Sentinel {
    pub fn new() -> Self {
        Self {
            sanitizer: Sanitizer::new(),
            pseudonymizer: Pseudonymizer::new(),
            threat_detector: ThreatDetector::new(),
        }
    }

    /// Run the full input pipeline against `state`, dispatching to the
    /// model provider only if nothing short-circuited with a block.
    pub async fn process(
        &self,
        mut state: RequestState,
        config: &RequestConfig,
        model_client: &dyn ModelClient,
    ) -> Result<SentinelOutcome> {
        if config.sanitize_input {
            let start = Instant::now();
            let outcome = self.sanitizer.sanitize(&state.working_text);
            state.working_text = outcome.text;
            state.sanitization_warnings.extend(outcome.warnings);
            state.record_latency("sanitize", start.elapsed().as_millis() as u64);
        }

        if config.pii_masking {
            let start = Instant::now();
            let outcome = self.pseudonymizer.pseudonymize(&state.working_text);
            state.working_text = outcome.text;
            state.pii_map = outcome.pii_map;
            state.pii_detections = outcome.detections;
            state.record_latency("pseudonymize", start.elapsed().as_millis() as u64);
        }

        if config.detect_threats {
            let start = Instant::now();
            let detections = self.threat_detector.detect(&state.working_text);
            state.record_latency("threat_detect", start.elapsed().as_millis() as u64);

            if let Some(reason) = threat_detect::block_reason(&detections) {
                let score = threat_detect::max_confidence(&detections);
                state.detected_threats = detections;
                state.block(reason, score);
                info!(
                    request_id = %state.request_id,
                    threats = ?state.detected_threats.iter().map(|d| d.threat_type.to_string()).collect::<Vec<_>>(),
                    "sentinel blocked request: pattern threat detection"
                );
                return Ok(SentinelOutcome {
                    state,
                    model_response: None,
                });
            }
            state.detected_threats = detections;
        }

        if config.toon_mode {
            let start = Instant::now();
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&state.working_text) {
                let encoded = toon::encode(&value);
                state.tokens_saved = toon::tokens_saved(&state.working_text, &encoded);
                state.toon_encoded = Some(encoded.clone());
                state.working_text = encoded;
            } else {
                warn!(request_id = %state.request_id, "toon_mode set but input is not JSON; skipping encode");
            }
            state.record_latency("toon_encode", start.elapsed().as_millis() as u64);
        }

        // Parallel fan-out: generation call and security-audit call.
        let start = Instant::now();
        let fanout_result = parallel_fanout(
            model_client,
            &config.normalized_model(),
            &state.working_text,
            config.max_output_tokens,
        )
        .await
        .map_err(|e| SentinelError::UpstreamUnavailable(e.to_string()))?;
        state.record_latency("model_fanout", start.elapsed().as_millis() as u64);

        let (generation, audit_verdict) = fanout_result;

        if let Some(reason) = fanout::audit_block_reason(&audit_verdict) {
            state.block(reason, audit_verdict.confidence);
            info!(request_id = %state.request_id, "sentinel blocked request: llm security audit");
            return Ok(SentinelOutcome {
                state,
                model_response: None,
            });
        }

        state.llm_tokens = generation.usage;
        state.model_used = Some(generation.model_used.clone());

        Ok(SentinelOutcome {
            model_response: Some(generation.content),
            state,
        })
    }

    /// Restore original PII literals into `text` using `pii_map`, applying
    /// substitutions in insertion order. The only place tokens are
    /// un-mapped.
    pub fn depseudonymize(text: &str, pii_map: &gateway_core::types::PiiMap) -> String {
        let mut result = text.to_string();
        for (token, literal) in pii_map.iter() {
            result = result.replace(token, literal);
        }
        result
    }
}

impl Default for Sentinel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gateway_adapters::model_client::{CompletionRequest, CompletionResult};
    use gateway_adapters::AdapterResult;

    struct EchoModelClient;

    #[async_trait]
    impl ModelClient for EchoModelClient {
        async fn complete(&self, request: CompletionRequest) -> AdapterResult<CompletionResult> {
            let content = if request.system_prompt.contains("security classifier") {
                r#"{"is_threat": false, "confidence": 0.0}"#.to_string()
            } else {
                format!("echo: {}", request.user_text)
            };
            Ok(CompletionResult {
                content,
                usage: None,
                model_used: request.model,
            })
        }
    }

    #[tokio::test]
    async fn clean_prompt_passes_and_calls_model() {
        let sentinel = Sentinel::new();
        let state = RequestState::new("What is the capital of France?");
        let config = RequestConfig::default();
        let client = EchoModelClient;

        let outcome = sentinel.process(state, &config, &client).await.unwrap();
        assert!(!outcome.state.is_blocked);
        assert!(outcome.model_response.unwrap().contains("What is the capital of France?"));
    }

    #[tokio::test]
    async fn sql_injection_blocks_before_model_call() {
        let sentinel = Sentinel::new();
        let mut config = RequestConfig::default();
        config.detect_threats = true;
        let state = RequestState::new("' OR '1'='1 --");
        let client = EchoModelClient;

        let outcome = sentinel.process(state, &config, &client).await.unwrap();
        assert!(outcome.state.is_blocked);
        assert!(outcome.state.security_score >= 0.7);
        assert_eq!(outcome.state.llm_tokens.total(), 0);
        assert!(outcome.model_response.is_none());
    }

    #[tokio::test]
    async fn pii_masking_scrubs_working_text_but_preserves_original_query() {
        let sentinel = Sentinel::new();
        let mut config = RequestConfig::default();
        config.pii_masking = true;
        let state = RequestState::new("My SSN is 123-45-6789 and email me at j@x.com");
        let client = EchoModelClient;

        let outcome = sentinel.process(state, &config, &client).await.unwrap();
        assert!(!outcome.state.working_text.contains("123-45-6789"));
        assert_eq!(outcome.state.original_query, "My SSN is 123-45-6789 and email me at j@x.com");

        let restored = Sentinel::depseudonymize(
            &outcome.model_response.unwrap(),
            &outcome.state.pii_map,
        );
        assert!(restored.contains("123-45-6789"));
        assert!(restored.contains("j@x.com"));
    }

    #[tokio::test]
    async fn pii_masking_disabled_yields_empty_detections_and_map() {
        let sentinel = Sentinel::new();
        let mut config = RequestConfig::default();
        config.pii_masking = false;
        let state = RequestState::new("My SSN is 123-45-6789");
        let client = EchoModelClient;

        let outcome = sentinel.process(state, &config, &client).await.unwrap();
        assert!(outcome.state.pii_detections.is_empty());
        assert!(outcome.state.pii_map.is_empty());
    }
}
