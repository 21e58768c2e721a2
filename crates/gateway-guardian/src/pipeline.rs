//! The Guardian output pipeline: a directed sequence of
//! content_filter -> (block? -> return) -> pii_scan -> decode ->
//! parallel_judges -> disclaimer.

use gateway_adapters::model_client::ModelClient;
use gateway_core::types::{Moderation, RequestConfig, RequestState};
use tracing::info;

use crate::content_filter::{ContentCategory, ContentFilter};
use crate::decode::maybe_decode;
use crate::disclaimer;
use crate::judges::{check_citations, detect_false_refusal, judge_hallucination, judge_tone};
use crate::pii_scan::OutputPiiScanner;

pub struct Guardian {
    content_filter: ContentFilter,
    pii_scanner: OutputPiiScanner,
}

pub struct GuardianOutcome {
    pub state: RequestState,
    pub validated_response: Option<String>,
}

impl Guardian {
    pub fn new() -> Self {
        Self {
            content_filter: ContentFilter::new(),
            pii_scanner: OutputPiiScanner::new(),
        }
    }

    /// Validate `model_response` against `state`/`config`, mutating `state`
    /// with the judge verdicts and returning the finished response text
    /// unless content_filter terminally blocks it.
    ///
    /// The toxicity, hallucination, and tone judge calls are dispatched
    /// together in a single `tokio::join!` so they run concurrently rather
    /// than one after another; the content-filter block decision (table
    /// lookup plus toxicity threshold) is applied once the join resolves.
    pub async fn process(
        &self,
        mut state: RequestState,
        config: &RequestConfig,
        model_response: String,
        judge_client: &dyn ModelClient,
    ) -> GuardianOutcome {
        let judge_model = config.normalized_model();

        let classifications = self.content_filter.classify(&model_response);
        let content_filter_active = config.moderation != Moderation::Raw && !classifications.is_empty();
        let categories: Vec<ContentCategory> = classifications.iter().map(|(c, _)| *c).collect();
        let pattern_confidence = classifications.iter().map(|(_, c)| *c).fold(0.0, f64::max);

        let scan_outcome = self.pii_scanner.scan(&model_response);
        let decoded = maybe_decode(&scan_outcome.text, config.output_format);

        let (toxicity_score, hallucination, tone) = tokio::join!(
            async {
                if content_filter_active {
                    self.content_filter
                        .toxicity_score(
                            config.content_filter,
                            pattern_confidence,
                            judge_client,
                            &judge_model,
                            &model_response,
                        )
                        .await
                } else {
                    0.0
                }
            },
            async {
                if config.hallucination_check {
                    Some(judge_hallucination(judge_client, &judge_model, &state.original_query, &decoded).await)
                } else {
                    None
                }
            },
            async {
                if config.tone_check {
                    let tone = config.brand_tone.unwrap_or_default();
                    Some(judge_tone(judge_client, &judge_model, &decoded, tone).await)
                } else {
                    None
                }
            },
        );

        state.guardian_flags.toxicity = Some(toxicity_score);

        if content_filter_active {
            let mode = config.moderation;
            if let Some(category) = self.content_filter.decide_block(mode, &categories) {
                state.block(
                    format!("content_block: {category} blocked under {mode} moderation"),
                    toxicity_score,
                );
                info!(request_id = %state.request_id, "guardian blocked response: content filter");
                return GuardianOutcome {
                    state,
                    validated_response: None,
                };
            }

            if toxicity_score >= config.toxicity_threshold {
                state.block(
                    format!(
                        "content_block: toxicity score {toxicity_score:.2} >= threshold {:.2}",
                        config.toxicity_threshold
                    ),
                    toxicity_score,
                );
                info!(request_id = %state.request_id, "guardian blocked response: content filter");
                return GuardianOutcome {
                    state,
                    validated_response: None,
                };
            }
        }

        state.pii_detections.extend(scan_outcome.detections);

        if let Some(result) = hallucination {
            state.guardian_flags.hallucination = Some(result.detected);
            state.hallucination_details = result.details;
        }

        if let Some(result) = tone {
            state.guardian_flags.tone_ok = Some(result.compliant);
            state.tone_violation_reason = result.violation_reason;
        }

        if config.citation_check {
            let citation_result = check_citations(&decoded);
            state.guardian_flags.citations_ok = Some(citation_result.citations_ok);
            state.fake_citations = citation_result.fake_citations;
        }

        if config.false_refusal_check {
            state.guardian_flags.false_refusal = Some(detect_false_refusal(&decoded));
        }

        let disclaimer_outcome = if config.auto_disclaimers {
            disclaimer::inject_if_needed(&decoded)
        } else {
            disclaimer::DisclaimerOutcome {
                text: decoded.clone(),
                injected: false,
                category: None,
            }
        };
        state.guardian_flags.disclaimer = disclaimer_outcome.injected;

        GuardianOutcome {
            validated_response: Some(disclaimer_outcome.text),
            state,
        }
    }
}

impl Default for Guardian {
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
    use gateway_core::types::Moderation;

    struct StubJudge;

    #[async_trait]
    impl ModelClient for StubJudge {
        async fn complete(&self, request: CompletionRequest) -> AdapterResult<CompletionResult> {
            let content = if request.system_prompt.contains("content moderation") {
                r#"{"score": 0.0, "categories": []}"#.to_string()
            } else if request.system_prompt.contains("hallucination") {
                r#"{"hallucination_detected": false, "confidence": 0.1}"#.to_string()
            } else if request.system_prompt.contains("brand tone") {
                r#"{"tone_compliant": true, "detected_tone": "professional"}"#.to_string()
            } else {
                "{}".to_string()
            };
            Ok(CompletionResult {
                content,
                usage: None,
                model_used: request.model,
            })
        }
    }

    #[tokio::test]
    async fn clean_response_passes_through_with_flags_set() {
        let guardian = Guardian::new();
        let mut config = RequestConfig::default();
        config.hallucination_check = true;
        config.tone_check = true;
        config.citation_check = true;
        let state = RequestState::new("What is the capital of France?");
        let judge = StubJudge;

        let outcome = guardian
            .process(state, &config, "The capital of France is Paris.".to_string(), &judge)
            .await;

        assert!(!outcome.state.is_blocked);
        assert_eq!(outcome.state.guardian_flags.hallucination, Some(false));
        assert_eq!(outcome.state.guardian_flags.tone_ok, Some(true));
        assert!(outcome.validated_response.unwrap().contains("Paris"));
    }

    #[tokio::test]
    async fn strict_mode_blocks_harmful_content() {
        let guardian = Guardian::new();
        let mut config = RequestConfig::default();
        config.moderation = Moderation::Strict;
        let state = RequestState::new("query");
        let judge = StubJudge;

        let outcome = guardian
            .process(state, &config, "here is how to make a bomb at home".to_string(), &judge)
            .await;

        assert!(outcome.state.is_blocked);
        assert!(outcome.validated_response.is_none());
    }

    #[tokio::test]
    async fn medical_disclaimer_injected_when_enabled() {
        let guardian = Guardian::new();
        let config = RequestConfig::default();
        let state = RequestState::new("query");
        let judge = StubJudge;

        let outcome = guardian
            .process(
                state,
                &config,
                "Adjust your medication dosage after this diagnosis.".to_string(),
                &judge,
            )
            .await;

        assert!(outcome.state.guardian_flags.disclaimer);
        assert!(outcome.validated_response.unwrap().contains("not medical advice"));
    }

    #[tokio::test]
    async fn high_severity_pii_redacted_in_output() {
        let guardian = Guardian::new();
        let config = RequestConfig::default();
        let state = RequestState::new("query");
        let judge = StubJudge;

        let outcome = guardian
            .process(state, &config, "Your SSN on file is 123-45-6789.".to_string(), &judge)
            .await;

        let response = outcome.validated_response.unwrap();
        assert!(!response.contains("123-45-6789"));
        assert!(response.contains("[SSN_REDACTED]"));
    }
}
