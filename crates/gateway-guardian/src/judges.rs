//! The four parallel output judges: hallucination, citation, tone, false
//! refusal. Each is gated by its own flag and MUST be dispatched
//! concurrently with the others; a failed judge call degrades to a safe
//! default rather than blocking or propagating the error.

use gateway_adapters::model_client::{CompletionRequest, ModelClient};
use gateway_core::types::BrandTone;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

const HALLUCINATION_SYSTEM_PROMPT: &str = "You compare a user query against an AI response and \
judge whether the response contains fabricated or unsupported claims. Respond with ONLY a JSON \
object {\"hallucination_detected\": bool, \"confidence\": number between 0 and 1, \"details\": string}.";

const TONE_SYSTEM_PROMPT: &str = "You check whether a piece of text matches a required brand \
tone. Respond with ONLY a JSON object {\"tone_compliant\": bool, \"detected_tone\": string, \
\"violation_reason\": string}.";

const CITATION_BLOCKLIST: &[&str] = &["example.com", "test.com", "localhost", "dummy.com"];

const VAGUE_CLAIM_PHRASES: &[&str] = &[
    "studies show",
    "experts say",
    "research indicates",
    "it is well known",
    "many believe",
    "scientists agree",
];

#[derive(Debug, Clone, Default)]
pub struct HallucinationResult {
    pub detected: bool,
    pub confidence: f64,
    pub details: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct HallucinationVerdict {
    #[serde(default)]
    hallucination_detected: bool,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    details: Option<String>,
}

pub async fn judge_hallucination(
    judge: &dyn ModelClient,
    model: &str,
    original_query: &str,
    response: &str,
) -> HallucinationResult {
    let prompt = format!("Query: {original_query}\n\nResponse: {response}");
    let request = CompletionRequest {
        model: model.to_string(),
        system_prompt: HALLUCINATION_SYSTEM_PROMPT.to_string(),
        user_text: prompt,
        max_output_tokens: None,
    };
    match judge.complete(request).await {
        Ok(result) => match serde_json::from_str::<HallucinationVerdict>(result.content.trim()) {
            Ok(v) => HallucinationResult {
                detected: v.hallucination_detected,
                confidence: v.confidence.clamp(0.0, 1.0),
                details: v.details,
            },
            Err(e) => {
                warn!(error = %e, "hallucination judge reply did not parse; degrading to not-detected");
                HallucinationResult::default()
            }
        },
        Err(e) => {
            warn!(error = %e, "hallucination judge call failed; degrading to not-detected");
            HallucinationResult::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CitationResult {
    pub citations_ok: bool,
    pub fake_citations: Vec<String>,
}

struct CitationPatterns {
    url: Regex,
    doi: Regex,
    arxiv: Regex,
    quoted_title: Regex,
}

fn citation_patterns() -> CitationPatterns {
    CitationPatterns {
        url: Regex::new(r"https?://[^\s)]+").unwrap(),
        doi: Regex::new(r"\b10\.\d{4,9}/\S+\b").unwrap(),
        arxiv: Regex::new(r"(?i)\barxiv:\d{4}\.\d{4,5}\b").unwrap(),
        quoted_title: Regex::new(r#""([^"]{4,120})""#).unwrap(),
    }
}

/// Extract citation-like references from `response`, flag any on the
/// blocklist, and flag vague-claim phrasing when no concrete citation is
/// present at all.
pub fn check_citations(response: &str) -> CitationResult {
    let patterns = citation_patterns();
    let mut fake = Vec::new();
    let mut concrete_citation_found = false;

    for m in patterns.url.find_iter(response) {
        concrete_citation_found = true;
        let url = m.as_str();
        if CITATION_BLOCKLIST.iter().any(|d| url.contains(d)) {
            fake.push(url.to_string());
        }
    }
    for m in patterns.doi.find_iter(response) {
        concrete_citation_found = true;
        let _ = m;
    }
    for m in patterns.arxiv.find_iter(response) {
        concrete_citation_found = true;
        let _ = m;
    }
    for cap in patterns.quoted_title.captures_iter(response) {
        concrete_citation_found = true;
        let _ = cap;
    }

    let lower = response.to_lowercase();
    if !concrete_citation_found {
        for phrase in VAGUE_CLAIM_PHRASES {
            if lower.contains(phrase) {
                fake.push(format!("vague-claim: \"{phrase}\""));
            }
        }
    }

    CitationResult {
        citations_ok: fake.is_empty(),
        fake_citations: fake,
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToneResult {
    pub compliant: bool,
    pub detected_tone: Option<String>,
    pub violation_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ToneVerdict {
    #[serde(default = "default_true")]
    tone_compliant: bool,
    #[serde(default)]
    detected_tone: String,
    #[serde(default)]
    violation_reason: Option<String>,
}

fn default_true() -> bool {
    true
}

pub async fn judge_tone(
    judge: &dyn ModelClient,
    model: &str,
    response: &str,
    brand_tone: BrandTone,
) -> ToneResult {
    let prompt = format!("Required brand tone: {brand_tone}\n\nText: {response}");
    let request = CompletionRequest {
        model: model.to_string(),
        system_prompt: TONE_SYSTEM_PROMPT.to_string(),
        user_text: prompt,
        max_output_tokens: None,
    };
    match judge.complete(request).await {
        Ok(result) => match serde_json::from_str::<ToneVerdict>(result.content.trim()) {
            Ok(v) => ToneResult {
                compliant: v.tone_compliant,
                detected_tone: Some(v.detected_tone),
                violation_reason: v.violation_reason,
            },
            Err(e) => {
                warn!(error = %e, "tone judge reply did not parse; degrading to compliant");
                ToneResult {
                    compliant: true,
                    ..Default::default()
                }
            }
        },
        Err(e) => {
            warn!(error = %e, "tone judge call failed; degrading to compliant");
            ToneResult {
                compliant: true,
                ..Default::default()
            }
        }
    }
}

const REFUSAL_PATTERNS: &[&str] = &[
    r"(?i)i('m| am) sorry,? but i can('t|not) (help|assist) (with )?that",
    r"(?i)as an ai (language model)?,? i (cannot|can't|am unable to)",
    r"(?i)i('m| am) not able to (provide|assist with) that",
    r"(?i)i can('t|not) (fulfill|comply with) (that|this) request",
];

/// Whether `response` contains a canned refusal phrase. A hit on a
/// non-blocked response is a suspected false refusal.
pub fn detect_false_refusal(response: &str) -> bool {
    REFUSAL_PATTERNS
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .any(|re| re.is_match(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gateway_adapters::model_client::CompletionResult;
    use gateway_adapters::AdapterResult;

    struct StubJudge(String);

    #[async_trait]
    impl ModelClient for StubJudge {
        async fn complete(&self, request: CompletionRequest) -> AdapterResult<CompletionResult> {
            Ok(CompletionResult {
                content: self.0.clone(),
                usage: None,
                model_used: request.model,
            })
        }
    }

    #[tokio::test]
    async fn hallucination_judge_parses_well_formed_reply() {
        let judge = StubJudge(
            r#"{"hallucination_detected": true, "confidence": 0.8, "details": "made up a statistic"}"#
                .to_string(),
        );
        let result = judge_hallucination(&judge, "m", "query", "response").await;
        assert!(result.detected);
        assert_eq!(result.confidence, 0.8);
    }

    #[tokio::test]
    async fn hallucination_judge_degrades_on_malformed_reply() {
        let judge = StubJudge("not json".to_string());
        let result = judge_hallucination(&judge, "m", "query", "response").await;
        assert!(!result.detected);
    }

    #[test]
    fn flags_blocklisted_citation_domain() {
        let result = check_citations("see https://example.com/study for details");
        assert!(!result.citations_ok);
        assert!(result.fake_citations.iter().any(|c| c.contains("example.com")));
    }

    #[test]
    fn flags_vague_claims_without_concrete_citation() {
        let result = check_citations("Studies show this is the best approach.");
        assert!(!result.citations_ok);
    }

    #[test]
    fn real_citation_with_no_vague_phrasing_passes() {
        let result = check_citations("See https://arxiv.org/abs/2301.00001 for the full paper.");
        assert!(result.citations_ok);
    }

    #[tokio::test]
    async fn tone_judge_degrades_to_compliant_on_failure() {
        let judge = StubJudge("garbage".to_string());
        let result = judge_tone(&judge, "m", "hey what's up", BrandTone::Professional).await;
        assert!(result.compliant);
    }

    #[test]
    fn detects_canned_refusal_phrase() {
        assert!(detect_false_refusal(
            "I'm sorry, but I can't help with that request."
        ));
    }

    #[test]
    fn does_not_flag_normal_response() {
        assert!(!detect_false_refusal("The capital of France is Paris."));
    }
}
