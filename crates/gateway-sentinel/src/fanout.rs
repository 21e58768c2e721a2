//! Parallel model fan-out: the generation call and the adversarial
//! security-audit call are issued concurrently and joined.

use gateway_adapters::model_client::{approximate_tokens, CompletionRequest, ModelClient, ProviderUsage};
use gateway_core::types::TokenUsage;
use serde::Deserialize;
use tracing::warn;

const GENERATION_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

const SECURITY_AUDIT_SYSTEM_PROMPT: &str = r#"You are a security classifier. Given the user text, \
respond with ONLY a JSON object of the shape \
{"is_threat": bool, "threat_type": string, "confidence": number between 0 and 1, "reasoning": string}. \
Do not include any other text."#;

/// Block threshold for the adversarial security audit.
pub const AUDIT_BLOCK_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityAuditVerdict {
    #[serde(default)]
    pub is_threat: bool,
    #[serde(default)]
    pub threat_type: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl Default for SecurityAuditVerdict {
    fn default() -> Self {
        Self {
            is_threat: false,
            threat_type: String::new(),
            confidence: 0.0,
            reasoning: None,
        }
    }
}

pub struct GenerationResult {
    pub content: String,
    pub usage: TokenUsage,
    pub model_used: String,
}

/// Strip a markdown code fence (```...```/```json...```) from an LLM reply
/// before parsing, as the security-audit model may wrap its JSON in one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.trim_start_matches("json").trim_start();
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    }
}

fn parse_audit_verdict(raw: &str) -> SecurityAuditVerdict {
    let stripped = strip_code_fence(raw);
    serde_json::from_str(stripped).unwrap_or_else(|e| {
        warn!(error = %e, "security audit reply did not parse as JSON; defaulting to not-a-threat");
        SecurityAuditVerdict::default()
    })
}

fn usage_or_approx(usage: Option<ProviderUsage>, prompt: &str, completion: &str) -> TokenUsage {
    match usage {
        Some(u) => TokenUsage::new(u.prompt_tokens as u32, u.completion_tokens as u32),
        None => TokenUsage::new(
            approximate_tokens(prompt) as u32,
            approximate_tokens(completion) as u32,
        ),
    }
}

/// Issue the generation and security-audit completions concurrently and
/// join both; combined latency is the max of the two.
pub async fn parallel_fanout(
    client: &dyn ModelClient,
    model: &str,
    working_text: &str,
    max_output_tokens: Option<u32>,
) -> gateway_adapters::AdapterResult<(GenerationResult, SecurityAuditVerdict)> {
    let generation_request = CompletionRequest {
        model: model.to_string(),
        system_prompt: GENERATION_SYSTEM_PROMPT.to_string(),
        user_text: working_text.to_string(),
        max_output_tokens,
    };
    let audit_request = CompletionRequest {
        model: model.to_string(),
        system_prompt: SECURITY_AUDIT_SYSTEM_PROMPT.to_string(),
        user_text: working_text.to_string(),
        max_output_tokens: None,
    };

    let (generation, audit) = tokio::try_join!(
        client.complete(generation_request),
        client.complete(audit_request),
    )?;

    // Hard client-side char truncation fallback at 4*max_output_tokens.
    let mut content = generation.content;
    if let Some(max_tokens) = max_output_tokens {
        let hard_limit = (max_tokens as usize) * 4;
        if content.chars().count() > hard_limit {
            content = content.chars().take(hard_limit).collect();
        }
    }

    let usage = usage_or_approx(generation.usage, working_text, &content);
    let verdict = parse_audit_verdict(&audit.content);

    Ok((
        GenerationResult {
            content,
            usage,
            model_used: generation.model_used,
        },
        verdict,
    ))
}

/// Whether the audit verdict crosses the block threshold, and the formatted
/// reason if so.
pub fn audit_block_reason(verdict: &SecurityAuditVerdict) -> Option<String> {
    if verdict.is_threat && verdict.confidence > AUDIT_BLOCK_THRESHOLD {
        Some(format!(
            "LLM security: {} (confidence: {:.2})",
            verdict.threat_type, verdict.confidence
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plain_code_fence() {
        let raw = "```\n{\"is_threat\": true}\n```";
        assert_eq!(strip_code_fence(raw), "{\"is_threat\": true}");
    }

    #[test]
    fn strips_json_labeled_code_fence() {
        let raw = "```json\n{\"is_threat\": false}\n```";
        assert_eq!(strip_code_fence(raw), "{\"is_threat\": false}");
    }

    #[test]
    fn parse_failure_defaults_to_not_a_threat() {
        let verdict = parse_audit_verdict("not json at all");
        assert!(!verdict.is_threat);
        assert_eq!(verdict.confidence, 0.0);
    }

    #[test]
    fn parses_well_formed_verdict() {
        let verdict = parse_audit_verdict(
            r#"{"is_threat": true, "threat_type": "prompt_injection", "confidence": 0.9, "reasoning": "x"}"#,
        );
        assert!(verdict.is_threat);
        assert_eq!(verdict.threat_type, "prompt_injection");
        assert_eq!(verdict.confidence, 0.9);
    }

    #[test]
    fn audit_block_reason_only_above_threshold() {
        let below = SecurityAuditVerdict {
            is_threat: true,
            threat_type: "x".into(),
            confidence: 0.5,
            reasoning: None,
        };
        assert!(audit_block_reason(&below).is_none());

        let above = SecurityAuditVerdict {
            is_threat: true,
            threat_type: "prompt_injection".into(),
            confidence: 0.95,
            reasoning: None,
        };
        let reason = audit_block_reason(&above).unwrap();
        assert!(reason.contains("prompt_injection"));
        assert!(reason.contains("0.95"));
    }
}
