//! HTTP client for the remote LLM provider.
//!
//! A single request-response call over HTTPS returning generated content plus
//! a token-accounting envelope. Wrapped with the crate's retry policy and
//! circuit breaker so a flaky provider degrades to `UpstreamUnavailable`
//! instead of hanging the pipeline.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::retry::RetryPolicy;
use crate::{AdapterError, AdapterResult};

/// Token accounting reported by (or approximated for) a single completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A single completion from the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    pub content: String,
    pub usage: Option<ProviderUsage>,
    pub model_used: String,
}

/// One turn of a model conversation, used identically for the generation
/// call and the adversarial security-audit call — the only difference
/// between the two is the system prompt and parsing of the reply.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_text: String,
    pub max_output_tokens: Option<u32>,
}

/// Capability threaded through Sentinel/Guardian instead of a global LLM
/// handle.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> AdapterResult<CompletionResult>;
}

/// Resolves a user-facing model identifier to a known provider model,
/// falling back to a configured default.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    known: HashMap<String, String>,
    default_model: String,
}

impl ModelRegistry {
    pub fn new(known: Vec<String>, default_model: impl Into<String>) -> Self {
        let default_model = default_model.into();
        let known = known.into_iter().map(|m| (m.clone(), m)).collect();
        Self { known, default_model }
    }

    pub fn normalize(&self, requested: &str) -> String {
        self.known
            .get(requested)
            .cloned()
            .unwrap_or_else(|| {
                debug!(requested, fallback = %self.default_model, "unknown model, using default");
                self.default_model.clone()
            })
    }
}

/// Per-`(model_name, max_output_tokens)` pooled HTTP client to a single
/// provider endpoint, wrapped with retry + circuit breaking.
pub struct HttpModelClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Duration,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
}

impl HttpModelClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout,
            retry: RetryPolicy::default(),
            breaker: CircuitBreaker::new(CircuitBreakerConfig::default()),
        }
    }

    async fn call_once(&self, request: &CompletionRequest) -> AdapterResult<CompletionResult> {
        #[derive(Serialize)]
        struct ProviderRequest<'a> {
            model: &'a str,
            system: &'a str,
            prompt: &'a str,
            max_tokens: Option<u32>,
        }
        #[derive(Deserialize)]
        struct ProviderUsageWire {
            prompt_token_count: u64,
            candidates_token_count: u64,
        }
        #[derive(Deserialize)]
        struct ProviderResponse {
            content: String,
            usage_metadata: Option<ProviderUsageWire>,
        }

        let body = ProviderRequest {
            model: &request.model,
            system: &request.system_prompt,
            prompt: &request.user_text,
            max_tokens: request.max_output_tokens,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::ConnectionError(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AdapterError::RequestFailed(format!(
                "provider returned {}",
                resp.status()
            )));
        }

        let parsed: ProviderResponse = resp
            .json()
            .await
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;

        let usage = parsed.usage_metadata.map(|u| ProviderUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
        });

        Ok(CompletionResult {
            content: parsed.content,
            usage,
            model_used: request.model.clone(),
        })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, request: CompletionRequest) -> AdapterResult<CompletionResult> {
        self.breaker
            .call(|| self.retry.execute(|| self.call_once(&request)))
            .await
    }
}

/// Approximates token count as `len(text)/4` when the provider does not
/// report usage.
pub fn approximate_tokens(text: &str) -> u64 {
    (text.chars().count() as u64).div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_falls_back_to_default() {
        let reg = ModelRegistry::new(vec!["gpt-4o".into()], "gpt-4o-mini");
        assert_eq!(reg.normalize("gpt-4o"), "gpt-4o");
        assert_eq!(reg.normalize("nonexistent-model"), "gpt-4o-mini");
    }

    #[test]
    fn approximate_tokens_divides_by_four() {
        assert_eq!(approximate_tokens("abcd"), 1);
        assert_eq!(approximate_tokens("abcdefgh"), 2);
        assert_eq!(approximate_tokens(""), 0);
    }
}
