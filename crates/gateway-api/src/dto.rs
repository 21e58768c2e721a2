//! Wire types for the `POST /chat` contract. Deserializes directly into a
//! `RequestConfig` plus the free-text query, since the core carries no
//! separate `InputEnvelope` type of its own.

use gateway_core::types::{BrandTone, Moderation, OutputFormat, RequestConfig};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub moderation: Option<Moderation>,
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub sanitize_input: bool,
    #[serde(default = "default_true")]
    pub pii_masking: bool,
    #[serde(default = "default_true")]
    pub detect_threats: bool,
    #[serde(default)]
    pub toon_mode: bool,
    #[serde(default = "default_true")]
    pub content_filter: bool,
    #[serde(default)]
    pub hallucination_check: bool,
    #[serde(default)]
    pub citation_check: bool,
    #[serde(default)]
    pub tone_check: bool,
    #[serde(default = "default_true")]
    pub auto_disclaimers: bool,
    #[serde(default)]
    pub false_refusal_check: bool,
    #[serde(default)]
    pub brand_tone: Option<BrandTone>,
    #[serde(default)]
    pub toxicity_threshold: Option<f64>,
}

impl ChatRequest {
    /// The text handed to Sentinel as the pipeline's working text. A
    /// caller-supplied `system_prompt` is folded into the single query
    /// string the pipeline carries.
    pub fn effective_query(&self) -> String {
        match &self.system_prompt {
            Some(sp) if !sp.is_empty() => format!("System: {sp}\n\nUser: {}", self.query),
            _ => self.query.clone(),
        }
    }

    pub fn to_config(&self) -> RequestConfig {
        let mut config = RequestConfig {
            sanitize_input: self.settings.sanitize_input,
            pii_masking: self.settings.pii_masking,
            detect_threats: self.settings.detect_threats,
            toon_mode: self.settings.toon_mode,
            content_filter: self.settings.content_filter,
            hallucination_check: self.settings.hallucination_check,
            citation_check: self.settings.citation_check,
            tone_check: self.settings.tone_check,
            auto_disclaimers: self.settings.auto_disclaimers,
            false_refusal_check: self.settings.false_refusal_check,
            moderation: self.moderation.unwrap_or_default(),
            brand_tone: self.settings.brand_tone,
            toxicity_threshold: self.settings.toxicity_threshold.unwrap_or(0.7),
            output_format: self.output_format.unwrap_or_default(),
            max_output_tokens: self.max_output_tokens,
            model: self
                .model
                .clone()
                .unwrap_or_else(|| "gpt-3.5-turbo".to_string()),
        };
        if self.settings.brand_tone.is_some() {
            config.tone_check = true;
        }
        config
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct HealthBody {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReadyBody {
    pub status: &'static str,
    pub sentinel: &'static str,
    pub guardian: &'static str,
}
