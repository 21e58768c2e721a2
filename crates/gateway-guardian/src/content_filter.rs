//! Content classification and the moderation-mode action table. The table
//! is authoritative for hard blocks regardless of the `content_filter`
//! flag; that flag only decides whether the toxicity score comes from a
//! judge LLM call or from pattern confidence alone.

use std::fmt;

use gateway_adapters::model_client::{CompletionRequest, ModelClient};
use gateway_core::types::Moderation;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Harmful,
    Inappropriate,
    Sensitive,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentCategory::Harmful => "harmful",
            ContentCategory::Inappropriate => "inappropriate",
            ContentCategory::Sensitive => "sensitive",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Block,
    Warn,
    Allow,
}

/// The moderation-mode x category action table.
fn action_for(mode: Moderation, category: ContentCategory) -> Action {
    use Action::*;
    use ContentCategory::*;
    use Moderation::*;
    match (mode, category) {
        (Strict, Harmful) | (Strict, Inappropriate) | (Strict, Sensitive) => Block,
        (Moderate, Harmful) => Block,
        (Moderate, Inappropriate) => Warn,
        (Moderate, Sensitive) => Allow,
        (Relaxed, Harmful) => Block,
        (Relaxed, Inappropriate) | (Relaxed, Sensitive) => Allow,
        (Raw, _) => Allow,
    }
}

pub struct ContentFilterOutcome {
    pub blocked: bool,
    pub block_reason: Option<String>,
    pub toxicity_score: f64,
    pub categories: Vec<ContentCategory>,
}

#[derive(Debug, Deserialize)]
struct ToxicityVerdict {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    #[allow(dead_code)]
    categories: Vec<String>,
}

const TOXICITY_JUDGE_SYSTEM_PROMPT: &str =
    "You are a content moderation classifier. Given the text, respond with \
ONLY a JSON object {\"score\": number between 0 and 1, \"categories\": [string]} \
describing how toxic the text is. Do not include any other text.";

pub struct ContentFilter {
    harmful: Vec<Regex>,
    inappropriate: Vec<Regex>,
    sensitive: Vec<Regex>,
}

impl ContentFilter {
    pub fn new() -> Self {
        Self {
            harmful: compile(&[
                r"(?i)\bhow to (make|build|synthesize)\b.{0,30}\b(bomb|explosive|weapon|poison)\b",
                r"(?i)\bkill (yourself|myself|him|her|them)\b",
                r"(?i)\bchild (abuse|exploitation|pornography)\b",
            ]),
            inappropriate: compile(&[
                r"(?i)\b(fuck|shit|asshole|bitch)\b",
                r"(?i)\bracial slur\b",
            ]),
            sensitive: compile(&[
                r"(?i)\b(suicide|self-harm|depression|overdose)\b",
                r"(?i)\b(hiv|std|abortion)\b",
            ]),
        }
    }

    /// Pattern-classify `text`, returning the matched categories with a
    /// `0.3 * matches` confidence capped at 1.0.
    pub fn classify(&self, text: &str) -> Vec<(ContentCategory, f64)> {
        let mut out = Vec::new();
        push_if_any(&mut out, ContentCategory::Harmful, &self.harmful, text);
        push_if_any(&mut out, ContentCategory::Inappropriate, &self.inappropriate, text);
        push_if_any(&mut out, ContentCategory::Sensitive, &self.sensitive, text);
        out
    }

    /// The moderation-mode table's verdict for a set of already-detected
    /// categories; `None` when nothing in `categories` blocks at `mode`.
    pub fn decide_block(&self, mode: Moderation, categories: &[ContentCategory]) -> Option<ContentCategory> {
        categories
            .iter()
            .find(|c| action_for(mode, **c) == Action::Block)
            .copied()
    }

    /// Toxicity score for `text`: a judge-LLM call when `content_filter_flag`
    /// is set, falling back to pattern confidence on a judge failure or when
    /// the flag is unset. Callers that need this concurrently with other
    /// judge calls should await this directly inside a `tokio::join!` rather
    /// than going through [`ContentFilter::evaluate`].
    pub async fn toxicity_score(
        &self,
        content_filter_flag: bool,
        pattern_confidence: f64,
        judge: &dyn ModelClient,
        judge_model: &str,
        text: &str,
    ) -> f64 {
        if content_filter_flag {
            judge_toxicity(judge, judge_model, text)
                .await
                .unwrap_or(pattern_confidence)
        } else {
            pattern_confidence
        }
    }

    /// Classify, apply the moderation-mode table, and fold in a toxicity
    /// score that blocks independently of the table when it crosses
    /// `toxicity_threshold`. Stand-alone convenience wrapper around
    /// [`ContentFilter::decide_block`]/[`ContentFilter::toxicity_score`] for
    /// callers that don't need the toxicity call to run concurrently with
    /// anything else.
    pub async fn evaluate(
        &self,
        text: &str,
        mode: Moderation,
        content_filter_flag: bool,
        toxicity_threshold: f64,
        judge: &dyn ModelClient,
        judge_model: &str,
    ) -> ContentFilterOutcome {
        let classifications = self.classify(text);

        if mode == Moderation::Raw || classifications.is_empty() {
            return ContentFilterOutcome {
                blocked: false,
                block_reason: None,
                toxicity_score: 0.0,
                categories: Vec::new(),
            };
        }

        let categories: Vec<ContentCategory> = classifications.iter().map(|(c, _)| *c).collect();
        let pattern_confidence = classifications.iter().map(|(_, c)| *c).fold(0.0, f64::max);
        let toxicity_score = self
            .toxicity_score(content_filter_flag, pattern_confidence, judge, judge_model, text)
            .await;
        let table_block = self.decide_block(mode, &categories);

        if let Some(category) = table_block {
            return ContentFilterOutcome {
                blocked: true,
                block_reason: Some(format!(
                    "content_block: {category} blocked under {mode} moderation"
                )),
                toxicity_score,
                categories,
            };
        }

        if toxicity_score >= toxicity_threshold {
            return ContentFilterOutcome {
                blocked: true,
                block_reason: Some(format!(
                    "content_block: toxicity score {toxicity_score:.2} >= threshold {toxicity_threshold:.2}"
                )),
                toxicity_score,
                categories,
            };
        }

        ContentFilterOutcome {
            blocked: false,
            block_reason: None,
            toxicity_score,
            categories,
        }
    }
}

impl Default for ContentFilter {
    fn default() -> Self {
        Self::new()
    }
}

async fn judge_toxicity(
    judge: &dyn ModelClient,
    model: &str,
    text: &str,
) -> Option<f64> {
    let request = CompletionRequest {
        model: model.to_string(),
        system_prompt: TOXICITY_JUDGE_SYSTEM_PROMPT.to_string(),
        user_text: text.to_string(),
        max_output_tokens: None,
    };
    let result = judge.complete(request).await.ok()?;
    let trimmed = result.content.trim();
    match serde_json::from_str::<ToxicityVerdict>(trimmed) {
        Ok(verdict) => Some(verdict.score.clamp(0.0, 1.0)),
        Err(e) => {
            warn!(error = %e, "toxicity judge reply did not parse as JSON");
            None
        }
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

fn push_if_any(out: &mut Vec<(ContentCategory, f64)>, category: ContentCategory, patterns: &[Regex], text: &str) {
    let hits = patterns.iter().filter(|re| re.is_match(text)).count();
    if hits == 0 {
        return;
    }
    out.push((category, (0.3 * hits as f64).min(1.0)));
}
