//! Shared data model for the gateway pipeline: request configuration, the
//! mutable state record carried through Gateway -> Sentinel -> Guardian, and
//! the response envelope returned to callers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Correlates a single request across Gateway, Sentinel and Guardian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-request moderation policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Moderation {
    Strict,
    Moderate,
    Relaxed,
    Raw,
}

impl Default for Moderation {
    fn default() -> Self {
        Moderation::Moderate
    }
}

impl fmt::Display for Moderation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Moderation::Strict => "strict",
            Moderation::Moderate => "moderate",
            Moderation::Relaxed => "relaxed",
            Moderation::Raw => "raw",
        };
        write!(f, "{s}")
    }
}

/// Brand tone a response must comply with, required iff `tone_check` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrandTone {
    Professional,
    Casual,
    Technical,
    Friendly,
}

impl Default for BrandTone {
    fn default() -> Self {
        BrandTone::Professional
    }
}

impl fmt::Display for BrandTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BrandTone::Professional => "professional",
            BrandTone::Casual => "casual",
            BrandTone::Technical => "technical",
            BrandTone::Friendly => "friendly",
        };
        write!(f, "{s}")
    }
}

/// Response body shape: plain JSON or the compact TOON form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Toon,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json
    }
}

/// Per-call policy bundle. All steps default to enabled except
/// `toon_mode`, which a caller opts into explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub sanitize_input: bool,
    pub pii_masking: bool,
    pub detect_threats: bool,
    pub toon_mode: bool,
    pub content_filter: bool,
    pub hallucination_check: bool,
    pub citation_check: bool,
    pub tone_check: bool,
    pub auto_disclaimers: bool,
    pub false_refusal_check: bool,
    pub moderation: Moderation,
    pub brand_tone: Option<BrandTone>,
    pub toxicity_threshold: f64,
    pub output_format: OutputFormat,
    pub max_output_tokens: Option<u32>,
    pub model: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            sanitize_input: true,
            pii_masking: true,
            detect_threats: true,
            toon_mode: false,
            content_filter: true,
            hallucination_check: false,
            citation_check: false,
            tone_check: false,
            auto_disclaimers: true,
            false_refusal_check: false,
            moderation: Moderation::default(),
            brand_tone: None,
            toxicity_threshold: 0.7,
            output_format: OutputFormat::default(),
            max_output_tokens: None,
            model: default_model().to_string(),
        }
    }
}

/// Models the gateway recognizes; anything else falls back to the default.
pub const KNOWN_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4-turbo",
    "gpt-3.5-turbo",
    "claude-3-opus",
    "claude-3-sonnet",
    "claude-3-haiku",
    "gemini-1.5-pro",
];

fn default_model() -> &'static str {
    "gpt-3.5-turbo"
}

impl RequestConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_moderation(mut self, moderation: Moderation) -> Self {
        self.moderation = moderation;
        self
    }

    pub fn with_brand_tone(mut self, tone: BrandTone) -> Self {
        self.tone_check = true;
        self.brand_tone = Some(tone);
        self
    }

    pub fn with_toxicity_threshold(mut self, threshold: f64) -> Self {
        self.toxicity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Normalize `model` to a known identifier, falling back to the default
    /// when the caller supplied something unrecognized.
    pub fn normalized_model(&self) -> String {
        if KNOWN_MODELS.contains(&self.model.as_str()) {
            self.model.clone()
        } else {
            default_model().to_string()
        }
    }
}

/// Category a detected PII literal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiType {
    Ssn,
    CreditCard,
    Email,
    Phone,
    ApiKey,
    Ip,
    SensitiveKeyword,
}

impl PiiType {
    /// High-severity types are redacted inline on output; others are only
    /// reported.
    pub fn is_high_severity(&self) -> bool {
        matches!(self, PiiType::Ssn | PiiType::CreditCard | PiiType::ApiKey)
    }

    pub fn token_prefix(&self) -> &'static str {
        match self {
            PiiType::Ssn => "SSN",
            PiiType::CreditCard => "CC",
            PiiType::Email => "EMAIL",
            PiiType::Phone => "PHONE",
            PiiType::ApiKey => "API_KEY",
            PiiType::Ip => "IP",
            PiiType::SensitiveKeyword => "KEYWORD",
        }
    }
}

/// A single PII literal found in a request or response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PiiDetection {
    pub pii_type: PiiType,
    pub token: Option<String>,
    pub count: u32,
}

/// Bijective map from opaque token (`[<TYPE>_<n>]`) to the original literal.
/// Insertion order is preserved for de-pseudonymization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PiiMap {
    entries: Vec<(String, String)>,
}

impl PiiMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Insert a new token/literal pair. Callers are responsible for ensuring
    /// the token is unique (it is, by construction, since tokens are minted
    /// from a monotonic per-type counter).
    pub fn insert(&mut self, token: impl Into<String>, literal: impl Into<String>) {
        self.entries.push((token.into(), literal.into()));
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, lit)| lit.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, l)| (t.as_str(), l.as_str()))
    }
}

/// A pattern-detected threat in input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatType {
    SqlInjection,
    Xss,
    CommandInjection,
    PathTraversal,
    LdapInjection,
    XmlInjection,
}

impl fmt::Display for ThreatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreatType::SqlInjection => "sql_injection",
            ThreatType::Xss => "xss",
            ThreatType::CommandInjection => "command_injection",
            ThreatType::PathTraversal => "path_traversal",
            ThreatType::LdapInjection => "ldap_injection",
            ThreatType::XmlInjection => "xml_injection",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatDetection {
    pub threat_type: ThreatType,
    pub confidence: f64,
    pub matches: Vec<String>,
}

/// Token accounting for a single model call, `total = input + output`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u32,
    pub output: u32,
}

impl TokenUsage {
    pub fn new(input: u32, output: u32) -> Self {
        Self { input, output }
    }

    pub fn total(&self) -> u32 {
        self.input + self.output
    }
}

/// Output-side judge verdicts; `None` means the check was skipped or its
/// judge call failed and degraded to absent rather than blocking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardianFlags {
    pub hallucination: Option<bool>,
    pub citations_ok: Option<bool>,
    pub tone_ok: Option<bool>,
    pub disclaimer: bool,
    pub false_refusal: Option<bool>,
    pub toxicity: Option<f64>,
}

/// Per-stage latency ledger, keyed by stage name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageLatencies {
    per_stage: HashMap<String, u64>,
}

impl StageLatencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: impl Into<String>, millis: u64) {
        self.per_stage.insert(stage.into(), millis);
    }

    pub fn total_ms(&self) -> u64 {
        self.per_stage.values().sum()
    }

    pub fn as_map(&self) -> &HashMap<String, u64> {
        &self.per_stage
    }
}

/// The mutable record carried by value through Gateway -> Sentinel ->
/// Guardian. Created at the Gateway on request receipt and
/// destroyed at response send; nothing survives across requests except
/// usage counters and audit events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestState {
    pub request_id: RequestId,
    pub original_query: String,
    pub working_text: String,
    pub sanitization_warnings: Vec<String>,
    pub pii_detections: Vec<PiiDetection>,
    pub pii_map: PiiMap,
    pub detected_threats: Vec<ThreatDetection>,
    pub toon_encoded: Option<String>,
    pub tokens_saved: f64,
    pub is_blocked: bool,
    pub block_reason: Option<String>,
    pub security_score: f64,
    pub model_response: Option<String>,
    pub llm_tokens: TokenUsage,
    pub model_used: Option<String>,
    pub guardian_flags: GuardianFlags,
    pub latencies_ms: StageLatencies,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,

    /// Detail fields surfaced alongside the boolean guardian flags so a
    /// caller (or audit event) can see *why* a check tripped, not only that
    /// it did.
    pub fake_citations: Vec<String>,
    pub tone_violation_reason: Option<String>,
    pub hallucination_details: Option<String>,
}

impl RequestState {
    pub fn new(original_query: impl Into<String>) -> Self {
        let original_query = original_query.into();
        Self {
            request_id: RequestId::new(),
            working_text: original_query.clone(),
            original_query,
            sanitization_warnings: Vec::new(),
            pii_detections: Vec::new(),
            pii_map: PiiMap::new(),
            detected_threats: Vec::new(),
            toon_encoded: None,
            tokens_saved: 0.0,
            is_blocked: false,
            block_reason: None,
            security_score: 0.0,
            model_response: None,
            llm_tokens: TokenUsage::default(),
            model_used: None,
            guardian_flags: GuardianFlags::default(),
            latencies_ms: StageLatencies::new(),
            client_ip: None,
            user_agent: None,
            fake_citations: Vec::new(),
            tone_violation_reason: None,
            hallucination_details: None,
        }
    }

    pub fn with_client_info(
        mut self,
        client_ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.client_ip = client_ip;
        self.user_agent = user_agent;
        self
    }

    /// Raise `security_score`, never lowering it (invariant: monotonically
    /// non-decreasing across stages within a request).
    pub fn raise_security_score(&mut self, candidate: f64) {
        if candidate > self.security_score {
            self.security_score = candidate.clamp(0.0, 1.0);
        }
    }

    /// Terminally block the request. Once blocked, no downstream stage may
    /// mutate `working_text` or issue model calls.
    pub fn block(&mut self, reason: impl Into<String>, score: f64) {
        self.is_blocked = true;
        self.block_reason = Some(reason.into());
        self.raise_security_score(score);
    }

    pub fn record_latency(&mut self, stage: &str, millis: u64) {
        self.latencies_ms.record(stage, millis);
    }
}

/// Metrics surfaced in the response body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMetrics {
    pub security_score: f64,
    pub tokens_saved: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    pub threats_detected: u32,
    pub pii_redacted: u32,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hallucination_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone_compliant: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclaimer_injected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_refusal_detected: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toxicity_score: Option<f64>,
}

/// Final response envelope returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub response: Option<String>,
    pub app: String,
    pub metrics: ResponseMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_roundtrip() {
        let id = RequestId::new();
        let raw = id.as_uuid();
        assert_eq!(RequestId::from_uuid(raw), id);
    }

    #[test]
    fn test_request_config_defaults() {
        let config = RequestConfig::default();
        assert!(config.sanitize_input);
        assert!(config.pii_masking);
        assert_eq!(config.toxicity_threshold, 0.7);
        assert_eq!(config.moderation, Moderation::Moderate);
    }

    #[test]
    fn test_request_config_model_normalization() {
        let config = RequestConfig::default().with_model("not-a-real-model");
        assert_eq!(config.normalized_model(), "gpt-3.5-turbo");

        let config = RequestConfig::default().with_model("gpt-4o");
        assert_eq!(config.normalized_model(), "gpt-4o");
    }

    #[test]
    fn test_pii_map_insertion_order_preserved() {
        let mut map = PiiMap::new();
        map.insert("[SSN_1]", "123-45-6789");
        map.insert("[EMAIL_1]", "j@x.com");

        let restored: Vec<_> = map.iter().collect();
        assert_eq!(restored[0], ("[SSN_1]", "123-45-6789"));
        assert_eq!(restored[1], ("[EMAIL_1]", "j@x.com"));
        assert_eq!(map.get("[SSN_1]"), Some("123-45-6789"));
    }

    #[test]
    fn test_security_score_never_decreases() {
        let mut state = RequestState::new("hello");
        state.raise_security_score(0.5);
        state.raise_security_score(0.2);
        assert_eq!(state.security_score, 0.5);
        state.raise_security_score(0.9);
        assert_eq!(state.security_score, 0.9);
    }

    #[test]
    fn test_block_is_terminal_and_raises_score() {
        let mut state = RequestState::new("'; DROP TABLE users; --");
        state.block("Security threats detected: sql_injection", 0.9);
        assert!(state.is_blocked);
        assert_eq!(state.security_score, 0.9);
        assert_eq!(
            state.block_reason.as_deref(),
            Some("Security threats detected: sql_injection")
        );
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(120, 48);
        assert_eq!(usage.total(), 168);
    }

    #[test]
    fn test_pii_type_severity() {
        assert!(PiiType::Ssn.is_high_severity());
        assert!(PiiType::CreditCard.is_high_severity());
        assert!(PiiType::ApiKey.is_high_severity());
        assert!(!PiiType::Email.is_high_severity());
        assert!(!PiiType::Phone.is_high_severity());
        assert!(!PiiType::Ip.is_high_severity());
    }
}
