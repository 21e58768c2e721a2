//! Security audit logging.
//!
//! Provides structured, payload-free audit events for the pipeline's
//! security-relevant decisions (threat detections, policy blocks, rate
//! limiting). Never carries a raw prompt, completion, token, or PII literal.

use chrono::{DateTime, Utc};
use gateway_core::{AuditSeverity as CoreAuditSeverity, AuditSink, SecurityAuditEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::{info, warn};
use uuid::Uuid;

/// Audit event types the pipeline can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A pattern detector in Sentinel crossed its confidence threshold.
    ThreatDetected,
    /// The adversarial security-audit LLM call flagged the prompt.
    LlmSecurityFlag,
    /// Guardian's content filter blocked a response.
    ContentBlocked,
    /// A high-severity PII literal was redacted from a response.
    PiiRedacted,
    /// An advisory rate limit was exceeded.
    RateLimitExceeded,
    /// A judge-LLM call inside a parallel group failed and degraded.
    JudgeDegraded,
    /// Process lifecycle events, for operational correlation.
    SystemStartup,
    SystemShutdown,
}

impl AuditEventType {
    pub fn severity(&self) -> AuditSeverity {
        match self {
            AuditEventType::ThreatDetected | AuditEventType::LlmSecurityFlag => {
                AuditSeverity::High
            }
            AuditEventType::ContentBlocked | AuditEventType::PiiRedacted => AuditSeverity::Medium,
            AuditEventType::RateLimitExceeded => AuditSeverity::Low,
            AuditEventType::JudgeDegraded => AuditSeverity::Low,
            AuditEventType::SystemStartup | AuditEventType::SystemShutdown => AuditSeverity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::ThreatDetected => "threat_detected",
            AuditEventType::LlmSecurityFlag => "llm_security_flag",
            AuditEventType::ContentBlocked => "content_blocked",
            AuditEventType::PiiRedacted => "pii_redacted",
            AuditEventType::RateLimitExceeded => "rate_limit_exceeded",
            AuditEventType::JudgeDegraded => "judge_degraded",
            AuditEventType::SystemStartup => "system_startup",
            AuditEventType::SystemShutdown => "system_shutdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl AuditSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditSeverity::Info => "info",
            AuditSeverity::Low => "low",
            AuditSeverity::Medium => "medium",
            AuditSeverity::High => "high",
            AuditSeverity::Critical => "critical",
        }
    }

    fn to_core(self) -> CoreAuditSeverity {
        match self {
            AuditSeverity::Info | AuditSeverity::Low => CoreAuditSeverity::Low,
            AuditSeverity::Medium => CoreAuditSeverity::Medium,
            AuditSeverity::High => CoreAuditSeverity::High,
            AuditSeverity::Critical => CoreAuditSeverity::Critical,
        }
    }
}

/// A single audit record. Fields are intentionally typed and payload-free:
/// there is no slot for a raw prompt, completion, or PII literal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: String,
    pub event_type: AuditEventType,
    pub severity: AuditSeverity,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub policy_violated: Vec<String>,
    pub threat_score: f64,
    pub request_id: Option<String>,
    pub tenant_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, service: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            severity: event_type.severity(),
            event_type,
            timestamp: Utc::now(),
            service: service.to_string(),
            policy_violated: Vec::new(),
            threat_score: 0.0,
            request_id: None,
            tenant_id: None,
            ip_address: None,
            user_agent: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_policy_violated(mut self, policies: Vec<String>) -> Self {
        self.policy_violated = policies;
        self
    }

    pub fn with_threat_score(mut self, score: f64) -> Self {
        self.threat_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }

    pub fn with_tenant_id(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip_address = Some(ip.to_string());
        self
    }

    pub fn with_ip_str(mut self, ip: &str) -> Self {
        self.ip_address = Some(ip.to_string());
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = Some(user_agent.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    fn into_core_event(self) -> SecurityAuditEvent {
        SecurityAuditEvent {
            event_type: self.event_type.as_str().to_string(),
            severity: self.severity.to_core(),
            timestamp: self.timestamp,
            service: self.service,
            policy_violated: self.policy_violated,
            threat_score: self.threat_score,
            client_ip: self.ip_address,
            user_agent: self.user_agent,
        }
    }
}

/// Backend-agnostic audit logger. `AuditSink` (in `gateway_core`) is the
/// narrower trait the pipeline stages actually depend on; this is the richer
/// interface local loggers implement, with a blanket bridge below.
#[async_trait::async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log(&self, event: AuditEvent);
}

#[async_trait::async_trait]
impl<T: AuditLogger> AuditSink for T {
    async fn emit_security_event(&self, event: SecurityAuditEvent) {
        let event_type = match event.event_type.as_str() {
            "threat_detected" => AuditEventType::ThreatDetected,
            "llm_security_flag" => AuditEventType::LlmSecurityFlag,
            "content_blocked" => AuditEventType::ContentBlocked,
            "pii_redacted" => AuditEventType::PiiRedacted,
            "rate_limit_exceeded" => AuditEventType::RateLimitExceeded,
            "judge_degraded" => AuditEventType::JudgeDegraded,
            _ => AuditEventType::ThreatDetected,
        };
        let audit_event = AuditEvent {
            id: Uuid::new_v4().to_string(),
            event_type,
            severity: event_type.severity(),
            timestamp: event.timestamp,
            service: event.service,
            policy_violated: event.policy_violated,
            threat_score: event.threat_score,
            request_id: None,
            tenant_id: None,
            ip_address: event.client_ip,
            user_agent: event.user_agent,
            metadata: HashMap::new(),
        };
        self.log(audit_event).await;
    }
}

/// Logs audit events through `tracing`, at `warn` for high/critical
/// severity and `info` otherwise. The default sink for production.
#[derive(Debug, Clone, Default)]
pub struct TracingAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, event: AuditEvent) {
        let json = serde_json::to_string(&event).unwrap_or_default();
        match event.severity {
            AuditSeverity::Critical | AuditSeverity::High => {
                warn!(
                    audit = true,
                    event_type = event.event_type.as_str(),
                    severity = event.severity.as_str(),
                    request_id = ?event.request_id,
                    threat_score = event.threat_score,
                    "AUDIT: {}", json
                );
            }
            _ => {
                info!(
                    audit = true,
                    event_type = event.event_type.as_str(),
                    severity = event.severity.as_str(),
                    request_id = ?event.request_id,
                    threat_score = event.threat_score,
                    "AUDIT: {}", json
                );
            }
        }
    }
}

/// In-memory logger for tests and local debugging.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogger {
    events: std::sync::Arc<tokio::sync::RwLock<Vec<AuditEvent>>>,
}

impl InMemoryAuditLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait::async_trait]
impl AuditLogger for InMemoryAuditLogger {
    async fn log(&self, event: AuditEvent) {
        self.events.write().await.push(event);
    }
}
