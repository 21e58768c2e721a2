//! Capability traits threaded through the pipeline instead of singletons or
//! global handles. Each stage depends on these abstractly; concrete
//! implementations (in-memory, Redis-backed, etc.) live behind them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TokenUsage;

/// A resolved tenant bound to a credential. The core never stores the raw
/// key, only this record, looked up by the key's hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedCredential {
    pub tenant_id: String,
    pub tenant_name: String,
    pub key_id: String,
    pub active: bool,
}

/// Resolves an opaque bearer credential's hash to a tenant. Read-mostly;
/// implementations may cache by hash with a bounded TTL.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn lookup_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<ResolvedCredential>, Self::Error>;
}

/// Per-key, per-model usage accounting. Writes must be atomic per key; reads
/// may be stale.
#[async_trait]
pub trait UsageCounterStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn incr_usage(
        &self,
        key_id: &str,
        model: &str,
        usage: TokenUsage,
    ) -> Result<(), Self::Error>;

    async fn touch_last_used(&self, key_id: &str) -> Result<(), Self::Error>;
}

/// A security/telemetry event, stripped of payload by construction: never a
/// raw prompt, completion, token, or PII literal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAuditEvent {
    pub event_type: String,
    pub severity: AuditSeverity,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub policy_violated: Vec<String>,
    pub threat_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// Fire-and-forget telemetry sink. MUST NOT block request processing and
/// MUST NOT receive PII, raw prompts, tokens, or completions; implementors
/// may drop events under backpressure.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn emit_security_event(&self, event: SecurityAuditEvent);
}

/// Liveness/readiness status reported by a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health(&self) -> HealthStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_credential_equality() {
        let a = ResolvedCredential {
            tenant_id: "t1".into(),
            tenant_name: "Acme".into(),
            key_id: "k1".into(),
            active: true,
        };
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn test_health_status_variants_distinct() {
        assert_ne!(HealthStatus::Healthy, HealthStatus::Unhealthy);
        assert_ne!(HealthStatus::Degraded, HealthStatus::Unhealthy);
    }
}
