//! In-process metrics for the gateway's explainability contract: a counter
//! by `{tenant, model, status, reason?}`, a latency
//! histogram, a gauge of the last-seen `security_score`, and counters for
//! threats/PII/tokens-saved/guardian flags.
//!
//! Grounded in the crate's own `correlation`/`analytics` style (DashMap +
//! parking_lot for lock-free-ish in-process aggregation) rather than a
//! dedicated metrics crate, matching the rest of this crate's ambient stack.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Outcome of a single `/chat` request, the unit the request counter groups
/// by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Passed,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    tenant: String,
    model: String,
    status: RequestStatus,
    reason: Option<String>,
}

/// Aggregated request/latency/score/flag counters for the gateway process.
/// One instance is shared across the Axum app via `Arc`.
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    requests: DashMap<CounterKey, u64>,
    latency_ms_total: AtomicU64,
    latency_ms_count: AtomicU64,
    last_security_score: RwLock<f64>,
    threats_detected: AtomicU64,
    pii_redacted: AtomicU64,
    tokens_saved_total: AtomicU64,
    guardian_flags: DashMap<&'static str, u64>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(
        &self,
        tenant: &str,
        model: &str,
        status: RequestStatus,
        reason: Option<&str>,
    ) {
        let key = CounterKey {
            tenant: tenant.to_string(),
            model: model.to_string(),
            status,
            reason: reason.map(String::from),
        };
        *self.requests.entry(key).or_insert(0) += 1;
    }

    pub fn record_latency_ms(&self, latency_ms: u64) {
        self.latency_ms_total.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_ms_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_security_score(&self, score: f64) {
        *self.last_security_score.write() = score;
    }

    pub fn record_threats_detected(&self, count: u64) {
        self.threats_detected.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_pii_redacted(&self, count: u64) {
        self.pii_redacted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_tokens_saved(&self, tokens: u64) {
        self.tokens_saved_total.fetch_add(tokens, Ordering::Relaxed);
    }

    pub fn record_guardian_flag(&self, flag: &'static str) {
        *self.guardian_flags.entry(flag).or_insert(0) += 1;
    }

    pub fn average_latency_ms(&self) -> f64 {
        let count = self.latency_ms_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.latency_ms_total.load(Ordering::Relaxed) as f64 / count as f64
    }

    pub fn last_security_score(&self) -> f64 {
        *self.last_security_score.read()
    }

    /// A flattened snapshot suitable for a debug/metrics endpoint.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut requests_by_status: HashMap<String, u64> = HashMap::new();
        for entry in self.requests.iter() {
            let label = match entry.key().status {
                RequestStatus::Passed => "passed",
                RequestStatus::Blocked => "blocked",
            };
            *requests_by_status.entry(label.to_string()).or_insert(0) += entry.value();
        }
        MetricsSnapshot {
            requests_by_status,
            average_latency_ms: self.average_latency_ms(),
            last_security_score: self.last_security_score(),
            threats_detected: self.threats_detected.load(Ordering::Relaxed),
            pii_redacted: self.pii_redacted.load(Ordering::Relaxed),
            tokens_saved_total: self.tokens_saved_total.load(Ordering::Relaxed),
            guardian_flags: self
                .guardian_flags
                .iter()
                .map(|e| (e.key().to_string(), *e.value()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests_by_status: HashMap<String, u64>,
    pub average_latency_ms: f64,
    pub last_security_score: f64,
    pub threats_detected: u64,
    pub pii_redacted: u64,
    pub tokens_saved_total: u64,
    pub guardian_flags: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_aggregates_requests_by_status() {
        let metrics = GatewayMetrics::new();
        metrics.record_request("acme", "gpt-4o", RequestStatus::Passed, None);
        metrics.record_request("acme", "gpt-4o", RequestStatus::Blocked, Some("sql_injection"));
        metrics.record_request("acme", "gpt-4o", RequestStatus::Passed, None);

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_by_status.get("passed"), Some(&2));
        assert_eq!(snap.requests_by_status.get("blocked"), Some(&1));
    }

    #[test]
    fn average_latency_is_zero_with_no_samples() {
        let metrics = GatewayMetrics::new();
        assert_eq!(metrics.average_latency_ms(), 0.0);
    }

    #[test]
    fn average_latency_over_several_samples() {
        let metrics = GatewayMetrics::new();
        metrics.record_latency_ms(100);
        metrics.record_latency_ms(200);
        assert_eq!(metrics.average_latency_ms(), 150.0);
    }

    #[test]
    fn guardian_flag_counters_increment_independently() {
        let metrics = GatewayMetrics::new();
        metrics.record_guardian_flag("hallucination_detected");
        metrics.record_guardian_flag("hallucination_detected");
        metrics.record_guardian_flag("tone_violation");

        let snap = metrics.snapshot();
        assert_eq!(snap.guardian_flags.get("hallucination_detected"), Some(&2));
        assert_eq!(snap.guardian_flags.get("tone_violation"), Some(&1));
    }
}
