//! Shared application state handed to every handler: the capability traits
//! threaded through the pipeline, plus the two stage orchestrators and the
//! in-process metrics aggregator.

use std::sync::Arc;
use std::time::Duration;

use gateway_adapters::model_client::ModelClient;
use gateway_core::traits::{AuditSink, CredentialStore};
use gateway_core::CoreError;
use gateway_guardian::Guardian;
use gateway_observability::GatewayMetrics;
use gateway_security::rate_limit::RateLimitManager;
use gateway_sentinel::Sentinel;

/// Type-erased so `AppState` doesn't carry the associated-error generics of
/// `CredentialStore`/`UsageCounterStore` through every handler signature.
#[async_trait::async_trait]
pub trait UsageAccounting: Send + Sync {
    async fn incr_usage(&self, key_id: &str, model: &str, usage: gateway_core::types::TokenUsage);
    async fn touch_last_used(&self, key_id: &str);
}

pub struct UsageAccountingAdapter<S>(pub S);

#[async_trait::async_trait]
impl<S> UsageAccounting for UsageAccountingAdapter<S>
where
    S: gateway_core::traits::UsageCounterStore + Send + Sync,
{
    async fn incr_usage(&self, key_id: &str, model: &str, usage: gateway_core::types::TokenUsage) {
        if let Err(e) = self.0.incr_usage(key_id, model, usage).await {
            tracing::warn!(error = %e, "usage accounting failed");
        }
    }

    async fn touch_last_used(&self, key_id: &str) {
        if let Err(e) = self.0.touch_last_used(key_id).await {
            tracing::warn!(error = %e, "last_used touch failed");
        }
    }
}

#[async_trait::async_trait]
pub trait CredentialLookup: Send + Sync {
    async fn lookup_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<gateway_core::traits::ResolvedCredential>, CoreError>;
}

pub struct CredentialLookupAdapter<S>(pub S);

#[async_trait::async_trait]
impl<S> CredentialLookup for CredentialLookupAdapter<S>
where
    S: CredentialStore + Send + Sync,
{
    async fn lookup_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<gateway_core::traits::ResolvedCredential>, CoreError> {
        self.0
            .lookup_by_hash(hash)
            .await
            .map_err(|e| CoreError::Internal(e.to_string()))
    }
}

pub struct AppState {
    pub credentials: Arc<dyn CredentialLookup>,
    pub usage: Arc<dyn UsageAccounting>,
    pub audit: Arc<dyn AuditSink>,
    pub model_client: Arc<dyn ModelClient>,
    pub sentinel: Sentinel,
    pub guardian: Guardian,
    pub metrics: Arc<GatewayMetrics>,
    pub sentinel_timeout: Duration,
    pub guardian_timeout: Duration,
    pub rate_limiter: Arc<RateLimitManager>,
}
