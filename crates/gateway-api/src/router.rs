//! Axum router wiring: `POST /chat`, `GET /health`, `GET /ready`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{chat_handler, health_handler, ready_handler};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use gateway_adapters::model_client::{CompletionRequest, CompletionResult, ModelClient};
    use gateway_adapters::AdapterResult;
    use gateway_core::traits::{ResolvedCredential, SecurityAuditEvent};
    use gateway_core::types::TokenUsage;
    use gateway_guardian::Guardian;
    use gateway_observability::GatewayMetrics;
    use gateway_sentinel::Sentinel;
    use std::time::Duration;
    use tower::ServiceExt;

    struct AlwaysActiveCredentials;

    #[async_trait::async_trait]
    impl crate::state::CredentialLookup for AlwaysActiveCredentials {
        async fn lookup_by_hash(
            &self,
            _hash: &str,
        ) -> Result<Option<ResolvedCredential>, gateway_core::CoreError> {
            Ok(Some(ResolvedCredential {
                tenant_id: "tenant-1".to_string(),
                tenant_name: "Acme".to_string(),
                key_id: "key-1".to_string(),
                active: true,
            }))
        }
    }

    struct NoopUsage;

    #[async_trait::async_trait]
    impl crate::state::UsageAccounting for NoopUsage {
        async fn incr_usage(&self, _key_id: &str, _model: &str, _usage: TokenUsage) {}
        async fn touch_last_used(&self, _key_id: &str) {}
    }

    struct NoopAudit;

    #[async_trait::async_trait]
    impl gateway_core::traits::AuditSink for NoopAudit {
        async fn emit_security_event(&self, _event: SecurityAuditEvent) {}
    }

    struct EchoModelClient;

    #[async_trait::async_trait]
    impl ModelClient for EchoModelClient {
        async fn complete(&self, request: CompletionRequest) -> AdapterResult<CompletionResult> {
            let content = if request.system_prompt.contains("security classifier")
                || request.system_prompt.contains("content moderation")
            {
                r#"{"is_threat": false, "confidence": 0.0, "score": 0.0}"#.to_string()
            } else {
                format!("echo: {}", request.user_text)
            };
            Ok(CompletionResult {
                content,
                usage: None,
                model_used: request.model,
            })
        }
    }

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState {
            credentials: Arc::new(AlwaysActiveCredentials),
            usage: Arc::new(NoopUsage),
            audit: Arc::new(NoopAudit),
            model_client: Arc::new(EchoModelClient),
            sentinel: Sentinel::new(),
            guardian: Guardian::new(),
            metrics: Arc::new(GatewayMetrics::new()),
            sentinel_timeout: Duration::from_secs(5),
            guardian_timeout: Duration::from_secs(5),
            rate_limiter: Arc::new(gateway_security::rate_limit::RateLimitManager::default_config()),
        })
    }

    #[tokio::test]
    async fn health_check_returns_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_check_returns_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn chat_without_api_key_is_unauthorized() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"query": "hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_with_clean_query_returns_passed_response() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .header("x-api-key", "gwsk_v1_test")
                    .body(Body::from(r#"{"query": "What is the capital of France?"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-security-decision").unwrap(),
            "passed"
        );
        assert!(response.headers().contains_key("x-security-score"));
    }

    #[tokio::test]
    async fn chat_with_sql_injection_is_blocked() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header("content-type", "application/json")
                    .header("x-api-key", "gwsk_v1_test")
                    .body(Body::from(r#"{"query": "' OR '1'='1 --"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().contains_key("x-security-decision"));
    }
}
