//! The two HTTP entry points: `POST /chat` and `GET /health`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use gateway_core::traits::{AuditSeverity, SecurityAuditEvent};
use gateway_core::types::{RequestState, ResponseEnvelope, ResponseMetrics};
use gateway_core::CoreError;
use gateway_observability::RequestStatus;
use gateway_security::rate_limit::{RateLimitKey, RateLimitTier};
use gateway_security::SecurityError;
use gateway_sentinel::Sentinel;
use tracing::info;

use crate::dto::{ChatRequest, HealthBody, ReadyBody};
use crate::error::ApiError;
use crate::state::AppState;

const API_KEY_HEADER: &str = "x-api-key";

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn health_handler() -> impl IntoResponse {
    Json(HealthBody { status: "ok" })
}

/// Readiness probe: liveness (`/health`) only confirms the process is up,
/// this confirms the Sentinel/Guardian stages the process holds are
/// constructed and reachable.
pub async fn ready_handler(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ReadyBody {
        status: "ready",
        sentinel: "ready",
        guardian: "ready",
    })
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let start = Instant::now();

    let presented_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(CoreError::AuthMissing)?;

    let key_hash = gateway_security::credential::hash_presented_key(presented_key);
    let credential = state
        .credentials
        .lookup_by_hash(&key_hash)
        .await?
        .ok_or(CoreError::AuthInvalid)?;

    if !credential.active {
        return Err(ApiError(CoreError::AuthDisabled));
    }
    if credential.tenant_id.is_empty() {
        return Err(ApiError(CoreError::AuthInvalid));
    }

    let rate_limit_key = RateLimitKey::ApiKey(credential.key_id.clone());
    match state.rate_limiter.check_limit(&rate_limit_key, &RateLimitTier::Standard).await {
        Ok(_) => {}
        Err(SecurityError::RateLimitExceeded { retry_after_secs }) => {
            let mut response = Json(serde_json::json!({
                "error": "rate_limit_exceeded",
                "reason": format!("retry after {retry_after_secs}s"),
            }))
            .into_response();
            *response.status_mut() = axum::http::StatusCode::TOO_MANY_REQUESTS;
            let result = gateway_security::rate_limit::RateLimitResult {
                allowed: false,
                remaining: 0,
                limit: 0,
                reset_after_secs: retry_after_secs,
                retry_after_secs: Some(retry_after_secs),
            };
            let response_headers = response.headers_mut();
            for (name, value) in state.rate_limiter.get_headers(&result) {
                if let (Ok(name), Ok(value)) = (
                    axum::http::HeaderName::try_from(name),
                    HeaderValue::from_str(&value),
                ) {
                    response_headers.insert(name, value);
                }
            }
            return Ok(response);
        }
        Err(e) => return Err(ApiError(CoreError::Internal(e.to_string()))),
    }

    let config = payload.to_config();
    let request_state = RequestState::new(payload.effective_query())
        .with_client_info(client_ip(&headers), user_agent(&headers));
    let fail_safe_state = request_state.clone();

    let sentinel_result = tokio::time::timeout(
        state.sentinel_timeout,
        state
            .sentinel
            .process(request_state, &config, state.model_client.as_ref()),
    )
    .await;

    let (mut request_state, model_response) = match sentinel_result {
        Err(_) => {
            return Err(ApiError(CoreError::UpstreamUnavailable(
                "sentinel timed out".to_string(),
            )))
        }
        Ok(Err(e)) => {
            let mut blocked = fail_safe_state;
            blocked.block("Security verification failed".to_string(), 1.0);
            tracing::warn!(error = %e, "sentinel pipeline failed, failing safe to a blocked verdict");
            (blocked, None)
        }
        Ok(Ok(outcome)) => (outcome.state, outcome.model_response),
    };

    let final_response = if request_state.is_blocked {
        None
    } else {
        let model_response = model_response
            .ok_or_else(|| CoreError::Internal("missing model response on a pass verdict".to_string()))?;

        let guardian_result = tokio::time::timeout(
            state.guardian_timeout,
            state
                .guardian
                .process(request_state, &config, model_response, state.model_client.as_ref()),
        )
        .await;

        let guardian_outcome = guardian_result.map_err(|_| {
            CoreError::UpstreamUnavailable("guardian timed out".to_string())
        })?;
        request_state = guardian_outcome.state;

        guardian_outcome.validated_response.map(|text| {
            Sentinel::depseudonymize(&text, &request_state.pii_map)
        })
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    request_state.record_latency("total", elapsed_ms);

    state
        .usage
        .incr_usage(&credential.key_id, &config.model, request_state.llm_tokens)
        .await;
    state.usage.touch_last_used(&credential.key_id).await;

    let status = if request_state.is_blocked {
        RequestStatus::Blocked
    } else {
        RequestStatus::Passed
    };
    state.metrics.record_request(
        &credential.tenant_id,
        &config.model,
        status,
        request_state.block_reason.as_deref(),
    );
    state.metrics.record_latency_ms(elapsed_ms);
    state.metrics.record_security_score(request_state.security_score);
    state
        .metrics
        .record_threats_detected(request_state.detected_threats.len() as u64);
    state
        .metrics
        .record_pii_redacted(request_state.pii_detections.iter().map(|d| d.count as u64).sum());
    state.metrics.record_tokens_saved(request_state.tokens_saved as u64);

    if request_state.is_blocked {
        state
            .audit
            .emit_security_event(SecurityAuditEvent {
                event_type: "request_blocked".to_string(),
                severity: AuditSeverity::High,
                timestamp: Utc::now(),
                service: "gateway-api".to_string(),
                policy_violated: request_state
                    .block_reason
                    .clone()
                    .into_iter()
                    .collect(),
                threat_score: request_state.security_score,
                client_ip: request_state.client_ip.clone(),
                user_agent: request_state.user_agent.clone(),
            })
            .await;

        let reason = request_state.block_reason.clone().unwrap_or_default();
        info!(request_id = %request_state.request_id, %reason, "request blocked");

        let mut response = Json(serde_json::json!({
            "error": "blocked",
            "reason": reason,
        }))
        .into_response();
        *response.status_mut() = axum::http::StatusCode::BAD_REQUEST;
        let headers = response.headers_mut();
        headers.insert(
            "x-security-decision",
            HeaderValue::from_str(&format!("blocked: {reason}")).unwrap_or(HeaderValue::from_static("blocked")),
        );
        headers.insert(
            "x-security-score",
            HeaderValue::from_str(&format!("{:.3}", request_state.security_score))
                .unwrap_or(HeaderValue::from_static("0.000")),
        );
        return Ok(response);
    }

    let metrics = ResponseMetrics {
        security_score: request_state.security_score,
        tokens_saved: request_state.tokens_saved,
        token_usage: Some(request_state.llm_tokens),
        model_used: request_state.model_used.clone(),
        threats_detected: request_state.detected_threats.len() as u32,
        pii_redacted: request_state.pii_detections.iter().map(|d| d.count).sum(),
        processing_time_ms: elapsed_ms,
        hallucination_detected: request_state.guardian_flags.hallucination,
        citations_verified: request_state.guardian_flags.citations_ok,
        tone_compliant: request_state.guardian_flags.tone_ok,
        disclaimer_injected: Some(request_state.guardian_flags.disclaimer),
        false_refusal_detected: request_state.guardian_flags.false_refusal,
        toxicity_score: request_state.guardian_flags.toxicity,
    };

    let envelope = ResponseEnvelope {
        response: final_response,
        app: "gateway".to_string(),
        metrics,
    };

    let mut response = Json(envelope).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert("x-security-decision", HeaderValue::from_static("passed"));
    response_headers.insert(
        "x-security-score",
        HeaderValue::from_str(&format!("{:.3}", request_state.security_score))
            .unwrap_or(HeaderValue::from_static("0.000")),
    );
    Ok(response)
}
