//! Shared error kinds for the gateway pipeline.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Error kinds common to all three stages. Each stage crate wraps these (or
/// defines its own enum following the same `status_code`/`error_code` shape)
/// rather than inventing a parallel taxonomy.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No credential presented.
    #[error("Missing API key")]
    AuthMissing,

    /// Credential presented but does not resolve to an active tenant.
    #[error("Invalid API key")]
    AuthInvalid,

    /// Credential resolves but the key has been deactivated.
    #[error("API key disabled")]
    AuthDisabled,

    /// Transport failure reaching a downstream stage or the model provider.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Downstream stage responded with a malformed or unexpected payload.
    #[error("Upstream protocol error: {0}")]
    UpstreamProtocol(String),

    /// A stage produced a deterministic block verdict. Not a system error;
    /// carries the reason shown to the caller.
    #[error("Blocked: {0}")]
    PolicyBlock(String),

    /// An invariant the pipeline depends on did not hold (e.g. a
    /// de-pseudonymization token with no entry in `pii_map`).
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),

    /// The Sentinel pipeline itself failed before producing a verdict.
    /// Callers must translate this into a fail-safe block, never a silent
    /// pass-through.
    #[error("Security verification failed")]
    FailSafeBlock,

    /// Configuration could not be loaded or was invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Catch-all for conditions that do not fit the kinds above.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status code this error maps to at a service boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::AuthMissing => 401,
            CoreError::AuthInvalid => 401,
            CoreError::AuthDisabled => 403,
            CoreError::UpstreamUnavailable(_) => 503,
            CoreError::UpstreamProtocol(_) => 500,
            CoreError::PolicyBlock(_) => 400,
            CoreError::InternalInvariant(_) => 500,
            CoreError::FailSafeBlock => 400,
            CoreError::Configuration(_) => 500,
            CoreError::Internal(_) => 500,
        }
    }

    /// Machine-parseable error code, distinct from the status code, for
    /// clients that branch on error kind rather than HTTP status alone.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::AuthMissing => "AUTH_MISSING",
            CoreError::AuthInvalid => "AUTH_INVALID",
            CoreError::AuthDisabled => "AUTH_DISABLED",
            CoreError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
            CoreError::UpstreamProtocol(_) => "UPSTREAM_PROTOCOL",
            CoreError::PolicyBlock(_) => "POLICY_BLOCK",
            CoreError::InternalInvariant(_) => "INTERNAL_INVARIANT",
            CoreError::FailSafeBlock => "FAIL_SAFE_BLOCK",
            CoreError::Configuration(_) => "CONFIGURATION_ERROR",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether this error kind is retried by the caller. None of the core
    /// kinds are retried automatically; transport failures are surfaced as
    /// 503 and left to the client.
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(CoreError::AuthMissing.status_code(), 401);
        assert_eq!(CoreError::AuthDisabled.status_code(), 403);
        assert_eq!(CoreError::UpstreamUnavailable("x".into()).status_code(), 503);
        assert_eq!(CoreError::PolicyBlock("blocked".into()).status_code(), 400);
        assert_eq!(CoreError::InternalInvariant("x".into()).status_code(), 500);
        assert_eq!(CoreError::FailSafeBlock.status_code(), 400);
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            CoreError::AuthMissing.error_code(),
            CoreError::AuthInvalid.error_code(),
            CoreError::AuthDisabled.error_code(),
            CoreError::UpstreamUnavailable(String::new()).error_code(),
            CoreError::UpstreamProtocol(String::new()).error_code(),
            CoreError::PolicyBlock(String::new()).error_code(),
            CoreError::InternalInvariant(String::new()).error_code(),
            CoreError::FailSafeBlock.error_code(),
            CoreError::Configuration(String::new()).error_code(),
            CoreError::Internal(String::new()).error_code(),
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
