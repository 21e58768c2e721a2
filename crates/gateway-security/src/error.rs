//! Security error types

use thiserror::Error;

/// Result type alias for security operations
pub type Result<T> = std::result::Result<T, SecurityError>;

/// Security-related errors
#[derive(Error, Debug)]
pub enum SecurityError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Authorization failed (insufficient permissions)
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Invalid API key
    #[error("Invalid API key")]
    InvalidApiKey,

    /// API key expired
    #[error("API key expired")]
    ApiKeyExpired,

    /// API key lacks required scope
    #[error("API key lacks scope: {0}")]
    InsufficientScope(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Retry after {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// Configuration error
    #[error("Security configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal security error: {0}")]
    Internal(String),
}

impl SecurityError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            SecurityError::AuthenticationFailed(_) => 401,
            SecurityError::AuthorizationFailed(_) => 403,
            SecurityError::InvalidApiKey => 401,
            SecurityError::ApiKeyExpired => 401,
            SecurityError::InsufficientScope(_) => 403,
            SecurityError::RateLimitExceeded { .. } => 429,
            SecurityError::Configuration(_) => 500,
            SecurityError::Internal(_) => 500,
        }
    }

    /// Get error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            SecurityError::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            SecurityError::AuthorizationFailed(_) => "AUTHORIZATION_FAILED",
            SecurityError::InvalidApiKey => "INVALID_API_KEY",
            SecurityError::ApiKeyExpired => "API_KEY_EXPIRED",
            SecurityError::InsufficientScope(_) => "INSUFFICIENT_SCOPE",
            SecurityError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            SecurityError::Configuration(_) => "CONFIGURATION_ERROR",
            SecurityError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(SecurityError::InvalidApiKey.status_code(), 401);
        assert_eq!(SecurityError::ApiKeyExpired.status_code(), 401);
        assert_eq!(
            SecurityError::InsufficientScope("chat".into()).status_code(),
            403
        );
        assert_eq!(
            SecurityError::RateLimitExceeded { retry_after_secs: 5 }.status_code(),
            429
        );
    }
}
