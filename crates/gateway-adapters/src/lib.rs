pub mod circuit_breaker;
pub mod model_client;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use model_client::{
    approximate_tokens, CompletionRequest, CompletionResult, HttpModelClient, ModelClient,
    ModelRegistry, ProviderUsage,
};
pub use retry::{with_retry, with_retry_policy, RetryPolicy};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Circuit breaker is open")]
    CircuitBreakerOpen,

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;
