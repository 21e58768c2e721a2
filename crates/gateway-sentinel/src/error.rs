//! Sentinel-specific error kinds, layered over `gateway_core::CoreError`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentinelError>;

#[derive(Error, Debug)]
pub enum SentinelError {
    /// A model-provider or Guardian call failed at the transport layer.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The pipeline itself panicked or hit an invariant violation before
    /// producing a verdict; callers must fail safe, not pass through.
    #[error("security verification failed")]
    FailSafeBlock,

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl SentinelError {
    pub fn status_code(&self) -> u16 {
        match self {
            SentinelError::UpstreamUnavailable(_) => 503,
            SentinelError::FailSafeBlock => 400,
            SentinelError::InternalInvariant(_) => 500,
        }
    }
}
