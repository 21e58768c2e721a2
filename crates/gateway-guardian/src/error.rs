//! Guardian-specific error kinds.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GuardianError>;

#[derive(Error, Debug)]
pub enum GuardianError {
    #[error("upstream judge call unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl GuardianError {
    pub fn status_code(&self) -> u16 {
        match self {
            GuardianError::UpstreamUnavailable(_) => 503,
            GuardianError::InternalInvariant(_) => 500,
        }
    }
}
