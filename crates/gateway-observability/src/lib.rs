//! Ambient observability stack for the LLM safety gateway: structured
//! tracing setup, request correlation IDs, and the in-process metrics the
//! gateway's explainability surface exposes.

pub mod correlation;
pub mod metrics;
pub mod tracing_setup;

pub use correlation::*;
pub use metrics::{GatewayMetrics, MetricsSnapshot, RequestStatus};
pub use tracing_setup::*;

use thiserror::Error;

/// Observability errors
#[derive(Error, Debug)]
pub enum ObservabilityError {
    #[error("Tracing initialization failed: {0}")]
    TracingInit(String),

    #[error("Metrics error: {0}")]
    Metrics(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, ObservabilityError>;
