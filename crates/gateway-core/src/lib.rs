pub mod config;
pub mod error;
pub mod pii;
pub mod toon;
pub mod traits;
pub mod types;

// Re-export specific items to avoid ambiguity
pub use config::*;
pub use error::*;
pub use types::*;

// Re-export traits module items (capability traits for the pipeline)
pub use traits::{
    AuditSeverity, AuditSink, CredentialStore, HealthCheck, HealthStatus, ResolvedCredential,
    SecurityAuditEvent, UsageCounterStore,
};

// Re-export PII detection shared by Sentinel and Guardian
pub use pii::{PiiDetector, PiiMatch, SENSITIVE_KEYWORDS};
